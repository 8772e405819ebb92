//! Structural block tree.
//!
//! Nested lexical blocks (module, function, if/else branches, loops) with line
//! ranges. Blocks live in a flat arena; the parent link is an index used only
//! for scope queries.

use serde::Serialize;

use crate::domain::ast::{Node, NodeKind};

pub type BlockId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BlockKind {
    Module,
    Function,
    If,
    Else,
    Loop,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Block {
    pub kind: BlockKind,
    pub start_line: usize,
    pub end_line: usize,
    pub depth: usize,
    pub parent: Option<BlockId>,
    pub children: Vec<BlockId>,
}

impl Block {
    pub fn contains_line(&self, line: usize) -> bool {
        self.start_line <= line && line <= self.end_line
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructureTree {
    blocks: Vec<Block>,
}

impl StructureTree {
    pub const ROOT: BlockId = 0;

    /// Build the block tree for a canonical module.
    pub fn build(module: &Node) -> Self {
        let mut tree = Self {
            blocks: vec![Block {
                kind: BlockKind::Module,
                start_line: module.line.min(1),
                end_line: module.last_line(),
                depth: 0,
                parent: None,
                children: Vec::new(),
            }],
        };
        if let Some(body) = module.body() {
            tree.add_statements(Self::ROOT, body);
        }
        tree
    }

    fn push(&mut self, parent: BlockId, kind: BlockKind, start_line: usize, end_line: usize) -> BlockId {
        let id = self.blocks.len();
        let depth = self.blocks[parent].depth + 1;
        self.blocks.push(Block { kind, start_line, end_line, depth, parent: Some(parent), children: Vec::new() });
        self.blocks[parent].children.push(id);
        id
    }

    fn add_statements(&mut self, parent: BlockId, statements: &[Node]) {
        for stmt in statements {
            self.add_statement(parent, stmt);
        }
    }

    fn add_statement(&mut self, parent: BlockId, stmt: &Node) {
        match &stmt.kind {
            NodeKind::If { test, body, orelse } => {
                let end = body.iter().map(Node::last_line).max().unwrap_or(test.last_line());
                let id = self.push(parent, BlockKind::If, stmt.line, end);
                self.add_statements(id, body);
                if let Some(first) = orelse.first() {
                    let end = orelse.iter().map(Node::last_line).max().unwrap_or(first.line);
                    let id = self.push(parent, BlockKind::Else, first.line, end);
                    self.add_statements(id, orelse);
                }
            }
            NodeKind::For { body, .. } | NodeKind::JsFor { body, .. } | NodeKind::While { body, .. } => {
                let id = self.push(parent, BlockKind::Loop, stmt.line, stmt.last_line());
                self.add_statements(id, body);
            }
            NodeKind::FunctionDef { body, .. } => {
                let id = self.push(parent, BlockKind::Function, stmt.line, stmt.last_line());
                self.add_statements(id, body);
            }
            _ => {
                // Function expressions nested inside ordinary statements.
                for def in function_expressions(stmt) {
                    self.add_statement(parent, def);
                }
            }
        }
    }

    pub fn get(&self, id: BlockId) -> &Block {
        &self.blocks[id]
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Innermost block whose range contains `line`.
    pub fn enclosing(&self, line: usize) -> BlockId {
        let mut current = Self::ROOT;
        'descend: loop {
            for &child in &self.blocks[current].children {
                if self.blocks[child].contains_line(line) {
                    current = child;
                    continue 'descend;
                }
            }
            return current;
        }
    }

    /// `(depth, innermost block)` for a source line.
    pub fn locate(&self, line: usize) -> (usize, BlockId) {
        let id = self.enclosing(line);
        (self.blocks[id].depth, id)
    }

    /// True when `ancestor` is `block` or one of its parents.
    pub fn is_ancestor_or_self(&self, ancestor: BlockId, block: BlockId) -> bool {
        let mut current = Some(block);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.blocks[id].parent;
        }
        false
    }

    /// Whether `line` sits inside a loop block.
    pub fn in_loop(&self, line: usize) -> bool {
        self.enclosing_of_kind(line, BlockKind::Loop).is_some()
    }

    /// Innermost block of `kind` around `line`.
    pub fn enclosing_of_kind(&self, line: usize, kind: BlockKind) -> Option<BlockId> {
        let mut current = Some(self.enclosing(line));
        while let Some(id) = current {
            if self.blocks[id].kind == kind {
                return Some(id);
            }
            current = self.blocks[id].parent;
        }
        None
    }

    pub fn max_depth(&self) -> usize {
        self.blocks.iter().map(|b| b.depth).max().unwrap_or(0)
    }

    /// Mean depth of the non-root blocks; 0 for a flat program.
    pub fn average_depth(&self) -> f64 {
        let nested = &self.blocks[1..];
        if nested.is_empty() {
            return 0.0;
        }
        nested.iter().map(|b| b.depth as f64).sum::<f64>() / nested.len() as f64
    }
}

/// FunctionDefs of anonymous functions reachable without crossing another block.
fn function_expressions(stmt: &Node) -> Vec<&Node> {
    let mut found = Vec::new();
    let mut stack: Vec<&Node> = stmt.children();
    while let Some(node) = stack.pop() {
        match &node.kind {
            NodeKind::FunctionExp { def, .. } => found.push(def.as_ref()),
            _ => stack.extend(node.children()),
        }
    }
    found.sort_by_key(|n| (n.line, n.col));
    found
}
