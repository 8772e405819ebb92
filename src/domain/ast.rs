// Canonical AST shared by both student languages.
// Each front end in `normalizer` rewrites its foreign tree into these nodes.

use serde::Serialize;

/// A node in the canonical syntax tree, with its 1-based source line and 0-based column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub kind: NodeKind,
    pub line: usize,
    pub col: usize,
}

/// Node kinds (closed set; new foreign constructs map onto one of these).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum NodeKind {
    Module { body: Vec<Node> },
    /// Expression used as a statement.
    Expr { value: Box<Node> },
    Assign { targets: Vec<Node>, value: Box<Node> },
    AugAssign { target: Box<Node>, op: BinOperator, value: Box<Node> },
    If { test: Box<Node>, body: Vec<Node>, orelse: Vec<Node> },
    /// Iteration over a sequence or range.
    For { target: Box<Node>, iter: Box<Node>, body: Vec<Node> },
    /// Counted loop with an explicit init/test/update triple.
    JsFor {
        init: Option<Box<Node>>,
        test: Option<Box<Node>>,
        update: Option<Box<Node>>,
        body: Vec<Node>,
    },
    While { test: Box<Node>, body: Vec<Node> },
    FunctionDef { name: String, params: Vec<String>, body: Vec<Node> },
    /// Anonymous function; `def` is the synthetic FunctionDef named after its position.
    FunctionExp { name: String, def: Box<Node> },
    Return { value: Option<Box<Node>> },
    Call { func: Box<Node>, args: Vec<Node> },
    Attribute { value: Box<Node>, attr: String },
    Name { id: String },
    Constant { value: Literal },
    List { elts: Vec<Node> },
    Subscript { value: Box<Node>, slice: Box<Slice> },
    BinOp { left: Box<Node>, op: BinOperator, right: Box<Node> },
    BoolOp { op: BoolOperator, values: Vec<Node> },
    Compare { left: Box<Node>, ops: Vec<CmpOperator>, comparators: Vec<Node> },
    UnaryOp { op: UnaryOperator, operand: Box<Node> },
    /// Statements with no analytic content (pass, break, continue, imports).
    Pass,
    /// Foreign construct with no canonical counterpart.
    Unsupported { kind: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value")]
pub enum Literal {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Slice {
    Index(Node),
    Range {
        lower: Option<Node>,
        upper: Option<Node>,
        step: Option<Node>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BinOperator {
    Add,
    Sub,
    Mult,
    Div,
    FloorDiv,
    Mod,
    Pow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BoolOperator {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CmpOperator {
    Eq,
    NotEq,
    Lt,
    LtE,
    Gt,
    GtE,
    In,
    NotIn,
    Is,
    IsNot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UnaryOperator {
    Not,
    USub,
    UAdd,
    Invert,
}

impl Node {
    pub fn new(kind: NodeKind, line: usize, col: usize) -> Self {
        Self { kind, line, col }
    }

    /// The "no program" tree returned when a script cannot be normalized.
    pub fn empty_module() -> Self {
        Self::new(NodeKind::Module { body: Vec::new() }, 0, 0)
    }

    pub fn is_empty_module(&self) -> bool {
        matches!(&self.kind, NodeKind::Module { body } if body.is_empty())
    }

    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            NodeKind::Module { .. } => "Module",
            NodeKind::Expr { .. } => "Expr",
            NodeKind::Assign { .. } => "Assign",
            NodeKind::AugAssign { .. } => "AugAssign",
            NodeKind::If { .. } => "If",
            NodeKind::For { .. } => "For",
            NodeKind::JsFor { .. } => "JSFor",
            NodeKind::While { .. } => "While",
            NodeKind::FunctionDef { .. } => "FunctionDef",
            NodeKind::FunctionExp { .. } => "FunctionExp",
            NodeKind::Return { .. } => "Return",
            NodeKind::Call { .. } => "Call",
            NodeKind::Attribute { .. } => "Attribute",
            NodeKind::Name { .. } => "Name",
            NodeKind::Constant { .. } => "Constant",
            NodeKind::List { .. } => "List",
            NodeKind::Subscript { .. } => "Subscript",
            NodeKind::BinOp { .. } => "BinOp",
            NodeKind::BoolOp { .. } => "BoolOp",
            NodeKind::Compare { .. } => "Compare",
            NodeKind::UnaryOp { .. } => "UnaryOp",
            NodeKind::Pass => "Pass",
            NodeKind::Unsupported { .. } => "Unsupported",
        }
    }

    /// Statement body of block nodes (module, function, loops, if-branch).
    pub fn body(&self) -> Option<&[Node]> {
        match &self.kind {
            NodeKind::Module { body }
            | NodeKind::If { body, .. }
            | NodeKind::For { body, .. }
            | NodeKind::JsFor { body, .. }
            | NodeKind::While { body, .. }
            | NodeKind::FunctionDef { body, .. } => Some(body),
            _ => None,
        }
    }

    pub fn is_loop(&self) -> bool {
        matches!(
            &self.kind,
            NodeKind::For { .. } | NodeKind::JsFor { .. } | NodeKind::While { .. }
        )
    }

    /// Identifier of a `Name` node.
    pub fn name_id(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Name { id } => Some(id),
            _ => None,
        }
    }

    /// Name being called: the identifier for `f(...)`, the attribute for `x.f(...)`.
    pub fn call_name(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Call { func, .. } => match &func.kind {
                NodeKind::Name { id } => Some(id),
                NodeKind::Attribute { attr, .. } => Some(attr),
                _ => None,
            },
            _ => None,
        }
    }

    /// Direct children in source order.
    pub fn children(&self) -> Vec<&Node> {
        let mut out: Vec<&Node> = Vec::new();
        match &self.kind {
            NodeKind::Module { body } => out.extend(body.iter()),
            NodeKind::Expr { value } => out.push(value),
            NodeKind::Assign { targets, value } => {
                out.extend(targets.iter());
                out.push(value);
            }
            NodeKind::AugAssign { target, value, .. } => {
                out.push(target);
                out.push(value);
            }
            NodeKind::If { test, body, orelse } => {
                out.push(test);
                out.extend(body.iter());
                out.extend(orelse.iter());
            }
            NodeKind::For { target, iter, body } => {
                out.push(target);
                out.push(iter);
                out.extend(body.iter());
            }
            NodeKind::JsFor { init, test, update, body } => {
                out.extend(init.iter().map(|n| n.as_ref()));
                out.extend(test.iter().map(|n| n.as_ref()));
                out.extend(update.iter().map(|n| n.as_ref()));
                out.extend(body.iter());
            }
            NodeKind::While { test, body } => {
                out.push(test);
                out.extend(body.iter());
            }
            NodeKind::FunctionDef { body, .. } => out.extend(body.iter()),
            NodeKind::FunctionExp { def, .. } => out.push(def),
            NodeKind::Return { value } => out.extend(value.iter().map(|n| n.as_ref())),
            NodeKind::Call { func, args } => {
                out.push(func);
                out.extend(args.iter());
            }
            NodeKind::Attribute { value, .. } => out.push(value),
            NodeKind::List { elts } => out.extend(elts.iter()),
            NodeKind::Subscript { value, slice } => {
                out.push(value);
                match slice.as_ref() {
                    Slice::Index(index) => out.push(index),
                    Slice::Range { lower, upper, step } => {
                        out.extend(lower.iter());
                        out.extend(upper.iter());
                        out.extend(step.iter());
                    }
                }
            }
            NodeKind::BinOp { left, right, .. } => {
                out.push(left);
                out.push(right);
            }
            NodeKind::BoolOp { values, .. } => out.extend(values.iter()),
            NodeKind::Compare { left, comparators, .. } => {
                out.push(left);
                out.extend(comparators.iter());
            }
            NodeKind::UnaryOp { operand, .. } => out.push(operand),
            NodeKind::Name { .. }
            | NodeKind::Constant { .. }
            | NodeKind::Pass
            | NodeKind::Unsupported { .. } => {}
        }
        out
    }

    /// Pre-order traversal over this node and all descendants.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a Node)) {
        visit(self);
        for child in self.children() {
            child.walk(visit);
        }
    }

    /// Highest source line covered by this node.
    pub fn last_line(&self) -> usize {
        let mut last = self.line;
        self.walk(&mut |n| {
            if n.line > last {
                last = n.line;
            }
        });
        last
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(id: &str, line: usize) -> Node {
        Node::new(NodeKind::Name { id: id.to_string() }, line, 0)
    }

    #[test]
    fn test_last_line_covers_nested_body() {
        let call = Node::new(
            NodeKind::Call { func: Box::new(name("fitMedia", 3)), args: vec![] },
            3,
            4,
        );
        let stmt = Node::new(NodeKind::Expr { value: Box::new(call) }, 3, 4);
        let loop_node = Node::new(
            NodeKind::For {
                target: Box::new(name("i", 1)),
                iter: Box::new(name("items", 1)),
                body: vec![stmt],
            },
            1,
            0,
        );
        assert_eq!(loop_node.last_line(), 3);
        assert!(loop_node.is_loop());
    }

    #[test]
    fn test_call_name_for_method_call() {
        let attr = Node::new(
            NodeKind::Attribute { value: Box::new(name("beats", 2)), attr: "append".to_string() },
            2,
            0,
        );
        let call = Node::new(NodeKind::Call { func: Box::new(attr), args: vec![] }, 2, 0);
        assert_eq!(call.call_name(), Some("append"));
    }

    #[test]
    fn test_empty_module() {
        assert!(Node::empty_module().is_empty_module());
    }
}
