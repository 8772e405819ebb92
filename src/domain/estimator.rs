//! Symbolic Type Estimator
//!
//! Best-effort inference of a value's coarse type, or of the sample it names,
//! from its defining expression. Inference is approximate: anything that
//! cannot be resolved confidently is [`TypeLabel::Unknown`].

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use crate::config::{AnalyzerConfig, ReturnType};
use crate::domain::ast::{Literal, Node, NodeKind, UnaryOperator};
use crate::domain::registry::{Assignment, Registries};
use crate::domain::structure::StructureTree;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TypeLabel {
    Int,
    Float,
    Str,
    List,
    Bool,
    /// A user function, or the value of calling one whose result is unresolved.
    Function,
    /// A known sound key.
    Sample(String),
    Unknown,
}

impl TypeLabel {
    /// Short name; empty for unknown.
    pub fn as_str(&self) -> &str {
        match self {
            TypeLabel::Int => "int",
            TypeLabel::Float => "float",
            TypeLabel::Str => "str",
            TypeLabel::List => "list",
            TypeLabel::Bool => "bool",
            TypeLabel::Function => "function",
            TypeLabel::Sample(name) => name,
            TypeLabel::Unknown => "",
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, TypeLabel::Unknown)
    }
}

impl fmt::Display for TypeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<ReturnType> for TypeLabel {
    fn from(value: ReturnType) -> Self {
        match value {
            ReturnType::Int => TypeLabel::Int,
            ReturnType::Float => TypeLabel::Float,
            ReturnType::Str => TypeLabel::Str,
            ReturnType::List => TypeLabel::List,
            ReturnType::Bool => TypeLabel::Bool,
        }
    }
}

/// Nodes are identified by position and kind inside one tree.
type VisitKey = (usize, usize, &'static str);

pub struct TypeEstimator<'a> {
    config: &'a AnalyzerConfig,
    registries: &'a Registries,
    structure: &'a StructureTree,
}

impl<'a> TypeEstimator<'a> {
    pub fn new(config: &'a AnalyzerConfig, registries: &'a Registries, structure: &'a StructureTree) -> Self {
        Self { config, registries, structure }
    }

    pub fn estimate(&self, node: &Node) -> TypeLabel {
        let mut visited = HashSet::new();
        self.estimate_in(node, &mut visited)
    }

    fn estimate_in(&self, node: &Node, visited: &mut HashSet<VisitKey>) -> TypeLabel {
        match &node.kind {
            NodeKind::Constant { value } => match value {
                Literal::Int(_) => TypeLabel::Int,
                Literal::Float(_) => TypeLabel::Float,
                Literal::Str(_) => TypeLabel::Str,
                Literal::Bool(_) => TypeLabel::Bool,
                Literal::None => TypeLabel::Unknown,
            },
            NodeKind::List { .. } => TypeLabel::List,
            NodeKind::BoolOp { .. } | NodeKind::Compare { .. } => TypeLabel::Bool,
            NodeKind::UnaryOp { op: UnaryOperator::Not, .. } => TypeLabel::Bool,
            NodeKind::UnaryOp { operand, .. } => self.estimate_in(operand, visited),
            NodeKind::BinOp { left, right, .. } => {
                let left = self.estimate_in(left, visited);
                let right = self.estimate_in(right, visited);
                if left == right { left } else { TypeLabel::Unknown }
            }
            NodeKind::AugAssign { value, .. } => self.estimate_in(value, visited),
            NodeKind::FunctionExp { .. } | NodeKind::FunctionDef { .. } => TypeLabel::Function,
            NodeKind::For { iter, .. } => {
                if iter.call_name() == Some("range") {
                    TypeLabel::Int
                } else {
                    TypeLabel::Unknown
                }
            }
            NodeKind::Name { id } => self.estimate_name(id, node.line, visited),
            NodeKind::Call { .. } => self.estimate_call(node, visited),
            _ => TypeLabel::Unknown,
        }
    }

    fn estimate_name(&self, id: &str, line: usize, visited: &mut HashSet<VisitKey>) -> TypeLabel {
        if self.registries.is_user_function(id) {
            return TypeLabel::Function;
        }
        if self.config.is_sound_name(id) {
            return TypeLabel::Sample(id.to_string());
        }
        let Some(var) = self.registries.variable(id) else {
            return if self.is_platform_constant(id) {
                TypeLabel::Sample(id.to_string())
            } else {
                TypeLabel::Unknown
            };
        };

        let use_block = self.structure.enclosing(line);
        let mut candidates: Vec<&Assignment> = var
            .assignments
            .iter()
            .filter(|a| a.line < line)
            .filter(|a| !self.in_uncalled_function(a.line))
            .filter(|a| self.structure.is_ancestor_or_self(a.block, use_block))
            .collect();
        candidates.sort_by_key(|a| a.line);

        for assignment in candidates.into_iter().rev() {
            let key = visit_key(&assignment.value);
            if !visited.insert(key) {
                continue;
            }
            return self.estimate_in(&assignment.value, visited);
        }
        TypeLabel::Unknown
    }

    fn estimate_call(&self, call: &Node, visited: &mut HashSet<VisitKey>) -> TypeLabel {
        let Some(name) = call.call_name() else {
            return TypeLabel::Unknown;
        };
        if let Some(returns) = self.config.builtin_return(name) {
            return returns.into();
        }
        let Some(function) = self.registries.function(name) else {
            return TypeLabel::Unknown;
        };
        for value in &function.return_values {
            if !visited.insert(visit_key(value)) {
                continue;
            }
            let label = self.estimate_in(value, visited);
            if !label.is_unknown() {
                return label;
            }
        }
        TypeLabel::Unknown
    }

    fn in_uncalled_function(&self, line: usize) -> bool {
        self.registries
            .functions
            .values()
            .any(|f| !f.is_called() && f.contains_line(line))
    }

    /// Unbound all-caps identifiers are sound constants when no catalog is configured.
    fn is_platform_constant(&self, id: &str) -> bool {
        self.config.sounds.is_empty()
            && id.contains('_')
            && id.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
            && !self.config.is_builtin_name(id)
    }
}

fn visit_key(node: &Node) -> VisitKey {
    (node.line, node.col, node.kind_name())
}
