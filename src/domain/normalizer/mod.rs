//! AST Normalizer
//!
//! Rewrites a foreign parse tree (already dumped to JSON by an external
//! parser) into the canonical [`Node`] tree. Each front end keeps an explicit
//! table from foreign node kind to canonical constructor.
//!
//! Normalization never fails past this boundary: any error is logged and the
//! empty module is returned in its place.

mod javascript;
mod python;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::domain::ast::{Literal, Node, NodeKind};
use crate::domain::language::Language;
use crate::error::NormalizeError;

pub use javascript::normalize_estree;
pub use python::normalize_python_ast;

type Object = Map<String, Value>;

/// Normalize a foreign AST for `language` into the canonical tree.
pub fn normalize(language: Language, foreign: &Value) -> Node {
    let result = match language {
        Language::Python => normalize_python_ast(foreign),
        Language::JavaScript => normalize_estree(foreign),
    };
    match result {
        Ok(module) => {
            debug!(language = %language, statements = module.body().map_or(0, |b| b.len()), "normalized AST");
            module
        }
        Err(err) => {
            warn!(language = %language, error = %err, "AST normalization failed, using empty module");
            Node::empty_module()
        }
    }
}

/// Normalize a foreign AST given as JSON text.
pub fn normalize_json(language: Language, json: &str) -> Node {
    match serde_json::from_str::<Value>(json) {
        Ok(value) => normalize(language, &value),
        Err(err) => {
            warn!(language = %language, error = %err, "foreign AST is not valid JSON, using empty module");
            Node::empty_module()
        }
    }
}

// ─── shared helpers for the front ends ──────────────────────────────────────

fn as_object(value: &Value) -> Result<&Object, NormalizeError> {
    value.as_object().ok_or(NormalizeError::NotAnObject)
}

fn type_tag<'a>(obj: &'a Object, key: &str) -> Result<&'a str, NormalizeError> {
    obj.get(key)
        .and_then(Value::as_str)
        .ok_or(NormalizeError::MissingType)
}

fn field<'a>(obj: &'a Object, kind: &str, name: &str) -> Result<&'a Value, NormalizeError> {
    match obj.get(name) {
        Some(Value::Null) | None => Err(missing(kind, name)),
        Some(value) => Ok(value),
    }
}

fn optional<'a>(obj: &'a Object, name: &str) -> Option<&'a Value> {
    obj.get(name).filter(|v| !v.is_null())
}

fn str_field<'a>(obj: &'a Object, kind: &str, name: &str) -> Result<&'a str, NormalizeError> {
    field(obj, kind, name)?
        .as_str()
        .ok_or_else(|| missing(kind, name))
}

fn array_field<'a>(obj: &'a Object, kind: &str, name: &str) -> Result<&'a [Value], NormalizeError> {
    match obj.get(name) {
        Some(Value::Array(items)) => Ok(items),
        Some(Value::Null) | None => Ok(&[]),
        Some(_) => Err(missing(kind, name)),
    }
}

fn missing(kind: &str, name: &str) -> NormalizeError {
    NormalizeError::MissingField { kind: kind.to_string(), field: name.to_string() }
}

/// Literal from a JSON scalar. Integral numbers stay integers.
fn literal_from_json(value: &Value) -> Literal {
    match value {
        Value::Null => Literal::None,
        Value::Bool(b) => Literal::Bool(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Literal::Int(i),
            None => Literal::Float(n.as_f64().unwrap_or(0.0)),
        },
        Value::String(s) => Literal::Str(s.clone()),
        other => Literal::Str(other.to_string()),
    }
}

/// Fold a unary sign into a numeric literal. Returns `None` for anything else.
fn fold_sign(negative: bool, operand: &Node) -> Option<Node> {
    let folded = match &operand.kind {
        NodeKind::Constant { value: Literal::Int(i) } => {
            Literal::Int(if negative { i.wrapping_neg() } else { *i })
        }
        NodeKind::Constant { value: Literal::Float(f) } => {
            Literal::Float(if negative { -f } else { *f })
        }
        _ => return None,
    };
    Some(Node::new(NodeKind::Constant { value: folded }, operand.line, operand.col))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_invalid_json_yields_empty_module() {
        let node = normalize_json(Language::Python, "{not json");
        assert!(node.is_empty_module());
    }

    #[test]
    fn test_wrong_root_yields_empty_module() {
        let tree = json!({"_type": "Expr", "value": {"_type": "Name", "id": "x"}});
        assert!(normalize(Language::Python, &tree).is_empty_module());
        let tree = json!({"type": "Identifier", "name": "x"});
        assert!(normalize(Language::JavaScript, &tree).is_empty_module());
    }

    #[test]
    fn test_fold_sign_only_touches_numbers() {
        let five = Node::new(NodeKind::Constant { value: Literal::Int(5) }, 1, 1);
        let folded = fold_sign(true, &five).unwrap();
        assert_eq!(folded.kind, NodeKind::Constant { value: Literal::Int(-5) });
        let name = Node::new(NodeKind::Name { id: "x".into() }, 1, 1);
        assert!(fold_sign(true, &name).is_none());
    }
}
