// Python front end: the `ast` module tree dumped as JSON.
//
// Every node object carries `_type` (the ast class name), its fields by name,
// and `lineno`/`col_offset` where Python provides them. The tree is consumed
// nearly as-is; the only rewrite folds unary signs into numeric literals.

use serde_json::Value;

use super::{array_field, as_object, field, fold_sign, literal_from_json, optional, str_field, type_tag, Object};
use crate::domain::ast::{
    BinOperator, BoolOperator, CmpOperator, Literal, Node, NodeKind, Slice, UnaryOperator,
};
use crate::error::NormalizeError;

type Builder = fn(&Object) -> Result<NodeKind, NormalizeError>;

/// Foreign kind -> canonical constructor.
const PY_KINDS: &[(&str, Builder)] = &[
    ("Module", module),
    ("Expr", expr),
    ("Assign", assign),
    ("AnnAssign", ann_assign),
    ("AugAssign", aug_assign),
    ("If", if_stmt),
    ("For", for_stmt),
    ("While", while_stmt),
    ("FunctionDef", function_def),
    ("Return", return_stmt),
    ("Call", call),
    ("Attribute", attribute),
    ("Name", name),
    ("Constant", constant),
    ("Num", num),
    ("Str", string),
    ("NameConstant", constant),
    ("List", list),
    ("Tuple", list),
    ("Subscript", subscript),
    ("BinOp", bin_op),
    ("BoolOp", bool_op),
    ("Compare", compare),
    ("UnaryOp", unary_op),
    ("Pass", pass),
    ("Break", pass),
    ("Continue", pass),
    ("Import", pass),
    ("ImportFrom", pass),
];

const BIN_OPS: &[(&str, BinOperator)] = &[
    ("Add", BinOperator::Add),
    ("Sub", BinOperator::Sub),
    ("Mult", BinOperator::Mult),
    ("Div", BinOperator::Div),
    ("FloorDiv", BinOperator::FloorDiv),
    ("Mod", BinOperator::Mod),
    ("Pow", BinOperator::Pow),
];

const CMP_OPS: &[(&str, CmpOperator)] = &[
    ("Eq", CmpOperator::Eq),
    ("NotEq", CmpOperator::NotEq),
    ("Lt", CmpOperator::Lt),
    ("LtE", CmpOperator::LtE),
    ("Gt", CmpOperator::Gt),
    ("GtE", CmpOperator::GtE),
    ("In", CmpOperator::In),
    ("NotIn", CmpOperator::NotIn),
    ("Is", CmpOperator::Is),
    ("IsNot", CmpOperator::IsNot),
];

/// Normalize a Python AST dump. The root must be a `Module`.
pub fn normalize_python_ast(tree: &Value) -> Result<Node, NormalizeError> {
    let root = convert(tree)?;
    match root.kind {
        NodeKind::Module { .. } => Ok(root),
        _ => Err(NormalizeError::UnexpectedRoot(root.kind_name().to_string())),
    }
}

fn convert(value: &Value) -> Result<Node, NormalizeError> {
    let obj = as_object(value)?;
    let kind = type_tag(obj, "_type")?;
    let line = obj.get("lineno").and_then(Value::as_u64).unwrap_or(0) as usize;
    let col = obj.get("col_offset").and_then(Value::as_u64).unwrap_or(0) as usize;

    let node_kind = match PY_KINDS.iter().find(|(k, _)| *k == kind) {
        Some((_, build)) => build(obj)?,
        None => NodeKind::Unsupported { kind: kind.to_string() },
    };
    Ok(Node::new(node_kind, line, col))
}

fn boxed(obj: &Object, kind: &str, name: &str) -> Result<Box<Node>, NormalizeError> {
    Ok(Box::new(convert(field(obj, kind, name)?)?))
}

fn nodes(obj: &Object, kind: &str, name: &str) -> Result<Vec<Node>, NormalizeError> {
    array_field(obj, kind, name)?.iter().map(convert).collect()
}

/// Operator fields are nodes like `{"_type": "Add"}`.
fn operator<T: Copy>(obj: &Object, kind: &str, name: &str, table: &[(&str, T)]) -> Result<T, NormalizeError> {
    let tag = type_tag(as_object(field(obj, kind, name)?)?, "_type")?;
    table
        .iter()
        .find(|(k, _)| *k == tag)
        .map(|(_, op)| *op)
        .ok_or_else(|| NormalizeError::MissingField { kind: kind.to_string(), field: format!("{name}={tag}") })
}

fn module(obj: &Object) -> Result<NodeKind, NormalizeError> {
    Ok(NodeKind::Module { body: nodes(obj, "Module", "body")? })
}

fn expr(obj: &Object) -> Result<NodeKind, NormalizeError> {
    Ok(NodeKind::Expr { value: boxed(obj, "Expr", "value")? })
}

fn assign(obj: &Object) -> Result<NodeKind, NormalizeError> {
    Ok(NodeKind::Assign {
        targets: nodes(obj, "Assign", "targets")?,
        value: boxed(obj, "Assign", "value")?,
    })
}

fn ann_assign(obj: &Object) -> Result<NodeKind, NormalizeError> {
    let target = convert(field(obj, "AnnAssign", "target")?)?;
    let value = match optional(obj, "value") {
        Some(v) => convert(v)?,
        None => Node::new(NodeKind::Constant { value: Literal::None }, target.line, target.col),
    };
    Ok(NodeKind::Assign { targets: vec![target], value: Box::new(value) })
}

fn aug_assign(obj: &Object) -> Result<NodeKind, NormalizeError> {
    Ok(NodeKind::AugAssign {
        target: boxed(obj, "AugAssign", "target")?,
        op: operator(obj, "AugAssign", "op", BIN_OPS)?,
        value: boxed(obj, "AugAssign", "value")?,
    })
}

fn if_stmt(obj: &Object) -> Result<NodeKind, NormalizeError> {
    Ok(NodeKind::If {
        test: boxed(obj, "If", "test")?,
        body: nodes(obj, "If", "body")?,
        orelse: nodes(obj, "If", "orelse")?,
    })
}

fn for_stmt(obj: &Object) -> Result<NodeKind, NormalizeError> {
    Ok(NodeKind::For {
        target: boxed(obj, "For", "target")?,
        iter: boxed(obj, "For", "iter")?,
        body: nodes(obj, "For", "body")?,
    })
}

fn while_stmt(obj: &Object) -> Result<NodeKind, NormalizeError> {
    Ok(NodeKind::While {
        test: boxed(obj, "While", "test")?,
        body: nodes(obj, "While", "body")?,
    })
}

fn function_def(obj: &Object) -> Result<NodeKind, NormalizeError> {
    let arguments = as_object(field(obj, "FunctionDef", "args")?)?;
    let params = array_field(arguments, "arguments", "args")?
        .iter()
        .map(|arg| {
            let arg = as_object(arg)?;
            str_field(arg, "arg", "arg").map(str::to_string)
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(NodeKind::FunctionDef {
        name: str_field(obj, "FunctionDef", "name")?.to_string(),
        params,
        body: nodes(obj, "FunctionDef", "body")?,
    })
}

fn return_stmt(obj: &Object) -> Result<NodeKind, NormalizeError> {
    let value = optional(obj, "value").map(convert).transpose()?.map(Box::new);
    Ok(NodeKind::Return { value })
}

fn call(obj: &Object) -> Result<NodeKind, NormalizeError> {
    Ok(NodeKind::Call {
        func: boxed(obj, "Call", "func")?,
        args: nodes(obj, "Call", "args")?,
    })
}

fn attribute(obj: &Object) -> Result<NodeKind, NormalizeError> {
    Ok(NodeKind::Attribute {
        value: boxed(obj, "Attribute", "value")?,
        attr: str_field(obj, "Attribute", "attr")?.to_string(),
    })
}

fn name(obj: &Object) -> Result<NodeKind, NormalizeError> {
    Ok(NodeKind::Name { id: str_field(obj, "Name", "id")?.to_string() })
}

fn constant(obj: &Object) -> Result<NodeKind, NormalizeError> {
    let value = obj.get("value").map(literal_from_json).unwrap_or(Literal::None);
    Ok(NodeKind::Constant { value })
}

fn num(obj: &Object) -> Result<NodeKind, NormalizeError> {
    Ok(NodeKind::Constant { value: literal_from_json(field(obj, "Num", "n")?) })
}

fn string(obj: &Object) -> Result<NodeKind, NormalizeError> {
    Ok(NodeKind::Constant { value: Literal::Str(str_field(obj, "Str", "s")?.to_string()) })
}

fn list(obj: &Object) -> Result<NodeKind, NormalizeError> {
    Ok(NodeKind::List { elts: nodes(obj, "List", "elts")? })
}

fn subscript(obj: &Object) -> Result<NodeKind, NormalizeError> {
    let slice_obj = as_object(field(obj, "Subscript", "slice")?)?;
    let slice = match type_tag(slice_obj, "_type")? {
        // Python < 3.9 wraps plain indexes.
        "Index" => Slice::Index(convert(field(slice_obj, "Index", "value")?)?),
        "Slice" => {
            let part = |key: &str| optional(slice_obj, key).map(convert).transpose();
            Slice::Range { lower: part("lower")?, upper: part("upper")?, step: part("step")? }
        }
        _ => Slice::Index(convert(field(obj, "Subscript", "slice")?)?),
    };
    Ok(NodeKind::Subscript { value: boxed(obj, "Subscript", "value")?, slice: Box::new(slice) })
}

fn bin_op(obj: &Object) -> Result<NodeKind, NormalizeError> {
    Ok(NodeKind::BinOp {
        left: boxed(obj, "BinOp", "left")?,
        op: operator(obj, "BinOp", "op", BIN_OPS)?,
        right: boxed(obj, "BinOp", "right")?,
    })
}

fn bool_op(obj: &Object) -> Result<NodeKind, NormalizeError> {
    let op = operator(obj, "BoolOp", "op", &[("And", BoolOperator::And), ("Or", BoolOperator::Or)])?;
    Ok(NodeKind::BoolOp { op, values: nodes(obj, "BoolOp", "values")? })
}

fn compare(obj: &Object) -> Result<NodeKind, NormalizeError> {
    let ops = array_field(obj, "Compare", "ops")?
        .iter()
        .map(|op| {
            let tag = type_tag(as_object(op)?, "_type")?;
            CMP_OPS
                .iter()
                .find(|(k, _)| *k == tag)
                .map(|(_, op)| *op)
                .ok_or_else(|| NormalizeError::MissingField { kind: "Compare".into(), field: format!("ops={tag}") })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(NodeKind::Compare {
        left: boxed(obj, "Compare", "left")?,
        ops,
        comparators: nodes(obj, "Compare", "comparators")?,
    })
}

fn unary_op(obj: &Object) -> Result<NodeKind, NormalizeError> {
    let op = operator(
        obj,
        "UnaryOp",
        "op",
        &[
            ("Not", UnaryOperator::Not),
            ("USub", UnaryOperator::USub),
            ("UAdd", UnaryOperator::UAdd),
            ("Invert", UnaryOperator::Invert),
        ],
    )?;
    let operand = convert(field(obj, "UnaryOp", "operand")?)?;
    match op {
        UnaryOperator::USub | UnaryOperator::UAdd => {
            // A sign on anything but a number literal is dropped.
            let negative = op == UnaryOperator::USub;
            Ok(fold_sign(negative, &operand).map_or(operand.kind, |n| n.kind))
        }
        _ => Ok(NodeKind::UnaryOp { op, operand: Box::new(operand) }),
    }
}

fn pass(_obj: &Object) -> Result<NodeKind, NormalizeError> {
    Ok(NodeKind::Pass)
}
