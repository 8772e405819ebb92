// JavaScript front end: ESTree JSON with `loc` positions (acorn `--locations`).
//
// Every ESTree node is rewritten into canonical nodes. Some foreign kinds
// lower to zero or several canonical statements (empty statements, blocks,
// multi-declarator `var`), so builders return a list.

use serde_json::Value;

use super::{array_field, as_object, field, fold_sign, literal_from_json, optional, str_field, type_tag, Object};
use crate::domain::ast::{
    BinOperator, BoolOperator, CmpOperator, Literal, Node, NodeKind, Slice, UnaryOperator,
};
use crate::domain::language::{JS_BUILT_IN_OBJECTS, JS_LIST_FUNCS, JS_STR_FUNCS};
use crate::error::NormalizeError;

#[derive(Debug, Clone, Copy)]
struct Pos {
    line: usize,
    col: usize,
}

impl Pos {
    fn node(self, kind: NodeKind) -> Node {
        Node::new(kind, self.line, self.col)
    }
}

type Builder = fn(&Object, Pos) -> Result<Vec<Node>, NormalizeError>;

/// Foreign kind -> canonical constructor.
const JS_KINDS: &[(&str, Builder)] = &[
    ("Program", program),
    ("ExpressionStatement", expression_statement),
    ("BlockStatement", block),
    ("EmptyStatement", empty),
    ("VariableDeclaration", variable_declaration),
    ("ForStatement", for_statement),
    ("ForInStatement", for_each_statement),
    ("ForOfStatement", for_each_statement),
    ("WhileStatement", while_statement),
    ("DoWhileStatement", while_statement),
    ("IfStatement", if_statement),
    ("FunctionDeclaration", function_declaration),
    ("FunctionExpression", function_expression),
    ("ArrowFunctionExpression", function_expression),
    ("ReturnStatement", return_statement),
    ("CallExpression", call_expression),
    ("MemberExpression", member_expression),
    ("BinaryExpression", binary_expression),
    ("LogicalExpression", logical_expression),
    ("UnaryExpression", unary_expression),
    ("UpdateExpression", update_expression),
    ("AssignmentExpression", assignment_expression),
    ("Literal", literal),
    ("Identifier", identifier),
    ("ArrayExpression", array_expression),
    ("BreakStatement", empty_pass),
    ("ContinueStatement", empty_pass),
];

const BIN_OPS: &[(&str, BinOperator)] = &[
    ("+", BinOperator::Add),
    ("-", BinOperator::Sub),
    ("*", BinOperator::Mult),
    ("/", BinOperator::Div),
    ("%", BinOperator::Mod),
    ("**", BinOperator::Pow),
];

const CMP_OPS: &[(&str, CmpOperator)] = &[
    ("==", CmpOperator::Eq),
    ("===", CmpOperator::Eq),
    ("!=", CmpOperator::NotEq),
    ("!==", CmpOperator::NotEq),
    ("<", CmpOperator::Lt),
    ("<=", CmpOperator::LtE),
    (">", CmpOperator::Gt),
    (">=", CmpOperator::GtE),
    ("in", CmpOperator::In),
    ("instanceof", CmpOperator::Is),
];

const ASSIGN_OPS: &[(&str, BinOperator)] = &[
    ("+=", BinOperator::Add),
    ("-=", BinOperator::Sub),
    ("*=", BinOperator::Mult),
    ("/=", BinOperator::Div),
    ("%=", BinOperator::Mod),
    ("**=", BinOperator::Pow),
];

/// Normalize an ESTree `Program` into a canonical module.
pub fn normalize_estree(tree: &Value) -> Result<Node, NormalizeError> {
    let root = convert_expr(tree)?;
    match root.kind {
        NodeKind::Module { .. } => Ok(root),
        _ => Err(NormalizeError::UnexpectedRoot(root.kind_name().to_string())),
    }
}

fn position(obj: &Object) -> Pos {
    let start = obj.get("loc").and_then(|loc| loc.get("start"));
    let get = |key: &str| start.and_then(|s| s.get(key)).and_then(Value::as_u64).unwrap_or(0) as usize;
    Pos { line: get("line"), col: get("column") }
}

fn convert(value: &Value) -> Result<Vec<Node>, NormalizeError> {
    let obj = as_object(value)?;
    let kind = type_tag(obj, "type")?;
    let pos = position(obj);
    match JS_KINDS.iter().find(|(k, _)| *k == kind) {
        Some((_, build)) => build(obj, pos),
        None => Ok(vec![pos.node(NodeKind::Unsupported { kind: kind.to_string() })]),
    }
}

/// Convert a node that must lower to exactly one canonical node.
fn convert_expr(value: &Value) -> Result<Node, NormalizeError> {
    let mut nodes = convert(value)?;
    if nodes.len() != 1 {
        let kind = value.get("type").and_then(Value::as_str).unwrap_or("?");
        return Err(NormalizeError::NotAnExpression(kind.to_string()));
    }
    Ok(nodes.remove(0))
}

fn expr_field(obj: &Object, kind: &str, name: &str) -> Result<Box<Node>, NormalizeError> {
    Ok(Box::new(convert_expr(field(obj, kind, name)?)?))
}

fn optional_expr(obj: &Object, name: &str) -> Result<Option<Box<Node>>, NormalizeError> {
    optional(obj, name).map(|v| convert_expr(v).map(Box::new)).transpose()
}

/// Statement list from a body that may be a block or a single statement.
fn statements(value: Option<&Value>) -> Result<Vec<Node>, NormalizeError> {
    match value {
        Some(v) => convert(v),
        None => Ok(Vec::new()),
    }
}

fn statement_list(items: &[Value]) -> Result<Vec<Node>, NormalizeError> {
    let mut out = Vec::new();
    for item in items {
        out.extend(convert(item)?);
    }
    Ok(out)
}

fn program(obj: &Object, pos: Pos) -> Result<Vec<Node>, NormalizeError> {
    let body = statement_list(array_field(obj, "Program", "body")?)?;
    Ok(vec![pos.node(NodeKind::Module { body })])
}

fn expression_statement(obj: &Object, pos: Pos) -> Result<Vec<Node>, NormalizeError> {
    let expression = field(obj, "ExpressionStatement", "expression")?;
    let inner = type_tag(as_object(expression)?, "type")?;
    // Assignments and updates are statements in the canonical tree.
    if matches!(inner, "AssignmentExpression" | "UpdateExpression") {
        return convert(expression);
    }
    Ok(vec![pos.node(NodeKind::Expr { value: Box::new(convert_expr(expression)?) })])
}

fn block(obj: &Object, _pos: Pos) -> Result<Vec<Node>, NormalizeError> {
    statement_list(array_field(obj, "BlockStatement", "body")?)
}

fn empty(_obj: &Object, _pos: Pos) -> Result<Vec<Node>, NormalizeError> {
    Ok(Vec::new())
}

fn empty_pass(_obj: &Object, pos: Pos) -> Result<Vec<Node>, NormalizeError> {
    Ok(vec![pos.node(NodeKind::Pass)])
}

fn variable_declaration(obj: &Object, _pos: Pos) -> Result<Vec<Node>, NormalizeError> {
    array_field(obj, "VariableDeclaration", "declarations")?
        .iter()
        .map(|decl| {
            let decl = as_object(decl)?;
            let pos = position(decl);
            let target = convert_expr(field(decl, "VariableDeclarator", "id")?)?;
            let value = match optional(decl, "init") {
                Some(init) => convert_expr(init)?,
                None => pos.node(NodeKind::Constant { value: Literal::None }),
            };
            Ok(pos.node(NodeKind::Assign { targets: vec![target], value: Box::new(value) }))
        })
        .collect()
}

fn for_statement(obj: &Object, pos: Pos) -> Result<Vec<Node>, NormalizeError> {
    // `for (var i = 0, j = 1; ...)`: the first declarator is the loop init,
    // later ones are emitted as plain assignments ahead of the loop.
    let mut lowered = Vec::new();
    let init = match optional(obj, "init") {
        Some(v) => {
            let mut nodes = convert(v)?.into_iter();
            let first = nodes.next().map(Box::new);
            lowered.extend(nodes);
            first
        }
        None => None,
    };
    let update = match optional(obj, "update") {
        Some(v) => convert(v)?.into_iter().next().map(Box::new),
        None => None,
    };
    lowered.push(pos.node(NodeKind::JsFor {
        init,
        test: optional_expr(obj, "test")?,
        update,
        body: statements(obj.get("body"))?,
    }));
    Ok(lowered)
}

fn for_each_statement(obj: &Object, pos: Pos) -> Result<Vec<Node>, NormalizeError> {
    let left = as_object(field(obj, "ForOfStatement", "left")?)?;
    let target = if type_tag(left, "type")? == "VariableDeclaration" {
        let first = array_field(left, "VariableDeclaration", "declarations")?
            .first()
            .ok_or_else(|| super::missing("VariableDeclaration", "declarations"))?;
        convert_expr(field(as_object(first)?, "VariableDeclarator", "id")?)?
    } else {
        convert_expr(field(obj, "ForOfStatement", "left")?)?
    };
    Ok(vec![pos.node(NodeKind::For {
        target: Box::new(target),
        iter: expr_field(obj, "ForOfStatement", "right")?,
        body: statements(obj.get("body"))?,
    })])
}

fn while_statement(obj: &Object, pos: Pos) -> Result<Vec<Node>, NormalizeError> {
    Ok(vec![pos.node(NodeKind::While {
        test: expr_field(obj, "WhileStatement", "test")?,
        body: statements(obj.get("body"))?,
    })])
}

fn if_statement(obj: &Object, pos: Pos) -> Result<Vec<Node>, NormalizeError> {
    Ok(vec![pos.node(NodeKind::If {
        test: expr_field(obj, "IfStatement", "test")?,
        body: statements(obj.get("consequent"))?,
        orelse: statements(optional(obj, "alternate"))?,
    })])
}

fn param_names(obj: &Object) -> Result<Vec<String>, NormalizeError> {
    array_field(obj, "Function", "params")?
        .iter()
        .map(|param| {
            let param = as_object(param)?;
            let named = match type_tag(param, "type")? {
                "AssignmentPattern" => as_object(field(param, "AssignmentPattern", "left")?)?,
                _ => param,
            };
            Ok(named.get("name").and_then(Value::as_str).unwrap_or("_").to_string())
        })
        .collect()
}

fn function_body(obj: &Object) -> Result<Vec<Node>, NormalizeError> {
    let body = field(obj, "Function", "body")?;
    if obj.get("expression").and_then(Value::as_bool).unwrap_or(false) {
        // Arrow function with an expression body returns it.
        let value = convert_expr(body)?;
        let pos = Pos { line: value.line, col: value.col };
        return Ok(vec![pos.node(NodeKind::Return { value: Some(Box::new(value)) })]);
    }
    convert(body)
}

fn function_declaration(obj: &Object, pos: Pos) -> Result<Vec<Node>, NormalizeError> {
    let id = as_object(field(obj, "FunctionDeclaration", "id")?)?;
    Ok(vec![pos.node(NodeKind::FunctionDef {
        name: str_field(id, "Identifier", "name")?.to_string(),
        params: param_names(obj)?,
        body: function_body(obj)?,
    })])
}

fn function_expression(obj: &Object, pos: Pos) -> Result<Vec<Node>, NormalizeError> {
    let name = optional(obj, "id")
        .and_then(|id| id.get("name"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("{}|{}", pos.line, pos.col));
    let def = pos.node(NodeKind::FunctionDef {
        name: name.clone(),
        params: param_names(obj)?,
        body: function_body(obj)?,
    });
    Ok(vec![pos.node(NodeKind::FunctionExp { name, def: Box::new(def) })])
}

fn return_statement(obj: &Object, pos: Pos) -> Result<Vec<Node>, NormalizeError> {
    Ok(vec![pos.node(NodeKind::Return { value: optional_expr(obj, "argument")? })])
}

fn call_expression(obj: &Object, pos: Pos) -> Result<Vec<Node>, NormalizeError> {
    let callee = as_object(field(obj, "CallExpression", "callee")?)?;
    let args = array_field(obj, "CallExpression", "arguments")?
        .iter()
        .map(convert_expr)
        .collect::<Result<Vec<_>, _>>()?;

    // Static methods of built-in objects are plain calls by property name.
    // Any other member callee is a list/string method or indexing.
    let builtin_method = if type_tag(callee, "type")? == "MemberExpression" && !is_computed(callee) {
        let on_builtin = field(callee, "MemberExpression", "object")?
            .get("name")
            .and_then(Value::as_str)
            .is_some_and(|n| JS_BUILT_IN_OBJECTS.contains(&n));
        if on_builtin {
            let property = as_object(field(callee, "MemberExpression", "property")?)?;
            let method = str_field(property, "Identifier", "name")?;
            Some(position(property).node(NodeKind::Name { id: method.to_string() }))
        } else {
            None
        }
    } else {
        None
    };
    let func = match builtin_method {
        Some(name) => name,
        None => convert_expr(field(obj, "CallExpression", "callee")?)?,
    };
    Ok(vec![pos.node(NodeKind::Call { func: Box::new(func), args })])
}

fn is_computed(member: &Object) -> bool {
    member.get("computed").and_then(Value::as_bool).unwrap_or(false)
}

fn member_expression(obj: &Object, pos: Pos) -> Result<Vec<Node>, NormalizeError> {
    let value = expr_field(obj, "MemberExpression", "object")?;
    let property = field(obj, "MemberExpression", "property")?;
    if is_computed(obj) {
        let index = convert_expr(property)?;
        return Ok(vec![pos.node(NodeKind::Subscript { value, slice: Box::new(Slice::Index(index)) })]);
    }
    let prop_obj = as_object(property)?;
    let name = str_field(prop_obj, "Identifier", "name")?;
    if JS_LIST_FUNCS.contains(&name) || JS_STR_FUNCS.contains(&name) {
        return Ok(vec![pos.node(NodeKind::Attribute { value, attr: name.to_string() })]);
    }
    let key = position(prop_obj).node(NodeKind::Constant { value: Literal::Str(name.to_string()) });
    Ok(vec![pos.node(NodeKind::Subscript { value, slice: Box::new(Slice::Index(key)) })])
}

fn binary_expression(obj: &Object, pos: Pos) -> Result<Vec<Node>, NormalizeError> {
    let operator = str_field(obj, "BinaryExpression", "operator")?;
    let left = expr_field(obj, "BinaryExpression", "left")?;
    let right = convert_expr(field(obj, "BinaryExpression", "right")?)?;
    let kind = if let Some((_, op)) = BIN_OPS.iter().find(|(k, _)| *k == operator) {
        NodeKind::BinOp { left, op: *op, right: Box::new(right) }
    } else if let Some((_, op)) = CMP_OPS.iter().find(|(k, _)| *k == operator) {
        NodeKind::Compare { left, ops: vec![*op], comparators: vec![right] }
    } else {
        NodeKind::Unsupported { kind: format!("BinaryExpression({operator})") }
    };
    Ok(vec![pos.node(kind)])
}

fn logical_expression(obj: &Object, pos: Pos) -> Result<Vec<Node>, NormalizeError> {
    let op = match str_field(obj, "LogicalExpression", "operator")? {
        "&&" => BoolOperator::And,
        _ => BoolOperator::Or,
    };
    let values = vec![
        convert_expr(field(obj, "LogicalExpression", "left")?)?,
        convert_expr(field(obj, "LogicalExpression", "right")?)?,
    ];
    Ok(vec![pos.node(NodeKind::BoolOp { op, values })])
}

fn unary_expression(obj: &Object, pos: Pos) -> Result<Vec<Node>, NormalizeError> {
    let operator = str_field(obj, "UnaryExpression", "operator")?;
    let operand = convert_expr(field(obj, "UnaryExpression", "argument")?)?;
    let op = match operator {
        "!" => UnaryOperator::Not,
        "-" => UnaryOperator::USub,
        "+" => UnaryOperator::UAdd,
        "~" => UnaryOperator::Invert,
        other => {
            return Ok(vec![pos.node(NodeKind::Unsupported { kind: format!("UnaryExpression({other})") })]);
        }
    };
    if matches!(op, UnaryOperator::USub | UnaryOperator::UAdd) {
        if let Some(folded) = fold_sign(op == UnaryOperator::USub, &operand) {
            return Ok(vec![pos.node(folded.kind)]);
        }
    }
    Ok(vec![pos.node(NodeKind::UnaryOp { op, operand: Box::new(operand) })])
}

fn update_expression(obj: &Object, pos: Pos) -> Result<Vec<Node>, NormalizeError> {
    let op = match str_field(obj, "UpdateExpression", "operator")? {
        "--" => BinOperator::Sub,
        _ => BinOperator::Add,
    };
    let target = expr_field(obj, "UpdateExpression", "argument")?;
    let one = pos.node(NodeKind::Constant { value: Literal::Int(1) });
    Ok(vec![pos.node(NodeKind::AugAssign { target, op, value: Box::new(one) })])
}

fn assignment_expression(obj: &Object, pos: Pos) -> Result<Vec<Node>, NormalizeError> {
    let operator = str_field(obj, "AssignmentExpression", "operator")?;
    let target = convert_expr(field(obj, "AssignmentExpression", "left")?)?;
    let value = expr_field(obj, "AssignmentExpression", "right")?;
    let kind = if operator == "=" {
        NodeKind::Assign { targets: vec![target], value }
    } else if let Some((_, op)) = ASSIGN_OPS.iter().find(|(k, _)| *k == operator) {
        NodeKind::AugAssign { target: Box::new(target), op: *op, value }
    } else {
        NodeKind::Unsupported { kind: format!("AssignmentExpression({operator})") }
    };
    Ok(vec![pos.node(kind)])
}

fn literal(obj: &Object, pos: Pos) -> Result<Vec<Node>, NormalizeError> {
    if obj.contains_key("regex") {
        return Ok(vec![pos.node(NodeKind::Unsupported { kind: "RegExpLiteral".to_string() })]);
    }
    let value = obj.get("value").map(literal_from_json).unwrap_or(Literal::None);
    // JSON loses the distinction between `4` and `4.0`; the raw text keeps it.
    let raw = obj.get("raw").and_then(Value::as_str).unwrap_or("");
    let is_float_text = raw.contains('.') || (!raw.starts_with("0x") && raw.contains(['e', 'E']));
    let value = match value {
        Literal::Int(i) if is_float_text => Literal::Float(i as f64),
        other => other,
    };
    Ok(vec![pos.node(NodeKind::Constant { value })])
}

fn identifier(obj: &Object, pos: Pos) -> Result<Vec<Node>, NormalizeError> {
    Ok(vec![pos.node(NodeKind::Name { id: str_field(obj, "Identifier", "name")?.to_string() })])
}

fn array_expression(obj: &Object, pos: Pos) -> Result<Vec<Node>, NormalizeError> {
    let elts = array_field(obj, "ArrayExpression", "elements")?
        .iter()
        .filter(|e| !e.is_null())
        .map(convert_expr)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(vec![pos.node(NodeKind::List { elts })])
}
