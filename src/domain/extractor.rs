//! Complexity Feature Extractor
//!
//! Walks a canonical module and produces the leveled [`CodeFeatures`], the
//! structural block tree and the symbol registries. Every call builds a fresh
//! context, so nothing leaks between analyses of different projects.
//!
//! Extraction never fails outward: an inconsistency is logged and the zeroed
//! analysis is returned instead.

use serde::Serialize;
use tracing::{debug, warn};

use crate::config::AnalyzerConfig;
use crate::domain::ast::{BinOperator, Literal, Node, NodeKind};
use crate::domain::estimator::{TypeEstimator, TypeLabel};
use crate::domain::features::CodeFeatures;
use crate::domain::language::Language;
use crate::domain::registry::{ApiCall, Assignment, FunctionRecord, Registries};
use crate::domain::structure::StructureTree;
use crate::error::ExtractError;

/// Deepest block nesting accepted before the tree is considered corrupt.
const MAX_NESTING: usize = 64;

/// Cap for reported structural depth.
const DEPTH_CAP: usize = 3;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApiCounts {
    pub fit_media: usize,
    pub make_beat: usize,
    pub set_effect: usize,
    pub set_tempo: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DepthSummary {
    pub max_depth: usize,
    pub breadth: i32,
    pub average_depth: f64,
}

/// A string or numeric literal reachable from executed code.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueUse {
    pub value: Literal,
    pub line: usize,
    pub col: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CodeAnalysis {
    pub features: CodeFeatures,
    pub counts: ApiCounts,
    pub depth: DepthSummary,
    pub values_used: Vec<ValueUse>,
    /// Line pairs of equivalent top-level API call statements.
    pub duplicate_calls: Vec<(usize, usize)>,
    pub structure: StructureTree,
    pub registries: Registries,
}

impl CodeAnalysis {
    /// The zero-valued result used when nothing can be analyzed.
    pub fn empty(config: &AnalyzerConfig) -> Self {
        Self {
            features: CodeFeatures::zeroed(config),
            counts: ApiCounts::default(),
            depth: DepthSummary::default(),
            values_used: Vec::new(),
            duplicate_calls: Vec::new(),
            structure: StructureTree::build(&Node::empty_module()),
            registries: Registries::default(),
        }
    }
}

/// Structural equivalence of two expressions.
///
/// Same name, same literal, calls to the same callee with equivalent
/// arguments, unary expressions over equivalent operands, or lists with
/// pairwise equivalent elements. Anything else is not equivalent.
pub fn equivalent(a: &Node, b: &Node) -> bool {
    match (&a.kind, &b.kind) {
        (NodeKind::Name { id: x }, NodeKind::Name { id: y }) => x == y,
        (NodeKind::Constant { value: x }, NodeKind::Constant { value: y }) => x == y,
        (NodeKind::Call { args: xs, .. }, NodeKind::Call { args: ys, .. }) => {
            a.call_name().is_some()
                && a.call_name() == b.call_name()
                && xs.len() == ys.len()
                && xs.iter().zip(ys).all(|(x, y)| equivalent(x, y))
        }
        (NodeKind::UnaryOp { operand: x, .. }, NodeKind::UnaryOp { operand: y, .. }) => equivalent(x, y),
        (NodeKind::List { elts: xs }, NodeKind::List { elts: ys }) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| equivalent(x, y))
        }
        _ => false,
    }
}

pub struct Extractor<'c> {
    config: &'c AnalyzerConfig,
    language: Language,
}

impl<'c> Extractor<'c> {
    pub fn new(config: &'c AnalyzerConfig, language: Language) -> Self {
        Self { config, language }
    }

    /// Analyze a canonical module. Never fails; see module docs.
    pub fn analyze(&self, module: &Node) -> CodeAnalysis {
        match self.try_analyze(module) {
            Ok(analysis) => {
                debug!(
                    language = %self.language,
                    breadth = analysis.depth.breadth,
                    functions = analysis.registries.functions.len(),
                    api_calls = analysis.registries.api_calls.len(),
                    "extracted code features"
                );
                analysis
            }
            Err(err) => {
                warn!(language = %self.language, error = %err, "feature extraction failed, using zeroed profile");
                CodeAnalysis::empty(self.config)
            }
        }
    }

    fn try_analyze(&self, module: &Node) -> Result<CodeAnalysis, ExtractError> {
        let body = match &module.kind {
            NodeKind::Module { body } => body,
            _ => return Err(ExtractError::NotAModule(module.kind_name().to_string())),
        };
        let structure = StructureTree::build(module);
        if structure.max_depth() > MAX_NESTING {
            return Err(ExtractError::TooDeep(MAX_NESTING));
        }

        let mut symbols = SymbolCollector { config: self.config, structure: &structure, registries: Registries::default() };
        symbols.collect_functions(module);
        symbols.collect_aliases(module);
        symbols.collect_calls(module, false);
        symbols.collect_assignments(body, None);
        symbols.collect_uses(module);
        let mut registries = symbols.registries;
        registries.api_calls = collect_api_calls(self.config, &registries, &structure, module);

        let estimator = TypeEstimator::new(self.config, &registries, &structure);
        let mut scorer = Scorer {
            config: self.config,
            language: self.language,
            registries: &registries,
            estimator,
            features: CodeFeatures::zeroed(self.config),
            counts: ApiCounts::default(),
            values_used: Vec::new(),
        };
        scorer.score(module, 0);
        scorer.score_variables();
        let Scorer { features, counts, values_used, .. } = scorer;

        let depth = DepthSummary {
            max_depth: structure.max_depth().min(DEPTH_CAP),
            breadth: features.breadth(),
            average_depth: structure.average_depth(),
        };
        let duplicate_calls = duplicate_api_statements(self.config, body);

        Ok(CodeAnalysis { features, counts, depth, values_used, duplicate_calls, structure, registries })
    }
}

// ─── registries ─────────────────────────────────────────────────────────────

struct SymbolCollector<'a> {
    config: &'a AnalyzerConfig,
    structure: &'a StructureTree,
    registries: Registries,
}

impl SymbolCollector<'_> {
    fn collect_functions(&mut self, module: &Node) {
        let mut found = Vec::new();
        module.walk(&mut |node| {
            if let NodeKind::FunctionDef { name, params, body } = &node.kind {
                let mut return_values = Vec::new();
                returns_of(body, &mut return_values);
                let mut uses_params = false;
                for stmt in body {
                    stmt.walk(&mut |n| {
                        if n.name_id().is_some_and(|id| params.iter().any(|p| p == id)) {
                            uses_params = true;
                        }
                    });
                }
                found.push(FunctionRecord {
                    name: name.clone(),
                    params: params.clone(),
                    aliases: Vec::new(),
                    start_line: node.line,
                    end_line: node.last_line(),
                    calls: Vec::new(),
                    returns_value: !return_values.is_empty(),
                    return_values,
                    result_consumed: false,
                    uses_params,
                });
            }
        });
        for record in found {
            self.registries.functions.insert(record.name.clone(), record);
        }
    }

    /// `x = someFunction` and `x = function () {...}` make `x` an alias.
    fn collect_aliases(&mut self, module: &Node) {
        let mut found = Vec::new();
        module.walk(&mut |node| {
            if let NodeKind::Assign { targets, value } = &node.kind {
                let Some(alias) = targets.first().and_then(Node::name_id) else { return };
                let target = match &value.kind {
                    NodeKind::Name { id } => Some(id.clone()),
                    NodeKind::FunctionExp { name, .. } => Some(name.clone()),
                    _ => None,
                };
                if let Some(target) = target {
                    found.push((alias.to_string(), target));
                }
            }
        });
        for (alias, target) in found {
            let known = self.registries.functions.contains_key(&target) || self.config.is_builtin_name(&target);
            if !known || alias == target {
                continue;
            }
            if let Some(function) = self.registries.functions.get_mut(&target) {
                function.aliases.push(alias.clone());
            }
            self.registries.aliases.insert(alias, target);
        }
    }

    fn collect_calls(&mut self, node: &Node, as_statement: bool) {
        if let NodeKind::Call { func, .. } = &node.kind {
            if let Some(id) = func.name_id() {
                let target = self.registries.resolve_alias(id).to_string();
                let repeats = if self.structure.in_loop(node.line) { 2 } else { 1 };
                if let Some(function) = self.registries.functions.get_mut(&target) {
                    function.calls.extend(std::iter::repeat(node.line).take(repeats));
                    if !as_statement {
                        function.result_consumed = true;
                    }
                }
            }
        }
        let statement = matches!(node.kind, NodeKind::Expr { .. });
        for child in node.children() {
            self.collect_calls(child, statement);
        }
    }

    fn record(&mut self, name: &str, at: &Node, value: Node, loop_line: Option<usize>) {
        let block = self.structure.enclosing(at.line);
        match loop_line {
            // Assignments in loops run repeatedly: they count twice, at the loop header.
            Some(line) => {
                for _ in 0..2 {
                    let assignment = Assignment { line, col: at.col, block, value: value.clone() };
                    self.registries.record_assignment(name, assignment);
                }
            }
            None => {
                let assignment = Assignment { line: at.line, col: at.col, block, value };
                self.registries.record_assignment(name, assignment);
            }
        }
    }

    fn collect_assignments(&mut self, statements: &[Node], loop_line: Option<usize>) {
        for stmt in statements {
            match &stmt.kind {
                NodeKind::Assign { targets, value } => {
                    for target in targets {
                        if let Some(id) = target.name_id() {
                            self.record(id, stmt, value.as_ref().clone(), loop_line);
                        }
                    }
                    self.collect_nested_functions(stmt);
                }
                NodeKind::AugAssign { target, .. } => {
                    if let Some(id) = target.name_id() {
                        self.record(id, stmt, stmt.clone(), loop_line);
                    }
                }
                NodeKind::For { target, iter, body } => {
                    if let Some(id) = target.name_id() {
                        let header = Node::new(
                            NodeKind::For { target: target.clone(), iter: iter.clone(), body: Vec::new() },
                            stmt.line,
                            stmt.col,
                        );
                        self.record(id, stmt, header, Some(stmt.line));
                    }
                    self.collect_assignments(body, Some(stmt.line));
                }
                NodeKind::JsFor { init, update, body, .. } => {
                    if let Some(init) = init {
                        self.collect_assignments(std::slice::from_ref(init.as_ref()), loop_line);
                    }
                    if let Some(update) = update {
                        self.collect_assignments(std::slice::from_ref(update.as_ref()), Some(stmt.line));
                    }
                    self.collect_assignments(body, Some(stmt.line));
                }
                NodeKind::While { body, .. } => self.collect_assignments(body, Some(stmt.line)),
                NodeKind::If { body, orelse, .. } => {
                    self.collect_assignments(body, loop_line);
                    self.collect_assignments(orelse, loop_line);
                }
                NodeKind::FunctionDef { body, .. } => self.collect_assignments(body, None),
                _ => self.collect_nested_functions(stmt),
            }
        }
    }

    fn collect_nested_functions(&mut self, stmt: &Node) {
        let mut bodies = Vec::new();
        stmt.walk(&mut |n| {
            if let NodeKind::FunctionExp { def, .. } = &n.kind {
                if let Some(body) = def.body() {
                    bodies.push(body);
                }
            }
        });
        for body in bodies {
            self.collect_assignments(body, None);
        }
    }

    /// Name loads; assignment targets and called names are not uses.
    fn collect_uses(&mut self, node: &Node) {
        match &node.kind {
            NodeKind::Name { id } => self.registries.record_use(id, node.line),
            NodeKind::Assign { targets, value } => {
                for target in targets.iter().filter(|t| t.name_id().is_none()) {
                    self.collect_uses(target);
                }
                self.collect_uses(value);
            }
            NodeKind::AugAssign { value, .. } => self.collect_uses(value),
            NodeKind::For { target, iter, body } => {
                if target.name_id().is_none() {
                    self.collect_uses(target);
                }
                self.collect_uses(iter);
                for stmt in body {
                    self.collect_uses(stmt);
                }
            }
            NodeKind::Call { func, args } => {
                if func.name_id().is_none() {
                    self.collect_uses(func);
                }
                for arg in args {
                    self.collect_uses(arg);
                }
            }
            _ => {
                for child in node.children() {
                    self.collect_uses(child);
                }
            }
        }
    }
}

/// Return expressions of a function body, not descending into nested functions.
fn returns_of(statements: &[Node], out: &mut Vec<Node>) {
    for stmt in statements {
        match &stmt.kind {
            NodeKind::Return { value: Some(value) } => out.push(value.as_ref().clone()),
            NodeKind::FunctionDef { .. } => {}
            NodeKind::If { body, orelse, .. } => {
                returns_of(body, out);
                returns_of(orelse, out);
            }
            _ => {
                if let Some(body) = stmt.body() {
                    returns_of(body, out);
                }
            }
        }
    }
}

fn collect_api_calls(
    config: &AnalyzerConfig,
    registries: &Registries,
    structure: &StructureTree,
    module: &Node,
) -> Vec<ApiCall> {
    let estimator = TypeEstimator::new(config, registries, structure);
    let mut calls = Vec::new();
    module.walk(&mut |node| {
        let NodeKind::Call { func, args } = &node.kind else { return };
        let Some(name) = func.name_id() else { return };
        let name = registries.resolve_alias(name);
        let Some(api) = config.api_function(name) else { return };

        let mut clips = Vec::new();
        if api.clip_argument {
            if let Some(first) = args.first() {
                match &first.kind {
                    NodeKind::List { elts } => {
                        clips.extend(elts.iter().filter_map(|e| clip_name(&estimator, registries, e)));
                    }
                    _ => clips.extend(clip_name(&estimator, registries, first)),
                }
            }
        } else if name == "setEffect" {
            if let Some(effect) = args.get(1) {
                match &effect.kind {
                    NodeKind::Name { id } => clips.push(id.clone()),
                    NodeKind::Constant { value: Literal::Str(s) } => clips.push(s.clone()),
                    _ => {}
                }
            }
        }
        calls.push(ApiCall { function: name.to_string(), line: node.line, col: node.col, clips, args: args.clone() });
    });
    calls
}

fn clip_name(estimator: &TypeEstimator<'_>, registries: &Registries, arg: &Node) -> Option<String> {
    if let NodeKind::Constant { value: Literal::Str(s) } = &arg.kind {
        return Some(s.clone());
    }
    if let TypeLabel::Sample(name) = estimator.estimate(arg) {
        return Some(name);
    }
    // An unbound identifier passed as a clip is a platform sound constant.
    match arg.name_id() {
        Some(id) if registries.variable(id).is_none() && !registries.is_user_function(id) => Some(id.to_string()),
        _ => None,
    }
}

fn duplicate_api_statements(config: &AnalyzerConfig, body: &[Node]) -> Vec<(usize, usize)> {
    let calls: Vec<&Node> = body
        .iter()
        .filter_map(|stmt| match &stmt.kind {
            NodeKind::Expr { value } if value.call_name().is_some_and(|n| config.is_api_function(n)) => {
                Some(value.as_ref())
            }
            _ => None,
        })
        .collect();
    let mut pairs = Vec::new();
    for (i, a) in calls.iter().enumerate() {
        for b in &calls[i + 1..] {
            if equivalent(a, b) {
                pairs.push((a.line, b.line));
            }
        }
    }
    pairs
}

// ─── feature levels ─────────────────────────────────────────────────────────

struct Scorer<'a> {
    config: &'a AnalyzerConfig,
    language: Language,
    registries: &'a Registries,
    estimator: TypeEstimator<'a>,
    features: CodeFeatures,
    counts: ApiCounts,
    values_used: Vec<ValueUse>,
}

impl Scorer<'_> {
    fn raise(&mut self, feature: &str, level: i32) {
        self.features.raise(self.config, feature, level);
    }

    fn is_uncalled(&self, name: &str) -> bool {
        self.registries.functions.get(name).is_some_and(|f| !f.is_called())
    }

    fn score(&mut self, node: &Node, loop_depth: usize) {
        match &node.kind {
            NodeKind::FunctionDef { name, .. } => {
                if self.is_uncalled(name) {
                    return;
                }
                self.score_function(name);
            }
            NodeKind::FunctionExp { name, .. } if self.is_uncalled(name) => return,
            NodeKind::If { test, orelse, .. } => {
                self.raise("conditionals", conditional_level(orelse));
                let mut kinds: Vec<&'static str> = Vec::new();
                test.walk(&mut |n| {
                    if !kinds.contains(&n.kind_name()) {
                        kinds.push(n.kind_name());
                    }
                });
                self.raise("usedInConditionals", kinds.len().min(3) as i32);
            }
            NodeKind::While { .. } => self.raise("whileLoops", 1),
            NodeKind::For { iter, .. } => match &iter.kind {
                NodeKind::Call { args, .. } if iter.call_name() == Some("range") => {
                    self.raise("forLoopsRange", args.len().clamp(1, 3) as i32);
                }
                _ => self.raise("iterables", 1),
            },
            NodeKind::JsFor { init, test, update, .. } => {
                let mut level = 1;
                if init.is_some() && test.is_some() {
                    level = 2;
                }
                if update.as_deref().is_some_and(has_non_unit_step) {
                    level = 3;
                }
                self.raise("forLoopsIterable", level);
            }
            NodeKind::Subscript { .. } => self.raise("indexing", 1),
            NodeKind::BinOp { .. } => self.raise("binOps", 1),
            NodeKind::Compare { .. } => self.raise("comparisons", 1),
            NodeKind::Attribute { value, attr } => self.score_method(value, attr),
            NodeKind::Call { func, args } => self.score_call(func, args),
            NodeKind::Constant { value } => {
                if matches!(value, Literal::Str(_) | Literal::Int(_) | Literal::Float(_)) {
                    self.values_used.push(ValueUse { value: value.clone(), line: node.line, col: node.col });
                }
            }
            _ => {}
        }

        if node.is_loop() && loop_depth > 0 {
            self.raise("nesting", 1);
        }
        let depth = if node.is_loop() { loop_depth + 1 } else { loop_depth };
        for child in node.children() {
            self.score(child, depth);
        }
    }

    fn score_function(&mut self, name: &str) {
        let Some(function) = self.registries.functions.get(name) else { return };
        let calls = function.calls.len();
        let (uses_params, returns_value, result_consumed) =
            (function.uses_params, function.returns_value, function.result_consumed);
        let repeat = match calls {
            0 => 0,
            1 => 1,
            _ if uses_params => 3,
            _ => 2,
        };
        self.raise("repeatExecution", repeat);
        if returns_value && calls > 0 {
            let manipulate = if result_consumed {
                3
            } else if calls > 1 {
                2
            } else {
                1
            };
            self.raise("manipulateValue", manipulate);
        }
    }

    fn score_method(&mut self, receiver: &Node, method: &str) {
        let is_list = self.language.list_methods().contains(&method);
        let is_str = self.language.string_methods().contains(&method);
        match (is_list, is_str) {
            (true, false) => self.raise("listOps", 1),
            (false, true) => self.raise("strOps", 1),
            (true, true) => match self.estimator.estimate(receiver) {
                TypeLabel::Str => self.raise("strOps", 1),
                _ => self.raise("listOps", 1),
            },
            (false, false) => {}
        }
    }

    fn score_call(&mut self, func: &Node, args: &[Node]) {
        let Some(id) = func.name_id() else { return };
        let name = self.registries.resolve_alias(id).to_string();
        match name.as_str() {
            "readInput" => self.raise("consoleInput", 1),
            "fitMedia" => self.counts.fit_media += 1,
            "setEffect" => self.counts.set_effect += 1,
            "setTempo" => self.counts.set_tempo += 1,
            "makeBeat" => {
                self.counts.make_beat += 1;
                let with_list = args
                    .first()
                    .is_some_and(|a| self.estimator.estimate(a) == TypeLabel::List);
                self.raise("makeBeat", if with_list { 2 } else { 1 });
            }
            _ => {}
        }
    }

    fn score_variables(&mut self) {
        let mut level = 0;
        for var in self.registries.variables.values() {
            let live_uses: Vec<usize> = var
                .uses
                .iter()
                .copied()
                .filter(|&line| !self.registries.functions.values().any(|f| !f.is_called() && f.contains_line(line)))
                .collect();
            if live_uses.is_empty() {
                continue;
            }
            level = level.max(1);
            if live_uses.iter().any(|&line| var.assignments_before(line) >= 2) {
                level = 2;
            }
        }
        self.raise("variables", level);
    }
}

/// 1 for a bare if, 2 with an alternative, 3 for an else-if chain ending in else.
fn conditional_level(orelse: &[Node]) -> i32 {
    match orelse {
        [] => 1,
        [single] => match &single.kind {
            NodeKind::If { orelse: next, .. } => {
                let mut tail = next.as_slice();
                loop {
                    match tail {
                        [] => return 2,
                        [only] => match &only.kind {
                            NodeKind::If { orelse, .. } => tail = orelse.as_slice(),
                            _ => return 3,
                        },
                        _ => return 3,
                    }
                }
            }
            _ => 2,
        },
        _ => 2,
    }
}

fn has_non_unit_step(update: &Node) -> bool {
    let step = match &update.kind {
        NodeKind::AugAssign { op: BinOperator::Add | BinOperator::Sub, value, .. } => value.as_ref(),
        NodeKind::Assign { value, .. } => match &value.kind {
            NodeKind::BinOp { op: BinOperator::Add | BinOperator::Sub, right, .. } => right.as_ref(),
            _ => return true,
        },
        _ => return true,
    };
    !matches!(&step.kind, NodeKind::Constant { value: Literal::Int(1) })
        && !matches!(&step.kind, NodeKind::Constant { value: Literal::Float(f) } if *f == 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ast::UnaryOperator;

    fn name(id: &str, line: usize) -> Node {
        Node::new(NodeKind::Name { id: id.into() }, line, 0)
    }

    fn int(v: i64, line: usize) -> Node {
        Node::new(NodeKind::Constant { value: Literal::Int(v) }, line, 0)
    }

    fn call(func: &str, args: Vec<Node>, line: usize) -> Node {
        Node::new(NodeKind::Call { func: Box::new(name(func, line)), args }, line, 0)
    }

    fn stmt(value: Node) -> Node {
        let (line, col) = (value.line, value.col);
        Node::new(NodeKind::Expr { value: Box::new(value) }, line, col)
    }

    fn assign(target: &str, value: Node) -> Node {
        let line = value.line;
        Node::new(NodeKind::Assign { targets: vec![name(target, line)], value: Box::new(value) }, line, 0)
    }

    fn def(fname: &str, params: &[&str], body: Vec<Node>, line: usize) -> Node {
        let params = params.iter().map(|p| p.to_string()).collect();
        Node::new(NodeKind::FunctionDef { name: fname.into(), params, body }, line, 0)
    }

    fn module(body: Vec<Node>) -> Node {
        Node::new(NodeKind::Module { body }, 1, 0)
    }

    fn analyze(module: &Node) -> CodeAnalysis {
        let config = AnalyzerConfig::default();
        Extractor::new(&config, Language::Python).analyze(module)
    }

    #[test]
    fn test_range_loop_and_counts() {
        // 1 for i in range(1, 9):
        // 2     fitMedia(DRUMS_01, 1, i, i + 1)
        let body = vec![stmt(call(
            "fitMedia",
            vec![name("DRUMS_01", 2), int(1, 2), name("i", 2), Node::new(NodeKind::BinOp {
                left: Box::new(name("i", 2)),
                op: BinOperator::Add,
                right: Box::new(int(1, 2)),
            }, 2, 0)],
            2,
        ))];
        let for_node = Node::new(
            NodeKind::For {
                target: Box::new(name("i", 1)),
                iter: Box::new(call("range", vec![int(1, 1), int(9, 1)], 1)),
                body,
            },
            1,
            0,
        );
        let analysis = analyze(&module(vec![for_node]));
        assert_eq!(analysis.features.get("iteration", "forLoopsRange"), 2);
        assert_eq!(analysis.features.get("features", "binOps"), 1);
        assert_eq!(analysis.counts.fit_media, 1);
        assert_eq!(analysis.registries.api_calls[0].clips, vec!["DRUMS_01".to_string()]);
        assert_eq!(analysis.depth.max_depth, 1);
    }

    #[test]
    fn test_uncalled_function_does_not_count() {
        let inner_if = Node::new(
            NodeKind::If { test: Box::new(name("x", 2)), body: vec![stmt(int(1, 3))], orelse: vec![] },
            2,
            4,
        );
        let analysis = analyze(&module(vec![def("unused", &["x"], vec![inner_if], 1)]));
        assert_eq!(analysis.features.get("conditionals", "conditionals"), 0);
        assert_eq!(analysis.features.get("functions", "repeatExecution"), 0);
    }

    #[test]
    fn test_function_levels() {
        // 1 def beat(m):
        // 2     return m
        // 3 beat(1)
        // 4 x = beat(2)
        let ret = Node::new(NodeKind::Return { value: Some(Box::new(name("m", 2))) }, 2, 4);
        let program = module(vec![
            def("beat", &["m"], vec![ret], 1),
            stmt(call("beat", vec![int(1, 3)], 3)),
            assign("x", call("beat", vec![int(2, 4)], 4)),
        ]);
        let analysis = analyze(&program);
        assert_eq!(analysis.features.get("functions", "repeatExecution"), 3);
        assert_eq!(analysis.features.get("functions", "manipulateValue"), 3);
        let record = &analysis.registries.functions["beat"];
        assert_eq!(record.calls, vec![3, 4]);
        assert!(record.result_consumed);
    }

    #[test]
    fn test_variable_reassigned_before_use() {
        let program = module(vec![
            assign("t", int(1, 1)),
            assign("t", int(2, 2)),
            stmt(call("setTempo", vec![name("t", 3)], 3)),
        ]);
        let analysis = analyze(&program);
        assert_eq!(analysis.features.get("variables", "variables"), 2);
        assert_eq!(analysis.registries.variables["t"].uses, vec![3]);
    }

    #[test]
    fn test_else_if_chain_levels() {
        let leaf = |line| stmt(int(1, line));
        let chain_end = Node::new(
            NodeKind::If { test: Box::new(name("b", 3)), body: vec![leaf(4)], orelse: vec![leaf(6)] },
            3,
            0,
        );
        assert_eq!(conditional_level(&[chain_end.clone()]), 3);
        let open_chain = Node::new(
            NodeKind::If { test: Box::new(name("b", 3)), body: vec![leaf(4)], orelse: vec![] },
            3,
            0,
        );
        assert_eq!(conditional_level(&[open_chain]), 2);
        assert_eq!(conditional_level(&[leaf(5)]), 2);
        assert_eq!(conditional_level(&[]), 1);
    }

    #[test]
    fn test_equivalence_predicate() {
        let a = call("fitMedia", vec![name("X", 1), int(1, 1)], 1);
        let b = call("fitMedia", vec![name("X", 5), int(1, 5)], 5);
        let c = call("fitMedia", vec![name("Y", 6), int(1, 6)], 6);
        assert!(equivalent(&a, &b));
        assert!(!equivalent(&a, &c));
        assert!(!equivalent(&int(1, 1), &name("x", 1)));

        let not_x = Node::new(NodeKind::UnaryOp { op: UnaryOperator::Not, operand: Box::new(name("x", 2)) }, 2, 0);
        let invert_x = Node::new(NodeKind::UnaryOp { op: UnaryOperator::Invert, operand: Box::new(name("x", 3)) }, 3, 0);
        let not_y = Node::new(NodeKind::UnaryOp { op: UnaryOperator::Not, operand: Box::new(name("y", 4)) }, 4, 0);
        assert!(equivalent(&not_x, &invert_x));
        assert!(!equivalent(&not_x, &not_y));

        let analysis = analyze(&module(vec![stmt(a), stmt(b), stmt(c)]));
        assert_eq!(analysis.duplicate_calls, vec![(1, 5)]);
    }

    #[test]
    fn test_non_module_root_yields_zeroed_profile() {
        let analysis = analyze(&stmt(int(1, 1)));
        assert!(analysis.features.is_zero());
        assert!(analysis.registries.api_calls.is_empty());
    }

    #[test]
    fn test_analysis_is_idempotent() {
        let program = module(vec![assign("t", int(120, 1)), stmt(call("setTempo", vec![name("t", 2)], 2))]);
        assert_eq!(analyze(&program), analyze(&program));
    }
}
