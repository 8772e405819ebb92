// Symbol registries built fresh by every extraction pass.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::domain::ast::Node;
use crate::domain::structure::BlockId;

/// One assignment to a variable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assignment {
    /// Line the assignment counts at (loop header for assignments inside loops).
    pub line: usize,
    pub col: usize,
    /// Innermost structural block around the assignment.
    pub block: BlockId,
    #[serde(skip)]
    pub value: Node,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariableRecord {
    pub name: String,
    pub assignments: Vec<Assignment>,
    pub uses: Vec<usize>,
}

impl VariableRecord {
    /// Assignments strictly before `line`.
    pub fn assignments_before(&self, line: usize) -> usize {
        self.assignments.iter().filter(|a| a.line < line).count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionRecord {
    pub name: String,
    pub params: Vec<String>,
    pub aliases: Vec<String>,
    pub start_line: usize,
    pub end_line: usize,
    /// Call lines; a call inside a loop is listed twice.
    pub calls: Vec<usize>,
    pub returns_value: bool,
    #[serde(skip)]
    pub return_values: Vec<Node>,
    /// Some call uses the result inside another expression.
    pub result_consumed: bool,
    /// The body reads at least one parameter.
    pub uses_params: bool,
}

impl FunctionRecord {
    pub fn contains_line(&self, line: usize) -> bool {
        self.start_line <= line && line <= self.end_line
    }

    pub fn is_called(&self) -> bool {
        !self.calls.is_empty()
    }
}

/// A call to a platform API function.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiCall {
    pub function: String,
    pub line: usize,
    pub col: usize,
    /// Sound keys placed by the call, or the effect name for `setEffect`.
    pub clips: Vec<String>,
    #[serde(skip)]
    pub args: Vec<Node>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Registries {
    pub variables: BTreeMap<String, VariableRecord>,
    pub functions: BTreeMap<String, FunctionRecord>,
    /// Alias name -> function it refers to.
    pub aliases: BTreeMap<String, String>,
    pub api_calls: Vec<ApiCall>,
}

impl Registries {
    /// Resolve an alias chain to the underlying name.
    pub fn resolve_alias<'a>(&'a self, name: &'a str) -> &'a str {
        let mut current = name;
        // Bounded: alias chains cannot be longer than the alias table.
        for _ in 0..=self.aliases.len() {
            match self.aliases.get(current) {
                Some(target) if target != current => current = target,
                _ => break,
            }
        }
        current
    }

    /// User function called or referenced as `name` (directly or via alias).
    pub fn function(&self, name: &str) -> Option<&FunctionRecord> {
        self.functions.get(self.resolve_alias(name))
    }

    pub fn is_user_function(&self, name: &str) -> bool {
        self.function(name).is_some()
    }

    pub fn variable(&self, name: &str) -> Option<&VariableRecord> {
        self.variables.get(name)
    }

    pub fn record_assignment(&mut self, name: &str, assignment: Assignment) {
        self.variables
            .entry(name.to_string())
            .or_insert_with(|| VariableRecord {
                name: name.to_string(),
                assignments: Vec::new(),
                uses: Vec::new(),
            })
            .assignments
            .push(assignment);
    }

    /// Record a read; names never assigned are ignored.
    pub fn record_use(&mut self, name: &str, line: usize) {
        if let Some(var) = self.variables.get_mut(name) {
            var.uses.push(line);
        }
    }

    /// User function whose body spans `line`, innermost first.
    pub fn function_at_line(&self, line: usize) -> Option<&FunctionRecord> {
        self.functions
            .values()
            .filter(|f| f.contains_line(line))
            .min_by_key(|f| f.end_line - f.start_line)
    }
}
