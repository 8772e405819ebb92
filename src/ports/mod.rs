// Collaborator seams of the analysis pipeline.

use std::path::Path;

use serde_json::Value;

use crate::domain::language::Language;
use crate::domain::report::Report;
use crate::error::Result;

/// Produces the foreign AST of a script as JSON.
pub trait SourceParser: Send + Sync {
    fn parse(&self, language: Language, source: &str) -> Result<Value>;
}

pub trait ReportExporter {
    fn export(&self, report: &Report, path: &Path) -> Result<()>;
}
