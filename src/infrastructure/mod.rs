// Infrastructure implementations for Beatcoach.

pub mod concurrency;
pub mod parser_runner;
pub mod project_loader;

use std::path::Path;

use serde_json::Value;

use crate::domain::language::Language;
use crate::domain::report::Report;
use crate::error::Result;
use crate::ports::{ReportExporter, SourceParser};

pub use parser_runner::ExternalParser;

/// Treats the source text as an already-parsed foreign AST.
pub struct JsonAstParser;

impl SourceParser for JsonAstParser {
    fn parse(&self, _language: Language, source: &str) -> Result<Value> {
        Ok(serde_json::from_str(source)?)
    }
}

pub struct JsonReportExporter {
    pub pretty: bool,
}

impl JsonReportExporter {
    pub fn render(&self, report: &Report) -> Result<String> {
        let text = if self.pretty {
            serde_json::to_string_pretty(report)?
        } else {
            serde_json::to_string(report)?
        };
        Ok(text)
    }
}

impl ReportExporter for JsonReportExporter {
    fn export(&self, report: &Report, path: &Path) -> Result<()> {
        std::fs::write(path, self.render(report)?)?;
        Ok(())
    }
}
