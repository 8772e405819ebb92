/// External Parser Runner.
///
/// Spawns the per-language parser, feeds the script on stdin and reads the
/// foreign AST as JSON from stdout:
/// - Python: `python3 -c` with a small `ast`-to-JSON dumper
/// - JavaScript: `acorn --locations`

use std::io::Write;
use std::process::{Command, Stdio};

use anyhow::{bail, Context};
use serde_json::Value;
use tracing::debug;

use crate::domain::language::Language;
use crate::error::{BeatcoachError, Result};
use crate::ports::SourceParser;

/// Dumps `ast.parse(stdin)` with `_type`, fields, `lineno` and `col_offset`.
const PYTHON_AST_DUMPER: &str = r#"
import ast, json, sys
def conv(n):
    if isinstance(n, ast.AST):
        d = {'_type': type(n).__name__}
        for k, v in ast.iter_fields(n):
            d[k] = conv(v)
        for k in ('lineno', 'col_offset'):
            if hasattr(n, k):
                d[k] = getattr(n, k)
        return d
    if isinstance(n, list):
        return [conv(x) for x in n]
    if n is None or isinstance(n, (str, bool, int, float)):
        return n
    return repr(n)
print(json.dumps(conv(ast.parse(sys.stdin.read()))))
"#;

// ═══════════════════════════════════════════════════════════════════════════
// Public API
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Default, Clone, Copy)]
pub struct ExternalParser;

impl SourceParser for ExternalParser {
    fn parse(&self, language: Language, source: &str) -> Result<Value> {
        run_parser(language, source).map_err(|e| BeatcoachError::Parser(format!("{e:#}")))
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Internal Implementation
// ═══════════════════════════════════════════════════════════════════════════

fn run_parser(language: Language, source: &str) -> anyhow::Result<Value> {
    let spec = build_command_spec(language);
    debug!(program = %spec.program, %language, bytes = source.len(), "running external parser");

    let mut child = match Command::new(&spec.program)
        .args(&spec.args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
    {
        Ok(child) => child,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            bail!("{} not found in PATH. {}", spec.program, language.install_instructions());
        }
        Err(e) => return Err(e).with_context(|| format!("Failed to execute {}", spec.program)),
    };

    child
        .stdin
        .take()
        .context("Parser stdin unavailable")?
        .write_all(source.as_bytes())
        .with_context(|| format!("Failed to send source to {}", spec.program))?;

    let output = child
        .wait_with_output()
        .with_context(|| format!("Failed to wait for {}", spec.program))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "{} failed with exit code {:?}: {}",
            spec.program,
            output.status.code(),
            stderr.lines().last().unwrap_or("").trim()
        );
    }

    serde_json::from_slice(&output.stdout).with_context(|| format!("{} produced invalid JSON", spec.program))
}

// ═══════════════════════════════════════════════════════════════════════════
// Testable Command Builder
// ═══════════════════════════════════════════════════════════════════════════

/// The command that would be run for a given language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserCommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

pub fn build_command_spec(language: Language) -> ParserCommandSpec {
    match language {
        Language::Python => ParserCommandSpec {
            program: language.parser_command().to_string(),
            args: vec!["-c".to_string(), PYTHON_AST_DUMPER.to_string()],
        },
        Language::JavaScript => ParserCommandSpec {
            program: language.parser_command().to_string(),
            args: vec!["--ecma2020".to_string(), "--locations".to_string()],
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_command_spec_python() {
        let spec = build_command_spec(Language::Python);
        assert_eq!(spec.program, "python3");
        assert_eq!(spec.args[0], "-c");
        assert!(spec.args[1].contains("lineno"));
    }

    #[test]
    fn test_build_command_spec_javascript() {
        let spec = build_command_spec(Language::JavaScript);
        assert_eq!(spec.program, "acorn");
        assert!(spec.args.contains(&"--locations".to_string()));
    }

    #[test]
    #[ignore] // Requires python3 in PATH
    fn test_python_round_trip() {
        let tree = ExternalParser.parse(Language::Python, "x = -1\n").unwrap();
        assert_eq!(tree["_type"], "Module");
        assert_eq!(tree["body"][0]["lineno"], 1);
    }
}
