//! Boundary error types for Beatcoach.
//!
//! Analysis components never raise these; they recover into sentinel values.
//! These cover the edges: files, external parsers, configuration, and requests.

use thiserror::Error;

/// Common result type for boundary operations
pub type Result<T> = std::result::Result<T, BeatcoachError>;

#[derive(Error, Debug)]
pub enum BeatcoachError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    /// External parser missing or exited unsuccessfully
    #[error("Parser error: {0}")]
    Parser(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Failures inside a normalizer front end; absorbed into the empty module.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NormalizeError {
    #[error("node is not an object")]
    NotAnObject,

    #[error("missing node type tag")]
    MissingType,

    #[error("missing field `{field}` on {kind}")]
    MissingField { kind: String, field: String },

    #[error("unexpected root node {0}")]
    UnexpectedRoot(String),

    #[error("{0} does not produce a single expression")]
    NotAnExpression(String),
}

/// Internal inconsistency detected while extracting features.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractError {
    #[error("root node is {0}, expected Module")]
    NotAModule(String),

    #[error("nesting deeper than {0} levels")]
    TooDeep(usize),
}
