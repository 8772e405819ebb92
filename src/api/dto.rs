use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::decision::Goal;
use crate::domain::lookup::{Dimension, Key};
use crate::domain::recommendations::Recommendation;
use crate::domain::report::Overview;
use crate::domain::timeline::Timeline;

/// One JSON line from a client.
#[derive(Debug, Deserialize)]
pub struct CommandReq {
    pub command: String,
    pub params: Option<Value>,
}

/// A script plus the timeline its run rendered.
#[derive(Debug, Deserialize)]
pub struct ScriptParams {
    pub language: String,
    pub source: String,
    /// `source` already holds the foreign AST as JSON.
    #[serde(default)]
    pub pre_parsed: bool,
    #[serde(default)]
    pub timeline: Timeline,
    #[serde(default)]
    pub include_variables: bool,
}

#[derive(Debug, Deserialize)]
pub struct SuggestParams {
    pub project: String,
    #[serde(flatten)]
    pub script: ScriptParams,
    #[serde(default)]
    pub goals: Vec<Goal>,
}

#[derive(Debug, Deserialize)]
pub struct LookupParams {
    #[serde(flatten)]
    pub script: ScriptParams,
    pub key: Key,
    pub output: Dimension,
}

#[derive(Debug, Serialize)]
pub struct SuggestResponse {
    pub recommendation: Recommendation,
    pub overview: Overview,
}

#[derive(Debug, Serialize)]
pub struct LookupResponse {
    pub results: Vec<Key>,
}
