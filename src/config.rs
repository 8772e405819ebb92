//! Analyzer configuration.
//!
//! Every field has a compiled default; a TOML file may override any subset:
//!
//! ```toml
//! placeholder_sound = "METRONOME"
//! max_refinements = 3
//!
//! [[sounds]]
//! name = "HIPHOP_DUSTYGROOVE_007"
//! genre = "HIP HOP"
//! instrument = "DRUMS"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A named group of features in the complexity profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureCategory {
    pub name: String,
    pub features: Vec<String>,
}

/// Coarse return type of a built-in or platform function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReturnType {
    Int,
    Float,
    Str,
    List,
    Bool,
}

/// A platform audio API function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiFunction {
    pub name: String,
    #[serde(default)]
    pub returns: Option<ReturnType>,
    /// First argument names the sound(s) placed by the call.
    #[serde(default)]
    pub clip_argument: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuiltinReturn {
    pub name: String,
    pub returns: ReturnType,
}

/// Sound catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoundInfo {
    pub name: String,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub instrument: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub feature_categories: Vec<FeatureCategory>,
    pub api_functions: Vec<ApiFunction>,
    pub builtin_returns: Vec<BuiltinReturn>,
    pub sounds: Vec<SoundInfo>,
    /// Sound key used for silence/metronome clips; never reported.
    pub placeholder_sound: String,
    pub default_tempo: f64,
    pub beats_per_measure: u32,
    /// Accepted segmentation refinement passes.
    pub max_refinements: usize,
    /// Random draws from the generic suggestion pool before giving up.
    pub nucleus_retries: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            feature_categories: default_categories(),
            api_functions: default_api_functions(),
            builtin_returns: default_builtin_returns(),
            sounds: Vec::new(),
            placeholder_sound: "METRONOME".to_string(),
            default_tempo: 120.0,
            beats_per_measure: 4,
            max_refinements: 3,
            nucleus_retries: 10,
        }
    }
}

impl AnalyzerConfig {
    /// Load a TOML configuration file; missing keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Category that owns a feature, if the feature is configured.
    pub fn category_of(&self, feature: &str) -> Option<&str> {
        self.feature_categories
            .iter()
            .find(|c| c.features.iter().any(|f| f == feature))
            .map(|c| c.name.as_str())
    }

    pub fn api_function(&self, name: &str) -> Option<&ApiFunction> {
        self.api_functions.iter().find(|f| f.name == name)
    }

    pub fn is_api_function(&self, name: &str) -> bool {
        self.api_function(name).is_some()
    }

    /// Whether `name` is a built-in or API function (used for alias tracking).
    pub fn is_builtin_name(&self, name: &str) -> bool {
        self.is_api_function(name)
            || self.builtin_returns.iter().any(|b| b.name == name)
            || matches!(name, "range" | "random" | "randint" | "floor" | "print")
    }

    /// Return type of a built-in or API function, language operations first.
    pub fn builtin_return(&self, name: &str) -> Option<ReturnType> {
        self.builtin_returns
            .iter()
            .find(|b| b.name == name)
            .map(|b| b.returns)
            .or_else(|| self.api_function(name).and_then(|f| f.returns))
    }

    pub fn sound(&self, name: &str) -> Option<&SoundInfo> {
        self.sounds.iter().find(|s| s.name == name)
    }

    pub fn is_sound_name(&self, name: &str) -> bool {
        self.sound(name).is_some()
    }
}

fn default_categories() -> Vec<FeatureCategory> {
    let table: &[(&str, &[&str])] = &[
        ("errors", &["errors"]),
        ("variables", &["variables"]),
        ("makeBeat", &["makeBeat"]),
        ("iteration", &["whileLoops", "forLoopsRange", "forLoopsIterable", "iterables", "nesting"]),
        ("conditionals", &["conditionals", "usedInConditionals"]),
        ("functions", &["repeatExecution", "manipulateValue"]),
        ("features", &["indexing", "consoleInput", "listOps", "strOps", "binOps", "comparisons"]),
    ];
    table
        .iter()
        .map(|(name, features)| FeatureCategory {
            name: name.to_string(),
            features: features.iter().map(|f| f.to_string()).collect(),
        })
        .collect()
}

fn default_api_functions() -> Vec<ApiFunction> {
    use ReturnType::*;
    let table: &[(&str, Option<ReturnType>, bool)] = &[
        ("analyze", Some(Float), false),
        ("analyzeForTime", Some(Float), false),
        ("analyzeTrack", Some(Float), false),
        ("analyzeTrackForTime", Some(Float), false),
        ("createAudioSlice", Some(Str), false),
        ("createAudioStretch", Some(Str), false),
        ("dur", Some(Float), false),
        ("finish", None, false),
        ("fitMedia", None, true),
        ("importImage", Some(List), false),
        ("importFile", Some(Str), false),
        ("init", None, false),
        ("insertMedia", None, true),
        ("insertMediaSection", None, true),
        ("makeBeat", None, true),
        ("makeBeatSlice", None, true),
        ("println", None, false),
        ("readInput", Some(Str), false),
        ("replaceListElement", Some(List), false),
        ("replaceString", Some(Str), false),
        ("reverseList", Some(List), false),
        ("reverseString", Some(Str), false),
        ("rhythmEffects", None, false),
        ("selectRandomFile", Some(Str), false),
        ("setEffect", None, false),
        ("setTempo", None, false),
        ("shuffleList", Some(List), false),
        ("shuffleString", Some(Str), false),
    ];
    table
        .iter()
        .map(|(name, returns, clip_argument)| ApiFunction {
            name: name.to_string(),
            returns: *returns,
            clip_argument: *clip_argument,
        })
        .collect()
}

fn default_builtin_returns() -> Vec<BuiltinReturn> {
    use ReturnType::*;
    let table: &[(&str, ReturnType)] = &[
        ("int", Int), ("float", Float), ("str", Str), ("len", Int), ("count", Int),
        ("index", Int), ("split", List), ("startswith", Bool), ("length", Int),
        ("String", Str), ("of", List), ("copyWithin", List), ("entries", List),
        ("every", Bool), ("fill", List), ("filter", List), ("findIndex", Int),
        ("includes", Bool), ("indexOf", Int), ("join", Str), ("keys", List),
        ("lastIndexOf", Int), ("map", List), ("reverse", List), ("some", Bool),
        ("sort", List), ("splice", List), ("toLocaleString", Str), ("toSource", Str),
        ("toString", Str), ("unshift", Int), ("values", List), ("fromCharCode", Str),
        ("fromCodePoint", Str), ("charAt", Str), ("charCodeAt", Int), ("codePointAt", Int),
        ("endsWith", Bool), ("localeCompare", Int), ("match", List), ("normalize", Str),
        ("padEnd", Str), ("padStart", Str), ("repeat", Str), ("replace", Str),
        ("search", Int), ("startsWith", Bool), ("substr", Str), ("substring", Str),
        ("toLowerCase", Str), ("toUpperCase", Str), ("trim", Str), ("upper", Str),
        ("lower", Str), ("strip", Str), ("random", Float), ("randint", Int), ("floor", Int),
    ];
    table
        .iter()
        .map(|(name, returns)| BuiltinReturn { name: name.to_string(), returns: *returns })
        .collect()
}
