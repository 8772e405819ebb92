/// Language Domain Module
///
/// Defines the surface languages students write their scripts in.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Supported student script languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    JavaScript,
}

impl Language {
    /// Parse language from string (CLI input or IPC params).
    pub fn from_str(s: &str) -> Option<Language> {
        match s.to_lowercase().as_str() {
            "python" | "py" => Some(Language::Python),
            "javascript" | "js" => Some(Language::JavaScript),
            _ => None,
        }
    }

    /// Infer language from file extension.
    pub fn from_extension(ext: &str) -> Option<Language> {
        let ext = ext.to_lowercase();
        [Language::Python, Language::JavaScript]
            .into_iter()
            .find(|lang| lang.extensions().contains(&ext.as_str()))
    }

    /// Infer language from a file path.
    pub fn from_path(path: &Path) -> Option<Language> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Get the display name of the language.
    pub fn name(&self) -> &'static str {
        match self {
            Language::Python => "Python",
            Language::JavaScript => "JavaScript",
        }
    }

    /// Get the file extensions for this language.
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Language::Python => &["py"],
            Language::JavaScript => &["js"],
        }
    }

    /// Get the external parser program that emits this language's AST as JSON.
    pub fn parser_command(&self) -> &'static str {
        match self {
            Language::Python => "python3",
            Language::JavaScript => "acorn",
        }
    }

    /// Get installation instructions for the external parser.
    pub fn install_instructions(&self) -> &'static str {
        match self {
            Language::Python => "Install Python 3 (the standard `ast` module is used): https://www.python.org/downloads/",
            Language::JavaScript => "Install acorn: npm install -g acorn",
        }
    }

    /// Method names that operate on lists in this language.
    pub fn list_methods(&self) -> &'static [&'static str] {
        match self {
            Language::Python => PY_LIST_FUNCS,
            Language::JavaScript => JS_LIST_FUNCS,
        }
    }

    /// Method names that operate on strings in this language.
    pub fn string_methods(&self) -> &'static [&'static str] {
        match self {
            Language::Python => PY_STR_FUNCS,
            Language::JavaScript => JS_STR_FUNCS,
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

pub const PY_LIST_FUNCS: &[&str] = &[
    "append", "count", "extend", "index", "insert", "pop", "remove", "reverse", "sort",
];

pub const PY_STR_FUNCS: &[&str] = &[
    "join", "split", "strip", "rstrip", "lstrip", "startswith", "upper", "lower",
];

pub const JS_LIST_FUNCS: &[&str] = &[
    "length", "of", "concat", "copyWithin", "entries", "every", "fill", "filter", "find",
    "findIndex", "forEach", "includes", "indexOf", "join", "keys", "lastIndexOf", "map", "pop",
    "push", "reduce", "reduceRight", "reverse", "shift", "slice", "some", "sort", "splice",
    "toLocaleString", "toSource", "toString", "unshift", "values",
];

pub const JS_STR_FUNCS: &[&str] = &[
    "length", "fromCharCode", "fromCodePoint", "anchor", "big", "blink", "bold", "charAt",
    "charCodeAt", "codePointAt", "concat", "endsWith", "fixed", "fontcolor", "fontsize",
    "includes", "indexOf", "italics", "lastIndexOf", "link", "localeCompare", "match",
    "normalize", "padEnd", "padStart", "quote", "repeat", "replace", "search", "slice", "small",
    "split", "startsWith", "strike", "sub", "substr", "substring", "sup", "toLocaleLowerCase",
    "toLocaleUpperCase", "toLowerCase", "toSource", "toString", "toUpperCase", "trim",
    "trimLeft", "trimRight", "valueOf", "raw",
];

/// Global objects whose static methods are treated as plain calls.
pub const JS_BUILT_IN_OBJECTS: &[&str] = &[
    "Math", "Object", "Function", "Boolean", "Symbol", "Error", "Number", "BigInt", "Date",
    "String", "RegExp", "Array", "Map", "Set",
];
