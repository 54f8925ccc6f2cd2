//! Generated identifier names and output markers.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub const BEGIN_MARKER: &str = "// BEGIN-injectable-loader";
pub const END_MARKER: &str = "// END-injectable-loader";

pub const RESET_FUNCTION: &str = "resetAllInjects";
pub const OVERWRITE_PARAM: &str = "paramOverwrite";

lazy_static! {
    static ref IDENTIFIER_RE: Regex = Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").unwrap();
}

/// Words that cannot name a binding in a strict-mode module.
const RESERVED_WORDS: [&str; 46] = [
    "await", "break", "case", "catch", "class", "const", "continue", "debugger", "default",
    "delete", "do", "else", "enum", "export", "extends", "false", "finally", "for", "function",
    "if", "implements", "import", "in", "instanceof", "interface", "let", "new", "null",
    "package", "private", "protected", "public", "return", "static", "super", "switch", "this",
    "throw", "true", "try", "typeof", "var", "void", "while", "with", "yield",
];

pub fn is_valid_identifier(name: &str) -> bool {
    IDENTIFIER_RE.is_match(name) && !RESERVED_WORDS.contains(&name)
}

/// Upper-cases the first character, leaving the rest untouched.
pub fn capitalize_first(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// The four identifiers derived from one target name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedNames {
    pub target: String,
    /// Exported alias of the override function.
    pub injectable: String,
    /// Internal override function.
    pub overwrite: String,
    /// Mutable alias that replaces every use-site.
    pub overwritten: String,
    /// Load-time capture used by reset.
    pub default: String,
}

impl GeneratedNames {
    pub fn for_target(target: &str) -> Self {
        let capitalized = capitalize_first(target);
        GeneratedNames {
            target: target.to_string(),
            injectable: format!("injectable{}", capitalized),
            overwrite: format!("overwrite{}", capitalized),
            overwritten: format!("overwritten{}", capitalized),
            default: format!("default{}", capitalized),
        }
    }

    pub fn all(&self) -> [&str; 4] {
        [
            self.injectable.as_str(),
            self.overwrite.as_str(),
            self.overwritten.as_str(),
            self.default.as_str(),
        ]
    }
}

pub fn wrap_with_markers(code: &str) -> String {
    format!("{}\n{}\n{}", BEGIN_MARKER, code.trim_end(), END_MARKER)
}
