//! Transform configuration and loader-query parsing.
//!
//! A build tool hands the transform a query string such as `?fetch,defaultAdd`
//! (or a JSON object `?{"fetch":true}`); every truthy key becomes a target.

use oxc_span::SourceType;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

use crate::error::{TransformError, INJ_ERR_QUERY, INJ_ERR_TARGET};
use crate::naming::is_valid_identifier;

// ═══════════════════════════════════════════════════════════════════════════════
// TARGET SET
// ═══════════════════════════════════════════════════════════════════════════════

/// Requested binding names in caller order, duplicates collapsed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetSet {
    names: Vec<String>,
}

impl TargetSet {
    pub fn from_names<I, S>(names: I) -> Result<Self, TransformError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let mut ordered = Vec::new();
        for name in names {
            let name = name.as_ref().trim();
            if !is_valid_identifier(name) {
                return Err(TransformError::new(
                    INJ_ERR_TARGET,
                    &format!("Target \"{}\" is not a valid identifier.", name),
                    "",
                ));
            }
            if seen.insert(name.to_string()) {
                ordered.push(name.to_string());
            }
        }
        Ok(TargetSet { names: ordered })
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TRANSFORM OPTIONS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct TransformOptions {
    pub targets: Vec<String>,
    /// Used for diagnostics and to pick the source type from the extension.
    pub file_path: Option<String>,
    pub typescript: bool,
    pub jsx: bool,
}

impl Default for TransformOptions {
    fn default() -> Self {
        TransformOptions {
            targets: vec![],
            file_path: None,
            typescript: true,
            jsx: true,
        }
    }
}

impl TransformOptions {
    pub fn new<I, S>(targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        TransformOptions {
            targets: targets.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn from_query(query: &str) -> Result<Self, TransformError> {
        Ok(Self::new(parse_query(query)?))
    }

    pub fn with_file_path(mut self, file_path: impl Into<String>) -> Self {
        self.file_path = Some(file_path.into());
        self
    }

    pub fn target_set(&self) -> Result<TargetSet, TransformError> {
        TargetSet::from_names(&self.targets).map_err(|mut e| {
            e.file = self.file_label().to_string();
            e
        })
    }

    pub fn file_label(&self) -> &str {
        self.file_path.as_deref().unwrap_or("")
    }

    pub fn source_type(&self) -> SourceType {
        let from_path = self
            .file_path
            .as_deref()
            .and_then(|path| SourceType::from_path(path).ok());
        match from_path {
            Some(source_type) if source_type.is_typescript() => source_type.with_module(true),
            Some(source_type) => source_type.with_module(true).with_jsx(self.jsx),
            None => SourceType::default()
                .with_module(true)
                .with_typescript(self.typescript)
                .with_jsx(self.jsx),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// QUERY PARSING
// ═══════════════════════════════════════════════════════════════════════════════

/// Parse a loader query into the ordered list of requested targets.
///
/// Accepts `""`, `"?"`, `"?a,b"`, `"?a&b"`, `"?a=true&b=false"`, `"?+a&-b"`
/// and `"?{\"a\":true}"`. Only keys with a truthy value are returned.
pub fn parse_query(query: &str) -> Result<Vec<String>, TransformError> {
    let query = query.trim();
    if query.is_empty() {
        return Ok(vec![]);
    }
    let Some(body) = query.strip_prefix('?') else {
        return Err(TransformError::new(
            INJ_ERR_QUERY,
            &format!("Query \"{}\" must begin with '?'.", query),
            "",
        ));
    };
    if body.is_empty() {
        return Ok(vec![]);
    }

    if body.starts_with('{') && body.ends_with('}') {
        let object: serde_json::Map<String, Value> = serde_json::from_str(body).map_err(|e| {
            TransformError::new(INJ_ERR_QUERY, &format!("Invalid JSON query: {}", e), "")
        })?;
        return Ok(object
            .into_iter()
            .filter(|(_, value)| is_truthy(value))
            .map(|(key, _)| key)
            .collect());
    }

    let mut entries: Vec<(String, bool)> = Vec::new();
    for arg in body.split(|c| c == ',' || c == '&') {
        if arg.is_empty() {
            continue;
        }
        let (name, enabled) = match arg.split_once('=') {
            Some((name, value)) => {
                let value = percent_decode(value);
                let enabled = !matches!(value.as_str(), "" | "false" | "null");
                (percent_decode(name.trim_end_matches("[]")), enabled)
            }
            None => {
                if let Some(name) = arg.strip_prefix('-') {
                    (percent_decode(name), false)
                } else if let Some(name) = arg.strip_prefix('+') {
                    (percent_decode(name), true)
                } else {
                    (percent_decode(arg), true)
                }
            }
        };
        // Later occurrences win, like repeated keys in an object literal.
        match entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => entry.1 = enabled,
            None => entries.push((name, enabled)),
        }
    }

    Ok(entries
        .into_iter()
        .filter(|(_, enabled)| *enabled)
        .map(|(name, _)| name)
        .collect())
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
            if let Some(byte) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}
