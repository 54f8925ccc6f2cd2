#[cfg(feature = "napi")]
use napi_derive::napi;
use serde::{Deserialize, Serialize};
use std::fmt;

// ═══════════════════════════════════════════════════════════════════════════════
// ERROR CODES
// ═══════════════════════════════════════════════════════════════════════════════

pub const INJ_ERR_PARSE: &str = "INJ-ERR-PARSE-001";
pub const INJ_ERR_TARGET: &str = "INJ-ERR-TARGET-001";
pub const INJ_ERR_QUERY: &str = "INJ-ERR-QUERY-001";
pub const INJ_ERR_COLLISION: &str = "INJ-ERR-COLLISION-001";
pub const INJ_ERR_REAPPLY: &str = "INJ-ERR-REAPPLY-001";
pub const INJ_ERR_IO: &str = "INJ-ERR-IO-001";
pub const INJ_ERR_INTERNAL: &str = "INJ-ERR-INTERNAL-001";

pub const INJ_WARN_UNKNOWN_TARGET: &str = "INJ-WARN-UNKNOWN-001";
pub const INJ_WARN_UNREWRITTEN: &str = "INJ-WARN-UNREWRITTEN-001";

fn get_hint(code: &str) -> &'static str {
    match code {
        INJ_ERR_PARSE => "The module must be valid ES module syntax (JSX and TypeScript allowed).",
        INJ_ERR_TARGET => "Target names must be plain identifiers, e.g. `fetch` or `defaultAdd`.",
        INJ_ERR_QUERY => "Use `?name1,name2` or a JSON object such as `?{\"name\":true}`.",
        INJ_ERR_COLLISION => {
            "Rename the existing identifier; generated names are derived from the target name."
        }
        INJ_ERR_REAPPLY => "Transform the original module, not its transformed output.",
        INJ_ERR_IO => "Check that the path exists and is readable/writable.",
        INJ_ERR_INTERNAL => "This is a bug in the injector.",
        INJ_WARN_UNKNOWN_TARGET => {
            "The name is not imported here; it is treated as a module-local or global binding."
        }
        INJ_WARN_UNREWRITTEN => {
            "This use-site keeps the original value when overridden. Render the component through a capitalized local inside the caller, e.g. `const Tag = K; return <Tag />;`."
        }
        _ => "Unknown code.",
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SOURCE LOCATION
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[cfg_attr(feature = "napi", napi(object))]
#[serde(rename_all = "camelCase")]
pub struct SourceLocation {
    pub line: u32,
    pub column: u32,
}

impl SourceLocation {
    /// 1-based line/column of a byte offset. Offsets past the end clamp to it.
    pub fn from_offset(source: &str, offset: u32) -> Self {
        let offset = (offset as usize).min(source.len());
        let before = source.get(..offset).unwrap_or(source);
        let line = before.matches('\n').count() as u32 + 1;
        let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
        let column = before[line_start..].chars().count() as u32 + 1;
        SourceLocation { line, column }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TRANSFORM ERROR
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "napi", napi(object))]
#[serde(rename_all = "camelCase")]
pub struct TransformError {
    pub code: String,
    pub message: String,
    pub hint: String,
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub hints: Vec<String>,
}

impl TransformError {
    pub fn new(code: &str, message: &str, file: &str) -> Self {
        Self::at(code, message, file, SourceLocation::default())
    }

    pub fn at(code: &str, message: &str, file: &str, location: SourceLocation) -> Self {
        TransformError {
            code: code.to_string(),
            message: message.to_string(),
            hint: get_hint(code).to_string(),
            file: file.to_string(),
            line: location.line,
            column: location.column,
            hints: vec![],
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hints.push(hint.into());
        self
    }
}

impl fmt::Display for TransformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if !self.file.is_empty() {
            write!(f, " ({}:{}:{})", self.file, self.line, self.column)?;
        }
        Ok(())
    }
}

impl std::error::Error for TransformError {}

// ═══════════════════════════════════════════════════════════════════════════════
// DIAGNOSTICS
// ═══════════════════════════════════════════════════════════════════════════════

/// Non-fatal finding. Never changes the emitted code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "napi", napi(object))]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub code: String,
    pub target: String,
    pub message: String,
    pub hint: String,
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl Diagnostic {
    pub fn warning(
        code: &str,
        target: &str,
        message: String,
        file: &str,
        location: SourceLocation,
    ) -> Self {
        let diagnostic = Diagnostic {
            code: code.to_string(),
            target: target.to_string(),
            message,
            hint: get_hint(code).to_string(),
            file: file.to_string(),
            line: location.line,
            column: location.column,
        };
        tracing::warn!(
            code = %diagnostic.code,
            file = %diagnostic.file,
            line = diagnostic.line,
            "{}",
            diagnostic.message
        );
        diagnostic
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_from_offset() {
        let source = "import a from 'a';\nconst b = a;\n";
        assert_eq!(
            SourceLocation::from_offset(source, 0),
            SourceLocation { line: 1, column: 1 }
        );
        assert_eq!(
            SourceLocation::from_offset(source, 25),
            SourceLocation { line: 2, column: 7 }
        );
        assert_eq!(SourceLocation::from_offset(source, 10_000).line, 3);
    }

    #[test]
    fn test_error_display() {
        let err = TransformError::at(
            INJ_ERR_PARSE,
            "Unexpected token",
            "src/add.jsx",
            SourceLocation { line: 3, column: 5 },
        );
        assert_eq!(
            err.to_string(),
            "[INJ-ERR-PARSE-001] Unexpected token (src/add.jsx:3:5)"
        );
        assert!(!err.hint.is_empty());

        let bare = TransformError::new(INJ_ERR_TARGET, "bad name", "");
        assert_eq!(bare.to_string(), "[INJ-ERR-TARGET-001] bad name");
    }
}
