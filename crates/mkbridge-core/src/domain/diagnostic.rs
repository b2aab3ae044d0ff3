//! Normalized build diagnostic types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Column value reported when the compiler printed the `255+` overflow marker.
pub const COLUMN_OVERFLOW: i32 = -1;

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Error,
}

impl Severity {
    /// The literal token that introduces this severity in tool output.
    pub fn token(&self) -> &'static str {
        match self {
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// A single diagnostic extracted from build tool output.
///
/// Fields are only readable once the diagnostic has been built; the
/// `with_*` builders consume `self` so a diagnostic that has been appended
/// to a result can no longer change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Diagnostic {
    severity: Severity,

    /// Source file, resolved against the directory context when relative.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    file: Option<PathBuf>,

    /// Line number (1-indexed).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    line: Option<u32>,

    /// Column number (1-indexed), or [`COLUMN_OVERFLOW`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    column: Option<i32>,

    /// Tool specific code, e.g. `CS0168`.
    code: String,

    message: String,
}

impl Diagnostic {
    /// Create a diagnostic without a location.
    pub fn new(severity: Severity, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity,
            file: None,
            line: None,
            column: None,
            code: code.into(),
            message: message.into(),
        }
    }

    /// Shorthand for an error diagnostic with no code.
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, String::new(), message)
    }

    /// Set the file.
    pub fn with_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.file = Some(file.into());
        self
    }

    /// Set the line number.
    pub fn with_line(mut self, line: u32) -> Self {
        self.line = Some(line);
        self
    }

    /// Set the column number.
    pub fn with_column(mut self, column: i32) -> Self {
        self.column = Some(column);
        self
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }

    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    pub fn line(&self) -> Option<u32> {
        self.line
    }

    pub fn column(&self) -> Option<i32> {
        self.column
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for Diagnostic {
    /// Renders in the same `file(line,column): severity code: message` shape
    /// the diagnostic was parsed from.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(file) = &self.file {
            write!(f, "{}", file.display())?;
            match (self.line, self.column) {
                (Some(line), Some(COLUMN_OVERFLOW)) => write!(f, "({line},255+)")?,
                (Some(line), Some(column)) => write!(f, "({line},{column})")?,
                (Some(line), None) => write!(f, "({line})")?,
                _ => {}
            }
            f.write_str(": ")?;
        }
        f.write_str(self.severity.token())?;
        if !self.code.is_empty() {
            write!(f, " {}", self.code)?;
        }
        write!(f, ": {}", self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Warning < Severity::Error);
    }

    #[test]
    fn test_severity_serde() {
        let json = serde_json::to_string(&Severity::Warning).expect("serialize");
        assert_eq!(json, "\"warning\"");
        let back: Severity = serde_json::from_str("\"error\"").expect("deserialize");
        assert_eq!(back, Severity::Error);
    }

    #[test]
    fn test_diagnostic_new_defaults() {
        let diag = Diagnostic::new(Severity::Warning, "CS0168", "unused variable");
        assert!(diag.file().is_none());
        assert!(diag.line().is_none());
        assert!(diag.column().is_none());
        assert!(diag.is_warning());
        assert_eq!(diag.code(), "CS0168");
    }

    #[test]
    fn test_diagnostic_display_with_location() {
        let diag = Diagnostic::new(Severity::Error, "CS0001", "bad thing")
            .with_file("/src/foo.c")
            .with_line(12)
            .with_column(5);
        assert_eq!(diag.to_string(), "/src/foo.c(12,5): error CS0001: bad thing");
    }

    #[test]
    fn test_diagnostic_display_overflow_column() {
        let diag = Diagnostic::new(Severity::Warning, "W1", "long line")
            .with_file("a.cs")
            .with_line(3)
            .with_column(COLUMN_OVERFLOW);
        assert_eq!(diag.to_string(), "a.cs(3,255+): warning W1: long line");
    }

    #[test]
    fn test_diagnostic_display_without_location() {
        let diag = Diagnostic::error("Build failed");
        assert_eq!(diag.to_string(), "error: Build failed");
    }

    #[test]
    fn test_diagnostic_json_skips_missing_location() {
        let diag = Diagnostic::new(Severity::Error, "E1", "boom");
        let json = serde_json::to_value(&diag).expect("serialize");
        assert!(json.get("file").is_none());
        assert_eq!(json["severity"], "error");
    }
}
