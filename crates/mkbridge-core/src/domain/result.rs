//! Build and operation results.

use serde::{Deserialize, Serialize};

use super::diagnostic::{Diagnostic, Severity};

/// Message attached when the tool fails without printing a parseable diagnostic.
pub const GENERIC_BUILD_FAILURE: &str = "Build failed. See build output for details.";

/// Exit status recorded when the tool never produced one.
pub const NO_EXIT_STATUS: i32 = -1;

/// Outcome of a build: parsed diagnostics plus the raw tool output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuildResult {
    /// Diagnostics in the order their lines were scanned.
    pub diagnostics: Vec<Diagnostic>,

    /// Every scanned line, newline terminated.
    pub output: String,

    /// Exit status of the tool (0 = success).
    pub exit_code: i32,

    /// False when the tool failed without any parsed diagnostic.
    pub success: bool,

    /// Why the tool could not be run at all.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BuildResult {
    /// A successful result with no diagnostics and no output.
    pub fn empty() -> Self {
        Self {
            diagnostics: Vec::new(),
            output: String::new(),
            exit_code: 0,
            success: true,
            error: None,
        }
    }

    /// Result for a tool that could not be started or crashed before exiting.
    pub fn invocation_failed(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            diagnostics: vec![Diagnostic::error(message.clone())],
            output: String::new(),
            exit_code: NO_EXIT_STATUS,
            success: false,
            error: Some(message),
        }
    }

    pub fn error_count(&self) -> usize {
        self.count(Severity::Error)
    }

    pub fn warning_count(&self) -> usize {
        self.count(Severity::Warning)
    }

    /// Number of error diagnostics; warnings never fail a build.
    pub fn failed_build_count(&self) -> usize {
        self.error_count()
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity() == severity)
            .count()
    }
}

/// Outcome of a clean or execute operation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct OperationOutcome {
    pub success: bool,

    /// Exit status of the tool, when one was run.
    pub exit_code: Option<i32>,
}

impl OperationOutcome {
    pub fn succeeded() -> Self {
        Self {
            success: true,
            exit_code: None,
        }
    }

    pub fn failed() -> Self {
        Self {
            success: false,
            exit_code: None,
        }
    }

    pub fn with_exit_code(mut self, exit_code: i32) -> Self {
        self.exit_code = Some(exit_code);
        self
    }
}
