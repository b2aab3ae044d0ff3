//! Structured observability hooks for build lifecycle events.
//!
//! This module provides:
//! - Project-scoped tracing spans via the `BuildSpan` RAII guard, or
//!   [`op_span`] for async operations
//! - Emission functions for key events: tool invoked, tool finished, build
//!   finished, directory underflow, per-entry failures
//!
//! Events are emitted with an `event` field so they can be filtered in JSON
//! output (see [`crate::telemetry::init_tracing`]).

use std::path::Path;
use tracing::info;

/// RAII guard that enters a span tagged with the project and operation.
///
/// # Example
///
/// ```ignore
/// let _span = BuildSpan::enter("app", "build");
/// // tracing calls are now associated with project = "app"
/// ```
pub struct BuildSpan {
    _span: tracing::span::EnteredSpan,
}

impl BuildSpan {
    pub fn enter(project: &str, operation: &str) -> Self {
        Self {
            _span: op_span(project, operation).entered(),
        }
    }
}

/// Span for one lifecycle operation on a project.
///
/// Async callers attach it with `tracing::Instrument` since an entered span
/// must not be held across an await point.
pub fn op_span(project: &str, operation: &str) -> tracing::Span {
    tracing::info_span!("mkbridge.op", project = %project, operation = %operation)
}

/// Emit event: external tool started.
pub fn emit_tool_invoked(tool: &str, target: &str, working_dir: &Path) {
    info!(
        event = "tool.invoked",
        tool = %tool,
        target = %target,
        working_dir = %working_dir.display(),
    );
}

/// Emit event: external tool exited.
pub fn emit_tool_finished(tool: &str, exit_code: i32, duration_ms: u64) {
    info!(
        event = "tool.finished",
        tool = %tool,
        exit_code = exit_code,
        duration_ms = duration_ms,
    );
}

/// Emit event: build output parsed and the result finalized.
pub fn emit_build_finished(project: &str, errors: usize, warnings: usize, success: bool) {
    info!(
        event = "build.finished",
        project = %project,
        errors = errors,
        warnings = warnings,
        success = success,
    );
}

/// Emit event: a `Leaving directory` marker with nothing left to leave.
pub fn emit_directory_underflow(dir: &str, seed: &Path) {
    tracing::warn!(
        event = "parse.directory_underflow",
        dir = %dir,
        seed = %seed.display(),
    );
}

/// Emit event: an operation failed for one entry and was reported (warning level).
pub fn emit_entry_failure(operation: &str, entry: &str, error: &dyn std::fmt::Display) {
    tracing::warn!(
        event = "entry.failed",
        operation = %operation,
        entry = %entry,
        error = %error,
    );
}
