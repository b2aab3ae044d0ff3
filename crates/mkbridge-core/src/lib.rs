//! mkbridge Core Library
//!
//! Turns the textual output of a recursive `make` run into structured
//! diagnostics, and models the per-project Makefile integration settings.
//!
//! - [`directory_stack`]: directory context tracking for `Entering`/`Leaving` markers
//! - [`extractor`]: per-line classification and diagnostic extraction
//! - [`aggregator`]: accumulation into a [`BuildResult`]
//! - [`makefile`]: Makefile variable model and project sync

pub mod aggregator;
pub mod directory_stack;
pub mod domain;
pub mod extractor;
pub mod makefile;
pub mod obs;
pub mod telemetry;

pub use aggregator::{aggregate, parse_output, DiagnosticAggregator, ParsedOutput};
pub use directory_stack::DirectoryStack;
pub use domain::{
    BridgeError, BuildResult, Diagnostic, Entry, Operation, OperationOutcome, Project,
    ProjectBuildConfig, ProjectGroup, ProjectId, ProjectReference, Result, Severity,
    COLUMN_OVERFLOW, DEFAULT_TOOL, GENERIC_BUILD_FAILURE,
};
pub use extractor::{ExtractorConfig, Extracted, LineClass, LineExtractor};
pub use makefile::{render_project, resolve_project_references, update_project, Makefile};
pub use obs::{
    emit_build_finished, emit_directory_underflow, emit_entry_failure, emit_tool_finished,
    emit_tool_invoked, op_span, BuildSpan,
};
pub use telemetry::init_tracing;
