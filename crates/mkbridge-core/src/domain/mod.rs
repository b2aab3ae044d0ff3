//! Domain types for mkbridge.

pub mod config;
pub mod diagnostic;
pub mod error;
pub mod project;
pub mod result;

pub use config::{Operation, ProjectBuildConfig, DEFAULT_TOOL};
pub use diagnostic::{Diagnostic, Severity, COLUMN_OVERFLOW};
pub use error::{BridgeError, Result};
pub use project::{Entry, Project, ProjectGroup, ProjectId, ProjectReference};
pub use result::{BuildResult, OperationOutcome, GENERIC_BUILD_FAILURE, NO_EXIT_STATUS};
