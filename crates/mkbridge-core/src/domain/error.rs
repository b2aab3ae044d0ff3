//! Domain-level error taxonomy for mkbridge.

use std::path::PathBuf;

/// mkbridge domain errors.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("invalid output pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("project {project} has no Makefile integration")]
    NotConfigured { project: String },

    #[error("unresolved project references in {group}: {}", display_paths(.paths))]
    UnresolvedReferences { group: String, paths: Vec<PathBuf> },
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type for mkbridge domain operations.
pub type Result<T> = std::result::Result<T, BridgeError>;
