//! Error types for the lifecycle layer.

use mkbridge_core::BridgeError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while running the external build tool.
#[derive(Error, Debug)]
pub enum InvokeError {
    /// Tool missing or not executable
    #[error("failed to start '{tool}': {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    /// Reading the tool's output pipes failed
    #[error("failed to read output of '{tool}': {source}")]
    Output {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    /// Waiting for the tool to exit failed
    #[error("failed to wait for '{tool}': {source}")]
    Wait {
        tool: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that can occur in lifecycle handlers.
#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid project descriptor {}: {source}", path.display())]
    Descriptor {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("entry '{0}' was not loaded through this handler")]
    UnknownEntry(String),

    #[error(transparent)]
    Bridge(#[from] BridgeError),

    #[error(transparent)]
    Invoke(#[from] InvokeError),
}

/// Result type for lifecycle operations.
pub type Result<T> = std::result::Result<T, LifecycleError>;
