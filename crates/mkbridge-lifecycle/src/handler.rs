//! The lifecycle handler seam.

use async_trait::async_trait;
use mkbridge_core::{BuildResult, Entry, OperationOutcome};
use std::path::Path;

use crate::console::ExecutionContext;
use crate::error::Result;
use crate::progress::ProgressMonitor;

/// Handles project lifecycle operations.
///
/// Handlers are layered: an extension holds the next handler and delegates
/// whatever it does not handle itself. Errors returned by a handler propagate
/// through every layer above it unchanged.
#[async_trait]
pub trait LifecycleHandler: Send + Sync {
    /// Load the entry stored at `path`, or `None` when this handler does not
    /// recognise it.
    async fn load(&self, monitor: &dyn ProgressMonitor, path: &Path) -> Result<Option<Entry>>;

    async fn save(&self, monitor: &dyn ProgressMonitor, entry: &Entry) -> Result<()>;

    fn needs_building(&self, entry: &Entry) -> bool;

    async fn build(&self, monitor: &dyn ProgressMonitor, entry: &mut Entry) -> Result<BuildResult>;

    async fn clean(
        &self,
        monitor: &dyn ProgressMonitor,
        entry: &mut Entry,
    ) -> Result<OperationOutcome>;

    async fn execute(
        &self,
        monitor: &dyn ProgressMonitor,
        entry: &Entry,
        context: &ExecutionContext,
    ) -> Result<OperationOutcome>;
}
