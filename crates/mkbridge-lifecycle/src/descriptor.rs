//! Native handler backed by JSON project descriptors.

use async_trait::async_trait;
use mkbridge_core::{BuildResult, Entry, OperationOutcome};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info};

use crate::console::ExecutionContext;
use crate::error::{LifecycleError, Result};
use crate::handler::LifecycleHandler;
use crate::progress::ProgressMonitor;

/// Loads and saves [`Entry`] descriptors as JSON files.
///
/// It has no build system of its own: native build, clean and execute fail
/// with a report, so only entries integrated with a Makefile can be built.
#[derive(Debug, Default)]
pub struct DescriptorHandler {
    /// Descriptor file of every entry loaded, by entry name.
    paths: Mutex<HashMap<String, PathBuf>>,
}

impl DescriptorHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Path `entry` was loaded from, if it was loaded through this handler.
    pub fn path_of(&self, entry: &Entry) -> Option<PathBuf> {
        let paths = self.paths.lock().unwrap_or_else(|e| e.into_inner());
        paths.get(entry.name()).cloned()
    }

    fn remember(&self, entry: &Entry, path: &Path) {
        let mut paths = self.paths.lock().unwrap_or_else(|e| e.into_inner());
        paths.insert(entry.name().to_string(), path.to_path_buf());
    }
}

#[async_trait]
impl LifecycleHandler for DescriptorHandler {
    async fn load(&self, _monitor: &dyn ProgressMonitor, path: &Path) -> Result<Option<Entry>> {
        let text = match tokio::fs::read_to_string(path).await {
            Ok(text) => text,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "No descriptor");
                return Ok(None);
            }
            Err(source) => {
                return Err(LifecycleError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let entry: Entry =
            serde_json::from_str(&text).map_err(|source| LifecycleError::Descriptor {
                path: path.to_path_buf(),
                source,
            })?;
        self.remember(&entry, path);
        info!(entry = %entry.name(), path = %path.display(), "Loaded descriptor");
        Ok(Some(entry))
    }

    async fn save(&self, _monitor: &dyn ProgressMonitor, entry: &Entry) -> Result<()> {
        let path = self
            .path_of(entry)
            .ok_or_else(|| LifecycleError::UnknownEntry(entry.name().to_string()))?;

        let mut json =
            serde_json::to_string_pretty(entry).map_err(|source| LifecycleError::Descriptor {
                path: path.clone(),
                source,
            })?;
        json.push('\n');

        tokio::fs::write(&path, json)
            .await
            .map_err(|source| LifecycleError::Write {
                path: path.clone(),
                source,
            })?;
        debug!(entry = %entry.name(), path = %path.display(), "Saved descriptor");
        Ok(())
    }

    fn needs_building(&self, entry: &Entry) -> bool {
        entry.projects().iter().any(|project| project.needs_building)
    }

    async fn build(&self, monitor: &dyn ProgressMonitor, entry: &mut Entry) -> Result<BuildResult> {
        let message = format!("No native build is available for {}", entry.name());
        monitor.report_error(&message, &"enable Makefile integration to build it");
        Ok(BuildResult::invocation_failed(message))
    }

    async fn clean(
        &self,
        monitor: &dyn ProgressMonitor,
        entry: &mut Entry,
    ) -> Result<OperationOutcome> {
        monitor.report_error(
            &format!("No native clean is available for {}", entry.name()),
            &"enable Makefile integration to clean it",
        );
        Ok(OperationOutcome::failed())
    }

    async fn execute(
        &self,
        monitor: &dyn ProgressMonitor,
        entry: &Entry,
        _context: &ExecutionContext,
    ) -> Result<OperationOutcome> {
        monitor.report_error(
            &format!("No native execution is available for {}", entry.name()),
            &"enable Makefile integration to execute it",
        );
        Ok(OperationOutcome::failed())
    }
}
