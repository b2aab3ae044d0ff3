//! Progress reporting for lifecycle operations.

use std::fmt;
use tracing::{debug, error, info};

/// Receives progress, log output and error reports from an operation.
///
/// Methods take `&self` so a monitor can be shared by the operation and the
/// output sinks feeding it.
pub trait ProgressMonitor: Send + Sync {
    fn begin_task(&self, name: &str, total_work: u32);

    fn step(&self, work: u32);

    fn end_task(&self);

    /// One line of tool output.
    fn log(&self, line: &str);

    fn report_error(&self, message: &str, error: &dyn fmt::Display);

    fn report_success(&self, message: &str);
}

/// RAII task: begins on construction and ends when dropped, so the task is
/// closed on every exit path.
pub struct TaskScope<'a> {
    monitor: &'a dyn ProgressMonitor,
}

impl<'a> TaskScope<'a> {
    pub fn begin(monitor: &'a dyn ProgressMonitor, name: &str, total_work: u32) -> Self {
        monitor.begin_task(name, total_work);
        Self { monitor }
    }

    pub fn step(&self, work: u32) {
        self.monitor.step(work);
    }
}

impl Drop for TaskScope<'_> {
    fn drop(&mut self) {
        self.monitor.end_task();
    }
}

/// Monitor that turns progress into tracing events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingMonitor;

impl ProgressMonitor for TracingMonitor {
    fn begin_task(&self, name: &str, total_work: u32) {
        info!(task = %name, total_work, "Task started");
    }

    fn step(&self, work: u32) {
        debug!(work, "Task progress");
    }

    fn end_task(&self) {
        debug!("Task finished");
    }

    fn log(&self, line: &str) {
        info!(target: "mkbridge::output", "{line}");
    }

    fn report_error(&self, message: &str, err: &dyn fmt::Display) {
        error!(error = %err, "{message}");
    }

    fn report_success(&self, message: &str) {
        info!("{message}");
    }
}
