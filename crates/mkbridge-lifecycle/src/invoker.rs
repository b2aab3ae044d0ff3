//! External build tool invocation.

use async_trait::async_trait;
use mkbridge_core::domain::NO_EXIT_STATUS;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Mutex;
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tracing::warn;

use crate::error::InvokeError;
use crate::progress::ProgressMonitor;

/// `<tool> <target>` run from `working_dir`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub tool: String,
    pub target: String,
    pub working_dir: PathBuf,
}

impl ToolInvocation {
    /// Command line as shown to the user.
    pub fn command_line(&self) -> String {
        format!("{} {}", self.tool, self.target)
    }
}

/// How the tool exited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolExit {
    /// Exit status; [`NO_EXIT_STATUS`] when killed by a signal.
    pub exit_code: i32,
    pub duration_ms: u64,
}

/// Receives tool output line by line as it is produced.
pub trait OutputSink: Send + Sync {
    fn stdout_line(&self, line: &str);

    fn stderr_line(&self, line: &str);
}

/// Runs the external build tool to completion.
#[async_trait]
pub trait ToolInvoker: Send + Sync {
    async fn run(
        &self,
        invocation: &ToolInvocation,
        sink: &dyn OutputSink,
    ) -> std::result::Result<ToolExit, InvokeError>;
}

/// Invoker spawning a real process.
///
/// There is no timeout: the call returns when the tool exits.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessInvoker;

#[async_trait]
impl ToolInvoker for ProcessInvoker {
    async fn run(
        &self,
        invocation: &ToolInvocation,
        sink: &dyn OutputSink,
    ) -> std::result::Result<ToolExit, InvokeError> {
        let start = Instant::now();
        let tool = invocation.tool.clone();

        let mut child = Command::new(&invocation.tool)
            .arg(&invocation.target)
            .current_dir(&invocation.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| InvokeError::Spawn {
                tool: tool.clone(),
                source,
            })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let (out, err) = tokio::join!(
            pump(stdout, |line| sink.stdout_line(line)),
            pump(stderr, |line| sink.stderr_line(line)),
        );
        if let Err(source) = out.and(err) {
            reap(&mut child).await;
            return Err(InvokeError::Output { tool, source });
        }

        let status = child
            .wait()
            .await
            .map_err(|source| InvokeError::Wait { tool, source })?;

        Ok(ToolExit {
            exit_code: status.code().unwrap_or(NO_EXIT_STATUS),
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }
}

/// Stop a tool whose output can no longer be read and collect its status.
async fn reap(child: &mut Child) {
    if let Err(err) = child.kill().await {
        warn!(error = %err, "Failed to stop build tool");
    }
}

/// Forward every line of `reader` to `emit`, decoding lossily.
async fn pump<R, F>(reader: Option<R>, emit: F) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
    F: Fn(&str),
{
    let Some(reader) = reader else {
        return Ok(());
    };
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            return Ok(());
        }
        let line = String::from_utf8_lossy(&buf);
        emit(line.trim_end_matches(&['\n', '\r'][..]));
    }
}

/// Sink chaining tool output into the monitor log and a capture buffer.
pub struct CaptureSink<'a> {
    monitor: &'a dyn ProgressMonitor,
    buffer: Mutex<String>,
}

impl<'a> CaptureSink<'a> {
    pub fn new(monitor: &'a dyn ProgressMonitor) -> Self {
        Self {
            monitor,
            buffer: Mutex::new(String::new()),
        }
    }

    fn capture(&self, line: &str) {
        self.monitor.log(line);
        let mut buffer = self.buffer.lock().unwrap_or_else(|e| e.into_inner());
        buffer.push_str(line);
        buffer.push('\n');
    }

    /// Combined stdout and stderr, in arrival order.
    pub fn into_output(self) -> String {
        self.buffer.into_inner().unwrap_or_else(|e| e.into_inner())
    }
}

impl OutputSink for CaptureSink<'_> {
    fn stdout_line(&self, line: &str) {
        self.capture(line);
    }

    fn stderr_line(&self, line: &str) {
        self.capture(line);
    }
}

/// Sink writing tool output to the monitor log only.
pub struct MonitorSink<'a> {
    monitor: &'a dyn ProgressMonitor,
}

impl<'a> MonitorSink<'a> {
    pub fn new(monitor: &'a dyn ProgressMonitor) -> Self {
        Self { monitor }
    }
}

impl OutputSink for MonitorSink<'_> {
    fn stdout_line(&self, line: &str) {
        self.monitor.log(line);
    }

    fn stderr_line(&self, line: &str) {
        self.monitor.log(line);
    }
}
