//! In-memory fakes for the lifecycle traits (testing only)
//!
//! Provides `RecordingMonitor`, `ScriptedInvoker`, `MemoryHandler` and
//! `MemoryConsoleFactory`, which satisfy the trait contracts without running
//! processes or touching the filesystem.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use mkbridge_core::{BuildResult, Entry, OperationOutcome};

use crate::console::{Console, ConsoleFactory, ExecutionContext};
use crate::error::{InvokeError, Result};
use crate::handler::LifecycleHandler;
use crate::invoker::{OutputSink, ToolExit, ToolInvocation, ToolInvoker};
use crate::progress::ProgressMonitor;

// ---------------------------------------------------------------------------
// RecordingMonitor
// ---------------------------------------------------------------------------

/// One call received by a [`RecordingMonitor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorCall {
    BeginTask(String, u32),
    Step(u32),
    EndTask,
    Log(String),
    Error(String, String),
    Success(String),
}

/// Monitor recording every call in order.
#[derive(Debug, Default)]
pub struct RecordingMonitor {
    calls: Mutex<Vec<MonitorCall>>,
}

impl RecordingMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, call: MonitorCall) {
        self.calls.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<MonitorCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Logged lines, in order.
    pub fn logs(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                MonitorCall::Log(line) => Some(line),
                _ => None,
            })
            .collect()
    }

    /// Messages of reported errors, in order.
    pub fn errors(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                MonitorCall::Error(message, _) => Some(message),
                _ => None,
            })
            .collect()
    }

    pub fn successes(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                MonitorCall::Success(message) => Some(message),
                _ => None,
            })
            .collect()
    }

    /// Names of the tasks begun, in order.
    pub fn tasks(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                MonitorCall::BeginTask(name, _) => Some(name),
                _ => None,
            })
            .collect()
    }

    /// Tasks begun but not yet ended.
    pub fn open_tasks(&self) -> usize {
        self.calls().iter().fold(0usize, |open, call| match call {
            MonitorCall::BeginTask(..) => open + 1,
            MonitorCall::EndTask => open.saturating_sub(1),
            _ => open,
        })
    }
}

impl ProgressMonitor for RecordingMonitor {
    fn begin_task(&self, name: &str, total_work: u32) {
        self.record(MonitorCall::BeginTask(name.to_string(), total_work));
    }

    fn step(&self, work: u32) {
        self.record(MonitorCall::Step(work));
    }

    fn end_task(&self) {
        self.record(MonitorCall::EndTask);
    }

    fn log(&self, line: &str) {
        self.record(MonitorCall::Log(line.to_string()));
    }

    fn report_error(&self, message: &str, error: &dyn fmt::Display) {
        self.record(MonitorCall::Error(message.to_string(), error.to_string()));
    }

    fn report_success(&self, message: &str) {
        self.record(MonitorCall::Success(message.to_string()));
    }
}

// ---------------------------------------------------------------------------
// ScriptedInvoker
// ---------------------------------------------------------------------------

/// A canned tool run.
#[derive(Debug, Clone)]
pub enum ScriptedRun {
    /// Emit `stdout` then `stderr` line by line and exit with `exit_code`.
    Exit {
        exit_code: i32,
        stdout: Vec<String>,
        stderr: Vec<String>,
    },
    /// The tool cannot be started.
    SpawnFailure,
}

/// Invoker replaying scripted runs in order and recording every invocation.
///
/// Once the script is exhausted every run exits 0 silently.
#[derive(Debug, Default)]
pub struct ScriptedInvoker {
    script: Mutex<VecDeque<ScriptedRun>>,
    invocations: Mutex<Vec<ToolInvocation>>,
}

impl ScriptedInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_run(self, run: ScriptedRun) -> Self {
        self.script.lock().unwrap().push_back(run);
        self
    }

    /// Queue a run printing `stdout` and exiting with `exit_code`.
    pub fn with_exit(self, exit_code: i32, stdout: &[&str]) -> Self {
        self.with_run(ScriptedRun::Exit {
            exit_code,
            stdout: stdout.iter().map(|line| line.to_string()).collect(),
            stderr: Vec::new(),
        })
    }

    pub fn with_spawn_failure(self) -> Self {
        self.with_run(ScriptedRun::SpawnFailure)
    }

    pub fn invocations(&self) -> Vec<ToolInvocation> {
        self.invocations.lock().unwrap().clone()
    }
}

#[async_trait]
impl ToolInvoker for ScriptedInvoker {
    async fn run(
        &self,
        invocation: &ToolInvocation,
        sink: &dyn OutputSink,
    ) -> std::result::Result<ToolExit, InvokeError> {
        self.invocations.lock().unwrap().push(invocation.clone());
        let next = self.script.lock().unwrap().pop_front();

        match next.unwrap_or(ScriptedRun::Exit {
            exit_code: 0,
            stdout: Vec::new(),
            stderr: Vec::new(),
        }) {
            ScriptedRun::Exit {
                exit_code,
                stdout,
                stderr,
            } => {
                for line in &stdout {
                    sink.stdout_line(line);
                }
                for line in &stderr {
                    sink.stderr_line(line);
                }
                Ok(ToolExit {
                    exit_code,
                    duration_ms: 0,
                })
            }
            ScriptedRun::SpawnFailure => Err(InvokeError::Spawn {
                tool: invocation.tool.clone(),
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "No such file or directory",
                ),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// MemoryHandler
// ---------------------------------------------------------------------------

/// Base handler serving entries from memory and recording the operations it
/// receives.
#[derive(Debug)]
pub struct MemoryHandler {
    entries: Mutex<HashMap<PathBuf, Entry>>,
    calls: Mutex<Vec<String>>,
    saved: Mutex<Vec<Entry>>,
    native_build: BuildResult,
    native_outcome: OperationOutcome,
}

impl Default for MemoryHandler {
    fn default() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            saved: Mutex::new(Vec::new()),
            native_build: BuildResult::empty(),
            native_outcome: OperationOutcome::succeeded(),
        }
    }
}

impl MemoryHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(self, path: impl Into<PathBuf>, entry: impl Into<Entry>) -> Self {
        self.entries.lock().unwrap().insert(path.into(), entry.into());
        self
    }

    /// Result returned by every native build.
    pub fn with_build_result(mut self, result: BuildResult) -> Self {
        self.native_build = result;
        self
    }

    /// Outcome returned by every native clean and execute.
    pub fn with_outcome(mut self, outcome: OperationOutcome) -> Self {
        self.native_outcome = outcome;
        self
    }

    /// Names of the operations received, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Entries passed to `save`, in order.
    pub fn saved(&self) -> Vec<Entry> {
        self.saved.lock().unwrap().clone()
    }

    fn record(&self, operation: &str) {
        self.calls.lock().unwrap().push(operation.to_string());
    }
}

#[async_trait]
impl LifecycleHandler for MemoryHandler {
    async fn load(&self, _monitor: &dyn ProgressMonitor, path: &Path) -> Result<Option<Entry>> {
        self.record("load");
        Ok(self.entries.lock().unwrap().get(path).cloned())
    }

    async fn save(&self, _monitor: &dyn ProgressMonitor, entry: &Entry) -> Result<()> {
        self.record("save");
        self.saved.lock().unwrap().push(entry.clone());
        Ok(())
    }

    fn needs_building(&self, entry: &Entry) -> bool {
        self.record("needs_building");
        entry.projects().iter().any(|project| project.needs_building)
    }

    async fn build(
        &self,
        _monitor: &dyn ProgressMonitor,
        _entry: &mut Entry,
    ) -> Result<BuildResult> {
        self.record("build");
        Ok(self.native_build.clone())
    }

    async fn clean(
        &self,
        _monitor: &dyn ProgressMonitor,
        _entry: &mut Entry,
    ) -> Result<OperationOutcome> {
        self.record("clean");
        Ok(self.native_outcome)
    }

    async fn execute(
        &self,
        _monitor: &dyn ProgressMonitor,
        _entry: &Entry,
        _context: &ExecutionContext,
    ) -> Result<OperationOutcome> {
        self.record("execute");
        Ok(self.native_outcome)
    }
}

// ---------------------------------------------------------------------------
// MemoryConsoleFactory
// ---------------------------------------------------------------------------

/// Console keeping every line it receives.
#[derive(Debug, Default)]
pub struct MemoryConsole {
    lines: Mutex<Vec<String>>,
    closed: Mutex<usize>,
}

impl MemoryConsole {
    /// Lines from both streams, in arrival order.
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }

    /// How many times the console was closed.
    pub fn close_count(&self) -> usize {
        *self.closed.lock().unwrap()
    }
}

impl Console for Arc<MemoryConsole> {
    fn stdout_line(&self, line: &str) {
        self.lines.lock().unwrap().push(line.to_string());
    }

    fn stderr_line(&self, line: &str) {
        self.lines.lock().unwrap().push(line.to_string());
    }

    fn close(&self) {
        *self.closed.lock().unwrap() += 1;
    }
}

/// Factory handing out one shared [`MemoryConsole`].
#[derive(Debug, Default)]
pub struct MemoryConsoleFactory {
    console: Arc<MemoryConsole>,
}

impl MemoryConsoleFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn console(&self) -> Arc<MemoryConsole> {
        Arc::clone(&self.console)
    }
}

impl ConsoleFactory for MemoryConsoleFactory {
    fn create_console(&self) -> Box<dyn Console> {
        Box::new(Arc::clone(&self.console))
    }
}

/// Execution context wired to `factory`.
pub fn memory_context(factory: &Arc<MemoryConsoleFactory>) -> ExecutionContext {
    ExecutionContext::new(factory.clone())
}
