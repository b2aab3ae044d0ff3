//! Interactive consoles for executed applications.

use std::io::Write;
use std::sync::Arc;

use crate::invoker::OutputSink;

/// Destination for a running application's output.
pub trait Console: Send + Sync {
    fn stdout_line(&self, line: &str);

    fn stderr_line(&self, line: &str);

    /// Called once the application has exited or failed to start.
    fn close(&self);
}

/// Creates a console per execution.
pub trait ConsoleFactory: Send + Sync {
    fn create_console(&self) -> Box<dyn Console>;
}

/// What an execute operation needs from its caller.
#[derive(Clone)]
pub struct ExecutionContext {
    pub console_factory: Arc<dyn ConsoleFactory>,
}

impl ExecutionContext {
    pub fn new(console_factory: Arc<dyn ConsoleFactory>) -> Self {
        Self { console_factory }
    }
}

/// Console writing to the process's own stdout and stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdConsole;

impl Console for StdConsole {
    fn stdout_line(&self, line: &str) {
        let mut out = std::io::stdout().lock();
        let _ = writeln!(out, "{line}");
    }

    fn stderr_line(&self, line: &str) {
        let mut err = std::io::stderr().lock();
        let _ = writeln!(err, "{line}");
    }

    fn close(&self) {
        let _ = std::io::stdout().flush();
        let _ = std::io::stderr().flush();
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct StdConsoleFactory;

impl ConsoleFactory for StdConsoleFactory {
    fn create_console(&self) -> Box<dyn Console> {
        Box::new(StdConsole)
    }
}

/// An open console used as a tool output sink. Closed when dropped.
pub(crate) struct ConsoleSession {
    console: Box<dyn Console>,
}

impl ConsoleSession {
    pub(crate) fn open(context: &ExecutionContext) -> Self {
        Self {
            console: context.console_factory.create_console(),
        }
    }
}

impl OutputSink for ConsoleSession {
    fn stdout_line(&self, line: &str) {
        self.console.stdout_line(line);
    }

    fn stderr_line(&self, line: &str) {
        self.console.stderr_line(line);
    }
}

impl Drop for ConsoleSession {
    fn drop(&mut self) {
        self.console.close();
    }
}
