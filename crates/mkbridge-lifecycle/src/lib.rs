//! mkbridge Lifecycle
//!
//! Build lifecycle extension that routes build, clean and execute of
//! Makefile-integrated projects through an external `make` run, and keeps
//! projects in sync with their Makefiles on load and save.
//!
//! # Example
//!
//! ```ignore
//! use mkbridge_lifecycle::{DescriptorHandler, MakefileExtension, ProcessInvoker, TracingMonitor};
//!
//! let handler = MakefileExtension::new(DescriptorHandler::new(), ProcessInvoker);
//! let monitor = TracingMonitor;
//! if let Some(mut entry) = handler.load(&monitor, "app.json".as_ref()).await? {
//!     let result = handler.build(&monitor, &mut entry).await?;
//!     println!("{} error(s)", result.error_count());
//! }
//! ```

pub mod console;
pub mod descriptor;
pub mod error;
pub mod extension;
pub mod fakes;
pub mod handler;
pub mod invoker;
pub mod progress;

pub use console::{Console, ConsoleFactory, ExecutionContext, StdConsole, StdConsoleFactory};
pub use descriptor::DescriptorHandler;
pub use error::{InvokeError, LifecycleError, Result};
pub use extension::MakefileExtension;
pub use handler::LifecycleHandler;
pub use invoker::{
    CaptureSink, MonitorSink, OutputSink, ProcessInvoker, ToolExit, ToolInvocation, ToolInvoker,
};
pub use progress::{ProgressMonitor, TaskScope, TracingMonitor};
