//! Makefile integration layered over a native lifecycle handler.
//!
//! [`MakefileExtension`] decorates another [`LifecycleHandler`]. Projects
//! whose build configuration enables integration are built, cleaned and
//! executed by running `<tool> <target>` in the project's base directory;
//! everything else is passed through to the wrapped handler untouched.
//!
//! Load and save always go through the wrapped handler first. The extension
//! then syncs each integrated project with its Makefile: source files and
//! project references are read on load and written back on save. A failure
//! for one project is reported on the monitor and never stops its siblings.

use async_trait::async_trait;
use mkbridge_core::{
    aggregate, emit_build_finished, emit_entry_failure, emit_tool_finished, emit_tool_invoked,
    op_span, render_project, resolve_project_references, update_project, BuildResult, Entry,
    ExtractorConfig, LineExtractor, Makefile, Operation, OperationOutcome, Project,
};
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, Instrument};

use crate::console::{ConsoleSession, ExecutionContext};
use crate::error::{InvokeError, LifecycleError, Result};
use crate::handler::LifecycleHandler;
use crate::invoker::{
    CaptureSink, MonitorSink, OutputSink, ToolExit, ToolInvocation, ToolInvoker,
};
use crate::progress::{ProgressMonitor, TaskScope};

/// What an integrated operation will run, taken from the project's
/// configuration when the operation starts.
#[derive(Debug, Clone)]
struct Plan {
    project: String,
    invocation: ToolInvocation,
}

impl Plan {
    /// `None` when `op` must be handled natively: the entry is not a project,
    /// integration is off, or no target is configured for `op`.
    fn for_entry(entry: &Entry, op: Operation) -> Option<Self> {
        let project = entry.as_project()?;
        let config = project.enabled_config()?;
        let target = config.active_target(op)?;
        Some(Self {
            project: project.name.clone(),
            invocation: ToolInvocation {
                tool: config.tool.clone(),
                target: target.to_string(),
                working_dir: project.base_directory.clone(),
            },
        })
    }
}

/// Lifecycle handler routing integrated projects through an external `make`.
pub struct MakefileExtension<H, I> {
    next: H,
    invoker: I,
}

impl<H, I> MakefileExtension<H, I>
where
    H: LifecycleHandler,
    I: ToolInvoker,
{
    pub fn new(next: H, invoker: I) -> Self {
        Self { next, invoker }
    }

    /// The wrapped handler.
    pub fn next(&self) -> &H {
        &self.next
    }

    pub fn invoker(&self) -> &I {
        &self.invoker
    }

    async fn run_tool(
        &self,
        invocation: &ToolInvocation,
        sink: &dyn OutputSink,
    ) -> std::result::Result<ToolExit, InvokeError> {
        emit_tool_invoked(
            &invocation.tool,
            &invocation.target,
            &invocation.working_dir,
        );
        let exit = self.invoker.run(invocation, sink).await?;
        emit_tool_finished(&invocation.tool, exit.exit_code, exit.duration_ms);
        Ok(exit)
    }

    async fn run_build(
        &self,
        monitor: &dyn ProgressMonitor,
        plan: &Plan,
        entry: &mut Entry,
    ) -> Result<BuildResult> {
        let task = TaskScope::begin(monitor, &format!("Building {}", plan.project), 1);
        let sink = CaptureSink::new(monitor);

        let exit = match self.run_tool(&plan.invocation, &sink).await {
            Ok(exit) => exit,
            Err(err) => {
                monitor.report_error("Project could not be built", &err);
                return Ok(BuildResult::invocation_failed(err.to_string()));
            }
        };

        let extractor = LineExtractor::new(&ExtractorConfig::for_tool(&plan.invocation.tool))?;
        let result = aggregate(
            &extractor,
            &sink.into_output(),
            exit.exit_code,
            &plan.invocation.working_dir,
        );
        task.step(1);

        if result.success {
            if let Some(project) = entry.as_project_mut() {
                project.needs_building = false;
            }
        }
        emit_build_finished(
            &plan.project,
            result.error_count(),
            result.warning_count(),
            result.success,
        );
        Ok(result)
    }

    async fn run_clean(
        &self,
        monitor: &dyn ProgressMonitor,
        plan: &Plan,
        entry: &mut Entry,
    ) -> Result<OperationOutcome> {
        let _task = TaskScope::begin(monitor, "Cleaning project", 1);
        let sink = MonitorSink::new(monitor);
        let failure = format!(
            "An unspecified error occurred while running '{}'",
            plan.invocation.command_line()
        );

        let exit = match self.run_tool(&plan.invocation, &sink).await {
            Ok(exit) => exit,
            Err(err) => {
                monitor.report_error(&failure, &err);
                return Ok(OperationOutcome::failed());
            }
        };

        if exit.exit_code != 0 {
            monitor.report_error(&failure, &format!("exit code {}", exit.exit_code));
            return Ok(OperationOutcome::failed().with_exit_code(exit.exit_code));
        }

        if let Some(project) = entry.as_project_mut() {
            project.needs_building = true;
        }
        monitor.report_success("Project successfully cleaned");
        Ok(OperationOutcome::succeeded().with_exit_code(exit.exit_code))
    }

    async fn run_execute(
        &self,
        monitor: &dyn ProgressMonitor,
        plan: &Plan,
        context: &ExecutionContext,
    ) -> Result<OperationOutcome> {
        let console = ConsoleSession::open(context);
        let _task = TaskScope::begin(monitor, &format!("Executing {}", plan.project), 1);

        match self.run_tool(&plan.invocation, &console).await {
            Ok(exit) => {
                monitor.log(&format!(
                    "The application exited with code: {}",
                    exit.exit_code
                ));
                let outcome = if exit.exit_code == 0 {
                    OperationOutcome::succeeded()
                } else {
                    OperationOutcome::failed()
                };
                Ok(outcome.with_exit_code(exit.exit_code))
            }
            Err(err) => {
                monitor.report_error(
                    &format!("Cannot execute '{}'", plan.invocation.command_line()),
                    &err,
                );
                Ok(OperationOutcome::failed())
            }
        }
    }

    /// Bind the configuration to its project and, when integration is on,
    /// refresh files and references from the Makefile.
    async fn load_project(&self, monitor: &dyn ProgressMonitor, project: &mut Project) {
        let id = project.id;
        let Some(config) = project.build_config.as_mut() else {
            return;
        };
        let _task = TaskScope::begin(monitor, "Updating project from Makefile", 1);
        config.owner = Some(id);
        if !config.integration_enabled {
            return;
        }
        let path = config.absolute_makefile.clone();

        let updated = match tokio::fs::read_to_string(&path).await {
            Ok(text) => {
                update_project(project, &Makefile::parse(&text)).map_err(LifecycleError::from)
            }
            Err(source) => Err(LifecycleError::Read { path, source }),
        };
        if let Err(err) = updated {
            monitor.report_error(
                &format!("Error loading Makefile for project {}", project.name),
                &err,
            );
            emit_entry_failure("load", &project.name, &err);
        }
    }
}

/// Render `project` into the Makefile at `path`, writing only on change.
async fn save_makefile(project: &Project, path: &Path) -> Result<()> {
    let text = match tokio::fs::read_to_string(path).await {
        Ok(text) => text,
        Err(err) if err.kind() == ErrorKind::NotFound => String::new(),
        Err(source) => {
            return Err(LifecycleError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let mut makefile = Makefile::parse(&text);
    render_project(project, &mut makefile)?;
    let rendered = makefile.to_string();
    if rendered == text {
        debug!(path = %path.display(), "Makefile unchanged");
        return Ok(());
    }

    tokio::fs::write(path, rendered)
        .await
        .map_err(|source| LifecycleError::Write {
            path: path.to_path_buf(),
            source,
        })
}

#[async_trait]
impl<H, I> LifecycleHandler for MakefileExtension<H, I>
where
    H: LifecycleHandler,
    I: ToolInvoker,
{
    async fn load(&self, monitor: &dyn ProgressMonitor, path: &Path) -> Result<Option<Entry>> {
        let Some(mut entry) = self.next.load(monitor, path).await? else {
            return Ok(None);
        };

        match &mut entry {
            Entry::Project(project) => self.load_project(monitor, project).await,
            Entry::Group(group) => {
                for project in group.projects_mut() {
                    self.load_project(monitor, project).await;
                }
                if let Err(err) = resolve_project_references(group) {
                    monitor.report_error(
                        &format!(
                            "Error resolving Makefile based project references for solution {}",
                            group.name
                        ),
                        &err,
                    );
                    emit_entry_failure("load", &group.name, &err);
                }
            }
        }
        Ok(Some(entry))
    }

    async fn save(&self, monitor: &dyn ProgressMonitor, entry: &Entry) -> Result<()> {
        self.next.save(monitor, entry).await?;

        for project in entry.projects() {
            let Some(config) = project.enabled_config() else {
                continue;
            };
            let path = &config.absolute_makefile;
            if let Err(err) = save_makefile(project, path).await {
                monitor.report_error(
                    &format!(
                        "Error saving to Makefile ({}) for project {}",
                        path.display(),
                        project.name
                    ),
                    &err,
                );
                emit_entry_failure("save", &project.name, &err);
            }
        }
        Ok(())
    }

    fn needs_building(&self, entry: &Entry) -> bool {
        self.next.needs_building(entry)
    }

    async fn build(&self, monitor: &dyn ProgressMonitor, entry: &mut Entry) -> Result<BuildResult> {
        let Some(plan) = Plan::for_entry(entry, Operation::Build) else {
            return self.next.build(monitor, entry).await;
        };
        self.run_build(monitor, &plan, entry)
            .instrument(op_span(&plan.project, Operation::Build.name()))
            .await
    }

    async fn clean(
        &self,
        monitor: &dyn ProgressMonitor,
        entry: &mut Entry,
    ) -> Result<OperationOutcome> {
        let Some(plan) = Plan::for_entry(entry, Operation::Clean) else {
            return self.next.clean(monitor, entry).await;
        };
        self.run_clean(monitor, &plan, entry)
            .instrument(op_span(&plan.project, Operation::Clean.name()))
            .await
    }

    async fn execute(
        &self,
        monitor: &dyn ProgressMonitor,
        entry: &Entry,
        context: &ExecutionContext,
    ) -> Result<OperationOutcome> {
        let Some(plan) = Plan::for_entry(entry, Operation::Execute) else {
            return self.next.execute(monitor, entry, context).await;
        };
        self.run_execute(monitor, &plan, context)
            .instrument(op_span(&plan.project, Operation::Execute.name()))
            .await
    }
}
