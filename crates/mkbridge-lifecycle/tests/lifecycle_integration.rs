//! Integration tests for the Makefile lifecycle extension.
//!
//! Every test wires `MakefileExtension` over the in-memory fakes, so no
//! process is spawned.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use mkbridge_core::{
    BuildResult, Diagnostic, Entry, Makefile, OperationOutcome, Project, ProjectBuildConfig,
    ProjectGroup, ProjectReference, GENERIC_BUILD_FAILURE,
};
use mkbridge_lifecycle::fakes::{
    memory_context, MemoryConsoleFactory, MemoryHandler, RecordingMonitor, ScriptedInvoker,
};
use mkbridge_lifecycle::{LifecycleHandler, MakefileExtension};
use tracing_test::traced_test;

fn integrated(name: &str, dir: &Path) -> Project {
    Project::new(name, dir).with_build_config(ProjectBuildConfig::new(dir.join("Makefile")))
}

fn with_vars(mut project: Project, files: &str, refs: &str) -> Project {
    if let Some(config) = project.build_config.as_mut() {
        config.build_files_var = Some(files.to_string());
        config.project_refs_var = Some(refs.to_string());
    }
    project
}

fn extension(invoker: ScriptedInvoker) -> MakefileExtension<MemoryHandler, ScriptedInvoker> {
    MakefileExtension::new(MemoryHandler::new(), invoker)
}

// ---------------------------------------------------------------------------
// Delegation
// ---------------------------------------------------------------------------

/// Test: disabled integration behaves exactly like the wrapped handler
#[tokio::test]
async fn test_disabled_integration_is_transparent() {
    let native = BuildResult::invocation_failed("native failure");
    let base = MemoryHandler::new()
        .with_build_result(native.clone())
        .with_outcome(OperationOutcome::failed().with_exit_code(7));
    let ext = MakefileExtension::new(base, ScriptedInvoker::new());
    let monitor = RecordingMonitor::new();
    let factory = Arc::new(MemoryConsoleFactory::new());

    let project = Project::new("app", "/w/app")
        .with_build_config(ProjectBuildConfig::new("/w/app/Makefile").disabled());
    let mut entry = Entry::Project(project);

    let built = ext.build(&monitor, &mut entry).await.expect("build");
    let cleaned = ext.clean(&monitor, &mut entry).await.expect("clean");
    let executed = ext
        .execute(&monitor, &entry, &memory_context(&factory))
        .await
        .expect("execute");

    assert_eq!(built, native);
    assert_eq!(cleaned, OperationOutcome::failed().with_exit_code(7));
    assert_eq!(executed, cleaned);
    assert!(ext.invoker().invocations().is_empty());
    assert_eq!(ext.next().calls(), vec!["build", "clean", "execute"]);
    assert!(monitor.calls().is_empty());
    assert_eq!(factory.console().close_count(), 0);
}

/// Test: groups and projects without config are always delegated
#[tokio::test]
async fn test_groups_and_plain_projects_delegate() {
    let ext = extension(ScriptedInvoker::new());
    let monitor = RecordingMonitor::new();

    let mut group = Entry::Group(
        ProjectGroup::new("solution").with_entry(integrated("app", Path::new("/w/app"))),
    );
    let mut plain = Entry::Project(Project::new("tool", "/w/tool"));

    assert_eq!(
        ext.build(&monitor, &mut group).await.expect("build"),
        BuildResult::empty()
    );
    ext.build(&monitor, &mut plain).await.expect("build");

    assert!(ext.invoker().invocations().is_empty());
    assert_eq!(ext.next().calls(), vec!["build", "build"]);
}

/// Test: an empty target name falls through for that operation only
#[tokio::test]
async fn test_unset_target_delegates_operation() {
    let mut project = integrated("app", Path::new("/w/app"));
    if let Some(config) = project.build_config.as_mut() {
        config.clean_target = None;
    }
    let mut entry = Entry::Project(project);
    let ext = extension(ScriptedInvoker::new());
    let monitor = RecordingMonitor::new();

    ext.clean(&monitor, &mut entry).await.expect("clean");
    ext.build(&monitor, &mut entry).await.expect("build");

    assert_eq!(ext.next().calls(), vec!["clean"]);
    let invocations = ext.invoker().invocations();
    assert_eq!(invocations.len(), 1);
    assert_eq!(invocations[0].target, "all");
}

/// Test: needs_building is answered by the wrapped handler
#[tokio::test]
async fn test_needs_building_delegates() {
    let ext = extension(ScriptedInvoker::new());
    let entry = Entry::Project(integrated("app", Path::new("/w/app")));

    assert!(ext.needs_building(&entry));
    assert_eq!(ext.next().calls(), vec!["needs_building"]);
}

// ---------------------------------------------------------------------------
// Build
// ---------------------------------------------------------------------------

/// Test: a clean build returns parsed diagnostics and clears the rebuild flag
#[tokio::test]
async fn test_build_success_clears_rebuild_flag() {
    let invoker = ScriptedInvoker::new().with_exit(
        0,
        &[
            "make[1]: Entering directory `/w/app/src'",
            "mcs -target:exe Main.cs",
            "Main.cs(12,9): warning CS0168: The variable 'e' is declared but never used",
            "make[1]: Leaving directory `/w/app/src'",
        ],
    );
    let ext = extension(invoker);
    let monitor = RecordingMonitor::new();
    let mut entry = Entry::Project(integrated("app", Path::new("/w/app")));

    let result = ext.build(&monitor, &mut entry).await.expect("build");

    assert!(result.success);
    assert_eq!(result.exit_code, 0);
    assert_eq!(result.warning_count(), 1);
    assert_eq!(result.error_count(), 0);
    let warning = &result.diagnostics[0];
    assert_eq!(warning.file(), Some(Path::new("/w/app/src/Main.cs")));
    assert_eq!(warning.line(), Some(12));
    assert_eq!(warning.code(), "CS0168");
    assert!(result.output.contains("mcs -target:exe Main.cs\n"));

    let project = entry.as_project().expect("project");
    assert!(!project.needs_building);

    let invocations = ext.invoker().invocations();
    assert_eq!(invocations[0].command_line(), "make all");
    assert_eq!(invocations[0].working_dir, PathBuf::from("/w/app"));

    assert_eq!(monitor.tasks(), vec!["Building app"]);
    assert_eq!(monitor.open_tasks(), 0);
    assert_eq!(monitor.logs().len(), 4);
}

/// Test: a failing tool with no parseable output yields one synthetic error
#[tokio::test]
async fn test_failed_build_without_diagnostics_gets_generic_error() {
    let invoker = ScriptedInvoker::new().with_exit(2, &["Segmentation fault"]);
    let ext = extension(invoker);
    let monitor = RecordingMonitor::new();
    let mut entry = Entry::Project(integrated("app", Path::new("/w/app")));

    let result = ext.build(&monitor, &mut entry).await.expect("build");

    assert!(!result.success);
    assert_eq!(result.exit_code, 2);
    assert_eq!(result.diagnostics, vec![Diagnostic::error(GENERIC_BUILD_FAILURE)]);
    assert!(entry.as_project().expect("project").needs_building);
    assert_eq!(monitor.open_tasks(), 0);
}

/// Test: parsed errors are the failure signal; no synthetic error is added
#[tokio::test]
async fn test_failed_build_with_diagnostics_keeps_them() {
    let invoker = ScriptedInvoker::new().with_exit(
        2,
        &["Main.cs(3,1): error CS1002: ; expected", "make: *** [all] Error 1"],
    );
    let ext = extension(invoker);
    let monitor = RecordingMonitor::new();
    let mut entry = Entry::Project(integrated("app", Path::new("/w/app")));

    let result = ext.build(&monitor, &mut entry).await.expect("build");

    assert_eq!(result.diagnostics.len(), 1);
    assert_eq!(result.diagnostics[0].code(), "CS1002");
    assert_eq!(result.diagnostics[0].message(), "; expected");
    assert!(result.has_errors());
    assert!(result.success);
}

/// Test: a tool that cannot start is reported and the task is still closed
#[tokio::test]
async fn test_invocation_failure_is_reported() {
    let ext = extension(ScriptedInvoker::new().with_spawn_failure());
    let monitor = RecordingMonitor::new();
    let mut entry = Entry::Project(integrated("app", Path::new("/w/app")));

    let result = ext.build(&monitor, &mut entry).await.expect("build");

    assert!(!result.success);
    assert_eq!(result.exit_code, -1);
    assert_eq!(result.diagnostics.len(), 1);
    assert!(result.error.as_deref().is_some_and(|e| e.contains("'make'")));
    assert_eq!(monitor.errors(), vec!["Project could not be built"]);
    assert_eq!(monitor.open_tasks(), 0);
    assert!(entry.as_project().expect("project").needs_building);
}

/// Test: build events are traced
#[tokio::test]
#[traced_test]
async fn test_build_emits_events() {
    let ext = extension(ScriptedInvoker::new().with_exit(0, &[]));
    let mut entry = Entry::Project(integrated("app", Path::new("/w/app")));

    ext.build(&RecordingMonitor::new(), &mut entry)
        .await
        .expect("build");

    assert!(logs_contain("tool.invoked"));
    assert!(logs_contain("tool.finished"));
    assert!(logs_contain("build.finished"));
}

// ---------------------------------------------------------------------------
// Clean / Execute
// ---------------------------------------------------------------------------

/// Test: a non-zero clean exit is reported as a failure
#[tokio::test]
async fn test_clean_failure_is_reported() {
    let ext = extension(ScriptedInvoker::new().with_exit(2, &["rm: cannot remove 'bin'"]));
    let monitor = RecordingMonitor::new();
    let mut entry = Entry::Project(integrated("app", Path::new("/w/app")));

    let outcome = ext.clean(&monitor, &mut entry).await.expect("clean");

    assert_eq!(outcome, OperationOutcome::failed().with_exit_code(2));
    assert_eq!(
        monitor.errors(),
        vec!["An unspecified error occurred while running 'make clean'"]
    );
    assert_eq!(monitor.logs(), vec!["rm: cannot remove 'bin'"]);
    assert_eq!(monitor.tasks(), vec!["Cleaning project"]);
    assert_eq!(monitor.open_tasks(), 0);
}

/// Test: a successful clean marks the project for rebuilding
#[tokio::test]
async fn test_clean_success() {
    let ext = extension(ScriptedInvoker::new().with_exit(0, &[]));
    let monitor = RecordingMonitor::new();
    let mut project = integrated("app", Path::new("/w/app"));
    project.needs_building = false;
    let mut entry = Entry::Project(project);

    let outcome = ext.clean(&monitor, &mut entry).await.expect("clean");

    assert!(outcome.success);
    assert_eq!(monitor.successes(), vec!["Project successfully cleaned"]);
    assert!(entry.as_project().expect("project").needs_building);
}

/// Test: execute streams output to the console and closes it
#[tokio::test]
async fn test_execute_streams_to_console() {
    let ext = extension(ScriptedInvoker::new().with_exit(0, &["Hello", "World"]));
    let monitor = RecordingMonitor::new();
    let factory = Arc::new(MemoryConsoleFactory::new());
    let entry = Entry::Project(integrated("app", Path::new("/w/app")));

    let outcome = ext
        .execute(&monitor, &entry, &memory_context(&factory))
        .await
        .expect("execute");

    assert!(outcome.success);
    let console = factory.console();
    assert_eq!(console.lines(), vec!["Hello", "World"]);
    assert_eq!(console.close_count(), 1);
    assert_eq!(monitor.logs(), vec!["The application exited with code: 0"]);
    assert_eq!(monitor.tasks(), vec!["Executing app"]);
    assert_eq!(ext.invoker().invocations()[0].target, "run");
}

/// Test: the console is closed even when the application cannot start
#[tokio::test]
async fn test_execute_failure_closes_console() {
    let ext = extension(ScriptedInvoker::new().with_spawn_failure());
    let monitor = RecordingMonitor::new();
    let factory = Arc::new(MemoryConsoleFactory::new());
    let entry = Entry::Project(integrated("app", Path::new("/w/app")));

    let outcome = ext
        .execute(&monitor, &entry, &memory_context(&factory))
        .await
        .expect("execute");

    assert!(!outcome.success);
    assert_eq!(factory.console().close_count(), 1);
    assert_eq!(monitor.errors(), vec!["Cannot execute 'make run'"]);
    assert_eq!(monitor.open_tasks(), 0);
}

// ---------------------------------------------------------------------------
// Load / Save
// ---------------------------------------------------------------------------

/// Test: loading a project refreshes files from its Makefile and binds owner
#[tokio::test]
async fn test_load_updates_project_from_makefile() {
    let dir = tempfile::tempdir().expect("tempdir");
    let root = dir.path();
    std::fs::write(root.join("Makefile"), "FILES = main.c \\\n\tutil/io.c\n").expect("write");

    let project = with_vars(integrated("app", root), "FILES", "REFS");
    let id = project.id;
    let base = MemoryHandler::new().with_entry("/d/app.json", project);
    let ext = MakefileExtension::new(base, ScriptedInvoker::new());
    let monitor = RecordingMonitor::new();

    let entry = ext
        .load(&monitor, Path::new("/d/app.json"))
        .await
        .expect("load")
        .expect("entry");

    let project = entry.as_project().expect("project");
    assert_eq!(project.files, vec![root.join("main.c"), root.join("util/io.c")]);
    assert!(project.references.is_empty());
    assert_eq!(project.build_config.as_ref().and_then(|c| c.owner), Some(id));
    assert_eq!(monitor.tasks(), vec!["Updating project from Makefile"]);
    assert!(monitor.errors().is_empty());
}

/// Test: an unknown path loads nothing
#[tokio::test]
async fn test_load_passes_through_none() {
    let ext = extension(ScriptedInvoker::new());
    let monitor = RecordingMonitor::new();

    let loaded = ext
        .load(&monitor, Path::new("/d/missing.json"))
        .await
        .expect("load");

    assert!(loaded.is_none());
    assert!(monitor.calls().is_empty());
}

/// Test: a missing Makefile is reported and the project is still returned
#[tokio::test]
async fn test_load_reports_missing_makefile() {
    let dir = tempfile::tempdir().expect("tempdir");
    let project = with_vars(integrated("app", dir.path()), "FILES", "REFS");
    let base = MemoryHandler::new().with_entry("/d/app.json", project);
    let ext = MakefileExtension::new(base, ScriptedInvoker::new());
    let monitor = RecordingMonitor::new();

    let entry = ext.load(&monitor, Path::new("/d/app.json")).await.expect("load");

    assert!(entry.is_some());
    assert_eq!(monitor.errors(), vec!["Error loading Makefile for project app"]);
    assert_eq!(monitor.open_tasks(), 0);
}

/// Test: unresolved references are reported without aborting the group load
#[tokio::test]
async fn test_group_reference_resolution_failure_is_isolated() {
    let dir = tempfile::tempdir().expect("tempdir");
    let root = dir.path();
    let app_dir = root.join("app");
    let lib_dir = root.join("lib");
    std::fs::create_dir_all(&app_dir).expect("mkdir");
    std::fs::create_dir_all(&lib_dir).expect("mkdir");
    std::fs::write(
        app_dir.join("Makefile"),
        "FILES = main.c\nREFS = ../lib/Makefile ../gone/Makefile\n",
    )
    .expect("write");
    std::fs::write(lib_dir.join("Makefile"), "FILES = lib.c\n").expect("write");

    let app = with_vars(integrated("app", &app_dir), "FILES", "REFS");
    let lib = with_vars(integrated("lib", &lib_dir), "FILES", "REFS");
    let lib_id = lib.id;
    let group = ProjectGroup::new("solution").with_entry(app).with_entry(lib);
    let base = MemoryHandler::new().with_entry("/d/solution.json", group);
    let ext = MakefileExtension::new(base, ScriptedInvoker::new());
    let monitor = RecordingMonitor::new();

    let entry = ext
        .load(&monitor, Path::new("/d/solution.json"))
        .await
        .expect("load")
        .expect("entry");

    let projects = entry.projects();
    assert_eq!(projects[0].files, vec![app_dir.join("main.c")]);
    assert_eq!(projects[1].files, vec![lib_dir.join("lib.c")]);
    assert_eq!(
        projects[0].references,
        vec![
            ProjectReference::Resolved {
                project: lib_id,
                path: lib_dir.join("Makefile"),
            },
            ProjectReference::Unresolved(root.join("gone/Makefile")),
        ]
    );
    assert_eq!(
        monitor.errors(),
        vec!["Error resolving Makefile based project references for solution solution"]
    );
}

/// Test: save writes files back to the Makefile and isolates failures
#[tokio::test]
async fn test_save_writes_makefile_and_continues_after_failure() {
    let dir = tempfile::tempdir().expect("tempdir");
    let root = dir.path();
    let makefile = root.join("Makefile");
    std::fs::write(&makefile, "# app\nFILES = old.c\n\nall:\n\tcc $(FILES)\n").expect("write");

    // Makefile in a directory that does not exist: the write fails.
    let broken_dir = root.join("missing");
    let mut broken = with_vars(integrated("broken", &broken_dir), "FILES", "REFS");
    broken.files = vec![broken_dir.join("lost.c")];

    let mut app = with_vars(integrated("app", root), "FILES", "REFS");
    app.files = vec![root.join("main.c"), root.join("src/io.c")];

    let entry = Entry::Group(ProjectGroup::new("solution").with_entry(broken).with_entry(app));
    let ext = extension(ScriptedInvoker::new());
    let monitor = RecordingMonitor::new();

    ext.save(&monitor, &entry).await.expect("save");

    assert_eq!(ext.next().calls(), vec!["save"]);
    assert_eq!(ext.next().saved(), vec![entry.clone()]);

    let text = std::fs::read_to_string(&makefile).expect("read back");
    let parsed = Makefile::parse(&text);
    assert_eq!(
        parsed.values("FILES"),
        Some(vec!["main.c".to_string(), "src/io.c".to_string()])
    );
    assert!(text.starts_with("# app\n"));
    assert!(text.contains("all:\n\tcc $(FILES)\n"));

    let errors = monitor.errors();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].starts_with("Error saving to Makefile ("));
    assert!(errors[0].ends_with("for project broken"));
}

/// Test: saving a freshly loaded project leaves its Makefile byte for byte
#[tokio::test]
async fn test_load_then_save_keeps_makefile_text() {
    let dir = tempfile::tempdir().expect("tempdir");
    let root = dir.path();
    let makefile = root.join("Makefile");
    let original = "\
FILES = main.c $(GENERATED_SOURCES)
ifeq ($(OS),Linux)
FILES += platform/linux.c
endif
REFS = ${TOP}/lib/Makefile

all:
\tcc -o app $(FILES)
";
    std::fs::write(&makefile, original).expect("write");

    let project = with_vars(integrated("app", root), "FILES", "REFS");
    let base = MemoryHandler::new().with_entry("/d/app.json", project);
    let ext = MakefileExtension::new(base, ScriptedInvoker::new());
    let monitor = RecordingMonitor::new();

    let entry = ext
        .load(&monitor, Path::new("/d/app.json"))
        .await
        .expect("load")
        .expect("entry");
    assert_eq!(
        entry.as_project().expect("project").files,
        vec![root.join("main.c"), root.join("platform/linux.c")]
    );

    ext.save(&monitor, &entry).await.expect("save");

    assert_eq!(std::fs::read_to_string(&makefile).expect("read back"), original);
    assert!(monitor.errors().is_empty());
}

/// Test: a changed file list is written back with make variable words intact
#[tokio::test]
async fn test_save_changed_files_keeps_make_variable_words() {
    let dir = tempfile::tempdir().expect("tempdir");
    let root = dir.path();
    let makefile = root.join("Makefile");
    std::fs::write(&makefile, "FILES = main.c $(GENERATED_SOURCES)\n").expect("write");

    let mut app = with_vars(integrated("app", root), "FILES", "REFS");
    app.files = vec![root.join("main.c"), root.join("extra.c")];
    let ext = extension(ScriptedInvoker::new());
    let monitor = RecordingMonitor::new();

    ext.save(&monitor, &Entry::Project(app)).await.expect("save");

    let text = std::fs::read_to_string(&makefile).expect("read back");
    assert_eq!(
        Makefile::parse(&text).values("FILES"),
        Some(vec![
            "main.c".to_string(),
            "extra.c".to_string(),
            "$(GENERATED_SOURCES)".to_string()
        ])
    );
    assert!(!text.contains("REFS"));
}
