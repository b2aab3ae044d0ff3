//! mkbridge - external Makefile builds for project descriptors
//!
//! The `mkbridge` command loads a JSON project descriptor, runs the
//! lifecycle operation through the Makefile integration and saves the
//! descriptor back so the rebuild flags persist.
//!
//! ## Commands
//!
//! - `build`: build every project of the descriptor
//! - `clean`: clean every project of the descriptor
//! - `execute`: run every project's execute target on this terminal
//! - `parse`: turn captured build output into diagnostics

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mkbridge_core::{
    aggregate, BuildResult, BuildSpan, Entry, ExtractorConfig, LineExtractor, Project,
    DEFAULT_TOOL,
};
use mkbridge_lifecycle::{
    DescriptorHandler, ExecutionContext, LifecycleHandler, MakefileExtension, ProcessInvoker,
    StdConsoleFactory, TracingMonitor,
};
use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, Level};

type Handler = MakefileExtension<DescriptorHandler, ProcessInvoker>;

#[derive(Parser)]
#[command(name = "mkbridge")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Build projects with an external make and collect diagnostics", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines and results
    #[arg(long, global = true)]
    json: bool,

    /// Build tool to run instead of each project's configured one
    #[arg(long, global = true, env = "MKBRIDGE_TOOL")]
    tool: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build every project in a descriptor
    Build {
        /// Project descriptor (JSON)
        descriptor: PathBuf,
    },

    /// Clean every project in a descriptor
    Clean {
        /// Project descriptor (JSON)
        descriptor: PathBuf,
    },

    /// Run the execute target of every project in a descriptor
    Execute {
        /// Project descriptor (JSON)
        descriptor: PathBuf,
    },

    /// Parse captured build output
    Parse {
        /// Output file, or `-` for stdin
        input: String,

        /// Directory the build ran in
        #[arg(long, default_value = ".")]
        base: PathBuf,

        /// Exit status the build finished with
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        exit_code: i32,
    },
}

/// Build result of one project, as printed with `--json`.
#[derive(Serialize)]
struct ProjectReport<'a> {
    project: &'a str,
    #[serde(flatten)]
    result: &'a BuildResult,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    mkbridge_core::init_tracing(cli.json, level);

    let tool = cli.tool.as_deref();
    match cli.command {
        Commands::Build { descriptor } => cmd_build(&descriptor, tool, cli.json).await,
        Commands::Clean { descriptor } => cmd_clean(&descriptor, tool).await,
        Commands::Execute { descriptor } => cmd_execute(&descriptor, tool).await,
        Commands::Parse {
            input,
            base,
            exit_code,
        } => cmd_parse(&input, &base, exit_code, tool, cli.json),
    }
}

fn handler() -> Handler {
    MakefileExtension::new(DescriptorHandler::new(), ProcessInvoker)
}

async fn load(handler: &Handler, descriptor: &Path) -> Result<Entry> {
    handler
        .load(&TracingMonitor, descriptor)
        .await
        .with_context(|| format!("Failed to load descriptor {}", descriptor.display()))?
        .with_context(|| format!("Descriptor not found: {}", descriptor.display()))
}

async fn save(handler: &Handler, entry: &Entry) -> Result<()> {
    handler
        .save(&TracingMonitor, entry)
        .await
        .with_context(|| format!("Failed to save descriptor for {}", entry.name()))
}

/// `project` as an entry of its own, with the tool override applied.
///
/// The override only lives in this copy so it is never saved.
fn single_entry(project: &Project, tool: Option<&str>) -> Entry {
    let mut project = project.clone();
    if let (Some(tool), Some(config)) = (tool, project.build_config.as_mut()) {
        config.tool = tool.to_string();
    }
    Entry::Project(project)
}

fn sync_back(project: &mut Project, single: &Entry) {
    if let Some(updated) = single.as_project() {
        project.needs_building = updated.needs_building;
    }
}

async fn cmd_build(descriptor: &Path, tool: Option<&str>, json: bool) -> Result<()> {
    let handler = handler();
    let mut entry = load(&handler, descriptor).await?;
    let monitor = TracingMonitor;

    let mut results = Vec::new();
    for project in entry.projects_mut() {
        let mut single = single_entry(project, tool);
        let result = handler
            .build(&monitor, &mut single)
            .await
            .with_context(|| format!("Failed to build {}", project.name))?;
        sync_back(project, &single);
        results.push((project.name.clone(), result));
    }
    save(&handler, &entry).await?;

    if json {
        let reports: Vec<ProjectReport<'_>> = results
            .iter()
            .map(|(project, result)| ProjectReport { project, result })
            .collect();
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        for (project, result) in &results {
            print_result(project, result);
        }
    }

    let failed = results.iter().filter(|(_, r)| !r.success).count();
    info!(projects = results.len(), failed, "Build finished");
    if failed == 0 {
        Ok(())
    } else {
        anyhow::bail!("{failed} project(s) failed to build")
    }
}

async fn cmd_clean(descriptor: &Path, tool: Option<&str>) -> Result<()> {
    let handler = handler();
    let mut entry = load(&handler, descriptor).await?;
    let monitor = TracingMonitor;

    let mut failed = 0;
    for project in entry.projects_mut() {
        let mut single = single_entry(project, tool);
        let outcome = handler
            .clean(&monitor, &mut single)
            .await
            .with_context(|| format!("Failed to clean {}", project.name))?;
        sync_back(project, &single);
        if outcome.success {
            println!("✓ {}", project.name);
        } else {
            failed += 1;
            println!("✗ {}", project.name);
        }
    }
    save(&handler, &entry).await?;

    if failed == 0 {
        Ok(())
    } else {
        anyhow::bail!("{failed} project(s) failed to clean")
    }
}

async fn cmd_execute(descriptor: &Path, tool: Option<&str>) -> Result<()> {
    let handler = handler();
    let entry = load(&handler, descriptor).await?;
    let monitor = TracingMonitor;
    let context = ExecutionContext::new(Arc::new(StdConsoleFactory));

    let mut failed = 0;
    for project in entry.projects() {
        let single = single_entry(project, tool);
        let outcome = handler
            .execute(&monitor, &single, &context)
            .await
            .with_context(|| format!("Failed to execute {}", project.name))?;
        if !outcome.success {
            failed += 1;
        }
    }

    if failed == 0 {
        Ok(())
    } else {
        anyhow::bail!("{failed} project(s) failed to execute")
    }
}

fn cmd_parse(
    input: &str,
    base: &Path,
    exit_code: i32,
    tool: Option<&str>,
    json: bool,
) -> Result<()> {
    let _span = BuildSpan::enter(input, "parse");

    let bytes = if input == "-" {
        let mut buf = Vec::new();
        std::io::stdin()
            .read_to_end(&mut buf)
            .context("Failed to read stdin")?;
        buf
    } else {
        std::fs::read(input).with_context(|| format!("Failed to read {input}"))?
    };
    let output = String::from_utf8_lossy(&bytes);

    let extractor = LineExtractor::new(&ExtractorConfig::for_tool(tool.unwrap_or(DEFAULT_TOOL)))?;
    let result = aggregate(&extractor, &output, exit_code, base);

    if json {
        let report = ProjectReport {
            project: input,
            result: &result,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_result(input, &result);
    }

    if result.success {
        Ok(())
    } else {
        anyhow::bail!("Build output reports a failure")
    }
}

fn print_result(name: &str, result: &BuildResult) {
    for diagnostic in &result.diagnostics {
        println!("{diagnostic}");
    }
    let status = if result.success { "✓" } else { "✗" };
    println!(
        "{} {}: {} error(s), {} warning(s), exit code {}",
        status,
        name,
        result.error_count(),
        result.warning_count(),
        result.exit_code
    );
}
