//! Per-project Makefile integration settings.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use super::project::ProjectId;

/// Tool run when a project does not name one.
pub const DEFAULT_TOOL: &str = "make";

fn default_tool() -> String {
    DEFAULT_TOOL.to_string()
}

/// Lifecycle operations that can be routed through the external tool.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Build,
    Clean,
    Execute,
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Build => "build",
            Operation::Clean => "clean",
            Operation::Execute => "execute",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Makefile integration settings attached to a project.
///
/// Build operations read a snapshot of this struct; editing it while a build
/// of the same project is in flight is the caller's problem.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectBuildConfig {
    /// Route build/clean/execute through the external tool.
    pub integration_enabled: bool,

    /// Build tool executable.
    #[serde(default = "default_tool")]
    pub tool: String,

    /// Absolute path of the Makefile.
    pub absolute_makefile: PathBuf,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_target: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clean_target: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execute_target: Option<String>,

    /// Makefile variable listing the project's source files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_files_var: Option<String>,

    /// Makefile variable listing referenced projects.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_refs_var: Option<String>,

    /// Project owning this configuration, bound when the project is loaded.
    #[serde(skip)]
    pub owner: Option<ProjectId>,
}

impl ProjectBuildConfig {
    /// Enabled integration for `makefile` with the conventional targets
    /// (`all`, `clean`, `run`).
    pub fn new(makefile: impl Into<PathBuf>) -> Self {
        Self {
            integration_enabled: true,
            tool: default_tool(),
            absolute_makefile: makefile.into(),
            build_target: Some("all".to_string()),
            clean_target: Some("clean".to_string()),
            execute_target: Some("run".to_string()),
            build_files_var: None,
            project_refs_var: None,
            owner: None,
        }
    }

    pub fn disabled(mut self) -> Self {
        self.integration_enabled = false;
        self
    }

    /// Target configured for `op`, treating an empty name as unset.
    pub fn target_for(&self, op: Operation) -> Option<&str> {
        let target = match op {
            Operation::Build => &self.build_target,
            Operation::Clean => &self.clean_target,
            Operation::Execute => &self.execute_target,
        };
        target.as_deref().filter(|t| !t.trim().is_empty())
    }

    /// Target to invoke for `op`, or `None` when the operation must fall
    /// through to the native handler.
    pub fn active_target(&self, op: Operation) -> Option<&str> {
        if !self.integration_enabled {
            return None;
        }
        self.target_for(op)
    }

    /// Directory containing the Makefile; relative paths inside it are
    /// relative to this directory.
    pub fn makefile_dir(&self) -> &Path {
        self.absolute_makefile.parent().unwrap_or_else(|| Path::new(""))
    }
}
