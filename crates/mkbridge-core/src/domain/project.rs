//! Project object model: projects, groups and the entry variant over both.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use super::config::ProjectBuildConfig;

/// Stable project identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(pub Uuid);

impl ProjectId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ProjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A reference from one project to another, as listed in its Makefile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectReference {
    /// Path read from the Makefile, not yet matched to a project.
    Unresolved(PathBuf),
    /// Matched to a project of the same group.
    Resolved { project: ProjectId, path: PathBuf },
}

impl ProjectReference {
    /// Absolute path the reference was read from.
    pub fn path(&self) -> &Path {
        match self {
            ProjectReference::Unresolved(path) => path,
            ProjectReference::Resolved { path, .. } => path,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, ProjectReference::Resolved { .. })
    }
}

fn default_needs_building() -> bool {
    true
}

/// A buildable project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    #[serde(default)]
    pub id: ProjectId,

    pub name: String,

    /// Directory the external tool is run from.
    pub base_directory: PathBuf,

    #[serde(default = "default_needs_building")]
    pub needs_building: bool,

    /// Source files (absolute).
    #[serde(default)]
    pub files: Vec<PathBuf>,

    #[serde(default)]
    pub references: Vec<ProjectReference>,

    /// Present once the project opted into Makefile integration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_config: Option<ProjectBuildConfig>,
}

impl Project {
    pub fn new(name: impl Into<String>, base_directory: impl Into<PathBuf>) -> Self {
        Self {
            id: ProjectId::new(),
            name: name.into(),
            base_directory: base_directory.into(),
            needs_building: true,
            files: Vec::new(),
            references: Vec::new(),
            build_config: None,
        }
    }

    pub fn with_build_config(mut self, config: ProjectBuildConfig) -> Self {
        self.build_config = Some(config);
        self
    }

    /// Integration settings, only when integration is switched on.
    pub fn enabled_config(&self) -> Option<&ProjectBuildConfig> {
        self.build_config
            .as_ref()
            .filter(|config| config.integration_enabled)
    }

    pub fn base_directory(&self) -> &Path {
        &self.base_directory
    }
}

/// A named collection of projects and nested groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectGroup {
    pub name: String,

    #[serde(default)]
    pub entries: Vec<Entry>,
}

impl ProjectGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    pub fn with_entry(mut self, entry: impl Into<Entry>) -> Self {
        self.entries.push(entry.into());
        self
    }

    /// All projects in the group, depth first.
    pub fn projects(&self) -> Vec<&Project> {
        let mut out = Vec::new();
        for entry in &self.entries {
            collect(entry, &mut out);
        }
        out
    }

    /// All projects in the group, depth first, mutably.
    pub fn projects_mut(&mut self) -> Vec<&mut Project> {
        let mut out = Vec::new();
        for entry in &mut self.entries {
            collect_mut(entry, &mut out);
        }
        out
    }
}

/// Anything the lifecycle operates on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Entry {
    Group(ProjectGroup),
    Project(Project),
}

impl Entry {
    pub fn name(&self) -> &str {
        match self {
            Entry::Group(group) => &group.name,
            Entry::Project(project) => &project.name,
        }
    }

    pub fn as_project(&self) -> Option<&Project> {
        match self {
            Entry::Project(project) => Some(project),
            Entry::Group(_) => None,
        }
    }

    pub fn as_project_mut(&mut self) -> Option<&mut Project> {
        match self {
            Entry::Project(project) => Some(project),
            Entry::Group(_) => None,
        }
    }

    /// Every project reachable from this entry, depth first.
    pub fn projects(&self) -> Vec<&Project> {
        let mut out = Vec::new();
        collect(self, &mut out);
        out
    }

    pub fn projects_mut(&mut self) -> Vec<&mut Project> {
        let mut out = Vec::new();
        collect_mut(self, &mut out);
        out
    }
}

impl From<Project> for Entry {
    fn from(project: Project) -> Self {
        Entry::Project(project)
    }
}

impl From<ProjectGroup> for Entry {
    fn from(group: ProjectGroup) -> Self {
        Entry::Group(group)
    }
}

fn collect<'a>(entry: &'a Entry, out: &mut Vec<&'a Project>) {
    match entry {
        Entry::Project(project) => out.push(project),
        Entry::Group(group) => {
            for child in &group.entries {
                collect(child, out);
            }
        }
    }
}

fn collect_mut<'a>(entry: &'a mut Entry, out: &mut Vec<&'a mut Project>) {
    match entry {
        Entry::Project(project) => out.push(project),
        Entry::Group(group) => {
            for child in &mut group.entries {
                collect_mut(child, out);
            }
        }
    }
}
