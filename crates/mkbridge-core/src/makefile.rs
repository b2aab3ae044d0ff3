//! Makefile model used to keep a project and its Makefile in sync.
//!
//! Only variable assignments are understood. Everything else in the file
//! (rules, recipes, comments, conditionals) is carried through untouched
//! when a variable is rewritten.

use std::collections::HashMap;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

use crate::domain::{BridgeError, Project, ProjectGroup, ProjectId, ProjectReference, Result};

/// Assignment operator of a variable definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    /// `=`
    Recursive,
    /// `:=`
    Simple,
    /// `+=`
    Append,
    /// `?=`
    Conditional,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Assignment {
    name: String,
    op: AssignOp,
    value: String,
    /// Physical line range `[start, end)` of the definition.
    start: usize,
    end: usize,
}

/// A parsed Makefile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Makefile {
    lines: Vec<String>,
    trailing_newline: bool,
    assignments: Vec<Assignment>,
}

impl Makefile {
    pub fn parse(text: &str) -> Self {
        let lines: Vec<String> = text.lines().map(str::to_string).collect();
        let assignments = scan_assignments(&lines);
        Self {
            lines,
            trailing_newline: text.is_empty() || text.ends_with('\n'),
            assignments,
        }
    }

    /// Words assigned to `var`, following `+=` and `?=` semantics, or `None`
    /// when the variable is never assigned.
    pub fn values(&self, var: &str) -> Option<Vec<String>> {
        let mut result: Option<Vec<String>> = None;
        for assignment in self.assignments.iter().filter(|a| a.name == var) {
            let words = assignment.value.split_whitespace().map(str::to_string);
            match assignment.op {
                AssignOp::Recursive | AssignOp::Simple => result = Some(words.collect()),
                AssignOp::Append => result.get_or_insert_with(Vec::new).extend(words),
                AssignOp::Conditional => {
                    if result.is_none() {
                        result = Some(words.collect());
                    }
                }
            }
        }
        result
    }

    /// Replace every definition of `var` with a single `var = ...` block at
    /// the position of the first one, or append the block when `var` is not
    /// defined yet.
    pub fn set_values(&mut self, var: &str, values: &[String]) {
        let block = format_block(var, values);
        let ranges: Vec<(usize, usize)> = self
            .assignments
            .iter()
            .filter(|a| a.name == var)
            .map(|a| (a.start, a.end))
            .collect();

        match ranges.first() {
            Some(&(first, _)) => {
                for &(start, end) in ranges.iter().rev() {
                    self.lines.drain(start..end);
                }
                let tail = self.lines.split_off(first);
                self.lines.extend(block);
                self.lines.extend(tail);
            }
            None => {
                if self.lines.last().is_some_and(|l| !l.trim().is_empty()) {
                    self.lines.push(String::new());
                }
                self.lines.extend(block);
            }
        }

        self.assignments = scan_assignments(&self.lines);
    }

    /// Names of all assigned variables, in first-definition order.
    pub fn variables(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for assignment in &self.assignments {
            if !seen.contains(&assignment.name.as_str()) {
                seen.push(assignment.name.as_str());
            }
        }
        seen
    }
}

impl fmt::Display for Makefile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.lines.join("\n"))?;
        if self.trailing_newline && !self.lines.is_empty() {
            f.write_str("\n")?;
        }
        Ok(())
    }
}

fn format_block(var: &str, values: &[String]) -> Vec<String> {
    if values.is_empty() {
        return vec![format!("{var} =")];
    }
    let mut block = vec![format!("{var} = \\")];
    for (i, value) in values.iter().enumerate() {
        if i + 1 == values.len() {
            block.push(format!("\t{value}"));
        } else {
            block.push(format!("\t{value} \\"));
        }
    }
    block
}

fn scan_assignments(lines: &[String]) -> Vec<Assignment> {
    let mut assignments = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        let start = i;
        let mut logical = String::new();
        loop {
            let line = &lines[i];
            i += 1;
            match line.strip_suffix('\\') {
                Some(continued) if i < lines.len() => {
                    logical.push_str(continued);
                    logical.push(' ');
                }
                Some(continued) => {
                    logical.push_str(continued);
                    break;
                }
                None => {
                    logical.push_str(line);
                    break;
                }
            }
        }

        if let Some((name, op, value)) = parse_assignment(&logical) {
            assignments.push(Assignment {
                name,
                op,
                value,
                start,
                end: i,
            });
        }
    }
    assignments
}

fn parse_assignment(logical: &str) -> Option<(String, AssignOp, String)> {
    if logical.starts_with('\t') || logical.trim_start().starts_with('#') {
        return None;
    }

    let eq = logical.find('=')?;
    let (op, name_end) = match logical[..eq].chars().last() {
        Some(':') => (AssignOp::Simple, eq - 1),
        Some('+') => (AssignOp::Append, eq - 1),
        Some('?') => (AssignOp::Conditional, eq - 1),
        _ => (AssignOp::Recursive, eq),
    };

    let name = logical[..name_end].trim();
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'));
    if !valid {
        return None;
    }

    Some((name.to_string(), op, logical[eq + 1..].trim().to_string()))
}

/// Lexically normalize a path: drop `.` and fold `..` without touching the
/// filesystem.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn is_make_reference(word: &str) -> bool {
    word.contains("$(") || word.contains("${")
}

/// Words of `var` split into paths resolved against `dir` and words that use
/// make variables, which are kept verbatim.
fn split_words(
    makefile: &Makefile,
    var: &str,
    dir: &Path,
) -> Option<(Vec<PathBuf>, Vec<String>)> {
    let words = makefile.values(var)?;
    let (references, plain): (Vec<String>, Vec<String>) =
        words.into_iter().partition(|w| is_make_reference(w));
    for word in &references {
        debug!(word = %word, var, "Keeping make variable reference");
    }
    let paths = plain.into_iter().map(|w| normalize(&dir.join(w))).collect();
    Some((paths, references))
}

/// Refresh `project` from its Makefile: the build files variable replaces
/// `files`, the project references variable replaces `references`.
///
/// Paths in the Makefile are relative to the Makefile's directory. Words that
/// use make variables cannot be resolved; they stay in the Makefile and are
/// not part of the project.
pub fn update_project(project: &mut Project, makefile: &Makefile) -> Result<()> {
    let config = project
        .build_config
        .as_ref()
        .ok_or_else(|| BridgeError::NotConfigured {
            project: project.name.clone(),
        })?;
    let dir = config.makefile_dir().to_path_buf();

    let files = config
        .build_files_var
        .as_deref()
        .and_then(|var| split_words(makefile, var, &dir));
    let references = config
        .project_refs_var
        .as_deref()
        .and_then(|var| split_words(makefile, var, &dir));

    if let Some((files, _)) = files {
        project.files = files;
    }
    if let Some((references, _)) = references {
        project.references = references
            .into_iter()
            .map(ProjectReference::Unresolved)
            .collect();
    }
    Ok(())
}

/// Write `project`'s files and references back into `makefile`.
///
/// A variable is only rewritten when its paths differ from what the Makefile
/// already holds, so an unchanged project leaves the text untouched. Words
/// using make variables are carried over into the rewritten value.
pub fn render_project(project: &Project, makefile: &mut Makefile) -> Result<()> {
    let config = project
        .build_config
        .as_ref()
        .ok_or_else(|| BridgeError::NotConfigured {
            project: project.name.clone(),
        })?;
    let dir = config.makefile_dir();

    if let Some(var) = config.build_files_var.as_deref() {
        let files: Vec<&Path> = project.files.iter().map(PathBuf::as_path).collect();
        sync_variable(makefile, var, dir, &files);
    }
    if let Some(var) = config.project_refs_var.as_deref() {
        let refs: Vec<&Path> = project.references.iter().map(|r| r.path()).collect();
        sync_variable(makefile, var, dir, &refs);
    }
    Ok(())
}

fn sync_variable(makefile: &mut Makefile, var: &str, dir: &Path, paths: &[&Path]) {
    let wanted: Vec<PathBuf> = paths.iter().map(|p| normalize(p)).collect();
    let kept = match split_words(makefile, var, dir) {
        Some((current, _)) if current == wanted => return,
        Some((_, kept)) => kept,
        None if wanted.is_empty() => return,
        None => Vec::new(),
    };

    debug!(var, count = wanted.len(), "Rewriting Makefile variable");
    let mut words: Vec<String> = wanted.iter().map(|p| relative_to(p, dir)).collect();
    words.extend(kept);
    makefile.set_values(var, &words);
}

/// `path` relative to `dir` when it lies beneath it, walking up with `..`
/// when the two share an ancestor.
fn relative_to(path: &Path, dir: &Path) -> String {
    let path = normalize(path);
    let dir = normalize(dir);
    if let Ok(rel) = path.strip_prefix(&dir) {
        return rel.display().to_string();
    }

    let common = path
        .components()
        .zip(dir.components())
        .take_while(|(a, b)| a == b)
        .count();
    if common == 0 {
        return path.display().to_string();
    }

    let mut rel = PathBuf::new();
    for _ in dir.components().skip(common) {
        rel.push("..");
    }
    for component in path.components().skip(common) {
        rel.push(component.as_os_str());
    }
    rel.display().to_string()
}

/// Match every unresolved reference in the group to the project whose
/// Makefile or base directory it names.
///
/// Every reference that can be matched is resolved even when others cannot;
/// the unmatched paths are returned in the error.
pub fn resolve_project_references(group: &mut ProjectGroup) -> Result<()> {
    let mut index: HashMap<PathBuf, ProjectId> = HashMap::new();
    for project in group.projects() {
        index.insert(normalize(&project.base_directory), project.id);
        if let Some(config) = &project.build_config {
            index.insert(normalize(&config.absolute_makefile), project.id);
        }
    }

    let mut unresolved = Vec::new();
    for project in group.projects_mut() {
        for reference in project.references.iter_mut() {
            let ProjectReference::Unresolved(path) = reference else {
                continue;
            };
            match index.get(&normalize(path)) {
                Some(&target) => {
                    *reference = ProjectReference::Resolved {
                        project: target,
                        path: path.clone(),
                    };
                }
                None => unresolved.push(path.clone()),
            }
        }
    }

    if unresolved.is_empty() {
        Ok(())
    } else {
        Err(BridgeError::UnresolvedReferences {
            group: group.name.clone(),
            paths: unresolved,
        })
    }
}
