//! Line-level diagnostic extraction from build tool output.
//!
//! Each output line is classified as a directory marker, noise, or a
//! candidate diagnostic line. Candidate lines are tested against both the
//! error and the warning pattern; the two tests are independent, so a single
//! line can produce one diagnostic of each severity.

use regex::{Captures, Regex};
use std::path::Path;
use tracing::debug;

use crate::directory_stack::DirectoryStack;
use crate::domain::{Diagnostic, Result, Severity, COLUMN_OVERFLOW, DEFAULT_TOOL};
use crate::obs;

/// Column literal printed by the compiler when the column does not fit.
const COLUMN_OVERFLOW_LITERAL: &str = "255+";

/// Status banners printed by the compiler that never carry a diagnostic.
pub const DEFAULT_IGNORED_PREFIXES: &[&str] = &[
    "WROTE SYMFILE",
    "OffsetTable",
    "Compilation succeeded",
    "Compilation failed",
];

/// Configuration for the line extractor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractorConfig {
    /// Build tool as configured. Only its file name is matched, since that
    /// is what the tool prints in front of its own messages.
    pub tool_name: String,

    /// Lines starting with any of these are skipped.
    pub ignored_prefixes: Vec<String>,
}

impl ExtractorConfig {
    pub fn for_tool(tool_name: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            ..Self::default()
        }
    }
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            tool_name: DEFAULT_TOOL.to_string(),
            ignored_prefixes: DEFAULT_IGNORED_PREFIXES
                .iter()
                .map(|p| p.to_string())
                .collect(),
        }
    }
}

/// How a single (trimmed) output line was classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineClass<'a> {
    /// `<tool>[N]: Entering directory `<path>'`
    Enter(&'a str),
    /// `<tool>[N]: Leaving directory `<path>'`
    Leave(&'a str),
    /// Blank lines, banners, the tool's own chatter.
    Ignored,
    /// May contain an error and/or a warning.
    Candidate,
}

/// What extracting a line did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extracted {
    /// The directory context changed. `underflow` is set when a `Leaving`
    /// marker had no matching `Entering`; the seed frame is kept.
    Directory { underflow: bool },
    Ignored,
    /// Zero, one or two diagnostics, errors before warnings.
    Diagnostics(Vec<Diagnostic>),
}

/// Compiled patterns for one tool.
#[derive(Debug, Clone)]
pub struct LineExtractor {
    tool_name: String,
    ignored_prefixes: Vec<String>,
    directory: Regex,
    error: Regex,
    warning: Regex,
}

impl LineExtractor {
    pub fn new(config: &ExtractorConfig) -> Result<Self> {
        let tool_name = program_name(&config.tool_name);
        let directory = Regex::new(&format!(
            r"{}\[[0-9]*\]: ([a-zA-Z]*) directory [`'](.*)'",
            regex::escape(tool_name)
        ))?;

        Ok(Self {
            tool_name: tool_name.to_string(),
            ignored_prefixes: config.ignored_prefixes.clone(),
            directory,
            error: diagnostic_pattern(Severity::Error)?,
            warning: diagnostic_pattern(Severity::Warning)?,
        })
    }

    /// File name of the configured tool, e.g. `make` for `/usr/bin/make`.
    pub fn tool_name(&self) -> &str {
        &self.tool_name
    }

    /// Classify a line without touching any directory context.
    pub fn classify<'a>(&self, line: &'a str) -> LineClass<'a> {
        let line = line.trim();
        if line.is_empty() {
            return LineClass::Ignored;
        }

        if let Some(caps) = self.directory.captures(line) {
            let path = caps.get(2).map_or("", |m| m.as_str());
            return match caps.get(1).map_or("", |m| m.as_str()) {
                "Entering" => LineClass::Enter(path),
                "Leaving" => LineClass::Leave(path),
                _ => LineClass::Ignored,
            };
        }

        if self
            .ignored_prefixes
            .iter()
            .any(|prefix| line.starts_with(prefix.as_str()))
            || line.starts_with(self.tool_name.as_str())
            || line.starts_with(DEFAULT_TOOL)
        {
            return LineClass::Ignored;
        }

        LineClass::Candidate
    }

    /// Process one line: update `dirs` for directory markers, otherwise
    /// extract diagnostics with relative files resolved against `dirs`.
    pub fn extract(&self, line: &str, dirs: &mut DirectoryStack) -> Extracted {
        match self.classify(line) {
            LineClass::Enter(path) => {
                debug!(dir = %path, depth = dirs.depth() + 1, "Entering directory");
                dirs.push(path);
                Extracted::Directory { underflow: false }
            }
            LineClass::Leave(path) => {
                let underflow = !dirs.pop();
                if underflow {
                    obs::emit_directory_underflow(path, dirs.peek());
                } else {
                    debug!(dir = %path, depth = dirs.depth(), "Leaving directory");
                }
                Extracted::Directory { underflow }
            }
            LineClass::Ignored => Extracted::Ignored,
            LineClass::Candidate => {
                let line = line.trim();
                let mut found = Vec::new();
                if let Some(caps) = self.error.captures(line) {
                    found.push(build_diagnostic(Severity::Error, &caps, dirs));
                }
                if let Some(caps) = self.warning.captures(line) {
                    found.push(build_diagnostic(Severity::Warning, &caps, dirs));
                }
                Extracted::Diagnostics(found)
            }
        }
    }
}

fn program_name(tool: &str) -> &str {
    Path::new(tool)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(tool)
}

/// `[file(line[,column])[:] ]<severity> <code>: <message>`
fn diagnostic_pattern(severity: Severity) -> Result<Regex> {
    Ok(Regex::new(&format!(
        concat!(
            r"(^\s*(?P<file>.*)\((?P<line>\d*)(,(?P<column>\d*[+]*))?\)(:|)\s+)*",
            r"{}\s*(?P<code>.*?):\s(?P<message>.*)",
        ),
        severity.token()
    ))?)
}

fn group<'t>(caps: &Captures<'t>, name: &str) -> Option<&'t str> {
    caps.name(name).map(|m| m.as_str()).filter(|s| !s.is_empty())
}

fn parse_column(raw: &str) -> Option<i32> {
    if raw == COLUMN_OVERFLOW_LITERAL {
        Some(COLUMN_OVERFLOW)
    } else {
        raw.parse().ok()
    }
}

fn build_diagnostic(severity: Severity, caps: &Captures<'_>, dirs: &DirectoryStack) -> Diagnostic {
    let code = group(caps, "code").unwrap_or_default();
    let message = group(caps, "message").unwrap_or_default();
    let mut diag = Diagnostic::new(severity, code, message);

    if let Some(file) = group(caps, "file") {
        diag = diag.with_file(dirs.resolve(Path::new(file)));
    }
    if let Some(line) = group(caps, "line").and_then(|l| l.parse().ok()) {
        diag = diag.with_line(line);
    }
    if let Some(column) = group(caps, "column").and_then(parse_column) {
        diag = diag.with_column(column);
    }
    diag
}
