//! Accumulates extracted diagnostics and raw output into a [`BuildResult`].

use std::path::PathBuf;

use crate::directory_stack::DirectoryStack;
use crate::domain::{BuildResult, Diagnostic, GENERIC_BUILD_FAILURE};
use crate::extractor::{Extracted, LineExtractor};

/// One parse pass over the output of a single tool run.
///
/// Owns its directory stack, so concurrent builds each use their own
/// aggregator and share nothing but the (immutable) extractor.
#[derive(Debug)]
pub struct DiagnosticAggregator<'a> {
    extractor: &'a LineExtractor,
    dirs: DirectoryStack,
    diagnostics: Vec<Diagnostic>,
    output: String,
    unbalanced_leaves: usize,
}

impl<'a> DiagnosticAggregator<'a> {
    /// Start a pass with the directory context seeded at `base_dir`.
    pub fn new(extractor: &'a LineExtractor, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            extractor,
            dirs: DirectoryStack::new(base_dir),
            diagnostics: Vec::new(),
            output: String::new(),
            unbalanced_leaves: 0,
        }
    }

    /// Record `line` verbatim and extract whatever it carries.
    pub fn feed_line(&mut self, line: &str) {
        self.output.push_str(line);
        self.output.push('\n');

        match self.extractor.extract(line, &mut self.dirs) {
            Extracted::Diagnostics(found) => self.diagnostics.extend(found),
            Extracted::Directory { underflow: true } => self.unbalanced_leaves += 1,
            Extracted::Directory { underflow: false } | Extracted::Ignored => {}
        }
    }

    pub fn feed(&mut self, output: &str) {
        for line in output.lines() {
            self.feed_line(line);
        }
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// `Leaving directory` markers seen with only the seed frame left.
    pub fn unbalanced_leaves(&self) -> usize {
        self.unbalanced_leaves
    }

    /// Finish the pass without an exit status.
    pub fn into_parsed(self) -> ParsedOutput {
        ParsedOutput {
            diagnostics: self.diagnostics,
            output: self.output,
            unbalanced_leaves: self.unbalanced_leaves,
        }
    }

    /// Finalize the result for a tool that exited with `exit_code`.
    ///
    /// A failing tool that printed nothing parseable still yields one error
    /// diagnostic. Diagnostics never turn a zero exit status into a failure.
    pub fn finish(self, exit_code: i32) -> BuildResult {
        let mut diagnostics = self.diagnostics;
        let success = !(exit_code != 0 && diagnostics.is_empty());
        if !success {
            diagnostics.push(Diagnostic::error(GENERIC_BUILD_FAILURE));
        }

        BuildResult {
            diagnostics,
            output: self.output,
            exit_code,
            success,
            error: None,
        }
    }
}

/// Diagnostics and raw output of one parse pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedOutput {
    pub diagnostics: Vec<Diagnostic>,
    pub output: String,
    pub unbalanced_leaves: usize,
}

/// Parse captured tool output with the directory context seeded at `base_dir`.
///
/// Pure in `(output, base_dir)`: the same input always yields the same
/// diagnostics.
pub fn parse_output(
    extractor: &LineExtractor,
    output: &str,
    base_dir: impl Into<PathBuf>,
) -> ParsedOutput {
    let mut aggregator = DiagnosticAggregator::new(extractor, base_dir);
    aggregator.feed(output);
    aggregator.into_parsed()
}

/// Parse captured output and finalize it against the tool's exit status.
pub fn aggregate(
    extractor: &LineExtractor,
    output: &str,
    exit_code: i32,
    base_dir: impl Into<PathBuf>,
) -> BuildResult {
    let mut aggregator = DiagnosticAggregator::new(extractor, base_dir);
    aggregator.feed(output);
    aggregator.finish(exit_code)
}
