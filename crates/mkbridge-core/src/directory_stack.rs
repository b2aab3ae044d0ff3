//! Directory context for resolving relative paths in recursive tool output.
//!
//! `make -w` announces every directory it recurses into. Diagnostics printed
//! between an `Entering` and the matching `Leaving` marker carry paths
//! relative to that directory, so the parser keeps a stack of the
//! directories currently entered.

use std::path::{Path, PathBuf};

/// Stack of directory frames, seeded with the project base directory.
///
/// The seed frame is never removed: an unbalanced `pop` leaves it in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryStack {
    frames: Vec<PathBuf>,
}

impl DirectoryStack {
    pub fn new(seed: impl Into<PathBuf>) -> Self {
        Self {
            frames: vec![seed.into()],
        }
    }

    pub fn push(&mut self, dir: impl Into<PathBuf>) {
        self.frames.push(dir.into());
    }

    /// Remove the top frame. Returns `false`, and keeps the seed, when only
    /// the seed frame is left.
    pub fn pop(&mut self) -> bool {
        if self.frames.len() <= 1 {
            return false;
        }
        self.frames.pop();
        true
    }

    /// Current resolution base.
    pub fn peek(&self) -> &Path {
        // `frames` always holds the seed.
        &self.frames[self.frames.len() - 1]
    }

    /// Number of frames above the seed.
    pub fn depth(&self) -> usize {
        self.frames.len() - 1
    }

    /// Resolve `file` against the current frame unless it is already absolute.
    pub fn resolve(&self, file: &Path) -> PathBuf {
        if file.is_absolute() {
            file.to_path_buf()
        } else {
            self.peek().join(file)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_is_initial_top() {
        let stack = DirectoryStack::new("/proj");
        assert_eq!(stack.peek(), Path::new("/proj"));
        assert_eq!(stack.depth(), 0);
    }

    #[test]
    fn test_push_pop() {
        let mut stack = DirectoryStack::new("/proj");
        stack.push("/proj/a");
        stack.push("/proj/a/b");
        assert_eq!(stack.peek(), Path::new("/proj/a/b"));
        assert!(stack.pop());
        assert_eq!(stack.peek(), Path::new("/proj/a"));
    }

    #[test]
    fn test_pop_never_removes_seed() {
        let mut stack = DirectoryStack::new("/proj");
        assert!(!stack.pop());
        assert!(!stack.pop());
        assert_eq!(stack.peek(), Path::new("/proj"));
    }

    #[test]
    fn test_resolve_relative_and_absolute() {
        let mut stack = DirectoryStack::new("/proj");
        stack.push("/proj/sub");
        assert_eq!(
            stack.resolve(Path::new("x.c")),
            PathBuf::from("/proj/sub/x.c")
        );
        assert_eq!(stack.resolve(Path::new("/abs/y.c")), PathBuf::from("/abs/y.c"));
    }
}
