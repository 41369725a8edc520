//! Source file discovery
use crate::conventions::Conventions;
use crate::error::{BuildError, BuildResult};
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Collects the source files of a tree
#[derive(Debug, Clone)]
pub struct SourceWalker {
    conventions: Conventions,
    include_tests: bool,
}

impl SourceWalker {
    pub fn new(conventions: Conventions) -> Self {
        Self {
            conventions,
            include_tests: false,
        }
    }

    /// Also pick up test files
    pub fn with_tests(mut self, include_tests: bool) -> Self {
        self.include_tests = include_tests;
        self
    }

    /// Walk `root`, returning source files in sorted order.
    ///
    /// Hidden directories and files starting with `_` are skipped.
    pub fn walk(&self, root: &Path) -> BuildResult<Vec<PathBuf>> {
        if !root.is_dir() {
            return Err(BuildError::io(
                root,
                std::io::Error::new(std::io::ErrorKind::NotFound, "source directory not found"),
            ));
        }

        let mut files = Vec::new();
        let walker = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden_dir(e));

        for entry in walker {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(root).to_path_buf();
                BuildError::io(path, e.into())
            })?;
            if entry.file_type().is_file() && self.accepts(entry.path()) {
                files.push(entry.into_path());
            }
        }

        tracing::debug!(root = %root.display(), count = files.len(), "discovered source files");
        Ok(files)
    }

    fn accepts(&self, path: &Path) -> bool {
        let underscore = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with('_'));

        self.conventions.is_source(path)
            && !underscore
            && (self.include_tests || !self.conventions.is_test_file(path))
    }
}

fn is_hidden_dir(entry: &DirEntry) -> bool {
    entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with('.'))
}
