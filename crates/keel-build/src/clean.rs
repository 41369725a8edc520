//! Removing compiled objects
use crate::error::{BuildError, BuildResult};
use crate::graph::Dag;
use crate::report::{BuildEvent, NullReporter, Reporter};
use std::fs;
use std::path::{Path, PathBuf};

/// Object suffixes removed regardless of the configured backend
pub const KNOWN_OBJECT_SUFFIXES: &[&str] = &[".8", ".6", ".5", ".o", ".vmo"];

/// Deletes package objects from a directory
pub struct Cleaner<'a> {
    suffixes: Vec<String>,
    reporter: &'a dyn Reporter,
}

impl<'a> Cleaner<'a> {
    /// A cleaner for the known suffixes plus `extra_suffix`
    pub fn new(extra_suffix: &str) -> Self {
        let mut suffixes: Vec<String> = KNOWN_OBJECT_SUFFIXES.iter().map(|s| s.to_string()).collect();
        if !extra_suffix.is_empty() && !suffixes.iter().any(|s| s == extra_suffix) {
            suffixes.push(extra_suffix.to_string());
        }
        Self {
            suffixes,
            reporter: &NullReporter,
        }
    }

    pub fn with_reporter(mut self, reporter: &'a dyn Reporter) -> Self {
        self.reporter = reporter;
        self
    }

    /// Remove `<dir>/<name><suffix>` for every package.
    ///
    /// When `dir` is a dedicated lib dir (`remove_empty_dir`) and ends up
    /// empty, it is removed too. With `dry_run` nothing is touched.
    /// Returns the paths removed, or that would be.
    pub fn delete_objects(
        &self,
        dag: &Dag,
        dir: &Path,
        remove_empty_dir: bool,
        dry_run: bool,
    ) -> BuildResult<Vec<PathBuf>> {
        let mut removed = Vec::new();

        for (_, package) in dag.iter() {
            for suffix in &self.suffixes {
                let path = dir.join(format!("{}{suffix}", package.name));
                if !path.is_file() {
                    continue;
                }
                self.reporter.report(&BuildEvent::Removing {
                    path: path.clone(),
                    dry_run,
                });
                if !dry_run {
                    fs::remove_file(&path).map_err(|e| BuildError::io(&path, e))?;
                }
                removed.push(path);
            }
        }

        if remove_empty_dir && dir.is_dir() && !has_files(dir) {
            self.reporter.report(&BuildEvent::Removing {
                path: dir.to_path_buf(),
                dry_run,
            });
            if !dry_run {
                fs::remove_dir_all(dir).map_err(|e| BuildError::io(dir, e))?;
            }
            removed.push(dir.to_path_buf());
        }

        Ok(removed)
    }
}

/// Whether any regular file exists below `dir`; empty subdirectories do
/// not count
fn has_files(dir: &Path) -> bool {
    walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .any(|entry| entry.file_type().is_file())
}
