//! Linking the selected main package into an executable
use crate::backend::Backend;
use crate::error::{BuildError, BuildResult};
use crate::executor::CompileExecutor;
use crate::graph::Dag;
use crate::package::PackageId;
use crate::report::{BuildEvent, NullReporter, Reporter};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

/// Pick the package to link.
///
/// With several main packages, `pattern` must match exactly one of their
/// names; otherwise the candidates are returned in the error.
pub fn select_main(dag: &Dag, pattern: Option<&Regex>) -> BuildResult<PackageId> {
    let mains = dag.main_packages();
    match mains.as_slice() {
        [] => Err(BuildError::NoMainPackage),
        [only] => Ok(*only),
        _ => {
            let matching: Vec<PackageId> = match pattern {
                Some(re) => mains
                    .iter()
                    .copied()
                    .filter(|&id| re.is_match(&dag[id].name))
                    .collect(),
                None => Vec::new(),
            };
            match matching.as_slice() {
                [chosen] => Ok(*chosen),
                _ => Err(BuildError::AmbiguousMain {
                    candidates: dag.names(&mains),
                }),
            }
        }
    }
}

/// Runs link commands built by a [`Backend`]
pub struct Linker<'a> {
    backend: &'a Backend,
    src_root: &'a Path,
    executor: &'a dyn CompileExecutor,
    reporter: &'a dyn Reporter,
}

impl<'a> Linker<'a> {
    pub fn new(backend: &'a Backend, src_root: &'a Path, executor: &'a dyn CompileExecutor) -> Self {
        Self {
            backend,
            src_root,
            executor,
            reporter: &NullReporter,
        }
    }

    pub fn with_reporter(mut self, reporter: &'a dyn Reporter) -> Self {
        self.reporter = reporter;
        self
    }

    /// Link `main` into `output`.
    ///
    /// Skipped when nothing was rebuilt and the output is newer than the
    /// main object. Returns whether the linker ran.
    pub fn link(&self, dag: &Dag, main: PackageId, output: &Path, any_rebuilt: bool) -> BuildResult<bool> {
        let package = &dag[main];
        let object = self.backend.object_path(self.src_root, &package.name);

        if !any_rebuilt && is_newer(output, &object) {
            tracing::debug!(output = %output.display(), "link output up to date");
            self.reporter.report(&BuildEvent::LinkUpToDate {
                output: output.to_path_buf(),
            });
            return Ok(false);
        }

        let argv = self.backend.link_command(self.src_root, output, &object);
        tracing::info!(output = %output.display(), main = %package.name, "linking");
        self.reporter.report(&BuildEvent::Linking {
            output: output.to_path_buf(),
        });
        self.executor.invoke(&package.name, &argv)?;
        Ok(true)
    }

    /// Link every nested main package into `bin_dir`.
    ///
    /// A main package named `cmd/tool/main` becomes `bin_dir/tool`; main
    /// packages directly under the root have no directory to name the
    /// binary after and are skipped.
    pub fn link_all(&self, dag: &Dag, bin_dir: &Path, any_rebuilt: bool) -> BuildResult<Vec<PathBuf>> {
        let mains = dag.main_packages();
        if mains.is_empty() {
            return Err(BuildError::NoMainPackage);
        }
        fs::create_dir_all(bin_dir).map_err(|e| BuildError::io(bin_dir, e))?;

        let mut outputs = Vec::new();
        for id in mains {
            let segments: Vec<&str> = dag[id].name.split('/').collect();
            if segments.len() < 2 {
                tracing::debug!(package = %dag[id].name, "main package at root, not linked by link_all");
                continue;
            }
            let output = bin_dir.join(segments[segments.len() - 2]);
            self.link(dag, id, &output, any_rebuilt)?;
            outputs.push(output);
        }
        Ok(outputs)
    }
}

/// Whether `output` exists and is strictly newer than `input`
fn is_newer(output: &Path, input: &Path) -> bool {
    let modified = |p: &Path| fs::metadata(p).and_then(|m| m.modified());
    match (modified(output), modified(input)) {
        (Ok(out), Ok(inp)) => inp < out,
        _ => false,
    }
}
