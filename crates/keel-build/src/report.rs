//! Progress events and graph inspection output
use crate::error::{BuildError, BuildResult};
use crate::graph::Dag;
use parking_lot::Mutex;
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Something the build did that the user may want to see
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildEvent {
    Compiling { package: String },
    UpToDate { package: String },
    /// Not compiled because a dependency failed
    Skipped { package: String },
    Failed { package: String, error: String },
    Linking { output: PathBuf },
    LinkUpToDate { output: PathBuf },
    Testing { binary: PathBuf },
    Removing { path: PathBuf, dry_run: bool },
}

impl fmt::Display for BuildEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compiling { package } => write!(f, "compiling: {package}"),
            Self::UpToDate { package } => write!(f, "up to date: {package}"),
            Self::Skipped { package } => write!(f, "skipped: {package} (dependency failed)"),
            Self::Failed { package, error } => write!(f, "failed: {package}: {error}"),
            Self::Linking { output } => write!(f, "linking: {}", output.display()),
            Self::LinkUpToDate { output } => write!(f, "up to date: {}", output.display()),
            Self::Testing { binary } => write!(f, "testing: {}", binary.display()),
            Self::Removing { path, dry_run: true } => write!(f, "[dryrun] rm: {}", path.display()),
            Self::Removing { path, dry_run: false } => write!(f, "rm: {}", path.display()),
        }
    }
}

/// Receives build events; called from concurrent scheduler tasks
pub trait Reporter: Sync {
    fn report(&self, event: &BuildEvent);
}

/// Discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn report(&self, _event: &BuildEvent) {}
}

/// Keeps every event in memory
#[derive(Debug, Default)]
pub struct CollectingReporter {
    events: Mutex<Vec<BuildEvent>>,
}

impl CollectingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events received so far
    pub fn events(&self) -> Vec<BuildEvent> {
        self.events.lock().clone()
    }
}

impl Reporter for CollectingReporter {
    fn report(&self, event: &BuildEvent) {
        self.events.lock().push(event.clone());
    }
}

/// Package summary for `print` output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageInfo {
    pub name: String,
    pub files: Vec<PathBuf>,
    pub dependencies: Vec<String>,
}

impl Dag {
    /// Collected files and dependencies of every package
    pub fn info(&self) -> Vec<PackageInfo> {
        self.iter()
            .map(|(_, p)| PackageInfo {
                name: p.name.clone(),
                files: p.files.clone(),
                dependencies: p.dependencies.iter().cloned().collect(),
            })
            .collect()
    }

    /// Render the graph in Graphviz dot format
    pub fn dot_graph(&self) -> String {
        let mut out = String::from("digraph depgraph {\n\trankdir=LR;\n");
        for (_, package) in self.iter() {
            if package.dependencies.is_empty() {
                out.push_str(&format!("\t\"{}\";\n", package.name));
            } else {
                for dep in &package.dependencies {
                    out.push_str(&format!("\t\"{}\" -> \"{}\";\n", package.name, dep));
                }
            }
        }
        out.push_str("}\n");
        out
    }

    /// Write the dot graph to `path`, replacing any existing file
    pub fn write_dot(&self, path: &Path) -> BuildResult<()> {
        fs::write(path, self.dot_graph()).map_err(|e| BuildError::io(path, e))
    }
}
