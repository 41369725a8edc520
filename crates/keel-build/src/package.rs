//! Package nodes: the unit of compilation
use crate::conventions::Conventions;
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

/// Stable index of a package inside a [`Dag`](crate::Dag) arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageId(pub(crate) usize);

impl PackageId {
    /// Position of the package in the arena
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Command that compiles a package, plus the artifact it declares
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileCommand {
    /// Full command line, program first
    pub argv: Vec<String>,
    /// Artifact written by the command
    pub output: PathBuf,
}

impl CompileCommand {
    pub fn new(argv: Vec<String>, output: impl Into<PathBuf>) -> Self {
        Self {
            argv,
            output: output.into(),
        }
    }
}

/// A compilation unit: one or more source files sharing a declared name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    /// Canonical path-like name, unique in the graph
    pub name: String,
    /// Unit name as declared in source
    pub short_name: String,
    /// Source files in scan order
    pub files: Vec<PathBuf>,
    /// Raw import paths collected from every file
    pub dependencies: BTreeSet<String>,
    /// Number of local dependencies, set by edge construction
    pub indegree: usize,
    /// Packages that depend on this one
    pub(crate) children: Vec<PackageId>,
    /// Compile command, assigned by the backend
    pub command: Option<CompileCommand>,
}

impl Package {
    /// Create a package with no files and no dependencies
    pub fn new(name: impl Into<String>, short_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            short_name: short_name.into(),
            files: Vec::new(),
            dependencies: BTreeSet::new(),
            indegree: 0,
            children: Vec::new(),
            command: None,
        }
    }

    /// Add source files
    pub fn with_files<I, P>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.files.extend(files.into_iter().map(Into::into));
        self
    }

    /// Add import paths
    pub fn with_dependencies<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies
            .extend(dependencies.into_iter().map(Into::into));
        self
    }

    /// Attach a compile command
    pub fn with_command(mut self, command: CompileCommand) -> Self {
        self.command = Some(command);
        self
    }

    /// Packages that depend on this one
    pub fn children(&self) -> &[PackageId] {
        &self.children
    }

    /// Whether this package is a program entry point
    pub fn is_main(&self) -> bool {
        self.short_name == "main"
    }

    /// Number of files following the test-file naming convention
    pub fn test_file_count(&self, conventions: &Conventions) -> usize {
        self.files
            .iter()
            .filter(|f| conventions.is_test_file(f))
            .count()
    }

    /// True when some, but not all, files are test files
    pub fn has_mixed_test_files(&self, conventions: &Conventions) -> bool {
        let tests = self.test_file_count(conventions);
        tests > 0 && tests != self.files.len()
    }
}
