//! Build orchestration and pipeline management
use crate::backend::Backend;
use crate::clean::Cleaner;
use crate::conventions::Conventions;
use crate::error::{BuildError, BuildResult};
use crate::executor::CompileExecutor;
use crate::graph::Dag;
use crate::link::{select_main, Linker};
use crate::naming::{DirectoryConvention, NamingPolicy};
use crate::report::{BuildEvent, NullReporter, Reporter};
use crate::scanner::{SourceScanner, UnitParser};
use crate::scheduler::{CompileReport, Scheduler};
use crate::staleness::{BuildMode, StalenessOracle};
use crate::testrun::TestOptions;
use crate::walker::SourceWalker;
use regex::Regex;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Build configuration
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Root of the source tree
    pub src_root: PathBuf,
    /// Compiler and linker settings
    pub backend: Backend,
    /// Source and test file naming
    pub conventions: Conventions,
    /// Linked executable
    pub output: PathBuf,
    /// An executable was asked for explicitly (`--output`, `--main`);
    /// without it a tree with no main package is only compiled
    pub require_link: bool,
    /// Regex picking the main package when there are several
    pub main_pattern: Option<String>,
    /// Link every nested main package into `bin_dir`
    pub link_all: bool,
    pub bin_dir: PathBuf,
    /// Print commands instead of running them
    pub dry_run: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            src_root: PathBuf::from("src"),
            backend: Backend::default(),
            conventions: Conventions::default(),
            output: PathBuf::from("a.out"),
            require_link: false,
            main_pattern: None,
            link_all: false,
            bin_dir: PathBuf::from("bin"),
            dry_run: false,
        }
    }
}

/// Result of a successful build
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildOutcome {
    pub report: CompileReport,
    /// Executables the linker wrote
    pub linked: Vec<PathBuf>,
}

/// Result of a test run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestOutcome {
    /// Number of test-shaped functions wired into the harness
    pub collected: usize,
    /// Whether the test binary ran
    pub ran: bool,
    /// Whether it exited successfully
    pub passed: bool,
    /// Whether production artifacts were rebuilt without test files
    pub recompiled: bool,
}

/// Main builder for orchestrating builds
pub struct Builder<'a> {
    config: BuildConfig,
    parser: Box<dyn UnitParser>,
    naming: Box<dyn NamingPolicy>,
    executor: &'a dyn CompileExecutor,
    reporter: &'a dyn Reporter,
}

impl<'a> Builder<'a> {
    /// Create a builder running compile and link commands through `executor`
    pub fn new(config: BuildConfig, executor: &'a dyn CompileExecutor) -> Self {
        Self {
            config,
            parser: Box::new(SourceScanner),
            naming: Box::new(DirectoryConvention),
            executor,
            reporter: &NullReporter,
        }
    }

    /// Use a different package naming policy
    pub fn with_naming(mut self, naming: Box<dyn NamingPolicy>) -> Self {
        self.naming = naming;
        self
    }

    /// Use a different source parser
    pub fn with_parser(mut self, parser: Box<dyn UnitParser>) -> Self {
        self.parser = parser;
        self
    }

    /// Send progress events to `reporter`
    pub fn with_reporter(mut self, reporter: &'a dyn Reporter) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Scan the source tree into a graph with edges and compile commands
    pub fn discover(&self, mode: BuildMode) -> BuildResult<Dag> {
        let root = &self.config.src_root;
        let files = SourceWalker::new(self.config.conventions.clone())
            .with_tests(mode == BuildMode::Test)
            .walk(root)?;
        if files.is_empty() {
            return Err(BuildError::NoSourceFiles(root.clone()));
        }

        let mut dag = Dag::parse(root, &files, self.parser.as_ref(), self.naming.as_ref())?;
        dag.build_edges();
        self.config.backend.assign_commands(&mut dag, root)?;
        Ok(dag)
    }

    /// Compile every package of `dag`
    pub fn compile(&self, dag: &Dag, mode: BuildMode) -> BuildResult<CompileReport> {
        let oracle = StalenessOracle::new(mode, self.config.conventions.clone());
        Scheduler::new(dag, &oracle, self.executor)
            .with_reporter(self.reporter)
            .run()
    }

    /// Discover, compile and link.
    ///
    /// A tree without a main package is only compiled unless an
    /// executable was asked for explicitly.
    pub fn build(&self) -> BuildResult<BuildOutcome> {
        let dag = self.discover(BuildMode::Build)?;
        let report = self.compile(&dag, BuildMode::Build)?;
        let linked = self.link(&dag, report.any_rebuilt)?;
        Ok(BuildOutcome { report, linked })
    }

    fn linker(&self) -> Linker<'_> {
        Linker::new(&self.config.backend, &self.config.src_root, self.executor)
            .with_reporter(self.reporter)
    }

    fn link(&self, dag: &Dag, any_rebuilt: bool) -> BuildResult<Vec<PathBuf>> {
        let relink = any_rebuilt || self.config.dry_run;
        let linker = self.linker();

        if self.config.link_all {
            return linker.link_all(dag, &self.config.bin_dir, relink);
        }
        if dag.main_packages().is_empty() && !self.config.require_link {
            tracing::debug!("no main package, nothing to link");
            return Ok(Vec::new());
        }

        let pattern = self
            .config
            .main_pattern
            .as_deref()
            .map(|p| Regex::new(p).map_err(|e| BuildError::invalid_pattern(p, e)))
            .transpose()?;
        let main = select_main(dag, pattern.as_ref())?;
        linker.link(dag, main, &self.config.output, relink)?;
        Ok(vec![self.config.output.clone()])
    }

    /// Build in test mode, synthesize and run the test entry point.
    ///
    /// Afterwards, packages whose test files declare `init` are rebuilt
    /// from their plain files so test code never stays in production
    /// artifacts.
    pub fn test(&self, options: &TestOptions) -> BuildResult<TestOutcome> {
        let mut dag = self.discover(BuildMode::Test)?;
        self.compile(&dag, BuildMode::Test)?;

        let root = &self.config.src_root;
        let harness = dag.make_main_test(
            root,
            self.config.backend.lib_dir.as_deref(),
            self.parser.as_ref(),
            &self.config.conventions,
        )?;
        let mut outcome = TestOutcome {
            collected: harness.collector().tests.len()
                + harness.collector().benchmarks.len()
                + harness.collector().examples.len(),
            ..TestOutcome::default()
        };

        if harness.collector().is_empty() {
            tracing::warn!(root = %root.display(), "no test functions found");
            outcome.passed = true;
        } else {
            let mut entry = Dag::new();
            let main = entry.add_package(harness.package().clone());
            self.config.backend.assign_commands(&mut entry, root)?;
            self.compile(&entry, BuildMode::Test)?;
            self.linker().link(&entry, main, &options.binary, true)?;

            if self.config.dry_run {
                outcome.passed = true;
            } else {
                self.reporter.report(&BuildEvent::Testing {
                    binary: options.binary.clone(),
                });
                outcome.ran = true;
                let passed = options.run();
                remove_if_present(&options.binary)?;
                outcome.passed = passed?;
            }
        }
        drop(harness);

        if dag.strip_test_files(self.parser.as_ref(), &self.config.conventions)? {
            self.compile(&dag, BuildMode::Build)?;
            outcome.recompiled = true;
        }

        Ok(outcome)
    }

    /// Remove compiled objects of every package, test packages included
    pub fn clean(&self) -> BuildResult<Vec<PathBuf>> {
        let dag = self.discover(BuildMode::Test)?;
        let backend = &self.config.backend;
        let dir = backend.lib_root(&self.config.src_root);
        Cleaner::new(&backend.object_suffix)
            .with_reporter(self.reporter)
            .delete_objects(&dag, &dir, backend.lib_dir.is_some(), self.config.dry_run)
    }

    /// Source root the builder scans
    pub fn src_root(&self) -> &Path {
        &self.config.src_root
    }
}

fn remove_if_present(path: &Path) -> BuildResult<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(BuildError::io(path, e)),
    }
}
