//! Running the test binary and cleaning up after test builds
use crate::conventions::Conventions;
use crate::error::{BuildError, BuildResult};
use crate::graph::Dag;
use crate::scanner::UnitParser;
use filetime::FileTime;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Flags passed through to the generated test binary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestOptions {
    pub binary: PathBuf,
    /// Pattern selecting tests to run
    pub filter: Option<String>,
    /// Pattern selecting benchmarks to run
    pub bench: Option<String>,
    pub timeout: Option<String>,
    pub benchtime: Option<String>,
    pub parallel: Option<u32>,
    pub cpu: Option<String>,
    pub verbose: bool,
    pub short: bool,
}

impl TestOptions {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            ..Self::default()
        }
    }

    /// Command line for the test binary
    pub fn test_argv(&self) -> Vec<String> {
        let mut argv = vec![self.binary.to_string_lossy().into_owned()];
        let mut flag = |name: &str, value: &Option<String>| {
            if let Some(value) = value {
                argv.push(format!("-test.{name}"));
                argv.push(value.clone());
            }
        };
        flag("bench", &self.bench);
        flag("run", &self.filter);
        flag("timeout", &self.timeout);
        flag("benchtime", &self.benchtime);
        flag("parallel", &self.parallel.map(|n| n.to_string()));
        flag("cpu", &self.cpu);
        if self.verbose {
            argv.push("-test.v".to_string());
        }
        if self.short {
            argv.push("-test.short".to_string());
        }
        argv
    }

    /// Run the test binary; returns whether every test passed
    pub fn run(&self) -> BuildResult<bool> {
        let argv = self.test_argv();
        tracing::info!(command = %argv.join(" "), "running tests");
        let status = Command::new(&self.binary)
            .args(&argv[1..])
            .status()
            .map_err(|error| BuildError::Spawn {
                program: argv[0].clone(),
                error,
            })?;
        Ok(status.success())
    }
}

impl Dag {
    /// Drop test files from packages whose test files declare `init`.
    ///
    /// A parameterless, resultless `init` in a test file would otherwise be
    /// linked into production binaries. The package's artifact is removed
    /// and its remaining files are touched, so the next build recompiles it
    /// along with everything depending on it. Returns whether any package
    /// changed.
    pub fn strip_test_files(
        &mut self,
        parser: &dyn UnitParser,
        conventions: &Conventions,
    ) -> BuildResult<bool> {
        let mut changed = false;

        for package in self.packages_mut() {
            if !package.has_mixed_test_files(conventions) {
                continue;
            }

            let mut has_init = false;
            for file in package.files.iter().filter(|f| conventions.is_test_file(f)) {
                has_init |= parser.declarations(file)?.iter().any(|decl| {
                    decl.name == "init" && decl.arity == 0 && !decl.has_receiver && !decl.has_results
                });
            }
            if !has_init {
                continue;
            }

            tracing::debug!(package = %package.name, "stripping test files with init");
            package.files.retain(|f| !conventions.is_test_file(f));
            if let Some(command) = package.command.as_mut() {
                command
                    .argv
                    .retain(|arg| !conventions.is_test_file(Path::new(arg)));
                // The artifact was built with the test files
                match fs::remove_file(&command.output) {
                    Ok(()) => {}
                    Err(e) if e.kind() == ErrorKind::NotFound => {}
                    Err(e) => return Err(BuildError::io(&command.output, e)),
                }
            }
            let now = FileTime::now();
            for file in &package.files {
                filetime::set_file_mtime(file, now).map_err(|e| BuildError::io(file, e))?;
            }
            changed = true;
        }

        Ok(changed)
    }
}
