//! Synthesized test entry point
//!
//! Test-shaped functions are collected from every package and wired into a
//! generated `main` package that hands them to the generic test runner.
//! The generated package lives in a scratch directory under the source
//! root and is removed when the [`TestHarness`] is dropped.

use crate::conventions::Conventions;
use crate::error::{BuildError, BuildResult};
use crate::graph::Dag;
use crate::package::Package;
use crate::scanner::{FunctionDecl, UnitParser};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Kind of test-shaped function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestKind {
    /// `Test*` taking one parameter
    Test,
    /// `Benchmark*` taking one parameter
    Benchmark,
    /// `Example*` taking no parameters
    Example,
}

impl TestKind {
    /// Classify a top-level declaration, if it is test-shaped
    pub fn of(decl: &FunctionDecl) -> Option<Self> {
        if decl.has_receiver {
            return None;
        }
        let name = decl.name.as_str();
        if name.starts_with("Test") && decl.arity == 1 {
            Some(Self::Test)
        } else if name.starts_with("Benchmark") && decl.arity == 1 {
            Some(Self::Benchmark)
        } else if name.starts_with("Example") && decl.arity == 0 {
            Some(Self::Example)
        } else {
            None
        }
    }
}

/// A collected function, qualified for the generated source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestFunction {
    /// Declared unit name, used in the display name
    pub unit: String,
    /// Identifier the generated source imports the package under
    pub alias: String,
    pub function: String,
}

impl TestFunction {
    /// `unit.Function`, the name the runner reports
    pub fn display_name(&self) -> String {
        format!("{}.{}", self.unit, self.function)
    }

    fn reference(&self) -> String {
        format!("{}.{}", self.alias, self.function)
    }
}

/// Everything the harness found, bucketed by kind
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestCollector {
    pub tests: Vec<TestFunction>,
    pub benchmarks: Vec<TestFunction>,
    pub examples: Vec<TestFunction>,
}

impl TestCollector {
    /// Whether no test-shaped function was found
    pub fn is_empty(&self) -> bool {
        self.tests.is_empty() && self.benchmarks.is_empty() && self.examples.is_empty()
    }

    fn push(&mut self, kind: TestKind, function: TestFunction) {
        match kind {
            TestKind::Test => self.tests.push(function),
            TestKind::Benchmark => self.benchmarks.push(function),
            TestKind::Example => self.examples.push(function),
        }
    }
}

/// Import alias for a package: names with `/` lose every `/` and `.`
pub fn import_alias(package: &Package) -> String {
    if package.name.contains('/') {
        package.name.replace(['/', '.'], "")
    } else {
        package.short_name.clone()
    }
}

fn import_line(package: &Package) -> String {
    if package.name.contains('/') {
        format!("import {} \"{}\"", import_alias(package), package.name)
    } else {
        format!("import \"{}\"", package.name)
    }
}

/// The generated entry point, with its scratch directories
#[derive(Debug)]
pub struct TestHarness {
    scratch: TempDir,
    scratch_lib: Option<PathBuf>,
    package: Package,
    collector: TestCollector,
}

impl TestHarness {
    /// The synthetic `main` package compiling the generated source
    pub fn package(&self) -> &Package {
        &self.package
    }

    /// Functions wired into the generated source
    pub fn collector(&self) -> &TestCollector {
        &self.collector
    }

    /// Scratch directory holding the generated file
    pub fn scratch_dir(&self) -> &Path {
        self.scratch.path()
    }

    /// Scratch directory reserved under the lib dir, if one is configured
    pub fn scratch_lib_dir(&self) -> Option<&Path> {
        self.scratch_lib.as_deref()
    }

    /// The generated source file
    pub fn source_file(&self) -> &Path {
        &self.package.files[0]
    }
}

impl Drop for TestHarness {
    fn drop(&mut self) {
        if let Some(dir) = &self.scratch_lib {
            if let Err(error) = fs::remove_dir_all(dir) {
                tracing::warn!(dir = %dir.display(), %error, "failed to remove scratch lib dir");
            }
        }
    }
}

impl Dag {
    /// Collect test-shaped functions from every package.
    ///
    /// Packages whose unit name carries the test suffix are scanned in
    /// full; other packages only through their test files.
    pub fn collect_tests(
        &self,
        parser: &dyn UnitParser,
        conventions: &Conventions,
    ) -> BuildResult<(TestCollector, Vec<&Package>)> {
        let mut collector = TestCollector::default();
        let mut contributors = Vec::new();

        for (_, package) in self.iter() {
            let whole = conventions.is_test_unit(&package.short_name);
            let alias = import_alias(package);
            let mut found = false;

            for file in package
                .files
                .iter()
                .filter(|f| whole || conventions.is_test_file(f))
            {
                for decl in parser.declarations(file)? {
                    if let Some(kind) = TestKind::of(&decl) {
                        collector.push(
                            kind,
                            TestFunction {
                                unit: package.short_name.clone(),
                                alias: alias.clone(),
                                function: decl.name,
                            },
                        );
                        found = true;
                    }
                }
            }

            if found {
                contributors.push(package);
            }
        }

        tracing::debug!(
            tests = collector.tests.len(),
            benchmarks = collector.benchmarks.len(),
            examples = collector.examples.len(),
            "collected test functions"
        );
        Ok((collector, contributors))
    }

    /// Generate the test entry point and write it under `root`.
    ///
    /// The synthetic package is named `<scratch>/main`. With `lib_dir`, a
    /// scratch directory of the same name is reserved there for its object.
    pub fn make_main_test(
        &self,
        root: &Path,
        lib_dir: Option<&Path>,
        parser: &dyn UnitParser,
        conventions: &Conventions,
    ) -> BuildResult<TestHarness> {
        let (collector, contributors) = self.collect_tests(parser, conventions)?;
        let source = render_main(&collector, &contributors);

        let scratch = tempfile::Builder::new()
            .prefix("tmp")
            .tempdir_in(root)
            .map_err(|e| BuildError::io(root, e))?;
        let stub = scratch
            .path()
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        let scratch_lib = match lib_dir {
            Some(lib) => {
                let dir = lib.join(&stub);
                fs::create_dir_all(&dir).map_err(|e| BuildError::io(&dir, e))?;
                Some(dir)
            }
            None => None,
        };

        let file = scratch.path().join(conventions.entry_file_name());
        fs::write(&file, source).map_err(|e| BuildError::io(&file, e))?;
        tracing::debug!(file = %file.display(), "wrote test entry point");

        Ok(TestHarness {
            package: Package::new(format!("{stub}/main"), "main").with_files([file]),
            scratch,
            scratch_lib,
            collector,
        })
    }
}

/// Render the generated entry point source
pub fn render_main(collector: &TestCollector, contributors: &[&Package]) -> String {
    let mut imports = BTreeSet::new();
    imports.insert("import \"regexp\"".to_string());
    imports.insert("import \"testing\"".to_string());
    imports.extend(contributors.iter().map(|p| import_line(p)));

    let mut out = String::from("\n// autogenerated code\n\npackage main\n\n");
    for line in &imports {
        out.push_str(line);
        out.push('\n');
    }

    let lists = [
        ("tests", "InternalTest", &collector.tests),
        ("benchmarks", "InternalBenchmark", &collector.benchmarks),
        ("examples", "InternalExample", &collector.examples),
    ];
    for (var, ty, functions) in lists {
        out.push_str(&format!("\nvar {var} = []testing.{ty}{{\n"));
        for f in functions {
            out.push_str(&format!(
                "\ttesting.{ty}{{\"{}\", {}}},\n",
                f.display_name(),
                f.reference()
            ));
        }
        out.push_str("}\n");
    }

    out.push_str("\nfunc main() {\n");
    out.push_str("\ttesting.Main(regexp.MatchString, tests, benchmarks, examples)\n");
    out.push_str("}\n");
    out
}
