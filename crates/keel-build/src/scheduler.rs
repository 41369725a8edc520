//! Concurrent, dependency-respecting compilation
//!
//! Every package gets its own task. A task blocks on its [`Gate`] until all
//! of its dependencies have finished, decides whether to compile, then
//! releases its dependents. Siblings run fully in parallel; there is no
//! worker pool and no global lock around compilation.

use crate::error::{BuildError, BuildResult};
use crate::executor::CompileExecutor;
use crate::graph::Dag;
use crate::package::PackageId;
use crate::report::{BuildEvent, NullReporter, Reporter};
use crate::staleness::StalenessOracle;
use crossbeam::channel;
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};

/// Counting latch guarding one package's task
#[derive(Debug)]
struct Gate {
    state: Mutex<GateState>,
    opened: Condvar,
}

#[derive(Debug)]
struct GateState {
    pending: usize,
    needs_compile: bool,
    blocked: bool,
}

/// What a task learns once its gate opens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Admission {
    needs_compile: bool,
    blocked: bool,
}

impl Gate {
    fn new(pending: usize) -> Self {
        Self {
            state: Mutex::new(GateState {
                pending,
                needs_compile: false,
                blocked: false,
            }),
            opened: Condvar::new(),
        }
    }

    /// Record one finished dependency; flags are OR-ed in
    fn release(&self, compiled: bool, failed: bool) {
        let mut state = self.state.lock();
        state.needs_compile |= compiled;
        state.blocked |= failed;
        state.pending = state.pending.saturating_sub(1);
        if state.pending == 0 {
            self.opened.notify_all();
        }
    }

    /// Block until every dependency has released this gate
    fn wait(&self) -> Admission {
        let mut state = self.state.lock();
        while state.pending > 0 {
            self.opened.wait(&mut state);
        }
        Admission {
            needs_compile: state.needs_compile,
            blocked: state.blocked,
        }
    }
}

/// How a single package's task ended
#[derive(Debug)]
enum Outcome {
    Compiled,
    UpToDate,
    Skipped,
    Failed(BuildError),
}

impl Outcome {
    fn compiled(&self) -> bool {
        matches!(self, Outcome::Compiled)
    }

    fn failed(&self) -> bool {
        matches!(self, Outcome::Failed(_) | Outcome::Skipped)
    }
}

/// Result of a successful scheduling pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileReport {
    /// Packages whose compile command ran, in name order
    pub compiled: Vec<String>,
    /// Packages found up to date, in name order
    pub up_to_date: Vec<String>,
    /// Whether any package was recompiled
    pub any_rebuilt: bool,
}

/// Drives compilation of a package graph
pub struct Scheduler<'a> {
    dag: &'a Dag,
    oracle: &'a StalenessOracle,
    executor: &'a dyn CompileExecutor,
    reporter: &'a dyn Reporter,
    any_rebuilt: AtomicBool,
}

impl<'a> Scheduler<'a> {
    pub fn new(
        dag: &'a Dag,
        oracle: &'a StalenessOracle,
        executor: &'a dyn CompileExecutor,
    ) -> Self {
        Self {
            dag,
            oracle,
            executor,
            reporter: &NullReporter,
            any_rebuilt: AtomicBool::new(false),
        }
    }

    /// Send progress events to `reporter`
    pub fn with_reporter(mut self, reporter: &'a dyn Reporter) -> Self {
        self.reporter = reporter;
        self
    }

    /// Compile every package in the graph
    pub fn run(&self) -> BuildResult<CompileReport> {
        let all: Vec<PackageId> = self.dag.ids().collect();
        self.run_packages(&all)
    }

    /// Compile the given packages, honoring edges among them.
    ///
    /// A cycle anywhere in the graph fails before any compile command
    /// runs. Failures do not stop independent packages; once every task
    /// has drained, any failure is returned as
    /// [`BuildError::CompileFailed`].
    pub fn run_packages(&self, targets: &[PackageId]) -> BuildResult<CompileReport> {
        self.dag.topsort()?;
        self.any_rebuilt.store(false, Ordering::SeqCst);

        let mut selected = vec![false; self.dag.len()];
        for id in targets {
            selected[id.index()] = true;
        }

        let mut pending = vec![0usize; self.dag.len()];
        for &id in targets {
            for child in self.dag[id].children() {
                if selected[child.index()] {
                    pending[child.index()] += 1;
                }
            }
        }
        let gates: Vec<Gate> = pending.into_iter().map(Gate::new).collect();

        tracing::debug!(packages = targets.len(), "scheduling compile tasks");

        let (tx, rx) = channel::unbounded::<(PackageId, Outcome)>();
        let mut outcomes = Vec::with_capacity(targets.len());

        std::thread::scope(|scope| {
            for &id in targets {
                let tx = tx.clone();
                let gates = &gates;
                let selected = &selected;
                scope.spawn(move || {
                    let admission = gates[id.index()].wait();
                    let outcome = self.process(id, admission);

                    for child in self.dag[id].children() {
                        if selected[child.index()] {
                            gates[child.index()].release(outcome.compiled(), outcome.failed());
                        }
                    }
                    // Receiver outlives every task
                    let _ = tx.send((id, outcome));
                });
            }
            drop(tx);

            outcomes.extend(rx.iter().take(targets.len()));
        });

        self.summarize(outcomes)
    }

    fn process(&self, id: PackageId, admission: Admission) -> Outcome {
        let package = &self.dag[id];

        if admission.blocked {
            tracing::debug!(package = %package.name, "dependency failed, skipping");
            self.reporter.report(&BuildEvent::Skipped {
                package: package.name.clone(),
            });
            return Outcome::Skipped;
        }

        let outcome = self.compile_if_needed(id, admission.needs_compile);
        if let Outcome::Failed(error) = &outcome {
            self.reporter.report(&BuildEvent::Failed {
                package: package.name.clone(),
                error: error.to_string(),
            });
        }
        outcome
    }

    fn compile_if_needed(&self, id: PackageId, needs_compile: bool) -> Outcome {
        let package = &self.dag[id];

        let required = needs_compile
            || match self.oracle.is_up_to_date(package) {
                Ok(up_to_date) => !up_to_date,
                Err(error) => return Outcome::Failed(error),
            };

        if !required {
            self.reporter.report(&BuildEvent::UpToDate {
                package: package.name.clone(),
            });
            return Outcome::UpToDate;
        }

        let Some(command) = &package.command else {
            return Outcome::Failed(BuildError::missing_command(&package.name));
        };

        tracing::info!(package = %package.name, poisoned = needs_compile, "compiling");
        self.reporter.report(&BuildEvent::Compiling {
            package: package.name.clone(),
        });

        match self.executor.invoke(&package.name, &command.argv) {
            Ok(()) => {
                self.any_rebuilt.store(true, Ordering::SeqCst);
                Outcome::Compiled
            }
            Err(error) => Outcome::Failed(error),
        }
    }

    fn summarize(&self, outcomes: Vec<(PackageId, Outcome)>) -> BuildResult<CompileReport> {
        let mut report = CompileReport::default();
        let mut failed = Vec::new();

        for (id, outcome) in outcomes {
            let name = self.dag[id].name.clone();
            match outcome {
                Outcome::Compiled => report.compiled.push(name),
                Outcome::UpToDate => report.up_to_date.push(name),
                Outcome::Skipped => {}
                Outcome::Failed(error) => {
                    tracing::error!(package = %name, %error, "compile failed");
                    failed.push(name);
                }
            }
        }

        if !failed.is_empty() {
            failed.sort();
            return Err(BuildError::CompileFailed { packages: failed });
        }

        report.compiled.sort();
        report.up_to_date.sort();
        report.any_rebuilt = self.any_rebuilt.load(Ordering::SeqCst);
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::{CompileCommand, Package};
    use crate::report::CollectingReporter;
    use filetime::{set_file_mtime, FileTime};
    use std::collections::HashMap;
    use std::fs;
    use std::path::Path;
    use std::sync::Arc;
    use std::thread;
    use std::time::{Duration, Instant};
    use tempfile::TempDir;

    /// Writes the artifact and records when each compile started and ended
    #[derive(Default)]
    struct RecordingExecutor {
        spans: Mutex<HashMap<String, (Instant, Instant)>>,
        fail: Vec<String>,
    }

    impl RecordingExecutor {
        fn failing(names: &[&str]) -> Self {
            Self {
                fail: names.iter().map(|s| s.to_string()).collect(),
                ..Self::default()
            }
        }

        fn compiled(&self) -> Vec<String> {
            let mut names: Vec<String> = self.spans.lock().keys().cloned().collect();
            names.sort();
            names
        }
    }

    impl CompileExecutor for RecordingExecutor {
        fn invoke(&self, package: &str, argv: &[String]) -> BuildResult<()> {
            let start = Instant::now();
            thread::sleep(Duration::from_millis(5));
            let result = if self.fail.iter().any(|f| f == package) {
                Err(BuildError::CommandFailed {
                    package: package.to_string(),
                    command: argv.join(" "),
                    status: "exit status: 1".to_string(),
                })
            } else {
                let output = argv.last().map(Path::new).unwrap_or(Path::new("out"));
                fs::write(output, package).map_err(|e| BuildError::io(output, e))
            };
            self.spans
                .lock()
                .insert(package.to_string(), (start, Instant::now()));
            result
        }
    }

    struct Tree {
        dir: TempDir,
        dag: Dag,
    }

    /// Each package gets one source file; its command's last argument is
    /// the artifact path so the recording executor can write it
    fn tree(edges: &[(&str, &[&str])]) -> Tree {
        let dir = TempDir::new().unwrap();
        let mut dag = Dag::new();
        for (name, deps) in edges {
            let src = dir.path().join(format!("{name}.go"));
            fs::write(&src, format!("package {name}\n")).unwrap();
            let out = dir.path().join(format!("{name}.o"));
            let argv = vec!["cc".to_string(), out.to_string_lossy().into_owned()];
            dag.add_package(
                Package::new(*name, *name)
                    .with_files([src])
                    .with_dependencies(deps.iter().copied())
                    .with_command(CompileCommand::new(argv, out)),
            );
        }
        dag.build_edges();
        Tree { dir, dag }
    }

    fn chain() -> Tree {
        tree(&[("a", &[]), ("b", &["a"]), ("c", &["b"])])
    }

    #[test]
    fn test_dependencies_finish_before_dependents_start() {
        let t = tree(&[
            ("base", &[]),
            ("left", &["base"]),
            ("right", &["base"]),
            ("top", &["left", "right"]),
            ("lone", &[]),
        ]);
        let oracle = StalenessOracle::default();
        let executor = RecordingExecutor::default();

        let report = Scheduler::new(&t.dag, &oracle, &executor).run().unwrap();
        assert_eq!(report.compiled.len(), 5);
        assert!(report.any_rebuilt);

        let spans = executor.spans.lock();
        for (_, package) in t.dag.iter() {
            for dep in &package.dependencies {
                let (_, dep_end) = spans[dep];
                let (start, _) = spans[&package.name];
                assert!(dep_end <= start, "{dep} must finish before {}", package.name);
            }
        }
    }

    #[test]
    fn test_second_run_compiles_nothing() {
        let t = chain();
        let oracle = StalenessOracle::default();

        let first = RecordingExecutor::default();
        Scheduler::new(&t.dag, &oracle, &first).run().unwrap();
        assert_eq!(first.compiled(), vec!["a", "b", "c"]);

        let second = RecordingExecutor::default();
        let report = Scheduler::new(&t.dag, &oracle, &second).run().unwrap();
        assert!(second.compiled().is_empty());
        assert!(!report.any_rebuilt);
        assert_eq!(report.up_to_date, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_rebuilt_dependency_poisons_dependents() {
        let t = chain();
        let oracle = StalenessOracle::default();
        Scheduler::new(&t.dag, &oracle, &RecordingExecutor::default())
            .run()
            .unwrap();

        // Only a's artifact goes missing; b and c stay fresh on disk
        fs::remove_file(t.dir.path().join("a.o")).unwrap();

        let executor = RecordingExecutor::default();
        let report = Scheduler::new(&t.dag, &oracle, &executor).run().unwrap();
        assert_eq!(executor.compiled(), vec!["a", "b", "c"]);
        assert!(report.up_to_date.is_empty());
    }

    #[test]
    fn test_touched_source_rebuilds_dependents() {
        let t = chain();
        let oracle = StalenessOracle::default();
        Scheduler::new(&t.dag, &oracle, &RecordingExecutor::default())
            .run()
            .unwrap();

        // a.go becomes newer than every artifact; b and c sources are untouched
        let later = FileTime::from_unix_time(FileTime::now().unix_seconds() + 60, 0);
        set_file_mtime(t.dir.path().join("a.go"), later).unwrap();

        let executor = RecordingExecutor::default();
        let report = Scheduler::new(&t.dag, &oracle, &executor).run().unwrap();
        assert_eq!(executor.compiled(), vec!["a", "b", "c"]);
        assert_eq!(report.compiled, vec!["a", "b", "c"]);
        assert!(report.any_rebuilt);
    }

    #[test]
    fn test_poisoning_does_not_flow_upstream() {
        let t = chain();
        let oracle = StalenessOracle::default();
        Scheduler::new(&t.dag, &oracle, &RecordingExecutor::default())
            .run()
            .unwrap();

        fs::remove_file(t.dir.path().join("b.o")).unwrap();

        let executor = RecordingExecutor::default();
        let report = Scheduler::new(&t.dag, &oracle, &executor).run().unwrap();
        assert_eq!(executor.compiled(), vec!["b", "c"]);
        assert_eq!(report.up_to_date, vec!["a"]);
    }

    #[test]
    fn test_cycle_fails_before_any_compile() {
        let t = tree(&[("a", &["b"]), ("b", &["a"]), ("c", &[])]);
        let oracle = StalenessOracle::default();
        let executor = RecordingExecutor::default();

        let result = Scheduler::new(&t.dag, &oracle, &executor).run();
        assert!(matches!(result, Err(BuildError::CycleDetected { .. })));
        assert!(executor.compiled().is_empty());
    }

    #[test]
    fn test_failure_skips_dependents_but_not_siblings() {
        let t = tree(&[
            ("a", &[]),
            ("b", &["a"]),
            ("c", &["b"]),
            ("other", &[]),
        ]);
        let oracle = StalenessOracle::default();
        let executor = RecordingExecutor::failing(&["a"]);
        let reporter = CollectingReporter::new();

        let result = Scheduler::new(&t.dag, &oracle, &executor)
            .with_reporter(&reporter)
            .run();

        match result {
            Err(BuildError::CompileFailed { packages }) => assert_eq!(packages, vec!["a"]),
            other => panic!("expected CompileFailed, got {other:?}"),
        }
        assert_eq!(executor.compiled(), vec!["a", "other"]);

        let skipped: Vec<_> = reporter
            .events()
            .into_iter()
            .filter(|e| matches!(e, BuildEvent::Skipped { .. }))
            .collect();
        assert_eq!(skipped.len(), 2);
    }

    #[test]
    fn test_missing_source_fails_the_batch() {
        let t = chain();
        fs::remove_file(t.dir.path().join("a.go")).unwrap();
        fs::write(t.dir.path().join("a.o"), "").unwrap();

        let oracle = StalenessOracle::default();
        let executor = RecordingExecutor::default();
        let result = Scheduler::new(&t.dag, &oracle, &executor).run();

        assert!(matches!(result, Err(BuildError::CompileFailed { .. })));
        assert!(executor.compiled().is_empty());
    }

    #[test]
    fn test_subset_ignores_unselected_dependencies() {
        let t = chain();
        let oracle = StalenessOracle::default();
        let executor = RecordingExecutor::default();
        let c = t.dag.id_of("c").unwrap();

        let report = Scheduler::new(&t.dag, &oracle, &executor)
            .run_packages(&[c])
            .unwrap();
        assert_eq!(report.compiled, vec!["c"]);
    }

    #[test]
    fn test_gate_opens_after_last_release() {
        let gate = Arc::new(Gate::new(2));
        let waiter = {
            let gate = Arc::clone(&gate);
            thread::spawn(move || gate.wait())
        };
        gate.release(false, false);
        gate.release(true, false);

        let admission = waiter.join().unwrap();
        assert!(admission.needs_compile);
        assert!(!admission.blocked);
    }

    #[test]
    fn test_empty_graph() {
        let dag = Dag::new();
        let oracle = StalenessOracle::default();
        let report = Scheduler::new(&dag, &oracle, &RecordingExecutor::default())
            .run()
            .unwrap();
        assert_eq!(report, CompileReport::default());
    }
}
