//! keel build core
//!
//! Infers build order and incrementality from source alone:
//! - Source scanning and package discovery
//! - Dependency graph construction and topological ordering
//! - Timestamp-based staleness checks
//! - Concurrent, dependency-respecting compilation
//! - Linking, test entry point synthesis and object cleanup

pub mod backend;
pub mod build_order;
pub mod builder;
pub mod clean;
pub mod conventions;
pub mod error;
pub mod executor;
pub mod graph;
pub mod harness;
pub mod link;
pub mod naming;
pub mod package;
pub mod report;
pub mod scanner;
pub mod scheduler;
pub mod staleness;
pub mod testrun;
pub mod walker;

// Re-export main types
pub use backend::Backend;
pub use builder::{BuildConfig, BuildOutcome, Builder, TestOutcome};
pub use clean::{Cleaner, KNOWN_OBJECT_SUFFIXES};
pub use conventions::Conventions;
pub use error::{BuildError, BuildResult};
pub use executor::{dry_run_line, CompileExecutor, DryRunExecutor, ProcessExecutor};
pub use graph::Dag;
pub use harness::{TestCollector, TestFunction, TestHarness, TestKind};
pub use link::{select_main, Linker};
pub use naming::{policy_by_name, DeclaredName, DirectoryConvention, NamingPolicy};
pub use package::{CompileCommand, Package, PackageId};
pub use report::{BuildEvent, CollectingReporter, NullReporter, PackageInfo, Reporter};
pub use scanner::{FunctionDecl, SourceScanner, UnitHeader, UnitParser};
pub use scheduler::{CompileReport, Scheduler};
pub use staleness::{BuildMode, StalenessOracle};
pub use testrun::TestOptions;
pub use walker::SourceWalker;
