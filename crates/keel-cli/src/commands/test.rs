//! Test command - build with test files, generate the entry point and run it

use super::{executor, ObjectArgs, Session, SourceArgs};
use crate::GlobalArgs;
use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use keel_build::TestOptions;
use std::path::PathBuf;

/// Test command arguments
#[derive(Args, Debug, Default)]
pub struct TestArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Run only tests matching this regex
    #[arg(long = "match", short = 'm', value_name = "REGEX")]
    pub filter: Option<String>,

    /// Run benchmarks matching this regex
    #[arg(long, value_name = "REGEX")]
    pub bench: Option<String>,

    /// Test executable to write [default: keel-test]
    #[arg(long, value_name = "FILE")]
    pub test_bin: Option<PathBuf>,

    #[command(flatten)]
    pub objects: ObjectArgs,

    /// Fail a test binary running longer than this (e.g. 10s)
    #[arg(long, value_name = "DURATION")]
    pub timeout: Option<String>,

    /// Run each benchmark for this long
    #[arg(long, value_name = "DURATION")]
    pub benchtime: Option<String>,

    /// Maximum number of tests run in parallel
    #[arg(long, value_name = "N")]
    pub parallel: Option<u32>,

    /// Comma separated CPU counts to run with
    #[arg(long, value_name = "LIST")]
    pub cpu: Option<String>,

    /// Ask the test binary for verbose output
    #[arg(long)]
    pub test_verbose: bool,

    /// Ask long-running tests to shorten themselves
    #[arg(long)]
    pub short: bool,

    /// Print commands instead of running them
    #[arg(long)]
    pub dry_run: bool,
}

impl TestArgs {
    /// Options for the test binary, flags over configuration
    fn options(&self, session: &Session) -> TestOptions {
        let settings = session.settings();
        let binary = self
            .test_bin
            .clone()
            .unwrap_or_else(|| settings.test_binary());

        TestOptions {
            binary: session.cwd.join(binary),
            filter: self.filter.clone().or_else(|| settings.test_filter()),
            bench: self.bench.clone().or_else(|| settings.test_bench()),
            timeout: self.timeout.clone(),
            benchtime: self.benchtime.clone(),
            parallel: self.parallel,
            cpu: self.cpu.clone(),
            verbose: self.test_verbose,
            short: self.short,
        }
    }
}

/// Run the test command
pub fn run(global: &GlobalArgs, args: TestArgs) -> Result<()> {
    let session = Session::load(global, &args.source)?;
    let options = args.options(&session);

    let mut config = session.build_config(&args.objects);
    config.dry_run = args.dry_run;

    let reporter = session.reporter();
    let executor = executor(args.dry_run);
    let outcome = session
        .builder(config, executor.as_ref(), &reporter)?
        .test(&options)
        .context("Test build failed")?;

    if outcome.collected == 0 {
        if !session.quiet {
            println!("{}", "no tests found".yellow());
        }
        return Ok(());
    }
    if !outcome.passed {
        bail!("Tests failed");
    }
    if outcome.ran && !session.quiet {
        println!("{}", "ok".green().bold());
    }
    Ok(())
}
