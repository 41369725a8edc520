use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

mod commands;
mod logging;
mod reporter;

/// Build tool that infers build order from the sources themselves.
///
/// keel scans a source tree, reads each unit's declared name and imports,
/// and compiles packages in dependency order, skipping what is already up
/// to date. No build scripts are needed.
///
/// EXAMPLES:
///     keel build                   Compile src/ and link a.out
///     keel build . --all           Link every main package into bin/
///     keel test --match Parse      Build and run matching tests
///     keel sort                    Print packages in build order
///     keel dot deps.dot            Write the dependency graph
///
/// ENVIRONMENT VARIABLES:
///     KEEL_LOG                Log filter (e.g. debug, keel_build=trace)
///     KEEL_BACKEND_COMPILER   Compiler program
///     KEEL_BACKEND_LINKER     Linker program
///     KEEL_LIB_DIR            Directory receiving compiled objects
///     KEEL_QUIET              Set to '1' to silence progress output
#[derive(Parser)]
#[command(name = "keel")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Flags accepted by every command
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Only print errors
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Print debug logs on stderr
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Use this file instead of searching for keel.toml
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile every package and link the main package
    ///
    /// Packages are compiled concurrently as soon as their imports are
    /// built. Packages whose objects are newer than their sources are
    /// skipped.
    ///
    /// EXAMPLES:
    ///     keel build                   Build src/ into a.out
    ///     keel build . -o app          Build the current directory
    ///     keel build --main server     Pick a main package by regex
    ///     keel build --dry-run         Print commands without running them
    #[command(visible_alias = "b")]
    Build(commands::build::BuildArgs),

    /// Build the tests, generate an entry point and run it
    ///
    /// Functions named TestX, BenchmarkX and ExampleX in test files are
    /// wired into a generated main package.
    ///
    /// EXAMPLES:
    ///     keel test                    Run every test
    ///     keel test --match Parse --test-verbose   Verbose matching tests
    ///     keel test --bench .          Also run benchmarks
    #[command(visible_alias = "t")]
    Test(commands::test::TestArgs),

    /// Print packages in build order
    Sort(commands::SourceArgs),

    /// Print packages with their files and imports
    Print(commands::print::PrintArgs),

    /// Write the dependency graph in Graphviz format
    ///
    /// EXAMPLES:
    ///     keel dot deps.dot && dot -Tpng deps.dot > deps.png
    Dot(commands::dot::DotArgs),

    /// Remove compiled objects
    Clean(commands::clean::CleanArgs),

    /// List imports that are not part of the source tree
    Alien(commands::alien::AlienArgs),
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.global.verbose);

    if let Err(err) = run(cli) {
        eprintln!("{} {:#}", "error:".red().bold(), err);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let global = cli.global;
    match cli.command {
        Commands::Build(args) => commands::build::run(&global, args),
        Commands::Test(args) => commands::test::run(&global, args),
        Commands::Sort(args) => commands::sort::run(&global, args),
        Commands::Print(args) => commands::print::run(&global, args),
        Commands::Dot(args) => commands::dot::run(&global, args),
        Commands::Clean(args) => commands::clean::run(&global, args),
        Commands::Alien(args) => commands::alien::run(&global, args),
    }
}
