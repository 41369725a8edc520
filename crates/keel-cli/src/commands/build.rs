//! Build command - compile packages in dependency order and link

use super::{display_path, executor, ObjectArgs, Session, SourceArgs};
use crate::GlobalArgs;
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use keel_build::BuildOutcome;
use std::path::PathBuf;

/// Build command arguments
#[derive(Args, Debug, Default)]
pub struct BuildArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Executable to write [default: a.out]
    #[arg(long, short = 'o', value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Link every nested main package into bin/
    #[arg(long, short = 'a', conflicts_with = "output")]
    pub all: bool,

    #[command(flatten)]
    pub objects: ObjectArgs,

    /// Regex selecting the main package when there are several
    #[arg(long, short = 'm', value_name = "REGEX")]
    pub main: Option<String>,

    /// Print commands instead of running them
    #[arg(long)]
    pub dry_run: bool,

    /// Print a JSON summary instead of progress lines
    #[arg(long)]
    pub json: bool,
}

/// Run the build command
pub fn run(global: &GlobalArgs, args: BuildArgs) -> Result<()> {
    let session = Session::load(global, &args.source)?;

    let mut config = session.build_config(&args.objects);
    if let Some(output) = &args.output {
        config.output = session.cwd.join(output);
    }
    if args.main.is_some() {
        config.main_pattern = args.main.clone();
    }
    config.require_link = args.output.is_some() || config.main_pattern.is_some();
    config.link_all = args.all;
    config.dry_run = args.dry_run;

    let quiet = session.quiet || args.json;
    let reporter = crate::reporter::ConsoleReporter::new(quiet);
    let executor = executor(args.dry_run);
    let outcome = session
        .builder(config, executor.as_ref(), &reporter)?
        .build()
        .context("Build failed")?;

    if args.json {
        println!("{}", summary_json(&outcome));
    } else if !quiet {
        let linked: Vec<String> = outcome
            .linked
            .iter()
            .map(|path| display_path(path, &session.cwd))
            .collect();
        let target = if linked.is_empty() {
            String::new()
        } else {
            format!(" -> {}", linked.join(", "))
        };
        println!(
            "{} {} compiled, {} up to date{target}",
            "Finished".green().bold(),
            outcome.report.compiled.len(),
            outcome.report.up_to_date.len(),
        );
    }
    Ok(())
}

fn summary_json(outcome: &BuildOutcome) -> serde_json::Value {
    serde_json::json!({
        "compiled": outcome.report.compiled,
        "up_to_date": outcome.report.up_to_date,
        "rebuilt": outcome.report.any_rebuilt,
        "linked": outcome.linked,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_build::CompileReport;

    #[test]
    fn test_summary_json() {
        let outcome = BuildOutcome {
            report: CompileReport {
                compiled: vec!["net".to_string()],
                up_to_date: vec!["util".to_string()],
                any_rebuilt: true,
            },
            linked: vec![PathBuf::from("a.out")],
        };
        let json = summary_json(&outcome);
        assert_eq!(json["compiled"][0], "net");
        assert_eq!(json["up_to_date"][0], "util");
        assert_eq!(json["rebuilt"], true);
        assert_eq!(json["linked"][0], "a.out");
    }
}
