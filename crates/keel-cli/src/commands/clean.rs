//! Clean command - remove compiled objects

use super::{executor, ObjectArgs, Session, SourceArgs};
use crate::GlobalArgs;
use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug, Default)]
pub struct CleanArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Directory holding the objects, if not the source tree
    #[arg(long, value_name = "DIR")]
    pub lib: Option<PathBuf>,

    /// Show what would be removed
    #[arg(long)]
    pub dry_run: bool,
}

pub fn run(global: &GlobalArgs, args: CleanArgs) -> Result<()> {
    let session = Session::load(global, &args.source)?;
    let objects = ObjectArgs {
        lib: args.lib.clone(),
        ..ObjectArgs::default()
    };
    let mut config = session.build_config(&objects);
    config.dry_run = args.dry_run;

    let reporter = session.reporter();
    // Cleaning never runs the toolchain
    let executor = executor(true);
    let removed = session
        .builder(config, executor.as_ref(), &reporter)?
        .clean()
        .context("Clean failed")?;
    tracing::debug!(count = removed.len(), "objects removed");
    Ok(())
}
