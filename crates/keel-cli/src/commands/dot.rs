//! Dot command - write the dependency graph for Graphviz

use super::{Session, SourceArgs};
use crate::GlobalArgs;
use anyhow::{Context, Result};
use clap::Args;
use keel_build::BuildMode;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct DotArgs {
    /// File to write; replaced if it exists
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    #[command(flatten)]
    pub source: SourceArgs,
}

pub fn run(global: &GlobalArgs, args: DotArgs) -> Result<()> {
    let session = Session::load(global, &args.source)?;
    let dag = session.discover(BuildMode::Build)?;
    let file = session.cwd.join(&args.file);
    dag.write_dot(&file)
        .with_context(|| format!("Failed to write {}", file.display()))?;
    if !session.quiet {
        println!("wrote {}", args.file.display());
    }
    Ok(())
}
