//! Alien command - imports that no package in the tree provides

use super::{Session, SourceArgs};
use crate::GlobalArgs;
use anyhow::Result;
use clap::Args;
use keel_build::BuildMode;

#[derive(Args, Debug, Default)]
pub struct AlienArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Only list imports that look like remote repositories (host.tld/...)
    #[arg(long)]
    pub remote: bool,
}

pub fn run(global: &GlobalArgs, args: AlienArgs) -> Result<()> {
    let session = Session::load(global, &args.source)?;
    // Test files count: their imports are needed to run the tests
    let dag = session.discover(BuildMode::Test)?;
    let imports = if args.remote {
        dag.remote_imports()
    } else {
        dag.alien()
    };
    for import in imports {
        println!("{import}");
    }
    Ok(())
}
