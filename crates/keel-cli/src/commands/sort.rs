//! Sort command - print packages in the order they would be compiled

use super::{Session, SourceArgs};
use crate::GlobalArgs;
use anyhow::Result;
use keel_build::BuildMode;

pub fn run(global: &GlobalArgs, args: SourceArgs) -> Result<()> {
    let session = Session::load(global, &args)?;
    let dag = session.discover(BuildMode::Build)?;
    for name in dag.sorted_names()? {
        println!("{name}");
    }
    Ok(())
}
