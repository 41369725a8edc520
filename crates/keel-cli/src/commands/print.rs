//! Print command - show what the scanner found

use super::{display_path, Session, SourceArgs};
use crate::GlobalArgs;
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use keel_build::{BuildMode, PackageInfo};
use std::path::Path;

#[derive(Args, Debug, Default)]
pub struct PrintArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(global: &GlobalArgs, args: PrintArgs) -> Result<()> {
    let session = Session::load(global, &args.source)?;
    let dag = session.discover(BuildMode::Build)?;
    let info = dag.info();

    if args.json {
        let json = serde_json::to_string_pretty(&info).context("Failed to serialize packages")?;
        println!("{json}");
    } else {
        print!("{}", render(&info, &session.src_root));
    }
    Ok(())
}

fn render(info: &[PackageInfo], src_root: &Path) -> String {
    let mut out = String::new();
    for package in info {
        out.push_str(&format!("{}\n", package.name.bold()));
        for file in &package.files {
            out.push_str(&format!("  file: {}\n", display_path(file, src_root)));
        }
        for import in &package.dependencies {
            out.push_str(&format!("  import: {import}\n"));
        }
    }
    out
}
