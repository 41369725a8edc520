//! Subcommands and the settings they share
//!
//! Every command resolves the same way: configuration layers from
//! keel-config, then command line flags on top.

pub mod alien;
pub mod build;
pub mod clean;
pub mod dot;
pub mod print;
pub mod sort;
pub mod test;

use crate::reporter::ConsoleReporter;
use crate::GlobalArgs;
use anyhow::{anyhow, bail, Context, Result};
use clap::Args;
use keel_build::{
    policy_by_name, Backend, BuildConfig, BuildMode, Builder, CompileExecutor, Conventions, Dag,
    DryRunExecutor, ProcessExecutor,
};
use keel_config::{Config, ConfigLoader, KeelConfig};
use std::env;
use std::path::{Path, PathBuf};

/// Source tree argument shared by every command
#[derive(Args, Debug, Clone, Default)]
pub struct SourceArgs {
    /// Source root, `.` for the current directory [default: src]
    #[arg(value_name = "SRC")]
    pub src: Option<PathBuf>,
}

/// Object placement flags shared by build and test
#[derive(Args, Debug, Clone, Default)]
pub struct ObjectArgs {
    /// Put compiled objects in this directory
    #[arg(long, value_name = "DIR")]
    pub lib: Option<PathBuf>,

    /// Extra search directory for compiler and linker (repeatable)
    #[arg(short = 'I', value_name = "DIR")]
    pub include: Vec<PathBuf>,
}

/// Settings resolved for one command invocation
pub struct Session {
    pub config: Config,
    pub cwd: PathBuf,
    pub src_root: PathBuf,
    pub quiet: bool,
}

impl Session {
    /// Load configuration and resolve the source root
    pub fn load(global: &GlobalArgs, source: &SourceArgs) -> Result<Self> {
        let cwd = env::current_dir().context("Failed to read current directory")?;
        let loader = ConfigLoader::new();
        let config = match &global.config {
            Some(path) => loader
                .load_from_file(&cwd.join(path))
                .with_context(|| format!("Failed to load {}", path.display()))?,
            None => loader
                .load_from_directory(&cwd)
                .context("Failed to load configuration")?,
        };
        tracing::debug!(sources = ?config.sources, "configuration loaded");

        let src_root = resolve_src(&cwd, source.src.as_deref(), &config.settings)?;
        let quiet = global.quiet || config.settings.quiet();
        Ok(Self {
            config,
            cwd,
            src_root,
            quiet,
        })
    }

    pub fn settings(&self) -> &KeelConfig {
        &self.config.settings
    }

    /// Console reporter honoring quiet mode
    pub fn reporter(&self) -> ConsoleReporter {
        ConsoleReporter::new(self.quiet)
    }

    /// Backend from configuration with command line object flags applied
    pub fn backend(&self, objects: &ObjectArgs) -> Backend {
        let settings = self.settings();
        let mut includes = settings.includes();
        includes.extend(objects.include.iter().map(|dir| self.cwd.join(dir)));

        Backend {
            compiler: settings.compiler(),
            linker: settings.linker(),
            object_suffix: settings.object_suffix(),
            compile_flags: settings.compile_flags(),
            link_flags: settings.link_flags(),
            lib_dir: objects
                .lib
                .as_ref()
                .map(|dir| self.cwd.join(dir))
                .or_else(|| settings.lib()),
            includes,
            static_link: settings.static_link(),
            strip: settings.strip(),
        }
    }

    pub fn conventions(&self) -> Conventions {
        Conventions::new(self.settings().extension(), self.settings().test_suffix())
    }

    /// Build configuration before command specific flags
    pub fn build_config(&self, objects: &ObjectArgs) -> BuildConfig {
        BuildConfig {
            src_root: self.src_root.clone(),
            backend: self.backend(objects),
            conventions: self.conventions(),
            output: self.cwd.join("a.out"),
            main_pattern: self.settings().main_pattern(),
            bin_dir: self.cwd.join("bin"),
            ..BuildConfig::default()
        }
    }

    /// Builder using the configured naming policy
    pub fn builder<'a>(
        &self,
        config: BuildConfig,
        executor: &'a dyn CompileExecutor,
        reporter: &'a ConsoleReporter,
    ) -> Result<Builder<'a>> {
        let naming = self.settings().naming();
        let policy =
            policy_by_name(&naming).ok_or_else(|| anyhow!("Unknown naming policy '{naming}'"))?;
        Ok(Builder::new(config, executor)
            .with_naming(policy)
            .with_reporter(reporter))
    }

    /// Scan the source tree without compiling anything
    pub fn discover(&self, mode: BuildMode) -> Result<Dag> {
        let reporter = self.reporter();
        let config = self.build_config(&ObjectArgs::default());
        let dag = self
            .builder(config, &DryRunExecutor, &reporter)?
            .discover(mode)
            .with_context(|| format!("Failed to scan {}", self.src_root.display()))?;
        Ok(dag)
    }
}

/// Executor running commands, or printing them in dry-run mode
pub fn executor(dry_run: bool) -> Box<dyn CompileExecutor> {
    if dry_run {
        Box::new(DryRunExecutor)
    } else {
        Box::new(ProcessExecutor)
    }
}

/// Source root from the argument, else from configuration.
///
/// `.` is the working directory; relative paths are taken from it.
fn resolve_src(cwd: &Path, arg: Option<&Path>, settings: &KeelConfig) -> Result<PathBuf> {
    let root = match arg {
        Some(path) if path == Path::new(".") => cwd.to_path_buf(),
        Some(path) => cwd.join(path),
        None => cwd.join(settings.src()),
    };
    if !root.is_dir() {
        bail!("Source directory {} does not exist", root.display());
    }
    Ok(root)
}

/// Path shown relative to `base` when possible
pub fn display_path(path: &Path, base: &Path) -> String {
    path.strip_prefix(base)
        .unwrap_or(path)
        .display()
        .to_string()
}
