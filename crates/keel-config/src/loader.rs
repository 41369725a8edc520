//! Configuration Loader
//!
//! Handles loading and merging configuration from multiple sources with proper precedence.

use crate::settings::{BackendSection, BuildSection, KeelConfig};
use crate::ConfigResult;
use std::env;
use std::path::{Path, PathBuf};

/// Project configuration file name
pub const PROJECT_FILE: &str = "keel.toml";

/// Merged configuration result
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Effective settings after every layer
    pub settings: KeelConfig,

    /// Directory where keel.toml was found
    pub project_root: Option<PathBuf>,

    /// Files that contributed, lowest priority first
    pub sources: Vec<PathBuf>,
}

impl Config {
    /// Get the project root directory
    pub fn project_root(&self) -> Option<&Path> {
        self.project_root.as_deref()
    }

    /// Check if a keel.toml was found
    pub fn is_project(&self) -> bool {
        self.project_root.is_some()
    }
}

/// Configuration loader
///
/// Loads configuration from multiple sources and merges them with proper precedence:
/// 1. Global configs (`$XDG_CONFIG_HOME/keel/config.toml`, `~/.keel.toml`) - lowest priority
/// 2. Project config (`keel.toml`) - overrides global
/// 3. Environment variables (`KEEL_*`) - overrides project
/// 4. CLI flags - highest priority (handled by caller)
pub struct ConfigLoader {
    global_paths: Vec<PathBuf>,
}

impl ConfigLoader {
    /// Create a loader reading the user's global config files
    pub fn new() -> Self {
        Self {
            global_paths: Self::default_global_paths(),
        }
    }

    /// Create a loader with explicit global config files
    pub fn with_global_paths(global_paths: Vec<PathBuf>) -> Self {
        Self { global_paths }
    }

    /// Global config locations, lowest priority first
    pub fn default_global_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("keel").join("config.toml"));
        }
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".keel.toml"));
        }
        paths
    }

    /// Load configuration starting from the given directory
    ///
    /// Walks up the directory tree to find keel.toml, merging it over the
    /// global configs and under the environment.
    pub fn load_from_directory(&self, start_dir: &Path) -> ConfigResult<Config> {
        let project_file = find_project_file(start_dir);
        self.load(project_file)
    }

    /// Load configuration with a specific project config file
    pub fn load_from_file(&self, config_path: &Path) -> ConfigResult<Config> {
        self.load(Some(config_path.to_path_buf()))
    }

    fn load(&self, project_file: Option<PathBuf>) -> ConfigResult<Config> {
        let mut config = Config::default();

        // Global configs are optional
        for path in &self.global_paths {
            if path.is_file() {
                config.settings = config.settings.merge(KeelConfig::load_from_file(path)?);
                config.sources.push(path.clone());
            }
        }

        if let Some(path) = project_file {
            config.settings = config.settings.merge(KeelConfig::load_from_file(&path)?);
            config.project_root = path.parent().map(Path::to_path_buf);
            config.sources.push(path);
        }

        config.settings = config.settings.merge(env_overrides());
        config.settings.validate()?;
        Ok(config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Find keel.toml in `start_dir` or the nearest ancestor
fn find_project_file(start_dir: &Path) -> Option<PathBuf> {
    start_dir
        .ancestors()
        .map(|dir| dir.join(PROJECT_FILE))
        .find(|path| path.is_file())
}

/// Environment layer
///
/// `KEEL_BACKEND_COMPILER`, `KEEL_BACKEND_LINKER`, `KEEL_LIB_DIR` and
/// `KEEL_QUIET` (`true`, `1` or `yes`).
fn env_overrides() -> KeelConfig {
    let backend = BackendSection {
        compiler: env::var("KEEL_BACKEND_COMPILER").ok(),
        linker: env::var("KEEL_BACKEND_LINKER").ok(),
        ..BackendSection::default()
    };
    let build = BuildSection {
        lib: env::var_os("KEEL_LIB_DIR").map(PathBuf::from),
        quiet: env::var("KEEL_QUIET")
            .ok()
            .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes")),
        ..BuildSection::default()
    };

    KeelConfig {
        build: Some(build),
        backend: Some(backend),
        ..KeelConfig::default()
    }
}
