//! keel configuration
//!
//! Settings come from `keel.toml` files and the environment.
//!
//! # Configuration Hierarchy
//!
//! Layers are merged in the following order (later overrides earlier):
//! 1. Global config (`$XDG_CONFIG_HOME/keel/config.toml`, then `~/.keel.toml`)
//! 2. Project config (`keel.toml`, found by walking up from the working directory)
//! 3. Environment variables (`KEEL_*`)
//! 4. CLI flags (applied by the caller)
//!
//! # Example
//!
//! ```no_run
//! use keel_config::ConfigLoader;
//! use std::path::Path;
//!
//! let config = ConfigLoader::new().load_from_directory(Path::new(".")).unwrap();
//! println!("sources under {}", config.settings.src().display());
//! ```

pub mod loader;
pub mod settings;

use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax in {file}: {error}")]
    TomlParseError {
        file: PathBuf,
        error: toml::de::Error,
    },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

// Re-export main types
pub use loader::{Config, ConfigLoader, PROJECT_FILE};
pub use settings::{
    BackendSection, BuildSection, ConventionsSection, KeelConfig, TestSection, NAMING_POLICIES,
};
