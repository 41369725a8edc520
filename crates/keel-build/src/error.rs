/// Build system error types
use std::path::PathBuf;
use thiserror::Error;

pub type BuildResult<T> = Result<T, BuildError>;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Loop in dependency graph: {cycle}")]
    CycleDetected { cycle: String },

    #[error("Missing source file for package '{package}': {path}")]
    MissingSource { package: String, path: PathBuf },

    #[error("No compile command assigned to package '{package}'")]
    MissingCommand { package: String },

    #[error("Command for '{package}' exited with {status}: {command}")]
    CommandFailed {
        package: String,
        command: String,
        status: String,
    },

    #[error("Failed to start '{program}': {error}")]
    Spawn {
        program: String,
        error: std::io::Error,
    },

    #[error("Compilation failed for: {}", packages.join(", "))]
    CompileFailed { packages: Vec<String> },

    #[error("No main package found")]
    NoMainPackage,

    #[error("More than one main package found ({}), select one with --main", candidates.join(", "))]
    AmbiguousMain { candidates: Vec<String> },

    #[error("No source files found under {0}")]
    NoSourceFiles(PathBuf),

    #[error("Invalid pattern '{pattern}': {error}")]
    InvalidPattern { pattern: String, error: regex::Error },

    #[error("I/O error at {path}: {error}")]
    IoError {
        path: PathBuf,
        error: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BuildError {
    /// Create an I/O error with path context
    pub fn io(path: impl Into<PathBuf>, error: std::io::Error) -> Self {
        Self::IoError {
            path: path.into(),
            error,
        }
    }

    /// Create a parse error
    pub fn parse(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Create a missing source error
    pub fn missing_source(package: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::MissingSource {
            package: package.into(),
            path: path.into(),
        }
    }

    /// Create a missing command error
    pub fn missing_command(package: impl Into<String>) -> Self {
        Self::MissingCommand {
            package: package.into(),
        }
    }

    /// Create an invalid pattern error
    pub fn invalid_pattern(pattern: impl Into<String>, error: regex::Error) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            error,
        }
    }
}
