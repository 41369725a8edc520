//! Staleness checks against compiled artifacts
//!
//! Artifact timestamps are the only incremental-build state: a package is up
//! to date when its declared output exists and no source file is newer.

use crate::conventions::Conventions;
use crate::error::{BuildError, BuildResult};
use crate::package::Package;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::time::SystemTime;

/// Whether the build compiles production artifacts or test builds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BuildMode {
    #[default]
    Build,
    Test,
}

/// Decides whether a package must be rebuilt
#[derive(Debug, Clone, Default)]
pub struct StalenessOracle {
    mode: BuildMode,
    conventions: Conventions,
}

impl StalenessOracle {
    pub fn new(mode: BuildMode, conventions: Conventions) -> Self {
        Self { mode, conventions }
    }

    pub fn mode(&self) -> BuildMode {
        self.mode
    }

    /// Check a package against its declared artifact.
    ///
    /// A missing artifact makes the package stale; a missing source file is
    /// an error since the artifact can no longer be verified. In test mode a
    /// package mixing test and non-test files is always stale, so test
    /// builds never reuse production artifacts.
    pub fn is_up_to_date(&self, package: &Package) -> BuildResult<bool> {
        let command = package
            .command
            .as_ref()
            .ok_or_else(|| BuildError::missing_command(&package.name))?;

        let compiled = match modified(&command.output) {
            Ok(time) => time,
            Err(_) => return Ok(false),
        };

        for file in &package.files {
            let source = modified(file).map_err(|e| {
                if e.kind() == ErrorKind::NotFound {
                    BuildError::missing_source(&package.name, file)
                } else {
                    BuildError::io(file, e)
                }
            })?;
            if source > compiled {
                tracing::debug!(package = %package.name, file = %file.display(), "source newer than artifact");
                return Ok(false);
            }
        }

        if self.mode == BuildMode::Test && package.has_mixed_test_files(&self.conventions) {
            return Ok(false);
        }

        Ok(true)
    }
}

fn modified(path: &Path) -> std::io::Result<SystemTime> {
    fs::metadata(path)?.modified()
}
