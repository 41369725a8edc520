//! Source naming conventions shared by discovery, staleness and testing
use std::path::Path;

/// File and unit naming conventions for a source tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conventions {
    /// Source file extension, without the dot
    pub extension: String,
    /// Suffix marking test files (before the extension) and test units
    pub test_suffix: String,
}

impl Default for Conventions {
    fn default() -> Self {
        Self {
            extension: "go".to_string(),
            test_suffix: "_test".to_string(),
        }
    }
}

impl Conventions {
    pub fn new(extension: impl Into<String>, test_suffix: impl Into<String>) -> Self {
        Self {
            extension: extension.into(),
            test_suffix: test_suffix.into(),
        }
    }

    /// Whether the path has the source extension
    pub fn is_source(&self, path: &Path) -> bool {
        path.extension().and_then(|e| e.to_str()) == Some(self.extension.as_str())
    }

    /// Whether the path is a test file, e.g. `parser_test.go`
    pub fn is_test_file(&self, path: &Path) -> bool {
        self.is_source(path)
            && path
                .file_stem()
                .and_then(|s| s.to_str())
                .is_some_and(|stem| stem.ends_with(&self.test_suffix))
    }

    /// Whether a declared unit name is reserved for external tests
    pub fn is_test_unit(&self, short_name: &str) -> bool {
        short_name.ends_with(&self.test_suffix)
    }

    /// File name used for a synthesized entry point
    pub fn entry_file_name(&self) -> String {
        format!("_main.{}", self.extension)
    }
}
