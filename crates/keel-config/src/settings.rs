//! keel.toml settings
//!
//! Every field is optional so layers can be merged field by field; the
//! accessors on [`KeelConfig`] supply defaults for whatever no layer set.

use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Accepted values of `conventions.naming`
pub const NAMING_POLICIES: &[&str] = &["directory", "declared"];

/// One configuration layer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct KeelConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build: Option<BuildSection>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend: Option<BackendSection>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub test: Option<TestSection>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub conventions: Option<ConventionsSection>,
}

/// `[build]`: where sources and objects live
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct BuildSection {
    /// Source root (default: `src`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src: Option<PathBuf>,

    /// Object directory (default: next to the sources)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lib: Option<PathBuf>,

    /// Extra compiler and linker search directories
    #[serde(skip_serializing_if = "Option::is_none")]
    pub includes: Option<Vec<PathBuf>>,

    /// Suppress progress output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quiet: Option<bool>,

    /// Regex choosing the main package when there are several
    #[serde(skip_serializing_if = "Option::is_none")]
    pub main: Option<String>,
}

/// `[backend]`: the toolchain
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct BackendSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compiler: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub linker: Option<String>,

    /// Object file suffix, dot included
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_suffix: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub compile_flags: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_flags: Option<Vec<String>>,

    #[serde(rename = "static", skip_serializing_if = "Option::is_none")]
    pub static_link: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub strip: Option<bool>,
}

/// `[test]`: the generated test binary
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct TestSection {
    /// Where the test binary is written (default: `keel-test`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub binary: Option<PathBuf>,

    /// Pattern selecting tests to run
    #[serde(rename = "match", skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,

    /// Pattern selecting benchmarks to run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bench: Option<String>,
}

/// `[conventions]`: source layout rules
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ConventionsSection {
    /// Source file extension without the dot (default: `go`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,

    /// Test file and unit suffix (default: `_test`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_suffix: Option<String>,

    /// Package naming policy, one of [`NAMING_POLICIES`]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub naming: Option<String>,
}

/// Field-wise overlay of one layer onto another
trait Merge {
    fn merge(self, over: Self) -> Self;
}

fn merge_section<T: Merge>(base: Option<T>, over: Option<T>) -> Option<T> {
    match (base, over) {
        (Some(base), Some(over)) => Some(base.merge(over)),
        (base, over) => over.or(base),
    }
}

impl Merge for BuildSection {
    fn merge(self, over: Self) -> Self {
        Self {
            src: over.src.or(self.src),
            lib: over.lib.or(self.lib),
            includes: over.includes.or(self.includes),
            quiet: over.quiet.or(self.quiet),
            main: over.main.or(self.main),
        }
    }
}

impl Merge for BackendSection {
    fn merge(self, over: Self) -> Self {
        Self {
            compiler: over.compiler.or(self.compiler),
            linker: over.linker.or(self.linker),
            object_suffix: over.object_suffix.or(self.object_suffix),
            compile_flags: over.compile_flags.or(self.compile_flags),
            link_flags: over.link_flags.or(self.link_flags),
            static_link: over.static_link.or(self.static_link),
            strip: over.strip.or(self.strip),
        }
    }
}

impl Merge for TestSection {
    fn merge(self, over: Self) -> Self {
        Self {
            binary: over.binary.or(self.binary),
            filter: over.filter.or(self.filter),
            bench: over.bench.or(self.bench),
        }
    }
}

impl Merge for ConventionsSection {
    fn merge(self, over: Self) -> Self {
        Self {
            extension: over.extension.or(self.extension),
            test_suffix: over.test_suffix.or(self.test_suffix),
            naming: over.naming.or(self.naming),
        }
    }
}

impl KeelConfig {
    /// Parse a layer from TOML text
    pub fn parse(content: &str, file: &Path) -> ConfigResult<Self> {
        toml::from_str(content).map_err(|error| ConfigError::TomlParseError {
            file: file.to_path_buf(),
            error,
        })
    }

    /// Load and validate a layer from a file.
    ///
    /// Relative paths inside the file are taken relative to the file's
    /// directory.
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::IoError(e)
            }
        })?;

        let mut config = Self::parse(&content, path)?;
        if let Some(base) = path.parent() {
            config.anchor_paths(base);
        }
        config.validate()?;
        Ok(config)
    }

    /// Overlay `over` onto this layer; fields set in `over` win
    pub fn merge(self, over: Self) -> Self {
        Self {
            build: merge_section(self.build, over.build),
            backend: merge_section(self.backend, over.backend),
            test: merge_section(self.test, over.test),
            conventions: merge_section(self.conventions, over.conventions),
        }
    }

    /// Reject values no build could work with
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(backend) = &self.backend {
            for (field, value) in [
                ("backend.compiler", &backend.compiler),
                ("backend.linker", &backend.linker),
            ] {
                if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                    return Err(invalid(field, "program name cannot be empty"));
                }
            }
        }

        if let Some(conventions) = &self.conventions {
            if let Some(naming) = &conventions.naming {
                if !NAMING_POLICIES.contains(&naming.as_str()) {
                    return Err(invalid(
                        "conventions.naming",
                        format!(
                            "unknown policy '{naming}', expected one of: {}",
                            NAMING_POLICIES.join(", ")
                        ),
                    ));
                }
            }
            if conventions.extension.as_deref() == Some("") {
                return Err(invalid("conventions.extension", "extension cannot be empty"));
            }
        }

        Ok(())
    }

    /// Resolve relative paths against `base`
    fn anchor_paths(&mut self, base: &Path) {
        let anchor = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        if let Some(build) = self.build.as_mut() {
            build
                .src
                .iter_mut()
                .chain(build.lib.iter_mut())
                .chain(build.includes.iter_mut().flatten())
                .for_each(anchor);
        }
        if let Some(test) = self.test.as_mut() {
            test.binary.iter_mut().for_each(anchor);
        }
    }

    fn build(&self) -> BuildSection {
        self.build.clone().unwrap_or_default()
    }

    fn backend(&self) -> BackendSection {
        self.backend.clone().unwrap_or_default()
    }

    fn conventions(&self) -> ConventionsSection {
        self.conventions.clone().unwrap_or_default()
    }

    /// Source root
    pub fn src(&self) -> PathBuf {
        self.build().src.unwrap_or_else(|| PathBuf::from("src"))
    }

    pub fn lib(&self) -> Option<PathBuf> {
        self.build().lib
    }

    pub fn includes(&self) -> Vec<PathBuf> {
        self.build().includes.unwrap_or_default()
    }

    pub fn quiet(&self) -> bool {
        self.build().quiet.unwrap_or(false)
    }

    pub fn main_pattern(&self) -> Option<String> {
        self.build().main
    }

    pub fn compiler(&self) -> String {
        self.backend().compiler.unwrap_or_else(|| "6g".to_string())
    }

    pub fn linker(&self) -> String {
        self.backend().linker.unwrap_or_else(|| "6l".to_string())
    }

    pub fn object_suffix(&self) -> String {
        self.backend().object_suffix.unwrap_or_else(|| ".6".to_string())
    }

    pub fn compile_flags(&self) -> Vec<String> {
        self.backend().compile_flags.unwrap_or_default()
    }

    pub fn link_flags(&self) -> Vec<String> {
        self.backend().link_flags.unwrap_or_default()
    }

    pub fn static_link(&self) -> bool {
        self.backend().static_link.unwrap_or(false)
    }

    pub fn strip(&self) -> bool {
        self.backend().strip.unwrap_or(false)
    }

    pub fn test_binary(&self) -> PathBuf {
        self.test
            .as_ref()
            .and_then(|t| t.binary.clone())
            .unwrap_or_else(|| PathBuf::from("keel-test"))
    }

    pub fn test_filter(&self) -> Option<String> {
        self.test.as_ref().and_then(|t| t.filter.clone())
    }

    pub fn test_bench(&self) -> Option<String> {
        self.test.as_ref().and_then(|t| t.bench.clone())
    }

    pub fn extension(&self) -> String {
        self.conventions().extension.unwrap_or_else(|| "go".to_string())
    }

    pub fn test_suffix(&self) -> String {
        self.conventions()
            .test_suffix
            .unwrap_or_else(|| "_test".to_string())
    }

    pub fn naming(&self) -> String {
        self.conventions()
            .naming
            .unwrap_or_else(|| "directory".to_string())
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn parse(content: &str) -> ConfigResult<KeelConfig> {
        KeelConfig::parse(content, Path::new("keel.toml"))
    }

    #[test]
    fn test_defaults() {
        let config = KeelConfig::default();
        assert_eq!(config.src(), PathBuf::from("src"));
        assert_eq!(config.lib(), None);
        assert_eq!(config.compiler(), "6g");
        assert_eq!(config.object_suffix(), ".6");
        assert_eq!(config.extension(), "go");
        assert_eq!(config.naming(), "directory");
        assert!(!config.quiet());
    }

    #[test]
    fn test_parse_all_sections() {
        let config = parse(
            r#"
[build]
src = "source"
includes = ["vendor"]
main = "server"

[backend]
compiler = "cc"
static = true
compile_flags = ["-O2"]

[test]
match = "Parse"

[conventions]
extension = "kl"
naming = "declared"
"#,
        )
        .unwrap();

        assert_eq!(config.src(), PathBuf::from("source"));
        assert_eq!(config.includes(), vec![PathBuf::from("vendor")]);
        assert_eq!(config.main_pattern().as_deref(), Some("server"));
        assert_eq!(config.compiler(), "cc");
        assert_eq!(config.linker(), "6l");
        assert!(config.static_link());
        assert_eq!(config.compile_flags(), vec!["-O2"]);
        assert_eq!(config.test_filter().as_deref(), Some("Parse"));
        assert_eq!(config.extension(), "kl");
        assert_eq!(config.naming(), "declared");
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(matches!(
            parse("[build]\nsrcdir = \"x\"\n"),
            Err(ConfigError::TomlParseError { .. })
        ));
    }

    #[test]
    fn test_merge_is_field_wise() {
        let base = parse("[backend]\ncompiler = \"cc\"\nlinker = \"ld\"\n").unwrap();
        let over = parse("[backend]\nlinker = \"gold\"\n[build]\nquiet = true\n").unwrap();

        let merged = base.merge(over);
        assert_eq!(merged.compiler(), "cc");
        assert_eq!(merged.linker(), "gold");
        assert!(merged.quiet());
    }

    #[rstest]
    #[case("[backend]\ncompiler = \"\"\n", "backend.compiler")]
    #[case("[backend]\nlinker = \"  \"\n", "backend.linker")]
    #[case("[conventions]\nnaming = \"flat\"\n", "conventions.naming")]
    #[case("[conventions]\nextension = \"\"\n", "conventions.extension")]
    fn test_validation_errors(#[case] content: &str, #[case] expected_field: &str) {
        match parse(content).unwrap().validate() {
            Err(ConfigError::InvalidValue { field, .. }) => assert_eq!(field, expected_field),
            other => panic!("expected InvalidValue, got {other:?}"),
        }
    }

    #[test]
    fn test_paths_anchored_to_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("keel.toml");
        std::fs::write(
            &path,
            "[build]\nsrc = \"code\"\nlib = \"/abs/lib\"\n[test]\nbinary = \"out/t\"\n",
        )
        .unwrap();

        let config = KeelConfig::load_from_file(&path).unwrap();
        assert_eq!(config.src(), dir.path().join("code"));
        assert_eq!(config.lib(), Some(PathBuf::from("/abs/lib")));
        assert_eq!(config.test_binary(), dir.path().join("out/t"));
    }
}
