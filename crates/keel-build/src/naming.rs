//! Package naming policies
//!
//! A package's canonical name is derived from the directory holding the file
//! (relative to the source root) and the unit name declared inside it.

use std::path::{Component, Path};

/// Strategy deriving a canonical package name
pub trait NamingPolicy: Send + Sync {
    /// `relative_dir` is the file's directory relative to the source root,
    /// empty for files directly under the root.
    fn package_name(&self, relative_dir: &Path, short_name: &str) -> String;
}

/// A directory named after its unit is the unit's root (`src/fmt/print.go`
/// declaring `fmt` becomes `fmt`); any other unit is qualified by its
/// directory (`src/cmd/tool/main.go` declaring `main` becomes `cmd/tool/main`).
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectoryConvention;

impl NamingPolicy for DirectoryConvention {
    fn package_name(&self, relative_dir: &Path, short_name: &str) -> String {
        let dir = slash_path(relative_dir);
        let base_matches = relative_dir
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name == short_name);

        if !dir.is_empty() && base_matches {
            dir
        } else {
            join(&dir, short_name)
        }
    }
}

/// Always qualify the declared name by its directory
#[derive(Debug, Clone, Copy, Default)]
pub struct DeclaredName;

impl NamingPolicy for DeclaredName {
    fn package_name(&self, relative_dir: &Path, short_name: &str) -> String {
        join(&slash_path(relative_dir), short_name)
    }
}

/// Select a policy by its configuration name
pub fn policy_by_name(name: &str) -> Option<Box<dyn NamingPolicy>> {
    match name {
        "directory" => Some(Box::new(DirectoryConvention)),
        "declared" => Some(Box::new(DeclaredName)),
        _ => None,
    }
}

fn join(dir: &str, short_name: &str) -> String {
    if dir.is_empty() {
        short_name.to_string()
    } else {
        format!("{dir}/{short_name}")
    }
}

/// Render a relative path with `/` separators, dropping `.` components
fn slash_path(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("", "main", "main")]
    #[case("fmt", "fmt", "fmt")]
    #[case("encoding/json", "json", "encoding/json")]
    #[case("cmd/tool", "main", "cmd/tool/main")]
    #[case("util", "helpers", "util/helpers")]
    #[case("./util", "util", "util")]
    fn test_directory_convention(#[case] dir: &str, #[case] short: &str, #[case] expected: &str) {
        assert_eq!(
            DirectoryConvention.package_name(Path::new(dir), short),
            expected
        );
    }

    #[rstest]
    #[case("", "main", "main")]
    #[case("fmt", "fmt", "fmt/fmt")]
    #[case("cmd/tool", "main", "cmd/tool/main")]
    fn test_declared_name(#[case] dir: &str, #[case] short: &str, #[case] expected: &str) {
        assert_eq!(DeclaredName.package_name(Path::new(dir), short), expected);
    }

    #[test]
    fn test_policy_by_name() {
        assert!(policy_by_name("directory").is_some());
        assert!(policy_by_name("declared").is_some());
        assert!(policy_by_name("flat").is_none());
    }
}
