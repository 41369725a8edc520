//! End-to-end tests for the keel binary
//!
//! Every test runs in a scratch project with HOME and XDG_CONFIG_HOME
//! pointed inside it, so user configuration never leaks in. Commands that
//! would invoke a toolchain run with `--dry-run`.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

// ============================================================================
// Test Helpers
// ============================================================================

const APP: &[(&str, &str)] = &[
    ("src/util/strings.go", "package util\nimport \"fmt\"\nfunc Join() {}\n"),
    ("src/util/util_test.go", "package util\nimport \"testing\"\nfunc TestJoin(t *testing.T) {}\n"),
    ("src/net/conn.go", "package net\nimport \"util\"\n"),
    ("src/main.go", "package main\nimport (\n\t\"net\"\n\t\"util\"\n)\nfunc main() {}\n"),
];

fn create_project(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (rel, content) in files {
        let path = dir.path().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
    dir
}

fn keel(project: &Path) -> Command {
    let mut cmd = Command::from(assert_cmd::cargo::cargo_bin_cmd!("keel"));
    cmd.current_dir(project)
        .env("HOME", project)
        .env("XDG_CONFIG_HOME", project.join(".config"))
        .env("NO_COLOR", "1")
        .env_remove("KEEL_LOG")
        .env_remove("KEEL_BACKEND_COMPILER")
        .env_remove("KEEL_BACKEND_LINKER")
        .env_remove("KEEL_LIB_DIR")
        .env_remove("KEEL_QUIET");
    cmd
}

// ============================================================================
// Inspection
// ============================================================================

#[test]
fn test_sort_prints_build_order() {
    let project = create_project(APP);
    let output = keel(project.path()).arg("sort").output().unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let order: Vec<&str> = stdout.lines().collect();
    assert_eq!(order.len(), 3);
    let pos = |name: &str| order.iter().position(|p| *p == name).unwrap();
    assert!(pos("util") < pos("net"));
    assert!(pos("net") < pos("main"));
}

#[test]
fn test_sort_dot_means_current_directory() {
    let project = create_project(&[("lib/a.go", "package a\n")]);
    keel(&project.path().join("lib"))
        .args(["sort", "."])
        .assert()
        .success()
        .stdout("a\n");
}

#[test]
fn test_print_json() {
    let project = create_project(APP);
    let output = keel(project.path())
        .args(["print", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let packages: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let packages = packages.as_array().unwrap();
    assert_eq!(packages.len(), 3);
    let net = packages.iter().find(|p| p["name"] == "net").unwrap();
    assert_eq!(net["dependencies"], serde_json::json!(["util"]));
}

#[test]
fn test_print_human_readable() {
    let project = create_project(APP);
    keel(project.path())
        .arg("print")
        .assert()
        .success()
        .stdout(predicate::str::contains("  import: util"))
        .stdout(predicate::str::contains("  file: net/conn.go"));
}

#[test]
fn test_dot_writes_graph() {
    let project = create_project(APP);
    keel(project.path())
        .args(["dot", "deps.dot"])
        .assert()
        .success();

    let dot = fs::read_to_string(project.path().join("deps.dot")).unwrap();
    assert!(dot.starts_with("digraph depgraph {"));
    assert!(dot.contains("\"net\" -> \"util\";"));
}

#[test]
fn test_alien_lists_outside_imports() {
    let project = create_project(APP);
    keel(project.path())
        .arg("alien")
        .assert()
        .success()
        .stdout("fmt\ntesting\n");
}

#[test]
fn test_alien_remote_only() {
    let project = create_project(&[(
        "src/app/app.go",
        "package app\nimport (\n\t\"os\"\n\t\"github.com/acme/log\"\n)\n",
    )]);
    keel(project.path())
        .args(["alien", "--remote"])
        .assert()
        .success()
        .stdout("github.com/acme/log\n");
}

// ============================================================================
// Build
// ============================================================================

#[test]
fn test_build_dry_run_prints_commands() {
    let project = create_project(APP);
    keel(project.path())
        .args(["build", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("6g "))
        .stdout(predicate::str::contains("6l "))
        .stdout(predicate::str::contains("|| exit 1"))
        .stdout(predicate::str::contains("compiling: util"));

    // Nothing ran, so nothing was written
    assert!(!project.path().join("a.out").exists());
}

#[test]
fn test_build_quiet_hides_progress() {
    let project = create_project(APP);
    keel(project.path())
        .args(["build", "--dry-run", "--quiet"])
        .assert()
        .success()
        .stdout(predicate::str::contains("compiling:").not());
}

#[test]
fn test_project_config_selects_compiler() {
    let project = create_project(APP);
    fs::write(
        project.path().join("keel.toml"),
        "[backend]\ncompiler = \"/opt/cc/bin/mycc\"\n",
    )
    .unwrap();

    keel(project.path())
        .args(["build", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("mycc "));
}

#[test]
fn test_build_library_tree_skips_linking() {
    let project = create_project(&[
        ("src/util/strings.go", "package util\n"),
        ("src/net/conn.go", "package net\nimport \"util\"\n"),
    ]);
    keel(project.path())
        .args(["build", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("compiling: net"))
        .stdout(predicate::str::contains("6l ").not());
}

#[test]
fn test_build_library_tree_with_output_fails() {
    let project = create_project(&[("src/util/strings.go", "package util\n")]);
    keel(project.path())
        .args(["build", "--dry-run", "-o", "app"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("No main package found"));
}

#[cfg(unix)]
#[test]
fn test_build_json_summary() {
    let project = create_project(&[("src/main.go", "package main\n")]);
    let output = keel(project.path())
        .args(["build", "--json"])
        .env("KEEL_BACKEND_COMPILER", "true")
        .env("KEEL_BACKEND_LINKER", "true")
        .output()
        .unwrap();
    assert!(output.status.success());

    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["compiled"], serde_json::json!(["main"]));
}

#[cfg(unix)]
#[test]
fn test_failing_compiler_exits_nonzero() {
    let project = create_project(APP);
    keel(project.path())
        .arg("build")
        .env("KEEL_BACKEND_COMPILER", "false")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("error:"))
        .stderr(predicate::str::contains("Compilation failed for: util"));
}

#[test]
fn test_test_dry_run_builds_entry_point() {
    let project = create_project(APP);
    keel(project.path())
        .args(["test", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("_main.go"))
        .stdout(predicate::str::contains("testing:").not());
}

// ============================================================================
// Clean
// ============================================================================

#[test]
fn test_clean_dry_run_keeps_objects() {
    let project = create_project(APP);
    let object = project.path().join("src/util.6");
    fs::write(&object, "").unwrap();

    keel(project.path())
        .args(["clean", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[dryrun] rm:"));
    assert!(object.exists());

    keel(project.path()).arg("clean").assert().success();
    assert!(!object.exists());
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_missing_source_directory() {
    let project = TempDir::new().unwrap();
    keel(project.path())
        .args(["sort", "nope"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_cycle_is_an_error() {
    let project = create_project(&[
        ("src/a/a.go", "package a\nimport \"b\"\n"),
        ("src/b/b.go", "package b\nimport \"a\"\n"),
    ]);
    keel(project.path())
        .arg("build")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Loop in dependency graph"));
}

#[test]
fn test_invalid_config_is_reported() {
    let project = create_project(APP);
    fs::write(project.path().join("keel.toml"), "[build]\nunknown = 1\n").unwrap();
    keel(project.path())
        .arg("sort")
        .assert()
        .failure()
        .stderr(predicate::str::contains("keel.toml"));
}
