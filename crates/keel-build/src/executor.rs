//! Compile executors: the opaque side-effecting step behind every compile
use crate::error::{BuildError, BuildResult};
use std::path::Path;
use std::process::Command;

/// Runs a package's compile command
///
/// Invocation is synchronous; success means the declared artifact was
/// written. Called concurrently from scheduler tasks.
pub trait CompileExecutor: Sync {
    fn invoke(&self, package: &str, argv: &[String]) -> BuildResult<()>;
}

/// Spawns the command as a child process with inherited stdio
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessExecutor;

impl CompileExecutor for ProcessExecutor {
    fn invoke(&self, package: &str, argv: &[String]) -> BuildResult<()> {
        run(package, argv)
    }
}

/// Prints each command as a shell line instead of running it
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunExecutor;

impl CompileExecutor for DryRunExecutor {
    fn invoke(&self, _package: &str, argv: &[String]) -> BuildResult<()> {
        println!("{}", dry_run_line(argv));
        Ok(())
    }
}

/// `program args... || exit 1`, with the program reduced to its file name
pub fn dry_run_line(argv: &[String]) -> String {
    let mut parts = Vec::with_capacity(argv.len() + 2);
    if let Some((program, args)) = argv.split_first() {
        let binary = Path::new(program)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| program.clone());
        parts.push(binary);
        parts.extend(args.iter().cloned());
    }
    parts.push("||".to_string());
    parts.push("exit 1".to_string());
    parts.join(" ")
}

/// Run a command line, failing on spawn errors and non-zero exit
pub(crate) fn run(package: &str, argv: &[String]) -> BuildResult<()> {
    let (program, args) = argv.split_first().ok_or_else(|| BuildError::CommandFailed {
        package: package.to_string(),
        command: String::new(),
        status: "empty command line".to_string(),
    })?;

    tracing::debug!(package, command = %argv.join(" "), "spawning");
    let status = Command::new(program)
        .args(args)
        .status()
        .map_err(|error| BuildError::Spawn {
            program: program.clone(),
            error,
        })?;

    if status.success() {
        Ok(())
    } else {
        Err(BuildError::CommandFailed {
            package: package.to_string(),
            command: argv.join(" "),
            status: status.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_dry_run_line() {
        let line = dry_run_line(&argv(&["/usr/bin/cc", "-o", "out/a.o", "a.go"]));
        assert_eq!(line, "cc -o out/a.o a.go || exit 1");
    }

    #[test]
    fn test_empty_command_fails() {
        assert!(matches!(
            ProcessExecutor.invoke("a", &[]),
            Err(BuildError::CommandFailed { .. })
        ));
    }

    #[test]
    fn test_unknown_program_fails_to_spawn() {
        let result = ProcessExecutor.invoke("a", &argv(&["keel-no-such-program-xyz"]));
        assert!(matches!(result, Err(BuildError::Spawn { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_exit_status_is_observed() {
        assert!(ProcessExecutor.invoke("a", &argv(&["true"])).is_ok());
        assert!(matches!(
            ProcessExecutor.invoke("a", &argv(&["false"])),
            Err(BuildError::CommandFailed { .. })
        ));
    }
}
