//! Compiler and linker command lines
use crate::error::{BuildError, BuildResult};
use crate::graph::Dag;
use crate::package::{CompileCommand, Package};
use std::fs;
use std::path::{Path, PathBuf};

/// Toolchain description used to build compile and link commands
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backend {
    pub compiler: String,
    pub linker: String,
    /// Appended to a package name to form its object path, e.g. `.6`
    pub object_suffix: String,
    pub compile_flags: Vec<String>,
    pub link_flags: Vec<String>,
    /// Where objects go; the source root when unset
    pub lib_dir: Option<PathBuf>,
    /// Extra search directories for both compiler and linker
    pub includes: Vec<PathBuf>,
    pub static_link: bool,
    pub strip: bool,
}

impl Default for Backend {
    fn default() -> Self {
        Self {
            compiler: "6g".to_string(),
            linker: "6l".to_string(),
            object_suffix: ".6".to_string(),
            compile_flags: Vec::new(),
            link_flags: Vec::new(),
            lib_dir: None,
            includes: Vec::new(),
            static_link: false,
            strip: false,
        }
    }
}

impl Backend {
    /// Directory holding compiled objects
    pub fn lib_root(&self, src_root: &Path) -> PathBuf {
        self.lib_dir
            .clone()
            .unwrap_or_else(|| src_root.to_path_buf())
    }

    /// Object file for a package name
    pub fn object_path(&self, src_root: &Path, name: &str) -> PathBuf {
        self.lib_root(src_root)
            .join(format!("{name}{}", self.object_suffix))
    }

    /// `compiler [flags] -I <lib> (-I <inc>)* -o <lib>/<name><suffix> files...`
    pub fn compile_command(&self, package: &Package, src_root: &Path) -> CompileCommand {
        let lib_root = self.lib_root(src_root);
        let output = self.object_path(src_root, &package.name);

        let mut argv = vec![self.compiler.clone()];
        argv.extend(self.compile_flags.iter().cloned());
        argv.push("-I".to_string());
        argv.push(display(&lib_root));
        for include in &self.includes {
            argv.push("-I".to_string());
            argv.push(display(include));
        }
        argv.push("-o".to_string());
        argv.push(display(&output));
        argv.extend(package.files.iter().map(|f| display(f)));

        CompileCommand::new(argv, output)
    }

    /// Give every package its compile command.
    ///
    /// With a lib dir, the parent directory of each object is created so
    /// the compiler can write into nested package paths.
    pub fn assign_commands(&self, dag: &mut Dag, src_root: &Path) -> BuildResult<()> {
        for package in dag.packages_mut() {
            let command = self.compile_command(package, src_root);
            if self.lib_dir.is_some() {
                if let Some(parent) = command.output.parent() {
                    fs::create_dir_all(parent).map_err(|e| BuildError::io(parent, e))?;
                }
            }
            package.command = Some(command);
        }
        Ok(())
    }

    /// `linker [flags] -L <lib> (-L <inc>)* [-s] [-d] -o <output> <main_object>`
    pub fn link_command(&self, src_root: &Path, output: &Path, main_object: &Path) -> Vec<String> {
        let mut argv = vec![self.linker.clone()];
        argv.extend(self.link_flags.iter().cloned());
        argv.push("-L".to_string());
        argv.push(display(&self.lib_root(src_root)));
        for include in &self.includes {
            argv.push("-L".to_string());
            argv.push(display(include));
        }
        if self.strip {
            argv.push("-s".to_string());
        }
        if self.static_link {
            argv.push("-d".to_string());
        }
        argv.push("-o".to_string());
        argv.push(display(output));
        argv.push(display(main_object));
        argv
    }
}

fn display(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
