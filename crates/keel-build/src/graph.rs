//! Dependency graph construction from per-file import lists
use crate::error::{BuildError, BuildResult};
use crate::naming::NamingPolicy;
use crate::package::{Package, PackageId};
use crate::scanner::{UnitHeader, UnitParser};
use rayon::prelude::*;
use std::collections::{BTreeSet, HashMap};
use std::ops::Index;
use std::path::{Path, PathBuf};

/// Packages keyed by canonical name, connected by dependency edges.
///
/// Nodes live in an arena addressed by [`PackageId`]; an edge `a -> b`
/// means some file of `b` imports `a`, and is stored as `b` in `a`'s
/// children with `b.indegree` counting it.
#[derive(Debug, Clone, Default)]
pub struct Dag {
    packages: Vec<Package>,
    index: HashMap<String, PackageId>,
}

impl Dag {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan `files` under `root` and group them into packages.
    ///
    /// Files are parsed in parallel, then merged in input order so the
    /// arena order is deterministic. Edges are not built yet; call
    /// [`Dag::build_edges`] once every file has been added.
    pub fn parse(
        root: &Path,
        files: &[PathBuf],
        parser: &dyn UnitParser,
        naming: &dyn NamingPolicy,
    ) -> BuildResult<Self> {
        let headers: Vec<(&PathBuf, UnitHeader)> = files
            .par_iter()
            .map(|file| parser.header(file).map(|header| (file, header)))
            .collect::<BuildResult<_>>()?;

        let mut dag = Self::new();
        for (file, header) in headers {
            let dir = file.parent().unwrap_or_else(|| Path::new(""));
            let relative = dir
                .strip_prefix(root)
                .map_err(|_| BuildError::parse(file, "file is outside the source root"))?;
            let name = naming.package_name(relative, &header.name);

            dag.add_package(
                Package::new(name, header.name)
                    .with_files([file.clone()])
                    .with_dependencies(header.imports),
            );
        }

        tracing::debug!(packages = dag.len(), files = files.len(), "parsed source tree");
        Ok(dag)
    }

    /// Insert a package, merging files and imports into an existing
    /// package of the same name.
    pub fn add_package(&mut self, package: Package) -> PackageId {
        if let Some(&id) = self.index.get(&package.name) {
            let existing = &mut self.packages[id.0];
            existing.files.extend(package.files);
            existing.dependencies.extend(package.dependencies);
            return id;
        }

        let id = PackageId(self.packages.len());
        self.index.insert(package.name.clone(), id);
        self.packages.push(package);
        id
    }

    /// Connect every package to the local packages it imports.
    ///
    /// Imports naming a package outside the graph produce no edge. Calling
    /// this again rebuilds the edges from scratch.
    pub fn build_edges(&mut self) {
        for package in &mut self.packages {
            package.children.clear();
            package.indegree = 0;
        }

        let mut edges = Vec::new();
        for (k, package) in self.packages.iter().enumerate() {
            for dep in &package.dependencies {
                if let Some(&from) = self.index.get(dep) {
                    edges.push((from, PackageId(k)));
                }
            }
        }

        for (from, to) in edges {
            self.packages[from.0].children.push(to);
            self.packages[to.0].indegree += 1;
        }
    }

    /// Imports that do not resolve to any package in the graph
    pub fn alien(&self) -> BTreeSet<String> {
        self.packages
            .iter()
            .flat_map(|p| p.dependencies.iter())
            .filter(|dep| !self.is_local(dep))
            .cloned()
            .collect()
    }

    /// Alien imports that look like remote repository paths
    /// (`host.tld/owner/repo`)
    pub fn remote_imports(&self) -> BTreeSet<String> {
        self.alien()
            .into_iter()
            .filter(|dep| {
                dep.split('/').count() > 1
                    && dep.split('/').next().is_some_and(|host| host.contains('.'))
            })
            .collect()
    }

    /// Whether an import path names a package in this graph
    pub fn is_local(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Look up a package id by name
    pub fn id_of(&self, name: &str) -> Option<PackageId> {
        self.index.get(name).copied()
    }

    /// Get a package by name
    pub fn get(&self, name: &str) -> Option<&Package> {
        self.id_of(name).map(|id| &self.packages[id.0])
    }

    /// Mutable access to a package
    pub fn package_mut(&mut self, id: PackageId) -> &mut Package {
        &mut self.packages[id.0]
    }

    /// All packages with their ids, in arena order
    pub fn iter(&self) -> impl Iterator<Item = (PackageId, &Package)> {
        self.packages
            .iter()
            .enumerate()
            .map(|(i, p)| (PackageId(i), p))
    }

    /// Mutable iteration over all packages
    pub fn packages_mut(&mut self) -> impl Iterator<Item = &mut Package> {
        self.packages.iter_mut()
    }

    /// All package ids, in arena order
    pub fn ids(&self) -> impl Iterator<Item = PackageId> {
        (0..self.packages.len()).map(PackageId)
    }

    /// Packages declaring the `main` unit
    pub fn main_packages(&self) -> Vec<PackageId> {
        self.iter()
            .filter(|(_, p)| p.is_main())
            .map(|(id, _)| id)
            .collect()
    }

    /// Names of the given packages
    pub fn names(&self, ids: &[PackageId]) -> Vec<String> {
        ids.iter().map(|&id| self[id].name.clone()).collect()
    }

    /// Number of packages
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    /// Whether the graph has no packages
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

impl Index<PackageId> for Dag {
    type Output = Package;

    fn index(&self, id: PackageId) -> &Package {
        &self.packages[id.0]
    }
}
