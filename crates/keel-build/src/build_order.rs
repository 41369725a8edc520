//! Build order computation and cycle detection using topological sort
use crate::error::{BuildError, BuildResult};
use crate::graph::Dag;
use crate::package::PackageId;
use std::collections::{HashSet, VecDeque};

impl Dag {
    /// Compute a legal compile order using Kahn's algorithm.
    ///
    /// Producers come before consumers. The graph itself is not mutated;
    /// indegrees are counted on a copy. A residual frontier means the graph
    /// has a cycle, which is fatal.
    pub fn topsort(&self) -> BuildResult<Vec<PackageId>> {
        let mut in_degree = self.compute_in_degrees();
        let mut queue: VecDeque<PackageId> =
            self.ids().filter(|id| in_degree[id.index()] == 0).collect();
        let mut done = Vec::with_capacity(self.len());

        while let Some(id) = queue.pop_front() {
            for &child in self[id].children() {
                let degree = &mut in_degree[child.index()];
                *degree -= 1;
                if *degree == 0 {
                    queue.push_back(child);
                }
            }
            done.push(id);
        }

        if done.len() < self.len() {
            return Err(BuildError::CycleDetected {
                cycle: self.find_cycle(),
            });
        }

        Ok(done)
    }

    /// Names in topological order
    pub fn sorted_names(&self) -> BuildResult<Vec<String>> {
        Ok(self.names(&self.topsort()?))
    }

    /// Count incoming edges per package from the children lists
    fn compute_in_degrees(&self) -> Vec<usize> {
        let mut in_degree = vec![0; self.len()];
        for (_, package) in self.iter() {
            for child in package.children() {
                in_degree[child.index()] += 1;
            }
        }
        in_degree
    }

    /// Find a cycle in the graph (for error reporting)
    fn find_cycle(&self) -> String {
        let mut visited = HashSet::new();
        let mut rec_stack = HashSet::new();
        let mut path = Vec::new();

        for id in self.ids() {
            if let Some(cycle) = self.dfs_find_cycle(id, &mut visited, &mut rec_stack, &mut path) {
                return cycle;
            }
        }

        "unknown cycle".to_string()
    }

    /// DFS along dependency edges, rendering the cycle as `a -> b -> a`
    /// where each arrow reads "is imported by"
    fn dfs_find_cycle(
        &self,
        id: PackageId,
        visited: &mut HashSet<PackageId>,
        rec_stack: &mut HashSet<PackageId>,
        path: &mut Vec<PackageId>,
    ) -> Option<String> {
        if rec_stack.contains(&id) {
            let start = path.iter().position(|&p| p == id).unwrap_or(0);
            let mut names: Vec<&str> = path[start..]
                .iter()
                .map(|&p| self[p].name.as_str())
                .collect();
            names.push(self[id].name.as_str());
            return Some(names.join(" -> "));
        }

        if !visited.insert(id) {
            return None;
        }

        rec_stack.insert(id);
        path.push(id);

        for &child in self[id].children() {
            if let Some(cycle) = self.dfs_find_cycle(child, visited, rec_stack, path) {
                return Some(cycle);
            }
        }

        rec_stack.remove(&id);
        path.pop();
        None
    }
}
