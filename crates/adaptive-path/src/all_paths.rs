//! Exhaustive simple-path enumeration
//!
//! Depth-first search with a visited marker and a backtracking path stack.
//! The number of simple paths grows exponentially with graph density; this
//! is meant for small switch fabrics (a handful of switches).

use crate::graph::Graph;
use adaptive_common::{Path, SwitchId};
use std::collections::HashSet;
use std::sync::Arc;

/// All simple paths between one source/destination pair, in discovery order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathSet {
    paths: Vec<Path>,
}

impl PathSet {
    /// Create from paths
    pub fn new(paths: Vec<Path>) -> Self {
        Self { paths }
    }

    /// Path at index
    pub fn get(&self, index: usize) -> Option<&Path> {
        self.paths.get(index)
    }

    /// Index of a path, matched by equality
    pub fn position(&self, path: &Path) -> Option<usize> {
        self.paths.iter().position(|p| p == path)
    }

    /// Iterate in discovery order
    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.paths.iter()
    }

    /// Number of paths
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl<'a> IntoIterator for &'a PathSet {
    type Item = &'a Path;
    type IntoIter = std::slice::Iter<'a, Path>;

    fn into_iter(self) -> Self::IntoIter {
        self.paths.iter()
    }
}

/// DFS path enumerator bound to one graph
#[derive(Debug, Clone)]
pub struct AllPathsEngine {
    graph: Arc<Graph>,
}

impl AllPathsEngine {
    /// Bind engine to a graph
    pub fn new(graph: Arc<Graph>) -> Self {
        Self { graph }
    }

    /// Enumerate every simple path from `src` to `dst`
    pub fn search(&self, src: SwitchId, dst: SwitchId) -> PathSet {
        if !self.graph.contains(src) {
            return PathSet::default();
        }

        let mut found = Vec::new();
        let mut visited = HashSet::with_capacity(self.graph.vertex_count());
        let mut stack = vec![src];
        self.visit(src, dst, &mut visited, &mut stack, &mut found);
        PathSet::new(found)
    }

    fn visit(
        &self,
        node: SwitchId,
        dst: SwitchId,
        visited: &mut HashSet<SwitchId>,
        stack: &mut Vec<SwitchId>,
        found: &mut Vec<Path>,
    ) {
        if node == dst {
            found.push(Path::new(stack.clone()));
            return;
        }

        visited.insert(node);
        for &next in self.graph.neighbors(node) {
            if visited.contains(&next) {
                continue;
            }
            stack.push(next);
            self.visit(next, dst, visited, stack, found);
            stack.pop();
        }
        visited.remove(&node);
    }
}
