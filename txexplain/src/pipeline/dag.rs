//! Dependency graph and execution ordering.

use crate::errors::CycleDetectedError;
use std::collections::HashMap;

/// Registered stages and the dependency edges between them.
///
/// Dependencies naming a stage that was never registered carry no edge; they
/// are kept aside in [`missing`](Self::missing).
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    names: Vec<String>,
    edges: Vec<Vec<usize>>,
    missing: Vec<(String, String)>,
}

impl DependencyGraph {
    /// Builds the graph from `(name, dependencies)` pairs in registration
    /// order.
    pub fn build<I, S>(stages: I) -> Self
    where
        I: IntoIterator<Item = (S, Vec<String>)>,
        S: Into<String>,
    {
        let declared: Vec<(String, Vec<String>)> = stages
            .into_iter()
            .map(|(name, deps)| (name.into(), deps))
            .collect();
        let index: HashMap<&str, usize> = declared
            .iter()
            .enumerate()
            .map(|(i, (name, _))| (name.as_str(), i))
            .collect();

        let mut edges = Vec::with_capacity(declared.len());
        let mut missing = Vec::new();
        for (name, deps) in &declared {
            let mut resolved: Vec<usize> = Vec::with_capacity(deps.len());
            for dep in deps {
                match index.get(dep.as_str()) {
                    Some(&i) if !resolved.contains(&i) => resolved.push(i),
                    Some(_) => {}
                    None => missing.push((name.clone(), dep.clone())),
                }
            }
            edges.push(resolved);
        }

        Self {
            names: declared.into_iter().map(|(name, _)| name).collect(),
            edges,
            missing,
        }
    }

    /// Number of stages in the graph.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns true if the graph has no stages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// `(stage, dependency)` pairs whose dependency is not registered.
    #[must_use]
    pub fn missing(&self) -> &[(String, String)] {
        &self.missing
    }

    /// Returns the stage indices in execution order.
    ///
    /// Repeatedly picks the earliest-registered stage whose registered
    /// dependencies have all been placed, so independent stages keep their
    /// registration order.
    pub fn execution_order(&self) -> Result<Vec<usize>, CycleDetectedError> {
        self.detect_cycles()?;

        let n = self.names.len();
        let mut placed = vec![false; n];
        let mut order = Vec::with_capacity(n);
        while order.len() < n {
            let next = (0..n).find(|&i| !placed[i] && self.edges[i].iter().all(|&d| placed[d]));
            match next {
                Some(i) => {
                    placed[i] = true;
                    order.push(i);
                }
                None => {
                    let remaining = (0..n)
                        .filter(|&i| !placed[i])
                        .map(|i| self.names[i].clone())
                        .collect();
                    return Err(CycleDetectedError::new(remaining));
                }
            }
        }
        Ok(order)
    }

    /// Returns the stage names in execution order.
    pub fn ordered_names(&self) -> Result<Vec<String>, CycleDetectedError> {
        Ok(self
            .execution_order()?
            .into_iter()
            .map(|i| self.names[i].clone())
            .collect())
    }

    fn detect_cycles(&self) -> Result<(), CycleDetectedError> {
        let mut visited = vec![false; self.names.len()];
        let mut on_path = vec![false; self.names.len()];
        let mut path = Vec::new();

        for start in 0..self.names.len() {
            if !visited[start] {
                if let Some(cycle) = self.dfs_cycle(start, &mut visited, &mut on_path, &mut path) {
                    return Err(CycleDetectedError::new(cycle));
                }
            }
        }
        Ok(())
    }

    fn dfs_cycle(
        &self,
        node: usize,
        visited: &mut [bool],
        on_path: &mut [bool],
        path: &mut Vec<usize>,
    ) -> Option<Vec<String>> {
        visited[node] = true;
        on_path[node] = true;
        path.push(node);

        for &dep in &self.edges[node] {
            if on_path[dep] {
                let start = path.iter().position(|&n| n == dep).unwrap_or(0);
                let mut cycle: Vec<String> =
                    path[start..].iter().map(|&i| self.names[i].clone()).collect();
                cycle.push(self.names[dep].clone());
                return Some(cycle);
            }
            if !visited[dep] {
                if let Some(cycle) = self.dfs_cycle(dep, visited, on_path, path) {
                    return Some(cycle);
                }
            }
        }

        path.pop();
        on_path[node] = false;
        None
    }
}
