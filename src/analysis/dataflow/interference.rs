//! Variable interference graph.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Undirected conflict graph over variables.
///
/// Two variables interfere when they are live at the same time and therefore cannot
/// share a register. Edges are stored once, with the lexically smaller name first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterferenceGraph {
    /// Every variable of the function, interfering or not
    pub nodes: BTreeSet<String>,
    /// Conflict edges
    pub edges: BTreeSet<(String, String)>,
}

impl InterferenceGraph {
    /// Adds a variable without edges.
    pub fn add_node(&mut self, variable: &str) {
        if !self.nodes.contains(variable) {
            self.nodes.insert(variable.to_string());
        }
    }

    /// Adds a conflict between `a` and `b`. Self-conflicts are ignored.
    pub fn add_edge(&mut self, a: &str, b: &str) {
        if a == b {
            return;
        }
        self.add_node(a);
        self.add_node(b);
        let (low, high) = if a < b { (a, b) } else { (b, a) };
        self.edges.insert((low.to_string(), high.to_string()));
    }

    /// Returns `true` if `a` and `b` conflict.
    #[must_use]
    pub fn interferes(&self, a: &str, b: &str) -> bool {
        let (low, high) = if a < b { (a, b) } else { (b, a) };
        self.edges.contains(&(low.to_string(), high.to_string()))
    }

    /// Variables conflicting with `variable`.
    #[must_use]
    pub fn neighbors(&self, variable: &str) -> BTreeSet<&str> {
        self.edges
            .iter()
            .filter_map(|(a, b)| {
                if a == variable {
                    Some(b.as_str())
                } else if b == variable {
                    Some(a.as_str())
                } else {
                    None
                }
            })
            .collect()
    }

    /// Number of conflicts per variable.
    #[must_use]
    pub fn degrees(&self) -> BTreeMap<&str, usize> {
        let mut degrees: BTreeMap<&str, usize> =
            self.nodes.iter().map(|n| (n.as_str(), 0)).collect();
        for (a, b) in &self.edges {
            *degrees.entry(a.as_str()).or_default() += 1;
            *degrees.entry(b.as_str()).or_default() += 1;
        }
        degrees
    }

    /// Highest degree of any variable.
    #[must_use]
    pub fn max_degree(&self) -> usize {
        self.degrees().values().copied().max().unwrap_or(0)
    }

    /// Number of conflict edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}
