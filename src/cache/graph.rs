//! Dependency edges between queries
//!
//! An edge `upstream -> downstream` means the downstream query is submitted
//! each time the upstream query loads successfully. The graph is kept
//! acyclic so a success can never re-trigger itself.

use crate::error::{SpacesError, SpacesResult};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// Directed acyclic graph of query keys
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    edges: BTreeMap<String, BTreeSet<String>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare that `downstream` runs after `upstream` succeeds
    pub fn add(&mut self, upstream: &str, downstream: &str) -> SpacesResult<()> {
        if upstream == downstream || self.reaches(downstream, upstream) {
            return Err(SpacesError::DependencyCycle {
                upstream: upstream.to_string(),
                downstream: downstream.to_string(),
            });
        }
        self.edges
            .entry(upstream.to_string())
            .or_default()
            .insert(downstream.to_string());
        Ok(())
    }

    /// Queries triggered directly by `key`
    pub fn dependents(&self, key: &str) -> Vec<String> {
        self.edges
            .get(key)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Queries that trigger `key`
    pub fn upstreams(&self, key: &str) -> Vec<String> {
        self.edges
            .iter()
            .filter(|(_, downstream)| downstream.contains(key))
            .map(|(upstream, _)| upstream.clone())
            .collect()
    }

    /// All keys in trigger order (every upstream before its dependents)
    pub fn order(&self) -> Vec<String> {
        let mut indegree: BTreeMap<&str, usize> = BTreeMap::new();
        for (upstream, downstream) in &self.edges {
            indegree.entry(upstream.as_str()).or_insert(0);
            for key in downstream {
                *indegree.entry(key.as_str()).or_insert(0) += 1;
            }
        }

        let mut ready: VecDeque<&str> = indegree
            .iter()
            .filter(|(_, n)| **n == 0)
            .map(|(key, _)| *key)
            .collect();
        let mut order = Vec::with_capacity(indegree.len());

        while let Some(key) = ready.pop_front() {
            order.push(key.to_string());
            if let Some(downstream) = self.edges.get(key) {
                for next in downstream {
                    if let Some(n) = indegree.get_mut(next.as_str()) {
                        *n -= 1;
                        if *n == 0 {
                            ready.push_back(next.as_str());
                        }
                    }
                }
            }
        }

        order
    }

    fn reaches(&self, from: &str, to: &str) -> bool {
        let mut stack = vec![from];
        let mut seen = BTreeSet::new();
        while let Some(key) = stack.pop() {
            if key == to {
                return true;
            }
            if !seen.insert(key) {
                continue;
            }
            if let Some(downstream) = self.edges.get(key) {
                stack.extend(downstream.iter().map(String::as_str));
            }
        }
        false
    }
}
