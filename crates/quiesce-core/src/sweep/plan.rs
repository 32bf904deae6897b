use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::debug;

use crate::sweep::errors::SweepError;

pub type DependencyGraph = BTreeMap<String, BTreeSet<String>>;

/// Sweepers grouped into waves: every dependency of a sweeper sits in an
/// earlier wave, so each wave can run concurrently once the previous one
/// is done.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionPlan {
    waves: Vec<Vec<String>>,
}

impl ExecutionPlan {
    pub fn build(graph: &DependencyGraph) -> Result<Self, SweepError> {
        Self::build_filtered(graph, None)
    }

    /// Plan only the sweepers named in `only` plus everything they depend on.
    ///
    /// # Errors
    ///
    /// - [`SweepError::UnknownDependency`] if a sweeper names a dependency
    ///   that is not in the graph.
    /// - [`SweepError::UnknownSweeper`] if `only` names a sweeper that is
    ///   not in the graph.
    /// - [`SweepError::DependencyCycle`] listing every sweeper that could
    ///   not be ordered.
    pub fn build_filtered(
        graph: &DependencyGraph,
        only: Option<&[String]>,
    ) -> Result<Self, SweepError> {
        for (sweeper, deps) in graph {
            if let Some(dependency) = deps.iter().find(|d| !graph.contains_key(*d)) {
                return Err(SweepError::UnknownDependency {
                    sweeper: sweeper.clone(),
                    dependency: dependency.clone(),
                });
            }
        }

        let candidates = match only {
            Some(names) => closure(graph, names)?,
            None => graph.keys().cloned().collect(),
        };

        // dependency -> dependents, both within the candidate set
        let mut dependents: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        let mut in_degree: BTreeMap<&str, usize> = BTreeMap::new();
        for name in &candidates {
            in_degree.entry(name.as_str()).or_insert(0);
            for dep in &graph[name] {
                dependents.entry(dep.as_str()).or_default().push(name.as_str());
                *in_degree.entry(name.as_str()).or_insert(0) += 1;
            }
        }

        let mut waves: Vec<Vec<String>> = Vec::new();
        let mut current: Vec<&str> = in_degree
            .iter()
            .filter(|(_, deg)| **deg == 0)
            .map(|(name, _)| *name)
            .collect();

        while !current.is_empty() {
            let mut next: Vec<&str> = Vec::new();
            for name in &current {
                for dependent in dependents.get(name).into_iter().flatten() {
                    if let Some(deg) = in_degree.get_mut(dependent) {
                        *deg -= 1;
                        if *deg == 0 {
                            next.push(*dependent);
                        }
                    }
                }
            }
            waves.push(current.iter().map(|s| s.to_string()).collect());
            next.sort_unstable();
            current = next;
        }

        let planned: usize = waves.iter().map(Vec::len).sum();
        if planned < candidates.len() {
            let ordered: BTreeSet<&String> = waves.iter().flatten().collect();
            let sweepers: Vec<String> = candidates
                .iter()
                .filter(|name| !ordered.contains(name))
                .cloned()
                .collect();
            return Err(SweepError::DependencyCycle { sweepers });
        }

        debug!(
            event = "core.sweep.plan_built",
            sweepers = planned,
            waves = waves.len()
        );
        Ok(Self { waves })
    }

    pub fn waves(&self) -> &[Vec<String>] {
        &self.waves
    }

    pub fn len(&self) -> usize {
        self.waves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waves.is_empty()
    }

    /// All planned sweepers in execution order.
    pub fn sweepers(&self) -> impl Iterator<Item = &str> {
        self.waves.iter().flatten().map(String::as_str)
    }
}

fn closure(graph: &DependencyGraph, names: &[String]) -> Result<BTreeSet<String>, SweepError> {
    let mut selected = BTreeSet::new();
    let mut stack: Vec<&String> = Vec::new();
    for name in names {
        if !graph.contains_key(name) {
            return Err(SweepError::UnknownSweeper { name: name.clone() });
        }
        stack.push(name);
    }
    while let Some(name) = stack.pop() {
        if selected.insert(name.clone()) {
            stack.extend(graph[name].iter());
        }
    }
    Ok(selected)
}
