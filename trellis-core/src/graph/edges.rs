//! Dependency Edges
//!
//! Bidirectional edge storage between sources (signals) and subscribers
//! (effects, memos). Forward edges answer "who must re-run when this source
//! changes", reverse edges answer "which sources must drop me before I
//! re-run".

use std::collections::{HashMap, HashSet};

use indexmap::IndexSet;

use crate::reactive::{SourceId, SubscriberId};

/// The dependency graph between sources and subscribers.
///
/// Subscribers of a source are kept in first-registration order. That order
/// is what notification and batch flushing follow.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    /// Source -> subscribers that read it during their last run.
    dependents: HashMap<SourceId, IndexSet<SubscriberId>>,

    /// Subscriber -> sources it read during its last run.
    dependencies: HashMap<SubscriberId, HashSet<SourceId>>,
}

impl DependencyGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `subscriber` read `source`.
    ///
    /// Adding an edge that already exists keeps its original position.
    pub fn add_edge(&mut self, source: SourceId, subscriber: SubscriberId) {
        self.dependents.entry(source).or_default().insert(subscriber);
        self.dependencies
            .entry(subscriber)
            .or_default()
            .insert(source);
    }

    /// Drop every edge from `subscriber` to its sources.
    ///
    /// Called before a computation re-runs so that only the sources read by
    /// the new run stay subscribed.
    pub fn clear_dependencies(&mut self, subscriber: SubscriberId) {
        let Some(sources) = self.dependencies.remove(&subscriber) else {
            return;
        };
        for source in sources {
            if let Some(subs) = self.dependents.get_mut(&source) {
                subs.shift_remove(&subscriber);
                if subs.is_empty() {
                    self.dependents.remove(&source);
                }
            }
        }
    }

    /// Drop a source and every edge pointing at it.
    pub fn remove_source(&mut self, source: SourceId) {
        if let Some(subs) = self.dependents.remove(&source) {
            for sub in subs {
                if let Some(deps) = self.dependencies.get_mut(&sub) {
                    deps.remove(&source);
                }
            }
        }
    }

    /// Subscribers of `source`, in first-registration order.
    pub fn dependents(&self, source: SourceId) -> Vec<SubscriberId> {
        self.dependents
            .get(&source)
            .map(|subs| subs.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Number of sources `subscriber` currently depends on.
    pub fn dependency_count(&self, subscriber: SubscriberId) -> usize {
        self.dependencies
            .get(&subscriber)
            .map(HashSet::len)
            .unwrap_or(0)
    }

    /// Number of subscribers currently reading `source`.
    pub fn dependent_count(&self, source: SourceId) -> usize {
        self.dependents.get(&source).map(IndexSet::len).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_and_clear_edges() {
        let mut graph = DependencyGraph::new();
        let source = SourceId::new();
        let sub = SubscriberId::new();

        graph.add_edge(source, sub);
        assert_eq!(graph.dependents(source), vec![sub]);
        assert_eq!(graph.dependency_count(sub), 1);

        graph.clear_dependencies(sub);
        assert!(graph.dependents(source).is_empty());
        assert_eq!(graph.dependency_count(sub), 0);
    }

    #[test]
    fn dependents_keep_registration_order() {
        let mut graph = DependencyGraph::new();
        let source = SourceId::new();
        let first = SubscriberId::new();
        let second = SubscriberId::new();
        let third = SubscriberId::new();

        graph.add_edge(source, second);
        graph.add_edge(source, first);
        graph.add_edge(source, third);
        // Re-adding does not move it
        graph.add_edge(source, second);

        assert_eq!(graph.dependents(source), vec![second, first, third]);
    }

    #[test]
    fn remove_source_drops_reverse_edges() {
        let mut graph = DependencyGraph::new();
        let a = SourceId::new();
        let b = SourceId::new();
        let sub = SubscriberId::new();

        graph.add_edge(a, sub);
        graph.add_edge(b, sub);
        graph.remove_source(a);

        assert_eq!(graph.dependency_count(sub), 1);
        assert_eq!(graph.dependent_count(a), 0);
        assert_eq!(graph.dependent_count(b), 1);
    }
}
