//! Name registry: interning for labels and node identifiers.
//!
//! Programs mention the same predicate and node names thousands of times. The
//! [`NameRegistry`] hands out one shared allocation per distinct name using a
//! `DashMap`, so it can be used from several loader threads at once.

use std::sync::Arc;

use dashmap::DashMap;

use crate::graph::NodeId;
use crate::label::Label;

/// Concurrent interner for predicate labels and node names.
#[derive(Debug, Default)]
pub struct NameRegistry {
    labels: DashMap<Box<str>, Arc<str>>,
    nodes: DashMap<Box<str>, Arc<str>>,
}

impl NameRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a predicate label.
    pub fn label(&self, name: &str) -> Label {
        Label::from_arc(intern(&self.labels, name))
    }

    /// Intern a node identifier.
    pub fn node(&self, name: &str) -> NodeId {
        NodeId::from_arc(intern(&self.nodes, name))
    }

    /// Number of distinct labels seen.
    pub fn label_count(&self) -> usize {
        self.labels.len()
    }

    /// Number of distinct node names seen.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

fn intern(map: &DashMap<Box<str>, Arc<str>>, name: &str) -> Arc<str> {
    if let Some(existing) = map.get(name) {
        return Arc::clone(existing.value());
    }
    // `entry` re-checks under the shard lock, so racing inserts agree.
    map.entry(Box::from(name))
        .or_insert_with(|| Arc::from(name))
        .value()
        .clone()
}
