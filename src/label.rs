//! Predicate labels.
//!
//! A [`Label`] names a predicate (`infected`, `friend`, ...). Labels are cheap
//! to clone (a shared `Arc<str>`) and compare, hash and order by name. Node and
//! edge labels use the same type; which space a label lives in is decided by
//! the component it is attached to.

use std::borrow::Borrow;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::graph::{EdgeId, NodeId};

/// An immutable, shareable predicate name.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label(Arc<str>);

impl Label {
    /// Create a label. Prefer [`NameRegistry::label`](crate::registry::NameRegistry::label)
    /// when many components mention the same name.
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    pub(crate) fn from_arc(name: Arc<str>) -> Self {
        Self(name)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Label({})", self.0)
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for Label {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Label {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Label {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl Serialize for Label {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Label {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Label::from)
    }
}

/// The labels every world starts out with, all at `[0, 1]`.
///
/// `node` and `edge` labels are given to every node or edge, including edges
/// created during reasoning; `specific_*` labels only to the listed
/// components.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelSet {
    pub node: Vec<Label>,
    pub edge: Vec<Label>,
    pub specific_node: Vec<(Label, Vec<NodeId>)>,
    pub specific_edge: Vec<(Label, Vec<EdgeId>)>,
}

impl LabelSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_node_label(mut self, label: impl Into<Label>) -> Self {
        self.node.push(label.into());
        self
    }

    pub fn with_edge_label(mut self, label: impl Into<Label>) -> Self {
        self.edge.push(label.into());
        self
    }

    /// Labels a given node starts with.
    pub fn for_node<'a>(&'a self, node: &'a NodeId) -> impl Iterator<Item = &'a Label> + 'a {
        self.node.iter().chain(
            self.specific_node
                .iter()
                .filter(move |(_, nodes)| nodes.contains(node))
                .map(|(l, _)| l),
        )
    }

    /// Labels a given edge starts with.
    pub fn for_edge<'a>(&'a self, edge: &'a EdgeId) -> impl Iterator<Item = &'a Label> + 'a {
        self.edge.iter().chain(
            self.specific_edge
                .iter()
                .filter(move |(_, edges)| edges.contains(edge))
                .map(|(l, _)| l),
        )
    }
}
