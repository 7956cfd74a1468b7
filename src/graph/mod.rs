//! Graph: the components truth values are attached to.
//!
//! Nodes are identified by [`NodeId`], edges by the ordered pair [`EdgeId`].
//! A [`Component`] is either. The topology lives in [`Graph`] (see [`index`]),
//! backed by `petgraph`.

pub mod index;

use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub use index::{Graph, GraphBuilder, GraphResult};

/// Identifier of a graph node: a shared, interned name.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(Arc<str>);

impl NodeId {
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

impl std::fmt::Debug for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl Serialize for NodeId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for NodeId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(NodeId::from)
    }
}

/// A directed edge `(source, target)`.
///
/// Serialized as a two-element array.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "(NodeId, NodeId)", into = "(NodeId, NodeId)")]
pub struct EdgeId {
    pub source: NodeId,
    pub target: NodeId,
}

impl EdgeId {
    pub fn new(source: impl Into<NodeId>, target: impl Into<NodeId>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }

    /// The same edge pointing the other way.
    pub fn reversed(&self) -> Self {
        Self {
            source: self.target.clone(),
            target: self.source.clone(),
        }
    }
}

impl From<(NodeId, NodeId)> for EdgeId {
    fn from((source, target): (NodeId, NodeId)) -> Self {
        Self { source, target }
    }
}

impl From<EdgeId> for (NodeId, NodeId) {
    fn from(e: EdgeId) -> Self {
        (e.source, e.target)
    }
}

impl std::fmt::Display for EdgeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({},{})", self.source, self.target)
    }
}

/// A node or an edge: anything that owns a world.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Component {
    Node(NodeId),
    Edge(EdgeId),
}

impl Component {
    pub fn node(name: impl Into<NodeId>) -> Self {
        Self::Node(name.into())
    }

    pub fn edge(source: impl Into<NodeId>, target: impl Into<NodeId>) -> Self {
        Self::Edge(EdgeId::new(source, target))
    }

    pub fn is_node(&self) -> bool {
        matches!(self, Self::Node(_))
    }
}

impl From<NodeId> for Component {
    fn from(n: NodeId) -> Self {
        Self::Node(n)
    }
}

impl From<EdgeId> for Component {
    fn from(e: EdgeId) -> Self {
        Self::Edge(e)
    }
}

impl std::fmt::Display for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Node(n) => write!(f, "{n}"),
            Self::Edge(e) => write!(f, "{e}"),
        }
    }
}
