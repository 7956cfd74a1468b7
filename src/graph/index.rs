//! In-memory graph topology with id indexing.
//!
//! Uses `petgraph` for the adjacency structure and a `HashMap` for O(1) node
//! lookups by [`NodeId`]. Topology is fixed while rules are being ground; the
//! only mutation during reasoning is appending edges inferred by rules, which
//! happens in the single-threaded commit phase.

use std::collections::{HashMap, HashSet};

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::error::GraphError;

use super::{EdgeId, NodeId};

/// Result type for graph operations.
pub type GraphResult<T> = std::result::Result<T, GraphError>;

/// Directed graph backed by petgraph with insertion-ordered node and edge lists.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    graph: DiGraph<NodeId, ()>,
    /// NodeId → NodeIndex mapping for O(1) node lookups.
    node_index: HashMap<NodeId, NodeIndex>,
    nodes: Vec<NodeId>,
    edges: Vec<EdgeId>,
    edge_set: HashSet<EdgeId>,
}

impl Graph {
    /// Create a new empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node if it is not present. Returns `true` if it was added.
    pub fn add_node(&mut self, node: NodeId) -> bool {
        if self.node_index.contains_key(&node) {
            return false;
        }
        let idx = self.graph.add_node(node.clone());
        self.node_index.insert(node.clone(), idx);
        self.nodes.push(node);
        true
    }

    /// Add a directed edge between two existing nodes.
    ///
    /// Returns `Ok(true)` if the edge is new, `Ok(false)` if it already existed.
    pub fn add_edge(&mut self, edge: EdgeId) -> GraphResult<bool> {
        if self.edge_set.contains(&edge) {
            return Ok(false);
        }
        let src = self.index_of(&edge.source)?;
        let dst = self.index_of(&edge.target)?;
        self.graph.add_edge(src, dst, ());
        self.edge_set.insert(edge.clone());
        self.edges.push(edge);
        Ok(true)
    }

    fn index_of(&self, node: &NodeId) -> GraphResult<NodeIndex> {
        self.node_index
            .get(node)
            .copied()
            .ok_or_else(|| GraphError::UnknownNode {
                node: node.to_string(),
            })
    }

    pub fn contains_node(&self, node: &NodeId) -> bool {
        self.node_index.contains_key(node)
    }

    pub fn contains_edge(&self, edge: &EdgeId) -> bool {
        self.edge_set.contains(edge)
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    /// Edges in insertion order.
    pub fn edges(&self) -> &[EdgeId] {
        &self.edges
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Successors of `node`, in edge insertion order.
    pub fn neighbors(&self, node: &NodeId) -> Vec<NodeId> {
        self.adjacent(node, Direction::Outgoing)
    }

    /// Predecessors of `node`, in edge insertion order.
    pub fn reverse_neighbors(&self, node: &NodeId) -> Vec<NodeId> {
        self.adjacent(node, Direction::Incoming)
    }

    fn adjacent(&self, node: &NodeId, dir: Direction) -> Vec<NodeId> {
        let Some(&idx) = self.node_index.get(node) else {
            return Vec::new();
        };
        // petgraph walks adjacency most-recent-first.
        let mut out: Vec<NodeId> = self
            .graph
            .neighbors_directed(idx, dir)
            .filter_map(|n| self.graph.node_weight(n).cloned())
            .collect();
        out.reverse();
        out
    }

    /// Out-edges of `node`, in insertion order.
    pub fn out_edges(&self, node: &NodeId) -> Vec<EdgeId> {
        self.neighbors(node)
            .into_iter()
            .map(|t| EdgeId {
                source: node.clone(),
                target: t,
            })
            .collect()
    }
}

/// Builder for [`Graph`] that handles undirected input and reversal.
///
/// Edges may name nodes that were never added explicitly; they are created on
/// first mention.
#[derive(Debug, Clone)]
pub struct GraphBuilder {
    directed: bool,
    reverse: bool,
    nodes: Vec<NodeId>,
    edges: Vec<EdgeId>,
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self {
            directed: true,
            reverse: false,
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Undirected graphs insert every edge in both directions.
    pub fn directed(mut self, directed: bool) -> Self {
        self.directed = directed;
        self
    }

    /// Swap the direction of every edge.
    pub fn reverse(mut self, reverse: bool) -> Self {
        self.reverse = reverse;
        self
    }

    pub fn node(mut self, node: impl Into<NodeId>) -> Self {
        self.nodes.push(node.into());
        self
    }

    pub fn nodes<I, N>(mut self, nodes: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<NodeId>,
    {
        self.nodes.extend(nodes.into_iter().map(Into::into));
        self
    }

    pub fn edge(mut self, source: impl Into<NodeId>, target: impl Into<NodeId>) -> Self {
        self.edges.push(EdgeId::new(source, target));
        self
    }

    pub fn build(self) -> Graph {
        let mut graph = Graph::new();
        for node in self.nodes {
            graph.add_node(node);
        }
        for edge in self.edges {
            let edge = if self.reverse { edge.reversed() } else { edge };
            graph.add_node(edge.source.clone());
            graph.add_node(edge.target.clone());
            let back = edge.reversed();
            let self_loop = edge.source == edge.target;
            // Both endpoints exist, so insertion cannot fail.
            let _ = graph.add_edge(edge);
            if !self.directed && !self_loop {
                let _ = graph.add_edge(back);
            }
        }
        graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(v: &[NodeId]) -> Vec<&str> {
        v.iter().map(NodeId::as_str).collect()
    }

    #[test]
    fn neighbors_follow_insertion_order() {
        let g = GraphBuilder::new()
            .edge("A", "B")
            .edge("A", "C")
            .edge("A", "D")
            .build();
        assert_eq!(ids(&g.neighbors(&"A".into())), vec!["B", "C", "D"]);
        assert_eq!(ids(&g.reverse_neighbors(&"C".into())), vec!["A"]);
        assert!(g.neighbors(&"B".into()).is_empty());
    }

    #[test]
    fn undirected_inserts_both_directions() {
        let g = GraphBuilder::new().directed(false).edge("A", "B").build();
        assert_eq!(g.edge_count(), 2);
        assert!(g.contains_edge(&EdgeId::new("B", "A")));
    }

    #[test]
    fn reverse_swaps_edges() {
        let g = GraphBuilder::new().reverse(true).edge("A", "B").build();
        assert!(g.contains_edge(&EdgeId::new("B", "A")));
        assert!(!g.contains_edge(&EdgeId::new("A", "B")));
    }

    #[test]
    fn add_edge_rejects_unknown_nodes() {
        let mut g = Graph::new();
        g.add_node("A".into());
        let err = g.add_edge(EdgeId::new("A", "Z")).unwrap_err();
        assert!(matches!(err, GraphError::UnknownNode { .. }));
    }

    #[test]
    fn duplicate_edges_are_ignored() {
        let mut g = GraphBuilder::new().edge("A", "B").build();
        assert!(!g.add_edge(EdgeId::new("A", "B")).unwrap());
        assert_eq!(g.edge_count(), 1);
        assert_eq!(g.out_edges(&"A".into()), vec![EdgeId::new("A", "B")]);
    }
}
