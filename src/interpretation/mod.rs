//! The interpretation: every world in the graph plus the indices the engine
//! reads while grounding.
//!
//! An [`Interpretation`] owns the graph topology (which grows when rules infer
//! edges), one [`World`] per node and per edge, and the [`PredicateMap`]
//! used by `available` quantifiers. All mutation goes through
//! [`Interpretation::update`] (see [`update`]) so that IPL propagation,
//! consistency handling and trace recording can never be skipped.

pub mod predicate_map;
pub mod update;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::graph::{Component, EdgeId, Graph, GraphResult, NodeId};
use crate::interval::Interval;
use crate::label::{Label, LabelSet};
use crate::world::World;

pub use predicate_map::{PredicateIndex, PredicateMap};
pub use update::{
    InconsistencyReport, OnMissing, UpdateContext, UpdateEnv, UpdateOutcome, UpdateSource,
};

/// The value of one ground atom in a [`Snapshot`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtomState {
    pub component: Component,
    pub label: Label,
    pub bound: Interval,
}

/// An ordered copy of every world at one timestep.
///
/// Nodes come first in graph order, then edges in creation order; labels are
/// sorted by name within each component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub t: usize,
    pub atoms: Vec<AtomState>,
}

impl Snapshot {
    /// Interval of `label` on `component`, if the atom exists.
    pub fn bound(&self, component: &Component, label: &Label) -> Option<Interval> {
        self.atoms
            .iter()
            .find(|a| &a.component == component && &a.label == label)
            .map(|a| a.bound)
    }
}

/// Graph plus per-component worlds.
#[derive(Debug, Clone)]
pub struct Interpretation {
    graph: Graph,
    labels: LabelSet,
    nodes: HashMap<NodeId, World>,
    edges: HashMap<EdgeId, World>,
    predicate_map: PredicateMap,
}

impl Interpretation {
    /// Materialise a world for every node and edge, seeded from `labels`.
    pub fn new(graph: Graph, labels: LabelSet) -> Self {
        let nodes = graph
            .nodes()
            .iter()
            .map(|n| (n.clone(), World::with_labels(labels.for_node(n))))
            .collect();
        let edges = graph
            .edges()
            .iter()
            .map(|e| (e.clone(), World::with_labels(labels.for_edge(e))))
            .collect();
        Self {
            graph,
            labels,
            nodes,
            edges,
            predicate_map: PredicateMap::new(),
        }
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    pub fn predicate_map(&self) -> &PredicateMap {
        &self.predicate_map
    }

    pub fn node_world(&self, node: &NodeId) -> Option<&World> {
        self.nodes.get(node)
    }

    pub fn edge_world(&self, edge: &EdgeId) -> Option<&World> {
        self.edges.get(edge)
    }

    pub fn world(&self, component: &Component) -> Option<&World> {
        match component {
            Component::Node(n) => self.nodes.get(n),
            Component::Edge(e) => self.edges.get(e),
        }
    }

    /// Current interval of an atom, `None` if the component or label is absent.
    pub fn bound(&self, component: &Component, label: &Label) -> Option<Interval> {
        self.world(component).and_then(|w| w.get(label)).copied()
    }

    /// Whether the atom exists and its interval lies within `bound`.
    pub fn query(&self, component: &Component, label: &Label, bound: &Interval) -> bool {
        self.world(component)
            .is_some_and(|w| w.is_satisfied(label, bound))
    }

    /// Total number of ground atoms across all worlds.
    pub fn num_ground_atoms(&self) -> usize {
        self.nodes.values().map(World::len).sum::<usize>()
            + self.edges.values().map(World::len).sum::<usize>()
    }

    /// Add an edge inferred by a rule and give it a world.
    ///
    /// Returns `false` if the edge already existed.
    pub fn add_edge(&mut self, edge: EdgeId) -> GraphResult<bool> {
        if !self.graph.add_edge(edge.clone())? {
            return Ok(false);
        }
        let world = World::with_labels(self.labels.for_edge(&edge));
        self.edges.insert(edge, world);
        Ok(true)
    }

    /// Start a new timestep: reset non-static intervals (saving their
    /// previous bounds) and rebuild the predicate map from what survived.
    pub fn reset_timestep(&mut self) {
        for world in self.nodes.values_mut() {
            world.reset();
        }
        for world in self.edges.values_mut() {
            world.reset();
        }
        self.rebuild_predicate_map();
    }

    fn rebuild_predicate_map(&mut self) {
        self.predicate_map.clear();
        for node in self.graph.nodes() {
            if let Some(world) = self.nodes.get(node) {
                for (label, interval) in world.sorted() {
                    if interval.is_static() {
                        self.predicate_map.nodes.push(&label, node.clone());
                    }
                }
            }
        }
        for edge in self.graph.edges() {
            if let Some(world) = self.edges.get(edge) {
                for (label, interval) in world.sorted() {
                    if interval.is_static() {
                        self.predicate_map.edges.push(&label, edge.clone());
                    }
                }
            }
        }
    }

    /// An ordered copy of all worlds, tagged with timestep `t`.
    pub fn snapshot(&self, t: usize) -> Snapshot {
        let mut atoms = Vec::with_capacity(self.num_ground_atoms());
        for node in self.graph.nodes() {
            if let Some(world) = self.nodes.get(node) {
                for (label, bound) in world.sorted() {
                    atoms.push(AtomState {
                        component: Component::Node(node.clone()),
                        label,
                        bound,
                    });
                }
            }
        }
        for edge in self.graph.edges() {
            if let Some(world) = self.edges.get(edge) {
                for (label, bound) in world.sorted() {
                    atoms.push(AtomState {
                        component: Component::Edge(edge.clone()),
                        label,
                        bound,
                    });
                }
            }
        }
        Snapshot { t, atoms }
    }

    fn world_mut(&mut self, component: &Component) -> Option<&mut World> {
        match component {
            Component::Node(n) => self.nodes.get_mut(n),
            Component::Edge(e) => self.edges.get_mut(e),
        }
    }

    fn record_change(&mut self, component: &Component, label: &Label) {
        match component {
            Component::Node(n) => self.predicate_map.nodes.push(label, n.clone()),
            Component::Edge(e) => self.predicate_map.edges.push(label, e.clone()),
        }
    }
}
