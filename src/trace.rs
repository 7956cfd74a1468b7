//! Rule trace: an append-only audit log of every committed change.
//!
//! Each [`TraceEntry`] links a bound change back to what caused it: the fact
//! or rule by name, and for rules the neighbors whose values justified the
//! firing ([`ClauseGrounding`]).

use serde::{Deserialize, Serialize};

use crate::graph::{Component, EdgeId, NodeId};
use crate::interval::Interval;
use crate::label::Label;

/// What kind of input produced a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TriggeredBy {
    Rule,
    Fact,
    /// Complement propagated to an IPL partner of a changed label.
    Ipl,
}

impl std::fmt::Display for TriggeredBy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rule => write!(f, "Rule"),
            Self::Fact => write!(f, "Fact"),
            Self::Ipl => write!(f, "IPL"),
        }
    }
}

/// The qualifying members of one clause. A clause ranges over nodes or over
/// edges, never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClauseGrounding {
    Nodes(Vec<NodeId>),
    Edges(Vec<EdgeId>),
}

impl ClauseGrounding {
    pub fn len(&self) -> usize {
        match self {
            Self::Nodes(n) => n.len(),
            Self::Edges(e) => e.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One committed change (or inconsistency resolution).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceEntry {
    /// Timestep.
    pub t: usize,
    /// Fixed-point operation index within the timestep.
    pub fp_op: usize,
    pub component: Component,
    pub label: Label,
    pub old_bound: Interval,
    pub new_bound: Interval,
    /// `false` for entries written by inconsistency resolution.
    pub consistent: bool,
    pub triggered_by: TriggeredBy,
    /// Name of the fact or rule responsible.
    pub name: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub clause_groundings: Vec<ClauseGrounding>,
}

/// The run's trace.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleTrace {
    entries: Vec<TraceEntry>,
}

impl RuleTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: TraceEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[TraceEntry] {
        &self.entries
    }

    /// Entries recorded at timestep `t`.
    pub fn at(&self, t: usize) -> impl Iterator<Item = &TraceEntry> {
        self.entries.iter().filter(move |e| e.t == t)
    }

    /// Entries for one ground atom, in commit order.
    pub fn for_atom<'a>(
        &'a self,
        component: &'a Component,
        label: &'a Label,
    ) -> impl Iterator<Item = &'a TraceEntry> + 'a {
        self.entries
            .iter()
            .filter(move |e| &e.component == component && &e.label == label)
    }

    /// Entries written by inconsistency resolution.
    pub fn inconsistencies(&self) -> impl Iterator<Item = &TraceEntry> {
        self.entries.iter().filter(|e| !e.consistent)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
