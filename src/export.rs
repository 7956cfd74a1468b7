//! Export types for serializing reasoning results.
//!
//! These types flatten worlds and trace entries into plain, string-keyed rows
//! suitable for JSON export or tabular display.

use serde::{Deserialize, Serialize};

use crate::graph::Component;
use crate::interpretation::Snapshot;
use crate::interval::Interval;
use crate::label::Label;
use crate::reasoner::ReasoningOutcome;
use crate::trace::{ClauseGrounding, RuleTrace};

/// Exported ground atom at one timestep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldRow {
    /// Timestep of the snapshot.
    pub t: usize,
    /// `"node"` or `"edge"`.
    pub kind: String,
    /// Node name or `(source,target)`.
    pub component: String,
    /// Predicate label.
    pub label: String,
    /// Lower truth bound.
    pub lower: f64,
    /// Upper truth bound.
    pub upper: f64,
}

/// Exported trace entry with bounds split into columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceRow {
    pub t: usize,
    pub fp_op: usize,
    pub component: String,
    pub label: String,
    pub old_lower: f64,
    pub old_upper: f64,
    pub new_lower: f64,
    pub new_upper: f64,
    pub consistent: bool,
    /// `"Rule"`, `"Fact"` or `"IPL"`.
    pub triggered_by: String,
    /// Fact or rule name.
    pub name: String,
    pub message: String,
    /// Qualifying members per clause, as component names.
    pub clause_groundings: Vec<Vec<String>>,
}

/// Summary of a run, as printed by the CLI in JSON mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunExport {
    pub timesteps: usize,
    pub converged_early: bool,
    /// Diagnostic of the inconsistency that halted the run, if any.
    pub halted: Option<String>,
    pub num_ga: Vec<usize>,
    /// Final worlds.
    pub worlds: Vec<WorldRow>,
    pub trace: Vec<TraceRow>,
}

fn kind_of(component: &Component) -> &'static str {
    if component.is_node() { "node" } else { "edge" }
}

/// Flatten a snapshot into rows, in snapshot order.
pub fn world_rows(snapshot: &Snapshot) -> Vec<WorldRow> {
    snapshot
        .atoms
        .iter()
        .map(|a| WorldRow {
            t: snapshot.t,
            kind: kind_of(&a.component).to_string(),
            component: a.component.to_string(),
            label: a.label.to_string(),
            lower: a.bound.lower(),
            upper: a.bound.upper(),
        })
        .collect()
}

/// Rows for `labels` whose bound lies within `bound`, highest lower bound first.
///
/// Ties keep snapshot order.
pub fn filter_rows(snapshot: &Snapshot, labels: &[Label], bound: &Interval) -> Vec<WorldRow> {
    let mut rows: Vec<WorldRow> = snapshot
        .atoms
        .iter()
        .filter(|a| labels.contains(&a.label) && bound.contains(&a.bound))
        .map(|a| WorldRow {
            t: snapshot.t,
            kind: kind_of(&a.component).to_string(),
            component: a.component.to_string(),
            label: a.label.to_string(),
            lower: a.bound.lower(),
            upper: a.bound.upper(),
        })
        .collect();
    rows.sort_by(|a, b| b.lower.total_cmp(&a.lower));
    rows
}

fn grounding_names(g: &ClauseGrounding) -> Vec<String> {
    match g {
        ClauseGrounding::Nodes(nodes) => nodes.iter().map(ToString::to_string).collect(),
        ClauseGrounding::Edges(edges) => edges.iter().map(ToString::to_string).collect(),
    }
}

pub fn trace_rows(trace: &RuleTrace) -> Vec<TraceRow> {
    trace
        .entries()
        .iter()
        .map(|e| TraceRow {
            t: e.t,
            fp_op: e.fp_op,
            component: e.component.to_string(),
            label: e.label.to_string(),
            old_lower: e.old_bound.lower(),
            old_upper: e.old_bound.upper(),
            new_lower: e.new_bound.lower(),
            new_upper: e.new_bound.upper(),
            consistent: e.consistent,
            triggered_by: e.triggered_by.to_string(),
            name: e.name.clone(),
            message: e.message.clone(),
            clause_groundings: e.clause_groundings.iter().map(grounding_names).collect(),
        })
        .collect()
}

impl RunExport {
    pub fn from_outcome(outcome: &ReasoningOutcome) -> Self {
        let last = outcome.timesteps.saturating_sub(1);
        Self {
            timesteps: outcome.timesteps,
            converged_early: outcome.converged_early,
            halted: outcome.halted.as_ref().map(ToString::to_string),
            num_ga: outcome.num_ga.clone(),
            worlds: world_rows(&outcome.interpretation.snapshot(last)),
            trace: trace_rows(&outcome.trace),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::EdgeId;
    use crate::interpretation::AtomState;
    use crate::trace::{TraceEntry, TriggeredBy};

    fn iv(l: f64, u: f64) -> Interval {
        Interval::closed(l, u).unwrap()
    }

    fn snapshot() -> Snapshot {
        let atom = |c: Component, l: &str, b: Interval| AtomState {
            component: c,
            label: Label::new(l),
            bound: b,
        };
        Snapshot {
            t: 4,
            atoms: vec![
                atom(Component::node("A"), "infected", iv(0.3, 1.0)),
                atom(Component::node("B"), "infected", iv(0.9, 1.0)),
                atom(Component::node("B"), "healthy", iv(0.0, 0.1)),
                atom(Component::edge("A", "B"), "contact", Interval::TRUE),
            ],
        }
    }

    #[test]
    fn world_rows_flatten_components() {
        let rows = world_rows(&snapshot());
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[3].kind, "edge");
        assert_eq!(rows[3].component, "(A,B)");
        assert!(rows.iter().all(|r| r.t == 4));
    }

    #[test]
    fn filter_rows_sorts_by_lower_bound() {
        let rows = filter_rows(&snapshot(), &[Label::new("infected")], &iv(0.2, 1.0));
        let names: Vec<&str> = rows.iter().map(|r| r.component.as_str()).collect();
        assert_eq!(names, vec!["B", "A"]);
    }

    #[test]
    fn trace_rows_resolve_groundings() {
        let mut trace = RuleTrace::new();
        trace.push(TraceEntry {
            t: 1,
            fp_op: 2,
            component: Component::node("A"),
            label: Label::new("infected"),
            old_bound: Interval::UNKNOWN,
            new_bound: Interval::TRUE,
            consistent: true,
            triggered_by: TriggeredBy::Rule,
            name: "spread".into(),
            message: String::new(),
            clause_groundings: vec![ClauseGrounding::Edges(vec![EdgeId::new("A", "B")])],
        });
        let rows = trace_rows(&trace);
        assert_eq!(rows[0].triggered_by, "Rule");
        assert_eq!(rows[0].clause_groundings, vec![vec!["(A,B)".to_string()]]);
        assert_eq!(rows[0].new_lower, 1.0);
    }
}
