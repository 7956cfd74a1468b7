//! Data-driven annotated rules.
//!
//! Rules are structs, not code: they can be deserialized from a JSON program or
//! constructed programmatically with the builder methods on [`Rule`].
//!
//! A rule says: for every target component satisfying `target_criteria`, if
//! each clause finds enough qualifying neighbors, assert the head bound for
//! `target` (on the component, or on edges the rule creates), `delta_t`
//! timesteps later.

pub mod annotation;

use serde::{Deserialize, Serialize};

use crate::error::RuleError;
use crate::interval::Interval;
use crate::label::Label;

pub use annotation::{AnnotationFn, ClauseAnnotation};

// ---------------------------------------------------------------------------
// Thresholds
// ---------------------------------------------------------------------------

/// Comparison operator of a clause threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    GreaterEqual,
    Greater,
    LessEqual,
    Less,
    Equal,
}

impl Comparison {
    pub fn holds(&self, lhs: f64, rhs: f64) -> bool {
        match self {
            Self::GreaterEqual => lhs >= rhs,
            Self::Greater => lhs > rhs,
            Self::LessEqual => lhs <= rhs,
            Self::Less => lhs < rhs,
            Self::Equal => (lhs - rhs).abs() < f64::EPSILON,
        }
    }
}

/// Whether a threshold counts members or measures a fraction of the population.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quantifier {
    Number,
    /// Compared as a fraction in `[0, 1]`.
    Percent,
}

/// Which neighbors make up a clause's population.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subset {
    /// Every neighbor.
    Total,
    /// Only neighbors that have received a value for the clause label this run.
    Available,
}

/// A quantified condition such as "at least half of the available neighbors".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    pub comparison: Comparison,
    pub quantifier: Quantifier,
    pub subset: Subset,
    pub value: f64,
}

impl Threshold {
    pub fn new(comparison: Comparison, quantifier: Quantifier, subset: Subset, value: f64) -> Self {
        Self {
            comparison,
            quantifier,
            subset,
            value,
        }
    }

    /// `>= n` qualifying members of the whole population.
    pub fn at_least(n: usize) -> Self {
        Self::new(Comparison::GreaterEqual, Quantifier::Number, Subset::Total, n as f64)
    }

    /// Whether `qualified` members out of `population` satisfy the threshold.
    ///
    /// A percentage of an empty population never holds.
    pub fn is_satisfied(&self, population: usize, qualified: usize) -> bool {
        match self.quantifier {
            Quantifier::Number => self.comparison.holds(qualified as f64, self.value),
            Quantifier::Percent => {
                if population == 0 {
                    return false;
                }
                let fraction = qualified as f64 / population as f64;
                self.comparison.holds(fraction, self.value)
            }
        }
    }
}

impl Default for Threshold {
    fn default() -> Self {
        Self::at_least(1)
    }
}

// ---------------------------------------------------------------------------
// Clauses
// ---------------------------------------------------------------------------

/// Whether a clause or rule ranges over nodes or edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    Node,
    Edge,
}

/// One neighbor criterion of a rule body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clause {
    pub kind: ComponentKind,
    pub label: Label,
    /// A member qualifies when its interval for `label` lies within this bound.
    pub bound: Interval,
    #[serde(default)]
    pub threshold: Threshold,
}

impl Clause {
    pub fn node(label: impl Into<Label>, bound: Interval) -> Self {
        Self {
            kind: ComponentKind::Node,
            label: label.into(),
            bound,
            threshold: Threshold::default(),
        }
    }

    pub fn edge(label: impl Into<Label>, bound: Interval) -> Self {
        Self {
            kind: ComponentKind::Edge,
            ..Self::node(label, bound)
        }
    }

    pub fn with_threshold(mut self, threshold: Threshold) -> Self {
        self.threshold = threshold;
        self
    }
}

// ---------------------------------------------------------------------------
// Heads and edge inference
// ---------------------------------------------------------------------------

/// How a rule computes the bound it asserts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleHead {
    Bound(Interval),
    Annotation(AnnotationFn),
}

/// One end of an inferred edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Endpoint {
    /// The node the rule is grounded on.
    Target,
    /// Every qualifying node of the node clause at this index.
    Clause(usize),
}

/// Edges a node rule creates when it fires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeInference {
    pub source: Endpoint,
    pub target: Endpoint,
    /// Optional marker label set to `[1, 1]` on each created edge.
    #[serde(default)]
    pub label: Option<Label>,
}

// ---------------------------------------------------------------------------
// Rule
// ---------------------------------------------------------------------------

fn default_delta_t() -> usize {
    1
}

/// A single annotated rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub name: String,
    pub kind: ComponentKind,
    /// Label asserted by the head.
    pub target: Label,
    /// Conditions on the target component itself.
    #[serde(default)]
    pub target_criteria: Vec<(Label, Interval)>,
    /// Timesteps between the body holding and the head being asserted.
    #[serde(default = "default_delta_t")]
    pub delta_t: usize,
    #[serde(default)]
    pub clauses: Vec<Clause>,
    pub head: RuleHead,
    /// One weight per clause, optionally followed by a bias weight.
    #[serde(default)]
    pub weights: Vec<f64>,
    #[serde(default)]
    pub edge_to_add: Option<EdgeInference>,
    #[serde(default)]
    pub immediate: bool,
    /// Head bounds are committed as static.
    #[serde(default, rename = "static")]
    pub is_static: bool,
}

impl Rule {
    /// A node rule asserting `target` with the fixed bound `[1, 1]`.
    pub fn node(name: impl Into<String>, target: impl Into<Label>) -> Self {
        Self {
            name: name.into(),
            kind: ComponentKind::Node,
            target: target.into(),
            target_criteria: Vec::new(),
            delta_t: default_delta_t(),
            clauses: Vec::new(),
            head: RuleHead::Bound(Interval::TRUE),
            weights: Vec::new(),
            edge_to_add: None,
            immediate: false,
            is_static: false,
        }
    }

    /// An edge rule asserting `target` with the fixed bound `[1, 1]`.
    pub fn edge(name: impl Into<String>, target: impl Into<Label>) -> Self {
        Self {
            kind: ComponentKind::Edge,
            ..Self::node(name, target)
        }
    }

    pub fn with_delta_t(mut self, delta_t: usize) -> Self {
        self.delta_t = delta_t;
        self
    }

    pub fn with_clause(mut self, clause: Clause) -> Self {
        self.clauses.push(clause);
        self
    }

    pub fn with_target_criterion(mut self, label: impl Into<Label>, bound: Interval) -> Self {
        self.target_criteria.push((label.into(), bound));
        self
    }

    pub fn with_bound(mut self, bound: Interval) -> Self {
        self.head = RuleHead::Bound(bound);
        self
    }

    pub fn with_annotation(mut self, f: AnnotationFn) -> Self {
        self.head = RuleHead::Annotation(f);
        self
    }

    pub fn with_weights(mut self, weights: Vec<f64>) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_edge_inference(mut self, inference: EdgeInference) -> Self {
        self.edge_to_add = Some(inference);
        self
    }

    /// Mark as immediate: applied before other rules, with `delta_t = 0`.
    pub fn immediate(mut self) -> Self {
        self.immediate = true;
        self.delta_t = 0;
        self
    }

    pub fn static_head(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// Per-clause weights (default 1.0) and the bias (default 0.0).
    pub fn clause_weights(&self) -> (Vec<f64>, f64) {
        let n = self.clauses.len();
        let mut weights: Vec<f64> = self.weights.iter().copied().take(n).collect();
        weights.resize(n, 1.0);
        let bias = self.weights.get(n).copied().unwrap_or(0.0);
        (weights, bias)
    }

    /// Check the rule for structural problems before reasoning starts.
    pub fn validate(&self) -> Result<(), RuleError> {
        let invalid = |message: String| RuleError::InvalidRule {
            rule: self.name.clone(),
            message,
        };

        if self.immediate && self.delta_t != 0 {
            return Err(invalid(format!(
                "immediate rules must have delta_t = 0, got {}",
                self.delta_t
            )));
        }

        let n = self.clauses.len();
        if !self.weights.is_empty() && self.weights.len() != n && self.weights.len() != n + 1 {
            return Err(RuleError::WeightMismatch {
                rule: self.name.clone(),
                weights: self.weights.len(),
                clauses: n,
            });
        }

        for (i, clause) in self.clauses.iter().enumerate() {
            let t = &clause.threshold;
            let valid = match t.quantifier {
                Quantifier::Number => t.value >= 0.0,
                Quantifier::Percent => (0.0..=1.0).contains(&t.value),
            };
            if !valid {
                return Err(invalid(format!(
                    "clause {i} threshold {} is out of range for {:?}",
                    t.value, t.quantifier
                )));
            }
        }

        if let Some(inference) = &self.edge_to_add {
            if self.kind != ComponentKind::Node {
                return Err(invalid("only node rules may infer edges".into()));
            }
            for endpoint in [inference.source, inference.target] {
                if let Endpoint::Clause(i) = endpoint {
                    match self.clauses.get(i) {
                        Some(c) if c.kind == ComponentKind::Node => {}
                        _ => {
                            return Err(invalid(format!(
                                "edge endpoint refers to clause {i}, which is not a node clause"
                            )));
                        }
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iv(l: f64, u: f64) -> Interval {
        Interval::closed(l, u).unwrap()
    }

    #[test]
    fn number_threshold_counts_qualified() {
        let t = Threshold::at_least(2);
        assert!(!t.is_satisfied(5, 1));
        assert!(t.is_satisfied(5, 2));
    }

    #[test]
    fn percent_threshold_uses_fraction() {
        let t = Threshold::new(
            Comparison::GreaterEqual,
            Quantifier::Percent,
            Subset::Available,
            0.5,
        );
        assert!(t.is_satisfied(4, 2));
        assert!(!t.is_satisfied(4, 1));
        assert!(!t.is_satisfied(0, 0), "empty population never satisfies a percentage");
    }

    #[test]
    fn comparisons() {
        assert!(Comparison::Greater.holds(2.0, 1.0));
        assert!(!Comparison::Greater.holds(1.0, 1.0));
        assert!(Comparison::LessEqual.holds(1.0, 1.0));
        assert!(Comparison::Less.holds(0.0, 1.0));
        assert!(Comparison::Equal.holds(3.0, 3.0));
    }

    #[test]
    fn immediate_forces_zero_delay() {
        let r = Rule::node("r", "p").with_delta_t(3).immediate();
        assert_eq!(r.delta_t, 0);
        assert!(r.validate().is_ok());

        let mut bad = r.clone();
        bad.delta_t = 2;
        assert!(bad.validate().is_err());
    }

    #[test]
    fn weights_default_and_bias() {
        let r = Rule::node("r", "p")
            .with_clause(Clause::node("q", Interval::TRUE))
            .with_clause(Clause::node("s", Interval::TRUE));
        assert_eq!(r.clause_weights(), (vec![1.0, 1.0], 0.0));

        let r = r.with_weights(vec![0.3, 0.4, 0.1]);
        assert_eq!(r.clause_weights(), (vec![0.3, 0.4], 0.1));
        assert!(r.validate().is_ok());

        let r = r.with_weights(vec![1.0; 5]);
        assert!(matches!(r.validate(), Err(RuleError::WeightMismatch { .. })));
    }

    #[test]
    fn edge_inference_requires_node_clause() {
        let r = Rule::node("link", "knows")
            .with_clause(Clause::edge("friend", iv(1.0, 1.0)))
            .with_edge_inference(EdgeInference {
                source: Endpoint::Target,
                target: Endpoint::Clause(0),
                label: None,
            });
        assert!(r.validate().is_err());
    }

    #[test]
    fn deserializes_from_json() {
        let json = r#"{
            "name": "spread",
            "kind": "node",
            "target": "infected",
            "clauses": [{
                "kind": "node",
                "label": "exposed",
                "bound": [1.0, 1.0],
                "threshold": {
                    "comparison": "greater_equal",
                    "quantifier": "percent",
                    "subset": "available",
                    "value": 0.5
                }
            }],
            "head": {"annotation": "average"}
        }"#;
        let rule: Rule = serde_json::from_str(json).unwrap();
        assert_eq!(rule.delta_t, 1);
        assert_eq!(rule.head, RuleHead::Annotation(AnnotationFn::Average));
        assert_eq!(rule.clauses[0].threshold.subset, Subset::Available);
        assert!(rule.validate().is_ok());
    }
}
