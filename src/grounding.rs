//! Rule grounding.
//!
//! Grounding evaluates one rule against a read-only [`Interpretation`] and
//! returns every applicable instantiation as a [`Grounding`]. It never writes:
//! the reasoner commits groundings afterwards, in rule order then discovery
//! order, which is what makes parallel grounding produce the same result as
//! sequential grounding.
//!
//! For a node rule the candidates are the graph's nodes. A node clause ranges
//! over the candidate's out-neighbors and an edge clause over its out-edges.
//! For an edge rule `(s, t)` a node clause ranges over `{s, t}` and an edge
//! clause over the continuation edges `(t, m)`.

use crate::graph::{Component, EdgeId, NodeId};
use crate::interpretation::Interpretation;
use crate::interval::Interval;
use crate::reasoner::config::ExecutionMode;
use crate::rules::annotation::ClauseAnnotation;
use crate::rules::{Clause, ComponentKind, EdgeInference, Endpoint, Rule, RuleHead, Subset};
use crate::trace::ClauseGrounding;
use crate::world::World;

/// One applicable instantiation of a rule.
#[derive(Debug, Clone, PartialEq)]
pub struct Grounding {
    /// The grounded component: a node for node rules, an edge for edge rules.
    pub component: Component,
    /// Head bound to commit, already clamped to `[0, 1]`.
    pub bound: Interval,
    /// Edges to create first. When non-empty the head is committed on these
    /// edges instead of on `component`.
    pub edges_to_add: Vec<EdgeId>,
    /// Qualifying members per clause; empty unless atom tracing is on.
    pub clause_groundings: Vec<ClauseGrounding>,
}

/// Ground `rule` against `interp`.
///
/// Results are in candidate order (graph node or edge order) regardless of
/// `execution`.
pub fn ground(
    rule: &Rule,
    interp: &Interpretation,
    atom_trace: bool,
    execution: ExecutionMode,
) -> Vec<Grounding> {
    match rule.kind {
        ComponentKind::Node => {
            let candidates = interp.graph().nodes();
            collect(candidates, execution, |n| {
                ground_node(rule, interp, n, atom_trace)
            })
        }
        ComponentKind::Edge => {
            let candidates = interp.graph().edges();
            collect(candidates, execution, |e| {
                ground_edge(rule, interp, e, atom_trace)
            })
        }
    }
}

fn collect<C, F>(candidates: &[C], execution: ExecutionMode, f: F) -> Vec<Grounding>
where
    C: Sync,
    F: Fn(&C) -> Option<Grounding> + Sync + Send,
{
    match execution {
        ExecutionMode::Sequential => candidates.iter().filter_map(f).collect(),
        ExecutionMode::Parallel => {
            use rayon::prelude::*;
            let found: Vec<Option<Grounding>> = candidates.par_iter().map(f).collect();
            found.into_iter().flatten().collect()
        }
    }
}

/// Members of one clause's population that satisfy it.
struct ClauseMatch<M> {
    population: usize,
    qualified: Vec<M>,
    intervals: Vec<Interval>,
}

/// Evaluate `clause` over `members`, or `None` if its threshold fails.
fn evaluate<'w, M, W>(
    clause: &Clause,
    members: Vec<M>,
    available: impl Fn(&M) -> bool,
    world_of: W,
) -> Option<ClauseMatch<M>>
where
    W: Fn(&M) -> Option<&'w World>,
{
    let population: Vec<M> = match clause.threshold.subset {
        Subset::Total => members,
        Subset::Available => members.into_iter().filter(|m| available(m)).collect(),
    };
    let size = population.len();
    let mut qualified = Vec::new();
    let mut intervals = Vec::new();
    for member in population {
        let Some(world) = world_of(&member) else {
            continue;
        };
        if world.is_satisfied(&clause.label, &clause.bound) {
            intervals.push(world.bound(&clause.label));
            qualified.push(member);
        }
    }
    clause
        .threshold
        .is_satisfied(size, qualified.len())
        .then_some(ClauseMatch {
            population: size,
            qualified,
            intervals,
        })
}

fn meets_criteria(rule: &Rule, world: &World) -> bool {
    rule.target_criteria
        .iter()
        .all(|(label, bound)| world.is_satisfied(label, bound))
}

fn head_bound(rule: &Rule, annotations: &[ClauseAnnotation]) -> Interval {
    match rule.head {
        RuleHead::Bound(bound) => bound,
        RuleHead::Annotation(f) => {
            let (weights, bias) = rule.clause_weights();
            f.apply(annotations, &weights, bias)
        }
    }
}

/// Per-clause results of a successful clause evaluation.
#[derive(Default)]
struct Body {
    annotations: Vec<ClauseAnnotation>,
    groundings: Vec<ClauseGrounding>,
    /// Qualified nodes per clause (empty for edge clauses).
    nodes: Vec<Vec<NodeId>>,
}

fn node_clause(
    clause: &Clause,
    interp: &Interpretation,
    members: Vec<NodeId>,
) -> Option<ClauseMatch<NodeId>> {
    let index = &interp.predicate_map().nodes;
    evaluate(
        clause,
        members,
        |n| index.contains(&clause.label, n),
        |n| interp.node_world(n),
    )
}

fn edge_clause(
    clause: &Clause,
    interp: &Interpretation,
    members: Vec<EdgeId>,
) -> Option<ClauseMatch<EdgeId>> {
    let index = &interp.predicate_map().edges;
    evaluate(
        clause,
        members,
        |e| index.contains(&clause.label, e),
        |e| interp.edge_world(e),
    )
}

/// Evaluate every clause in order, stopping at the first that fails.
fn evaluate_body(
    rule: &Rule,
    interp: &Interpretation,
    node_members: impl Fn() -> Vec<NodeId>,
    edge_members: impl Fn() -> Vec<EdgeId>,
    atom_trace: bool,
) -> Option<Body> {
    let mut out = Body::default();
    for clause in &rule.clauses {
        match clause.kind {
            ComponentKind::Node => {
                let m = node_clause(clause, interp, node_members())?;
                out.annotations.push(ClauseAnnotation {
                    intervals: m.intervals,
                    population: m.population,
                });
                if atom_trace {
                    out.groundings.push(ClauseGrounding::Nodes(m.qualified.clone()));
                }
                out.nodes.push(m.qualified);
            }
            ComponentKind::Edge => {
                let m = edge_clause(clause, interp, edge_members())?;
                out.annotations.push(ClauseAnnotation {
                    intervals: m.intervals,
                    population: m.population,
                });
                if atom_trace {
                    out.groundings.push(ClauseGrounding::Edges(m.qualified));
                }
                out.nodes.push(Vec::new());
            }
        }
    }
    Some(out)
}

fn ground_node(
    rule: &Rule,
    interp: &Interpretation,
    node: &NodeId,
    atom_trace: bool,
) -> Option<Grounding> {
    let world = interp.node_world(node)?;
    if !meets_criteria(rule, world) {
        return None;
    }
    if rule.edge_to_add.is_none() && world.get(&rule.target).is_some_and(|i| i.is_static()) {
        return None;
    }
    let graph = interp.graph();
    let body = evaluate_body(
        rule,
        interp,
        || graph.neighbors(node),
        || graph.out_edges(node),
        atom_trace,
    )?;
    let edges_to_add = match &rule.edge_to_add {
        Some(inference) => {
            let edges = inferred_edges(inference, node, &body.nodes);
            if edges.is_empty() {
                return None;
            }
            edges
        }
        None => Vec::new(),
    };
    Some(Grounding {
        component: Component::Node(node.clone()),
        bound: head_bound(rule, &body.annotations),
        edges_to_add,
        clause_groundings: body.groundings,
    })
}

fn ground_edge(
    rule: &Rule,
    interp: &Interpretation,
    edge: &EdgeId,
    atom_trace: bool,
) -> Option<Grounding> {
    let world = interp.edge_world(edge)?;
    if !meets_criteria(rule, world) || world.get(&rule.target).is_some_and(|i| i.is_static()) {
        return None;
    }
    let graph = interp.graph();
    let body = evaluate_body(
        rule,
        interp,
        || vec![edge.source.clone(), edge.target.clone()],
        || graph.out_edges(&edge.target),
        atom_trace,
    )?;
    Some(Grounding {
        component: Component::Edge(edge.clone()),
        bound: head_bound(rule, &body.annotations),
        edges_to_add: Vec::new(),
        clause_groundings: body.groundings,
    })
}

/// Cartesian product of the endpoint sets, without self-loops.
fn inferred_edges(
    inference: &EdgeInference,
    target: &NodeId,
    clause_nodes: &[Vec<NodeId>],
) -> Vec<EdgeId> {
    let resolve = |endpoint: Endpoint| -> Vec<NodeId> {
        match endpoint {
            Endpoint::Target => vec![target.clone()],
            Endpoint::Clause(i) => clause_nodes.get(i).cloned().unwrap_or_default(),
        }
    };
    let sources = resolve(inference.source);
    let targets = resolve(inference.target);
    let mut edges = Vec::with_capacity(sources.len() * targets.len());
    for s in &sources {
        for t in &targets {
            if s != t {
                edges.push(EdgeId::new(s.clone(), t.clone()));
            }
        }
    }
    edges
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphBuilder;
    use crate::ipl::Ipl;
    use crate::label::{Label, LabelSet};
    use crate::reasoner::config::ReasonerConfig;
    use crate::rules::annotation::AnnotationFn;
    use crate::rules::{Comparison, Quantifier, Threshold};
    use crate::interpretation::{UpdateContext, UpdateEnv};
    use crate::trace::RuleTrace;

    fn iv(l: f64, u: f64) -> Interval {
        Interval::closed(l, u).unwrap()
    }

    /// A -> {B, C, D}, plus E -> A.
    fn star() -> Interpretation {
        let graph = GraphBuilder::new()
            .edge("A", "B")
            .edge("A", "C")
            .edge("A", "D")
            .edge("E", "A")
            .build();
        Interpretation::new(graph, LabelSet::new().with_node_label("infected"))
    }

    fn set(interp: &mut Interpretation, node: &str, label: &str, bound: Interval) {
        let ipl = Ipl::new();
        let config = ReasonerConfig::default();
        interp
            .update(
                &Component::node(node),
                &Label::new(label),
                &bound,
                &UpdateEnv::new(&ipl, &config),
                &UpdateContext::fact("setup", 0, 0),
                &mut RuleTrace::new(),
            )
            .unwrap();
    }

    fn targets(groundings: &[Grounding]) -> Vec<String> {
        groundings.iter().map(|g| g.component.to_string()).collect()
    }

    #[test]
    fn number_total_threshold() {
        let mut interp = star();
        set(&mut interp, "B", "infected", Interval::TRUE);
        let rule = Rule::node("spread", "infected")
            .with_clause(
                Clause::node("infected", Interval::TRUE).with_threshold(Threshold::at_least(2)),
            )
            .with_bound(Interval::TRUE);

        assert!(ground(&rule, &interp, false, ExecutionMode::Sequential).is_empty());

        set(&mut interp, "C", "infected", Interval::TRUE);
        let found = ground(&rule, &interp, false, ExecutionMode::Sequential);
        assert_eq!(targets(&found), vec!["A"]);
        assert_eq!(found[0].bound, Interval::TRUE);
    }

    #[test]
    fn percent_available_threshold() {
        let mut interp = star();
        // Only B and C have ever been touched, so only they are available.
        set(&mut interp, "B", "infected", Interval::TRUE);
        set(&mut interp, "C", "infected", iv(0.0, 0.5));
        let half = Threshold::new(
            Comparison::GreaterEqual,
            Quantifier::Percent,
            Subset::Available,
            0.5,
        );
        let rule = Rule::node("spread", "infected")
            .with_clause(Clause::node("infected", Interval::TRUE).with_threshold(half))
            .with_bound(Interval::TRUE);
        assert_eq!(
            targets(&ground(&rule, &interp, false, ExecutionMode::Sequential)),
            vec!["A"]
        );

        // Over the total population (B, C, D) one of three is below half.
        let total = Threshold::new(
            Comparison::GreaterEqual,
            Quantifier::Percent,
            Subset::Total,
            0.5,
        );
        let rule = Rule::node("spread", "infected")
            .with_clause(Clause::node("infected", Interval::TRUE).with_threshold(total))
            .with_bound(Interval::TRUE);
        assert!(ground(&rule, &interp, false, ExecutionMode::Sequential).is_empty());
    }

    #[test]
    fn percent_of_empty_population_is_false() {
        let interp = star();
        let t = Threshold::new(
            Comparison::GreaterEqual,
            Quantifier::Percent,
            Subset::Available,
            0.0,
        );
        let rule = Rule::node("r", "infected")
            .with_clause(Clause::node("infected", Interval::UNKNOWN).with_threshold(t))
            .with_bound(Interval::TRUE);
        assert!(ground(&rule, &interp, false, ExecutionMode::Sequential).is_empty());
    }

    #[test]
    fn zero_clauses_apply_everywhere_matching_criteria() {
        let mut interp = star();
        set(&mut interp, "D", "vaccinated", Interval::TRUE);
        let rule = Rule::node("immune", "infected")
            .with_target_criterion("vaccinated", Interval::TRUE)
            .with_bound(Interval::FALSE);
        assert_eq!(
            targets(&ground(&rule, &interp, false, ExecutionMode::Sequential)),
            vec!["D"]
        );
    }

    #[test]
    fn annotation_head_and_clause_groundings() {
        let mut interp = star();
        set(&mut interp, "B", "risk", iv(0.2, 0.4));
        set(&mut interp, "C", "risk", iv(0.6, 0.8));
        let rule = Rule::node("avg", "risk")
            .with_clause(Clause::node("risk", iv(0.1, 1.0)))
            .with_annotation(AnnotationFn::Average);
        let found = ground(&rule, &interp, true, ExecutionMode::Sequential);
        assert_eq!(targets(&found), vec!["A"]);
        let b = found[0].bound;
        assert!((b.lower() - 0.4).abs() < 1e-9);
        assert!((b.upper() - 0.6).abs() < 1e-9);
        assert_eq!(
            found[0].clause_groundings,
            vec![ClauseGrounding::Nodes(vec![NodeId::new("B"), NodeId::new("C")])]
        );
    }

    #[test]
    fn edge_rule_ranges_over_endpoints_and_continuations() {
        let mut interp = star();
        set(&mut interp, "A", "infected", Interval::TRUE);
        // (E, A): node clause sees {E, A}; A is infected.
        let rule = Rule::edge("risky", "exposure")
            .with_clause(Clause::node("infected", Interval::TRUE))
            .with_bound(Interval::TRUE);
        let found = ground(&rule, &interp, false, ExecutionMode::Sequential);
        assert_eq!(targets(&found), vec!["(A,B)", "(A,C)", "(A,D)", "(E,A)"]);

        // Edge clause over continuation edges: only (E, A) continues (A -> *).
        let rule = Rule::edge("chain", "path").with_clause(
            Clause::edge("contact", Interval::UNKNOWN).with_threshold(Threshold::at_least(3)),
        );
        let mut interp = star();
        for e in [("A", "B"), ("A", "C"), ("A", "D")] {
            interp
                .update(
                    &Component::edge(e.0, e.1),
                    &Label::new("contact"),
                    &Interval::UNKNOWN,
                    &UpdateEnv::new(&Ipl::new(), &ReasonerConfig::default()),
                    &UpdateContext::fact("setup", 0, 0),
                    &mut RuleTrace::new(),
                )
                .unwrap();
        }
        let found = ground(&rule, &interp, false, ExecutionMode::Sequential);
        assert_eq!(targets(&found), vec!["(E,A)"]);
    }

    #[test]
    fn edge_inference_builds_cartesian_product() {
        let mut interp = star();
        set(&mut interp, "B", "infected", Interval::TRUE);
        set(&mut interp, "C", "infected", Interval::TRUE);
        let rule = Rule::node("link", "exposed_to")
            .with_clause(Clause::node("infected", Interval::TRUE))
            .with_edge_inference(EdgeInference {
                source: Endpoint::Target,
                target: Endpoint::Clause(0),
                label: Some(Label::new("inferred")),
            })
            .with_bound(Interval::TRUE);
        let found = ground(&rule, &interp, false, ExecutionMode::Sequential);
        assert_eq!(found.len(), 1);
        assert_eq!(
            found[0].edges_to_add,
            vec![EdgeId::new("A", "B"), EdgeId::new("A", "C")]
        );
    }

    #[test]
    fn parallel_matches_sequential() {
        let mut interp = star();
        set(&mut interp, "B", "infected", Interval::TRUE);
        set(&mut interp, "A", "infected", Interval::TRUE);
        let rule = Rule::node("spread", "infected")
            .with_clause(Clause::node("infected", Interval::TRUE))
            .with_bound(Interval::TRUE);
        assert_eq!(
            ground(&rule, &interp, true, ExecutionMode::Sequential),
            ground(&rule, &interp, true, ExecutionMode::Parallel)
        );
    }
}
