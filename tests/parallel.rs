//! Sequential and parallel grounding must be indistinguishable.
//!
//! Random (but seeded) graphs, facts and rules are reasoned over in every
//! execution mode; worlds, `num_ga` and the exported trace must match exactly.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use kairos::export::trace_rows;
use kairos::facts::Fact;
use kairos::graph::{Component, GraphBuilder};
use kairos::interval::Interval;
use kairos::ipl::Ipl;
use kairos::label::LabelSet;
use kairos::reasoner::config::{ExecutionMode, ReasonerConfig};
use kairos::reasoner::{Reasoner, ReasoningOutcome};
use kairos::rules::annotation::AnnotationFn;
use kairos::rules::{
    Clause, Comparison, EdgeInference, Endpoint, Quantifier, Rule, Subset, Threshold,
};

const NODES: usize = 40;

fn random_interval(rng: &mut StdRng) -> Interval {
    let a: f64 = rng.gen_range(0.0..=1.0);
    let b: f64 = rng.gen_range(0.0..=1.0);
    Interval::clamped(a.min(b), a.max(b))
}

fn random_reasoner(seed: u64, config: ReasonerConfig) -> Reasoner {
    let mut rng = StdRng::seed_from_u64(seed);
    let name = |i: usize| format!("n{i}");

    let mut builder = GraphBuilder::new().nodes((0..NODES).map(name));
    for _ in 0..NODES * 3 {
        let s = rng.gen_range(0..NODES);
        let t = rng.gen_range(0..NODES);
        if s != t {
            builder = builder.edge(name(s), name(t));
        }
    }
    let labels = LabelSet::new()
        .with_node_label("infected")
        .with_node_label("risk")
        .with_edge_label("contact");

    let mut r = Reasoner::new(builder.build(), labels, config).unwrap();
    r.set_ipl(Ipl::new().with_pair("infected", "healthy"));

    for i in 0..NODES {
        if rng.gen_bool(0.2) {
            let t = rng.gen_range(0..3);
            r.add_fact(
                Fact::new(format!("seed-{i}"), Component::node(name(i)), "infected", Interval::TRUE)
                    .during(t, t + 1),
            )
            .unwrap();
        }
        if rng.gen_bool(0.5) {
            r.add_fact(
                Fact::new(format!("risk-{i}"), Component::node(name(i)), "risk", random_interval(&mut rng))
                    .static_fact(),
            )
            .unwrap();
        }
    }

    r.add_rule(
        Rule::node("spread", "infected").with_clause(Clause::node("infected", Interval::TRUE)),
    )
    .unwrap();
    r.add_rule(
        Rule::node("hotspot", "alert")
            .with_clause(Clause::node("infected", Interval::TRUE).with_threshold(Threshold::new(
                Comparison::GreaterEqual,
                Quantifier::Percent,
                Subset::Available,
                0.5,
            )))
            .immediate(),
    )
    .unwrap();
    r.add_rule(
        Rule::node("mean-risk", "exposure")
            .with_clause(Clause::node("risk", Interval::closed(0.2, 1.0).unwrap()))
            .with_annotation(AnnotationFn::Average)
            .with_delta_t(0),
    )
    .unwrap();
    r.add_rule(
        Rule::edge("contact-risk", "contact")
            .with_clause(Clause::node("infected", Interval::TRUE))
            .with_delta_t(0),
    )
    .unwrap();
    r.add_rule(
        Rule::node("trace-back", "traced")
            .with_clause(Clause::node("alert", Interval::TRUE))
            .with_edge_inference(EdgeInference {
                source: Endpoint::Target,
                target: Endpoint::Clause(0),
                label: Some("link".into()),
            })
            .with_delta_t(1),
    )
    .unwrap();
    r
}

fn run(seed: u64, execution: ExecutionMode, threads: Option<usize>) -> ReasoningOutcome {
    let mut config = ReasonerConfig::default()
        .with_timesteps(6)
        .with_atom_trace(true)
        .with_history(true)
        .with_execution(execution);
    config.threads = threads;
    random_reasoner(seed, config).reason().unwrap()
}

fn assert_same(a: &ReasoningOutcome, b: &ReasoningOutcome) {
    assert_eq!(a.timesteps, b.timesteps);
    assert_eq!(a.converged_early, b.converged_early);
    assert_eq!(a.num_ga, b.num_ga);
    assert_eq!(a.history, b.history);
    assert_eq!(trace_rows(&a.trace), trace_rows(&b.trace));
    assert_eq!(
        a.interpretation.graph().edges(),
        b.interpretation.graph().edges()
    );
}

#[test]
fn parallel_matches_sequential() {
    for seed in [1, 7, 42] {
        let seq = run(seed, ExecutionMode::Sequential, None);
        let par = run(seed, ExecutionMode::Parallel, None);
        assert!(!seq.trace.is_empty(), "seed {seed} produced no trace");
        assert_same(&seq, &par);
    }
}

#[test]
fn dedicated_pool_matches_sequential() {
    let seq = run(99, ExecutionMode::Sequential, None);
    let pooled = run(99, ExecutionMode::Parallel, Some(4));
    assert_same(&seq, &pooled);
}

#[test]
fn repeated_runs_are_deterministic() {
    let a = run(3, ExecutionMode::Parallel, Some(2));
    let b = run(3, ExecutionMode::Parallel, Some(2));
    assert_same(&a, &b);
}
