//! Benchmarks for grounding and full reasoning runs.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use kairos::facts::Fact;
use kairos::graph::{Component, Graph, GraphBuilder};
use kairos::grounding::ground;
use kairos::interval::Interval;
use kairos::ipl::Ipl;
use kairos::label::LabelSet;
use kairos::reasoner::Reasoner;
use kairos::reasoner::config::{ExecutionMode, ReasonerConfig};
use kairos::rules::{Clause, Rule};

fn random_graph(nodes: usize, rng: &mut StdRng) -> Graph {
    let name = |i: usize| format!("n{i}");
    let mut builder = GraphBuilder::new().nodes((0..nodes).map(name));
    for _ in 0..nodes * 4 {
        let s = rng.gen_range(0..nodes);
        let t = rng.gen_range(0..nodes);
        if s != t {
            builder = builder.edge(name(s), name(t));
        }
    }
    builder.build()
}

fn epidemic(nodes: usize, execution: ExecutionMode) -> Reasoner {
    let mut rng = StdRng::seed_from_u64(0);
    let graph = random_graph(nodes, &mut rng);
    let config = ReasonerConfig::default()
        .with_timesteps(5)
        .with_execution(execution);
    let mut r = Reasoner::new(graph, LabelSet::new().with_node_label("infected"), config).unwrap();
    r.set_ipl(Ipl::new().with_pair("infected", "healthy"));
    for i in 0..nodes / 20 {
        let node = rng.gen_range(0..nodes);
        r.add_fact(
            Fact::new(format!("seed-{i}"), Component::node(format!("n{node}")), "infected", Interval::TRUE)
                .static_fact(),
        )
        .unwrap();
    }
    r.add_rule(
        Rule::node("spread", "infected").with_clause(Clause::node("infected", Interval::TRUE)),
    )
    .unwrap();
    r
}

fn bench_ground(c: &mut Criterion) {
    let mut group = c.benchmark_group("ground_1k");
    let mut r = epidemic(1000, ExecutionMode::Sequential);
    // One timestep puts the seed facts in place.
    r.reason_again(1, Vec::new()).unwrap();
    let rule = r.rules()[0].clone();
    for execution in [ExecutionMode::Sequential, ExecutionMode::Parallel] {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{execution:?}")),
            &execution,
            |b, &execution| {
                b.iter(|| black_box(ground(&rule, r.interpretation(), false, execution)))
            },
        );
    }
    group.finish();
}

fn bench_reason(c: &mut Criterion) {
    let mut group = c.benchmark_group("reason");
    group.sample_size(20);
    for nodes in [200, 1000] {
        group.bench_with_input(BenchmarkId::new("sequential", nodes), &nodes, |b, &n| {
            b.iter(|| black_box(epidemic(n, ExecutionMode::Sequential).reason().unwrap()))
        });
        group.bench_with_input(BenchmarkId::new("parallel", nodes), &nodes, |b, &n| {
            b.iter(|| black_box(epidemic(n, ExecutionMode::Parallel).reason().unwrap()))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_ground, bench_reason);
criterion_main!(benches);
