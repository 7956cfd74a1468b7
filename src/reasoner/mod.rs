//! Fixed-point scheduler.
//!
//! The [`Reasoner`] owns the interpretation, the rules, facts and IPL, and
//! drives them through discrete timesteps. Each timestep:
//!
//! 1. resets non-static intervals (unless the run is persistent),
//! 2. applies the facts active at `t`,
//! 3. commits firings scheduled for `t` by delayed rules,
//! 4. iterates `delta_t = 0` rules until the convergence criterion holds,
//! 5. grounds delayed rules against the converged state and schedules them,
//! 6. records `num_ga[t]` and, optionally, a snapshot.
//!
//! Grounding is read-only and commits happen on one thread in rule order then
//! discovery order, so sequential and parallel runs are indistinguishable.

pub mod config;

use std::collections::BTreeMap;

use crate::error::{ConfigError, KairosResult};
use crate::facts::Fact;
use crate::graph::{Component, Graph};
use crate::grounding::{Grounding, ground};
use crate::interpretation::{
    InconsistencyReport, Interpretation, Snapshot, UpdateContext, UpdateEnv, UpdateOutcome,
    UpdateSource,
};
use crate::interval::Interval;
use crate::ipl::Ipl;
use crate::label::{Label, LabelSet};
use crate::rules::Rule;
use crate::trace::RuleTrace;

use self::config::{ConvergenceMode, ExecutionMode, FactUpdateMode, ReasonerConfig};

/// What a call to [`Reasoner::reason`] or [`Reasoner::reason_again`] produced.
#[derive(Debug, Clone)]
pub struct ReasoningOutcome {
    /// Final state of every world.
    pub interpretation: Interpretation,
    /// One snapshot per computed timestep when history retention is on.
    pub history: Vec<Snapshot>,
    pub trace: RuleTrace,
    /// Ground atoms present at the end of each computed timestep.
    pub num_ga: Vec<usize>,
    /// Timesteps computed so far, across all calls.
    pub timesteps: usize,
    /// The run stopped before its horizon because nothing was left to do.
    pub converged_early: bool,
    /// Set when an inconsistency stopped the run under the abort policy.
    pub halted: Option<InconsistencyReport>,
}

/// A delayed grounding waiting for its timestep.
#[derive(Debug, Clone)]
struct Firing {
    rule: usize,
    grounding: Grounding,
}

/// Change accumulated over a fixed-point iteration or a whole timestep.
#[derive(Debug, Clone, Copy, Default)]
struct Progress {
    changed: bool,
    /// Changed atoms (only counted in delta-interpretation mode).
    atoms: f64,
    max_delta: f64,
}

impl Progress {
    fn absorb(&mut self, outcome: &UpdateOutcome) {
        self.changed |= outcome.changed;
        self.atoms += outcome.delta;
        self.max_delta = self.max_delta.max(outcome.delta);
    }

    fn merge(&mut self, other: Progress) {
        self.changed |= other.changed;
        self.atoms += other.atoms;
        self.max_delta = self.max_delta.max(other.max_delta);
    }

    /// Fixed-point criterion for one iteration.
    fn converged(&self, mode: ConvergenceMode) -> bool {
        match mode {
            ConvergenceMode::PerfectConvergence => !self.changed,
            ConvergenceMode::DeltaInterpretation { threshold } => self.atoms <= threshold as f64,
            ConvergenceMode::DeltaBound { threshold } => self.max_delta <= threshold,
        }
    }

    /// Criterion for stopping the whole run once nothing is pending.
    fn settled(&self, mode: ConvergenceMode) -> bool {
        match mode {
            ConvergenceMode::PerfectConvergence => true,
            _ => self.converged(mode),
        }
    }
}

fn aborted(outcome: &UpdateOutcome) -> Option<InconsistencyReport> {
    outcome.inconsistency.clone().filter(|r| !r.resolved)
}

/// The temporal reasoner.
pub struct Reasoner {
    config: ReasonerConfig,
    interpretation: Interpretation,
    rules: Vec<Rule>,
    facts: Vec<Fact>,
    ipl: Ipl,
    trace: RuleTrace,
    history: Vec<Snapshot>,
    num_ga: Vec<usize>,
    pending: BTreeMap<usize, Vec<Firing>>,
    next_t: usize,
    pool: Option<rayon::ThreadPool>,
}

impl Reasoner {
    /// Create a reasoner over `graph`, seeding worlds from `labels`.
    pub fn new(graph: Graph, labels: LabelSet, config: ReasonerConfig) -> KairosResult<Self> {
        config.validate()?;
        let pool = match (config.execution, config.threads) {
            (ExecutionMode::Parallel, Some(n)) => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(n)
                    .build()
                    .map_err(|e| ConfigError::InvalidConfig {
                        message: format!("failed to build thread pool: {e}"),
                    })?,
            ),
            _ => None,
        };
        tracing::debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            convergence = config.convergence.name(),
            "reasoner created"
        );
        Ok(Self {
            interpretation: Interpretation::new(graph, labels),
            config,
            rules: Vec::new(),
            facts: Vec::new(),
            ipl: Ipl::new(),
            trace: RuleTrace::new(),
            history: Vec::new(),
            num_ga: Vec::new(),
            pending: BTreeMap::new(),
            next_t: 0,
            pool,
        })
    }

    /// Add a rule after validating it.
    pub fn add_rule(&mut self, rule: Rule) -> KairosResult<()> {
        rule.validate()?;
        self.rules.push(rule);
        Ok(())
    }

    /// Add a fact after validating it.
    pub fn add_fact(&mut self, fact: Fact) -> KairosResult<()> {
        fact.validate()?;
        self.facts.push(fact);
        Ok(())
    }

    pub fn set_ipl(&mut self, ipl: Ipl) {
        self.ipl = ipl;
    }

    pub fn config(&self) -> &ReasonerConfig {
        &self.config
    }

    pub fn interpretation(&self) -> &Interpretation {
        &self.interpretation
    }

    pub fn trace(&self) -> &RuleTrace {
        &self.trace
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn facts(&self) -> &[Fact] {
        &self.facts
    }

    /// Reason over timesteps `0..=config.timesteps`.
    pub fn reason(&mut self) -> KairosResult<ReasoningOutcome> {
        let start = self.next_t;
        let horizon = start + self.config.timesteps;
        self.run(start, horizon)
    }

    /// Continue from the current state for `extra_timesteps` more timesteps.
    ///
    /// `new_facts` have their windows shifted to start at the first new
    /// timestep, so `t_lower = 0` means "right away". Delayed firings queued
    /// past the previous horizon fire on schedule.
    pub fn reason_again(
        &mut self,
        extra_timesteps: usize,
        new_facts: Vec<Fact>,
    ) -> KairosResult<ReasoningOutcome> {
        let start = self.next_t;
        for mut fact in new_facts {
            fact.t_lower += start;
            fact.t_upper += start;
            self.add_fact(fact)?;
        }
        if extra_timesteps == 0 {
            return Ok(self.outcome(false, None));
        }
        self.run(start, start + extra_timesteps - 1)
    }

    fn outcome(&self, converged_early: bool, halted: Option<InconsistencyReport>) -> ReasoningOutcome {
        ReasoningOutcome {
            interpretation: self.interpretation.clone(),
            history: self.history.clone(),
            trace: self.trace.clone(),
            num_ga: self.num_ga.clone(),
            timesteps: self.num_ga.len(),
            converged_early,
            halted,
        }
    }

    fn run(&mut self, start: usize, tmax: usize) -> KairosResult<ReasoningOutcome> {
        tracing::info!(
            start,
            tmax,
            rules = self.rules.len(),
            facts = self.facts.len(),
            convergence = self.config.convergence.name(),
            "reasoning started"
        );

        let mut converged_early = false;
        for t in start..=tmax {
            let progress = match self.timestep(t, tmax)? {
                Ok(progress) => progress,
                Err(report) => {
                    tracing::warn!(t, %report, "reasoning halted");
                    return Ok(self.outcome(false, Some(report)));
                }
            };

            self.num_ga.push(self.interpretation.num_ground_atoms());
            if self.config.retain_history {
                self.history.push(self.interpretation.snapshot(t));
            }
            self.next_t = t + 1;
            tracing::debug!(
                t,
                changed = progress.changed,
                max_delta = progress.max_delta,
                num_ga = self.interpretation.num_ground_atoms(),
                "timestep complete"
            );

            if t < tmax
                && !self.has_pending_between(t, tmax)
                && progress.settled(self.config.convergence)
            {
                tracing::info!(t, "converged early");
                converged_early = true;
                break;
            }
        }

        tracing::info!(
            timesteps = self.num_ga.len(),
            trace_entries = self.trace.len(),
            converged_early,
            "reasoning finished"
        );
        Ok(self.outcome(converged_early, None))
    }

    /// Whether any fact window or scheduled firing falls in `(t, tmax]`.
    fn has_pending_between(&self, t: usize, tmax: usize) -> bool {
        let facts = self.facts.iter().any(|f| {
            let from = f.t_lower.max(t + 1);
            from <= tmax && (f.t_lower > t || f.last_timestep().is_some_and(|u| u >= from))
        });
        facts || self.pending.range(t + 1..=tmax).next().is_some()
    }

    /// Compute one timestep. The inner `Err` carries an aborting inconsistency.
    fn timestep(
        &mut self,
        t: usize,
        tmax: usize,
    ) -> KairosResult<Result<Progress, InconsistencyReport>> {
        if t > 0 && !self.config.persistent {
            self.interpretation.reset_timestep();
        }

        let mut total = Progress::default();

        match self.apply_facts(t)? {
            Ok(p) => total.merge(p),
            Err(report) => return Ok(Err(report)),
        }

        if let Some(firings) = self.pending.remove(&t) {
            for firing in firings {
                let mut p = Progress::default();
                if let Err(report) = self.commit(firing.rule, &firing.grounding, t, 0, &mut p)? {
                    return Ok(Err(report));
                }
                total.merge(p);
            }
        }

        let mut iterations = 0;
        loop {
            iterations += 1;
            let step = match self.iterate(t, iterations)? {
                Ok(step) => step,
                Err(report) => return Ok(Err(report)),
            };
            total.merge(step);
            tracing::trace!(
                t,
                iteration = iterations,
                changed = step.changed,
                atoms = step.atoms,
                max_delta = step.max_delta,
                "fixed-point iteration"
            );
            if step.converged(self.config.convergence) {
                break;
            }
            if iterations >= self.config.max_fixed_point_iterations {
                tracing::warn!(
                    t,
                    iterations,
                    "fixed-point iteration cap reached without convergence"
                );
                break;
            }
        }

        self.schedule_delayed(t, tmax);
        Ok(Ok(total))
    }

    fn apply_facts(&mut self, t: usize) -> KairosResult<Result<Progress, InconsistencyReport>> {
        let env = UpdateEnv::new(&self.ipl, &self.config);
        let override_bounds = self.config.fact_update == FactUpdateMode::Override;
        let mut progress = Progress::default();
        let ordered = self
            .facts
            .iter()
            .filter(|f| f.graph_attribute)
            .chain(self.facts.iter().filter(|f| !f.graph_attribute));
        for fact in ordered.filter(|f| f.is_active(t)) {
            let source = if fact.graph_attribute {
                UpdateSource::GraphAttributeFact
            } else {
                UpdateSource::Fact
            };
            let ctx = UpdateContext::fact(&fact.name, t, 0)
                .with_source(source)
                .with_static(fact.is_static)
                .with_override(override_bounds);
            let outcome = self.interpretation.update(
                &fact.target,
                &fact.label,
                &fact.bound,
                &env,
                &ctx,
                &mut self.trace,
            )?;
            if let Some(report) = aborted(&outcome) {
                return Ok(Err(report));
            }
            progress.absorb(&outcome);
        }
        Ok(Ok(progress))
    }

    /// One fixed-point iteration over the `delta_t = 0` rules.
    fn iterate(
        &mut self,
        t: usize,
        fp_op: usize,
    ) -> KairosResult<Result<Progress, InconsistencyReport>> {
        let mut progress = Progress::default();

        for i in 0..self.rules.len() {
            if !self.rules[i].immediate {
                continue;
            }
            for grounding in self.ground_rule(i) {
                if let Err(report) = self.commit(i, &grounding, t, fp_op, &mut progress)? {
                    return Ok(Err(report));
                }
            }
        }

        let batch: Vec<(usize, Vec<Grounding>)> = (0..self.rules.len())
            .filter(|&i| !self.rules[i].immediate && self.rules[i].delta_t == 0)
            .map(|i| (i, self.ground_rule(i)))
            .collect();
        for (i, groundings) in batch {
            for grounding in &groundings {
                if let Err(report) = self.commit(i, grounding, t, fp_op, &mut progress)? {
                    return Ok(Err(report));
                }
            }
        }

        Ok(Ok(progress))
    }

    /// Ground delayed rules against the converged state at `t`.
    ///
    /// Firings landing past `tmax` stay queued for a later call to
    /// [`reason_again`](Self::reason_again); they never fire in this run.
    fn schedule_delayed(&mut self, t: usize, tmax: usize) {
        for i in 0..self.rules.len() {
            let delta_t = self.rules[i].delta_t;
            if delta_t == 0 {
                continue;
            }
            let groundings = self.ground_rule(i);
            if groundings.is_empty() {
                continue;
            }
            tracing::trace!(
                t,
                rule = %self.rules[i].name,
                count = groundings.len(),
                fires_at = t + delta_t,
                beyond_horizon = t + delta_t > tmax,
                "scheduled delayed groundings"
            );
            self.pending
                .entry(t + delta_t)
                .or_default()
                .extend(groundings.into_iter().map(|grounding| Firing { rule: i, grounding }));
        }
    }

    fn ground_rule(&self, i: usize) -> Vec<Grounding> {
        let rule = &self.rules[i];
        let atom_trace = self.config.atom_trace;
        let execution = self.config.execution;
        match &self.pool {
            Some(pool) => pool.install(|| ground(rule, &self.interpretation, atom_trace, execution)),
            None => ground(rule, &self.interpretation, atom_trace, execution),
        }
    }

    /// Commit one grounding of rule `i`, creating inferred edges first.
    fn commit(
        &mut self,
        i: usize,
        grounding: &Grounding,
        t: usize,
        fp_op: usize,
        progress: &mut Progress,
    ) -> KairosResult<Result<(), InconsistencyReport>> {
        let rule = &self.rules[i];
        let env = UpdateEnv::new(&self.ipl, &self.config);
        let ctx = UpdateContext::rule(&rule.name, t, fp_op, &grounding.clause_groundings)
            .with_static(rule.is_static);

        let mut updates: Vec<(Component, &Label, Interval)> = Vec::new();
        if grounding.edges_to_add.is_empty() {
            updates.push((grounding.component.clone(), &rule.target, grounding.bound));
        } else {
            let marker = rule.edge_to_add.as_ref().and_then(|e| e.label.as_ref());
            for edge in &grounding.edges_to_add {
                if self.interpretation.add_edge(edge.clone())? {
                    tracing::trace!(t, rule = %rule.name, %edge, "edge inferred");
                }
                let component = Component::Edge(edge.clone());
                if let Some(marker) = marker {
                    updates.push((component.clone(), marker, Interval::TRUE));
                }
                updates.push((component, &rule.target, grounding.bound));
            }
        }

        for (component, label, bound) in updates {
            let outcome =
                self.interpretation
                    .update(&component, label, &bound, &env, &ctx, &mut self.trace)?;
            if let Some(report) = aborted(&outcome) {
                return Ok(Err(report));
            }
            progress.absorb(&outcome);
        }
        Ok(Ok(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphBuilder;
    use crate::rules::Clause;

    fn pair() -> Reasoner {
        let graph = GraphBuilder::new().edge("A", "B").build();
        let labels = LabelSet::new().with_node_label("infected");
        Reasoner::new(graph, labels, ReasonerConfig::default().with_timesteps(3)).unwrap()
    }

    #[test]
    fn delayed_rule_fires_one_step_later() {
        let mut r = pair();
        r.add_fact(Fact::new("seed", Component::node("B"), "infected", Interval::TRUE))
            .unwrap();
        r.add_rule(
            Rule::node("spread", "infected").with_clause(Clause::node("infected", Interval::TRUE)),
        )
        .unwrap();
        let out = r.reason().unwrap();
        assert!(out.halted.is_none());
        // Facts hold at t = 0 only, so A is infected at t = 1 and the run
        // settles after that.
        assert!(out.converged_early);
        assert_eq!(out.timesteps, 2);
        assert!(out.interpretation.query(
            &Component::node("A"),
            &Label::new("infected"),
            &Interval::TRUE
        ));
    }

    #[test]
    fn immediate_rules_fire_within_the_timestep() {
        let mut r = pair();
        r.add_fact(Fact::new("seed", Component::node("B"), "infected", Interval::TRUE))
            .unwrap();
        r.add_rule(
            Rule::node("spread", "infected")
                .with_clause(Clause::node("infected", Interval::TRUE))
                .immediate(),
        )
        .unwrap();
        let out = r.reason().unwrap();
        assert_eq!(out.timesteps, 1);
        assert!(out.interpretation.query(
            &Component::node("A"),
            &Label::new("infected"),
            &Interval::TRUE
        ));
    }

    #[test]
    fn invalid_rule_is_rejected() {
        let mut r = pair();
        let bad = Rule::node("bad", "infected").with_weights(vec![1.0, 2.0, 3.0]);
        assert!(r.add_rule(bad).is_err());
        assert!(r.rules().is_empty());
    }

    #[test]
    fn progress_criteria() {
        let mut p = Progress::default();
        assert!(p.converged(ConvergenceMode::PerfectConvergence));
        p.absorb(&UpdateOutcome {
            changed: true,
            delta: 0.04,
            inconsistency: None,
        });
        assert!(!p.converged(ConvergenceMode::PerfectConvergence));
        assert!(p.converged(ConvergenceMode::DeltaBound { threshold: 0.05 }));
        assert!(!p.converged(ConvergenceMode::DeltaBound { threshold: 0.01 }));
        assert!(p.settled(ConvergenceMode::PerfectConvergence));
    }
}
