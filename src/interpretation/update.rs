//! Update and consistency engine.
//!
//! [`Interpretation::update`] is the only way bounds enter a world. One call
//! commits a label, propagates complements to its IPL partners, applies the
//! configured [`InconsistencyPolicy`] when something cannot hold, appends to
//! the predicate map and the trace, and reports the convergence delta.

use crate::error::{GraphError, KairosResult};
use crate::graph::Component;
use crate::interval::Interval;
use crate::ipl::Ipl;
use crate::label::Label;
use crate::reasoner::config::{ConvergenceMode, InconsistencyPolicy, ReasonerConfig};
use crate::trace::{ClauseGrounding, RuleTrace, TraceEntry, TriggeredBy};
use crate::world::{Merge, World};

use super::Interpretation;

/// Where a bound came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateSource {
    Fact,
    /// A fact derived from a graph attribute; traced only when
    /// `graph_attribute_trace` is on.
    GraphAttributeFact,
    Rule,
}

impl UpdateSource {
    fn triggered_by(self) -> TriggeredBy {
        match self {
            Self::Rule => TriggeredBy::Rule,
            Self::Fact | Self::GraphAttributeFact => TriggeredBy::Fact,
        }
    }
}

/// What to do when the target component has no world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OnMissing {
    /// Report no change.
    #[default]
    Ignore,
    /// Fail with [`GraphError::UnknownComponent`].
    Error,
}

/// Run-wide settings shared by every update.
#[derive(Debug, Clone, Copy)]
pub struct UpdateEnv<'a> {
    pub ipl: &'a Ipl,
    pub convergence: ConvergenceMode,
    pub policy: InconsistencyPolicy,
    pub atom_trace: bool,
    pub graph_attribute_trace: bool,
}

impl<'a> UpdateEnv<'a> {
    pub fn new(ipl: &'a Ipl, config: &ReasonerConfig) -> Self {
        Self {
            ipl,
            convergence: config.convergence,
            policy: config.inconsistency,
            atom_trace: config.atom_trace,
            graph_attribute_trace: config.graph_attribute_trace,
        }
    }

    fn traces(&self, source: UpdateSource) -> bool {
        self.atom_trace && (source != UpdateSource::GraphAttributeFact || self.graph_attribute_trace)
    }
}

/// Per-update details.
#[derive(Debug, Clone, Copy)]
pub struct UpdateContext<'a> {
    pub t: usize,
    pub fp_op: usize,
    pub source: UpdateSource,
    /// Name of the fact or rule, copied into trace entries.
    pub name: &'a str,
    /// Mark the label static after a successful write.
    pub is_static: bool,
    /// Write the bound as-is and skip consistency checks.
    pub override_bounds: bool,
    pub on_missing: OnMissing,
    pub clause_groundings: &'a [ClauseGrounding],
}

impl<'a> UpdateContext<'a> {
    pub fn fact(name: &'a str, t: usize, fp_op: usize) -> Self {
        Self {
            t,
            fp_op,
            source: UpdateSource::Fact,
            name,
            is_static: false,
            override_bounds: false,
            on_missing: OnMissing::Ignore,
            clause_groundings: &[],
        }
    }

    pub fn rule(
        name: &'a str,
        t: usize,
        fp_op: usize,
        clause_groundings: &'a [ClauseGrounding],
    ) -> Self {
        Self {
            t,
            fp_op,
            source: UpdateSource::Rule,
            name,
            is_static: false,
            override_bounds: false,
            on_missing: OnMissing::Error,
            clause_groundings,
        }
    }

    pub fn with_source(mut self, source: UpdateSource) -> Self {
        self.source = source;
        self
    }

    pub fn with_static(mut self, is_static: bool) -> Self {
        self.is_static = is_static;
        self
    }

    pub fn with_override(mut self, override_bounds: bool) -> Self {
        self.override_bounds = override_bounds;
        self
    }

    pub fn with_on_missing(mut self, on_missing: OnMissing) -> Self {
        self.on_missing = on_missing;
        self
    }
}

/// A bound that could not hold together with the stored state.
#[derive(Debug, Clone, PartialEq)]
pub struct InconsistencyReport {
    pub component: Component,
    /// The label being updated.
    pub label: Label,
    /// The label whose stored interval clashed: `label` itself or an IPL partner.
    pub conflicting_label: Label,
    pub existing: Interval,
    pub incoming: Interval,
    /// `true` if the policy resolved or overrode the conflict, `false` if the
    /// update was aborted.
    pub resolved: bool,
}

impl std::fmt::Display for InconsistencyReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "inconsistency on {}: {} {} cannot hold with {} {}",
            self.component, self.label, self.incoming, self.conflicting_label, self.existing
        )
    }
}

/// Result of one [`Interpretation::update`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateOutcome {
    pub changed: bool,
    /// Convergence measure of this update; meaning depends on [`ConvergenceMode`].
    pub delta: f64,
    pub inconsistency: Option<InconsistencyReport>,
}

impl UpdateOutcome {
    pub fn unchanged() -> Self {
        Self {
            changed: false,
            delta: 0.0,
            inconsistency: None,
        }
    }

    /// Whether the update was refused under [`InconsistencyPolicy::Abort`].
    pub fn is_aborted(&self) -> bool {
        self.inconsistency.as_ref().is_some_and(|r| !r.resolved)
    }
}

/// One atom written during an update.
struct Change {
    label: Label,
    old: Interval,
    new: Interval,
    triggered_by: TriggeredBy,
    consistent: bool,
}

fn delta_of(mode: ConvergenceMode, world: &World, changes: &[Change]) -> f64 {
    match mode {
        ConvergenceMode::PerfectConvergence => 0.0,
        ConvergenceMode::DeltaInterpretation { .. } => changes.len() as f64,
        ConvergenceMode::DeltaBound { .. } => changes
            .iter()
            .map(|c| {
                let current = world.bound(&c.label);
                current.max_distance(&current.previous())
            })
            .fold(0.0, f64::max),
    }
}

impl Interpretation {
    /// Merge `bound` into `label` on `component`.
    ///
    /// Static labels are frozen: updating one is a no-op. A label missing
    /// from the world is inserted at `[0, 1]` first.
    pub fn update(
        &mut self,
        component: &Component,
        label: &Label,
        bound: &Interval,
        env: &UpdateEnv<'_>,
        ctx: &UpdateContext<'_>,
        trace: &mut RuleTrace,
    ) -> KairosResult<UpdateOutcome> {
        let partners: Vec<Label> = env.ipl.partners(label).cloned().collect();
        let Some(world) = self.world_mut(component) else {
            return match ctx.on_missing {
                OnMissing::Ignore => Ok(UpdateOutcome::unchanged()),
                OnMissing::Error => Err(GraphError::UnknownComponent {
                    component: component.to_string(),
                }
                .into()),
            };
        };

        if world.get(label).is_some_and(|i| i.is_static()) {
            return Ok(UpdateOutcome::unchanged());
        }

        let mut report = None;
        let changes = if ctx.override_bounds {
            force_write(world, label, bound, &partners, ctx.source.triggered_by())
        } else {
            match check(world, component, label, bound, &partners) {
                Ok(None) => {
                    world.add_label(label.clone());
                    if ctx.is_static {
                        set_static(world, label);
                    }
                    return Ok(UpdateOutcome::unchanged());
                }
                Ok(Some(proposed)) => {
                    merge(world, label, &proposed, &partners, ctx.source.triggered_by())
                }
                Err(conflict) => match env.policy {
                    InconsistencyPolicy::Abort => {
                        tracing::warn!(
                            t = ctx.t,
                            source = ctx.name,
                            %conflict,
                            "inconsistency, aborting"
                        );
                        return Ok(UpdateOutcome {
                            changed: false,
                            delta: 0.0,
                            inconsistency: Some(conflict),
                        });
                    }
                    InconsistencyPolicy::Override => {
                        tracing::warn!(
                            t = ctx.t,
                            source = ctx.name,
                            %conflict,
                            "inconsistency, overriding"
                        );
                        report = Some(InconsistencyReport {
                            resolved: true,
                            ..conflict
                        });
                        force_write(world, label, bound, &partners, ctx.source.triggered_by())
                    }
                    InconsistencyPolicy::Resolve => {
                        tracing::warn!(
                            t = ctx.t,
                            source = ctx.name,
                            %conflict,
                            "inconsistency, resetting to [0,1]"
                        );
                        let reset = resolve(world, label, &partners, ctx.source.triggered_by());
                        let delta = delta_of(env.convergence, world, &reset);
                        self.commit(component, &reset, conflict_message(&conflict), env, ctx, trace);
                        return Ok(UpdateOutcome {
                            changed: !reset.is_empty(),
                            delta,
                            inconsistency: Some(InconsistencyReport {
                                resolved: true,
                                ..conflict
                            }),
                        });
                    }
                },
            }
        };

        if ctx.is_static {
            set_static(world, label);
        }
        let delta = delta_of(env.convergence, world, &changes);
        self.commit(component, &changes, String::new(), env, ctx, trace);
        Ok(UpdateOutcome {
            changed: !changes.is_empty(),
            delta,
            inconsistency: report,
        })
    }

    /// Index and trace committed changes.
    fn commit(
        &mut self,
        component: &Component,
        changes: &[Change],
        message: String,
        env: &UpdateEnv<'_>,
        ctx: &UpdateContext<'_>,
        trace: &mut RuleTrace,
    ) {
        for change in changes.iter().filter(|c| c.consistent) {
            self.record_change(component, &change.label);
        }
        if !env.traces(ctx.source) {
            return;
        }
        for change in changes {
            let clause_groundings = if change.triggered_by == TriggeredBy::Ipl {
                Vec::new()
            } else {
                ctx.clause_groundings.to_vec()
            };
            trace.push(TraceEntry {
                t: ctx.t,
                fp_op: ctx.fp_op,
                component: component.clone(),
                label: change.label.clone(),
                old_bound: change.old,
                new_bound: change.new,
                consistent: change.consistent,
                triggered_by: change.triggered_by,
                name: ctx.name.to_string(),
                message: message.clone(),
                clause_groundings,
            });
        }
    }
}

fn conflict_message(conflict: &InconsistencyReport) -> String {
    format!(
        "{conflict}; {} and its IPL partners reset to [0,1]",
        conflict.label
    )
}

fn set_static(world: &mut World, label: &Label) {
    if let Some(interval) = world.get_mut(label) {
        interval.set_static(true);
    }
}

/// The merged interval for `label`, `None` if nothing would change, or the
/// first conflict found with the stored value or an IPL partner.
fn check(
    world: &World,
    component: &Component,
    label: &Label,
    bound: &Interval,
    partners: &[Label],
) -> Result<Option<Interval>, InconsistencyReport> {
    let conflict = |conflicting: &Label, existing: Interval, incoming: Interval| {
        InconsistencyReport {
            component: component.clone(),
            label: label.clone(),
            conflicting_label: conflicting.clone(),
            existing,
            incoming,
            resolved: false,
        }
    };
    let proposed = match world.preview(label, bound) {
        Merge::Unchanged => return Ok(None),
        Merge::Changed { new, .. } => new,
        Merge::Inconsistent { existing, incoming } => {
            return Err(conflict(label, existing, incoming));
        }
    };
    let complement = proposed.complement();
    for partner in partners {
        if let Merge::Inconsistent { existing, .. } = world.preview(partner, &complement) {
            return Err(conflict(partner, existing, complement));
        }
    }
    Ok(Some(proposed))
}

fn merge(
    world: &mut World,
    label: &Label,
    proposed: &Interval,
    partners: &[Label],
    triggered_by: TriggeredBy,
) -> Vec<Change> {
    let mut changes = Vec::with_capacity(1 + partners.len());
    if let Merge::Changed { old, new } = world.update(label, proposed) {
        changes.push(Change {
            label: label.clone(),
            old,
            new,
            triggered_by,
            consistent: true,
        });
    }
    let complement = proposed.complement();
    for partner in partners {
        if world.get(partner).is_some_and(|i| i.is_static()) {
            continue;
        }
        world.add_label(partner.clone());
        if let Merge::Changed { old, new } = world.update(partner, &complement) {
            changes.push(Change {
                label: partner.clone(),
                old,
                new,
                triggered_by: TriggeredBy::Ipl,
                consistent: true,
            });
        }
    }
    changes
}

/// Write `bound` unchecked and the exact complement onto each non-static
/// partner.
fn force_write(
    world: &mut World,
    label: &Label,
    bound: &Interval,
    partners: &[Label],
    triggered_by: TriggeredBy,
) -> Vec<Change> {
    let mut changes = Vec::with_capacity(1 + partners.len());
    let complement = bound.complement();
    let targets = std::iter::once((label, bound, triggered_by))
        .chain(partners.iter().map(|p| (p, &complement, TriggeredBy::Ipl)));
    for (l, b, triggered_by) in targets {
        if l != label && world.get(l).is_some_and(|i| i.is_static()) {
            continue;
        }
        let old = world.overwrite(l, b);
        let new = world.bound(l);
        if old != new {
            changes.push(Change {
                label: l.clone(),
                old,
                new,
                triggered_by,
                consistent: true,
            });
        }
    }
    changes
}

/// Reset `label` and its partners to a non-static `[0, 1]`.
fn resolve(
    world: &mut World,
    label: &Label,
    partners: &[Label],
    triggered_by: TriggeredBy,
) -> Vec<Change> {
    std::iter::once(label)
        .chain(partners)
        .map(|l| {
            let old = world.overwrite(l, &Interval::UNKNOWN);
            if let Some(interval) = world.get_mut(l) {
                interval.set_static(false);
            }
            Change {
                label: l.clone(),
                old,
                new: Interval::UNKNOWN,
                triggered_by,
                consistent: false,
            }
        })
        .collect()
}
