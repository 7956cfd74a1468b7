//! Per-component truth assignments.
//!
//! A [`World`] belongs to exactly one node or edge and maps each label it
//! knows about to an [`Interval`]. Updates are lattice meets: a world only
//! ever learns, it never forgets within a timestep.

use std::collections::HashMap;

use crate::interval::Interval;
use crate::label::Label;

/// Result of merging a bound into a world.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Merge {
    /// The incoming bound was already implied by the stored one.
    Unchanged,
    /// The stored interval narrowed; `old` is the pre-merge value.
    Changed { old: Interval, new: Interval },
    /// The meet is empty. Nothing was written.
    Inconsistent { existing: Interval, incoming: Interval },
}

/// Label → interval map for one component.
#[derive(Debug, Clone, Default)]
pub struct World {
    labels: HashMap<Label, Interval>,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    /// A world with every label initialised to `[0, 1]`.
    pub fn with_labels<'a>(labels: impl IntoIterator<Item = &'a Label>) -> Self {
        let mut world = Self::new();
        for l in labels {
            world.add_label(l.clone());
        }
        world
    }

    /// Ensure `label` is present, initialising it to `[0, 1]`.
    ///
    /// Returns `true` if the label was newly added.
    pub fn add_label(&mut self, label: Label) -> bool {
        let mut added = false;
        self.labels.entry(label).or_insert_with(|| {
            added = true;
            Interval::UNKNOWN
        });
        added
    }

    pub fn get(&self, label: &Label) -> Option<&Interval> {
        self.labels.get(label)
    }

    pub(crate) fn get_mut(&mut self, label: &Label) -> Option<&mut Interval> {
        self.labels.get_mut(label)
    }

    /// The stored interval, or `[0, 1]` if the label is absent.
    pub fn bound(&self, label: &Label) -> Interval {
        self.labels.get(label).copied().unwrap_or(Interval::UNKNOWN)
    }

    pub fn contains_label(&self, label: &Label) -> bool {
        self.labels.contains_key(label)
    }

    /// `true` if the label is present and its interval lies within `bound`.
    pub fn is_satisfied(&self, label: &Label, bound: &Interval) -> bool {
        self.labels
            .get(label)
            .is_some_and(|current| bound.contains(current))
    }

    /// What [`update`](Self::update) would do, without writing anything.
    pub fn preview(&self, label: &Label, bound: &Interval) -> Merge {
        let existing = self.bound(label);
        if existing.is_disjoint(bound) {
            return Merge::Inconsistent {
                existing,
                incoming: *bound,
            };
        }
        let merged = existing.intersect(bound);
        if merged == existing {
            Merge::Unchanged
        } else {
            Merge::Changed {
                old: existing,
                new: merged,
            }
        }
    }

    /// Merge `bound` into `label` by lattice meet.
    ///
    /// An absent label merges against `[0, 1]`. An empty meet leaves the world
    /// untouched and reports [`Merge::Inconsistent`].
    pub fn update(&mut self, label: &Label, bound: &Interval) -> Merge {
        let merge = self.preview(label, bound);
        if let Merge::Changed { new, .. } = merge {
            self.labels.insert(label.clone(), new);
        }
        merge
    }

    /// Write `bound` without checking it against the stored value.
    ///
    /// Returns the pre-write interval.
    pub fn overwrite(&mut self, label: &Label, bound: &Interval) -> Interval {
        let existing = self.labels.entry(label.clone()).or_default();
        let old = *existing;
        existing.set_bounds(bound.lower(), bound.upper());
        old
    }

    /// Reset every non-static interval to `[0, 1]`, saving previous bounds.
    pub fn reset(&mut self) {
        for interval in self.labels.values_mut() {
            interval.reset();
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Label, &Interval)> {
        self.labels.iter()
    }

    /// Labels and intervals sorted by label name.
    pub fn sorted(&self) -> Vec<(Label, Interval)> {
        let mut out: Vec<(Label, Interval)> =
            self.labels.iter().map(|(l, i)| (l.clone(), *i)).collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iv(l: f64, u: f64) -> Interval {
        Interval::closed(l, u).unwrap()
    }

    #[test]
    fn update_is_lattice_meet() {
        let mut w = World::new();
        let l = Label::new("p");
        assert!(matches!(w.update(&l, &iv(0.2, 0.8)), Merge::Changed { .. }));
        match w.update(&l, &iv(0.5, 1.0)) {
            Merge::Changed { old, new } => {
                assert_eq!(old, iv(0.2, 0.8));
                assert_eq!(new, iv(0.5, 0.8));
            }
            other => panic!("expected change, got {other:?}"),
        }
    }

    #[test]
    fn implied_bound_is_unchanged() {
        let mut w = World::new();
        let l = Label::new("p");
        w.update(&l, &iv(0.4, 0.6));
        assert_eq!(w.update(&l, &iv(0.0, 1.0)), Merge::Unchanged);
        assert_eq!(w.update(&l, &iv(0.4, 0.6)), Merge::Unchanged);
    }

    #[test]
    fn disjoint_bound_is_not_committed() {
        let mut w = World::new();
        let l = Label::new("p");
        w.update(&l, &iv(0.0, 0.2));
        assert!(matches!(
            w.update(&l, &iv(0.5, 1.0)),
            Merge::Inconsistent { .. }
        ));
        assert_eq!(w.bound(&l), iv(0.0, 0.2));
    }

    #[test]
    fn preview_does_not_write() {
        let w = World::new();
        let l = Label::new("p");
        assert!(matches!(w.preview(&l, &iv(0.5, 1.0)), Merge::Changed { .. }));
        assert!(!w.contains_label(&l));
    }

    #[test]
    fn satisfaction_requires_presence() {
        let mut w = World::new();
        let l = Label::new("p");
        assert!(!w.is_satisfied(&l, &Interval::UNKNOWN));
        w.add_label(l.clone());
        assert!(w.is_satisfied(&l, &Interval::UNKNOWN));
        assert!(!w.is_satisfied(&l, &Interval::TRUE));
    }

    #[test]
    fn reset_spares_static_intervals() {
        let mut w = World::new();
        let (a, b) = (Label::new("a"), Label::new("b"));
        w.update(&a, &iv(1.0, 1.0));
        w.update(&b, &iv(1.0, 1.0));
        w.get_mut(&b).unwrap().set_static(true);
        w.reset();
        assert!(w.bound(&a).is_unknown());
        assert_eq!(w.bound(&b), Interval::TRUE);
    }
}
