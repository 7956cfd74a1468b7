//! Inconsistent predicate list (IPL).
//!
//! Pairs of labels that are mutually exclusive, such as `infected`/`healthy`.
//! Whenever one member of a pair narrows on a component, the other is narrowed
//! to the complement so that `p + q` can still equal 1, and a conflict between
//! them is an inconsistency.

use serde::{Deserialize, Serialize};

use crate::label::Label;

/// Unordered label pairs that may not hold independent values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ipl {
    pairs: Vec<(Label, Label)>,
}

impl Ipl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a pair. Self-pairs and pairs already present (in either order) are ignored.
    pub fn add(&mut self, p: impl Into<Label>, q: impl Into<Label>) {
        let (p, q) = (p.into(), q.into());
        if p == q || self.contains(&p, &q) {
            return;
        }
        self.pairs.push((p, q));
    }

    /// Builder-style variant of [`add`](Self::add).
    pub fn with_pair(mut self, p: impl Into<Label>, q: impl Into<Label>) -> Self {
        self.add(p, q);
        self
    }

    pub fn contains(&self, p: &Label, q: &Label) -> bool {
        self.pairs
            .iter()
            .any(|(a, b)| (a == p && b == q) || (a == q && b == p))
    }

    /// Every label paired with `label`, in declaration order.
    pub fn partners<'a>(&'a self, label: &'a Label) -> impl Iterator<Item = &'a Label> + 'a {
        self.pairs.iter().filter_map(move |(p, q)| {
            if p == label {
                Some(q)
            } else if q == label {
                Some(p)
            } else {
                None
            }
        })
    }

    pub fn pairs(&self) -> &[(Label, Label)] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}
