//! Reverse index from label to the components holding it.
//!
//! Every real change to `(component, label)` appends the component to the
//! label's list. The list is append-only and keeps duplicates: a component
//! updated twice appears twice. "Available" quantifiers only ask whether a
//! component is present, which the membership set answers without scanning.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use crate::graph::{EdgeId, NodeId};
use crate::label::Label;

/// Label → ordered components for one component kind.
#[derive(Debug, Clone)]
pub struct PredicateIndex<C> {
    entries: HashMap<Label, Vec<C>>,
    members: HashMap<Label, HashSet<C>>,
}

impl<C> Default for PredicateIndex<C> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            members: HashMap::new(),
        }
    }
}

impl<C: Clone + Eq + Hash> PredicateIndex<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `component` received a change for `label`.
    pub fn push(&mut self, label: &Label, component: C) {
        self.members
            .entry(label.clone())
            .or_default()
            .insert(component.clone());
        self.entries.entry(label.clone()).or_default().push(component);
    }

    /// Components recorded for `label`, in append order (duplicates kept).
    pub fn get(&self, label: &Label) -> &[C] {
        self.entries.get(label).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether `component` has been recorded for `label`.
    pub fn contains(&self, label: &Label, component: &C) -> bool {
        self.members
            .get(label)
            .is_some_and(|set| set.contains(component))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.members.clear();
    }

    /// Number of distinct labels indexed.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Predicate indices for both component kinds.
#[derive(Debug, Clone, Default)]
pub struct PredicateMap {
    pub nodes: PredicateIndex<NodeId>,
    pub edges: PredicateIndex<EdgeId>,
}

impl PredicateMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.edges.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicates_are_preserved_in_order() {
        let mut idx = PredicateIndex::<NodeId>::new();
        let l = Label::new("p");
        idx.push(&l, "A".into());
        idx.push(&l, "B".into());
        idx.push(&l, "A".into());
        let names: Vec<&str> = idx.get(&l).iter().map(NodeId::as_str).collect();
        assert_eq!(names, vec!["A", "B", "A"]);
        assert!(idx.contains(&l, &"A".into()));
        assert!(!idx.contains(&l, &"C".into()));
    }

    #[test]
    fn unknown_label_is_empty() {
        let idx = PredicateIndex::<EdgeId>::new();
        assert!(idx.get(&Label::new("q")).is_empty());
        assert!(!idx.contains(&Label::new("q"), &EdgeId::new("A", "B")));
    }
}
