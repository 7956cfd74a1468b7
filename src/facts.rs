//! Facts: bounds asserted on a component for a window of timesteps.

use serde::{Deserialize, Serialize};

use crate::error::RuleError;
use crate::graph::Component;
use crate::interval::Interval;
use crate::label::Label;

/// `label(target) : bound` for every `t` in `[t_lower, t_upper]`.
///
/// A static fact holds from `t_lower` onwards and its interval survives
/// timestep resets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fact {
    pub name: String,
    pub target: Component,
    pub label: Label,
    pub bound: Interval,
    #[serde(default)]
    pub t_lower: usize,
    #[serde(default)]
    pub t_upper: usize,
    #[serde(default, rename = "static")]
    pub is_static: bool,
    /// Derived from a graph attribute rather than declared.
    #[serde(default)]
    pub graph_attribute: bool,
}

impl Fact {
    /// A fact holding at `t = 0` only.
    pub fn new(
        name: impl Into<String>,
        target: Component,
        label: impl Into<Label>,
        bound: Interval,
    ) -> Self {
        Self {
            name: name.into(),
            target,
            label: label.into(),
            bound,
            t_lower: 0,
            t_upper: 0,
            is_static: false,
            graph_attribute: false,
        }
    }

    /// Hold during `[t_lower, t_upper]`.
    pub fn during(mut self, t_lower: usize, t_upper: usize) -> Self {
        self.t_lower = t_lower;
        self.t_upper = t_upper;
        self
    }

    /// Hold at exactly `t`.
    pub fn at(self, t: usize) -> Self {
        self.during(t, t)
    }

    /// Hold from `t_lower` onwards, frozen across resets.
    pub fn static_fact(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn from_graph_attribute(mut self) -> Self {
        self.graph_attribute = true;
        self
    }

    /// Whether the fact applies at timestep `t`.
    pub fn is_active(&self, t: usize) -> bool {
        t >= self.t_lower && (self.is_static || t <= self.t_upper)
    }

    /// The last timestep this fact is scheduled for, or `None` for static facts.
    pub fn last_timestep(&self) -> Option<usize> {
        (!self.is_static).then_some(self.t_upper)
    }

    pub fn validate(&self) -> Result<(), RuleError> {
        if self.t_lower > self.t_upper && !self.is_static {
            return Err(RuleError::InvalidFact {
                fact: self.name.clone(),
                message: format!(
                    "t_lower ({}) is after t_upper ({})",
                    self.t_lower, self.t_upper
                ),
            });
        }
        Ok(())
    }
}
