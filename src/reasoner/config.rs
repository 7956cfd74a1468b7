//! Reasoner configuration.
//!
//! Plain struct with sensible defaults; can be loaded from TOML:
//!
//! ```toml
//! timesteps = 5
//! atom_trace = true
//! execution = "parallel"
//!
//! [convergence]
//! mode = "delta_bound"
//! threshold = 0.01
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// How the fixed-point loop decides it has converged.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ConvergenceMode {
    /// Stop when an iteration changes nothing.
    #[default]
    PerfectConvergence,
    /// Stop when at most `threshold` ground atoms changed.
    DeltaInterpretation { threshold: usize },
    /// Stop when no bound moved more than `threshold` from its previous value.
    DeltaBound { threshold: f64 },
}

impl ConvergenceMode {
    pub fn name(&self) -> &'static str {
        match self {
            Self::PerfectConvergence => "perfect_convergence",
            Self::DeltaInterpretation { .. } => "delta_interpretation",
            Self::DeltaBound { .. } => "delta_bound",
        }
    }
}

/// What to do when a bound contradicts the stored value or an IPL partner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InconsistencyPolicy {
    /// Reset the conflicting label and its IPL partners to `[0, 1]`.
    ///
    /// Each reset counts as a change, so rules that keep asserting opposite
    /// IPL labels never converge and the timestep stops at
    /// `max_fixed_point_iterations`.
    #[default]
    Resolve,
    /// Stop reasoning and return the trace gathered so far.
    Abort,
    /// Force-write the incoming bound without checking.
    Override,
}

/// How facts are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactUpdateMode {
    /// Lattice meet with the stored value.
    #[default]
    Intersection,
    /// Replace the stored value.
    Override,
}

/// Sequential or rayon-parallel rule grounding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    #[default]
    Sequential,
    Parallel,
}

/// Configuration for [`Reasoner`](super::Reasoner).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReasonerConfig {
    /// Last timestep to compute (inclusive), `tmax`.
    pub timesteps: usize,
    pub convergence: ConvergenceMode,
    /// Record a trace entry, with clause groundings, for every change.
    pub atom_trace: bool,
    /// Also trace changes made by graph-attribute facts.
    pub graph_attribute_trace: bool,
    pub inconsistency: InconsistencyPolicy,
    pub fact_update: FactUpdateMode,
    /// Keep interpretations across timesteps instead of resetting them.
    pub persistent: bool,
    /// Archive a snapshot of every world after each timestep.
    pub retain_history: bool,
    pub execution: ExecutionMode,
    /// Worker threads for parallel mode; `None` uses rayon's global pool.
    pub threads: Option<usize>,
    /// Safety cap on fixed-point iterations per timestep (default: 1000).
    pub max_fixed_point_iterations: usize,
}

impl Default for ReasonerConfig {
    fn default() -> Self {
        Self {
            timesteps: 10,
            convergence: ConvergenceMode::default(),
            atom_trace: false,
            graph_attribute_trace: false,
            inconsistency: InconsistencyPolicy::default(),
            fact_update: FactUpdateMode::default(),
            persistent: false,
            retain_history: false,
            execution: ExecutionMode::default(),
            threads: None,
            max_fixed_point_iterations: 1000,
        }
    }
}

impl ReasonerConfig {
    pub fn with_timesteps(mut self, timesteps: usize) -> Self {
        self.timesteps = timesteps;
        self
    }

    pub fn with_convergence(mut self, convergence: ConvergenceMode) -> Self {
        self.convergence = convergence;
        self
    }

    pub fn with_atom_trace(mut self, on: bool) -> Self {
        self.atom_trace = on;
        self
    }

    pub fn with_inconsistency(mut self, policy: InconsistencyPolicy) -> Self {
        self.inconsistency = policy;
        self
    }

    pub fn with_execution(mut self, execution: ExecutionMode) -> Self {
        self.execution = execution;
        self
    }

    pub fn with_history(mut self, on: bool) -> Self {
        self.retain_history = on;
        self
    }

    pub fn with_persistence(mut self, on: bool) -> Self {
        self.persistent = on;
        self
    }

    pub fn with_fact_update(mut self, mode: FactUpdateMode) -> Self {
        self.fact_update = mode;
        self
    }

    pub fn with_graph_attribute_trace(mut self, on: bool) -> Self {
        self.graph_attribute_trace = on;
        self
    }

    pub fn with_max_iterations(mut self, cap: usize) -> Self {
        self.max_fixed_point_iterations = cap;
        self
    }

    /// Parse a TOML document; missing keys take their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |message: &str| ConfigError::InvalidConfig {
            message: message.into(),
        };
        if self.max_fixed_point_iterations == 0 {
            return Err(invalid("max_fixed_point_iterations must be > 0"));
        }
        if self.threads == Some(0) {
            return Err(invalid("threads must be > 0 when set"));
        }
        if let ConvergenceMode::DeltaBound { threshold } = self.convergence {
            if !(0.0..=1.0).contains(&threshold) {
                return Err(invalid("delta_bound threshold must lie in [0, 1]"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let c = ReasonerConfig::default();
        assert!(c.validate().is_ok());
        assert_eq!(c.convergence, ConvergenceMode::PerfectConvergence);
        assert_eq!(c.inconsistency, InconsistencyPolicy::Resolve);
    }

    #[test]
    fn parses_toml_with_defaults() {
        let c = ReasonerConfig::from_toml_str(
            r#"
            timesteps = 5
            atom_trace = true
            execution = "parallel"
            threads = 2

            [convergence]
            mode = "delta_bound"
            threshold = 0.01
            "#,
        )
        .unwrap();
        assert_eq!(c.timesteps, 5);
        assert!(c.atom_trace);
        assert_eq!(c.execution, ExecutionMode::Parallel);
        assert_eq!(c.convergence, ConvergenceMode::DeltaBound { threshold: 0.01 });
        assert_eq!(c.max_fixed_point_iterations, 1000);
    }

    #[test]
    fn rejects_bad_values() {
        let err = ReasonerConfig::from_toml_str("threads = 0").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidConfig { .. }));

        let err = ReasonerConfig::from_toml_str("timesteps = \"many\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));

        let c = ReasonerConfig::default()
            .with_convergence(ConvergenceMode::DeltaBound { threshold: 2.0 });
        assert!(c.validate().is_err());
    }
}
