// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # kairos
//!
//! A temporal logic-inference engine over annotated graphs. Nodes and edges
//! carry truth intervals `[lower, upper]` per label; rules and facts narrow
//! them over discrete timesteps until a fixed point is reached.
//!
//! ## Architecture
//!
//! - **Interval lattice** (`interval`): bounds on truth degrees and their meet
//! - **Graph** (`graph`): petgraph topology, node and edge identifiers
//! - **Interpretation** (`interpretation`): per-component worlds, predicate
//!   map, and the update engine with IPL propagation and inconsistency handling
//! - **Rules** (`rules`, `grounding`): quantified clauses, annotation
//!   functions, read-only (optionally rayon-parallel) grounding
//! - **Scheduler** (`reasoner`): timesteps, fixed-point iteration, convergence
//! - **Trace** (`trace`, `export`): audit log of every committed change
//!
//! ## Library usage
//!
//! ```no_run
//! use kairos::facts::Fact;
//! use kairos::graph::{Component, GraphBuilder};
//! use kairos::interval::Interval;
//! use kairos::label::{Label, LabelSet};
//! use kairos::reasoner::Reasoner;
//! use kairos::reasoner::config::ReasonerConfig;
//! use kairos::rules::{Clause, Rule};
//!
//! let graph = GraphBuilder::new().edge("A", "B").build();
//! let labels = LabelSet::new().with_node_label("infected");
//! let mut reasoner = Reasoner::new(graph, labels, ReasonerConfig::default()).unwrap();
//! reasoner
//!     .add_fact(Fact::new("seed", Component::node("B"), "infected", Interval::TRUE))
//!     .unwrap();
//! reasoner
//!     .add_rule(
//!         Rule::node("spread", "infected").with_clause(Clause::node("infected", Interval::TRUE)),
//!     )
//!     .unwrap();
//! let outcome = reasoner.reason().unwrap();
//! assert!(outcome.interpretation.query(
//!     &Component::node("A"),
//!     &Label::new("infected"),
//!     &Interval::TRUE,
//! ));
//! ```

pub mod error;
pub mod export;
pub mod facts;
pub mod graph;
pub mod grounding;
pub mod interpretation;
pub mod interval;
pub mod ipl;
pub mod label;
pub mod program;
pub mod reasoner;
pub mod registry;
pub mod rules;
pub mod trace;
pub mod world;
