//! Rich diagnostic error types for the kairos reasoner.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes, help text, and source chains so users know exactly what
//! went wrong and how to fix it.
//!
//! Inconsistencies between bounds are *not* errors: they are events handled by
//! the update engine according to the configured
//! [`InconsistencyPolicy`](crate::reasoner::config::InconsistencyPolicy).

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for the kairos reasoner.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain (error codes, help text) through to the user.
#[derive(Debug, Error, Diagnostic)]
pub enum KairosError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Interval(#[from] IntervalError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Rule(#[from] RuleError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Program(#[from] ProgramError),
}

// ---------------------------------------------------------------------------
// Interval errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum IntervalError {
    #[error("invalid interval [{lower}, {upper}]: bounds must satisfy 0 <= lower <= upper <= 1")]
    #[diagnostic(
        code(kairos::interval::invalid),
        help(
            "Interval bounds are truth degrees in [0, 1] and the lower bound may not \
             exceed the upper bound. Check the fact or rule that supplied this bound."
        )
    )]
    InvalidInterval { lower: f64, upper: f64 },
}

// ---------------------------------------------------------------------------
// Graph errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum GraphError {
    #[error("unknown component: {component}")]
    #[diagnostic(
        code(kairos::graph::unknown_component),
        help(
            "An update referenced a node or edge that is not part of the graph. \
             Rule groundings may only target components the graph knows about; \
             add the node or edge to the graph before reasoning."
        )
    )]
    UnknownComponent { component: String },

    #[error("unknown node: {node}")]
    #[diagnostic(
        code(kairos::graph::unknown_node),
        help("Edges may only connect nodes that were added to the graph first.")
    )]
    UnknownNode { node: String },
}

// ---------------------------------------------------------------------------
// Rule errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum RuleError {
    #[error("invalid rule '{rule}': {message}")]
    #[diagnostic(
        code(kairos::rule::invalid),
        help("Check the rule's clauses, thresholds and head definition.")
    )]
    InvalidRule { rule: String, message: String },

    #[error("unknown annotation function '{name}'")]
    #[diagnostic(
        code(kairos::rule::unknown_annotation_fn),
        help(
            "Valid annotation functions are: average, average_lower, maximum, \
             minimum, weighted_sum."
        )
    )]
    UnknownAnnotationFunction { name: String },

    #[error("rule '{rule}' has {weights} weight(s) but {clauses} clause(s)")]
    #[diagnostic(
        code(kairos::rule::weight_mismatch),
        help(
            "Provide one weight per clause, optionally followed by a trailing bias \
             weight, or omit the weights to use 1.0 per clause and a bias of 0."
        )
    )]
    WeightMismatch {
        rule: String,
        weights: usize,
        clauses: usize,
    },

    #[error("invalid fact '{fact}': {message}")]
    #[diagnostic(
        code(kairos::rule::invalid_fact),
        help("A fact's time window must satisfy t_lower <= t_upper.")
    )]
    InvalidFact { fact: String, message: String },
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("invalid configuration: {message}")]
    #[diagnostic(
        code(kairos::config::invalid),
        help("Check the ReasonerConfig fields. {message}")
    )]
    InvalidConfig { message: String },

    #[error("failed to parse configuration: {message}")]
    #[diagnostic(
        code(kairos::config::parse),
        help("The configuration must be valid TOML matching the ReasonerConfig layout.")
    )]
    Parse { message: String },
}

// ---------------------------------------------------------------------------
// Program loading errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ProgramError {
    #[error("I/O error reading {path}: {source}")]
    #[diagnostic(
        code(kairos::program::io),
        help("Check that the program file exists and is readable.")
    )]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed program: {message}")]
    #[diagnostic(
        code(kairos::program::json),
        help(
            "Programs are JSON documents with `graph`, `labels`, `facts`, `rules` \
             and `ipl` sections. Re-check the offending field."
        )
    )]
    Json { message: String },
}

/// Convenience alias for functions returning kairos results.
pub type KairosResult<T> = std::result::Result<T, KairosError>;
