//! Annotation functions: how a rule computes the bound it asserts.
//!
//! A rule head is either a fixed interval or one of these functions applied to
//! what its clauses matched. Functions are a closed set resolved by name once,
//! when the rule is loaded.

use serde::{Deserialize, Serialize};

use crate::error::RuleError;
use crate::interval::Interval;

/// What one clause contributed to a grounding.
#[derive(Debug, Clone, Default)]
pub struct ClauseAnnotation {
    /// Intervals of the qualifying members, for the clause's label.
    pub intervals: Vec<Interval>,
    /// Size of the clause's population (`total` or `available`).
    pub population: usize,
}

impl ClauseAnnotation {
    pub fn qualified(&self) -> usize {
        self.intervals.len()
    }

    fn fraction(&self) -> f64 {
        if self.population == 0 {
            0.0
        } else {
            self.qualified() as f64 / self.population as f64
        }
    }

    fn mean(&self) -> Option<(f64, f64)> {
        mean_bounds(self.intervals.iter())
    }
}

/// Built-in annotation functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AnnotationFn {
    /// Mean of lower bounds and mean of upper bounds over every qualifying interval.
    Average,
    /// Mean lower bound; upper bound is the maximum upper bound.
    AverageLower,
    /// Component-wise maximum.
    Maximum,
    /// Component-wise minimum.
    Minimum,
    /// `bias + Σ wᵢ · (qualifiedᵢ / populationᵢ) · meanᵢ`, per bound.
    WeightedSum,
}

impl AnnotationFn {
    pub const ALL: [AnnotationFn; 5] = [
        Self::Average,
        Self::AverageLower,
        Self::Maximum,
        Self::Minimum,
        Self::WeightedSum,
    ];

    /// Resolve a function by name.
    pub fn from_name(name: &str) -> Result<Self, RuleError> {
        let wanted = name.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|f| f.name() == wanted)
            .ok_or_else(|| RuleError::UnknownAnnotationFunction {
                name: name.to_string(),
            })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Average => "average",
            Self::AverageLower => "average_lower",
            Self::Maximum => "maximum",
            Self::Minimum => "minimum",
            Self::WeightedSum => "weighted_sum",
        }
    }

    /// Compute the head bound. An empty input yields `[0, 1]`.
    ///
    /// `weights` holds one weight per clause; `bias` is the trailing weight.
    pub fn apply(&self, clauses: &[ClauseAnnotation], weights: &[f64], bias: f64) -> Interval {
        let all = || clauses.iter().flat_map(|c| c.intervals.iter());
        match self {
            Self::Average => match mean_bounds(all()) {
                Some((l, u)) => Interval::clamped(l, u),
                None => Interval::UNKNOWN,
            },
            Self::AverageLower => match mean_bounds(all()) {
                Some((l, _)) => {
                    let u = all().map(Interval::upper).fold(0.0, f64::max);
                    Interval::clamped(l, u)
                }
                None => Interval::UNKNOWN,
            },
            Self::Maximum => fold_bounds(all(), f64::max),
            Self::Minimum => fold_bounds(all(), f64::min),
            Self::WeightedSum => {
                let (mut l, mut u) = (bias, bias);
                for (i, clause) in clauses.iter().enumerate() {
                    let w = weights.get(i).copied().unwrap_or(1.0);
                    if let Some((ml, mu)) = clause.mean() {
                        let f = clause.fraction();
                        l += w * f * ml;
                        u += w * f * mu;
                    }
                }
                Interval::clamped(l, u)
            }
        }
    }
}

impl TryFrom<String> for AnnotationFn {
    type Error = RuleError;

    fn try_from(name: String) -> Result<Self, RuleError> {
        Self::from_name(&name)
    }
}

impl From<AnnotationFn> for String {
    fn from(f: AnnotationFn) -> Self {
        f.name().to_string()
    }
}

impl std::fmt::Display for AnnotationFn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

fn mean_bounds<'a>(intervals: impl Iterator<Item = &'a Interval>) -> Option<(f64, f64)> {
    let (mut l, mut u, mut n) = (0.0, 0.0, 0usize);
    for i in intervals {
        l += i.lower();
        u += i.upper();
        n += 1;
    }
    (n > 0).then(|| (l / n as f64, u / n as f64))
}

fn fold_bounds<'a>(
    mut intervals: impl Iterator<Item = &'a Interval>,
    pick: fn(f64, f64) -> f64,
) -> Interval {
    let Some(first) = intervals.next() else {
        return Interval::UNKNOWN;
    };
    let (l, u) = intervals.fold((first.lower(), first.upper()), |(l, u), i| {
        (pick(l, i.lower()), pick(u, i.upper()))
    });
    Interval::clamped(l, u)
}
