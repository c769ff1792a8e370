//! Error types for engine construction and queries.

use std::fmt;

use thiserror::Error;

use crate::validate::Dominance;

/// Which configured value bound a reference value fell outside of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundKind {
    Minimum,
    Maximum,
}

impl fmt::Display for BoundKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundKind::Minimum => f.write_str("minimum"),
            BoundKind::Maximum => f.write_str("maximum"),
        }
    }
}

/// Errors surfaced by [`crate::HiScoreEngine`] and its building blocks.
///
/// Coordinates carried by variants are always in the caller's raw coordinate
/// space, never the normalized one.
#[derive(Debug, Error, PartialEq)]
pub enum HiScoreError {
    #[error("coordinate has {got} dimensions, expected {expected}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("reference set is empty")]
    EmptyReferenceSet,

    #[error("monotonicity vector is empty")]
    EmptyMonotonicity,

    #[error("invalid monotonicity direction {0}: expected 1 or -1")]
    InvalidDirection(i64),

    #[error("reference points do not vary in dimension {dimension}")]
    DegenerateDimension { dimension: usize },

    #[error("non-finite coordinate or value at {point:?}")]
    NonFinite { point: Vec<f64> },

    #[error("duplicate reference point {point:?} with values {first} and {second}")]
    DuplicatePoint {
        point: Vec<f64>,
        first: f64,
        second: f64,
    },

    #[error("invalid value range: minimum {min} exceeds maximum {max}")]
    InvalidRange { min: f64, max: f64 },

    #[error("{which} value bound must be finite, got {value}")]
    NonFiniteBound { which: BoundKind, value: f64 },

    #[error("synthetic noise amplitude must be finite and non-negative, got {0}")]
    InvalidNoise(f64),

    #[error(
        "monotonicity violated: {other:?} (value {other_value}) is {relation} {point:?} (value {value})"
    )]
    MonotonicityViolation {
        point: Vec<f64>,
        value: f64,
        other: Vec<f64>,
        other_value: f64,
        /// Dominance of `other` relative to `point`.
        relation: Dominance,
    },

    #[error("value {value} at {point:?} is outside the {which} bound {bound}")]
    BoundsViolation {
        point: Vec<f64>,
        value: f64,
        bound: f64,
        which: BoundKind,
    },

    #[error("cone program for reference point {point:?} is infeasible")]
    Infeasible { point: Vec<f64> },

    #[error("solver did not reach an optimum for reference point {point:?}: {reason}")]
    SolverDidNotConverge { point: Vec<f64>, reason: String },

    #[error("{point:?} is not a reference point")]
    UnknownPoint { point: Vec<f64> },

    #[error("invalid surface axes ({first}, {second}) for {dims} dimensions")]
    InvalidAxis {
        first: usize,
        second: usize,
        dims: usize,
    },

    #[error("surface resolution must be at least 2, got {0}")]
    InvalidResolution(usize),
}
