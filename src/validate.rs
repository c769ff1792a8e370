//! Consistency checks run on the normalized reference set before any
//! optimization is attempted.

use std::fmt;

use crate::error::{BoundKind, HiScoreError};
use crate::normalize::NormalizedPoint;

/// Four-way partial order between two normalized coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dominance {
    /// Elementwise `>=` with at least one strict dimension.
    Greater,
    /// Elementwise `<=` with at least one strict dimension.
    Less,
    Equal,
    Incomparable,
}

impl fmt::Display for Dominance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dominance::Greater => f.write_str("greater than"),
            Dominance::Less => f.write_str("less than"),
            Dominance::Equal => f.write_str("equal to"),
            Dominance::Incomparable => f.write_str("incomparable with"),
        }
    }
}

/// Dominance of `a` relative to `b`. Both must have the same length.
pub fn dominance(a: &[f64], b: &[f64]) -> Dominance {
    let mut any_greater = false;
    let mut any_less = false;
    for (x, y) in a.iter().zip(b.iter()) {
        if x > y {
            any_greater = true;
        } else if x < y {
            any_less = true;
        }
    }
    match (any_greater, any_less) {
        (false, false) => Dominance::Equal,
        (true, false) => Dominance::Greater,
        (false, true) => Dominance::Less,
        (true, true) => Dominance::Incomparable,
    }
}

/// Optional global bounds on scores.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ValueRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl ValueRange {
    pub fn new(min: Option<f64>, max: Option<f64>) -> Result<Self, HiScoreError> {
        for (which, bound) in [(BoundKind::Minimum, min), (BoundKind::Maximum, max)] {
            if let Some(value) = bound.filter(|b| !b.is_finite()) {
                return Err(HiScoreError::NonFiniteBound { which, value });
            }
        }
        if let (Some(lo), Some(hi)) = (min, max) {
            if lo > hi {
                return Err(HiScoreError::InvalidRange { min: lo, max: hi });
            }
        }
        Ok(Self { min, max })
    }

    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn is_bounded(&self) -> bool {
        self.min.is_some() || self.max.is_some()
    }

    /// Lower bound, or `-sentinel` when unset.
    pub fn lower(&self, sentinel: f64) -> f64 {
        self.min.unwrap_or(-sentinel)
    }

    /// Upper bound, or `sentinel` when unset.
    pub fn upper(&self, sentinel: f64) -> f64 {
        self.max.unwrap_or(sentinel)
    }

    /// Clamp into whichever bounds are set.
    pub fn clamp(&self, v: f64) -> f64 {
        let mut out = v;
        if let Some(hi) = self.max {
            out = out.min(hi);
        }
        if let Some(lo) = self.min {
            out = out.max(lo);
        }
        out
    }
}

/// Every dominating (or equal) point must carry a value at least as large,
/// every dominated (or equal) point a value at most as large.
pub fn check_monotonicity(points: &[NormalizedPoint]) -> Result<(), HiScoreError> {
    for (i, x) in points.iter().enumerate() {
        for (j, y) in points.iter().enumerate() {
            if i == j {
                continue;
            }
            let relation = dominance(&y.coords, &x.coords);
            let consistent = match relation {
                Dominance::Greater => y.value >= x.value,
                Dominance::Less => y.value <= x.value,
                Dominance::Equal => y.value == x.value,
                Dominance::Incomparable => true,
            };
            if !consistent {
                return Err(HiScoreError::MonotonicityViolation {
                    point: x.raw.clone(),
                    value: x.value,
                    other: y.raw.clone(),
                    other_value: y.value,
                    relation,
                });
            }
        }
    }
    Ok(())
}

/// Reference values must lie within `range`; a no-op when no bound is set.
pub fn check_bounds(
    points: &[NormalizedPoint],
    range: &ValueRange,
    sentinel: f64,
) -> Result<(), HiScoreError> {
    if !range.is_bounded() {
        return Ok(());
    }
    let upper = range.upper(sentinel);
    let lower = range.lower(sentinel);
    for p in points {
        if p.value > upper {
            return Err(HiScoreError::BoundsViolation {
                point: p.raw.clone(),
                value: p.value,
                bound: upper,
                which: BoundKind::Maximum,
            });
        }
        if p.value < lower {
            return Err(HiScoreError::BoundsViolation {
                point: p.raw.clone(),
                value: p.value,
                bound: lower,
                which: BoundKind::Minimum,
            });
        }
    }
    Ok(())
}
