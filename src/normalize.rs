//! Point normalization: raw reference coordinates into a dimensionless space
//! where every dimension is "larger is better".

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::config::DuplicatePolicy;
use crate::error::HiScoreError;

/// Declared relationship between one input dimension and the score.
///
/// Serialized as `1` (increasing) or `-1` (decreasing).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum Direction {
    Increasing,
    Decreasing,
}

impl Direction {
    pub fn sign(self) -> f64 {
        match self {
            Direction::Increasing => 1.0,
            Direction::Decreasing => -1.0,
        }
    }
}

impl TryFrom<i64> for Direction {
    type Error = HiScoreError;

    fn try_from(v: i64) -> Result<Self, Self::Error> {
        match v {
            1 => Ok(Direction::Increasing),
            -1 => Ok(Direction::Decreasing),
            other => Err(HiScoreError::InvalidDirection(other)),
        }
    }
}

impl From<Direction> for i64 {
    fn from(d: Direction) -> Self {
        match d {
            Direction::Increasing => 1,
            Direction::Decreasing => -1,
        }
    }
}

/// A labelled example in raw coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferencePoint {
    pub coords: Vec<f64>,
    pub value: f64,
}

impl ReferencePoint {
    pub fn new(coords: impl Into<Vec<f64>>, value: f64) -> Self {
        Self {
            coords: coords.into(),
            value,
        }
    }
}

/// A reference point after normalization. `raw` is kept for diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedPoint {
    pub raw: Vec<f64>,
    pub coords: Vec<f64>,
    pub value: f64,
}

/// Per-dimension rescaling fitted on a reference set.
///
/// `scale[d] = sign[d] * (max[d] - min[d])`; normalized coordinates are
/// `raw / scale`.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalizer {
    directions: Vec<Direction>,
    scale: Vec<f64>,
    ranges: Vec<(f64, f64)>,
}

impl Normalizer {
    pub fn fit(points: &[ReferencePoint], directions: &[Direction]) -> Result<Self, HiScoreError> {
        if directions.is_empty() {
            return Err(HiScoreError::EmptyMonotonicity);
        }
        if points.is_empty() {
            return Err(HiScoreError::EmptyReferenceSet);
        }

        let dims = directions.len();
        let mut ranges = vec![(f64::INFINITY, f64::NEG_INFINITY); dims];
        for p in points {
            check_dims(dims, &p.coords)?;
            if !p.value.is_finite() || p.coords.iter().any(|c| !c.is_finite()) {
                return Err(HiScoreError::NonFinite {
                    point: p.coords.clone(),
                });
            }
            for (range, &c) in ranges.iter_mut().zip(p.coords.iter()) {
                range.0 = range.0.min(c);
                range.1 = range.1.max(c);
            }
        }

        let mut scale = Vec::with_capacity(dims);
        for (dimension, (dir, &(lo, hi))) in directions.iter().zip(ranges.iter()).enumerate() {
            let span = hi - lo;
            if span == 0.0 {
                return Err(HiScoreError::DegenerateDimension { dimension });
            }
            scale.push(dir.sign() * span);
        }

        Ok(Self {
            directions: directions.to_vec(),
            scale,
            ranges,
        })
    }

    pub fn dims(&self) -> usize {
        self.scale.len()
    }

    pub fn directions(&self) -> &[Direction] {
        &self.directions
    }

    pub fn scale(&self) -> &[f64] {
        &self.scale
    }

    /// Raw `(min, max)` of the reference set per dimension.
    pub fn ranges(&self) -> &[(f64, f64)] {
        &self.ranges
    }

    pub fn normalize(&self, coords: &[f64]) -> Result<Vec<f64>, HiScoreError> {
        check_dims(self.dims(), coords)?;
        if coords.iter().any(|c| !c.is_finite()) {
            return Err(HiScoreError::NonFinite {
                point: coords.to_vec(),
            });
        }
        Ok(coords
            .iter()
            .zip(self.scale.iter())
            .map(|(c, s)| c / s)
            .collect())
    }
}

fn check_dims(expected: usize, coords: &[f64]) -> Result<(), HiScoreError> {
    if coords.len() != expected {
        return Err(HiScoreError::DimensionMismatch {
            expected,
            got: coords.len(),
        });
    }
    Ok(())
}

/// Bitwise key for a normalized coordinate. `-0.0` and `0.0` share a key.
pub(crate) fn coord_key(coords: &[f64]) -> Vec<u64> {
    coords.iter().map(|c| (c + 0.0).to_bits()).collect()
}

/// Normalize a reference set, collapsing repeated coordinates per `policy`.
///
/// Output order follows the first occurrence of each coordinate.
pub fn normalize_reference(
    points: &[ReferencePoint],
    normalizer: &Normalizer,
    policy: DuplicatePolicy,
) -> Result<Vec<NormalizedPoint>, HiScoreError> {
    let mut out: Vec<NormalizedPoint> = Vec::with_capacity(points.len());
    let mut seen: HashMap<Vec<u64>, usize> = HashMap::with_capacity(points.len());

    for p in points {
        let coords = normalizer.normalize(&p.coords)?;
        let key = coord_key(&coords);
        if let Some(&idx) = seen.get(&key) {
            let first = out[idx].value;
            match policy {
                DuplicatePolicy::KeepLast => out[idx].value = p.value,
                DuplicatePolicy::RequireEqual if first == p.value => {}
                DuplicatePolicy::RequireEqual | DuplicatePolicy::Reject => {
                    return Err(HiScoreError::DuplicatePoint {
                        point: p.coords.clone(),
                        first,
                        second: p.value,
                    });
                }
            }
            continue;
        }
        seen.insert(key, out.len());
        out.push(NormalizedPoint {
            raw: p.coords.clone(),
            coords,
            value: p.value,
        });
    }
    Ok(out)
}
