//! Seeded synthetic reference sets and an offline demo run.
//!
//! The generator lives in the unit cube with monotonicity `[+1, +1, -1]` and
//! scores in `[0, 100]`, anchored at `(0,0,1) -> 0` and `(1,1,0) -> 100`.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{DuplicatePolicy, DEFAULT_BOUND_SENTINEL};
use crate::engine::{HiScoreEngine, ReferenceSet};
use crate::error::HiScoreError;
use crate::normalize::{normalize_reference, Direction, Normalizer, ReferencePoint};
use crate::validate::{check_bounds, check_monotonicity, ValueRange};

pub const MONOTONICITY: [Direction; 3] = [
    Direction::Increasing,
    Direction::Increasing,
    Direction::Decreasing,
];

pub const MIN_SCORE: f64 = 0.0;
pub const MAX_SCORE: f64 = 100.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticConfig {
    /// Total reference points, the two anchors included.
    pub points: usize,
    /// Upper end of the uniform noise added to each random point's score.
    /// Zero keeps every draw monotone.
    pub noise: f64,
    pub seed: u64,
    pub max_attempts: usize,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            points: 100,
            noise: 0.0,
            seed: 7,
            max_attempts: 1000,
        }
    }
}

/// Smooth monotone score of a unit-cube point, before noise.
pub fn base_score(p: [f64; 3]) -> f64 {
    (40.0 * ((p[0] + 1.0 - p[2]) / 2.0).sqrt()).floor()
        + (20.0 * (p[0] * p[1]).sqrt()).floor()
        + (30.0 * p[1] * (1.0 - p[2])).floor()
}

fn draw(rng: &mut StdRng, cfg: &SyntheticConfig) -> Vec<ReferencePoint> {
    let mut points = vec![
        ReferencePoint::new([0.0, 0.0, 1.0], MIN_SCORE),
        ReferencePoint::new([1.0, 1.0, 0.0], MAX_SCORE),
    ];
    for _ in 2..cfg.points {
        let p: [f64; 3] = [rng.gen(), rng.gen(), rng.gen()];
        let noise = if cfg.noise > 0.0 {
            rng.gen_range(0.0..cfg.noise).floor()
        } else {
            0.0
        };
        points.push(ReferencePoint::new(p, base_score(p) + noise));
    }
    points
}

/// Draw reference sets until one passes validation.
///
/// Only validation failures are retried; after `max_attempts` the last one is
/// returned.
pub fn generate_reference_set(cfg: &SyntheticConfig) -> Result<ReferenceSet, HiScoreError> {
    if !cfg.noise.is_finite() || cfg.noise < 0.0 {
        return Err(HiScoreError::InvalidNoise(cfg.noise));
    }

    let range = ValueRange::new(Some(MIN_SCORE), Some(MAX_SCORE))?;
    let mut rng = StdRng::seed_from_u64(cfg.seed);
    let mut last_err = HiScoreError::EmptyReferenceSet;

    for attempt in 1..=cfg.max_attempts.max(1) {
        let points = draw(&mut rng, cfg);
        match validate_draw(&points, &range) {
            Ok(()) => {
                info!(attempt, points = points.len(), "synthetic reference set accepted");
                return Ok(ReferenceSet {
                    monotonicity: MONOTONICITY.to_vec(),
                    minval: range.min,
                    maxval: range.max,
                    points,
                    config: None,
                });
            }
            Err(err) => {
                debug!(attempt, error = %err, "synthetic draw rejected");
                last_err = err;
            }
        }
    }
    Err(last_err)
}

fn validate_draw(points: &[ReferencePoint], range: &ValueRange) -> Result<(), HiScoreError> {
    let normalizer = Normalizer::fit(points, &MONOTONICITY)?;
    let normalized = normalize_reference(points, &normalizer, DuplicatePolicy::default())?;
    check_monotonicity(&normalized)?;
    check_bounds(&normalized, range, DEFAULT_BOUND_SENTINEL)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemoRow {
    pub coords: Vec<f64>,
    pub value: f64,
    pub estimate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemoReport {
    pub rows: Vec<DemoRow>,
    /// Largest `|estimate - value|` over the reference set.
    pub max_abs_error: f64,
}

/// Build an engine on a generated set and re-evaluate every reference point.
pub fn run_demo(cfg: &SyntheticConfig) -> Result<DemoReport, HiScoreError> {
    let set = generate_reference_set(cfg)?;
    let points = set.points.clone();
    let engine = HiScoreEngine::from_reference_set(set)?;

    let coords: Vec<&[f64]> = points.iter().map(|p| p.coords.as_slice()).collect();
    let estimates = engine.evaluate(&coords)?;

    let rows: Vec<DemoRow> = points
        .into_iter()
        .zip(estimates)
        .map(|(p, estimate)| DemoRow {
            coords: p.coords,
            value: p.value,
            estimate,
        })
        .collect();
    let max_abs_error = rows
        .iter()
        .map(|r| (r.estimate - r.value).abs())
        .fold(0.0, f64::max);

    Ok(DemoReport {
        rows,
        max_abs_error,
    })
}
