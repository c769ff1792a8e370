//! Query engine: validated reference set plus solved cones, evaluated at
//! arbitrary points.
//!
//! Construction runs normalize → validate → solve exactly once; the result is
//! immutable and holds no interior mutability, so a built engine can be
//! shared across threads freely.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::cone::solve_cones;
use crate::config::EngineConfig;
use crate::envelope::EnvelopePoint;
use crate::error::HiScoreError;
use crate::normalize::{coord_key, normalize_reference, Direction, Normalizer, ReferencePoint};
use crate::qp::{InteriorPointSolver, QpSolver};
use crate::validate::{check_bounds, check_monotonicity, dominance, Dominance, ValueRange};

/// Serializable description of an engine: the JSON input of the CLI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceSet {
    pub monotonicity: Vec<Direction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minval: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maxval: Option<f64>,
    pub points: Vec<ReferencePoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<EngineConfig>,
}

/// Envelope bounds at one query point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBounds {
    /// Max over all envelope lower bounds, before clamping.
    pub raw_lower: f64,
    /// Min over all envelope upper bounds, before clamping.
    pub raw_upper: f64,
    pub lower: f64,
    pub upper: f64,
    /// Midpoint of the clamped bounds.
    pub estimate: f64,
}

impl ScoreBounds {
    /// Whether the unclamped bounds are ordered (`raw_lower <= raw_upper`).
    pub fn is_ordered(&self) -> bool {
        self.raw_lower <= self.raw_upper
    }
}

#[derive(Debug, Clone)]
pub struct HiScoreEngine {
    normalizer: Normalizer,
    range: ValueRange,
    cfg: EngineConfig,
    envelopes: Vec<EnvelopePoint>,
    index: HashMap<Vec<u64>, usize>,
}

impl HiScoreEngine {
    /// Build an engine with the default interior-point backend.
    pub fn new(
        points: Vec<ReferencePoint>,
        monotonicity: Vec<Direction>,
        range: ValueRange,
        cfg: Option<EngineConfig>,
    ) -> Result<Self, HiScoreError> {
        let cfg = cfg.unwrap_or_default();
        let solver = InteriorPointSolver::new(cfg.solver.clone());
        Self::with_solver(points, monotonicity, range, Some(cfg), &solver)
    }

    /// Build an engine using a caller-supplied QP backend.
    pub fn with_solver(
        points: Vec<ReferencePoint>,
        monotonicity: Vec<Direction>,
        range: ValueRange,
        cfg: Option<EngineConfig>,
        solver: &dyn QpSolver,
    ) -> Result<Self, HiScoreError> {
        let cfg = cfg.unwrap_or_default();
        let normalizer = Normalizer::fit(&points, &monotonicity)?;
        let normalized = normalize_reference(&points, &normalizer, cfg.duplicate_policy)?;
        if normalized.len() < points.len() {
            debug!(
                supplied = points.len(),
                unique = normalized.len(),
                "collapsed duplicate reference coordinates"
            );
        }

        check_monotonicity(&normalized)?;
        check_bounds(&normalized, &range, cfg.bound_sentinel)?;

        let arena = solve_cones(&normalized, solver, cfg.slope_ridge)?;
        let envelopes: Vec<EnvelopePoint> = normalized
            .iter()
            .enumerate()
            .map(|(i, p)| EnvelopePoint::from_arena(p, &arena, i))
            .collect();
        let index = envelopes
            .iter()
            .enumerate()
            .map(|(i, e)| (coord_key(e.coords()), i))
            .collect();

        info!(
            points = envelopes.len(),
            dims = normalizer.dims(),
            min = ?range.min,
            max = ?range.max,
            "score engine built"
        );

        Ok(Self {
            normalizer,
            range,
            cfg,
            envelopes,
            index,
        })
    }

    pub fn from_reference_set(set: ReferenceSet) -> Result<Self, HiScoreError> {
        let range = ValueRange::new(set.minval, set.maxval)?;
        Self::new(set.points, set.monotonicity, range, set.config)
    }

    pub fn dims(&self) -> usize {
        self.normalizer.dims()
    }

    /// Number of distinct reference points.
    pub fn len(&self) -> usize {
        self.envelopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.envelopes.is_empty()
    }

    pub fn monotonicity(&self) -> &[Direction] {
        self.normalizer.directions()
    }

    pub fn value_range(&self) -> ValueRange {
        self.range
    }

    pub fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    pub fn envelopes(&self) -> &[EnvelopePoint] {
        &self.envelopes
    }

    /// Point estimates for each query, in input order.
    pub fn evaluate<Q: AsRef<[f64]>>(&self, queries: &[Q]) -> Result<Vec<f64>, HiScoreError> {
        queries
            .iter()
            .map(|q| self.evaluate_one(q.as_ref()))
            .collect()
    }

    pub fn evaluate_one(&self, query: &[f64]) -> Result<f64, HiScoreError> {
        Ok(self.score_bounds(query)?.estimate)
    }

    /// Envelope bounds and estimate at one raw query coordinate.
    ///
    /// Upper and lower bounds are each clamped into the value range on both
    /// ends, then averaged.
    pub fn score_bounds(&self, query: &[f64]) -> Result<ScoreBounds, HiScoreError> {
        let q = self.normalizer.normalize(query)?;

        let mut raw_upper = f64::INFINITY;
        let mut raw_lower = f64::NEG_INFINITY;
        for e in &self.envelopes {
            raw_upper = raw_upper.min(e.upper_bound(&q));
            raw_lower = raw_lower.max(e.lower_bound(&q));
        }

        let upper = self.range.clamp(raw_upper);
        let lower = self.range.clamp(raw_lower);
        let bounds = ScoreBounds {
            raw_lower,
            raw_upper,
            lower,
            upper,
            estimate: 0.5 * (upper + lower),
        };
        if !bounds.is_ordered() {
            debug!(?query, raw_lower, raw_upper, "envelope bounds cross");
        }
        Ok(bounds)
    }

    /// Exact combinatorial bounds at a reference point, from recorded values
    /// only: `(max value dominated-or-equal, min value dominating-or-equal)`.
    pub fn value_bounds(&self, point: &[f64]) -> Result<(f64, f64), HiScoreError> {
        let q = self.normalizer.normalize(point)?;
        if !self.index.contains_key(&coord_key(&q)) {
            return Err(HiScoreError::UnknownPoint {
                point: point.to_vec(),
            });
        }
        Ok(self.bounds_from_values(&q))
    }

    /// The same combinatorial bound as [`Self::value_bounds`] at any
    /// coordinate. Without dominating (dominated) reference points the upper
    /// (lower) side falls back to the value range or the sentinel.
    pub fn dominance_bounds(&self, point: &[f64]) -> Result<(f64, f64), HiScoreError> {
        let q = self.normalizer.normalize(point)?;
        Ok(self.bounds_from_values(&q))
    }

    /// Recorded value at a reference coordinate, if any.
    pub fn reference_value(&self, point: &[f64]) -> Result<Option<f64>, HiScoreError> {
        let q = self.normalizer.normalize(point)?;
        Ok(self
            .index
            .get(&coord_key(&q))
            .map(|&i| self.envelopes[i].value()))
    }

    fn bounds_from_values(&self, q: &[f64]) -> (f64, f64) {
        let sentinel = self.cfg.bound_sentinel;
        let mut lower = self.range.lower(sentinel);
        let mut upper = self.range.upper(sentinel);
        for e in &self.envelopes {
            match dominance(e.coords(), q) {
                Dominance::Greater => upper = upper.min(e.value()),
                Dominance::Less => lower = lower.max(e.value()),
                Dominance::Equal => {
                    upper = upper.min(e.value());
                    lower = lower.max(e.value());
                }
                Dominance::Incomparable => {}
            }
        }
        (lower, upper)
    }
}
