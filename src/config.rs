//! Engine and solver configuration.

use serde::{Deserialize, Serialize};

/// Stand-in magnitude for an unset value bound. Kept finite so solver and
/// clamp arithmetic never see an infinity.
pub const DEFAULT_BOUND_SENTINEL: f64 = 1e47;

/// How repeated reference coordinates are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Any repeated coordinate is an error.
    Reject,
    /// Repeats must carry the identical value and collapse to one point.
    #[default]
    RequireEqual,
    /// The last value seen for a coordinate wins.
    KeepLast,
}

/// Settings for [`crate::qp::InteriorPointSolver`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverSettings {
    // -- Termination ---------------------------------------------------------

    /// Relative tolerance on primal residual, dual residual and duality gap.
    pub tolerance: f64,
    /// Iteration cap; reaching it without convergence is a solver failure.
    pub max_iterations: usize,
    /// Farkas certificate tolerance: `||G'z|| <= tol * -h'z` declares the
    /// program infeasible.
    pub infeasibility_tolerance: f64,

    // -- Numerical stability -------------------------------------------------

    /// Diagonal regularization added to the reduced KKT matrix. Escalated by
    /// 100x (up to five times) whenever Cholesky fails.
    pub kkt_regularization: f64,
    /// Fraction of the distance to the boundary taken per step.
    pub step_fraction: f64,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            tolerance: 1e-8,
            max_iterations: 100,
            infeasibility_tolerance: 1e-8,
            kkt_regularization: 1e-12,
            step_fraction: 0.99,
        }
    }
}

/// Configuration for [`crate::HiScoreEngine`] construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub duplicate_policy: DuplicatePolicy,
    /// Magnitude used for an unset `min`/`max` bound.
    pub bound_sentinel: f64,
    /// Tikhonov weight on slope magnitudes in the cone objective. Picks the
    /// minimum-norm cone among equally tight ones; slopes no constraint
    /// touches settle at zero instead of drifting.
    pub slope_ridge: f64,
    pub solver: SolverSettings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            duplicate_policy: DuplicatePolicy::default(),
            bound_sentinel: DEFAULT_BOUND_SENTINEL,
            slope_ridge: 1e-9,
            solver: SolverSettings::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let cfg: EngineConfig =
            serde_json::from_str(r#"{"duplicate_policy":"keep_last","solver":{"max_iterations":7}}"#)
                .unwrap();
        assert_eq!(cfg.duplicate_policy, DuplicatePolicy::KeepLast);
        assert_eq!(cfg.solver.max_iterations, 7);
        assert_eq!(cfg.solver.tolerance, SolverSettings::default().tolerance);
        assert_eq!(cfg.bound_sentinel, DEFAULT_BOUND_SENTINEL);
    }
}
