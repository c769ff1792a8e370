#![forbid(unsafe_code)]

//! # hiscore
//!
//! Monotone score functions from a handful of labelled examples.
//!
//! Given reference points with known scores and a declared direction per
//! dimension ("higher is better" or "lower is better"), hiscore builds a score
//! function that agrees with every reference value, never decreases along an
//! increasing dimension, and interpolates smoothly in between. Each reference
//! point gets a pair of bounding cones, fitted by a small convex quadratic
//! program; a query's score is the midpoint of the tightest upper and lower
//! cone bounds, clamped into the optional `[min, max]` range.
//!
//! ```no_run
//! use hiscore::{create, Direction, ReferencePoint};
//!
//! let engine = create(
//!     vec![
//!         ReferencePoint::new([0.0, 0.0, 1.0], 0.0),
//!         ReferencePoint::new([1.0, 1.0, 0.0], 100.0),
//!     ],
//!     vec![Direction::Increasing, Direction::Increasing, Direction::Decreasing],
//!     Some(0.0),
//!     Some(100.0),
//! )?;
//! let scores = engine.evaluate(&[[0.5, 0.5, 0.5]])?;
//! # Ok::<(), hiscore::HiScoreError>(())
//! ```

pub mod cone;
pub mod config;
pub mod engine;
pub mod envelope;
pub mod error;
pub mod normalize;
pub mod qp;
pub mod surface;
pub mod synthetic;
pub mod validate;

pub use config::{DuplicatePolicy, EngineConfig, SolverSettings};
pub use engine::{HiScoreEngine, ReferenceSet, ScoreBounds};
pub use error::{BoundKind, HiScoreError};
pub use normalize::{Direction, ReferencePoint};
pub use qp::{InteriorPointSolver, QpOutcome, QpSolver, QuadraticProgram};
pub use surface::{sample_surface, SurfaceSample, SurfaceSpec};
pub use validate::{Dominance, ValueRange};

/// Build an engine with default configuration.
pub fn create(
    points: Vec<ReferencePoint>,
    monotonicity: Vec<Direction>,
    min: Option<f64>,
    max: Option<f64>,
) -> Result<HiScoreEngine, HiScoreError> {
    let range = ValueRange::new(min, max)?;
    HiScoreEngine::new(points, monotonicity, range, None)
}
