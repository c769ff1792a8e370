//! Grid sampling of the score surface over two chosen dimensions.

use serde::{Deserialize, Serialize};

use crate::engine::HiScoreEngine;
use crate::error::HiScoreError;

pub const DEFAULT_RESOLUTION: usize = 50;

/// Which plane to sample. `fixed` holds a value for every dimension; the two
/// entries at `x_axis` and `y_axis` are overwritten by the grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceSpec {
    pub x_axis: usize,
    pub y_axis: usize,
    pub fixed: Vec<f64>,
    #[serde(default = "default_resolution")]
    pub resolution: usize,
}

fn default_resolution() -> usize {
    DEFAULT_RESOLUTION
}

impl SurfaceSpec {
    pub fn new(x_axis: usize, y_axis: usize, fixed: Vec<f64>) -> Self {
        Self {
            x_axis,
            y_axis,
            fixed,
            resolution: DEFAULT_RESOLUTION,
        }
    }

    pub fn with_resolution(mut self, resolution: usize) -> Self {
        self.resolution = resolution;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfaceSample {
    pub x: f64,
    pub y: f64,
    pub score: f64,
}

/// Evaluate the engine on a `resolution x resolution` grid spanning the raw
/// reference range of both axes. Row-major: the x axis is the outer loop.
pub fn sample_surface(
    engine: &HiScoreEngine,
    spec: &SurfaceSpec,
) -> Result<Vec<SurfaceSample>, HiScoreError> {
    let dims = engine.dims();
    if spec.fixed.len() != dims {
        return Err(HiScoreError::DimensionMismatch {
            expected: dims,
            got: spec.fixed.len(),
        });
    }
    if spec.x_axis >= dims || spec.y_axis >= dims || spec.x_axis == spec.y_axis {
        return Err(HiScoreError::InvalidAxis {
            first: spec.x_axis,
            second: spec.y_axis,
            dims,
        });
    }
    if spec.resolution < 2 {
        return Err(HiScoreError::InvalidResolution(spec.resolution));
    }

    let ranges = engine.normalizer().ranges();
    let xs = linspace(ranges[spec.x_axis], spec.resolution);
    let ys = linspace(ranges[spec.y_axis], spec.resolution);

    let mut query = spec.fixed.clone();
    let mut out = Vec::with_capacity(xs.len() * ys.len());
    for &x in &xs {
        for &y in &ys {
            query[spec.x_axis] = x;
            query[spec.y_axis] = y;
            out.push(SurfaceSample {
                x,
                y,
                score: engine.evaluate_one(&query)?,
            });
        }
    }
    Ok(out)
}

fn linspace((lo, hi): (f64, f64), n: usize) -> Vec<f64> {
    let step = (hi - lo) / (n - 1) as f64;
    (0..n)
        .map(|i| if i + 1 == n { hi } else { lo + step * i as f64 })
        .collect()
}
