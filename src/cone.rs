//! Cone construction: the quadratic program assigning every reference point
//! its tightest pair of directional bounding cones.
//!
//! For point `i` and every other point `j` with offset `diff = x_j - x_i`:
//!
//! ```text
//! sum_d diff[d] * S[d] >= v_j - v_i      (sup cone never undershoots v_j)
//! sum_d diff[d] * I[d] <= v_j - v_i      (inf cone never overshoots v_j)
//! ```
//!
//! where `S[d]` is `sup_plus[i,d]` for positive offsets and `sup_minus[i,d]`
//! for negative ones (zero offsets contribute nothing), `I` likewise. The
//! objective minimizes the squared cone widths
//! `(sup_plus - inf_plus)^2 + (inf_minus - sup_minus)^2`.
//!
//! No constraint or objective term mixes the slopes of two different points,
//! so the program is solved as one independent block per reference point.
//!
//! Each block is solved in units of its own largest value gap
//! ([`block_scale`]) and the slopes are rescaled afterwards. The program is
//! homogeneous in the values, so this changes conditioning only, not the
//! optimum. Solved cones are then widened by a tiny relative margin so that
//! solver round-off never leaves a neighbour's value outside them.

use tracing::debug;

use crate::error::HiScoreError;
use crate::normalize::NormalizedPoint;
use crate::qp::{LinearExpr, QpOutcome, QpSolver, QuadraticProgram, Sense, VarId};

/// Smallest relative widening applied to every solved cone.
const WIDEN_FLOOR: f64 = 1e-12;

/// The four slope vectors carried by each reference point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlopeKind {
    SupPlus,
    InfPlus,
    SupMinus,
    InfMinus,
}

impl SlopeKind {
    pub const ALL: [SlopeKind; 4] = [
        SlopeKind::SupPlus,
        SlopeKind::InfPlus,
        SlopeKind::SupMinus,
        SlopeKind::InfMinus,
    ];

    fn offset(self) -> usize {
        match self {
            SlopeKind::SupPlus => 0,
            SlopeKind::InfPlus => 1,
            SlopeKind::SupMinus => 2,
            SlopeKind::InfMinus => 3,
        }
    }
}

/// Flat storage of every slope, indexed by (point, kind, dimension).
///
/// Each point owns a contiguous `4 * dims` block laid out kind-major, which
/// is also the variable order of that point's cone program.
#[derive(Debug, Clone, PartialEq)]
pub struct SlopeArena {
    points: usize,
    dims: usize,
    values: Vec<f64>,
}

impl SlopeArena {
    pub fn zeros(points: usize, dims: usize) -> Self {
        Self {
            points,
            dims,
            values: vec![0.0; points * 4 * dims],
        }
    }

    pub fn points(&self) -> usize {
        self.points
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    pub fn index(&self, point: usize, kind: SlopeKind, dim: usize) -> usize {
        (point * 4 + kind.offset()) * self.dims + dim
    }

    pub fn get(&self, point: usize, kind: SlopeKind, dim: usize) -> f64 {
        self.values[self.index(point, kind, dim)]
    }

    pub fn slopes(&self, point: usize, kind: SlopeKind) -> &[f64] {
        let start = self.index(point, kind, 0);
        &self.values[start..start + self.dims]
    }

    fn block_mut(&mut self, point: usize) -> &mut [f64] {
        let len = 4 * self.dims;
        &mut self.values[point * len..(point + 1) * len]
    }

    /// Clip round-off negatives to zero and restore `sup_plus >= inf_plus`,
    /// `inf_minus >= sup_minus` by widening the cone.
    fn repair_block(&mut self, point: usize) {
        for v in self.block_mut(point) {
            *v = v.max(0.0);
        }
        for d in 0..self.dims {
            let ip = self.get(point, SlopeKind::InfPlus, d);
            let sm = self.get(point, SlopeKind::SupMinus, d);
            let sp_idx = self.index(point, SlopeKind::SupPlus, d);
            let im_idx = self.index(point, SlopeKind::InfMinus, d);
            self.values[sp_idx] = self.values[sp_idx].max(ip);
            self.values[im_idx] = self.values[im_idx].max(sm);
        }
    }

    /// Widen the cone of `point` until every pairwise constraint holds with
    /// a strict margin in floating point. Returns the relative widening.
    ///
    /// Sup slopes move outward (`sup_plus` up, `sup_minus` down) and inf
    /// slopes likewise, so the widened cone only loosens both bounds.
    fn widen_block(&mut self, points: &[NormalizedPoint], point: usize) -> f64 {
        let origin = &points[point];
        let mut eps = WIDEN_FLOOR;
        for (j, other) in points.iter().enumerate() {
            if j == point {
                continue;
            }
            let rise = other.value - origin.value;
            let (mut sup, mut inf, mut sup_gain, mut inf_gain) = (0.0, 0.0, 0.0, 0.0);
            for (d, (a, b)) in origin.coords.iter().zip(other.coords.iter()).enumerate() {
                let run = b - a;
                let (s, i) = if run > 0.0 {
                    (
                        self.get(point, SlopeKind::SupPlus, d),
                        self.get(point, SlopeKind::InfPlus, d),
                    )
                } else if run < 0.0 {
                    (
                        self.get(point, SlopeKind::SupMinus, d),
                        self.get(point, SlopeKind::InfMinus, d),
                    )
                } else {
                    continue;
                };
                sup += run * s;
                inf += run * i;
                sup_gain += run.abs() * s;
                inf_gain += run.abs() * i;
            }
            if sup < rise && sup_gain > 0.0 {
                eps = eps.max(2.0 * (rise - sup) / sup_gain);
            }
            if inf > rise && inf_gain > 0.0 {
                eps = eps.max(2.0 * (inf - rise) / inf_gain);
            }
        }

        for d in 0..self.dims {
            for (kind, factor) in [
                (SlopeKind::SupPlus, 1.0 + eps),
                (SlopeKind::InfPlus, 1.0 - eps),
                (SlopeKind::SupMinus, 1.0 - eps),
                (SlopeKind::InfMinus, 1.0 + eps),
            ] {
                let idx = self.index(point, kind, d);
                self.values[idx] = (self.values[idx] * factor).max(0.0);
            }
        }
        eps
    }
}

/// Largest `|v_j - v_i|` over the set, or 1 when every value equals `v_i`.
pub fn block_scale(points: &[NormalizedPoint], i: usize) -> f64 {
    let origin = points[i].value;
    let gap = points
        .iter()
        .map(|p| (p.value - origin).abs())
        .fold(0.0, f64::max);
    if gap > 0.0 {
        gap
    } else {
        1.0
    }
}

/// Cone program for reference point `i`: `4 * dims` non-negative variables,
/// `2 * dims` ordering constraints and `2 * (n - 1)` pairwise constraints.
///
/// Value gaps are divided by [`block_scale`], so every right-hand side lies
/// in `[-1, 1]`; slopes of the solution are in the same scaled units.
pub fn point_program(points: &[NormalizedPoint], i: usize, ridge: f64) -> QuadraticProgram {
    let origin = &points[i];
    let dims = origin.coords.len();
    let scale = block_scale(points, i);

    let mut qp = QuadraticProgram::new();
    let vars: Vec<VarId> = (0..4 * dims).map(|_| qp.add_nonneg_var()).collect();
    let var = |kind: SlopeKind, d: usize| vars[kind.offset() * dims + d];

    for d in 0..dims {
        let plus_width = LinearExpr::new()
            .term(var(SlopeKind::SupPlus, d), 1.0)
            .term(var(SlopeKind::InfPlus, d), -1.0);
        let minus_width = LinearExpr::new()
            .term(var(SlopeKind::InfMinus, d), 1.0)
            .term(var(SlopeKind::SupMinus, d), -1.0);
        qp.add_constraint(plus_width.clone(), Sense::GreaterEqual, 0.0);
        qp.add_constraint(minus_width.clone(), Sense::GreaterEqual, 0.0);
        qp.add_square(plus_width, 1.0);
        qp.add_square(minus_width, 1.0);
    }

    for (j, other) in points.iter().enumerate() {
        if j == i {
            continue;
        }
        let rise = (other.value - origin.value) / scale;
        let mut sup = LinearExpr::new();
        let mut inf = LinearExpr::new();
        for (d, (a, b)) in origin.coords.iter().zip(other.coords.iter()).enumerate() {
            let run = b - a;
            if run > 0.0 {
                sup.push(var(SlopeKind::SupPlus, d), run);
                inf.push(var(SlopeKind::InfPlus, d), run);
            } else if run < 0.0 {
                sup.push(var(SlopeKind::SupMinus, d), run);
                inf.push(var(SlopeKind::InfMinus, d), run);
            }
        }
        qp.add_constraint(sup, Sense::GreaterEqual, rise);
        qp.add_constraint(inf, Sense::LessEqual, rise);
    }

    qp.set_ridge(ridge);
    qp
}

/// Solve every point's cone program. Any non-optimal block is fatal.
pub fn solve_cones(
    points: &[NormalizedPoint],
    solver: &dyn QpSolver,
    ridge: f64,
) -> Result<SlopeArena, HiScoreError> {
    let dims = points.first().map(|p| p.coords.len()).unwrap_or(0);
    let mut arena = SlopeArena::zeros(points.len(), dims);

    for i in 0..points.len() {
        let program = point_program(points, i, ridge);
        let scale = block_scale(points, i);
        match solver.solve(&program) {
            QpOutcome::Optimal(sol) => {
                for (slot, v) in arena.block_mut(i).iter_mut().zip(sol.values) {
                    *slot = v * scale;
                }
                arena.repair_block(i);
                let widening = arena.widen_block(points, i);
                debug!(
                    point = i,
                    scale,
                    widening,
                    iterations = sol.iterations,
                    objective = sol.objective,
                    "cone block solved"
                );
            }
            QpOutcome::Infeasible => {
                return Err(HiScoreError::Infeasible {
                    point: points[i].raw.clone(),
                });
            }
            QpOutcome::Failed { reason } => {
                return Err(HiScoreError::SolverDidNotConverge {
                    point: points[i].raw.clone(),
                    reason,
                });
            }
        }
    }
    Ok(arena)
}
