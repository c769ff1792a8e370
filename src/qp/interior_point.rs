//! Dense primal-dual interior-point solver.
//!
//! Mehrotra predictor-corrector on the standard form
//! `min 1/2 x'Px  s.t.  Gx + s = h, s >= 0`, started from an infeasible point
//! (`x = 0, s = z = 1`). Each Newton step eliminates `ds` and `dz` and solves
//! the reduced system `(P + G' diag(z/s) G) dx = r` by Cholesky.
//!
//! Implementation notes:
//! - The cone programs built by this crate have `4 * dims` variables per
//!   block, so dense `nalgebra` storage is the right tool.
//! - When Cholesky fails the diagonal regularization is escalated and the
//!   factorization retried, rather than giving up on the first failure.

use nalgebra::linalg::Cholesky;
use nalgebra::{DMatrix, DVector, Dyn};
use tracing::{debug, trace};

use super::{QpOutcome, QpSolution, QpSolver, QuadraticProgram};
use crate::config::SolverSettings;

/// Regularization escalation steps tried after the base value.
const REGULARIZATION_RETRIES: usize = 5;

/// Multiplier applied to the regularization on each retry.
const REGULARIZATION_GROWTH: f64 = 100.0;

/// Smallest regularization used once escalation starts from zero.
const REGULARIZATION_FLOOR: f64 = 1e-12;

#[derive(Debug, Clone, Default)]
pub struct InteriorPointSolver {
    settings: SolverSettings,
}

struct Step {
    dx: DVector<f64>,
    ds: DVector<f64>,
    dz: DVector<f64>,
}

impl InteriorPointSolver {
    pub fn new(settings: SolverSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &SolverSettings {
        &self.settings
    }
}

impl QpSolver for InteriorPointSolver {
    fn solve(&self, program: &QuadraticProgram) -> QpOutcome {
        let cfg = &self.settings;
        let n = program.num_vars();
        if n == 0 {
            return QpOutcome::Optimal(QpSolution {
                values: Vec::new(),
                objective: 0.0,
                iterations: 0,
            });
        }

        let (p, g, h) = program.standard_form();
        let m = g.nrows();
        let tol = cfg.tolerance;
        let h_scale = 1.0 + h.amax();

        let mut x = DVector::<f64>::zeros(n);
        let mut s = DVector::<f64>::from_element(m, 1.0);
        let mut z = DVector::<f64>::from_element(m, 1.0);

        for iter in 0..=cfg.max_iterations {
            let px = &p * &x;
            let gtz = g.tr_mul(&z);
            let r_d = &px + &gtz;
            let r_p = &g * &x + &s - &h;
            let gap = s.dot(&z);
            let mu = gap / m as f64;

            let quad = 0.5 * x.dot(&px);
            let pres = r_p.amax() / h_scale;
            let dres = r_d.amax() / (1.0 + px.amax().max(gtz.amax()));
            trace!(iter, pres, dres, gap, "interior-point iterate");

            if !(pres.is_finite() && dres.is_finite() && gap.is_finite()) {
                return QpOutcome::Failed {
                    reason: format!("numerical breakdown at iteration {iter}"),
                };
            }
            if pres <= tol && dres <= tol && gap <= tol * (1.0 + quad.abs()) {
                let values: Vec<f64> = x.iter().copied().collect();
                let objective = program.objective(&values);
                debug!(iterations = iter, objective, "interior-point converged");
                return QpOutcome::Optimal(QpSolution {
                    values,
                    objective,
                    iterations: iter,
                });
            }
            if pres > tol && is_infeasibility_certificate(&g, &h, &z, cfg.infeasibility_tolerance) {
                debug!(iterations = iter, "interior-point found infeasibility certificate");
                return QpOutcome::Infeasible;
            }
            if iter == cfg.max_iterations {
                break;
            }

            let w = z.component_div(&s);
            let chol = match factor_reduced_kkt(&p, &g, &w, cfg.kkt_regularization) {
                Some(c) => c,
                None => {
                    return QpOutcome::Failed {
                        reason: format!("reduced KKT factorization failed at iteration {iter}"),
                    }
                }
            };

            let newton = |r_c: &DVector<f64>| -> Step {
                let rhs_w = (r_c - z.component_mul(&r_p)).component_div(&s);
                let dx = chol.solve(&(g.tr_mul(&rhs_w) - &r_d));
                let gdx = &g * &dx;
                let ds = -(&r_p + &gdx);
                let dz = (z.component_mul(&(&gdx + &r_p)) - r_c).component_div(&s);
                Step { dx, ds, dz }
            };

            // Predictor: pure Newton step towards complementarity.
            let r_c_aff = s.component_mul(&z);
            let aff = newton(&r_c_aff);
            let alpha_aff = step_length(&s, &aff.ds)
                .min(step_length(&z, &aff.dz))
                .min(1.0);
            let s_aff = &s + &aff.ds * alpha_aff;
            let z_aff = &z + &aff.dz * alpha_aff;
            let mu_aff = s_aff.dot(&z_aff) / m as f64;
            let sigma = (mu_aff / mu).powi(3).clamp(0.0, 1.0);

            // Corrector: second-order term plus centering.
            let r_c = (&r_c_aff + aff.ds.component_mul(&aff.dz)).add_scalar(-sigma * mu);
            let step = newton(&r_c);
            let alpha = (cfg.step_fraction
                * step_length(&s, &step.ds).min(step_length(&z, &step.dz)))
            .min(1.0);

            x += &step.dx * alpha;
            s += &step.ds * alpha;
            z += &step.dz * alpha;
        }

        if is_infeasibility_certificate(&g, &h, &z, cfg.infeasibility_tolerance) {
            return QpOutcome::Infeasible;
        }
        QpOutcome::Failed {
            reason: format!("no optimum within {} iterations", cfg.max_iterations),
        }
    }
}

/// Largest `alpha` keeping `v + alpha * dv >= 0`; infinite when `dv >= 0`.
fn step_length(v: &DVector<f64>, dv: &DVector<f64>) -> f64 {
    v.iter()
        .zip(dv.iter())
        .filter(|(_, d)| **d < 0.0)
        .map(|(vi, d)| -vi / d)
        .fold(f64::INFINITY, f64::min)
}

/// `z >= 0, G'z ~ 0, h'z < 0` proves `Gx <= h` has no solution.
fn is_infeasibility_certificate(
    g: &DMatrix<f64>,
    h: &DVector<f64>,
    z: &DVector<f64>,
    tol: f64,
) -> bool {
    let hz = h.dot(z);
    if hz >= 0.0 || !hz.is_finite() {
        return false;
    }
    g.tr_mul(z).amax() <= tol * -hz
}

fn factor_reduced_kkt(
    p: &DMatrix<f64>,
    g: &DMatrix<f64>,
    w: &DVector<f64>,
    base_regularization: f64,
) -> Option<Cholesky<f64, Dyn>> {
    let n = p.nrows();
    let scaled = DMatrix::from_fn(g.nrows(), g.ncols(), |i, j| g[(i, j)] * w[i]);
    let k = p + g.tr_mul(&scaled);

    let mut reg = base_regularization.max(0.0);
    for attempt in 0..=REGULARIZATION_RETRIES {
        let mut kr = k.clone();
        for d in 0..n {
            kr[(d, d)] += reg;
        }
        if let Some(c) = Cholesky::new(kr) {
            if attempt > 0 {
                trace!(regularization = reg, "reduced KKT factored after escalation");
            }
            return Some(c);
        }
        reg = (reg * REGULARIZATION_GROWTH).max(REGULARIZATION_FLOOR);
    }
    None
}
