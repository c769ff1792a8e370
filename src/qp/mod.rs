//! Convex quadratic programs over non-negative variables.
//!
//! A [`QuadraticProgram`] is
//!
//! ```text
//! minimize    sum_k w_k (a_k' x)^2  +  ridge * ||x||^2
//! subject to  c_i' x (<= | >=) b_i
//!             x >= 0
//! ```
//!
//! Backends implement [`QpSolver`]; [`InteriorPointSolver`] is the default.

mod interior_point;

pub use interior_point::InteriorPointSolver;

use nalgebra::{DMatrix, DVector};

/// Handle to a declared variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VarId(pub usize);

/// Sparse linear expression `sum coef * x[var]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearExpr {
    terms: Vec<(VarId, f64)>,
}

impl LinearExpr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn term(mut self, var: VarId, coef: f64) -> Self {
        self.push(var, coef);
        self
    }

    pub fn push(&mut self, var: VarId, coef: f64) {
        if coef != 0.0 {
            self.terms.push((var, coef));
        }
    }

    pub fn terms(&self) -> &[(VarId, f64)] {
        &self.terms
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn eval(&self, x: &[f64]) -> f64 {
        self.terms.iter().map(|(v, c)| c * x[v.0]).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sense {
    LessEqual,
    GreaterEqual,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub expr: LinearExpr,
    pub sense: Sense,
    pub rhs: f64,
}

impl Constraint {
    /// Signed violation; `<= 0` when satisfied.
    pub fn violation(&self, x: &[f64]) -> f64 {
        let lhs = self.expr.eval(x);
        match self.sense {
            Sense::LessEqual => lhs - self.rhs,
            Sense::GreaterEqual => self.rhs - lhs,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct QuadraticProgram {
    num_vars: usize,
    squares: Vec<(LinearExpr, f64)>,
    ridge: f64,
    constraints: Vec<Constraint>,
}

impl QuadraticProgram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_nonneg_var(&mut self) -> VarId {
        let id = VarId(self.num_vars);
        self.num_vars += 1;
        id
    }

    pub fn add_constraint(&mut self, expr: LinearExpr, sense: Sense, rhs: f64) {
        self.constraints.push(Constraint { expr, sense, rhs });
    }

    /// Add `weight * (expr)^2` to the objective. `weight` must be non-negative.
    pub fn add_square(&mut self, expr: LinearExpr, weight: f64) {
        debug_assert!(weight >= 0.0);
        self.squares.push((expr, weight));
    }

    pub fn set_ridge(&mut self, ridge: f64) {
        self.ridge = ridge.max(0.0);
    }

    pub fn num_vars(&self) -> usize {
        self.num_vars
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn objective(&self, x: &[f64]) -> f64 {
        let squares: f64 = self
            .squares
            .iter()
            .map(|(e, w)| {
                let v = e.eval(x);
                w * v * v
            })
            .sum();
        squares + self.ridge * x.iter().map(|v| v * v).sum::<f64>()
    }

    /// Dense standard form `min 1/2 x'Px  s.t.  Gx <= h`, with the
    /// non-negativity of every variable appended as `-x <= 0` rows.
    pub(crate) fn standard_form(&self) -> (DMatrix<f64>, DMatrix<f64>, DVector<f64>) {
        let n = self.num_vars;
        let mut p = DMatrix::<f64>::zeros(n, n);
        for (expr, w) in &self.squares {
            for &(vi, ci) in expr.terms() {
                for &(vj, cj) in expr.terms() {
                    p[(vi.0, vj.0)] += 2.0 * w * ci * cj;
                }
            }
        }
        for d in 0..n {
            p[(d, d)] += 2.0 * self.ridge;
        }

        let m = self.constraints.len() + n;
        let mut g = DMatrix::<f64>::zeros(m, n);
        let mut h = DVector::<f64>::zeros(m);
        for (row, c) in self.constraints.iter().enumerate() {
            let sign = match c.sense {
                Sense::LessEqual => 1.0,
                Sense::GreaterEqual => -1.0,
            };
            for &(v, coef) in c.expr.terms() {
                g[(row, v.0)] += sign * coef;
            }
            h[row] = sign * c.rhs;
        }
        let offset = self.constraints.len();
        for d in 0..n {
            g[(offset + d, d)] = -1.0;
        }
        (p, g, h)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QpSolution {
    pub values: Vec<f64>,
    pub objective: f64,
    pub iterations: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum QpOutcome {
    Optimal(QpSolution),
    /// A Farkas certificate was found: no point satisfies the constraints.
    Infeasible,
    /// Anything else: iteration limit, numerical breakdown.
    Failed { reason: String },
}

/// A convex QP backend.
pub trait QpSolver {
    fn solve(&self, program: &QuadraticProgram) -> QpOutcome;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_form_flips_greater_equal_rows() {
        let mut qp = QuadraticProgram::new();
        let a = qp.add_nonneg_var();
        let b = qp.add_nonneg_var();
        qp.add_constraint(LinearExpr::new().term(a, 1.0).term(b, 2.0), Sense::GreaterEqual, 3.0);
        qp.add_square(LinearExpr::new().term(a, 1.0).term(b, -1.0), 1.0);

        let (p, g, h) = qp.standard_form();
        assert_eq!(g.nrows(), 3);
        assert_eq!((g[(0, 0)], g[(0, 1)], h[0]), (-1.0, -2.0, -3.0));
        assert_eq!((g[(1, 0)], g[(2, 1)]), (-1.0, -1.0));
        assert_eq!((p[(0, 0)], p[(0, 1)], p[(1, 1)]), (2.0, -2.0, 2.0));
    }

    #[test]
    fn zero_coefficients_are_dropped() {
        let expr = LinearExpr::new().term(VarId(0), 0.0).term(VarId(1), 1.5);
        assert_eq!(expr.terms(), &[(VarId(1), 1.5)]);
        assert_eq!(expr.eval(&[9.0, 2.0]), 3.0);
        assert!(LinearExpr::new().term(VarId(0), 0.0).is_empty());
    }
}
