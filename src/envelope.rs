//! Runtime form of a reference point and its solved cones.

use crate::cone::{SlopeArena, SlopeKind};
use crate::normalize::NormalizedPoint;

/// A reference point with its four slope vectors, all in normalized space.
///
/// Per dimension `sup_plus >= inf_plus` and `inf_minus >= sup_minus`; all
/// slopes are non-negative.
#[derive(Debug, Clone, PartialEq)]
pub struct EnvelopePoint {
    raw: Vec<f64>,
    coords: Vec<f64>,
    value: f64,
    sup_plus: Vec<f64>,
    inf_plus: Vec<f64>,
    sup_minus: Vec<f64>,
    inf_minus: Vec<f64>,
}

impl EnvelopePoint {
    pub fn from_arena(point: &NormalizedPoint, arena: &SlopeArena, index: usize) -> Self {
        Self {
            raw: point.raw.clone(),
            coords: point.coords.clone(),
            value: point.value,
            sup_plus: arena.slopes(index, SlopeKind::SupPlus).to_vec(),
            inf_plus: arena.slopes(index, SlopeKind::InfPlus).to_vec(),
            sup_minus: arena.slopes(index, SlopeKind::SupMinus).to_vec(),
            inf_minus: arena.slopes(index, SlopeKind::InfMinus).to_vec(),
        }
    }

    /// Raw coordinate as supplied by the caller.
    pub fn raw(&self) -> &[f64] {
        &self.raw
    }

    pub fn coords(&self) -> &[f64] {
        &self.coords
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn slopes(&self, kind: SlopeKind) -> &[f64] {
        match kind {
            SlopeKind::SupPlus => &self.sup_plus,
            SlopeKind::InfPlus => &self.inf_plus,
            SlopeKind::SupMinus => &self.sup_minus,
            SlopeKind::InfMinus => &self.inf_minus,
        }
    }

    /// Upper bound on the score at normalized coordinate `other`.
    pub fn upper_bound(&self, other: &[f64]) -> f64 {
        self.value + cone_offset(&self.coords, other, &self.sup_plus, &self.sup_minus)
    }

    /// Lower bound on the score at normalized coordinate `other`.
    pub fn lower_bound(&self, other: &[f64]) -> f64 {
        self.value + cone_offset(&self.coords, other, &self.inf_plus, &self.inf_minus)
    }
}

fn cone_offset(origin: &[f64], other: &[f64], plus: &[f64], minus: &[f64]) -> f64 {
    let mut acc = 0.0;
    for (d, (a, b)) in origin.iter().zip(other.iter()).enumerate() {
        let run = b - a;
        if run > 0.0 {
            acc += run * plus[d];
        } else if run < 0.0 {
            acc += run * minus[d];
        }
    }
    acc
}
