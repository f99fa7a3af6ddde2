//! Sparse approximate inverse with diagonal pattern (SPAI-0).
//!
//! `M = diag(m)` minimizing ‖I − M A‖_F row by row, which gives
//! `m_i = a_ii / Σ_j a_ij²`. A row without nonzeros gets `m_i = 0`, so the
//! smoother never fails at setup.
//!
//! Reference: Bröker, Grote (2002). Sparse approximate inverse smoothers for
//! geometric and algebraic multigrid.

use crate::backend::Backend;
use crate::config::RelaxationKind;
use crate::matrix::CsrMatrix;
use crate::preconditioner::Relaxation;
use num_traits::{One, Zero};

pub struct Spai0<B: Backend> {
    m: B::Vector,
}

impl<B: Backend> Spai0<B> {
    pub fn new(bk: &B, a: &CsrMatrix<B::Value>) -> Self {
        let m: Vec<B::Value> = (0..a.nrows())
            .map(|i| {
                let (cols, vals) = a.row(i);
                let mut num = B::Value::zero();
                let mut den = B::Value::zero();
                for (&j, &v) in cols.iter().zip(vals) {
                    if j == i {
                        num += v;
                    }
                    den += v * v;
                }
                if den.is_zero() { B::Value::zero() } else { num / den }
            })
            .collect();
        Self { m: bk.copy_vector(&m) }
    }
}

impl<B: Backend> Relaxation<B> for Spai0<B> {
    fn kind(&self) -> RelaxationKind {
        RelaxationKind::Spai0
    }

    fn apply_pre(&self, bk: &B, a: &B::Matrix, rhs: &B::Vector, x: &mut B::Vector, tmp: &mut B::Vector) {
        bk.residual(rhs, a, x, tmp);
        bk.vmul(B::Value::one(), &self.m, tmp, B::Value::one(), x);
    }

    fn apply(&self, bk: &B, _a: &B::Matrix, rhs: &B::Vector, x: &mut B::Vector, _tmp: &mut B::Vector) {
        bk.vmul(B::Value::one(), &self.m, rhs, B::Value::zero(), x);
    }
}
