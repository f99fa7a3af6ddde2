//! BiConjugate Gradient Stabilized (BiCGStab), right-preconditioned.
//!
//! Each iteration applies the preconditioner and the operator twice. The
//! residual is checked after the half step as well, so a converged first
//! half finishes the iteration early.
//!
//! Reference: van der Vorst (1992). Bi-CGSTAB: A fast and smoothly converging
//! variant of Bi-CG for the solution of nonsymmetric linear systems.

use crate::backend::Backend;
use crate::config::{ParamStore, SolverKind};
use crate::core::traits::Scalar;
use crate::error::KError;
use crate::preconditioner::Preconditioner;
use crate::solver::IterativeSolver;
use crate::utils::convergence::{Convergence, SolveStats};
use num_traits::{One, Zero};
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct BiCgStabSolver<T> {
    pub conv: Convergence<T>,
}

impl<T: Scalar> BiCgStabSolver<T> {
    pub fn new(conv: Convergence<T>) -> Self {
        Self { conv }
    }

    pub fn from_params(prm: &ParamStore) -> Result<Self, KError> {
        Ok(Self::new(Convergence::from_params(prm)?))
    }
}

impl<B: Backend> IterativeSolver<B> for BiCgStabSolver<B::Value> {
    fn kind(&self) -> SolverKind {
        SolverKind::BiCgStab
    }

    fn solve(
        &self,
        bk: &B,
        a: &B::Matrix,
        pc: &dyn Preconditioner<B>,
        rhs: &B::Vector,
        x: &mut B::Vector,
    ) -> Result<SolveStats<B::Value>, KError> {
        let one = B::Value::one();
        let zero = B::Value::zero();
        let n = bk.vector_len(rhs);

        let norm_rhs = bk.norm(rhs);
        if norm_rhs.is_zero() {
            bk.clear(x);
            return Ok(SolveStats::zero_rhs());
        }
        let eps = self.conv.threshold(norm_rhs);

        let mut r = bk.create_vector(n);
        let mut rh = bk.create_vector(n);
        let mut p = bk.create_vector(n);
        let mut v = bk.create_vector(n);
        let mut ph = bk.create_vector(n);
        let mut sh = bk.create_vector(n);
        let mut t = bk.create_vector(n);

        bk.residual(rhs, a, x, &mut r);
        bk.copy(&r, &mut rh);
        let mut res = bk.norm(&r);

        let (mut rho_prev, mut alpha, mut omega) = (one, one, one);
        let mut iter = 0;
        while iter < self.conv.max_iters && res > eps {
            let rho = bk.dot(&rh, &r);
            if rho.is_zero() {
                warn!(iter, "bicgstab breakdown: rho = 0");
                break;
            }
            if iter == 0 {
                bk.copy(&r, &mut p);
            } else {
                let beta = (rho / rho_prev) * (alpha / omega);
                bk.axpbypcz(one, &r, -beta * omega, &v, beta, &mut p);
            }

            pc.apply(bk, &p, &mut ph)?;
            bk.spmv(one, a, &ph, zero, &mut v);
            let rhv = bk.dot(&rh, &v);
            if rhv.is_zero() {
                warn!(iter, "bicgstab breakdown: r̂·v = 0");
                break;
            }
            alpha = rho / rhv;
            bk.axpby(-alpha, &v, one, &mut r);
            iter += 1;

            res = bk.norm(&r);
            if res <= eps {
                bk.axpby(alpha, &ph, one, x);
                break;
            }

            pc.apply(bk, &r, &mut sh)?;
            bk.spmv(one, a, &sh, zero, &mut t);
            let tt = bk.dot(&t, &t);
            omega = if tt.is_zero() { zero } else { bk.dot(&t, &r) / tt };
            bk.axpbypcz(alpha, &ph, omega, &sh, one, x);
            bk.axpby(-omega, &t, one, &mut r);
            res = bk.norm(&r);
            rho_prev = rho;
            if omega.is_zero() {
                warn!(iter, "bicgstab breakdown: omega = 0");
                break;
            }
        }

        let stats = self.conv.stats(res, norm_rhs, iter, res <= eps);
        debug!(iterations = stats.iterations, residual = ?stats.residual, "bicgstab finished");
        Ok(stats)
    }
}
