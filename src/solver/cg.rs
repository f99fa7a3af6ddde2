//! Preconditioned Conjugate Gradient (PCG) per Saad §9.2
//!
//! For symmetric positive definite operators and preconditioners. One
//! preconditioner application and one operator application per iteration.

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
pub struct CgSolver<T> {
    pub conv: Convergence<T>,
}

impl<T: Scalar> CgSolver<T> {
    pub fn new(conv: Convergence<T>) -> Self {
        Self { conv }
    }

    /// Read from a `solver` subtree.
    pub fn from_params(prm: &ParamStore) -> Result<Self, KError> {
        Ok(Self::new(Convergence::from_params(prm)?))
    }
}

impl<B: Backend> IterativeSolver<B> for CgSolver<B::Value> {
    fn kind(&self) -> SolverKind {
        SolverKind::Cg
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
        let mut s = bk.create_vector(n);
        let mut p = bk.create_vector(n);
        let mut q = bk.create_vector(n);

        bk.residual(rhs, a, x, &mut r);
        let mut res = bk.norm(&r);
        let mut rho_prev = one;
        let mut iter = 0;
        while iter < self.conv.max_iters && res > eps {
            pc.apply(bk, &r, &mut s)?;
            let rho = bk.dot(&r, &s);
            if rho.is_zero() {
                warn!(iter, "cg breakdown: rho = 0");
                break;
            }
            if iter == 0 {
                bk.copy(&s, &mut p);
            } else {
                bk.axpby(one, &s, rho / rho_prev, &mut p);
            }
            bk.spmv(one, a, &p, zero, &mut q);
            let pq = bk.dot(&q, &p);
            if pq.is_zero() {
                warn!(iter, "cg breakdown: p·Ap = 0");
                break;
            }
            let alpha = rho / pq;
            bk.axpby(alpha, &p, one, x);
            bk.axpby(-alpha, &q, one, &mut r);
            rho_prev = rho;
            res = bk.norm(&r);
            iter += 1;
        }

        let stats = self.conv.stats(res, norm_rhs, iter, res <= eps);
        debug!(iterations = stats.iterations, residual = ?stats.residual, "cg finished");
        Ok(stats)
    }
}
