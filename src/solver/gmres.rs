//! Generalized Minimal Residual (GMRES) solver with fixed restart (Saad §6.4)
//!
//! Modified Gram–Schmidt Arnoldi with Givens rotations for the least-squares
//! update. Left preconditioning minimizes ‖M(b − Ax)‖ and measures
//! convergence relative to ‖M b‖; right preconditioning minimizes the true
//! residual. One preconditioner application per iteration.
//!
//! # References
//! - Saad, Y. (2003). Iterative Methods for Sparse Linear Systems, 2nd Edition. SIAM. §6.4, §9.3

use crate::backend::Backend;
use crate::config::{ParamStore, SolverKind};
use crate::core::traits::Scalar;
use crate::error::KError;
use crate::preconditioner::Preconditioner;
use crate::solver::IterativeSolver;
use crate::utils::convergence::{Convergence, SolveStats};
use num_traits::{Float, One, Zero};
use std::str::FromStr;
use tracing::debug;

/// Preconditioning side for GMRES.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Preconditioning {
    Left,
    Right,
}

impl FromStr for Preconditioning {
    type Err = KError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "left" => Ok(Preconditioning::Left),
            "right" => Ok(Preconditioning::Right),
            other => Err(KError::unsupported("preconditioning side", other)),
        }
    }
}

/// GMRES solver struct with restart and preconditioning options.
#[derive(Debug, Clone)]
pub struct GmresSolver<T> {
    /// Number of Arnoldi vectors before restart
    pub restart: usize,
    pub conv: Convergence<T>,
    pub preconditioning: Preconditioning,
}

impl<T: Scalar> GmresSolver<T> {
    pub fn new(restart: usize, conv: Convergence<T>) -> Self {
        Self { restart: restart.max(1), conv, preconditioning: Preconditioning::Right }
    }

    pub fn with_preconditioning(mut self, mode: Preconditioning) -> Self {
        self.preconditioning = mode;
        self
    }

    /// Read `M`, `pside` and the convergence keys from a `solver` subtree.
    pub fn from_params(prm: &ParamStore) -> Result<Self, KError> {
        let side = prm.get_or("pside", Preconditioning::Right)?;
        Ok(Self::new(prm.get_or("M", 30)?, Convergence::from_params(prm)?).with_preconditioning(side))
    }
}

fn givens<T: Scalar>(a: T, b: T) -> (T, T) {
    if b.is_zero() {
        (T::one(), T::zero())
    } else {
        let r = a.hypot(b);
        (a / r, b / r)
    }
}

impl<B: Backend> IterativeSolver<B> for GmresSolver<B::Value> {
    fn kind(&self) -> SolverKind {
        SolverKind::Gmres
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
        let m = self.restart;
        let left = self.preconditioning == Preconditioning::Left;

        let mut t = bk.create_vector(n);
        let mut w = bk.create_vector(n);
        let norm_rhs = if left {
            pc.apply(bk, rhs, &mut t)?;
            bk.norm(&t)
        } else {
            bk.norm(rhs)
        };
        if norm_rhs.is_zero() {
            bk.clear(x);
            return Ok(SolveStats::zero_rhs());
        }
        let eps = self.conv.threshold(norm_rhs);

        let mut v: Vec<B::Vector> = (0..=m).map(|_| bk.create_vector(n)).collect();
        let mut h = vec![vec![zero; m]; m + 1];
        let mut cs = vec![zero; m];
        let mut sn = vec![zero; m];
        let mut s = vec![zero; m + 1];

        let mut iter = 0;
        let mut res;
        loop {
            // r = b − A x, preconditioned from the left when requested
            if left {
                bk.residual(rhs, a, x, &mut w);
                pc.apply(bk, &w, &mut v[0])?;
            } else {
                bk.residual(rhs, a, x, &mut v[0]);
            }
            let beta = bk.norm(&v[0]);
            res = beta;
            if res <= eps || iter >= self.conv.max_iters {
                break;
            }
            bk.scale(one / beta, &mut v[0]);
            s.iter_mut().for_each(|si| *si = zero);
            s[0] = beta;

            let mut k = 0;
            while k < m && iter < self.conv.max_iters {
                if left {
                    bk.spmv(one, a, &v[k], zero, &mut t);
                    pc.apply(bk, &t, &mut w)?;
                } else {
                    pc.apply(bk, &v[k], &mut t)?;
                    bk.spmv(one, a, &t, zero, &mut w);
                }
                for i in 0..=k {
                    h[i][k] = bk.dot(&w, &v[i]);
                    bk.axpby(-h[i][k], &v[i], one, &mut w);
                }
                let hk1 = bk.norm(&w);
                h[k + 1][k] = hk1;

                for i in 0..k {
                    let tmp = cs[i] * h[i][k] + sn[i] * h[i + 1][k];
                    h[i + 1][k] = -sn[i] * h[i][k] + cs[i] * h[i + 1][k];
                    h[i][k] = tmp;
                }
                let (c, sg) = givens(h[k][k], h[k + 1][k]);
                cs[k] = c;
                sn[k] = sg;
                h[k][k] = c * h[k][k] + sg * h[k + 1][k];
                h[k + 1][k] = zero;
                s[k + 1] = -sg * s[k];
                s[k] = c * s[k];

                iter += 1;
                k += 1;
                res = s[k].abs();
                if hk1.is_zero() || res <= eps {
                    break;
                }
                bk.copy(&w, &mut v[k]);
                bk.scale(one / hk1, &mut v[k]);
            }

            // back substitution for the k×k triangular system
            let mut yk = vec![zero; k];
            for i in (0..k).rev() {
                let mut acc = s[i];
                for j in i + 1..k {
                    acc -= h[i][j] * yk[j];
                }
                yk[i] = if h[i][i].is_zero() { zero } else { acc / h[i][i] };
            }
            bk.clear(&mut w);
            for (i, &yi) in yk.iter().enumerate() {
                bk.axpby(yi, &v[i], one, &mut w);
            }
            if left {
                bk.axpby(one, &w, one, x);
            } else {
                pc.apply(bk, &w, &mut t)?;
                bk.axpby(one, &t, one, x);
            }
            if res <= eps {
                break;
            }
        }

        let stats = self.conv.stats(res, norm_rhs, iter, res <= eps);
        debug!(iterations = stats.iterations, residual = ?stats.residual, "gmres finished");
        Ok(stats)
    }
}
