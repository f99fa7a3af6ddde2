//! BiCGStab(ℓ), right-preconditioned.
//!
//! Works on the right-preconditioned operator `A·M` with the update
//! variable `y`; the solution is recovered as `x += M y` on exit. Each outer
//! iteration performs ℓ BiCG steps followed by a minimal-residual
//! polynomial step of degree ℓ, whose small normal-equations system is solved
//! densely with faer.
//!
//! Reference: Sleijpen, Fokkema (1993). BiCGstab(ℓ) for linear equations
//! involving unsymmetric matrices with complex spectrum.

use crate::backend::Backend;
use crate::config::{ParamStore, SolverKind};
use crate::core::traits::{Scalar, cast};
use crate::error::KError;
use crate::preconditioner::Preconditioner;
use crate::solver::IterativeSolver;
use crate::utils::convergence::{Convergence, SolveStats};
use faer::linalg::solvers::{FullPivLu, SolveCore};
use faer::{Conj, Mat, MatMut};
use num_traits::{One, ToPrimitive, Zero};
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct BiCgStabLSolver<T> {
    pub conv: Convergence<T>,
    /// Degree ℓ of the minimal-residual polynomial.
    pub l: usize,
}

impl<T: Scalar> BiCgStabLSolver<T> {
    pub fn new(conv: Convergence<T>, l: usize) -> Self {
        Self { conv, l: l.max(1) }
    }

    pub fn from_params(prm: &ParamStore) -> Result<Self, KError> {
        Ok(Self::new(Convergence::from_params(prm)?, prm.get_or("L", 2)?))
    }
}

/// Minimize ‖r₀ − Σⱼ γⱼ rⱼ‖ through the normal equations. `None` when the
/// system is singular.
fn mr_coefficients<T: Scalar>(gram: &[Vec<T>], rhs: &[T]) -> Option<Vec<T>> {
    let l = rhs.len();
    let z = Mat::<f64>::from_fn(l, l, |i, j| gram[i][j].to_f64().unwrap_or(f64::NAN));
    let mut g: Vec<f64> = rhs.iter().map(|v| v.to_f64().unwrap_or(f64::NAN)).collect();
    let lu = FullPivLu::new(z.as_ref());
    lu.solve_in_place_with_conj(Conj::No, MatMut::from_column_major_slice_mut(&mut g, l, 1));
    if g.iter().all(|v| v.is_finite()) { Some(g.into_iter().map(cast).collect()) } else { None }
}

impl<B: Backend> IterativeSolver<B> for BiCgStabLSolver<B::Value> {
    fn kind(&self) -> SolverKind {
        SolverKind::BiCgStabL
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
        let l = self.l;

        let norm_rhs = bk.norm(rhs);
        if norm_rhs.is_zero() {
            bk.clear(x);
            return Ok(SolveStats::zero_rhs());
        }
        let eps = self.conv.threshold(norm_rhs);

        let mut r: Vec<B::Vector> = (0..=l).map(|_| bk.create_vector(n)).collect();
        let mut u: Vec<B::Vector> = (0..=l).map(|_| bk.create_vector(n)).collect();
        let mut y = bk.create_vector(n);
        let mut rt = bk.create_vector(n);
        let mut tmp = bk.create_vector(n);

        // w = A M v
        let op = |v: &B::Vector, w: &mut B::Vector, tmp: &mut B::Vector| -> Result<(), KError> {
            pc.apply(bk, v, tmp)?;
            bk.spmv(one, a, tmp, zero, w);
            Ok(())
        };

        bk.residual(rhs, a, x, &mut r[0]);
        bk.copy(&r[0], &mut rt);
        let mut res = bk.norm(&r[0]);

        let (mut rho0, mut alpha, mut omega) = (one, zero, one);
        let mut iter = 0;
        'outer: while iter < self.conv.max_iters && res > eps {
            iter += 1;
            rho0 = -omega * rho0;

            for j in 0..l {
                let rho1 = bk.dot(&r[j], &rt);
                if rho0.is_zero() {
                    warn!(iter, "bicgstab(l) breakdown: rho = 0");
                    break 'outer;
                }
                let beta = alpha * rho1 / rho0;
                rho0 = rho1;
                for i in 0..=j {
                    bk.axpby(one, &r[i], -beta, &mut u[i]);
                }
                let (lo, hi) = u.split_at_mut(j + 1);
                op(&lo[j], &mut hi[0], &mut tmp)?;

                let gamma = bk.dot(&u[j + 1], &rt);
                if gamma.is_zero() {
                    warn!(iter, "bicgstab(l) breakdown: gamma = 0");
                    break 'outer;
                }
                alpha = rho0 / gamma;
                for i in 0..=j {
                    bk.axpby(-alpha, &u[i + 1], one, &mut r[i]);
                }
                let (lo, hi) = r.split_at_mut(j + 1);
                op(&lo[j], &mut hi[0], &mut tmp)?;
                bk.axpby(alpha, &u[0], one, &mut y);

                res = bk.norm(&r[0]);
                if res <= eps {
                    break 'outer;
                }
            }

            let gram: Vec<Vec<B::Value>> =
                (1..=l).map(|i| (1..=l).map(|j| bk.dot(&r[i], &r[j])).collect()).collect();
            let proj: Vec<B::Value> = (1..=l).map(|i| bk.dot(&r[i], &r[0])).collect();
            let Some(gamma) = mr_coefficients(&gram, &proj) else {
                warn!(iter, "bicgstab(l) breakdown: singular minimal-residual system");
                break;
            };

            for (jm1, &g) in gamma.iter().enumerate() {
                let j = jm1 + 1;
                bk.axpby(g, &r[jm1], one, &mut y);
                let (lo, hi) = r.split_at_mut(j);
                bk.axpby(-g, &hi[0], one, &mut lo[0]);
                let (lo, hi) = u.split_at_mut(j);
                bk.axpby(-g, &hi[0], one, &mut lo[0]);
            }
            omega = gamma[l - 1];
            res = bk.norm(&r[0]);
        }

        // x += M y
        pc.apply(bk, &y, &mut tmp)?;
        bk.axpby(one, &tmp, one, x);

        let stats = self.conv.stats(res, norm_rhs, iter, res <= eps);
        debug!(iterations = stats.iterations, residual = ?stats.residual, "bicgstab(l) finished");
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn normal_equations_solution() {
        let gram = vec![vec![2.0, 0.0], vec![0.0, 4.0]];
        let g = mr_coefficients(&gram, &[2.0, 2.0]).unwrap();
        assert_abs_diff_eq!(g[0], 1.0, epsilon = 1e-14);
        assert_abs_diff_eq!(g[1], 0.5, epsilon = 1e-14);
    }

    #[test]
    fn singular_system_is_reported() {
        let gram = vec![vec![0.0, 0.0], vec![0.0, 0.0]];
        assert!(mr_coefficients::<f64>(&gram, &[1.0, 1.0]).is_none());
    }
}
