//! Convergence tracking & tolerance checks for iterative solvers.

use crate::config::ParamStore;
use crate::core::traits::{Scalar, cast};
use crate::error::KError;

/// Stopping criteria.
///
/// An iterate is accepted once `‖b − A x‖ ≤ max(tol · ‖b‖, abstol)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Convergence<T> {
    pub tol: T,
    pub abstol: T,
    pub max_iters: usize,
}

/// Outcome of one solve. `residual` is relative to ‖b‖.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SolveStats<T> {
    pub iterations: usize,
    pub residual: T,
    pub converged: bool,
}

impl<T: Scalar> Default for Convergence<T> {
    fn default() -> Self {
        Self { tol: cast(1e-8), abstol: T::zero(), max_iters: 100 }
    }
}

impl<T: Scalar> Convergence<T> {
    /// Read `tol`, `abstol` and `maxiter` from a `solver` subtree.
    pub fn from_params(prm: &ParamStore) -> Result<Self, KError> {
        Ok(Self {
            tol: cast(prm.get_or("tol", 1e-8)?),
            abstol: cast(prm.get_or("abstol", 0.0)?),
            max_iters: prm.get_or("maxiter", 100)?,
        })
    }

    /// Absolute residual norm that counts as converged for a rhs of norm `rhs_norm`.
    pub fn threshold(&self, rhs_norm: T) -> T {
        (self.tol * rhs_norm).max(self.abstol)
    }

    pub fn stats(&self, res_norm: T, rhs_norm: T, i: usize, converged: bool) -> SolveStats<T> {
        let residual = if rhs_norm.is_zero() { res_norm } else { res_norm / rhs_norm };
        SolveStats { iterations: i, residual, converged }
    }
}

impl<T: Scalar> SolveStats<T> {
    /// Stats of a solve that returned immediately with x = 0.
    pub fn zero_rhs() -> Self {
        Self { iterations: 0, residual: T::zero(), converged: true }
    }
}
