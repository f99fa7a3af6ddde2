//! Smoothed aggregation.
//!
//! The tentative prolongation of plain aggregation is smoothed by one damped
//! Jacobi step on the filtered operator:
//!
//! ```text
//! P = (I − ω D_F⁻¹ A_F) P_tent,   ω = relax · (4/3) / ρ(D_F⁻¹ A_F)
//! ```
//!
//! The strength threshold is halved on every coarser level.

use super::{Coarsening, TransferOperators, aggregates::Aggregates, filtered_operator};
use crate::config::{CoarseningKind, ParamStore};
use crate::core::traits::{Scalar, cast};
use crate::error::KError;
use crate::matrix::{CsrMatrix, spectral_radius};
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct SmoothedAggregationParams {
    pub eps_strong: f64,
    /// Scale of the damping factor ω.
    pub relax: f64,
    /// Power iterations for ρ(D⁻¹A); 0 uses the Gershgorin bound.
    pub power_iters: usize,
}

impl Default for SmoothedAggregationParams {
    fn default() -> Self {
        Self { eps_strong: 0.08, relax: 1.0, power_iters: 0 }
    }
}

impl SmoothedAggregationParams {
    pub fn from_params(prm: &ParamStore) -> Result<Self, KError> {
        let d = Self::default();
        Ok(Self {
            eps_strong: prm.get_or("eps_strong", d.eps_strong)?,
            relax: prm.get_or("relax", d.relax)?,
            power_iters: prm.get_or("power_iters", d.power_iters)?,
        })
    }

    pub(crate) fn level_eps(&self, level: usize) -> f64 {
        self.eps_strong * 0.5f64.powi(level as i32)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SmoothedAggregation {
    pub params: SmoothedAggregationParams,
}

impl SmoothedAggregation {
    pub fn new(params: SmoothedAggregationParams) -> Self {
        Self { params }
    }
}

/// `I − ω D⁻¹ A_F`; the filtered operator always stores its diagonal, so the
/// result keeps the pattern of `A_F`.
pub(crate) fn jacobi_smoother<T: Scalar>(af: &CsrMatrix<T>, dinv: &[T], omega: T) -> Result<CsrMatrix<T>, KError> {
    let mut scaled = af.clone();
    scaled.scale_rows(dinv);
    CsrMatrix::identity(af.nrows()).add(T::one(), &scaled, -omega)
}

impl<T: Scalar> Coarsening<T> for SmoothedAggregation {
    fn kind(&self) -> CoarseningKind {
        CoarseningKind::SmoothedAggregation
    }

    fn transfer_operators(&self, a: &CsrMatrix<T>, level: usize) -> Result<TransferOperators<T>, KError> {
        let eps = self.params.level_eps(level);
        let agg = Aggregates::plain(a, cast::<T>(eps));
        let p_tent = agg.tentative_prolongation::<T>();
        let (af, dinv) = filtered_operator(a, &agg.strong);

        let rho = spectral_radius(&af, Some(&dinv), self.params.power_iters);
        let omega = if rho.is_zero() {
            T::zero()
        } else {
            cast::<T>(self.params.relax * 4.0 / 3.0) / rho
        };
        debug!(level, aggregates = agg.count, eps, omega = ?omega, "smoothed aggregation");

        let p = jacobi_smoother(&af, &dinv, omega)?.matmul(&p_tent)?;
        let r = p.transpose()?;
        Ok(TransferOperators { p, r })
    }
}
