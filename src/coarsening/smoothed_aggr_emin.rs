//! Smoothed aggregation with energy-minimizing damping.
//!
//! Instead of one global ω, every coarse basis function j gets its own
//! damping factor minimizing the A-energy of the smoothed column:
//!
//! ```text
//! d_j = D_F⁻¹ A_F P_tent,j
//! ω_j = ⟨A_F P_tent,j, d_j⟩ / ⟨A_F d_j, d_j⟩      (clamped to ≥ 0)
//! P_j = P_tent,j − ω_j d_j
//! ```
//!
//! Reference: Sala, Tuminaro (2008). A new Petrov–Galerkin smoothed
//! aggregation preconditioner for nonsymmetric linear systems.

use super::{Coarsening, TransferOperators, aggregates::Aggregates, filtered_operator};
use crate::config::{CoarseningKind, ParamStore};
use crate::core::traits::{Scalar, cast};
use crate::error::KError;
use crate::matrix::CsrMatrix;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct SmoothedAggrEminParams {
    pub eps_strong: f64,
}

impl Default for SmoothedAggrEminParams {
    fn default() -> Self {
        Self { eps_strong: 0.08 }
    }
}

impl SmoothedAggrEminParams {
    pub fn from_params(prm: &ParamStore) -> Result<Self, KError> {
        Ok(Self { eps_strong: prm.get_or("eps_strong", Self::default().eps_strong)? })
    }
}

#[derive(Debug, Clone, Default)]
pub struct SmoothedAggrEmin {
    pub params: SmoothedAggrEminParams,
}

impl SmoothedAggrEmin {
    pub fn new(params: SmoothedAggrEminParams) -> Self {
        Self { params }
    }
}

/// Per-column damping factors of the energy-minimizing prolongation.
pub(crate) fn column_damping<T: Scalar>(
    ap: &CsrMatrix<T>,
    dap: &CsrMatrix<T>,
    adap: &CsrMatrix<T>,
) -> Result<Vec<T>, KError> {
    let num = ap.column_inner(dap)?;
    let den = adap.column_inner(dap)?;
    Ok(num
        .into_iter()
        .zip(den)
        .map(|(n, d)| if d > T::zero() { (n / d).max(T::zero()) } else { T::zero() })
        .collect())
}

impl<T: Scalar> Coarsening<T> for SmoothedAggrEmin {
    fn kind(&self) -> CoarseningKind {
        CoarseningKind::SmoothedAggrEmin
    }

    fn transfer_operators(&self, a: &CsrMatrix<T>, level: usize) -> Result<TransferOperators<T>, KError> {
        let eps = self.params.eps_strong * 0.5f64.powi(level as i32);
        let agg = Aggregates::plain(a, cast::<T>(eps));
        let p_tent = agg.tentative_prolongation::<T>();
        let (af, dinv) = filtered_operator(a, &agg.strong);

        let ap = af.matmul(&p_tent)?;
        let mut dap = ap.clone();
        dap.scale_rows(&dinv);
        let adap = af.matmul(&dap)?;
        let omega = column_damping(&ap, &dap, &adap)?;
        debug!(level, aggregates = agg.count, eps, "energy-minimizing smoothed aggregation");

        dap.scale_columns(&omega);
        let p = p_tent.add(T::one(), &dap, -T::one())?;
        let r = p.transpose()?;
        Ok(TransferOperators { p, r })
    }
}
