//! Coarsening policies.
//!
//! A [`Coarsening`] turns the operator of one level into the transfer pair
//! (P, R) towards the next coarser level. The coarse operator itself is the
//! Galerkin product `R·A·P`, so every policy satisfies the Galerkin identity
//! by construction.
//!
//! References:
//! - Vaněk, Mandel, Brezina (1996). Algebraic multigrid by smoothed aggregation.
//! - Ruge, Stüben (1987). Algebraic multigrid. In *Multigrid Methods*, SIAM.

use crate::config::CoarseningKind;
use crate::core::traits::Scalar;
use crate::error::KError;
use crate::matrix::{CsrMatrix, galerkin};

pub mod aggregates;
pub mod aggregation;
pub mod ruge_stuben;
pub mod smoothed_aggr_emin;
pub mod smoothed_aggregation;

pub use aggregates::Aggregates;
pub use aggregation::{Aggregation, AggregationParams};
pub use ruge_stuben::{RugeStuben, RugeStubenParams};
pub use smoothed_aggr_emin::{SmoothedAggrEmin, SmoothedAggrEminParams};
pub use smoothed_aggregation::{SmoothedAggregation, SmoothedAggregationParams};

/// Interpolation `p` (coarse → fine) and restriction `r` (fine → coarse).
#[derive(Debug, Clone)]
pub struct TransferOperators<T> {
    pub p: CsrMatrix<T>,
    pub r: CsrMatrix<T>,
}

impl<T: Scalar> TransferOperators<T> {
    /// Dimension of the coarse space.
    pub fn coarse_size(&self) -> usize {
        self.p.ncols()
    }
}

pub trait Coarsening<T: Scalar>: Send + Sync {
    fn kind(&self) -> CoarseningKind;

    /// Build the transfer operators of `a`, which sits at hierarchy depth `level`.
    fn transfer_operators(&self, a: &CsrMatrix<T>, level: usize) -> Result<TransferOperators<T>, KError>;

    fn coarse_operator(&self, a: &CsrMatrix<T>, ops: &TransferOperators<T>) -> Result<CsrMatrix<T>, KError> {
        galerkin(&ops.r, a, &ops.p)
    }
}

/// Damped-Jacobi filtered operator shared by the smoothed aggregation variants.
///
/// Keeps the diagonal and the strong off-diagonal entries of `a`; weak
/// entries are lumped into the diagonal. Returns the filtered operator and
/// the inverse of its diagonal (zero where the filtered diagonal vanishes).
pub(crate) fn filtered_operator<T: Scalar>(a: &CsrMatrix<T>, strong: &[bool]) -> (CsrMatrix<T>, Vec<T>) {
    let n = a.nrows();
    let mut ptr = Vec::with_capacity(n + 1);
    let mut col = Vec::with_capacity(a.nnz() + n);
    let mut val = Vec::with_capacity(a.nnz() + n);
    let mut dinv = Vec::with_capacity(n);
    ptr.push(0);
    for i in 0..n {
        let start = a.row_ptr()[i];
        let (cols, vals) = a.row(i);
        let mut dia = T::zero();
        for (k, (&j, &v)) in cols.iter().zip(vals).enumerate() {
            if j == i || !strong[start + k] {
                dia += v;
            }
        }
        let mut diag_pos = None;
        for (k, (&j, &v)) in cols.iter().zip(vals).enumerate() {
            if diag_pos.is_none() && j >= i {
                diag_pos = Some(col.len());
                col.push(i);
                val.push(dia);
            }
            if j != i && strong[start + k] {
                col.push(j);
                val.push(v);
            }
        }
        if diag_pos.is_none() {
            col.push(i);
            val.push(dia);
        }
        dinv.push(if dia.is_zero() { T::zero() } else { T::one() / dia });
        ptr.push(col.len());
    }
    (CsrMatrix::from_sorted_parts(n, a.ncols(), ptr, col, val), dinv)
}
