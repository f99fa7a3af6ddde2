//! Plain (unsmoothed) aggregation.

use super::{Coarsening, TransferOperators, aggregates::Aggregates};
use crate::config::{CoarseningKind, ParamStore};
use crate::core::traits::{Scalar, cast};
use crate::error::KError;
use crate::matrix::CsrMatrix;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct AggregationParams {
    /// Strength threshold ε.
    pub eps_strong: f64,
    /// Over-interpolation factor; the restriction is scaled by its inverse.
    pub over_interp: f64,
}

impl Default for AggregationParams {
    fn default() -> Self {
        Self { eps_strong: 0.08, over_interp: 1.5 }
    }
}

impl AggregationParams {
    /// Read `eps_strong` and `over_interp` from a `precond.coarsening` subtree.
    pub fn from_params(prm: &ParamStore) -> Result<Self, KError> {
        let d = Self::default();
        Ok(Self {
            eps_strong: prm.get_or("eps_strong", d.eps_strong)?,
            over_interp: prm.get_or("over_interp", d.over_interp)?,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    pub params: AggregationParams,
}

impl Aggregation {
    pub fn new(params: AggregationParams) -> Self {
        Self { params }
    }
}

impl<T: Scalar> Coarsening<T> for Aggregation {
    fn kind(&self) -> CoarseningKind {
        CoarseningKind::Aggregation
    }

    fn transfer_operators(&self, a: &CsrMatrix<T>, level: usize) -> Result<TransferOperators<T>, KError> {
        let agg = Aggregates::plain(a, cast::<T>(self.params.eps_strong));
        debug!(level, aggregates = agg.count, "plain aggregation");
        let p = agg.tentative_prolongation::<T>();
        let mut r = p.transpose()?;
        r.scale(T::one() / cast::<T>(self.params.over_interp));
        Ok(TransferOperators { p, r })
    }
}
