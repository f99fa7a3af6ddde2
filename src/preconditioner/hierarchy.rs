//! Multigrid hierarchy construction.
//!
//! Levels are produced strictly in order: the operator of level i+1 is the
//! Galerkin product of level i. Construction stops when the operator is small
//! enough or the level cap is reached, and truncates early (without error)
//! when coarsening yields an empty coarse space or fails to reduce the size by
//! at least the factor `max_coarse_ratio`.

use crate::coarsening::{Coarsening, TransferOperators};
use crate::config::ParamStore;
use crate::core::traits::Scalar;
use crate::error::KError;
use crate::matrix::CsrMatrix;
use crate::utils::TimingSink;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct HierarchyParams {
    /// Stop coarsening once a level has at most this many unknowns.
    pub coarse_enough: usize,
    pub max_levels: usize,
    /// Largest accepted ratio `n_coarse / n_fine`.
    pub max_coarse_ratio: f64,
}

impl Default for HierarchyParams {
    fn default() -> Self {
        Self { coarse_enough: 50, max_levels: 20, max_coarse_ratio: 0.9 }
    }
}

impl HierarchyParams {
    /// Read from a `precond` subtree.
    pub fn from_params(prm: &ParamStore) -> Result<Self, KError> {
        let d = Self::default();
        Ok(Self {
            coarse_enough: prm.get_or("coarse_enough", d.coarse_enough)?,
            max_levels: prm.get_or("max_levels", d.max_levels)?,
            max_coarse_ratio: prm.get_or("max_coarse_ratio", d.max_coarse_ratio)?,
        })
    }
}

/// Host operators of one level. The coarsest level has no transfer pair.
#[derive(Debug, Clone)]
pub struct LevelOperators<T> {
    pub a: CsrMatrix<T>,
    pub transfer: Option<TransferOperators<T>>,
}

/// Build the level chain for `a`.
///
/// Returns [`KError::Structural`] for a non-square operator.
pub fn build_levels<T: Scalar>(
    a: CsrMatrix<T>,
    coarsening: &dyn Coarsening<T>,
    params: &HierarchyParams,
    timer: &mut dyn TimingSink,
) -> Result<Vec<LevelOperators<T>>, KError> {
    if !a.is_square() {
        return Err(KError::Structural(format!(
            "operator must be square, got {}x{}",
            a.nrows(),
            a.ncols()
        )));
    }

    let max_levels = params.max_levels.max(1);
    let mut levels = Vec::new();
    let mut a = a;
    loop {
        let n = a.nrows();
        if n <= params.coarse_enough {
            break;
        }
        if levels.len() + 1 >= max_levels {
            debug!(levels = levels.len() + 1, "level cap reached");
            break;
        }

        timer.tic("coarsening");
        let ops = coarsening.transfer_operators(&a, levels.len());
        timer.toc("coarsening");
        let ops = ops?;

        let nc = ops.coarse_size();
        if nc == 0 {
            debug!(level = levels.len(), "empty coarse space, truncating hierarchy");
            break;
        }
        if nc as f64 > params.max_coarse_ratio * n as f64 {
            debug!(level = levels.len(), rows = n, coarse = nc, "coarsening stagnated, truncating hierarchy");
            break;
        }

        timer.tic("galerkin");
        let ac = coarsening.coarse_operator(&a, &ops);
        timer.toc("galerkin");
        let ac = ac?;

        debug!(level = levels.len(), rows = n, nnz = a.nnz(), coarse = nc, "level built");
        levels.push(LevelOperators { a, transfer: Some(ops) });
        a = ac;
    }
    debug!(level = levels.len(), rows = a.nrows(), nnz = a.nnz(), "coarsest level");
    levels.push(LevelOperators { a, transfer: None });
    Ok(levels)
}
