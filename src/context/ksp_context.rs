//! Factory for the Krylov subspace methods (KSP).
//!
//! Maps a [`SolverKind`] plus the `solver` parameter subtree onto a boxed
//! [`IterativeSolver`]. Every method works with every preconditioner and
//! backend.
//!
//! # Supported Solvers
//! - CG, BiCGStab, BiCGStab(L), GMRES (left/right)
//!
//! # References
//! - Saad, Y. (2003). Iterative Methods for Sparse Linear Systems. SIAM.
//! - Templates for the Solution of Linear Systems: Building Blocks for Iterative Methods, 2nd Edition (Barrett et al.)

use crate::backend::Backend;
use crate::config::{ParamStore, SolverKind};
use crate::error::KError;
use crate::solver::{BiCgStabLSolver, BiCgStabSolver, CgSolver, GmresSolver, IterativeSolver};

impl SolverKind {
    /// Read `solver.type`.
    pub fn from_params(prm: &ParamStore) -> Result<Self, KError> {
        prm.get_or("solver.type", SolverKind::default())
    }
}

/// Krylov solver of `kind`, configured from a `solver` subtree.
pub fn make_iterative_solver<B: Backend>(
    kind: SolverKind,
    prm: &ParamStore,
) -> Result<Box<dyn IterativeSolver<B>>, KError> {
    Ok(match kind {
        SolverKind::Cg => Box::new(CgSolver::<B::Value>::from_params(prm)?),
        SolverKind::BiCgStab => Box::new(BiCgStabSolver::<B::Value>::from_params(prm)?),
        SolverKind::BiCgStabL => Box::new(BiCgStabLSolver::<B::Value>::from_params(prm)?),
        SolverKind::Gmres => Box::new(GmresSolver::<B::Value>::from_params(prm)?),
    })
}
