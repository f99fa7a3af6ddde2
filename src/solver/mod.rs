//! Krylov solver interfaces.
//!
//! Every method is written against the [`Backend`] primitives and consumes a
//! [`Preconditioner`] through its `apply` contract, so any method can be
//! combined with any preconditioner on any backend.

use crate::backend::Backend;
use crate::config::SolverKind;
use crate::error::KError;
use crate::preconditioner::Preconditioner;
use crate::utils::convergence::SolveStats;

/// Common interface for the iterative solvers.
pub trait IterativeSolver<B: Backend>: Send + Sync {
    fn kind(&self) -> SolverKind;

    /// Solve A·x = rhs, writing the result into `x`.
    ///
    /// `x` holds the initial guess on entry. Running out of iterations or a
    /// breakdown is not an error: it is reported with `converged == false`.
    fn solve(
        &self,
        bk: &B,
        a: &B::Matrix,
        pc: &dyn Preconditioner<B>,
        rhs: &B::Vector,
        x: &mut B::Vector,
    ) -> Result<SolveStats<B::Value>, KError>;
}

pub mod bicgstab;
pub mod bicgstabl;
pub mod cg;
pub mod gmres;

pub use bicgstab::BiCgStabSolver;
pub use bicgstabl::BiCgStabLSolver;
pub use cg::CgSolver;
pub use gmres::{GmresSolver, Preconditioning};
