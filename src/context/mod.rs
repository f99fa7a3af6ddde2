//! Context module: runtime composition of preconditioners and solvers.
//!
//! Contexts encapsulate algorithm selection from a [`ParamStore`], parameter
//! management, and construction of solver/preconditioner pipelines.
//!
//! Modules:
//! - [`pc_context`]: preconditioner kinds and the coarsening, relaxation and preconditioner factories.
//! - [`ksp_context`]: the Krylov solver factory.
//! - [`make_solver`]: [`RuntimeSolver`], which owns the backend, preconditioner and solver.
//!
//! [`ParamStore`]: crate::config::ParamStore

pub mod ksp_context;
pub mod make_solver;
pub mod pc_context;

pub use ksp_context::make_iterative_solver;
pub use make_solver::RuntimeSolver;
pub use pc_context::{PrecondKind, make_coarsening, make_preconditioner, make_relaxation};
