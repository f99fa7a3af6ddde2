//! krylov-amg: algebraic multigrid preconditioned Krylov solvers
//!
//! Coarsening policy, relaxation, outer Krylov method and compute backend are
//! selected at runtime from a hierarchical parameter store. The hierarchy is
//! built once on the host and then moved to the chosen backend; repeated
//! solves reuse it.
//!
//! ```rust
//! use krylov_amg::{HostBackend, ParamStore, RuntimeSolver};
//! use krylov_amg::utils::sample_problem::laplace2d;
//!
//! let (a, rhs) = laplace2d::<f64>(32);
//! let prm = ParamStore::from_json_str(
//!     r#"{ "solver": { "type": "bicgstab", "tol": 1e-8 },
//!          "precond": { "coarsening": { "type": "smoothed_aggregation" },
//!                       "relax": { "type": "spai0" } } }"#,
//! )?;
//! let solver = RuntimeSolver::new(HostBackend::new(), a, &prm)?;
//! let (_x, stats) = solver.solve_host(&rhs)?;
//! assert!(stats.converged);
//! # Ok::<(), krylov_amg::KError>(())
//! ```

pub mod backend;
pub mod coarsening;
pub mod config;
pub mod context;
pub mod core;
pub mod error;
pub mod matrix;
pub mod preconditioner;
pub mod solver;
pub mod utils;

// Re-exports for convenience
#[cfg(feature = "rayon")]
pub use backend::{RayonBackend, RayonParams};
pub use backend::{Backend, HostBackend};
pub use coarsening::{Coarsening, TransferOperators};
pub use config::{CoarseningKind, ParamStore, RelaxationKind, SolverKind};
pub use context::{PrecondKind, RuntimeSolver};
pub use error::KError;
pub use matrix::CsrMatrix;
pub use preconditioner::{Amg, Preconditioner, Relaxation};
pub use solver::IterativeSolver;
pub use utils::{NoopTimer, Profiler, SolveStats, TimingSink};
