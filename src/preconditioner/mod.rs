//! Preconditioners for the Krylov solvers.
//!
//! This module defines the [`Preconditioner`] trait (M ≈ A⁻¹) and the
//! [`Relaxation`] trait for the smoothers used on every multigrid level. Both
//! are generic over a [`Backend`]: setup happens once on host data, and
//! `apply` only issues backend primitives on backend-resident vectors.

use crate::backend::Backend;
use crate::config::RelaxationKind;
use crate::error::KError;
use std::fmt;

pub mod amg;
pub mod approxinv;
pub mod chebyshev;
pub mod hierarchy;
pub mod ilu;
pub mod jacobi;
pub mod relaxation;

pub use amg::{Amg, AmgParams};
pub use approxinv::Spai0;
pub use chebyshev::{Chebyshev, ChebyshevParams};
pub use hierarchy::{HierarchyParams, LevelOperators, build_levels};
pub use ilu::{ParallelIlu0, ParallelIlu0Params};
pub use jacobi::{DampedJacobi, DampedJacobiParams};
pub use relaxation::RelaxationPreconditioner;

/// A preconditioner M ≈ A⁻¹.
pub trait Preconditioner<B: Backend>: Send + Sync + fmt::Display {
    /// Apply M⁻¹ to `rhs`, writing x = M⁻¹ rhs. The old contents of `x` are ignored.
    fn apply(&self, bk: &B, rhs: &B::Vector, x: &mut B::Vector) -> Result<(), KError>;

    /// The operator this preconditioner was built for.
    fn system_matrix(&self) -> &B::Matrix;

    /// Hierarchy depth; 0 when no hierarchy was built.
    fn levels(&self) -> usize;

    fn rows(&self) -> usize;
}

/// A smoother for `A x = rhs`.
///
/// `tmp` is scratch space of the level's size; its contents on entry are
/// irrelevant.
pub trait Relaxation<B: Backend>: Send + Sync {
    fn kind(&self) -> RelaxationKind;

    /// One pre-smoothing sweep, improving `x` in place.
    fn apply_pre(&self, bk: &B, a: &B::Matrix, rhs: &B::Vector, x: &mut B::Vector, tmp: &mut B::Vector);

    /// One post-smoothing sweep.
    fn apply_post(&self, bk: &B, a: &B::Matrix, rhs: &B::Vector, x: &mut B::Vector, tmp: &mut B::Vector) {
        self.apply_pre(bk, a, rhs, x, tmp);
    }

    /// Use the smoother as a stand-alone approximate inverse: x = M⁻¹ rhs.
    fn apply(&self, bk: &B, a: &B::Matrix, rhs: &B::Vector, x: &mut B::Vector, tmp: &mut B::Vector) {
        bk.clear(x);
        self.apply_pre(bk, a, rhs, x, tmp);
    }
}
