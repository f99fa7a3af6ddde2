//! Core linear-algebra traits for krylov-amg.

use faer::traits::RealField;
use num_traits::{Float, FromPrimitive, NumAssign};
use std::fmt::{Debug, Display};

/// Scalar value type every backend, coarsening and solver is generic over.
///
/// `RealField` lets [`crate::matrix::CsrMatrix`] store its entries in a faer
/// sparse matrix and use faer's sparse kernels.
pub trait Scalar:
    Float + RealField + FromPrimitive + NumAssign + Default + Debug + Display + std::iter::Sum + Send + Sync + 'static
{
}

impl<T> Scalar for T where
    T: Float
        + RealField
        + FromPrimitive
        + NumAssign
        + Default
        + Debug
        + Display
        + std::iter::Sum
        + Send
        + Sync
        + 'static
{
}

/// Convert an `f64` parameter into the scalar type.
#[inline]
pub fn cast<T: Scalar>(v: f64) -> T {
    T::from_f64(v).unwrap_or_else(T::nan)
}
