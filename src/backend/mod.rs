//! Compute backends.
//!
//! A [`Backend`] binds the vector and sparse-matrix primitives used by the
//! relaxation, multigrid cycle and Krylov code to one execution target. Those
//! layers are written against this trait only, so swapping the backend swaps
//! where the numerics run without touching any algorithm.
//!
//! Setup-time work (coarsening, Galerkin products, factorizations) is done on
//! host [`CsrMatrix`] values and moved over with [`Backend::copy_matrix`].

use crate::core::traits::Scalar;
use crate::matrix::CsrMatrix;
use num_traits::{Float, One};

pub mod host;
pub use host::HostBackend;

#[cfg(feature = "rayon")]
pub mod multicore;
#[cfg(feature = "rayon")]
pub use multicore::{RayonBackend, RayonParams};

pub trait Backend: Send + Sync + 'static {
    type Value: Scalar;
    type Vector: Send + Sync;
    type Matrix: Send + Sync;

    /// Short human readable name of the execution target.
    fn name(&self) -> String;

    /// Zero vector of length `n`.
    fn create_vector(&self, n: usize) -> Self::Vector;
    /// Copy host data into a backend vector.
    fn copy_vector(&self, host: &[Self::Value]) -> Self::Vector;
    /// Move a host operator to the backend.
    fn copy_matrix(&self, a: &CsrMatrix<Self::Value>) -> Self::Matrix;
    /// Read a backend vector back into host memory.
    fn to_host(&self, x: &Self::Vector) -> Vec<Self::Value>;

    fn vector_len(&self, x: &Self::Vector) -> usize;
    fn matrix_rows(&self, a: &Self::Matrix) -> usize;
    fn matrix_nnz(&self, a: &Self::Matrix) -> usize;

    /// y = alpha A x + beta y. With `beta == 0` the old contents of y are ignored.
    fn spmv(
        &self,
        alpha: Self::Value,
        a: &Self::Matrix,
        x: &Self::Vector,
        beta: Self::Value,
        y: &mut Self::Vector,
    );

    /// r = f - A x.
    fn residual(&self, f: &Self::Vector, a: &Self::Matrix, x: &Self::Vector, r: &mut Self::Vector) {
        self.copy(f, r);
        self.spmv(-Self::Value::one(), a, x, Self::Value::one(), r);
    }

    /// dst = src.
    fn copy(&self, src: &Self::Vector, dst: &mut Self::Vector);
    /// x = 0.
    fn clear(&self, x: &mut Self::Vector);
    /// x · y.
    fn dot(&self, x: &Self::Vector, y: &Self::Vector) -> Self::Value;
    /// ‖x‖₂.
    fn norm(&self, x: &Self::Vector) -> Self::Value {
        self.dot(x, x).sqrt()
    }
    /// y = a x + b y.
    fn axpby(&self, a: Self::Value, x: &Self::Vector, b: Self::Value, y: &mut Self::Vector);
    /// z = a x + b y + c z.
    fn axpbypcz(
        &self,
        a: Self::Value,
        x: &Self::Vector,
        b: Self::Value,
        y: &Self::Vector,
        c: Self::Value,
        z: &mut Self::Vector,
    );
    /// z = a x∘y + b z (elementwise product).
    fn vmul(
        &self,
        a: Self::Value,
        x: &Self::Vector,
        y: &Self::Vector,
        b: Self::Value,
        z: &mut Self::Vector,
    );
    /// x = a x.
    fn scale(&self, a: Self::Value, x: &mut Self::Vector);
}

/// Sequential building blocks shared by the host-memory backends.
pub(crate) mod kernels {
    use crate::core::traits::Scalar;

    #[inline]
    pub fn combine<T: Scalar>(acc: T, b: T, old: T) -> T {
        if b.is_zero() { acc } else { acc + b * old }
    }

    #[inline]
    pub fn axpby<T: Scalar>(a: T, x: T, b: T, y: T) -> T {
        combine(a * x, b, y)
    }
}
