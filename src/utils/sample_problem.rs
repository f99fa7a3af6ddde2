//! Finite-difference model problems.

use crate::core::traits::{Scalar, cast};
use crate::matrix::CsrMatrix;

/// 5-point Laplacian on an `m × m` interior grid (Dirichlet boundary
/// eliminated), with a right-hand side of ones. The operator is SPD.
pub fn laplace2d<T: Scalar>(m: usize) -> (CsrMatrix<T>, Vec<T>) {
    let n = m * m;
    let mut ptr = Vec::with_capacity(n + 1);
    let mut col = Vec::with_capacity(5 * n);
    let mut val = Vec::with_capacity(5 * n);
    ptr.push(0);
    for i in 0..m {
        for j in 0..m {
            let k = i * m + j;
            if i > 0 {
                col.push(k - m);
                val.push(-T::one());
            }
            if j > 0 {
                col.push(k - 1);
                val.push(-T::one());
            }
            col.push(k);
            val.push(cast(4.0));
            if j + 1 < m {
                col.push(k + 1);
                val.push(-T::one());
            }
            if i + 1 < m {
                col.push(k + m);
                val.push(-T::one());
            }
            ptr.push(col.len());
        }
    }
    (CsrMatrix::from_sorted_parts(n, n, ptr, col, val), vec![T::one(); n])
}

/// Poisson problem on the unit square sampled on an `m × m` grid including
/// the boundary. Boundary rows are identity rows with a zero right-hand side;
/// interior rows carry the `[-1, -1, 4, -1, -1] / h²` stencil and a unit
/// right-hand side.
pub fn poisson2d_dirichlet<T: Scalar>(m: usize) -> (CsrMatrix<T>, Vec<T>) {
    let n = m * m;
    let h2i: T = if m > 1 { cast(((m - 1) * (m - 1)) as f64) } else { T::one() };
    let mut ptr = Vec::with_capacity(n + 1);
    let mut col = Vec::with_capacity(5 * n);
    let mut val = Vec::with_capacity(5 * n);
    let mut rhs = Vec::with_capacity(n);
    ptr.push(0);
    for i in 0..m {
        for j in 0..m {
            let k = i * m + j;
            if i == 0 || j == 0 || i + 1 == m || j + 1 == m {
                col.push(k);
                val.push(T::one());
                rhs.push(T::zero());
            } else {
                for (c, v) in [(k - m, -h2i), (k - 1, -h2i), (k, cast::<T>(4.0) * h2i), (k + 1, -h2i), (k + m, -h2i)] {
                    col.push(c);
                    val.push(v);
                }
                rhs.push(T::one());
            }
            ptr.push(col.len());
        }
    }
    (CsrMatrix::from_sorted_parts(n, n, ptr, col, val), rhs)
}
