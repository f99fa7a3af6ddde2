//! Compressed row storage (CRS) operator and the host-side sparse kernels
//! used during hierarchy setup.
//!
//! [`CsrMatrix`] wraps a faer `SparseRowMat` and is always canonical: column
//! indices are strictly increasing inside every row and no row carries slack
//! capacity. [`CsrMatrix::from_csr`] validates external input and returns
//! [`KError::Structural`] for any violation of the CRS invariants, so every
//! later stage can rely on a well-formed operator. Transpose, products and
//! sums run through faer's sparse kernels.

use crate::core::traits::Scalar;
use crate::error::KError;
use faer::Par;
use faer::sparse::linalg::matmul::sparse_sparse_matmul;
use faer::sparse::ops::binary_op;
use faer::sparse::{CreationError, SparseRowMat, SymbolicSparseRowMat, Triplet};

#[derive(Clone, Debug)]
pub struct CsrMatrix<T> {
    inner: SparseRowMat<usize, T>,
}

fn creation_error(err: CreationError) -> KError {
    match err {
        CreationError::OutOfBounds { row, col } => {
            KError::Structural(format!("entry ({row}, {col}) lies outside the matrix"))
        }
        CreationError::Generic(e) => KError::Sparse(e),
    }
}

impl<T: Scalar> CsrMatrix<T> {
    /// Build a CSR from raw row‐ptr, col‐idx, and values.
    ///
    /// Rows may list their columns in any order and may repeat a column; the
    /// result is sorted and duplicates are summed.
    pub fn from_csr(
        nrows: usize,
        ncols: usize,
        row_ptr: Vec<usize>,
        col_idx: Vec<usize>,
        values: Vec<T>,
    ) -> Result<Self, KError> {
        if row_ptr.len() != nrows + 1 {
            return Err(KError::Structural(format!(
                "row pointer has length {}, expected {}",
                row_ptr.len(),
                nrows + 1
            )));
        }
        if row_ptr[0] != 0 {
            return Err(KError::Structural(format!(
                "row pointer must start at 0, found {}",
                row_ptr[0]
            )));
        }
        if let Some(i) = row_ptr.windows(2).position(|w| w[1] < w[0]) {
            return Err(KError::Structural(format!(
                "row pointer decreases at row {i} ({} > {})",
                row_ptr[i],
                row_ptr[i + 1]
            )));
        }
        let nnz = row_ptr[nrows];
        if col_idx.len() != nnz || values.len() != nnz {
            return Err(KError::Structural(format!(
                "row pointer declares {nnz} nonzeros, found {} columns and {} values",
                col_idx.len(),
                values.len()
            )));
        }
        if let Some(pos) = col_idx.iter().position(|&c| c >= ncols) {
            return Err(KError::Structural(format!(
                "column index {} out of range (ncols = {ncols}) at position {pos}",
                col_idx[pos]
            )));
        }

        let triplets: Vec<Triplet<usize, usize, T>> = (0..nrows)
            .flat_map(|i| (row_ptr[i]..row_ptr[i + 1]).map(move |k| (i, k)))
            .map(|(i, k)| Triplet::new(i, col_idx[k], values[k]))
            .collect();
        let inner = SparseRowMat::try_new_from_triplets(nrows, ncols, &triplets).map_err(creation_error)?;
        Ok(Self { inner })
    }

    /// Assemble from (row, column, value) triplets; duplicates are summed.
    pub fn from_triplets(
        nrows: usize,
        ncols: usize,
        triplets: &[(usize, usize, T)],
    ) -> Result<Self, KError> {
        let entries: Vec<Triplet<usize, usize, T>> =
            triplets.iter().map(|&(i, j, v)| Triplet::new(i, j, v)).collect();
        let inner = SparseRowMat::try_new_from_triplets(nrows, ncols, &entries).map_err(creation_error)?;
        Ok(Self { inner })
    }

    /// n×n identity.
    pub fn identity(n: usize) -> Self {
        Self::from_sorted_parts(n, n, (0..=n).collect(), (0..n).collect(), vec![T::one(); n])
    }

    /// Assemble directly from canonical parts produced by the kernels below.
    pub(crate) fn from_sorted_parts(
        nrows: usize,
        ncols: usize,
        row_ptr: Vec<usize>,
        col_idx: Vec<usize>,
        values: Vec<T>,
    ) -> Self {
        let symbolic = SymbolicSparseRowMat::new_checked(nrows, ncols, row_ptr, None, col_idx);
        Self { inner: SparseRowMat::new(symbolic, values) }
    }

    pub fn nrows(&self) -> usize {
        self.inner.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.inner.ncols()
    }

    pub fn nnz(&self) -> usize {
        self.inner.val().len()
    }

    pub fn is_square(&self) -> bool {
        self.nrows() == self.ncols()
    }

    pub fn row_ptr(&self) -> &[usize] {
        self.inner.symbolic().row_ptr()
    }

    pub fn col_idx(&self) -> &[usize] {
        self.inner.symbolic().col_idx()
    }

    pub fn values(&self) -> &[T] {
        self.inner.val()
    }

    /// Column indices and values of row `i`.
    #[inline]
    pub fn row(&self, i: usize) -> (&[usize], &[T]) {
        let ptr = self.row_ptr();
        let range = ptr[i]..ptr[i + 1];
        (&self.col_idx()[range.clone()], &self.values()[range])
    }

    /// Dot product of row `i` with `x`.
    #[inline]
    pub fn row_dot(&self, i: usize, x: &[T]) -> T {
        let (cols, vals) = self.row(i);
        cols.iter().zip(vals).fold(T::zero(), |acc, (&c, &v)| acc + v * x[c])
    }

    /// Main diagonal; entries missing from the pattern are zero.
    pub fn diagonal(&self) -> Vec<T> {
        (0..self.nrows())
            .map(|i| {
                let (cols, vals) = self.row(i);
                cols.binary_search(&i).map(|k| vals[k]).unwrap_or_else(|_| T::zero())
            })
            .collect()
    }

    /// y = A x.
    pub fn spmv(&self, x: &[T], y: &mut [T]) {
        assert_eq!(x.len(), self.ncols());
        assert_eq!(y.len(), self.nrows());
        for (i, yi) in y.iter_mut().enumerate() {
            *yi = self.row_dot(i, x);
        }
    }

    /// Aᵗ.
    pub fn transpose(&self) -> Result<Self, KError> {
        Ok(Self { inner: self.inner.transpose().to_row_major()? })
    }

    /// Sparse product `self · other`.
    ///
    /// The CSR operands are read as CSC views of their transposes, so faer
    /// forms `(self · other)ᵗ = otherᵗ · selfᵗ` in column storage and the
    /// result is reinterpreted as row storage without a copy.
    pub fn matmul(&self, other: &CsrMatrix<T>) -> Result<Self, KError> {
        assert_eq!(self.ncols(), other.nrows(), "inner dimensions must agree");
        let product = sparse_sparse_matmul(other.inner.transpose(), self.inner.transpose(), T::one(), Par::Seq)?;
        Ok(Self { inner: product.into_transpose() })
    }

    /// Entrywise `f(self[i, j], other[i, j])` over the union of both patterns.
    fn zip_with(&self, other: &CsrMatrix<T>, f: impl Fn(T, T) -> T) -> Result<Self, KError> {
        assert_eq!(self.nrows(), other.nrows());
        assert_eq!(self.ncols(), other.ncols());
        let merged = binary_op(self.inner.transpose(), other.inner.transpose(), |a: Option<&T>, b: Option<&T>| {
            f(a.copied().unwrap_or_else(T::zero), b.copied().unwrap_or_else(T::zero))
        })?;
        Ok(Self { inner: merged.into_transpose() })
    }

    /// `alpha·self + beta·other`.
    pub fn add(&self, alpha: T, other: &CsrMatrix<T>, beta: T) -> Result<Self, KError> {
        self.zip_with(other, |a, b| alpha * a + beta * b)
    }

    /// Multiply every entry by `s`.
    pub fn scale(&mut self, s: T) {
        self.inner.val_mut().iter_mut().for_each(|v| *v *= s);
    }

    /// Row i is multiplied by `d[i]`.
    pub fn scale_rows(&mut self, d: &[T]) {
        assert_eq!(d.len(), self.nrows());
        let (symbolic, values) = self.inner.parts_mut();
        for (w, &di) in symbolic.row_ptr().windows(2).zip(d) {
            values[w[0]..w[1]].iter_mut().for_each(|v| *v *= di);
        }
    }

    /// Column j is multiplied by `d[j]`.
    pub fn scale_columns(&mut self, d: &[T]) {
        assert_eq!(d.len(), self.ncols());
        let (symbolic, values) = self.inner.parts_mut();
        for (v, &c) in values.iter_mut().zip(symbolic.col_idx()) {
            *v *= d[c];
        }
    }

    /// Column-wise inner products `Σ_i self[i, j] · other[i, j]`.
    pub fn column_inner(&self, other: &CsrMatrix<T>) -> Result<Vec<T>, KError> {
        let product = self.zip_with(other, |a, b| a * b)?;
        let mut out = vec![T::zero(); self.ncols()];
        for (&c, &v) in product.col_idx().iter().zip(product.values()) {
            out[c] += v;
        }
        Ok(out)
    }

    /// Dense copy as a faer matrix.
    pub fn to_dense(&self) -> faer::Mat<T> {
        self.inner.to_dense()
    }
}

impl<T: Scalar> PartialEq for CsrMatrix<T> {
    fn eq(&self, other: &Self) -> bool {
        self.nrows() == other.nrows()
            && self.ncols() == other.ncols()
            && self.row_ptr() == other.row_ptr()
            && self.col_idx() == other.col_idx()
            && self.values() == other.values()
    }
}

/// Galerkin triple product `R · A · P`.
pub fn galerkin<T: Scalar>(r: &CsrMatrix<T>, a: &CsrMatrix<T>, p: &CsrMatrix<T>) -> Result<CsrMatrix<T>, KError> {
    r.matmul(&a.matmul(p)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn identity_spmv() {
        // 3×3 identity in CSR: row_ptr=[0,1,2,3], col_idx=[0,1,2], vals=[1,1,1]
        let m = CsrMatrix::from_csr(3, 3, vec![0, 1, 2, 3], vec![0, 1, 2], vec![1.0, 1.0, 1.0]).unwrap();
        let x = vec![2.0, 3.0, 5.0];
        let mut y = vec![0.0; 3];
        m.spmv(&x, &mut y);
        assert_eq!(y, x);
        assert_eq!(m, CsrMatrix::identity(3));
    }

    #[test]
    fn simple_pattern() {
        // 2×3 matrix [[1,2,0],[0,3,4]]
        let m = CsrMatrix::from_csr(2, 3, vec![0, 2, 4], vec![0, 1, 1, 2], vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let x = vec![1.0, 1.0, 1.0];
        let mut y = vec![0.0; 2];
        m.spmv(&x, &mut y);
        assert_eq!(y, vec![3.0, 7.0]);
    }

    #[test]
    fn unsorted_rows_are_canonicalized() {
        let m = CsrMatrix::from_csr(2, 2, vec![0, 3, 4], vec![1, 0, 1, 0], vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(m.row_ptr(), &[0, 2, 3]);
        assert_eq!(m.col_idx(), &[0, 1, 0]);
        assert_eq!(m.values(), &[2.0, 4.0, 4.0]);
        assert_eq!(m.nnz(), 3);
    }

    #[test]
    fn rejects_decreasing_row_pointer() {
        let err = CsrMatrix::from_csr(3, 3, vec![0, 2, 1, 3], vec![0, 1, 2], vec![1.0; 3]).unwrap_err();
        assert!(matches!(err, KError::Structural(_)));
    }

    #[test]
    fn rejects_out_of_range_column() {
        let err = CsrMatrix::from_csr(2, 2, vec![0, 1, 2], vec![0, 5], vec![1.0; 2]).unwrap_err();
        assert!(matches!(err, KError::Structural(_)));
    }

    #[test]
    fn rejects_short_row_pointer() {
        let err = CsrMatrix::<f64>::from_csr(3, 3, vec![0, 1], vec![0], vec![1.0]).unwrap_err();
        assert!(matches!(err, KError::Structural(_)));
    }

    #[test]
    fn out_of_range_triplet_is_structural() {
        let err = CsrMatrix::from_triplets(2, 2, &[(0, 0, 1.0), (2, 1, 1.0)]).unwrap_err();
        assert!(matches!(err, KError::Structural(_)));
    }

    #[test]
    fn transpose_and_matmul_match_dense() {
        let a = CsrMatrix::from_triplets(
            3,
            2,
            &[(0, 0, 1.0), (0, 1, 2.0), (1, 1, -1.0), (2, 0, 3.0)],
        )
        .unwrap();
        let at = a.transpose().unwrap();
        assert_eq!((at.nrows(), at.ncols()), (2, 3));
        let ata = at.matmul(&a).unwrap();
        let dense = ata.to_dense();
        // AᵗA = [[10, 2], [2, 5]]
        assert_abs_diff_eq!(dense[(0, 0)], 10.0, epsilon = 1e-14);
        assert_abs_diff_eq!(dense[(0, 1)], 2.0, epsilon = 1e-14);
        assert_abs_diff_eq!(dense[(1, 0)], 2.0, epsilon = 1e-14);
        assert_abs_diff_eq!(dense[(1, 1)], 5.0, epsilon = 1e-14);
        for i in 0..ata.nrows() {
            assert!(ata.row(i).0.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn rectangular_product_keeps_shape() {
        // [1 1 0; 0 1 1] · [1; 2; 3] = [3; 5]
        let a = CsrMatrix::from_triplets(2, 3, &[(0, 0, 1.0), (0, 1, 1.0), (1, 1, 1.0), (1, 2, 1.0)]).unwrap();
        let b = CsrMatrix::from_triplets(3, 1, &[(0, 0, 1.0), (1, 0, 2.0), (2, 0, 3.0)]).unwrap();
        let c = a.matmul(&b).unwrap();
        assert_eq!((c.nrows(), c.ncols()), (2, 1));
        assert_eq!(c.values(), &[3.0, 5.0]);
    }

    #[test]
    fn add_merges_patterns() {
        let a = CsrMatrix::from_triplets(2, 2, &[(0, 0, 1.0), (1, 1, 1.0)]).unwrap();
        let b = CsrMatrix::from_triplets(2, 2, &[(0, 1, 1.0), (1, 1, 2.0)]).unwrap();
        let c = a.add(2.0, &b, -1.0).unwrap();
        assert_eq!(c.col_idx(), &[0, 1, 1]);
        assert_eq!(c.values(), &[2.0, -1.0, 0.0]);
    }

    #[test]
    fn scaling_follows_rows_and_columns() {
        let mut a = CsrMatrix::from_triplets(2, 2, &[(0, 0, 1.0), (0, 1, 1.0), (1, 1, 1.0)]).unwrap();
        a.scale_rows(&[2.0, 3.0]);
        assert_eq!(a.values(), &[2.0, 2.0, 3.0]);
        a.scale_columns(&[1.0, 0.5]);
        assert_eq!(a.values(), &[2.0, 1.0, 1.5]);
    }

    #[test]
    fn column_inner_sums_over_shared_entries() {
        let a = CsrMatrix::from_triplets(2, 2, &[(0, 0, 1.0), (1, 0, 2.0), (1, 1, 3.0)]).unwrap();
        let b = CsrMatrix::from_triplets(2, 2, &[(0, 0, 4.0), (1, 0, 5.0), (0, 1, 7.0)]).unwrap();
        assert_eq!(a.column_inner(&b).unwrap(), vec![14.0, 0.0]);
    }

    #[test]
    fn diagonal_reports_missing_entries_as_zero() {
        let a = CsrMatrix::from_triplets(2, 2, &[(0, 1, 1.0), (1, 1, 3.0)]).unwrap();
        assert_eq!(a.diagonal(), vec![0.0, 3.0]);
    }

    #[test]
    fn galerkin_of_identity_transfers_is_the_operator() {
        let a = CsrMatrix::from_triplets(2, 2, &[(0, 0, 4.0), (0, 1, -1.0), (1, 1, 2.0)]).unwrap();
        let i = CsrMatrix::identity(2);
        assert_eq!(galerkin(&i, &a, &i).unwrap(), a);
    }
}
