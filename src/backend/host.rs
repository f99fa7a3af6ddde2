//! Serial host backend: plain `Vec<T>` vectors and [`CsrMatrix`] operators.

use super::{Backend, kernels};
use crate::core::traits::Scalar;
use crate::matrix::CsrMatrix;
use std::marker::PhantomData;

#[derive(Debug, Clone, Copy, Default)]
pub struct HostBackend<T> {
    _value: PhantomData<T>,
}

impl<T: Scalar> HostBackend<T> {
    pub fn new() -> Self {
        Self { _value: PhantomData }
    }
}

impl<T: Scalar> Backend for HostBackend<T> {
    type Value = T;
    type Vector = Vec<T>;
    type Matrix = CsrMatrix<T>;

    fn name(&self) -> String {
        "host (serial)".to_string()
    }

    fn create_vector(&self, n: usize) -> Vec<T> {
        vec![T::zero(); n]
    }

    fn copy_vector(&self, host: &[T]) -> Vec<T> {
        host.to_vec()
    }

    fn copy_matrix(&self, a: &CsrMatrix<T>) -> CsrMatrix<T> {
        a.clone()
    }

    fn to_host(&self, x: &Vec<T>) -> Vec<T> {
        x.clone()
    }

    fn vector_len(&self, x: &Vec<T>) -> usize {
        x.len()
    }

    fn matrix_rows(&self, a: &CsrMatrix<T>) -> usize {
        a.nrows()
    }

    fn matrix_nnz(&self, a: &CsrMatrix<T>) -> usize {
        a.nnz()
    }

    fn spmv(&self, alpha: T, a: &CsrMatrix<T>, x: &Vec<T>, beta: T, y: &mut Vec<T>) {
        assert_eq!(a.ncols(), x.len(), "Input vector x has incorrect length");
        assert_eq!(a.nrows(), y.len(), "Output vector y has incorrect length");
        for (i, yi) in y.iter_mut().enumerate() {
            *yi = kernels::combine(alpha * a.row_dot(i, x), beta, *yi);
        }
    }

    fn copy(&self, src: &Vec<T>, dst: &mut Vec<T>) {
        assert_eq!(src.len(), dst.len(), "Vectors must have the same length");
        dst.copy_from_slice(src);
    }

    fn clear(&self, x: &mut Vec<T>) {
        x.iter_mut().for_each(|v| *v = T::zero());
    }

    fn dot(&self, x: &Vec<T>, y: &Vec<T>) -> T {
        assert_eq!(x.len(), y.len(), "Vectors must have the same length");
        x.iter().zip(y).fold(T::zero(), |acc, (&xi, &yi)| acc + xi * yi)
    }

    fn axpby(&self, a: T, x: &Vec<T>, b: T, y: &mut Vec<T>) {
        assert_eq!(x.len(), y.len(), "Vectors must have the same length");
        for (yi, &xi) in y.iter_mut().zip(x) {
            *yi = kernels::axpby(a, xi, b, *yi);
        }
    }

    fn axpbypcz(&self, a: T, x: &Vec<T>, b: T, y: &Vec<T>, c: T, z: &mut Vec<T>) {
        assert!(x.len() == z.len() && y.len() == z.len(), "Vectors must have the same length");
        for ((zi, &xi), &yi) in z.iter_mut().zip(x).zip(y) {
            *zi = kernels::combine(a * xi + b * yi, c, *zi);
        }
    }

    fn vmul(&self, a: T, x: &Vec<T>, y: &Vec<T>, b: T, z: &mut Vec<T>) {
        assert!(x.len() == z.len() && y.len() == z.len(), "Vectors must have the same length");
        for ((zi, &xi), &yi) in z.iter_mut().zip(x).zip(y) {
            *zi = kernels::combine(a * xi * yi, b, *zi);
        }
    }

    fn scale(&self, a: T, x: &mut Vec<T>) {
        x.iter_mut().for_each(|v| *v *= a);
    }
}
