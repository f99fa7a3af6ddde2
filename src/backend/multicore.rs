// rayon-based multi-core backend

use super::{Backend, kernels};
use crate::core::traits::Scalar;
use crate::error::KError;
use crate::matrix::CsrMatrix;
use rayon::prelude::*;
use std::marker::PhantomData;

/// Reductions are split into chunks of this many entries and summed in
/// chunk order, so a dot product gives the same bits on every run.
const REDUCTION_CHUNK: usize = 4096;

#[derive(Debug, Clone, Default)]
pub struct RayonParams {
    /// Worker threads; `None` uses one per logical CPU.
    pub num_threads: Option<usize>,
}

/// Backend whose primitives run on a dedicated rayon thread pool.
///
/// The pool is the execution context claimed by this backend and is released
/// when the backend is dropped.
pub struct RayonBackend<T> {
    pool: rayon::ThreadPool,
    _value: PhantomData<T>,
}

impl<T: Scalar> RayonBackend<T> {
    pub fn new(params: RayonParams) -> Result<Self, KError> {
        let threads = params.num_threads.unwrap_or_else(num_cpus::get).max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map_err(|e| KError::Configuration(format!("cannot start thread pool: {e}")))?;
        Ok(Self { pool, _value: PhantomData })
    }

    pub fn num_threads(&self) -> usize {
        self.pool.current_num_threads()
    }
}

impl<T: Scalar> Backend for RayonBackend<T> {
    type Value = T;
    type Vector = Vec<T>;
    type Matrix = CsrMatrix<T>;

    fn name(&self) -> String {
        format!("rayon ({} threads)", self.num_threads())
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
        self.pool.install(|| {
            y.par_iter_mut().enumerate().for_each(|(i, yi)| {
                *yi = kernels::combine(alpha * a.row_dot(i, x), beta, *yi);
            });
        });
    }

    fn copy(&self, src: &Vec<T>, dst: &mut Vec<T>) {
        assert_eq!(src.len(), dst.len(), "Vectors must have the same length");
        self.pool.install(|| dst.par_iter_mut().zip(src.par_iter()).for_each(|(d, &s)| *d = s));
    }

    fn clear(&self, x: &mut Vec<T>) {
        self.pool.install(|| x.par_iter_mut().for_each(|v| *v = T::zero()));
    }

    fn dot(&self, x: &Vec<T>, y: &Vec<T>) -> T {
        assert_eq!(x.len(), y.len(), "Vectors must have the same length");
        let partial: Vec<T> = self.pool.install(|| {
            x.par_chunks(REDUCTION_CHUNK)
                .zip(y.par_chunks(REDUCTION_CHUNK))
                .map(|(xc, yc)| xc.iter().zip(yc).fold(T::zero(), |acc, (&a, &b)| acc + a * b))
                .collect()
        });
        partial.into_iter().fold(T::zero(), |acc, v| acc + v)
    }

    fn axpby(&self, a: T, x: &Vec<T>, b: T, y: &mut Vec<T>) {
        assert_eq!(x.len(), y.len(), "Vectors must have the same length");
        self.pool.install(|| {
            y.par_iter_mut()
                .zip(x.par_iter())
                .for_each(|(yi, &xi)| *yi = kernels::axpby(a, xi, b, *yi));
        });
    }

    fn axpbypcz(&self, a: T, x: &Vec<T>, b: T, y: &Vec<T>, c: T, z: &mut Vec<T>) {
        assert!(x.len() == z.len() && y.len() == z.len(), "Vectors must have the same length");
        self.pool.install(|| {
            z.par_iter_mut()
                .zip(x.par_iter().zip(y.par_iter()))
                .for_each(|(zi, (&xi, &yi))| *zi = kernels::combine(a * xi + b * yi, c, *zi));
        });
    }

    fn vmul(&self, a: T, x: &Vec<T>, y: &Vec<T>, b: T, z: &mut Vec<T>) {
        assert!(x.len() == z.len() && y.len() == z.len(), "Vectors must have the same length");
        self.pool.install(|| {
            z.par_iter_mut()
                .zip(x.par_iter().zip(y.par_iter()))
                .for_each(|(zi, (&xi, &yi))| *zi = kernels::combine(a * xi * yi, b, *zi));
        });
    }

    fn scale(&self, a: T, x: &mut Vec<T>) {
        self.pool.install(|| x.par_iter_mut().for_each(|v| *v *= a));
    }
}
