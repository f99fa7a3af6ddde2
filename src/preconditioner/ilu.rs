//! ILU(0) smoother with approximate triangular solves (Saad §10.3).
//!
//! The factorization is computed once on the host. The triangular solves
//! are then replaced by a fixed number of Jacobi sweeps, which only need
//! sparse products and elementwise operations and thus run on any backend:
//!
//! ```text
//! y ← r − L y              (unit lower solve)
//! z ← D⁻¹ (y − U z)        (upper solve)
//! ```
//!
//! Reference: Chow, Patel (2015). Fine-grained parallel incomplete LU
//! factorization.

use crate::backend::Backend;
use crate::config::{ParamStore, RelaxationKind};
use crate::core::traits::{Scalar, cast};
use crate::error::KError;
use crate::matrix::CsrMatrix;
use crate::preconditioner::Relaxation;
use num_traits::{One, Zero};

#[derive(Debug, Clone, PartialEq)]
pub struct ParallelIlu0Params {
    pub damping: f64,
    /// Jacobi sweeps per triangular solve.
    pub solve_iters: usize,
}

impl Default for ParallelIlu0Params {
    fn default() -> Self {
        Self { damping: 1.0, solve_iters: 2 }
    }
}

impl ParallelIlu0Params {
    pub fn from_params(prm: &ParamStore) -> Result<Self, KError> {
        let d = Self::default();
        Ok(Self {
            damping: prm.get_or("damping", d.damping)?,
            solve_iters: prm.get_or("solve.iters", d.solve_iters)?,
        })
    }
}

/// Split ILU(0) factors: strict lower `l` (unit diagonal implied), strict
/// upper `u` and the inverted pivots.
pub(crate) struct Ilu0Factors<T> {
    pub l: CsrMatrix<T>,
    pub u: CsrMatrix<T>,
    pub dinv: Vec<T>,
}

/// IKJ ILU(0) on the pattern of `a`.
pub(crate) fn factorize<T: Scalar>(a: &CsrMatrix<T>, level: usize) -> Result<Ilu0Factors<T>, KError> {
    let n = a.nrows();
    let ptr = a.row_ptr();
    let col = a.col_idx();
    let mut lu = a.values().to_vec();

    let mut diag = vec![0usize; n];
    for i in 0..n {
        let (cols, _) = a.row(i);
        diag[i] = ptr[i]
            + cols.binary_search(&i).map_err(|_| KError::RelaxationSetup {
                level,
                reason: format!("missing diagonal entry in row {i}"),
            })?;
    }

    let mut pos = vec![usize::MAX; n];
    for i in 0..n {
        for k in ptr[i]..ptr[i + 1] {
            pos[col[k]] = k;
        }
        for k in ptr[i]..diag[i] {
            let c = col[k];
            let pivot = lu[diag[c]];
            if pivot.is_zero() {
                return Err(KError::RelaxationSetup { level, reason: format!("zero pivot in row {c}") });
            }
            let factor = lu[k] / pivot;
            lu[k] = factor;
            for kk in diag[c] + 1..ptr[c + 1] {
                let p = pos[col[kk]];
                if p != usize::MAX {
                    let u = lu[kk];
                    lu[p] -= factor * u;
                }
            }
        }
        if lu[diag[i]].is_zero() {
            return Err(KError::RelaxationSetup { level, reason: format!("zero pivot in row {i}") });
        }
        for k in ptr[i]..ptr[i + 1] {
            pos[col[k]] = usize::MAX;
        }
    }

    let split = |keep: &dyn Fn(usize, usize) -> bool| {
        let mut sp = Vec::with_capacity(n + 1);
        let mut sc = Vec::new();
        let mut sv = Vec::new();
        sp.push(0);
        for i in 0..n {
            for k in ptr[i]..ptr[i + 1] {
                if keep(i, col[k]) {
                    sc.push(col[k]);
                    sv.push(lu[k]);
                }
            }
            sp.push(sc.len());
        }
        CsrMatrix::from_sorted_parts(n, n, sp, sc, sv)
    };
    let l = split(&|i, j| j < i);
    let u = split(&|i, j| j > i);
    let dinv = (0..n).map(|i| T::one() / lu[diag[i]]).collect();
    Ok(Ilu0Factors { l, u, dinv })
}

pub struct ParallelIlu0<B: Backend> {
    l: B::Matrix,
    u: B::Matrix,
    dinv: B::Vector,
    damping: B::Value,
    solve_iters: usize,
}

impl<B: Backend> ParallelIlu0<B> {
    pub fn new(bk: &B, a: &CsrMatrix<B::Value>, params: &ParallelIlu0Params, level: usize) -> Result<Self, KError> {
        let f = factorize(a, level)?;
        Ok(Self {
            l: bk.copy_matrix(&f.l),
            u: bk.copy_matrix(&f.u),
            dinv: bk.copy_vector(&f.dinv),
            damping: cast(params.damping),
            solve_iters: params.solve_iters,
        })
    }

    /// z ≈ (LU)⁻¹ r.
    fn solve(&self, bk: &B, r: &B::Vector, z: &mut B::Vector) {
        let one = B::Value::one();
        let zero = B::Value::zero();
        let n = bk.vector_len(r);
        let mut y = bk.create_vector(n);
        let mut t = bk.create_vector(n);

        bk.copy(r, &mut y);
        for _ in 0..self.solve_iters {
            bk.copy(r, &mut t);
            bk.spmv(-one, &self.l, &y, one, &mut t);
            std::mem::swap(&mut y, &mut t);
        }

        bk.vmul(one, &self.dinv, &y, zero, z);
        for _ in 0..self.solve_iters {
            bk.copy(&y, &mut t);
            bk.spmv(-one, &self.u, z, one, &mut t);
            bk.vmul(one, &self.dinv, &t, zero, z);
        }
    }
}

impl<B: Backend> Relaxation<B> for ParallelIlu0<B> {
    fn kind(&self) -> RelaxationKind {
        RelaxationKind::ParallelIlu0
    }

    fn apply_pre(&self, bk: &B, a: &B::Matrix, rhs: &B::Vector, x: &mut B::Vector, tmp: &mut B::Vector) {
        bk.residual(rhs, a, x, tmp);
        let mut z = bk.create_vector(bk.vector_len(tmp));
        self.solve(bk, tmp, &mut z);
        bk.axpby(self.damping, &z, B::Value::one(), x);
    }
}
