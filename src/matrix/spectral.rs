//! Spectral radius estimates for (optionally diagonally scaled) operators.
//!
//! Used to pick damping factors for the smoothed prolongation and the
//! interval of the Chebyshev smoother.

use crate::core::traits::Scalar;
use crate::matrix::CsrMatrix;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const POWER_SEED: u64 = 5489;

/// Estimate ρ(D·A) where `D = diag(scale)` (identity when `scale` is `None`).
///
/// With `power_iters == 0` the Gershgorin bound `max_i |d_i| Σ_j |a_ij|` is
/// returned. Otherwise a power iteration from a seeded random vector is run,
/// so the estimate is reproducible.
pub fn spectral_radius<T: Scalar>(a: &CsrMatrix<T>, scale: Option<&[T]>, power_iters: usize) -> T {
    let d = |i: usize| scale.map_or(T::one(), |s| s[i]);
    if power_iters == 0 {
        return (0..a.nrows())
            .map(|i| d(i).abs() * a.row(i).1.iter().fold(T::zero(), |acc, v| acc + v.abs()))
            .fold(T::zero(), T::max);
    }

    let n = a.nrows();
    let mut rng = StdRng::seed_from_u64(POWER_SEED);
    let mut b0: Vec<T> = (0..n).map(|_| T::from_f64(rng.gen_range(-1.0..1.0)).unwrap_or_else(T::one)).collect();
    let mut b1 = vec![T::zero(); n];
    normalize(&mut b0);
    let mut radius = T::zero();
    for _ in 0..power_iters {
        a.spmv(&b0, &mut b1);
        for (i, v) in b1.iter_mut().enumerate() {
            *v *= d(i);
        }
        radius = normalize(&mut b1);
        if radius.is_zero() {
            break;
        }
        std::mem::swap(&mut b0, &mut b1);
    }
    radius
}

fn normalize<T: Scalar>(x: &mut [T]) -> T {
    let norm = x.iter().fold(T::zero(), |acc, &v| acc + v * v).sqrt();
    if !norm.is_zero() {
        x.iter_mut().for_each(|v| *v /= norm);
    }
    norm
}
