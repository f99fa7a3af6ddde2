//! Chebyshev polynomial smoother.
//!
//! Runs `degree` steps of the Chebyshev iteration (Saad, Alg. 12.1) for the
//! interval `[lower·λ, higher·λ]`, where λ estimates the spectral radius of A
//! (or of D⁻¹A when `scale` is set).

use crate::backend::Backend;
use crate::config::{ParamStore, RelaxationKind};
use crate::core::traits::cast;
use crate::error::KError;
use crate::matrix::{CsrMatrix, spectral_radius};
use crate::preconditioner::Relaxation;
use num_traits::{One, Zero};

#[derive(Debug, Clone, PartialEq)]
pub struct ChebyshevParams {
    pub degree: usize,
    /// Upper end of the interval, relative to the spectral radius estimate.
    pub higher: f64,
    /// Lower end of the interval, relative to the spectral radius estimate.
    pub lower: f64,
    /// Power iterations for the estimate; 0 uses the Gershgorin bound.
    pub power_iters: usize,
    /// Precondition the iteration with the inverse diagonal.
    pub scale: bool,
}

impl Default for ChebyshevParams {
    fn default() -> Self {
        Self { degree: 5, higher: 1.0, lower: 1.0 / 30.0, power_iters: 0, scale: false }
    }
}

impl ChebyshevParams {
    pub fn from_params(prm: &ParamStore) -> Result<Self, KError> {
        let d = Self::default();
        Ok(Self {
            degree: prm.get_or("degree", d.degree)?,
            higher: prm.get_or("higher", d.higher)?,
            lower: prm.get_or("lower", d.lower)?,
            power_iters: prm.get_or("power_iters", d.power_iters)?,
            scale: prm.get_or("scale", d.scale)?,
        })
    }
}

pub struct Chebyshev<B: Backend> {
    degree: usize,
    theta: B::Value,
    delta: B::Value,
    dinv: Option<B::Vector>,
}

impl<B: Backend> Chebyshev<B> {
    pub fn new(bk: &B, a: &CsrMatrix<B::Value>, params: &ChebyshevParams, level: usize) -> Result<Self, KError> {
        let dinv = if params.scale {
            let d = a
                .diagonal()
                .into_iter()
                .enumerate()
                .map(|(i, d)| {
                    if d.is_zero() {
                        Err(KError::RelaxationSetup { level, reason: format!("zero diagonal in row {i}") })
                    } else {
                        Ok(B::Value::one() / d)
                    }
                })
                .collect::<Result<Vec<_>, _>>()?;
            Some(d)
        } else {
            None
        };

        let rho = spectral_radius(a, dinv.as_deref(), params.power_iters);
        if !(rho > B::Value::zero()) {
            return Err(KError::RelaxationSetup {
                level,
                reason: "operator has a zero spectral radius estimate".to_string(),
            });
        }
        let hi = rho * cast::<B::Value>(params.higher);
        let lo = rho * cast::<B::Value>(params.lower);
        let two = cast::<B::Value>(2.0);
        Ok(Self {
            degree: params.degree.max(1),
            theta: (hi + lo) / two,
            delta: (hi - lo) / two,
            dinv: dinv.map(|d| bk.copy_vector(&d)),
        })
    }

    /// d = a·M r + b·d, with M = D⁻¹ or I.
    fn precondition(&self, bk: &B, a: B::Value, r: &B::Vector, b: B::Value, d: &mut B::Vector) {
        match &self.dinv {
            Some(dinv) => bk.vmul(a, dinv, r, b, d),
            None => bk.axpby(a, r, b, d),
        }
    }
}

impl<B: Backend> Relaxation<B> for Chebyshev<B> {
    fn kind(&self) -> RelaxationKind {
        RelaxationKind::Chebyshev
    }

    fn apply_pre(&self, bk: &B, a: &B::Matrix, rhs: &B::Vector, x: &mut B::Vector, tmp: &mut B::Vector) {
        let one = B::Value::one();
        let two = one + one;
        let sigma = self.theta / self.delta;
        let mut rho0 = one / sigma;

        let r = tmp;
        bk.residual(rhs, a, x, r);
        let mut d = bk.create_vector(bk.vector_len(r));
        self.precondition(bk, one / self.theta, r, B::Value::zero(), &mut d);

        for k in 0..self.degree {
            bk.axpby(one, &d, one, x);
            if k + 1 == self.degree {
                break;
            }
            bk.spmv(-one, a, &d, one, r);
            let rho1 = one / (two * sigma - rho0);
            self.precondition(bk, two * rho1 / self.delta, r, rho1 * rho0, &mut d);
            rho0 = rho1;
        }
    }
}
