// Damped Jacobi smoother: x ← x + ω D⁻¹ (f − A x)

use crate::backend::Backend;
use crate::config::{ParamStore, RelaxationKind};
use crate::core::traits::cast;
use crate::error::KError;
use crate::matrix::CsrMatrix;
use crate::preconditioner::Relaxation;
use num_traits::{One, Zero};

#[derive(Debug, Clone, PartialEq)]
pub struct DampedJacobiParams {
    pub damping: f64,
}

impl Default for DampedJacobiParams {
    fn default() -> Self {
        Self { damping: 0.72 }
    }
}

impl DampedJacobiParams {
    pub fn from_params(prm: &ParamStore) -> Result<Self, KError> {
        Ok(Self { damping: prm.get_or("damping", Self::default().damping)? })
    }
}

pub struct DampedJacobi<B: Backend> {
    dia: B::Vector,
}

impl<B: Backend> DampedJacobi<B> {
    /// Fails with [`KError::RelaxationSetup`] if any diagonal entry is zero.
    pub fn new(bk: &B, a: &CsrMatrix<B::Value>, params: &DampedJacobiParams, level: usize) -> Result<Self, KError> {
        let omega = cast::<B::Value>(params.damping);
        let dia = a
            .diagonal()
            .into_iter()
            .enumerate()
            .map(|(i, d)| {
                if d.is_zero() {
                    Err(KError::RelaxationSetup { level, reason: format!("zero diagonal in row {i}") })
                } else {
                    Ok(omega / d)
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { dia: bk.copy_vector(&dia) })
    }
}

impl<B: Backend> Relaxation<B> for DampedJacobi<B> {
    fn kind(&self) -> RelaxationKind {
        RelaxationKind::DampedJacobi
    }

    fn apply_pre(&self, bk: &B, a: &B::Matrix, rhs: &B::Vector, x: &mut B::Vector, tmp: &mut B::Vector) {
        bk.residual(rhs, a, x, tmp);
        bk.vmul(B::Value::one(), &self.dia, tmp, B::Value::one(), x);
    }

    fn apply(&self, bk: &B, _a: &B::Matrix, rhs: &B::Vector, x: &mut B::Vector, _tmp: &mut B::Vector) {
        bk.vmul(B::Value::one(), &self.dia, rhs, B::Value::zero(), x);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::HostBackend;
    use approx::assert_abs_diff_eq;

    #[test]
    fn one_sweep_on_diagonal_system() {
        let bk = HostBackend::<f64>::new();
        let a = CsrMatrix::from_triplets(2, 2, &[(0, 0, 2.0), (1, 1, 4.0)]).unwrap();
        let jac = DampedJacobi::new(&bk, &a, &DampedJacobiParams { damping: 1.0 }, 0).unwrap();
        let rhs = vec![2.0, 8.0];
        let mut x = vec![0.0; 2];
        let mut tmp = vec![0.0; 2];
        jac.apply_pre(&bk, &a, &rhs, &mut x, &mut tmp);
        assert_abs_diff_eq!(x[0], 1.0);
        assert_abs_diff_eq!(x[1], 2.0);
    }

    #[test]
    fn zero_diagonal_is_a_setup_error() {
        let bk = HostBackend::<f64>::new();
        let a = CsrMatrix::from_triplets(2, 2, &[(0, 0, 1.0), (1, 0, 1.0)]).unwrap();
        let err = DampedJacobi::new(&bk, &a, &DampedJacobiParams::default(), 3).err().unwrap();
        assert!(matches!(err, KError::RelaxationSetup { level: 3, .. }));
    }
}
