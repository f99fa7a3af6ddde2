//! A single smoother used directly as the preconditioner.
//!
//! No hierarchy is built: `apply` is one relaxation sweep from a zero initial
//! guess, and [`Preconditioner::levels`] reports 0.

use crate::backend::Backend;
use crate::error::KError;
use crate::matrix::CsrMatrix;
use crate::preconditioner::{Preconditioner, Relaxation};
use std::fmt;

pub struct RelaxationPreconditioner<B: Backend> {
    a: B::Matrix,
    relax: Box<dyn Relaxation<B>>,
    rows: usize,
    nnz: usize,
}

impl<B: Backend> RelaxationPreconditioner<B> {
    pub fn new(bk: &B, a: &CsrMatrix<B::Value>, relax: Box<dyn Relaxation<B>>) -> Self {
        Self { a: bk.copy_matrix(a), relax, rows: a.nrows(), nnz: a.nnz() }
    }
}

impl<B: Backend> Preconditioner<B> for RelaxationPreconditioner<B> {
    fn apply(&self, bk: &B, rhs: &B::Vector, x: &mut B::Vector) -> Result<(), KError> {
        let mut tmp = bk.create_vector(self.rows);
        self.relax.apply(bk, &self.a, rhs, x, &mut tmp);
        Ok(())
    }

    fn system_matrix(&self) -> &B::Matrix {
        &self.a
    }

    fn levels(&self) -> usize {
        0
    }

    fn rows(&self) -> usize {
        self.rows
    }
}

impl<B: Backend> fmt::Display for RelaxationPreconditioner<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Relaxation as preconditioner")?;
        writeln!(f, "  relaxation: {}", self.relax.kind())?;
        writeln!(f, "  unknowns:   {}", self.rows)?;
        writeln!(f, "  nonzeros:   {}", self.nnz)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::HostBackend;
    use crate::preconditioner::Spai0;

    #[test]
    fn reports_no_levels() {
        let bk = HostBackend::<f64>::new();
        let a = CsrMatrix::from_triplets(2, 2, &[(0, 0, 2.0), (1, 1, 4.0)]).unwrap();
        let pc = RelaxationPreconditioner::new(&bk, &a, Box::new(Spai0::new(&bk, &a)));
        assert_eq!(pc.levels(), 0);
        let mut x = vec![7.0, 7.0];
        pc.apply(&bk, &vec![2.0, 4.0], &mut x).unwrap();
        assert_eq!(x, vec![1.0, 1.0]);
        assert!(pc.to_string().contains("spai0"));
    }
}
