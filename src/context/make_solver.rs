//! Runtime-configured solver: a preconditioner and a Krylov method bound to one backend.
//!
//! Configuration problems (unknown option names, unparsable values) are
//! detected before the hierarchy is built. After setup the solver is
//! immutable: repeated solves reuse the hierarchy, and `&self` solves may run
//! concurrently from several threads.
//!
//! # Example
//!
//! ```rust
//! use krylov_amg::backend::HostBackend;
//! use krylov_amg::config::ParamStore;
//! use krylov_amg::context::RuntimeSolver;
//! use krylov_amg::utils::sample_problem::laplace2d;
//!
//! let (a, rhs) = laplace2d::<f64>(16);
//! let prm = ParamStore::new().with("solver.type", "cg");
//! let solver = RuntimeSolver::new(HostBackend::new(), a, &prm).unwrap();
//! let (x, stats) = solver.solve_host(&rhs).unwrap();
//! assert!(stats.converged);
//! assert_eq!(x.len(), 256);
//! ```

use crate::backend::Backend;
use crate::config::{ParamStore, SolverKind};
use crate::context::ksp_context::make_iterative_solver;
use crate::context::pc_context::{PrecondKind, make_preconditioner};
use crate::error::KError;
use crate::matrix::CsrMatrix;
use crate::preconditioner::Preconditioner;
use crate::solver::IterativeSolver;
use crate::utils::convergence::SolveStats;
use crate::utils::{NoopTimer, TimingSink};
use std::fmt;

pub struct RuntimeSolver<B: Backend> {
    backend: B,
    precond: Box<dyn Preconditioner<B>>,
    solver: Box<dyn IterativeSolver<B>>,
    precond_kind: PrecondKind,
}

impl<B: Backend> RuntimeSolver<B> {
    /// Build from `prm`, reading `precond.type`, `precond.coarsening.type`,
    /// `precond.relax.type` and `solver.type`.
    pub fn new(backend: B, a: CsrMatrix<B::Value>, prm: &ParamStore) -> Result<Self, KError> {
        let pk = PrecondKind::from_params(prm)?;
        let sk = SolverKind::from_params(prm)?;
        Self::with_kinds(backend, a, pk, sk, prm)
    }

    /// Build from raw CRS arrays of a square `n × n` operator.
    pub fn from_crs(
        backend: B,
        n: usize,
        ptr: Vec<usize>,
        col: Vec<usize>,
        val: Vec<B::Value>,
        prm: &ParamStore,
    ) -> Result<Self, KError> {
        let a = CsrMatrix::from_csr(n, n, ptr, col, val)?;
        Self::new(backend, a, prm)
    }

    /// Build with explicitly chosen kinds; the remaining parameters still come from `prm`.
    pub fn with_kinds(
        backend: B,
        a: CsrMatrix<B::Value>,
        precond: PrecondKind,
        solver: SolverKind,
        prm: &ParamStore,
    ) -> Result<Self, KError> {
        Self::setup(backend, a, precond, solver, prm, &mut NoopTimer)
    }

    /// Profiled construction; phases are reported to `timer` under the `setup` scope.
    pub fn setup(
        backend: B,
        a: CsrMatrix<B::Value>,
        precond: PrecondKind,
        solver: SolverKind,
        prm: &ParamStore,
        timer: &mut dyn TimingSink,
    ) -> Result<Self, KError> {
        let krylov = make_iterative_solver::<B>(solver, &prm.subtree("solver"))?;
        timer.tic("setup");
        let pc = make_preconditioner(&backend, a, precond, prm, timer);
        timer.toc("setup");
        Ok(Self { backend, precond: pc?, solver: krylov, precond_kind: precond })
    }

    /// Solve A x = rhs with `x` as the initial guess.
    pub fn solve(&self, rhs: &B::Vector, x: &mut B::Vector) -> Result<SolveStats<B::Value>, KError> {
        self.solve_with(self.precond.system_matrix(), rhs, x)
    }

    /// Solve `a x = rhs` with the preconditioner built for the setup matrix.
    ///
    /// `a` is typically a slightly perturbed version of that matrix, as in a
    /// nonlinear or time-stepping loop that reuses the hierarchy.
    pub fn solve_with(
        &self,
        a: &B::Matrix,
        rhs: &B::Vector,
        x: &mut B::Vector,
    ) -> Result<SolveStats<B::Value>, KError> {
        let n = self.rows();
        for found in [self.backend.matrix_rows(a), self.backend.vector_len(rhs), self.backend.vector_len(x)] {
            if found != n {
                return Err(KError::DimensionMismatch { expected: n, found });
            }
        }
        self.solver.solve(&self.backend, a, self.precond.as_ref(), rhs, x)
    }

    /// Solve from a zero initial guess with host-resident data.
    pub fn solve_host(&self, rhs: &[B::Value]) -> Result<(Vec<B::Value>, SolveStats<B::Value>), KError> {
        if rhs.len() != self.rows() {
            return Err(KError::DimensionMismatch { expected: self.rows(), found: rhs.len() });
        }
        let f = self.backend.copy_vector(rhs);
        let mut x = self.backend.create_vector(rhs.len());
        let stats = self.solve(&f, &mut x)?;
        Ok((self.backend.to_host(&x), stats))
    }

    pub fn describe(&self) -> String {
        self.to_string()
    }

    /// Hierarchy depth; 0 for a single-smoother preconditioner.
    pub fn levels(&self) -> usize {
        self.precond.levels()
    }

    pub fn rows(&self) -> usize {
        self.precond.rows()
    }

    pub fn precond(&self) -> &dyn Preconditioner<B> {
        self.precond.as_ref()
    }

    pub fn precond_kind(&self) -> PrecondKind {
        self.precond_kind
    }

    pub fn solver_kind(&self) -> SolverKind {
        self.solver.kind()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

impl<B: Backend> fmt::Display for RuntimeSolver<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Solver")?;
        writeln!(f, "======")?;
        writeln!(f, "Type:     {}", self.solver.kind())?;
        writeln!(f, "Unknowns: {}", self.rows())?;
        writeln!(f, "Backend:  {}", self.backend.name())?;
        writeln!(f)?;
        writeln!(f, "Preconditioner")?;
        writeln!(f, "==============")?;
        write!(f, "{}", self.precond)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::HostBackend;
    use crate::config::RelaxationKind;
    use crate::utils::Profiler;
    use crate::utils::sample_problem::laplace2d;

    type Host = HostBackend<f64>;

    #[test]
    fn rejects_wrong_rhs_length() {
        let (a, _) = laplace2d::<f64>(8);
        let solver = RuntimeSolver::new(Host::new(), a, &ParamStore::new()).unwrap();
        let err = solver.solve_host(&[1.0; 10]).err();
        assert!(matches!(err, Some(KError::DimensionMismatch { expected: 64, found: 10 })));
    }

    #[test]
    fn setup_reports_phases() {
        let (a, _) = laplace2d::<f64>(16);
        let mut prof = Profiler::new("total");
        let solver = RuntimeSolver::setup(
            Host::new(),
            a,
            PrecondKind::default(),
            SolverKind::default(),
            &ParamStore::new(),
            &mut prof,
        )
        .unwrap();
        assert!(solver.levels() >= 2);
        let text = prof.to_string();
        for scope in ["setup", "coarsening", "galerkin", "relaxation", "move to backend"] {
            assert!(text.contains(scope), "missing scope {scope}");
        }
    }

    #[test]
    fn unknown_solver_is_rejected_before_setup() {
        let (a, _) = laplace2d::<f64>(4);
        let prm = ParamStore::new().with("solver.type", "qmr");
        assert!(matches!(RuntimeSolver::new(Host::new(), a, &prm), Err(KError::Configuration(_))));
    }

    #[test]
    fn description_names_components() {
        let (a, _) = laplace2d::<f64>(8);
        let solver = RuntimeSolver::with_kinds(
            Host::new(),
            a,
            PrecondKind::Relaxation(RelaxationKind::Spai0),
            SolverKind::Cg,
            &ParamStore::new(),
        )
        .unwrap();
        let text = solver.describe();
        assert!(text.contains("Type:     cg"));
        assert!(text.contains("Relaxation as preconditioner"));
        assert_eq!(solver.levels(), 0);
    }
}
