//! End-to-end tests of the runtime-configured solver.
//!
//! Every combination of Krylov method and preconditioner is driven through
//! `RuntimeSolver`: the identity operator must be solved in at most two
//! iterations, the 2D Poisson problems must converge, and configuration or
//! structural problems must surface as the matching `KError` variant. Also
//! checks that repeated and concurrent solves are reproducible.

use approx::assert_abs_diff_eq;
use krylov_amg::backend::{Backend, HostBackend};
use krylov_amg::config::{CoarseningKind, ParamStore, RelaxationKind, SolverKind};
use krylov_amg::context::{PrecondKind, RuntimeSolver};
use krylov_amg::error::KError;
use krylov_amg::matrix::CsrMatrix;
use krylov_amg::utils::sample_problem::{laplace2d, poisson2d_dirichlet};

type Host = HostBackend<f64>;

/// Every AMG coarsening × relaxation pair, then every relaxation used alone.
fn all_precond_kinds() -> Vec<PrecondKind> {
    let mut kinds = Vec::new();
    for coarsening in CoarseningKind::ALL {
        for relaxation in RelaxationKind::ALL {
            kinds.push(PrecondKind::Amg { coarsening, relaxation });
        }
    }
    kinds.extend(RelaxationKind::ALL.into_iter().map(PrecondKind::Relaxation));
    kinds
}

fn relative_residual(a: &CsrMatrix<f64>, x: &[f64], f: &[f64]) -> f64 {
    let mut ax = vec![0.0; f.len()];
    a.spmv(x, &mut ax);
    let r: f64 = ax.iter().zip(f).map(|(y, b)| (b - y) * (b - y)).sum::<f64>().sqrt();
    r / f.iter().map(|b| b * b).sum::<f64>().sqrt()
}

/// On `A = I` every solver and preconditioner pairing must be exact after at
/// most two iterations.
#[test]
fn identity_is_solved_by_every_combination() {
    let n = 100;
    let rhs: Vec<f64> = (1..=n).map(|i| i as f64).collect();
    for solver in SolverKind::ALL {
        for precond in all_precond_kinds() {
            let s = RuntimeSolver::with_kinds(Host::new(), CsrMatrix::identity(n), precond, solver, &ParamStore::new())
                .unwrap();
            let (x, stats) = s.solve_host(&rhs).unwrap();
            assert!(stats.converged, "{solver} / {precond} did not converge");
            assert!(stats.iterations <= 2, "{solver} / {precond} took {} iterations", stats.iterations);
            for (xi, bi) in x.iter().zip(&rhs) {
                assert_abs_diff_eq!(*xi, *bi, epsilon = 1e-6 * bi);
            }
        }
    }
}

/// A bare relaxation preconditioner reports zero levels and still converges
/// given enough iterations.
#[test]
fn just_relax_builds_no_hierarchy() {
    let (a, f) = laplace2d::<f64>(16);
    let prm = ParamStore::new().with("solver.maxiter", 500);
    for relaxation in RelaxationKind::ALL {
        let s = RuntimeSolver::with_kinds(
            Host::new(),
            a.clone(),
            PrecondKind::Relaxation(relaxation),
            SolverKind::BiCgStab,
            &prm,
        )
        .unwrap();
        assert_eq!(s.levels(), 0);
        let (x, stats) = s.solve_host(&f).unwrap();
        assert!(stats.converged, "{relaxation} did not converge");
        assert!(relative_residual(&a, &x, &f) < 1e-6);
    }
}

#[test]
fn poisson_32_converges_quickly_with_defaults() {
    let (a, f) = laplace2d::<f64>(32);
    let prm = ParamStore::new()
        .with("precond.coarsening.type", "smoothed_aggregation")
        .with("precond.relax.type", "spai0")
        .with("solver.type", "bicgstab")
        .with("solver.tol", 1e-8);
    let solver = RuntimeSolver::new(Host::new(), a.clone(), &prm).unwrap();
    assert!(solver.levels() >= 2);
    let (x, stats) = solver.solve_host(&f).unwrap();
    assert!(stats.converged);
    assert!(stats.iterations < 30, "took {} iterations", stats.iterations);
    assert!(stats.residual <= 1e-8);
    assert!(relative_residual(&a, &x, &f) < 1e-7);
}

/// Both preconditioning sides for every Krylov method.
#[test]
fn every_method_solves_poisson_with_amg() {
    let (a, f) = laplace2d::<f64>(24);
    for solver in SolverKind::ALL {
        for pside in ["left", "right"] {
            let prm = ParamStore::new().with("solver.pside", pside);
            let s = RuntimeSolver::with_kinds(Host::new(), a.clone(), PrecondKind::default(), solver, &prm).unwrap();
            let (x, stats) = s.solve_host(&f).unwrap();
            assert!(stats.converged, "{solver} ({pside}) did not converge");
            assert!(relative_residual(&a, &x, &f) < 1e-6);
        }
    }
}

/// The nonsymmetric Dirichlet operator, identity rows included.
#[test]
fn dirichlet_poisson_converges_for_every_coarsening() {
    let (a, f) = poisson2d_dirichlet::<f64>(32);
    for coarsening in CoarseningKind::ALL {
        let kind = PrecondKind::Amg { coarsening, relaxation: RelaxationKind::Spai0 };
        let s = RuntimeSolver::with_kinds(Host::new(), a.clone(), kind, SolverKind::BiCgStab, &ParamStore::new())
            .unwrap();
        let (x, stats) = s.solve_host(&f).unwrap();
        assert!(stats.converged, "{coarsening} did not converge");
        assert!(relative_residual(&a, &x, &f) < 1e-6);
        // boundary rows are identity rows with zero rhs
        assert_abs_diff_eq!(x[0], 0.0, epsilon = 1e-6);
    }
}

/// Running out of iterations returns stats with `converged == false`, not an `Err`.
#[test]
fn iteration_budget_is_not_an_error() {
    let (a, f) = laplace2d::<f64>(32);
    let prm = ParamStore::new().with("solver.maxiter", 1);
    let s = RuntimeSolver::new(Host::new(), a, &prm).unwrap();
    let (_, stats) = s.solve_host(&f).unwrap();
    assert_eq!(stats.iterations, 1);
    assert!(!stats.converged);
    assert!(stats.residual > 1e-8);
}

#[test]
fn zero_rhs_gives_zero_solution() {
    let (a, _) = laplace2d::<f64>(8);
    let s = RuntimeSolver::new(Host::new(), a, &ParamStore::new()).unwrap();
    let (x, stats) = s.solve_host(&[0.0; 64]).unwrap();
    assert!(stats.converged);
    assert_eq!(stats.iterations, 0);
    assert!(x.iter().all(|&v| v == 0.0));
}

/// Starting from the converged solution needs at most one more iteration.
#[test]
fn initial_guess_is_used() {
    let (a, f) = laplace2d::<f64>(16);
    let s = RuntimeSolver::new(Host::new(), a, &ParamStore::new()).unwrap();
    let (exact, _) = s.solve_host(&f).unwrap();
    let mut x = exact.clone();
    let stats = s.solve(&f, &mut x).unwrap();
    assert!(stats.iterations <= 1);
    assert!(stats.converged);
}

#[test]
fn malformed_crs_is_a_structural_error() {
    let prm = ParamStore::new();
    // row pointer one entry short
    let err = RuntimeSolver::from_crs(Host::new(), 3, vec![0, 1, 2], vec![0, 1, 2], vec![1.0; 3], &prm).err();
    assert!(matches!(err, Some(KError::Structural(_))));
    // column out of range
    let err = RuntimeSolver::from_crs(Host::new(), 2, vec![0, 1, 2], vec![0, 5], vec![1.0; 2], &prm).err();
    assert!(matches!(err, Some(KError::Structural(_))));
    // non-square operator
    let a = CsrMatrix::from_csr(2, 3, vec![0, 1, 2], vec![0, 2], vec![1.0, 1.0]).unwrap();
    assert!(matches!(RuntimeSolver::new(Host::new(), a, &prm), Err(KError::Structural(_))));
}

/// A decreasing row pointer is rejected before any setup work.
#[test]
fn decreasing_row_pointer_is_reported_with_its_row() {
    let err = RuntimeSolver::from_crs(Host::new(), 2, vec![0, 2, 1], vec![0, 1], vec![1.0, 1.0], &ParamStore::new()).err();
    match err {
        Some(KError::Structural(msg)) => assert_eq!(msg, "row pointer decreases at row 1 (2 > 1)"),
        other => panic!("expected a structural error, got {other:?}"),
    }
}

/// A shifted operator is solved with the hierarchy built for the unshifted one.
#[test]
fn solve_with_reuses_the_preconditioner_for_a_nearby_matrix() {
    let (a, f) = laplace2d::<f64>(32);
    let prm = ParamStore::new().with("solver.tol", 1e-10);
    let s = RuntimeSolver::new(Host::new(), a.clone(), &prm).unwrap();
    let shifted = a.add(1.0, &CsrMatrix::identity(a.nrows()), 0.05).unwrap();

    let bk = s.backend();
    let op = bk.copy_matrix(&shifted);
    let rhs = bk.copy_vector(&f);
    let mut x = bk.create_vector(f.len());
    let stats = s.solve_with(&op, &rhs, &mut x).unwrap();
    assert!(stats.converged);
    assert!(relative_residual(&shifted, &x, &f) < 1e-8);
    // the setup matrix is not what was solved
    assert!(relative_residual(&a, &x, &f) > 1e-6);

    let small = bk.copy_matrix(&CsrMatrix::identity(10));
    let err = s.solve_with(&small, &rhs, &mut x).err();
    assert!(matches!(err, Some(KError::DimensionMismatch { expected: 1024, found: 10 })));
}

/// Classical coarsening keeps its iteration count roughly flat as the
/// Dirichlet grid is refined.
#[test]
fn ruge_stuben_scales_on_the_dirichlet_problem() {
    let prm = ParamStore::new().with("precond.coarsening.type", "ruge_stuben").with("solver.maxiter", 200);
    let mut iterations = Vec::new();
    for m in [16, 32, 64, 100] {
        let (a, f) = poisson2d_dirichlet::<f64>(m);
        let s = RuntimeSolver::new(Host::new(), a.clone(), &prm).unwrap();
        let (x, stats) = s.solve_host(&f).unwrap();
        assert!(stats.converged, "m = {m} did not converge");
        assert!(relative_residual(&a, &x, &f) < 1e-6);
        iterations.push(stats.iterations);
    }
    let (first, last) = (iterations[0], iterations[iterations.len() - 1]);
    assert!(last <= 2 * first + 4, "iterations grew with the grid: {iterations:?}");
}

#[test]
fn unknown_options_are_configuration_errors() {
    let (a, _) = laplace2d::<f64>(4);
    for (key, value) in [
        ("solver.type", "qmr"),
        ("precond.type", "ilut"),
        ("precond.coarsening.type", "geometric"),
        ("precond.relax.type", "gauss_seidel"),
        ("solver.maxiter", "many"),
    ] {
        let prm = ParamStore::new().with(key, value);
        let err = RuntimeSolver::new(Host::new(), a.clone(), &prm).err();
        assert!(matches!(err, Some(KError::Configuration(_))), "{key} = {value}");
    }
}

/// Jacobi needs a nonzero diagonal; SPAI-0 maps an empty row to zero.
#[test]
fn zero_diagonal_row_rejects_jacobi_but_not_spai0() {
    // row 1 is empty
    let a = CsrMatrix::from_csr(3, 3, vec![0, 1, 1, 2], vec![0, 2], vec![2.0, 3.0]).unwrap();
    let prm = ParamStore::new().with("precond.type", "damped_jacobi");
    let err = RuntimeSolver::new(Host::new(), a.clone(), &prm).err();
    assert!(matches!(err, Some(KError::RelaxationSetup { level: 0, .. })));

    let prm = ParamStore::new().with("precond.type", "spai0");
    assert!(RuntimeSolver::new(Host::new(), a, &prm).is_ok());
}

#[test]
fn repeated_solves_are_identical() {
    let (a, f) = laplace2d::<f64>(32);
    let s = RuntimeSolver::new(Host::new(), a, &ParamStore::new()).unwrap();
    let (x1, st1) = s.solve_host(&f).unwrap();
    let (x2, st2) = s.solve_host(&f).unwrap();
    assert_eq!(x1, x2);
    assert_eq!(st1, st2);
}

/// A built solver is shared across threads and gives bit-identical answers.
#[test]
fn concurrent_solves_match_serial_ones() {
    let (a, f) = laplace2d::<f64>(24);
    let s = RuntimeSolver::new(Host::new(), a, &ParamStore::new()).unwrap();
    let rhs: Vec<Vec<f64>> = (1..=4).map(|k| f.iter().map(|v| v * k as f64).collect()).collect();
    let serial: Vec<_> = rhs.iter().map(|b| s.solve_host(b).unwrap()).collect();
    let solver = &s;
    let parallel: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = rhs.iter().map(|b| scope.spawn(move || solver.solve_host(b).unwrap())).collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    assert_eq!(serial, parallel);
}

#[test]
fn json_parameters_drive_composition() {
    let prm = ParamStore::from_json_str(
        r#"{
            "solver": { "type": "gmres", "M": 20, "tol": 1e-6, "maxiter": 200 },
            "precond": {
                "coarse_enough": 100,
                "coarsening": { "type": "ruge_stuben", "eps_strong": 0.25 },
                "relax": { "type": "damped_jacobi", "damping": 0.8 }
            }
        }"#,
    )
    .unwrap();
    let (a, f) = laplace2d::<f64>(20);
    let s = RuntimeSolver::new(Host::new(), a, &prm).unwrap();
    assert_eq!(s.solver_kind(), SolverKind::Gmres);
    assert_eq!(
        s.precond_kind(),
        PrecondKind::Amg { coarsening: CoarseningKind::RugeStuben, relaxation: RelaxationKind::DampedJacobi }
    );
    let text = s.describe();
    assert!(text.contains("ruge_stuben"));
    assert!(text.contains("damped_jacobi"));
    let (_, stats) = s.solve_host(&f).unwrap();
    assert!(stats.converged);
    assert!(stats.residual <= 1e-6);
}

#[cfg(feature = "rayon")]
/// Same solve on both backends, then a repeat on the parallel one.
#[test]
fn rayon_backend_matches_host() {
    use krylov_amg::backend::{RayonBackend, RayonParams};

    let (a, f) = laplace2d::<f64>(32);
    let prm = ParamStore::new().with("solver.tol", 1e-12);
    let host = RuntimeSolver::new(Host::new(), a.clone(), &prm).unwrap();
    let rayon = RuntimeSolver::new(
        RayonBackend::<f64>::new(RayonParams { num_threads: Some(3) }).unwrap(),
        a,
        &prm,
    )
    .unwrap();
    assert_eq!(rayon.backend().num_threads(), 3);

    let (xh, sh) = host.solve_host(&f).unwrap();
    let (xr, sr) = rayon.solve_host(&f).unwrap();
    assert!(sh.converged && sr.converged);
    assert!(sh.iterations.abs_diff(sr.iterations) <= 2);
    for (a, b) in xh.iter().zip(&xr) {
        assert_abs_diff_eq!(*a, *b, epsilon = 1e-5);
    }
    // chunked reductions make the parallel backend reproducible too
    let (xr2, _) = rayon.solve_host(&f).unwrap();
    assert_eq!(xr, xr2);
}
