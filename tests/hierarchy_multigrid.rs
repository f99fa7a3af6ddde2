//! Hierarchy and multigrid cycle tests on the 2D Poisson model problems.
//!
//! Checks that every coarsening policy produces a hierarchy satisfying the
//! Galerkin identity on every level (verified densely with faer), and that
//! multigrid cycles used as a stationary iteration shrink the energy norm of
//! the error of an SPD operator monotonically.

use approx::assert_abs_diff_eq;
use krylov_amg::backend::{Backend, HostBackend};
use krylov_amg::config::{CoarseningKind, ParamStore, RelaxationKind};
use krylov_amg::context::{PrecondKind, make_coarsening, make_preconditioner};
use krylov_amg::preconditioner::{HierarchyParams, Preconditioner, build_levels};
use krylov_amg::utils::NoopTimer;
use krylov_amg::utils::sample_problem::{laplace2d, poisson2d_dirichlet};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// `A_c = R A P` checked entry by entry against dense products.
#[test]
fn galerkin_identity_holds_on_every_level() {
    for kind in CoarseningKind::ALL {
        let (a, _) = laplace2d::<f64>(16);
        let policy = make_coarsening::<f64>(kind, &ParamStore::new()).unwrap();
        let levels = build_levels(a, policy.as_ref(), &HierarchyParams::default(), &mut NoopTimer).unwrap();
        assert!(levels.len() >= 2, "{kind} built a single level");

        for pair in levels.windows(2) {
            let ops = pair[0].transfer.as_ref().unwrap();
            let rap = &ops.r.to_dense() * &pair[0].a.to_dense() * &ops.p.to_dense();
            let coarse = pair[1].a.to_dense();
            assert_eq!(rap.nrows(), coarse.nrows());
            assert_eq!(rap.ncols(), coarse.ncols());
            for i in 0..coarse.nrows() {
                for j in 0..coarse.ncols() {
                    assert_abs_diff_eq!(rap[(i, j)], coarse[(i, j)], epsilon = 1e-10);
                }
            }
        }
        assert!(levels.last().unwrap().transfer.is_none());
    }
}

/// Identity boundary rows must not stall coarsening.
#[test]
fn hierarchy_dimensions_strictly_decrease() {
    let (a, _) = poisson2d_dirichlet::<f64>(24);
    for kind in CoarseningKind::ALL {
        let policy = make_coarsening::<f64>(kind, &ParamStore::new()).unwrap();
        let levels = build_levels(a.clone(), policy.as_ref(), &HierarchyParams::default(), &mut NoopTimer).unwrap();
        for pair in levels.windows(2) {
            assert!(pair[1].a.nrows() < pair[0].a.nrows(), "{kind} did not coarsen");
        }
    }
}

/// Stationary multigrid on a known random error. Every cycle variant must
/// shrink the energy norm of the error on each step until it reaches the
/// rounding floor.
#[test]
fn repeated_cycles_reduce_energy_error_monotonically() {
    let bk = HostBackend::<f64>::new();
    let (a, _) = laplace2d::<f64>(32);
    let n = a.nrows();
    let mut rng = StdRng::seed_from_u64(7);
    let exact: Vec<f64> = (0..n).map(|_| rng.gen_range(-1.0..1.0)).collect();
    let mut f = vec![0.0; n];
    a.spmv(&exact, &mut f);

    let energy = |x: &[f64]| {
        let e: Vec<f64> = x.iter().zip(&exact).map(|(xi, ei)| xi - ei).collect();
        let mut ae = vec![0.0; n];
        a.spmv(&e, &mut ae);
        e.iter().zip(&ae).map(|(u, v)| u * v).sum::<f64>().sqrt()
    };

    let variants = [
        ("V-cycle", ParamStore::new()),
        ("W-cycle", ParamStore::new().with("precond.ncycle", 2)),
        ("two cycles", ParamStore::new().with("precond.pre_cycles", 2)),
    ];
    for coarsening in CoarseningKind::ALL {
        for relaxation in RelaxationKind::ALL {
            for (label, prm) in &variants {
                let kind = PrecondKind::Amg { coarsening, relaxation };
                let amg = make_preconditioner(&bk, a.clone(), kind, prm, &mut NoopTimer).unwrap();
                let op = amg.system_matrix();

                let mut x = vec![0.0; n];
                let mut r = vec![0.0; n];
                let mut d = vec![0.0; n];
                let initial = energy(&x);
                let mut prev = initial;
                for cycle in 0..10 {
                    bk.residual(&f, op, &x, &mut r);
                    amg.apply(&bk, &r, &mut d).unwrap();
                    bk.axpby(1.0, &d, 1.0, &mut x);
                    let cur = energy(&x);
                    if prev > 1e-11 * initial {
                        assert!(cur < prev, "{kind} {label}: cycle {cycle} raised the error from {prev:e} to {cur:e}");
                    }
                    prev = cur;
                }
                assert!(prev < 0.5 * initial, "{kind} {label}: error only fell to {prev:e} from {initial:e}");
            }
        }
    }
}
