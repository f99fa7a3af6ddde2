//! Solve the 2D Poisson problem with a runtime-configured AMG solver.
//!
//! ```text
//! cargo run --release --example runtime -- -n 128 -c ruge_stuben -r damped_jacobi -s cg
//! RUST_LOG=krylov_amg=debug cargo run --example runtime -- -p params.json
//! ```

use clap::Parser;
use krylov_amg::backend::{Backend, HostBackend};
use krylov_amg::config::{ParamStore, SolverKind};
use krylov_amg::context::{PrecondKind, RuntimeSolver};
use krylov_amg::error::KError;
use krylov_amg::matrix::CsrMatrix;
use krylov_amg::utils::sample_problem::poisson2d_dirichlet;
use krylov_amg::utils::{Profiler, TimingSink};

#[derive(Parser, Debug)]
#[command(name = "runtime")]
#[command(about = "AMG preconditioned Krylov solve of the 2D Poisson problem", long_about = None)]
struct Cli {
    /// Grid points per dimension
    #[arg(short = 'n', long = "size", default_value_t = 32)]
    size: usize,

    /// Coarsening policy
    #[arg(short, long, default_value = "smoothed_aggregation")]
    coarsening: String,

    /// Relaxation scheme
    #[arg(short, long, default_value = "spai0")]
    relaxation: String,

    /// Use the relaxation alone as the preconditioner
    #[arg(short = '0', long)]
    just_relax: bool,

    /// Krylov method
    #[arg(short, long, default_value = "bicgstab")]
    solver: String,

    /// JSON parameter file; command line choices override it
    #[arg(short, long)]
    params: Option<String>,

    /// Run on the serial host backend
    #[arg(long)]
    serial: bool,
}

fn params(cli: &Cli) -> Result<ParamStore, KError> {
    let mut prm = match &cli.params {
        Some(path) => ParamStore::from_json_file(path)?,
        None => ParamStore::new(),
    };
    prm.put("precond.coarsening.type", &cli.coarsening);
    prm.put("precond.relax.type", &cli.relaxation);
    prm.put("precond.type", if cli.just_relax { "relaxation" } else { "amg" });
    prm.put("solver.type", &cli.solver);
    Ok(prm)
}

fn relative_residual(a: &CsrMatrix<f64>, x: &[f64], f: &[f64]) -> f64 {
    let mut ax = vec![0.0; f.len()];
    a.spmv(x, &mut ax);
    let r: f64 = ax.iter().zip(f).map(|(y, b)| (b - y) * (b - y)).sum();
    let nf: f64 = f.iter().map(|b| b * b).sum();
    (r / nf).sqrt()
}

fn run<B: Backend<Value = f64>>(backend: B, cli: &Cli, prm: &ParamStore) -> Result<(), KError> {
    let mut prof = Profiler::new("runtime");

    prof.tic("assemble");
    let (a, f) = poisson2d_dirichlet::<f64>(cli.size);
    prof.toc("assemble");

    let precond = PrecondKind::from_params(prm)?;
    let solver_kind = SolverKind::from_params(prm)?;
    let solver = RuntimeSolver::setup(backend, a.clone(), precond, solver_kind, prm, &mut prof)?;
    println!("Backend: {}", solver.backend().name());
    println!("{solver}");

    prof.tic("solve");
    let result = solver.solve_host(&f);
    prof.toc("solve");
    let (x, stats) = result?;

    println!("Iterations: {}", stats.iterations);
    println!("Error:      {:.6e}", relative_residual(&a, &x, &f));
    println!("Converged:  {}", stats.converged);
    println!();
    println!("{prof}");
    Ok(())
}

fn main() -> Result<(), KError> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .with_target(false)
        .init();

    let prm = params(&cli)?;
    dispatch(&cli, &prm)
}

#[cfg(feature = "rayon")]
fn dispatch(cli: &Cli, prm: &ParamStore) -> Result<(), KError> {
    use krylov_amg::backend::{RayonBackend, RayonParams};

    if cli.serial {
        run(HostBackend::<f64>::new(), cli, prm)
    } else {
        run(RayonBackend::<f64>::new(RayonParams::default())?, cli, prm)
    }
}

#[cfg(not(feature = "rayon"))]
fn dispatch(cli: &Cli, prm: &ParamStore) -> Result<(), KError> {
    run(HostBackend::<f64>::new(), cli, prm)
}
