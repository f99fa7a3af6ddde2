//! Utilities: convergence checks, timing hooks and model problems.

pub mod convergence;
pub mod profiler;
pub mod sample_problem;

pub use convergence::{Convergence, SolveStats};
pub use profiler::{NoopTimer, Profiler, TimingSink};
