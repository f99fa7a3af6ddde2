//! Preconditioner context: runtime selection of coarsening, relaxation and
//! preconditioner kind.
//!
//! Each factory is a closed dispatch table over the option enums of
//! [`crate::config::options`]. Option values are parsed before any
//! numerical work starts, so an unsupported name fails fast with
//! [`KError::Configuration`].
//!
//! # Example
//!
//! ```rust
//! use krylov_amg::config::{CoarseningKind, ParamStore, RelaxationKind};
//! use krylov_amg::context::PrecondKind;
//!
//! let prm = ParamStore::new().with("precond.coarsening.type", "ruge_stuben");
//! let kind = PrecondKind::from_params(&prm).unwrap();
//! assert_eq!(
//!     kind,
//!     PrecondKind::Amg { coarsening: CoarseningKind::RugeStuben, relaxation: RelaxationKind::Spai0 }
//! );
//! ```

use crate::backend::Backend;
use crate::coarsening::{
    Aggregation, AggregationParams, Coarsening, RugeStuben, RugeStubenParams, SmoothedAggrEmin,
    SmoothedAggrEminParams, SmoothedAggregation, SmoothedAggregationParams,
};
use crate::config::{CoarseningKind, ParamStore, RelaxationKind};
use crate::core::traits::Scalar;
use crate::error::KError;
use crate::matrix::CsrMatrix;
use crate::preconditioner::{
    Amg, AmgParams, Chebyshev, ChebyshevParams, DampedJacobi, DampedJacobiParams, ParallelIlu0,
    ParallelIlu0Params, Preconditioner, Relaxation, RelaxationPreconditioner, Spai0,
};
use crate::utils::TimingSink;
use std::fmt;

/// Which preconditioner to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrecondKind {
    /// Algebraic multigrid with the given policies.
    Amg { coarsening: CoarseningKind, relaxation: RelaxationKind },
    /// A single smoother, no hierarchy.
    Relaxation(RelaxationKind),
}

impl Default for PrecondKind {
    fn default() -> Self {
        PrecondKind::Amg { coarsening: CoarseningKind::default(), relaxation: RelaxationKind::default() }
    }
}

impl PrecondKind {
    /// Read `precond.type`, `precond.coarsening.type` and `precond.relax.type`.
    ///
    /// `precond.type` is `amg`, `relaxation`, or the name of a relaxation,
    /// which selects that smoother without a hierarchy.
    pub fn from_params(prm: &ParamStore) -> Result<Self, KError> {
        let relaxation = prm.get_or("precond.relax.type", RelaxationKind::default())?;
        match prm.get_str("precond.type").map(str::trim) {
            None | Some("amg") => Ok(PrecondKind::Amg {
                coarsening: prm.get_or("precond.coarsening.type", CoarseningKind::default())?,
                relaxation,
            }),
            Some("relaxation") => Ok(PrecondKind::Relaxation(relaxation)),
            Some(other) => match other.parse::<RelaxationKind>() {
                Ok(kind) => Ok(PrecondKind::Relaxation(kind)),
                Err(_) => Err(KError::unsupported("preconditioner", other)),
            },
        }
    }

    pub fn relaxation(&self) -> RelaxationKind {
        match *self {
            PrecondKind::Amg { relaxation, .. } | PrecondKind::Relaxation(relaxation) => relaxation,
        }
    }
}

impl fmt::Display for PrecondKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrecondKind::Amg { coarsening, relaxation } => write!(f, "amg ({coarsening}, {relaxation})"),
            PrecondKind::Relaxation(r) => write!(f, "relaxation ({r})"),
        }
    }
}

/// Coarsening policy for `kind`, configured from a `precond.coarsening` subtree.
pub fn make_coarsening<T: Scalar>(kind: CoarseningKind, prm: &ParamStore) -> Result<Box<dyn Coarsening<T>>, KError> {
    Ok(match kind {
        CoarseningKind::RugeStuben => Box::new(RugeStuben::new(RugeStubenParams::from_params(prm)?)),
        CoarseningKind::Aggregation => Box::new(Aggregation::new(AggregationParams::from_params(prm)?)),
        CoarseningKind::SmoothedAggregation => {
            Box::new(SmoothedAggregation::new(SmoothedAggregationParams::from_params(prm)?))
        }
        CoarseningKind::SmoothedAggrEmin => {
            Box::new(SmoothedAggrEmin::new(SmoothedAggrEminParams::from_params(prm)?))
        }
    })
}

/// Typed relaxation parameters, parsed once and reused for every level.
#[derive(Debug, Clone)]
enum RelaxationConfig {
    ParallelIlu0(ParallelIlu0Params),
    DampedJacobi(DampedJacobiParams),
    Spai0,
    Chebyshev(ChebyshevParams),
}

impl RelaxationConfig {
    fn from_params(kind: RelaxationKind, prm: &ParamStore) -> Result<Self, KError> {
        Ok(match kind {
            RelaxationKind::ParallelIlu0 => RelaxationConfig::ParallelIlu0(ParallelIlu0Params::from_params(prm)?),
            RelaxationKind::DampedJacobi => RelaxationConfig::DampedJacobi(DampedJacobiParams::from_params(prm)?),
            RelaxationKind::Spai0 => RelaxationConfig::Spai0,
            RelaxationKind::Chebyshev => RelaxationConfig::Chebyshev(ChebyshevParams::from_params(prm)?),
        })
    }

    fn build<B: Backend>(
        &self,
        bk: &B,
        a: &CsrMatrix<B::Value>,
        level: usize,
    ) -> Result<Box<dyn Relaxation<B>>, KError> {
        Ok(match self {
            RelaxationConfig::ParallelIlu0(p) => Box::new(ParallelIlu0::new(bk, a, p, level)?),
            RelaxationConfig::DampedJacobi(p) => Box::new(DampedJacobi::new(bk, a, p, level)?),
            RelaxationConfig::Spai0 => Box::new(Spai0::new(bk, a)),
            RelaxationConfig::Chebyshev(p) => Box::new(Chebyshev::new(bk, a, p, level)?),
        })
    }
}

/// Smoother of `kind` for the host operator `a` at hierarchy depth `level`,
/// configured from a `precond.relax` subtree.
pub fn make_relaxation<B: Backend>(
    bk: &B,
    kind: RelaxationKind,
    a: &CsrMatrix<B::Value>,
    prm: &ParamStore,
    level: usize,
) -> Result<Box<dyn Relaxation<B>>, KError> {
    RelaxationConfig::from_params(kind, prm)?.build(bk, a, level)
}

/// Build the preconditioner selected by `kind` for `a`.
///
/// `prm` is the full parameter store; the `precond` subtree is consulted.
pub fn make_preconditioner<B: Backend>(
    bk: &B,
    a: CsrMatrix<B::Value>,
    kind: PrecondKind,
    prm: &ParamStore,
    timer: &mut dyn TimingSink,
) -> Result<Box<dyn Preconditioner<B>>, KError> {
    let pprm = prm.subtree("precond");
    let relax = RelaxationConfig::from_params(kind.relaxation(), &pprm.subtree("relax"))?;
    match kind {
        PrecondKind::Amg { coarsening, .. } => {
            let params = AmgParams::from_params(&pprm)?;
            let policy = make_coarsening::<B::Value>(coarsening, &pprm.subtree("coarsening"))?;
            let amg = Amg::new(bk, a, policy.as_ref(), params, |op, level| relax.build(bk, op, level), timer)?;
            Ok(Box::new(amg))
        }
        PrecondKind::Relaxation(_) => {
            if !a.is_square() {
                return Err(KError::Structural(format!(
                    "system matrix must be square, got {}x{}",
                    a.nrows(),
                    a.ncols()
                )));
            }
            timer.tic("relaxation");
            let smoother = relax.build(bk, &a, 0);
            timer.toc("relaxation");
            let smoother = smoother?;
            timer.tic("move to backend");
            let pc = RelaxationPreconditioner::new(bk, &a, smoother);
            timer.toc("move to backend");
            Ok(Box::new(pc))
        }
    }
}
