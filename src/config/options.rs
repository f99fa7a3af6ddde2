//! Runtime-selectable algorithm components.
//!
//! Each enum names one family of interchangeable components. Values parse from
//! the lowercase identifiers used in parameter files and on the command line
//! (`smoothed_aggregation`, `spai0`, `bicgstab`, ...), and an unknown name is
//! reported as [`KError::Configuration`].

use crate::error::KError;
use std::fmt;
use std::str::FromStr;

/// Hierarchy coarsening strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoarseningKind {
    /// Classical C/F splitting with direct interpolation.
    RugeStuben,
    /// Plain (unsmoothed) aggregation.
    Aggregation,
    /// Smoothed aggregation with a damped Jacobi prolongation smoother.
    SmoothedAggregation,
    /// Smoothed aggregation with energy-minimizing column damping.
    SmoothedAggrEmin,
}

impl CoarseningKind {
    pub const ALL: [CoarseningKind; 4] = [
        CoarseningKind::RugeStuben,
        CoarseningKind::Aggregation,
        CoarseningKind::SmoothedAggregation,
        CoarseningKind::SmoothedAggrEmin,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CoarseningKind::RugeStuben => "ruge_stuben",
            CoarseningKind::Aggregation => "aggregation",
            CoarseningKind::SmoothedAggregation => "smoothed_aggregation",
            CoarseningKind::SmoothedAggrEmin => "smoothed_aggr_emin",
        }
    }
}

impl Default for CoarseningKind {
    fn default() -> Self {
        CoarseningKind::SmoothedAggregation
    }
}

impl FromStr for CoarseningKind {
    type Err = KError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "ruge_stuben" => Ok(CoarseningKind::RugeStuben),
            "aggregation" => Ok(CoarseningKind::Aggregation),
            "smoothed_aggregation" => Ok(CoarseningKind::SmoothedAggregation),
            "smoothed_aggr_emin" => Ok(CoarseningKind::SmoothedAggrEmin),
            other => Err(KError::unsupported("coarsening", other)),
        }
    }
}

impl fmt::Display for CoarseningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Smoother applied on every level (or alone in relaxation-only mode).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelaxationKind {
    /// ILU(0) whose triangular solves are approximated by Jacobi sweeps.
    ParallelIlu0,
    /// Damped Jacobi.
    DampedJacobi,
    /// Sparse approximate inverse with diagonal pattern.
    Spai0,
    /// Chebyshev polynomial smoother.
    Chebyshev,
}

impl RelaxationKind {
    pub const ALL: [RelaxationKind; 4] = [
        RelaxationKind::ParallelIlu0,
        RelaxationKind::DampedJacobi,
        RelaxationKind::Spai0,
        RelaxationKind::Chebyshev,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RelaxationKind::ParallelIlu0 => "parallel_ilu0",
            RelaxationKind::DampedJacobi => "damped_jacobi",
            RelaxationKind::Spai0 => "spai0",
            RelaxationKind::Chebyshev => "chebyshev",
        }
    }
}

impl Default for RelaxationKind {
    fn default() -> Self {
        RelaxationKind::Spai0
    }
}

impl FromStr for RelaxationKind {
    type Err = KError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "parallel_ilu0" | "ilu0" => Ok(RelaxationKind::ParallelIlu0),
            "damped_jacobi" => Ok(RelaxationKind::DampedJacobi),
            "spai0" => Ok(RelaxationKind::Spai0),
            "chebyshev" => Ok(RelaxationKind::Chebyshev),
            other => Err(KError::unsupported("relaxation", other)),
        }
    }
}

impl fmt::Display for RelaxationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outer Krylov method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SolverKind {
    /// Preconditioned conjugate gradient (SPD systems).
    Cg,
    /// BiCGStab.
    BiCgStab,
    /// BiCGStab(ℓ).
    BiCgStabL,
    /// Restarted GMRES(m).
    Gmres,
}

impl SolverKind {
    pub const ALL: [SolverKind; 4] =
        [SolverKind::Cg, SolverKind::BiCgStab, SolverKind::BiCgStabL, SolverKind::Gmres];

    pub fn as_str(self) -> &'static str {
        match self {
            SolverKind::Cg => "cg",
            SolverKind::BiCgStab => "bicgstab",
            SolverKind::BiCgStabL => "bicgstabl",
            SolverKind::Gmres => "gmres",
        }
    }
}

impl Default for SolverKind {
    fn default() -> Self {
        SolverKind::BiCgStab
    }
}

impl FromStr for SolverKind {
    type Err = KError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "cg" => Ok(SolverKind::Cg),
            "bicgstab" => Ok(SolverKind::BiCgStab),
            "bicgstabl" => Ok(SolverKind::BiCgStabL),
            "gmres" => Ok(SolverKind::Gmres),
            other => Err(KError::unsupported("solver", other)),
        }
    }
}

impl fmt::Display for SolverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for k in CoarseningKind::ALL {
            assert_eq!(k.as_str().parse::<CoarseningKind>().unwrap(), k);
        }
        for k in RelaxationKind::ALL {
            assert_eq!(k.to_string().parse::<RelaxationKind>().unwrap(), k);
        }
        for k in SolverKind::ALL {
            assert_eq!(k.to_string().parse::<SolverKind>().unwrap(), k);
        }
    }

    #[test]
    fn ilu0_alias() {
        assert_eq!("ilu0".parse::<RelaxationKind>().unwrap(), RelaxationKind::ParallelIlu0);
    }

    #[test]
    fn unknown_names_are_rejected() {
        let err = "multigrid".parse::<SolverKind>().unwrap_err();
        assert!(matches!(err, KError::Configuration(ref m) if m.contains("multigrid")));
        assert!("gauss_seidel".parse::<RelaxationKind>().is_err());
        assert!("geometric".parse::<CoarseningKind>().is_err());
    }
}
