// Algebraic multigrid preconditioner for krylov-amg
//
// Holds the backend-resident hierarchy and applies V-cycles (W-cycles with
// ncycle = 2). All buffers used by a cycle are allocated per call, so a
// built `Amg` is immutable and can be shared between concurrent solves.

use crate::backend::Backend;
use crate::coarsening::Coarsening;
use crate::config::{CoarseningKind, ParamStore, RelaxationKind};
use crate::error::KError;
use crate::matrix::CsrMatrix;
use crate::preconditioner::hierarchy::{HierarchyParams, build_levels};
use crate::preconditioner::{Preconditioner, Relaxation};
use crate::utils::TimingSink;
use num_traits::{One, Zero};
use std::fmt;
use tracing::info;

#[derive(Debug, Clone, PartialEq)]
pub struct AmgParams {
    pub hierarchy: HierarchyParams,
    /// Pre-smoothing sweeps.
    pub npre: usize,
    /// Post-smoothing sweeps.
    pub npost: usize,
    /// Recursive calls per level: 1 is a V-cycle, 2 a W-cycle.
    pub ncycle: usize,
    /// Cycles per preconditioner application; 0 makes the preconditioner the identity.
    pub pre_cycles: usize,
}

impl Default for AmgParams {
    fn default() -> Self {
        Self { hierarchy: HierarchyParams::default(), npre: 1, npost: 1, ncycle: 1, pre_cycles: 1 }
    }
}

impl AmgParams {
    /// Read from a `precond` subtree.
    pub fn from_params(prm: &ParamStore) -> Result<Self, KError> {
        let d = Self::default();
        Ok(Self {
            hierarchy: HierarchyParams::from_params(prm)?,
            npre: prm.get_or("npre", d.npre)?,
            npost: prm.get_or("npost", d.npost)?,
            ncycle: prm.get_or("ncycle", d.ncycle)?,
            pre_cycles: prm.get_or("pre_cycles", d.pre_cycles)?,
        })
    }
}

struct Level<B: Backend> {
    a: B::Matrix,
    /// Prolongation and restriction towards the next level; `None` on the coarsest.
    transfer: Option<(B::Matrix, B::Matrix)>,
    relax: Box<dyn Relaxation<B>>,
    rows: usize,
    nnz: usize,
}

/// Scratch vectors of one level: `t` has the level's size, `f`/`u` the size
/// of the next coarser level.
struct Buffers<V> {
    t: V,
    f: V,
    u: V,
}

pub struct Amg<B: Backend> {
    levels: Vec<Level<B>>,
    params: AmgParams,
    coarsening: CoarseningKind,
    relaxation: RelaxationKind,
}

impl<B: Backend> Amg<B> {
    /// Build the hierarchy of `a` and move it to the backend.
    ///
    /// `make_relax` creates the smoother of a level given its host operator
    /// and depth.
    pub fn new<F>(
        bk: &B,
        a: CsrMatrix<B::Value>,
        coarsening: &dyn Coarsening<B::Value>,
        params: AmgParams,
        mut make_relax: F,
        timer: &mut dyn TimingSink,
    ) -> Result<Self, KError>
    where
        F: FnMut(&CsrMatrix<B::Value>, usize) -> Result<Box<dyn Relaxation<B>>, KError>,
    {
        let host_levels = build_levels(a, coarsening, &params.hierarchy, timer)?;

        let mut levels = Vec::with_capacity(host_levels.len());
        for (depth, lvl) in host_levels.into_iter().enumerate() {
            timer.tic("relaxation");
            let relax = make_relax(&lvl.a, depth);
            timer.toc("relaxation");
            let relax = relax?;

            timer.tic("move to backend");
            let level = Level {
                a: bk.copy_matrix(&lvl.a),
                transfer: lvl.transfer.map(|t| (bk.copy_matrix(&t.p), bk.copy_matrix(&t.r))),
                relax,
                rows: lvl.a.nrows(),
                nnz: lvl.a.nnz(),
            };
            timer.toc("move to backend");
            levels.push(level);
        }

        let relaxation = levels[0].relax.kind();
        let amg = Self { levels, params, coarsening: coarsening.kind(), relaxation };
        info!(
            levels = amg.levels.len(),
            operator_complexity = amg.operator_complexity(),
            coarsening = %amg.coarsening,
            relaxation = %amg.relaxation,
            "amg hierarchy ready"
        );
        Ok(amg)
    }

    /// Total nonzeros of all levels relative to the finest level.
    pub fn operator_complexity(&self) -> f64 {
        let total: usize = self.levels.iter().map(|l| l.nnz).sum();
        total as f64 / self.levels[0].nnz.max(1) as f64
    }

    /// Total unknowns of all levels relative to the finest level.
    pub fn grid_complexity(&self) -> f64 {
        let total: usize = self.levels.iter().map(|l| l.rows).sum();
        total as f64 / self.levels[0].rows.max(1) as f64
    }

    /// `(rows, nnz)` of every level, finest first.
    pub fn level_sizes(&self) -> Vec<(usize, usize)> {
        self.levels.iter().map(|l| (l.rows, l.nnz)).collect()
    }

    fn buffers(&self, bk: &B) -> Vec<Buffers<B::Vector>> {
        self.levels
            .iter()
            .enumerate()
            .map(|(i, l)| {
                let nc = self.levels.get(i + 1).map_or(0, |c| c.rows);
                Buffers { t: bk.create_vector(l.rows), f: bk.create_vector(nc), u: bk.create_vector(nc) }
            })
            .collect()
    }

    fn cycle(
        &self,
        bk: &B,
        levels: &[Level<B>],
        bufs: &mut [Buffers<B::Vector>],
        rhs: &B::Vector,
        x: &mut B::Vector,
    ) {
        let (Some((level, coarser)), Some((here, below))) = (levels.split_first(), bufs.split_first_mut()) else {
            return;
        };
        let Buffers { t, f, u } = here;

        let Some((p, r)) = &level.transfer else {
            for _ in 0..self.params.npre {
                level.relax.apply_pre(bk, &level.a, rhs, x, t);
            }
            for _ in 0..self.params.npost {
                level.relax.apply_post(bk, &level.a, rhs, x, t);
            }
            return;
        };

        let one = B::Value::one();
        let zero = B::Value::zero();
        for _ in 0..self.params.ncycle.max(1) {
            for _ in 0..self.params.npre {
                level.relax.apply_pre(bk, &level.a, rhs, x, t);
            }
            bk.residual(rhs, &level.a, x, t);
            bk.spmv(one, r, t, zero, f);
            bk.clear(u);
            self.cycle(bk, coarser, below, f, u);
            bk.spmv(one, p, u, one, x);
            for _ in 0..self.params.npost {
                level.relax.apply_post(bk, &level.a, rhs, x, t);
            }
        }
    }
}

impl<B: Backend> Preconditioner<B> for Amg<B> {
    fn apply(&self, bk: &B, rhs: &B::Vector, x: &mut B::Vector) -> Result<(), KError> {
        if self.params.pre_cycles == 0 {
            bk.copy(rhs, x);
            return Ok(());
        }
        let mut bufs = self.buffers(bk);
        bk.clear(x);
        for _ in 0..self.params.pre_cycles {
            self.cycle(bk, &self.levels, &mut bufs, rhs, x);
        }
        Ok(())
    }

    fn system_matrix(&self) -> &B::Matrix {
        &self.levels[0].a
    }

    fn levels(&self) -> usize {
        self.levels.len()
    }

    fn rows(&self) -> usize {
        self.levels[0].rows
    }
}

impl<B: Backend> fmt::Display for Amg<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total_nnz: usize = self.levels.iter().map(|l| l.nnz).sum();
        writeln!(f, "Number of levels:    {}", self.levels.len())?;
        writeln!(f, "Operator complexity: {:.2}", self.operator_complexity())?;
        writeln!(f, "Grid complexity:     {:.2}", self.grid_complexity())?;
        writeln!(f, "Coarsening:          {}", self.coarsening)?;
        writeln!(f, "Relaxation:          {}", self.relaxation)?;
        writeln!(f)?;
        writeln!(f, "level     unknowns       nonzeros")?;
        writeln!(f, "---------------------------------")?;
        for (i, l) in self.levels.iter().enumerate() {
            let share = 100.0 * l.nnz as f64 / total_nnz.max(1) as f64;
            writeln!(f, "{i:>5} {:>12} {:>14} ({share:5.2}%)", l.rows, l.nnz)?;
        }
        Ok(())
    }
}
