//! Classical Ruge–Stüben coarsening.
//!
//! Strength: `j` strongly influences `i` when `−a_ij ≥ ε · max_k(−a_ik)`.
//! The C/F splitting picks, greedily, the undecided point that strongly
//! influences the most others, then a second pass promotes F points so that
//! every pair of strongly connected F points shares a C point. Rows without
//! strong influences (Dirichlet rows, for one) are F points with an empty
//! interpolation row. Interpolation is direct: an F point interpolates from
//! its strong C neighbours. Negative and positive couplings are scaled
//! separately; positive couplings with no strong C counterpart are lumped
//! into the diagonal.

use super::{Coarsening, TransferOperators};
use crate::config::{CoarseningKind, ParamStore};
use crate::core::traits::{Scalar, cast};
use crate::error::KError;
use crate::matrix::CsrMatrix;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct RugeStubenParams {
    pub eps_strong: f64,
}

impl Default for RugeStubenParams {
    fn default() -> Self {
        Self { eps_strong: 0.25 }
    }
}

impl RugeStubenParams {
    pub fn from_params(prm: &ParamStore) -> Result<Self, KError> {
        Ok(Self { eps_strong: prm.get_or("eps_strong", Self::default().eps_strong)? })
    }
}

#[derive(Debug, Clone, Default)]
pub struct RugeStuben {
    pub params: RugeStubenParams,
}

impl RugeStuben {
    pub fn new(params: RugeStubenParams) -> Self {
        Self { params }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Point {
    Undecided,
    Coarse,
    Fine,
}

/// Strong influences of every row, as adjacency lists.
pub(crate) fn strength<T: Scalar>(a: &CsrMatrix<T>, eps: T) -> Vec<Vec<usize>> {
    (0..a.nrows())
        .map(|i| {
            let (cols, vals) = a.row(i);
            let amax = cols
                .iter()
                .zip(vals)
                .filter(|&(&j, _)| j != i)
                .fold(T::zero(), |m, (_, &v)| m.max(-v));
            if amax <= T::zero() {
                return Vec::new();
            }
            cols.iter()
                .zip(vals)
                .filter(|&(&j, &v)| j != i && -v >= eps * amax)
                .map(|(&j, _)| j)
                .collect()
        })
        .collect()
}

/// Greedy C/F splitting followed by the F–F consistency pass.
pub(crate) fn cf_split(s: &[Vec<usize>]) -> Vec<Point> {
    let n = s.len();
    // st[j]: points that j strongly influences.
    let mut st = vec![Vec::new(); n];
    for (i, row) in s.iter().enumerate() {
        for &j in row {
            st[j].push(i);
        }
    }

    let mut lambda: Vec<usize> = st.iter().map(Vec::len).collect();
    let mut cf: Vec<Point> =
        s.iter().map(|row| if row.is_empty() { Point::Fine } else { Point::Undecided }).collect();
    let mut heap: BinaryHeap<(usize, Reverse<usize>)> =
        (0..n).map(|i| (lambda[i], Reverse(i))).collect();

    while let Some((l, Reverse(i))) = heap.pop() {
        if cf[i] != Point::Undecided || l != lambda[i] {
            continue;
        }
        if l == 0 {
            let has_c = s[i].iter().any(|&j| cf[j] == Point::Coarse);
            cf[i] = if s[i].is_empty() || has_c { Point::Fine } else { Point::Coarse };
            continue;
        }
        cf[i] = Point::Coarse;
        for &j in &st[i] {
            if cf[j] != Point::Undecided {
                continue;
            }
            cf[j] = Point::Fine;
            for &k in &s[j] {
                if cf[k] == Point::Undecided {
                    lambda[k] += 1;
                    heap.push((lambda[k], Reverse(k)));
                }
            }
        }
        for &k in &s[i] {
            if cf[k] == Point::Undecided && lambda[k] > 0 {
                lambda[k] -= 1;
                heap.push((lambda[k], Reverse(k)));
            }
        }
    }

    for i in 0..n {
        if cf[i] != Point::Fine {
            continue;
        }
        for &j in &s[i] {
            if cf[j] != Point::Fine || s[j].is_empty() {
                continue;
            }
            let shares_c = s[i].iter().any(|&k| cf[k] == Point::Coarse && s[j].contains(&k));
            if !shares_c {
                cf[j] = Point::Coarse;
            }
        }
    }
    cf
}

impl<T: Scalar> Coarsening<T> for RugeStuben {
    fn kind(&self) -> CoarseningKind {
        CoarseningKind::RugeStuben
    }

    fn transfer_operators(&self, a: &CsrMatrix<T>, level: usize) -> Result<TransferOperators<T>, KError> {
        let n = a.nrows();
        let s = strength(a, cast::<T>(self.params.eps_strong));
        let cf = cf_split(&s);

        let mut cidx = vec![usize::MAX; n];
        let mut nc = 0;
        for (i, p) in cf.iter().enumerate() {
            if *p == Point::Coarse {
                cidx[i] = nc;
                nc += 1;
            }
        }
        debug!(level, coarse = nc, fine = n - nc, "ruge-stuben splitting");

        let mut ptr = Vec::with_capacity(n + 1);
        let mut col = Vec::new();
        let mut val = Vec::new();
        ptr.push(0);
        let mut is_strong = vec![false; n];
        for i in 0..n {
            if cf[i] == Point::Coarse {
                col.push(cidx[i]);
                val.push(T::one());
                ptr.push(col.len());
                continue;
            }
            for &j in &s[i] {
                is_strong[j] = true;
            }

            let (cols, vals) = a.row(i);
            let mut dia = T::zero();
            let (mut a_num, mut a_den) = (T::zero(), T::zero());
            let (mut b_num, mut b_den) = (T::zero(), T::zero());
            for (&j, &v) in cols.iter().zip(vals) {
                if j == i {
                    dia += v;
                    continue;
                }
                let strong_c = is_strong[j] && cf[j] == Point::Coarse;
                if v < T::zero() {
                    a_num += v;
                    if strong_c {
                        a_den += v;
                    }
                } else {
                    b_num += v;
                    if strong_c {
                        b_den += v;
                    }
                }
            }
            if b_den.is_zero() {
                dia += b_num;
            }

            if !dia.is_zero() {
                let alpha = if a_den.is_zero() { T::zero() } else { -a_num / (dia * a_den) };
                let beta = if b_den.is_zero() { T::zero() } else { -b_num / (dia * b_den) };
                let mut row: Vec<(usize, T)> = cols
                    .iter()
                    .zip(vals)
                    .filter(|&(&j, &v)| j != i && !v.is_zero() && is_strong[j] && cf[j] == Point::Coarse)
                    .map(|(&j, &v)| (cidx[j], if v < T::zero() { alpha * v } else { beta * v }))
                    .filter(|&(_, w)| !w.is_zero())
                    .collect();
                row.sort_unstable_by_key(|&(c, _)| c);
                for (c, w) in row {
                    col.push(c);
                    val.push(w);
                }
            }
            for &j in &s[i] {
                is_strong[j] = false;
            }
            ptr.push(col.len());
        }

        let p = CsrMatrix::from_sorted_parts(n, nc, ptr, col, val);
        let r = p.transpose()?;
        Ok(TransferOperators { p, r })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::sample_problem::{laplace2d, poisson2d_dirichlet};
    use approx::assert_abs_diff_eq;

    #[test]
    fn one_dimensional_splitting_alternates() {
        let n = 9;
        let mut t = Vec::new();
        for i in 0..n {
            t.push((i, i, 2.0));
            if i + 1 < n {
                t.push((i, i + 1, -1.0));
                t.push((i + 1, i, -1.0));
            }
        }
        let a = CsrMatrix::<f64>::from_triplets(n, n, &t).unwrap();
        let cf = cf_split(&strength(&a, 0.25));
        for i in 0..n - 1 {
            // no two neighbouring F points
            assert!(!(cf[i] == Point::Fine && cf[i + 1] == Point::Fine));
        }
        assert!(cf.iter().any(|&p| p == Point::Fine));
    }

    #[test]
    fn interpolation_reproduces_constants_in_the_interior() {
        let m = 10;
        let (a, _) = laplace2d::<f64>(m);
        let c = RugeStuben::default();
        let ops = Coarsening::<f64>::transfer_operators(&c, &a, 0).unwrap();
        assert!(ops.coarse_size() < a.nrows());
        let ones = vec![1.0; ops.coarse_size()];
        let mut y = vec![0.0; a.nrows()];
        ops.p.spmv(&ones, &mut y);
        for i in 1..m - 1 {
            for j in 1..m - 1 {
                assert_abs_diff_eq!(y[i * m + j], 1.0, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn isolated_points_are_fine() {
        let cf = cf_split(&strength(&CsrMatrix::<f64>::identity(3), 0.25));
        assert!(cf.iter().all(|&p| p == Point::Fine));
    }

    #[test]
    fn dirichlet_rows_stay_off_the_coarse_grid() {
        let m = 12;
        let (a, _) = poisson2d_dirichlet::<f64>(m);
        let c = RugeStuben::default();
        let ops = Coarsening::<f64>::transfer_operators(&c, &a, 0).unwrap();
        let cf = cf_split(&strength(&a, 0.25));
        for i in 0..m {
            for j in 0..m {
                let k = i * m + j;
                if i == 0 || j == 0 || i + 1 == m || j + 1 == m {
                    assert_eq!(cf[k], Point::Fine, "boundary point {k} is coarse");
                    assert!(ops.p.row(k).0.is_empty());
                }
            }
        }
        // interior rows next to the boundary still interpolate
        assert!(!ops.p.row(m + 1).0.is_empty());
    }

    #[test]
    fn positive_couplings_are_lumped_into_the_diagonal() {
        // row 1 couples strongly to 0 and positively to the isolated row 2
        let t = [
            (0, 0, 2.0),
            (0, 1, -1.0),
            (1, 0, -1.0),
            (1, 1, 2.5),
            (1, 2, 0.5),
            (2, 2, 1.0),
        ];
        let a = CsrMatrix::<f64>::from_triplets(3, 3, &t).unwrap();
        let c = RugeStuben::default();
        let ops = Coarsening::<f64>::transfer_operators(&c, &a, 0).unwrap();
        let cf = cf_split(&strength(&a, 0.25));
        assert_eq!(cf, vec![Point::Coarse, Point::Fine, Point::Fine]);
        // w = −a_10 / (a_11 + a_12)
        assert_eq!(ops.p.row(1).0, &[0]);
        assert_abs_diff_eq!(ops.p.row(1).1[0], 1.0 / 3.0, epsilon = 1e-14);
    }
}
