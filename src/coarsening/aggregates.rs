//! Strength-of-connection graph and plain aggregation.
//!
//! A connection `i -> j` is strong when `a_ij² > ε² |a_ii a_jj|`. Unknowns
//! without any strong connection are left out of every aggregate: their rows
//! of the tentative prolongation are empty and the smoother alone handles
//! them.

use crate::core::traits::Scalar;
use crate::matrix::CsrMatrix;

/// Partition of the fine unknowns into aggregates.
#[derive(Debug, Clone)]
pub struct Aggregates {
    /// Number of aggregates (coarse unknowns).
    pub count: usize,
    /// Aggregate of every fine unknown; `None` for unknowns left out.
    pub id: Vec<Option<usize>>,
    /// Strong-connection flag for every stored entry of the operator.
    pub strong: Vec<bool>,
}

/// Flag strong off-diagonal entries, in storage order.
pub fn strong_connections<T: Scalar>(a: &CsrMatrix<T>, eps_strong: T) -> Vec<bool> {
    let dia = a.diagonal();
    let eps2 = eps_strong * eps_strong;
    let mut strong = vec![false; a.nnz()];
    for i in 0..a.nrows() {
        let start = a.row_ptr()[i];
        let (cols, vals) = a.row(i);
        for (k, (&j, &v)) in cols.iter().zip(vals).enumerate() {
            strong[start + k] = j != i && !v.is_zero() && v * v > eps2 * (dia[i] * dia[j]).abs();
        }
    }
    strong
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum State {
    Undecided,
    Removed,
    Aggregate(usize),
}

impl Aggregates {
    /// Greedy plain aggregation.
    ///
    /// 1. A node whose strong neighbours are all still free becomes a root and
    ///    takes every free strong neighbour.
    /// 2. Leftover nodes join the aggregate of their strongest pass-1
    ///    neighbour.
    /// 3. Anything still unassigned starts its own aggregate.
    pub fn plain<T: Scalar>(a: &CsrMatrix<T>, eps_strong: T) -> Self {
        let n = a.nrows();
        let strong = strong_connections(a, eps_strong);
        let flags = &strong;
        let strong_row = |i: usize| {
            let start = a.row_ptr()[i];
            let (cols, vals) = a.row(i);
            cols.iter()
                .zip(vals)
                .enumerate()
                .filter(move |&(k, _)| flags[start + k])
                .map(|(_, (&j, &v))| (j, v))
        };

        let mut state: Vec<State> = (0..n)
            .map(|i| if strong_row(i).next().is_none() { State::Removed } else { State::Undecided })
            .collect();
        let mut count = 0;

        for i in 0..n {
            if state[i] != State::Undecided {
                continue;
            }
            if strong_row(i).any(|(j, _)| matches!(state[j], State::Aggregate(_))) {
                continue;
            }
            state[i] = State::Aggregate(count);
            for (j, _) in strong_row(i) {
                if state[j] == State::Undecided {
                    state[j] = State::Aggregate(count);
                }
            }
            count += 1;
        }

        let first_pass = state.clone();
        for i in 0..n {
            if state[i] != State::Undecided {
                continue;
            }
            let mut best: Option<(usize, T)> = None;
            for (j, v) in strong_row(i) {
                if let State::Aggregate(id) = first_pass[j] {
                    if best.is_none_or(|(_, w)| v.abs() > w) {
                        best = Some((id, v.abs()));
                    }
                }
            }
            if let Some((id, _)) = best {
                state[i] = State::Aggregate(id);
            }
        }

        for i in 0..n {
            if state[i] != State::Undecided {
                continue;
            }
            state[i] = State::Aggregate(count);
            for (j, _) in strong_row(i) {
                if state[j] == State::Undecided {
                    state[j] = State::Aggregate(count);
                }
            }
            count += 1;
        }

        let id = state
            .into_iter()
            .map(|s| match s {
                State::Aggregate(id) => Some(id),
                _ => None,
            })
            .collect();
        Self { count, id, strong }
    }

    /// Piecewise-constant tentative prolongation, `n × count`.
    pub fn tentative_prolongation<T: Scalar>(&self) -> CsrMatrix<T> {
        let n = self.id.len();
        let mut ptr = Vec::with_capacity(n + 1);
        let mut col = Vec::with_capacity(n);
        ptr.push(0);
        for id in &self.id {
            if let Some(c) = id {
                col.push(*c);
            }
            ptr.push(col.len());
        }
        let val = vec![T::one(); col.len()];
        CsrMatrix::from_sorted_parts(n, self.count, ptr, col, val)
    }
}
