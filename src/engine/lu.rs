//! Final L/U storage, assembled from BuildSimple, BuildKernel and
//! RankDeficiency results into a single pair of triangular factors indexed
//! directly by pivot order — `B = P^T L U Q^T` where `P`/`Q` are named by
//! `pivot_row`/`pivot_col`.
//!
//! Both L and U are stored column-major by pivot order, with row positions
//! already translated to pivot order too (so the triangular solves in
//! [`crate::engine::solve`] never need to consult a permutation mid-loop).

use crate::engine::build_kernel::KernelResult;
use crate::engine::build_simple::SimpleResult;
use crate::engine::rank_deficiency::RankDeficiencyReport;

#[derive(Debug, Clone)]
pub(crate) struct LuFactors {
    pub n: usize,

    /// Unit lower-triangular, column-major by pivot order. `l_index` entries
    /// are themselves pivot-order row positions, always `> ` the column's
    /// own pivot order.
    pub l_start: Vec<usize>,
    pub l_index: Vec<usize>,
    pub l_value: Vec<f64>,

    /// Upper-triangular off-diagonal entries, column-major by pivot order.
    /// `u_index` entries are pivot-order row positions `< ` the column's own
    /// pivot order; the diagonal itself lives in `u_diag`.
    pub u_start: Vec<usize>,
    pub u_index: Vec<usize>,
    pub u_value: Vec<f64>,
    pub u_diag: Vec<f64>,

    /// `pivot_row[k]` / `pivot_col[k]`: the original row / basis slot chosen
    /// at pivot order `k`.
    pub pivot_row: Vec<usize>,
    pub pivot_col: Vec<usize>,
    /// Inverse maps: original row / basis slot back to pivot order.
    pub row_to_pivot: Vec<usize>,
    pub col_to_pivot: Vec<usize>,

    pub rank_deficiency: usize,
}

impl LuFactors {
    pub fn l_column(&self, k: usize) -> (&[usize], &[f64]) {
        (&self.l_index[self.l_start[k]..self.l_start[k + 1]], &self.l_value[self.l_start[k]..self.l_start[k + 1]])
    }

    pub fn u_column(&self, k: usize) -> (&[usize], &[f64]) {
        (&self.u_index[self.u_start[k]..self.u_start[k + 1]], &self.u_value[self.u_start[k]..self.u_start[k + 1]])
    }

    pub fn nnz_l(&self) -> usize {
        self.l_index.len()
    }

    pub fn nnz_u(&self) -> usize {
        self.u_index.len() + self.u_diag.len()
    }

    /// A short textual dump of the factor shape, in the same spirit as a
    /// solver's "print the matrix" debug aid: column counts and fill, not a
    /// full value listing unless `full` is requested.
    pub fn report(&self, full: bool) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "LU factors: n={}, nnz(L)={}, nnz(U)={}, rank_deficiency={}\n",
            self.n,
            self.nnz_l(),
            self.nnz_u(),
            self.rank_deficiency
        ));
        if full {
            for k in 0..self.n {
                let (l_rows, _) = self.l_column(k);
                let (u_rows, _) = self.u_column(k);
                out.push_str(&format!(
                    "  k={k} row={} col={} diag={:.6e} l_nnz={} u_nnz={}\n",
                    self.pivot_row[k],
                    self.pivot_col[k],
                    self.u_diag[k],
                    l_rows.len(),
                    u_rows.len()
                ));
            }
        }
        out
    }
}

/// Flatten per-pivot-order column lists into the CSC arrays `LuFactors`
/// stores. Shared by the from-scratch assembly below and by refactor replay.
pub(crate) fn from_pivot_columns(
    n: usize,
    pivot_row: Vec<usize>,
    pivot_col: Vec<usize>,
    row_to_pivot: Vec<usize>,
    col_to_pivot: Vec<usize>,
    u_diag: Vec<f64>,
    l_cols: Vec<Vec<(usize, f64)>>,
    u_cols: Vec<Vec<(usize, f64)>>,
    rank_deficiency: usize,
) -> LuFactors {
    let mut l_start = vec![0usize; n + 1];
    let mut l_index = Vec::new();
    let mut l_value = Vec::new();
    for (k, col) in l_cols.iter().enumerate() {
        l_start[k] = l_index.len();
        for &(row, val) in col {
            l_index.push(row);
            l_value.push(val);
        }
    }
    l_start[n] = l_index.len();

    let mut u_start = vec![0usize; n + 1];
    let mut u_index = Vec::new();
    let mut u_value = Vec::new();
    for (k, col) in u_cols.iter().enumerate() {
        u_start[k] = u_index.len();
        for &(row, val) in col {
            u_index.push(row);
            u_value.push(val);
        }
    }
    u_start[n] = u_index.len();

    LuFactors {
        n,
        l_start,
        l_index,
        l_value,
        u_start,
        u_index,
        u_value,
        u_diag,
        pivot_row,
        pivot_col,
        row_to_pivot,
        col_to_pivot,
        rank_deficiency,
    }
}

pub(crate) fn assemble(
    n: usize,
    simple: SimpleResult,
    kernel: KernelResult,
    rank: RankDeficiencyReport,
) -> LuFactors {
    let remaining_rows = simple.remaining_rows.clone();
    let remaining_cols = simple.remaining_cols.clone();

    let simple_n = simple.pivots.len();
    let kernel_n = kernel.pivots.len();

    let mut row_to_pivot = vec![usize::MAX; n];
    let mut col_to_pivot = vec![usize::MAX; n];

    for (k, p) in simple.pivots.iter().enumerate() {
        row_to_pivot[p.row] = k;
        col_to_pivot[p.basis_slot] = k;
    }
    for (local_k, p) in kernel.pivots.iter().enumerate() {
        let k = simple_n + local_k;
        row_to_pivot[remaining_rows[p.local_row]] = k;
        col_to_pivot[remaining_cols[p.local_col]] = k;
    }
    for (local_k, sub) in rank.substitutions.iter().enumerate() {
        let k = simple_n + kernel_n + local_k;
        row_to_pivot[remaining_rows[sub.local_row]] = k;
        col_to_pivot[remaining_cols[sub.local_col]] = k;
    }

    let mut pivot_row = vec![0usize; n];
    let mut pivot_col = vec![0usize; n];
    let mut u_diag = vec![0.0f64; n];
    let mut l_cols: Vec<Vec<(usize, f64)>> = vec![Vec::new(); n];
    let mut u_cols: Vec<Vec<(usize, f64)>> = vec![Vec::new(); n];

    for (k, p) in simple.pivots.iter().enumerate() {
        pivot_row[k] = p.row;
        pivot_col[k] = p.basis_slot;
        u_diag[k] = p.pivot_value;
        l_cols[k] = p.l_entries.iter().map(|&(row, v)| (row_to_pivot[row], v)).collect();
    }
    for (local_k, p) in kernel.pivots.iter().enumerate() {
        let k = simple_n + local_k;
        pivot_row[k] = remaining_rows[p.local_row];
        pivot_col[k] = remaining_cols[p.local_col];
        u_diag[k] = p.pivot_value;
        l_cols[k] = p
            .l_entries
            .iter()
            .map(|&(local_row, v)| (row_to_pivot[remaining_rows[local_row]], v))
            .collect();
    }
    for (local_k, sub) in rank.substitutions.iter().enumerate() {
        let k = simple_n + kernel_n + local_k;
        pivot_row[k] = remaining_rows[sub.local_row];
        pivot_col[k] = remaining_cols[sub.local_col];
        u_diag[k] = 1.0;
    }

    for (basis_slot, entries) in simple.u_off_diag.into_iter().enumerate() {
        let k = col_to_pivot[basis_slot];
        for (orig_row, value) in entries {
            u_cols[k].push((row_to_pivot[orig_row], value));
        }
    }
    for (local_col, entries) in kernel.u_off_diag.into_iter().enumerate() {
        let basis_slot = remaining_cols[local_col];
        let k = col_to_pivot[basis_slot];
        for (local_row, value) in entries {
            let orig_row = remaining_rows[local_row];
            u_cols[k].push((row_to_pivot[orig_row], value));
        }
    }

    from_pivot_columns(n, pivot_row, pivot_col, row_to_pivot, col_to_pivot, u_diag, l_cols, u_cols, rank.rank_deficiency)
}
