//! Refactor replay: after an `update()` run or between simplex iterations
//! with an unchanged basis structure, `rebuild` can often reconstruct L/U
//! against a fresh copy of A by reusing the *order* of the last pivot
//! sequence instead of re-running Markowitz search from scratch — the same
//! rows and columns are pivoted in the same order, only the numeric values
//! are recomputed.
//!
//! If any recorded pivot no longer clears the threshold test against the
//! new numbers, replay aborts and the caller is told to run a full `build`
//! instead; a stale pivot order is not safe to force through.

use crate::config::{FactorConfig, K_HIGHS_TINY};
use crate::engine::kernel_store::KernelStore;
use crate::engine::lu::{self, LuFactors};
use crate::matrix::{AMatrix, Column};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildOutcome {
    Replayed,
    FullRebuildRequired,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct RefactorInfo {
    pivot_row: Vec<usize>,
    pivot_col: Vec<usize>,
}

impl RefactorInfo {
    pub fn record(lu: &LuFactors) -> Self {
        Self { pivot_row: lu.pivot_row.clone(), pivot_col: lu.pivot_col.clone() }
    }

    pub fn is_empty(&self) -> bool {
        self.pivot_row.is_empty()
    }

    /// Attempt to rebuild `L`/`U` over `a` reusing this recorded pivot
    /// order. Returns `None` (and leaves the caller to run a full build)
    /// when any recorded pivot's magnitude no longer clears the threshold
    /// test, or when a recorded basic column is structurally absent from
    /// the new `a`.
    pub fn replay(&self, a: &AMatrix<'_>, basic_index: &[usize], config: &FactorConfig) -> Option<LuFactors> {
        let n = self.pivot_row.len();
        if n != basic_index.len() {
            return None;
        }

        let mut columns: Vec<Vec<(usize, f64)>> = Vec::with_capacity(n);
        for &bi in basic_index {
            let col = match a.column(bi).ok()? {
                Column::Structural { rows, values } => {
                    rows.iter().copied().zip(values.iter().copied()).collect()
                }
                Column::Logical { row } => vec![(row, 1.0)],
            };
            columns.push(col);
        }
        let mut store = KernelStore::from_columns(n, &columns, 2);

        let mut row_to_pivot = vec![0usize; n];
        let mut col_to_pivot = vec![0usize; n];
        for k in 0..n {
            row_to_pivot[self.pivot_row[k]] = k;
            col_to_pivot[self.pivot_col[k]] = k;
        }

        let mut l_cols: Vec<Vec<(usize, f64)>> = vec![Vec::new(); n];
        let mut u_cols: Vec<Vec<(usize, f64)>> = vec![Vec::new(); n];
        let mut u_diag = vec![0.0f64; n];
        let tau = config.pivot_threshold();

        for k in 0..n {
            let r = self.pivot_row[k];
            let c = self.pivot_col[k];

            let max_abs = store.col_min_pivot[c];
            let pivot_value = store.value_at(c, r);
            if pivot_value == 0.0 || (max_abs > 0.0 && pivot_value.abs() < tau * max_abs) {
                return None;
            }
            u_diag[k] = pivot_value;

            let (rows, values) = store.column(c);
            let l_entries: Vec<(usize, f64)> = rows
                .iter()
                .zip(values.iter())
                .filter(|&(&row, _)| row != r)
                .map(|(&row, &v)| (row_to_pivot[row], v / pivot_value))
                .collect();
            l_cols[k] = l_entries.clone();

            let pivot_row_entries: Vec<(usize, f64)> = store
                .row(r)
                .iter()
                .copied()
                .filter(|&col| col != c)
                .map(|col| (col, store.value_at(col, r)))
                .collect();
            for &(col_k2, value) in &pivot_row_entries {
                u_cols[col_to_pivot[col_k2]].push((k, value));
            }

            for &(row_m, l_m) in &l_entries {
                for &(col_k2, u_k2) in &pivot_row_entries {
                    let old = store.value_at(col_k2, row_m);
                    let new_val = old - l_m * u_k2;
                    if new_val.abs() < K_HIGHS_TINY {
                        if old != 0.0 {
                            store.remove_column_entry(col_k2, row_m);
                            store.remove_row_entry(row_m, col_k2);
                        }
                    } else if store.set_column_entry(col_k2, row_m, new_val).ok()? {
                        store.append_row_entry(row_m, col_k2);
                    }
                }
            }

            let leftover_rows: Vec<usize> = store.column(c).0.to_vec();
            for row in leftover_rows {
                if row != r {
                    store.remove_row_entry(row, c);
                }
            }
            let leftover_cols: Vec<usize> = store.row(r).to_vec();
            for col in leftover_cols {
                if col != c {
                    store.remove_column_entry(col, r);
                }
            }
        }

        Some(lu::from_pivot_columns(
            n,
            self.pivot_row.clone(),
            self.pivot_col.clone(),
            row_to_pivot,
            col_to_pivot,
            u_diag,
            l_cols,
            u_cols,
            0,
        ))
    }
}
