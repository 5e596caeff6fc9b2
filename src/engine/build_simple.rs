//! The first build phase: peel off rows and columns that can be pivoted
//! without any arithmetic beyond a single division, leaving only the
//! genuinely-interacting "kernel" submatrix for BuildKernel's Markowitz
//! search.
//!
//! A column with exactly one active entry needs no elimination at all — its
//! one entry becomes a pivot directly. A row with exactly one active entry
//! is almost as cheap: the other active entries in that column divide
//! straight through to become L entries, since the pivot row itself
//! contributes nothing to eliminate out of them. Repeating this peels a
//! staircase-shaped prefix off the matrix in time proportional to its size,
//! not its fill-in.

use crate::matrix::{AMatrix, Column};

pub(crate) struct SimplePivot {
    /// Original row index chosen at this step.
    pub row: usize,
    /// Index into `basic_index` (i.e. which basis column) chosen at this step.
    pub basis_slot: usize,
    pub pivot_value: f64,
    /// Other active rows with a nonzero in this step's column, already
    /// divided by the pivot value: `(row, l_value)`. Empty for a
    /// column-singleton pivot.
    pub l_entries: Vec<(usize, f64)>,
}

pub(crate) struct SimpleResult {
    pub pivots: Vec<SimplePivot>,
    /// Original row indices with no pivot assigned by this phase.
    pub remaining_rows: Vec<usize>,
    /// `basic_index` slots with no pivot assigned by this phase.
    pub remaining_cols: Vec<usize>,
    /// For each basis slot, the `(original row, value)` entries contributed
    /// by rows this phase retired before that slot itself got a pivot. These
    /// become U's off-diagonal entries once the slot is finally pivoted,
    /// whether later in this same phase or by BuildKernel.
    pub u_off_diag: Vec<Vec<(usize, f64)>>,
}

struct ActiveColumn {
    entries: Vec<(usize, f64)>,
    live: bool,
}

/// Run BuildSimple over the basis named by `basic_index` (length `n`,
/// entries `>= a.num_col` denote logical columns).
pub(crate) fn build_simple(a: &AMatrix<'_>, basic_index: &[usize]) -> SimpleResult {
    let n = basic_index.len();
    debug_assert_eq!(a.num_row, n);

    let mut columns: Vec<ActiveColumn> = Vec::with_capacity(n);
    for &bi in basic_index {
        let entries = match a.column(bi).expect("basic_index entries are validated at setup") {
            Column::Structural { rows, values } => {
                rows.iter().copied().zip(values.iter().copied()).collect()
            }
            Column::Logical { row } => vec![(row, 1.0)],
        };
        columns.push(ActiveColumn { entries, live: true });
    }

    let mut row_live = vec![true; n];
    let mut col_count = vec![0usize; n];
    let mut row_count = vec![0usize; n];
    for (j, col) in columns.iter().enumerate() {
        col_count[j] = col.entries.len();
        for &(row, _) in &col.entries {
            row_count[row] += 1;
        }
    }

    let mut rows_by_col: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (j, col) in columns.iter().enumerate() {
        for &(row, _) in &col.entries {
            rows_by_col[row].push(j);
        }
    }

    let mut pivots = Vec::new();
    let mut u_off_diag: Vec<Vec<(usize, f64)>> = vec![Vec::new(); n];
    let mut singleton_cols: Vec<usize> = (0..n).filter(|&j| col_count[j] == 1).collect();
    let mut singleton_rows: Vec<usize> = (0..n).filter(|&i| row_count[i] == 1).collect();

    loop {
        if let Some(j) = singleton_cols.pop() {
            if !columns[j].live || col_count[j] != 1 {
                continue;
            }
            let (row, value) = *columns[j]
                .entries
                .iter()
                .find(|&&(r, _)| row_live[r])
                .expect("column singleton must have one live entry");

            columns[j].live = false;
            row_live[row] = false;

            for &k in &rows_by_col[row] {
                if columns[k].live && k != j {
                    let other_value =
                        columns[k].entries.iter().find(|&&(r, _)| r == row).expect("indexed").1;
                    u_off_diag[k].push((row, other_value));
                    col_count[k] -= 1;
                    if col_count[k] == 1 {
                        singleton_cols.push(k);
                    }
                }
            }

            pivots.push(SimplePivot { row, basis_slot: j, pivot_value: value, l_entries: Vec::new() });
            continue;
        }

        if let Some(i) = singleton_rows.pop() {
            if !row_live[i] || row_count[i] != 1 {
                continue;
            }
            let j = *rows_by_col[i]
                .iter()
                .find(|&&k| columns[k].live)
                .expect("row singleton must have one live column");
            let pivot_value = columns[j]
                .entries
                .iter()
                .find(|&&(r, _)| r == i)
                .expect("pivot entry present")
                .1;

            let mut l_entries = Vec::new();
            for &(row, value) in &columns[j].entries {
                if row_live[row] && row != i {
                    l_entries.push((row, value / pivot_value));
                    row_count[row] -= 1;
                    if row_count[row] == 1 {
                        singleton_rows.push(row);
                    }
                }
            }

            columns[j].live = false;
            row_live[i] = false;

            pivots.push(SimplePivot { row: i, basis_slot: j, pivot_value, l_entries });
            continue;
        }

        break;
    }

    let remaining_rows: Vec<usize> = (0..n).filter(|&i| row_live[i]).collect();
    let remaining_cols: Vec<usize> = (0..n).filter(|j| columns[*j].live).collect();

    SimpleResult { pivots, remaining_rows, remaining_cols, u_off_diag }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lower_triangular_3x3() -> (Vec<usize>, Vec<usize>, Vec<f64>) {
        // A = [[2,0,0],[1,3,0],[4,5,6]] column-major
        let a_start = vec![0, 3, 5, 6];
        let a_index = vec![0, 1, 2, 1, 2, 2];
        let a_value = vec![2.0, 1.0, 4.0, 3.0, 5.0, 6.0];
        (a_start, a_index, a_value)
    }

    #[test]
    fn fully_triangular_basis_is_entirely_consumed_by_build_simple() {
        let (a_start, a_index, a_value) = lower_triangular_3x3();
        let a = AMatrix::new(3, 3, &a_start, &a_index, &a_value).unwrap();
        let basic_index = vec![0, 1, 2];

        let result = build_simple(&a, &basic_index);
        assert_eq!(result.pivots.len(), 3);
        assert!(result.remaining_rows.is_empty());
        assert!(result.remaining_cols.is_empty());
    }

    #[test]
    fn dense_2x2_block_is_left_for_build_kernel() {
        // A = [[1,1],[1,1]]: no singleton row or column exists.
        let a_start = vec![0, 2, 4];
        let a_index = vec![0, 1, 0, 1];
        let a_value = vec![1.0, 1.0, 1.0, 1.0];
        let a = AMatrix::new(2, 2, &a_start, &a_index, &a_value).unwrap();
        let basic_index = vec![0, 1];

        let result = build_simple(&a, &basic_index);
        assert!(result.pivots.is_empty());
        assert_eq!(result.remaining_rows.len(), 2);
        assert_eq!(result.remaining_cols.len(), 2);
    }

    #[test]
    fn logical_columns_count_as_singletons() {
        // basis = [structural col 0, logical column for row 1]
        let a_start = vec![0, 2];
        let a_index = vec![0, 1];
        let a_value = vec![5.0, 7.0];
        let a = AMatrix::new(2, 1, &a_start, &a_index, &a_value).unwrap();
        let basic_index = vec![0, 1 + 1]; // num_col == 1, so logical row 1

        let result = build_simple(&a, &basic_index);
        assert_eq!(result.pivots.len(), 2);
    }
}
