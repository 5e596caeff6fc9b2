//! Markowitz-threshold Gaussian elimination over the active kernel left
//! behind by BuildSimple.
//!
//! Each step picks the entry minimizing `(col_count - 1) * (row_count - 1)`
//! among candidates whose magnitude clears `tau * (column's largest entry)`,
//! searching only a bounded number of columns (cheapest-bucket-first) rather
//! than the whole kernel. The chosen entry becomes a pivot; every other
//! active row in its column gets an L entry, every other active column in
//! its row gets eliminated against those L entries (the classic rank-one
//! update), and both mirrors of the kernel are purged of the retiring
//! row/column so degrees stay exact for the rest of the search.

use crate::config::{FactorConfig, K_HIGHS_INF, K_HIGHS_TINY, K_MAX_KERNEL_SEARCH};
use crate::engine::buckets::CountBuckets;
use crate::engine::kernel_store::KernelStore;

pub(crate) struct KernelPivot {
    pub local_row: usize,
    pub local_col: usize,
    pub pivot_value: f64,
    /// Other active rows in the pivot column, scaled by the pivot: `(row, l)`.
    pub l_entries: Vec<(usize, f64)>,
}

pub(crate) struct KernelResult {
    pub pivots: Vec<KernelPivot>,
    /// Local rows/cols never reached before the search ran dry: the kernel
    /// was structurally or numerically singular.
    pub unpivoted_rows: Vec<usize>,
    pub unpivoted_cols: Vec<usize>,
    /// Per local column, `(local row, value)` entries contributed by rows
    /// that retired before this column itself got pivoted — U's
    /// off-diagonal entries, in local kernel indexing.
    pub u_off_diag: Vec<Vec<(usize, f64)>>,
    /// Set when `budget` ran out before every row/column was pivoted; the
    /// caller should discard this result rather than treat the unpivoted
    /// rows/cols as genuine rank deficiency.
    pub timed_out: bool,
}

struct Candidate {
    row: usize,
    col: usize,
    value: f64,
    merit: usize,
}

/// Tie-break per §4.3: smaller merit, then larger `|v|`, then lower index.
fn better_candidate(new: &Candidate, incumbent: &Candidate) -> bool {
    match new.merit.cmp(&incumbent.merit) {
        std::cmp::Ordering::Less => true,
        std::cmp::Ordering::Greater => false,
        std::cmp::Ordering::Equal => match new.value.abs().partial_cmp(&incumbent.value.abs()) {
            Some(std::cmp::Ordering::Greater) => true,
            Some(std::cmp::Ordering::Less) => false,
            _ => (new.col, new.row) < (incumbent.col, incumbent.row),
        },
    }
}

/// `row_buckets` is consulted only for the `min_row_count` half of
/// `ideal_merit` (§4.3 step 1); the search itself still walks columns.
/// `pivot_tolerance` is the absolute-magnitude abort criterion (σ, §4.3's
/// numerical policy paragraph): a candidate that clears the relative
/// `tau * max|col|` test but falls below it is rejected exactly as if no
/// pivot had been proposed there.
fn select_pivot(
    store: &KernelStore,
    col_buckets: &CountBuckets,
    row_buckets: &CountBuckets,
    tau: f64,
    pivot_tolerance: f64,
) -> Option<Candidate> {
    let ideal_merit = match (col_buckets.min_nonempty(), row_buckets.min_nonempty()) {
        (Some(min_col_count), Some(min_row_count)) => {
            min_col_count.saturating_sub(1) * min_row_count.saturating_sub(1)
        }
        _ => 0,
    };

    let mut best: Option<Candidate> = None;
    let mut best_merit = K_HIGHS_INF;
    let mut columns_examined = 0usize;

    'buckets: for count in 0..=col_buckets.max_count() {
        if col_buckets.is_empty(count) {
            continue;
        }
        if best.is_some() && best_merit <= ideal_merit as f64 {
            break;
        }
        for col in col_buckets.iter(count) {
            if columns_examined >= K_MAX_KERNEL_SEARCH && best.is_some() {
                break 'buckets;
            }
            columns_examined += 1;

            let (rows, values) = store.column(col);
            let max_abs = store.col_min_pivot[col];
            if max_abs <= 0.0 {
                continue;
            }
            let col_count = rows.len();
            for (&row, &value) in rows.iter().zip(values.iter()) {
                let v = value.abs();
                if v < tau * max_abs || v < pivot_tolerance {
                    continue;
                }
                let merit = col_count.saturating_sub(1) * store.row_count(row).saturating_sub(1);
                let candidate = Candidate { row, col, value, merit };
                let better = match &best {
                    None => true,
                    Some(b) => better_candidate(&candidate, b),
                };
                if better {
                    best_merit = merit as f64;
                    best = Some(candidate);
                }
            }
        }
    }
    best
}

/// `budget`, if given, caps the number of pivots this call will perform —
/// a coarse checkpoint standing in for the wall-clock budget a caller may
/// want to enforce on a very large or ill-conditioned kernel (see
/// `FactorConfig::build_step_limit`). Checked once per loop iteration so a
/// budget exceeded mid-search leaves the remaining, still-unpivoted rows
/// and columns un-eliminated rather than finishing the sweep anyway.
pub(crate) fn build_kernel(store: &mut KernelStore, config: &FactorConfig, budget: Option<usize>) -> KernelResult {
    let n = store.n();
    let tau = config.pivot_threshold();
    let pivot_tolerance = config.pivot_tolerance();

    let mut row_active = vec![true; n];
    let mut col_active = vec![true; n];

    let mut col_buckets = CountBuckets::new(n, n);
    let mut row_buckets = CountBuckets::new(n, n);
    for j in 0..n {
        col_buckets.link_add(j, store.col_count(j));
    }
    for i in 0..n {
        row_buckets.link_add(i, store.row_count(i));
    }

    let mut pivots = Vec::new();
    let mut u_off_diag: Vec<Vec<(usize, f64)>> = vec![Vec::new(); n];
    let mut timed_out = false;

    loop {
        let Some(candidate) = select_pivot(store, &col_buckets, &row_buckets, tau, pivot_tolerance) else {
            break;
        };
        if let Some(budget) = budget {
            if pivots.len() >= budget {
                timed_out = true;
                break;
            }
        }
        let Candidate { row: r, col: c, value: pivot_value, .. } = candidate;

        let (rows, values) = store.column(c);
        let l_entries: Vec<(usize, f64)> = rows
            .iter()
            .zip(values.iter())
            .filter(|&(&row, _)| row != r)
            .map(|(&row, &v)| (row, v / pivot_value))
            .collect();

        let pivot_row_entries: Vec<(usize, f64)> = store
            .row(r)
            .iter()
            .copied()
            .filter(|&col| col != c)
            .map(|col| (col, store.value_at(col, r)))
            .collect();

        for &(col_k, value) in &pivot_row_entries {
            u_off_diag[col_k].push((r, value));
        }

        for &(row_m, l_m) in &l_entries {
            for &(col_k, u_k) in &pivot_row_entries {
                let old = store.value_at(col_k, row_m);
                let new_val = old - l_m * u_k;
                let existed = old != 0.0;
                if new_val.abs() < K_HIGHS_TINY {
                    if existed {
                        store.remove_column_entry(col_k, row_m);
                        store.remove_row_entry(row_m, col_k);
                    }
                } else if store.set_column_entry(col_k, row_m, new_val).unwrap() {
                    store.append_row_entry(row_m, col_k);
                }
            }
            row_buckets.relink(row_m, store.row_count(row_m));
        }
        for &(col_k, _) in &pivot_row_entries {
            col_buckets.relink(col_k, store.col_count(col_k));
        }

        // Purge the retiring column/row from the opposite mirror so degrees
        // stay exact for everything still active.
        let retiring_rows: Vec<usize> = store.column(c).0.to_vec();
        for row in retiring_rows {
            if row != r {
                store.remove_row_entry(row, c);
                row_buckets.relink(row, store.row_count(row));
            }
        }
        let retiring_cols: Vec<usize> = store.row(r).to_vec();
        for col in retiring_cols {
            if col != c {
                store.remove_column_entry(col, r);
                col_buckets.relink(col, store.col_count(col));
            }
        }

        row_active[r] = false;
        col_active[c] = false;
        row_buckets.link_del(r);
        col_buckets.link_del(c);

        pivots.push(KernelPivot { local_row: r, local_col: c, pivot_value, l_entries });
    }

    let unpivoted_rows: Vec<usize> = (0..n).filter(|&i| row_active[i]).collect();
    let unpivoted_cols: Vec<usize> = (0..n).filter(|&j| col_active[j]).collect();

    KernelResult { pivots, unpivoted_rows, unpivoted_cols, u_off_diag, timed_out }
}
