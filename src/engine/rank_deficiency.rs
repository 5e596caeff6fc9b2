//! Resolves whatever BuildKernel could not pivot on its own.
//!
//! When the Markowitz search runs dry with rows and columns still active,
//! the basis restricted to them is singular (structurally or numerically).
//! Rather than fail the whole factorization, each leftover row is paired
//! with one leftover column and pivoted on an assumed unit logical entry —
//! the same fix-up a simplex driver would apply by swapping that basic
//! column for the row's slack. The caller is told which basis slots were
//! overridden this way so it can react (typically: bound the corresponding
//! variable and re-enter a replacement next iteration).

pub(crate) struct RankDeficientPivot {
    pub local_row: usize,
    pub local_col: usize,
}

pub(crate) struct RankDeficiencyReport {
    pub rank_deficiency: usize,
    pub substitutions: Vec<RankDeficientPivot>,
}

pub(crate) fn resolve(unpivoted_rows: &[usize], unpivoted_cols: &[usize]) -> RankDeficiencyReport {
    debug_assert_eq!(unpivoted_rows.len(), unpivoted_cols.len());
    let substitutions = unpivoted_rows
        .iter()
        .zip(unpivoted_cols.iter())
        .map(|(&local_row, &local_col)| RankDeficientPivot { local_row, local_col })
        .collect::<Vec<_>>();
    RankDeficiencyReport { rank_deficiency: substitutions.len(), substitutions }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pairs_leftover_rows_with_leftover_columns_one_for_one() {
        let report = resolve(&[2, 5], &[1, 3]);
        assert_eq!(report.rank_deficiency, 2);
        assert_eq!(report.substitutions[0].local_row, 2);
        assert_eq!(report.substitutions[0].local_col, 1);
        assert_eq!(report.substitutions[1].local_row, 5);
        assert_eq!(report.substitutions[1].local_col, 3);
    }

    #[test]
    fn empty_input_is_full_rank() {
        let report = resolve(&[], &[]);
        assert_eq!(report.rank_deficiency, 0);
        assert!(report.substitutions.is_empty());
    }
}
