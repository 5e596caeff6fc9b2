//! The factorization engine: ties BuildSimple, BuildKernel, RankDeficiency,
//! the LU solves and the product-form update together behind the public
//! [`Factorization`] state machine.

mod build_kernel;
mod build_simple;
mod buckets;
mod kernel_store;
mod lu;
mod rank_deficiency;
pub(crate) mod refactor_info;
mod solve;
pub(crate) mod update;

use crate::config::{FactorConfig, UpdateMethod};
use crate::error::{FactorError, FactorResult};
use crate::hvector::HVector;
use crate::matrix::AMatrix;
use lu::LuFactors;
use refactor_info::RefactorInfo;
pub use refactor_info::RebuildOutcome;
pub use update::UpdateHint;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Uninitialized,
    Configured,
    Factored,
}

/// Outcome of [`Factorization::build`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    /// Factorization succeeded; `rank_deficiency` basic columns had to be
    /// replaced with logical substitutes. `row_with_no_pivot` /
    /// `col_with_no_pivot` name the original rows / basis slots BuildKernel
    /// could not clear; `var_with_no_pivot` is the basic-column value that
    /// occupied each of those slots before RankDeficiency substituted it.
    Factored {
        rank_deficiency: usize,
        row_with_no_pivot: Vec<usize>,
        col_with_no_pivot: Vec<usize>,
        var_with_no_pivot: Vec<usize>,
    },
    /// The configured step budget was exhausted before a factorization
    /// completed. The engine's previous state (if any) is left untouched.
    TimeBudgetExceeded,
}

/// The sparse basis-matrix LU factorization and update engine.
///
/// Mirrors a simplex solver's `INVERT`/`FTRAN`/`BTRAN`/`update` cycle: set
/// up once per basis shape, `build` to get an initial factorization, then
/// alternate `ftran`/`btran` solves with `update` as the basis changes one
/// column at a time, occasionally calling `rebuild` (cheap replay) or
/// `build` (full refactorization) again.
pub struct Factorization {
    state: State,
    config: FactorConfig,
    num_row: usize,
    num_col: usize,
    basic_index: Vec<usize>,
    lu: Option<LuFactors>,
    refactor_info: RefactorInfo,
    etas: update::EtaFile,
}

impl Factorization {
    pub fn new() -> Self {
        Self {
            state: State::Uninitialized,
            config: FactorConfig::default(),
            num_row: 0,
            num_col: 0,
            basic_index: Vec::new(),
            lu: None,
            refactor_info: RefactorInfo::default(),
            etas: update::EtaFile::new(),
        }
    }

    /// Configure a square basis of `a.num_row` rows. `basic_index` must have
    /// exactly `a.num_row` entries, each either a structural column of `a`
    /// (`< a.num_col`) or a logical column (`>= a.num_col`).
    pub fn setup(
        &mut self,
        a: &AMatrix<'_>,
        basic_index: &[usize],
        tau: f64,
        sigma: f64,
        debug_level: u8,
    ) -> FactorResult<()> {
        self.setup_general(a, basic_index, a.num_row, tau, sigma, debug_level)
    }

    /// As [`Self::setup`], but allows `basic_index.len()` (`num_basic`) to
    /// differ from `a.num_row` for an intentionally rectangular basis. Only
    /// `build`/`rebuild` are supported on the result; `ftran`/`btran` return
    /// [`FactorError::RectangularSolveUnsupported`] unless `num_basic ==
    /// a.num_row`.
    pub fn setup_general(
        &mut self,
        a: &AMatrix<'_>,
        basic_index: &[usize],
        num_basic: usize,
        tau: f64,
        sigma: f64,
        debug_level: u8,
    ) -> FactorResult<()> {
        if basic_index.len() != num_basic {
            return Err(FactorError::InvalidBasicIndexLength {
                expected: num_basic,
                actual: basic_index.len(),
            });
        }
        let limit = a
            .num_col
            .checked_add(a.num_row)
            .ok_or(FactorError::Overflow { context: "num_col + num_row" })?;
        for &bi in basic_index {
            if bi >= limit {
                return Err(FactorError::BasicColumnOutOfRange { column: bi, limit });
            }
        }

        self.config = FactorConfig::new(tau, sigma, debug_level);
        self.num_row = a.num_row;
        self.num_col = a.num_col;
        self.basic_index = basic_index.to_vec();
        self.lu = None;
        self.refactor_info = RefactorInfo::default();
        self.etas.clear();
        self.state = State::Configured;
        Ok(())
    }

    pub fn set_pivot_threshold(&mut self, tau: f64) -> bool {
        self.config.set_pivot_threshold(tau)
    }

    pub fn set_min_abs_pivot(&mut self, sigma: f64) -> bool {
        self.config.set_min_abs_pivot(sigma)
    }

    pub fn set_update_method(&mut self, method: UpdateMethod) {
        self.config.set_update_method(method)
    }

    /// Resize bookkeeping ahead of a caller-driven column addition. Does not
    /// factorize; `build` must be called again with a matching `a` before
    /// the next solve.
    pub fn add_cols(&mut self, num_new_cols: usize) {
        self.num_col += num_new_cols;
        self.invalidate();
    }

    /// Resize bookkeeping ahead of a caller-driven row addition, extending
    /// `basic_index` with the rows' initial (typically logical) basic
    /// columns. Does not factorize.
    pub fn add_rows(&mut self, num_new_rows: usize, new_basic_index: &[usize]) -> FactorResult<()> {
        if new_basic_index.len() != num_new_rows {
            return Err(FactorError::InvalidBasicIndexLength {
                expected: num_new_rows,
                actual: new_basic_index.len(),
            });
        }
        self.num_row += num_new_rows;
        self.basic_index.extend_from_slice(new_basic_index);
        self.invalidate();
        Ok(())
    }

    /// Drop the highest-numbered `num_deleted` non-basic structural columns
    /// from bookkeeping. Does not factorize.
    pub fn delete_nonbasic_cols(&mut self, num_deleted: usize) {
        self.num_col = self.num_col.saturating_sub(num_deleted);
        self.invalidate();
    }

    fn invalidate(&mut self) {
        self.lu = None;
        self.etas.clear();
        if self.state == State::Factored {
            self.state = State::Configured;
        }
    }

    fn require_factored(&self) -> FactorResult<&LuFactors> {
        self.lu.as_ref().ok_or(FactorError::NotFactored)
    }

    fn require_square(&self) -> FactorResult<()> {
        if self.basic_index.len() != self.num_row {
            Err(FactorError::RectangularSolveUnsupported)
        } else {
            Ok(())
        }
    }

    /// Run BuildSimple, then BuildKernel, then RankDeficiency, over `a`.
    /// `step_limit` (if given) overrides the configured build step budget
    /// for this call only.
    pub fn build(&mut self, a: &AMatrix<'_>, step_limit: Option<usize>) -> FactorResult<BuildOutcome> {
        if self.state == State::Uninitialized {
            return Err(FactorError::NotFactored);
        }
        if a.num_row != self.num_row {
            return Err(FactorError::AMatrixInvalid);
        }
        if self.basic_index.len() != self.num_row {
            return Err(FactorError::RectangularSolveUnsupported);
        }

        let simple = build_simple::build_simple(a, &self.basic_index);

        // BuildSimple already pivoted `simple.pivots` rows/cols away and
        // recorded their interaction with the surviving kernel in
        // `u_off_diag`; the kernel itself must only see the rows/columns it
        // still owns, renumbered to the kernel's own local 0..len() space
        // (original row numbers are otherwise meaningless once the simple
        // phase has removed some of them from the middle of the range).
        let mut row_to_local = vec![usize::MAX; self.num_row];
        for (local, &orig_row) in simple.remaining_rows.iter().enumerate() {
            row_to_local[orig_row] = local;
        }
        let columns: Vec<Vec<(usize, f64)>> = simple
            .remaining_cols
            .iter()
            .map(|&slot| {
                gather_column(a, self.basic_index[slot]).map(|entries| {
                    entries
                        .into_iter()
                        .filter_map(|(row, v)| {
                            let local = row_to_local[row];
                            (local != usize::MAX).then_some((local, v))
                        })
                        .collect()
                })
            })
            .collect::<FactorResult<Vec<_>>>()?;
        let mut store = kernel_store::KernelStore::from_columns(simple.remaining_rows.len(), &columns, 2);
        let limit = step_limit.or(self.config.build_step_limit);
        let kernel_budget = limit.map(|l| l.saturating_sub(simple.pivots.len()));
        let kernel = build_kernel::build_kernel(&mut store, &self.config, kernel_budget);
        if kernel.timed_out {
            return Ok(BuildOutcome::TimeBudgetExceeded);
        }

        let row_with_no_pivot: Vec<usize> =
            kernel.unpivoted_rows.iter().map(|&local| simple.remaining_rows[local]).collect();
        let col_with_no_pivot: Vec<usize> =
            kernel.unpivoted_cols.iter().map(|&local| simple.remaining_cols[local]).collect();
        let var_with_no_pivot: Vec<usize> =
            col_with_no_pivot.iter().map(|&slot| self.basic_index[slot]).collect();

        let rank = rank_deficiency::resolve(&kernel.unpivoted_rows, &kernel.unpivoted_cols);
        let rank_deficiency = rank.rank_deficiency;
        let lu = lu::assemble(self.num_row, simple, kernel, rank);

        self.refactor_info = RefactorInfo::record(&lu);
        self.lu = Some(lu);
        self.etas.clear();
        self.state = State::Factored;

        Ok(BuildOutcome::Factored { rank_deficiency, row_with_no_pivot, col_with_no_pivot, var_with_no_pivot })
    }

    /// Replay the last pivot order against a fresh `a`, falling back to a
    /// full [`Self::build`] if any recorded pivot no longer clears the
    /// threshold test.
    pub fn rebuild(&mut self, a: &AMatrix<'_>) -> FactorResult<RebuildOutcome> {
        self.require_factored()?;
        self.require_square()?;

        if self.refactor_info.is_empty() {
            self.build(a, None)?;
            return Ok(RebuildOutcome::FullRebuildRequired);
        }

        match self.refactor_info.replay(a, &self.basic_index, &self.config) {
            Some(lu) => {
                self.refactor_info = RefactorInfo::record(&lu);
                self.lu = Some(lu);
                self.etas.clear();
                Ok(RebuildOutcome::Replayed)
            }
            None => {
                self.build(a, None)?;
                Ok(RebuildOutcome::FullRebuildRequired)
            }
        }
    }

    pub fn ftran(&mut self, vec: &mut HVector, expected_density: f64) -> FactorResult<()> {
        self.require_square()?;
        let lu = self.require_factored()?;
        solve::ftran(lu, vec, expected_density);
        if self.etas.len() > 0 {
            let mut y: Vec<f64> = (0..lu.n).map(|k| vec.array[lu.pivot_col[k]]).collect();
            self.etas.apply_forward(&mut y);
            for k in 0..lu.n {
                vec.array[lu.pivot_col[k]] = y[k];
            }
            vec.pack();
        }
        Ok(())
    }

    pub fn btran(&mut self, vec: &mut HVector, expected_density: f64) -> FactorResult<()> {
        self.require_square()?;
        let lu = self.require_factored()?;
        if self.etas.len() > 0 {
            let mut z: Vec<f64> = (0..lu.n).map(|k| vec.array[lu.pivot_col[k]]).collect();
            self.etas.apply_backward(&mut z);
            for k in 0..lu.n {
                vec.array[lu.pivot_col[k]] = z[k];
            }
        }
        solve::btran(lu, vec, expected_density);
        Ok(())
    }

    /// Incorporate a single basis-column replacement: `aq` is `B^{-1} a_q`
    /// (already FTRAN'd by the caller), `i_row` is the original row whose
    /// basic column is leaving.
    pub fn update(&mut self, aq: &HVector, i_row: usize) -> FactorResult<UpdateHint> {
        self.require_square()?;
        if self.config.update_method() != UpdateMethod::Pf {
            return Err(FactorError::UnsupportedUpdateMethod { method: self.config.update_method() });
        }
        if i_row >= self.num_row {
            return Err(FactorError::PivotRowOutOfRange { i_row, n: self.num_row });
        }
        let lu = self.lu.as_ref().ok_or(FactorError::NotFactored)?;
        Ok(self.etas.push_update(lu, aq, i_row, &self.config))
    }

    pub fn basic_index(&self) -> &[usize] {
        &self.basic_index
    }

    pub fn report_lu(&self, full: bool) -> String {
        match &self.lu {
            Some(lu) => lu.report(full),
            None => "LU factors: not factored\n".to_string(),
        }
    }
}

impl Default for Factorization {
    fn default() -> Self {
        Self::new()
    }
}

fn gather_column(a: &AMatrix<'_>, basic_col: usize) -> FactorResult<Vec<(usize, f64)>> {
    Ok(match a.column(basic_col)? {
        crate::matrix::Column::Structural { rows, values } => {
            rows.iter().copied().zip(values.iter().copied()).collect()
        }
        crate::matrix::Column::Logical { row } => vec![(row, 1.0)],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity_2x2() -> (Vec<usize>, Vec<usize>, Vec<f64>) {
        (vec![0, 1, 2], vec![0, 1], vec![1.0, 1.0])
    }

    #[test]
    fn build_on_identity_basis_yields_zero_rank_deficiency() {
        let (a_start, a_index, a_value) = identity_2x2();
        let a = AMatrix::new(2, 2, &a_start, &a_index, &a_value).unwrap();
        let mut f = Factorization::new();
        f.setup(&a, &[0, 1], 0.1, 1e-9, 0).unwrap();
        let outcome = f.build(&a, None).unwrap();
        match outcome {
            BuildOutcome::Factored { rank_deficiency, row_with_no_pivot, col_with_no_pivot, var_with_no_pivot } => {
                assert_eq!(rank_deficiency, 0);
                assert!(row_with_no_pivot.is_empty());
                assert!(col_with_no_pivot.is_empty());
                assert!(var_with_no_pivot.is_empty());
            }
            BuildOutcome::TimeBudgetExceeded => panic!("unexpected time budget"),
        }
    }

    #[test]
    fn ftran_then_btran_on_identity_basis_is_a_no_op() {
        let (a_start, a_index, a_value) = identity_2x2();
        let a = AMatrix::new(2, 2, &a_start, &a_index, &a_value).unwrap();
        let mut f = Factorization::new();
        f.setup(&a, &[0, 1], 0.1, 1e-9, 0).unwrap();
        f.build(&a, None).unwrap();

        let mut rhs = HVector::from_dense(vec![3.0, 7.0]);
        f.ftran(&mut rhs, 1.0).unwrap();
        assert_eq!(rhs.array, vec![3.0, 7.0]);

        let mut rhs2 = HVector::from_dense(vec![3.0, 7.0]);
        f.btran(&mut rhs2, 1.0).unwrap();
        assert_eq!(rhs2.array, vec![3.0, 7.0]);
    }

    #[test]
    fn solve_before_build_is_an_error() {
        let (a_start, a_index, a_value) = identity_2x2();
        let a = AMatrix::new(2, 2, &a_start, &a_index, &a_value).unwrap();
        let mut f = Factorization::new();
        f.setup(&a, &[0, 1], 0.1, 1e-9, 0).unwrap();
        let mut rhs = HVector::new(2);
        assert!(f.ftran(&mut rhs, 1.0).is_err());
    }

    #[test]
    fn singular_basis_reports_rank_deficiency_and_still_solves() {
        // B = [[1, 2], [2, 4]], logical columns replace the gap.
        let a_start = vec![0, 2, 4];
        let a_index = vec![0, 1, 0, 1];
        let a_value = vec![1.0, 2.0, 2.0, 4.0];
        let a = AMatrix::new(2, 2, &a_start, &a_index, &a_value).unwrap();
        let mut f = Factorization::new();
        f.setup(&a, &[0, 1], 0.1, 1e-9, 0).unwrap();
        let outcome = f.build(&a, None).unwrap();
        match outcome {
            BuildOutcome::Factored { rank_deficiency, row_with_no_pivot, var_with_no_pivot, .. } => {
                assert_eq!(rank_deficiency, 1);
                assert_eq!(row_with_no_pivot.len(), 1);
                assert_eq!(var_with_no_pivot.len(), 1);
            }
            BuildOutcome::TimeBudgetExceeded => panic!("unexpected time budget"),
        }
    }

    #[test]
    fn update_then_ftran_reflects_the_replaced_column() {
        let (a_start, a_index, a_value) = identity_2x2();
        let a = AMatrix::new(2, 2, &a_start, &a_index, &a_value).unwrap();
        let mut f = Factorization::new();
        f.setup(&a, &[0, 1], 0.1, 1e-9, 0).unwrap();
        f.build(&a, None).unwrap();

        // Replace row 0's basic column so that B becomes [[2,0],[0,1]];
        // aq = B^{-1} a_q for the new column [2,0] against the OLD identity
        // basis is just [2,0] itself.
        let aq = HVector::from_dense(vec![2.0, 0.0]);
        let hint = f.update(&aq, 0).unwrap();
        assert_eq!(hint, UpdateHint::Stable);

        let mut rhs = HVector::from_dense(vec![4.0, 3.0]);
        f.ftran(&mut rhs, 1.0).unwrap();
        assert!((rhs.array[0] - 2.0).abs() < 1e-9);
        assert!((rhs.array[1] - 3.0).abs() < 1e-9);
    }

    #[test]
    fn update_rejects_an_unimplemented_update_method_instead_of_running_pf_under_its_name() {
        let (a_start, a_index, a_value) = identity_2x2();
        let a = AMatrix::new(2, 2, &a_start, &a_index, &a_value).unwrap();
        let mut f = Factorization::new();
        f.setup(&a, &[0, 1], 0.1, 1e-9, 0).unwrap();
        f.build(&a, None).unwrap();
        f.set_update_method(UpdateMethod::Ft);

        let aq = HVector::from_dense(vec![2.0, 0.0]);
        let err = f.update(&aq, 0).unwrap_err();
        assert!(matches!(err, FactorError::UnsupportedUpdateMethod { method: UpdateMethod::Ft }));
    }

    #[test]
    fn build_reports_time_budget_exceeded_and_leaves_engine_unfactored() {
        // Tri-diagonal, diagonally dominant: no column/row singletons, so
        // all three pivots go through BuildKernel and a budget of one pivot
        // is guaranteed to run out mid-search.
        let a_start = vec![0, 2, 5, 7];
        let a_index = vec![0, 1, 0, 1, 2, 1, 2];
        let a_value = vec![4.0, 1.0, 1.0, 4.0, 1.0, 1.0, 4.0];
        let a = AMatrix::new(3, 3, &a_start, &a_index, &a_value).unwrap();
        let mut f = Factorization::new();
        f.setup(&a, &[0, 1, 2], 0.1, 1e-9, 0).unwrap();

        let outcome = f.build(&a, Some(1)).unwrap();
        assert_eq!(outcome, BuildOutcome::TimeBudgetExceeded);

        let mut rhs = HVector::from_dense(vec![1.0, 1.0, 1.0]);
        assert!(f.ftran(&mut rhs, 1.0).is_err());

        // A full build with no limit still succeeds afterward.
        let outcome = f.build(&a, None).unwrap();
        match outcome {
            BuildOutcome::Factored { rank_deficiency, .. } => assert_eq!(rank_deficiency, 0),
            BuildOutcome::TimeBudgetExceeded => panic!("unexpected time budget"),
        }
        f.ftran(&mut rhs, 1.0).unwrap();
    }
}
