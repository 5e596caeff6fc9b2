//! Structured errors for the basis factorization engine.
//!
//! Recoverable, *expected* outcomes (rank deficiency, a numerically rejected
//! update, a time budget overrun) are not errors at all: they are ordinary
//! return values (`BuildOutcome`, `UpdateHint`). `FactorError` is reserved for
//! contract violations: the engine was asked to do something the caller's
//! own bookkeeping should have prevented.

#[derive(Debug, thiserror::Error)]
pub enum FactorError {
    #[error("column pointers length mismatch: expected {expected}, got {actual}")]
    InvalidColumnPointers { expected: usize, actual: usize },

    #[error("row indices/values length mismatch: {row_indices} row indices vs {values} values")]
    RowIndicesValuesLengthMismatch { row_indices: usize, values: usize },

    #[error("row index {index} out of bounds for a {num_row}-row matrix")]
    RowIndexOutOfBounds { index: usize, num_row: usize },

    #[error("basic_index has {actual} entries, expected {expected} (num_row)")]
    InvalidBasicIndexLength { expected: usize, actual: usize },

    #[error("basic column {column} out of range (num_col + num_row = {limit})")]
    BasicColumnOutOfRange { column: usize, limit: usize },

    #[error("pivot row {i_row} out of range for a factorization of size {n}")]
    PivotRowOutOfRange { i_row: usize, n: usize },

    #[error("solve requested before a successful build")]
    NotFactored,

    #[error("the A-matrix view was invalidated by a structural edit; call build before solving")]
    AMatrixInvalid,

    #[error("rectangular basis (num_basic != num_row) does not support ftran/btran")]
    RectangularSolveUnsupported,

    #[error("overflow computing {context}")]
    Overflow { context: &'static str },

    #[error("update method {method:?} is not implemented; only UpdateMethod::Pf is")]
    UnsupportedUpdateMethod { method: crate::config::UpdateMethod },
}

pub type FactorResult<T> = Result<T, FactorError>;
