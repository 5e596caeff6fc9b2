//! Sparse basis-matrix LU factorization and update engine for simplex-style
//! LP solvers: Markowitz-threshold pivoting over a count-bucket sparse
//! kernel, FTRAN/BTRAN triangular solves, product-form basis updates and
//! refactor replay.
//!
//! ```no_run
//! use spfactor::{AMatrix, Factorization, HVector};
//!
//! let a_start = [0usize, 1, 2];
//! let a_index = [0usize, 1];
//! let a_value = [1.0f64, 1.0];
//! let a = AMatrix::new(2, 2, &a_start, &a_index, &a_value).unwrap();
//!
//! let mut factor = Factorization::new();
//! factor.setup(&a, &[0, 1], 0.1, 1e-9, 0).unwrap();
//! factor.build(&a, None).unwrap();
//!
//! let mut rhs = HVector::from_dense(vec![3.0, 4.0]);
//! factor.ftran(&mut rhs, 1.0).unwrap();
//! ```

pub mod config;
mod engine;
pub mod error;
pub mod hvector;
pub mod matrix;

pub use config::{FactorConfig, MarkowitzStrategy, UpdateMethod};
pub use engine::{BuildOutcome, Factorization, RebuildOutcome, UpdateHint};
pub use error::{FactorError, FactorResult};
pub use hvector::HVector;
pub use matrix::{AMatrix, Column};
