//! Incorporating a single basis-column replacement without refactorizing.
//!
//! The concrete mechanism implemented here is product-form: each update
//! appends an eta vector (the new column expressed against the *current*
//! basis, via FTRAN) rather than splicing values into U in place. This is
//! the only [`crate::config::UpdateMethod`] variant this crate performs;
//! `Factorization::update` rejects any other configured variant up front
//! rather than silently running PF under a different label — see
//! DESIGN.md.
//!
//! `B_k = B_{k-1} · E_k`, so `FTRAN` applies accumulated etas oldest-first
//! *after* the base LU solve, and `BTRAN` applies them newest-first
//! *before* it — the standard product-form-of-the-inverse bookkeeping.

use crate::config::FactorConfig;
use crate::engine::lu::LuFactors;
use crate::hvector::HVector;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateHint {
    /// The update was folded in; the factorization remains usable.
    Stable,
    /// The update's pivot was too small to trust; the caller should
    /// refactor from scratch before solving again.
    Reinvert,
}

#[derive(Debug, Clone)]
pub(crate) struct Eta {
    /// Pivot-order position whose column this eta replaces.
    p: usize,
    pivot_value: f64,
    /// Other pivot-order positions touched, `(m, value)`.
    entries: Vec<(usize, f64)>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct EtaFile {
    etas: Vec<Eta>,
}

impl EtaFile {
    pub fn new() -> Self {
        Self { etas: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.etas.len()
    }

    pub fn clear(&mut self) {
        self.etas.clear();
    }

    /// `aq` is `B^{-1} a_q` (already FTRAN'd by the caller), dense. Like
    /// `ftran`'s own output (`solve.rs::ftran`, `Factorization::ftran`),
    /// `aq` is indexed by basis-slot position (`pivot_col`), not by row —
    /// the eta is later applied in that same slot space by
    /// `apply_forward`/`apply_backward` (`Factorization::ftran`/`btran`
    /// gather/scatter through `pivot_col`). `i_row` is the original row
    /// whose basic column is being replaced.
    pub fn push_update(
        &mut self,
        lu: &LuFactors,
        aq: &HVector,
        i_row: usize,
        config: &FactorConfig,
    ) -> UpdateHint {
        let n = lu.n;
        let p = lu.row_to_pivot[i_row];
        let pivot_value = aq.array[lu.pivot_col[p]];

        if pivot_value.abs() < config.pivot_tolerance() {
            return UpdateHint::Reinvert;
        }

        let entries: Vec<(usize, f64)> = (0..n)
            .filter(|&m| m != p)
            .map(|m| (m, aq.array[lu.pivot_col[m]]))
            .filter(|&(_, v)| v != 0.0)
            .collect();

        self.etas.push(Eta { p, pivot_value, entries });
        UpdateHint::Stable
    }

    /// Post-LU-solve FTRAN correction, etas applied oldest to newest.
    pub fn apply_forward(&self, z: &mut [f64]) {
        for eta in &self.etas {
            let zp = z[eta.p] / eta.pivot_value;
            z[eta.p] = zp;
            for &(m, val) in &eta.entries {
                z[m] -= val * zp;
            }
        }
    }

    /// Pre-LU-solve BTRAN correction, etas applied newest to oldest.
    pub fn apply_backward(&self, w: &mut [f64]) {
        for eta in self.etas.iter().rev() {
            let mut s = w[eta.p];
            for &(m, val) in &eta.entries {
                s -= val * w[m];
            }
            w[eta.p] = s / eta.pivot_value;
        }
    }
}
