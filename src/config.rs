//! Engine configuration: pivot tolerances, update method and search strategy.
//!
//! Mirrors the factorization engine's own state machine: these knobs are
//! part of the configuration object set up once and mutated through the
//! dedicated setters, not ambient globals.

/// Entries whose magnitude falls below this after elimination are dropped
/// from the active kernel rather than stored as explicit near-zeros.
pub const K_HIGHS_TINY: f64 = 1e-14;

/// Stand-in for "unbounded" in merit/size computations.
pub const K_HIGHS_INF: f64 = 1e200;

/// Number of nonempty count buckets BuildKernel will scan before accepting
/// the best candidate found so far, even if it is not provably minimal.
pub const K_MAX_KERNEL_SEARCH: usize = 8;

pub const K_DEFAULT_PIVOT_THRESHOLD: f64 = 0.1;
pub const K_DEFAULT_PIVOT_TOLERANCE: f64 = 1e-9;

/// How a single basis-column replacement is folded into the existing L/U.
///
/// Only [`UpdateMethod::Pf`] is actually performed by `update.rs::push_update`
/// today — every variant below it is a selectable name without a distinct
/// implementation behind it yet (see DESIGN.md). `Default` picks `Pf` rather
/// than `Ft` so the configured method always matches what the engine does;
/// `Factorization::update` rejects any other variant instead of silently
/// running PF under an FT label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateMethod {
    /// Forrest-Tomlin: splice the new column directly into U. Not yet
    /// implemented.
    Ft,
    /// Product-form: append an eta vector to the update buffer. The only
    /// variant `push_update` performs.
    Pf,
    /// Middle product-form variant. Not yet implemented.
    Mpf,
    /// Alternate product-form variant. Not yet implemented.
    Apf,
}

/// Candidate-search order used by BuildKernel's Markowitz loop.
///
/// `Original` is the canonical, always-correct strategy and the only one
/// selected by `Default`. The other three are experimental permutations of
/// the same search order, kept for empirical comparison (see DESIGN.md).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkowitzStrategy {
    Original,
    Refined,
    Switched,
    Alternating,
}

#[derive(Debug, Clone, Copy)]
pub struct FactorConfig {
    /// Threshold pivoting tolerance τ, clamped to [0, 0.5].
    pub(crate) pivot_threshold: f64,
    /// Minimum acceptable absolute pivot magnitude σ.
    pub(crate) pivot_tolerance: f64,
    pub(crate) update_method: UpdateMethod,
    pub(crate) search_strategy: MarkowitzStrategy,
    pub(crate) debug_level: u8,
    /// Coarse checkpoints inside BuildKernel bail out once this many pivot
    /// steps have been attempted, standing in for a wall-clock budget this
    /// library has no portable way to measure on its own without pulling in
    /// a timing crate the surrounding driver already owns.
    pub(crate) build_step_limit: Option<usize>,
}

impl Default for FactorConfig {
    fn default() -> Self {
        Self {
            pivot_threshold: K_DEFAULT_PIVOT_THRESHOLD,
            pivot_tolerance: K_DEFAULT_PIVOT_TOLERANCE,
            update_method: UpdateMethod::Pf,
            search_strategy: MarkowitzStrategy::Original,
            debug_level: 0,
            build_step_limit: None,
        }
    }
}

impl FactorConfig {
    pub fn new(pivot_threshold: f64, pivot_tolerance: f64, debug_level: u8) -> Self {
        let mut config = Self {
            debug_level,
            ..Self::default()
        };
        config.set_pivot_threshold(pivot_threshold);
        config.pivot_tolerance = pivot_tolerance.max(0.0);
        config
    }

    /// Accepts τ in (0, 0.5], clamping and returning whether the requested
    /// value was accepted as-is.
    pub fn set_pivot_threshold(&mut self, tau: f64) -> bool {
        let accepted = tau > 0.0 && tau <= 0.5;
        self.pivot_threshold = tau.clamp(0.0, 0.5);
        accepted
    }

    /// Accepts σ >= 0, returning whether the requested value was accepted.
    pub fn set_min_abs_pivot(&mut self, sigma: f64) -> bool {
        let accepted = sigma >= 0.0;
        self.pivot_tolerance = sigma.max(0.0);
        accepted
    }

    pub fn set_update_method(&mut self, method: UpdateMethod) {
        self.update_method = method;
    }

    pub fn set_search_strategy(&mut self, strategy: MarkowitzStrategy) {
        self.search_strategy = strategy;
    }

    pub fn set_build_step_limit(&mut self, limit: Option<usize>) {
        self.build_step_limit = limit;
    }

    pub fn pivot_threshold(&self) -> f64 {
        self.pivot_threshold
    }

    pub fn pivot_tolerance(&self) -> f64 {
        self.pivot_tolerance
    }

    pub fn update_method(&self) -> UpdateMethod {
        self.update_method
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_threshold_is_the_documented_constant() {
        let config = FactorConfig::default();
        assert_eq!(config.pivot_threshold(), K_DEFAULT_PIVOT_THRESHOLD);
    }

    #[test]
    fn pivot_threshold_is_clamped_to_half() {
        let mut config = FactorConfig::default();
        assert!(!config.set_pivot_threshold(10.0));
        assert_eq!(config.pivot_threshold(), 0.5);

        assert!(!config.set_pivot_threshold(-1.0));
        assert_eq!(config.pivot_threshold(), 0.0);

        assert!(config.set_pivot_threshold(0.25));
        assert_eq!(config.pivot_threshold(), 0.25);
    }

    #[test]
    fn min_abs_pivot_rejects_negative() {
        let mut config = FactorConfig::default();
        assert!(!config.set_min_abs_pivot(-1e-6));
        assert_eq!(config.pivot_tolerance(), 0.0);
    }

    #[test]
    fn default_update_method_is_the_one_actually_implemented() {
        let config = FactorConfig::default();
        assert_eq!(config.update_method, UpdateMethod::Pf);
    }
}
