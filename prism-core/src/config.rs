use serde::{Deserialize, Serialize};

/// Process-wide constants from the spec, held as an immutable record rather
/// than ambient globals so tests can exercise non-default values (e.g. a
/// smaller `monte_carlo_samp_size` or a relaxed `solver_max_eval`) without
/// reaching for global mutable state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskModelConfig {
    /// Largest SNP count for which exact 3^k enumeration is permitted.
    pub max_snps_exact: usize,
    /// Monte Carlo sample size used when `k > max_snps_exact`.
    pub monte_carlo_samp_size: u64,
    /// Deterministic seed for the Monte Carlo genotype sampler.
    pub mc_seed: u64,
    /// Absolute tolerance used for probability-sum and monotonicity checks.
    pub prob_cmp_epsilon: f64,
    /// Maximum function evaluations allotted to the root-finder per time point.
    pub solver_max_eval: usize,
}

impl Default for RiskModelConfig {
    fn default() -> Self {
        RiskModelConfig {
            max_snps_exact: 15,
            monte_carlo_samp_size: 10_000_000,
            mc_seed: 314_159_265,
            prob_cmp_epsilon: 1e-10,
            solver_max_eval: 100,
        }
    }
}
