use indexmap::IndexMap;
use log::warn;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::RiskModelConfig;
use crate::errors::Error;
use crate::genotype::GenotypeDistribution;
use crate::individual::{Genotypes, RiskPrediction};
use crate::snp::Snp;
use crate::solver::BaselineSurvivorSolver;

/// A fitted polygenic Cox-style survival model: SNPs, an age grid with its
/// marginal and recovered baseline survivor functions, and the cached
/// genotype distribution used to evaluate both. Pure and immutable after
/// construction; `get_risk_prediction` takes `&self`, so a constructed
/// model may be shared across parallel predictors without locking.
#[derive(Debug, Clone)]
pub struct RiskModel {
    name: String,
    snps: Vec<Snp>,
    times: Vec<f64>,
    marg_surv: Vec<f64>,
    base_surv: Vec<f64>,
    use_exact: bool,
    config: RiskModelConfig,
    distribution: GenotypeDistribution,
}

/// The round-trippable subset of a `RiskModel`'s state (spec.md §6.4): the
/// cached distribution is intentionally absent since it is reconstructed
/// deterministically from `snps`, `use_exact` and `config` on load. The
/// concrete wire format (JSON, YAML, ...) is a CLI-glue concern, not this
/// crate's.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializedRiskModel {
    pub schema_version: u32,
    pub name: String,
    pub snps: Vec<Snp>,
    pub times: Vec<f64>,
    pub marg_surv: Vec<f64>,
    pub base_surv: Vec<f64>,
    pub use_exact: bool,
    pub config: RiskModelConfig,
}

const SCHEMA_VERSION: u32 = 1;

impl RiskModel {
    /// Builds a risk model. `use_exact` honors an explicit choice only when
    /// `k <= config.max_snps_exact`; requesting exact enumeration above that
    /// threshold fails with `Error::InvalidArgument`. Leaving it unset
    /// defaults to exact when `k <= config.max_snps_exact`, else Monte
    /// Carlo — logging a warning about the fallback, since it would
    /// otherwise happen silently (spec.md §9).
    pub fn build(
        name: impl Into<String>,
        snps: Vec<Snp>,
        times: Vec<f64>,
        marg_surv: Vec<f64>,
        use_exact: Option<bool>,
        config: RiskModelConfig,
    ) -> Result<Self, Error> {
        let name = name.into();
        let k = snps.len();
        if k == 0 {
            return Err(Error::invalid_argument(
                "a risk model requires at least one SNP",
            ));
        }
        if times.len() != marg_surv.len() {
            return Err(Error::invalid_argument(format!(
                "times ({}) and marginal survivor ({}) arrays must have equal length",
                times.len(),
                marg_surv.len()
            )));
        }
        if times.is_empty() {
            return Err(Error::invalid_argument(
                "a risk model requires at least one time point",
            ));
        }
        if times.iter().any(|&t| t < 0.0) || times.windows(2).any(|w| w[1] <= w[0]) {
            return Err(Error::invalid_argument(
                "times must be strictly increasing and non-negative",
            ));
        }
        if marg_surv.iter().any(|&s| !(0.0..=1.0).contains(&s)) {
            return Err(Error::invalid_argument(
                "marginal survivor values must lie in [0, 1]",
            ));
        }
        if marg_surv.windows(2).any(|w| w[1] > w[0]) {
            return Err(Error::invalid_argument(
                "marginal survivor function must be non-increasing",
            ));
        }

        let use_exact_resolved = Self::resolve_mode(&name, k, use_exact, &config)?;

        let distribution = if use_exact_resolved {
            GenotypeDistribution::exact(&snps, config.prob_cmp_epsilon)?
        } else {
            GenotypeDistribution::monte_carlo(&snps, config.monte_carlo_samp_size, config.mc_seed)
        };

        let base_surv = BaselineSurvivorSolver::solve(&marg_surv, &distribution, &config)?;

        Ok(RiskModel {
            name,
            snps,
            times,
            marg_surv,
            base_surv,
            use_exact: use_exact_resolved,
            config,
            distribution,
        })
    }

    fn resolve_mode(
        name: &str,
        k: usize,
        use_exact: Option<bool>,
        config: &RiskModelConfig,
    ) -> Result<bool, Error> {
        match use_exact {
            Some(true) => {
                if k > config.max_snps_exact {
                    Err(Error::invalid_argument(format!(
                        "exact enumeration requested but k={} exceeds max_snps_exact={}",
                        k, config.max_snps_exact
                    )))
                } else {
                    Ok(true)
                }
            }
            Some(false) => Ok(false),
            None => {
                let exact_feasible = k <= config.max_snps_exact;
                if !exact_feasible {
                    warn!(
                        "model {:?}: k={} exceeds max_snps_exact={}; falling back to Monte Carlo ({} samples, seed {})",
                        name, k, config.max_snps_exact, config.monte_carlo_samp_size, config.mc_seed
                    );
                }
                Ok(exact_feasible)
            }
        }
    }

    /// Rebuilds a `RiskModel` from its persisted fields, recomputing the
    /// genotype distribution deterministically from `snps`/`use_exact`/
    /// `config` rather than reading a cached copy. `base_surv` is taken
    /// as-is from the persisted record (it is not re-solved).
    pub fn from_serialized(persisted: SerializedRiskModel) -> Result<Self, Error> {
        let SerializedRiskModel {
            schema_version: _,
            name,
            snps,
            times,
            marg_surv,
            base_surv,
            use_exact,
            config,
        } = persisted;

        if times.len() != marg_surv.len() || times.len() != base_surv.len() {
            return Err(Error::invalid_argument(
                "persisted times, marg_surv and base_surv must have equal length",
            ));
        }

        let distribution = if use_exact {
            GenotypeDistribution::exact(&snps, config.prob_cmp_epsilon)?
        } else {
            GenotypeDistribution::monte_carlo(&snps, config.monte_carlo_samp_size, config.mc_seed)
        };

        Ok(RiskModel {
            name,
            snps,
            times,
            marg_surv,
            base_surv,
            use_exact,
            config,
            distribution,
        })
    }

    pub fn to_serialized(&self) -> SerializedRiskModel {
        SerializedRiskModel {
            schema_version: SCHEMA_VERSION,
            name: self.name.clone(),
            snps: self.snps.clone(),
            times: self.times.clone(),
            marg_surv: self.marg_surv.clone(),
            base_surv: self.base_surv.clone(),
            use_exact: self.use_exact,
            config: self.config,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn snps(&self) -> &[Snp] {
        &self.snps
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn marginal_survivor(&self) -> &[f64] {
        &self.marg_surv
    }

    pub fn baseline_survivor(&self) -> &[f64] {
        &self.base_surv
    }

    pub fn is_exact(&self) -> bool {
        self.use_exact
    }

    pub fn config(&self) -> &RiskModelConfig {
        &self.config
    }

    /// Evaluates one individual's prognostic index, population percentile
    /// and age-indexed cumulative risk curve. Never mutates model state;
    /// propagates `Error::InvalidGenotype` from a SNP's scoring without
    /// poisoning the model for subsequent calls.
    pub fn get_risk_prediction(&self, genotypes: &Genotypes) -> Result<RiskPrediction, Error> {
        let mut eta = 0.0;
        let mut used = IndexMap::with_capacity(self.snps.len());
        for snp in &self.snps {
            let (in_a1, in_a2, in_orient) = genotypes.get(snp.rs_id());
            let effective_orient = in_orient.unwrap_or_else(|| snp.orient());
            used.insert(snp.rs_id().to_string(), format!("{}/{}", in_a1, in_a2));
            eta += snp.geno_score(in_a1, in_a2, effective_orient)?;
        }

        let pi_pctl = (0..self.distribution.size())
            .into_par_iter()
            .filter(|&i| self.distribution.eta(i) <= eta)
            .map(|i| self.distribution.weight(i))
            .sum::<f64>()
            .min(1.0)
            .max(0.0);

        let exp_eta = eta.exp();
        let pred_cum_risk = self
            .base_surv
            .iter()
            .map(|&s0| {
                if s0 >= 1.0 {
                    0.0
                } else if s0 <= 0.0 {
                    1.0
                } else {
                    1.0 - (s0.ln() * exp_eta).exp()
                }
            })
            .collect();

        Ok(RiskPrediction {
            indiv_id: genotypes.indiv_id().to_string(),
            model_name: self.name.clone(),
            genotypes_used: used,
            pi: eta,
            pi_pctl,
            times: self.times.clone(),
            pred_cum_risk,
        })
    }
}
