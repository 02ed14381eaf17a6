//! PRISM risk-model engine: a polygenic Cox proportional-hazards survival
//! model over independent biallelic SNPs. Given a population-level
//! age-specific marginal survivor function and per-SNP effect sizes, the
//! engine recovers the baseline survivor function implied by the assumed
//! genotype distribution and evaluates per-individual prognostic indices,
//! population percentiles and age-indexed cumulative risk curves.
//!
//! File I/O, CLI parsing, report formatting and the on-disk serialization
//! format are deliberately out of scope here; see the `prism-cli` crate.

pub mod config;
pub mod errors;
pub mod genotype;
pub mod incidence;
pub mod individual;
pub mod model;
pub mod snp;
pub mod solver;

pub use config::RiskModelConfig;
pub use errors::Error;
pub use genotype::GenotypeDistribution;
pub use incidence::annual_incidence_to_survivor;
pub use individual::{GenotypeInput, Genotypes, RiskPrediction};
pub use model::{RiskModel, SerializedRiskModel};
pub use snp::{Orientation, Snp};
pub use solver::BaselineSurvivorSolver;
