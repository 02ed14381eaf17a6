use std::collections::HashMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::errors::Error;
use crate::snp::{validate_allele_token, validate_rs_id, Orientation};

/// One rsID's worth of input alleles and (optionally) declared orientation,
/// as carried by an `Individual`'s genotype row.
#[derive(Debug, Clone, PartialEq)]
pub struct GenotypeInput {
    pub in_a1: String,
    pub in_a2: String,
    pub in_orient: Option<Orientation>,
}

/// An individual's genotypes, keyed by rsID. Mutated only during
/// construction by its owner; `RiskModel::get_risk_prediction` reads it
/// through a shared reference. An rsID absent from the map is treated as
/// completely missing ("0", "0") with no declared orientation.
#[derive(Debug, Clone, Default)]
pub struct Genotypes {
    indiv_id: String,
    entries: HashMap<String, GenotypeInput>,
}

impl Genotypes {
    pub fn new(indiv_id: impl Into<String>) -> Self {
        Genotypes {
            indiv_id: indiv_id.into(),
            entries: HashMap::new(),
        }
    }

    pub fn indiv_id(&self) -> &str {
        &self.indiv_id
    }

    /// Validates `rs_id` and both allele tokens, then records the entry.
    /// Fails with `Error::InvalidInput` on a malformed rsID or allele.
    pub fn insert(
        &mut self,
        rs_id: impl Into<String>,
        in_a1: &str,
        in_a2: &str,
        in_orient: Option<Orientation>,
    ) -> Result<(), Error> {
        let rs_id = rs_id.into();
        validate_rs_id(&rs_id)?;
        let in_a1 = validate_allele_token(in_a1).map_err(|_| {
            Error::invalid_input(format!("allele {:?} for {} is malformed", in_a1, rs_id))
        })?;
        let in_a2 = validate_allele_token(in_a2).map_err(|_| {
            Error::invalid_input(format!("allele {:?} for {} is malformed", in_a2, rs_id))
        })?;

        self.entries.insert(
            rs_id,
            GenotypeInput {
                in_a1,
                in_a2,
                in_orient,
            },
        );
        Ok(())
    }

    /// Looks up an rsID's input alleles/orientation, defaulting to fully
    /// missing ("0", "0") with no declared orientation when absent.
    pub fn get(&self, rs_id: &str) -> (&str, &str, Option<Orientation>) {
        match self.entries.get(rs_id) {
            Some(entry) => (&entry.in_a1, &entry.in_a2, entry.in_orient),
            None => ("0", "0", None),
        }
    }
}

/// A pure value aggregate produced fresh by `RiskModel::get_risk_prediction`
/// for one individual: the prognostic index, its population percentile, and
/// an age-indexed cumulative risk curve. Does not alias any `RiskModel`
/// interior state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskPrediction {
    pub indiv_id: String,
    pub model_name: String,
    /// rsID -> "a1/a2" as used, in the model's SNP order.
    pub genotypes_used: IndexMap<String, String>,
    /// Prognostic index (linear predictor) eta.
    pub pi: f64,
    /// Population percentile of `pi` under the model's genotype distribution.
    pub pi_pctl: f64,
    pub times: Vec<f64>,
    /// Predicted cumulative risk at each of `times`, parallel to it.
    pub pred_cum_risk: Vec<f64>,
}
