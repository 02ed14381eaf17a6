use getset::{CopyGetters, Getters};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use bio::stats::LogProb;
use rand::Rng;

use crate::errors::Error;

lazy_static! {
    static ref RSID_RE: Regex = Regex::new(r"^rs[0-9]+$").unwrap();
    static ref POP_ALLELE_RE: Regex = Regex::new(r"^-$|^[ACGT]+$").unwrap();
    static ref INPUT_ALLELE_RE: Regex = Regex::new(r"^-$|^0$|^[ACGT]+$").unwrap();
}

/// Strand orientation a SNP's population alleles are recorded against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Orientation {
    Forward,
    Reverse,
}

fn complement_base(c: char) -> char {
    match c {
        'A' => 'T',
        'T' => 'A',
        'C' => 'G',
        'G' => 'C',
        other => other,
    }
}

fn complement_allele(allele: &str) -> String {
    allele.chars().map(complement_base).collect()
}

/// Validates `rsID` matches `^rs[0-9]+$`.
pub(crate) fn validate_rs_id(rs_id: &str) -> Result<(), Error> {
    if RSID_RE.is_match(rs_id) {
        Ok(())
    } else {
        Err(Error::invalid_input(format!(
            "rsID {:?} does not match ^rs[0-9]+$",
            rs_id
        )))
    }
}

/// Uppercases and validates an input genotype allele token against
/// `-|0|[ACGT]+`.
pub(crate) fn validate_allele_token(allele: &str) -> Result<String, Error> {
    let upper = allele.to_uppercase();
    if INPUT_ALLELE_RE.is_match(&upper) {
        Ok(upper)
    } else {
        Err(Error::invalid_genotype(format!(
            "input allele {:?} is not -, 0 or [ACGT]+",
            upper
        )))
    }
}

/// Immutable descriptor of a single biallelic locus: population alleles,
/// strand reference, allele-2 frequency and allele-2 log hazard ratio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters, CopyGetters)]
pub struct Snp {
    #[get = "pub"]
    rs_id: String,
    #[get = "pub"]
    source_ref: String,
    #[get = "pub"]
    allele1: String,
    #[get = "pub"]
    allele2: String,
    #[get_copy = "pub"]
    orient: Orientation,
    #[get_copy = "pub"]
    freq2: f64,
    #[get_copy = "pub"]
    ln_hr2: f64,
}

impl Snp {
    /// Validates and builds a SNP descriptor. Fails with `Error::InvalidSnp`
    /// when the rsID is malformed, either allele string doesn't match
    /// `^-$|^[ACGT]+$` after uppercasing, or `freq2` isn't strictly inside
    /// `(0, 1)`.
    pub fn new(
        rs_id: impl Into<String>,
        source_ref: impl Into<String>,
        allele1: impl Into<String>,
        allele2: impl Into<String>,
        orient: Orientation,
        freq2: f64,
        ln_hr2: f64,
    ) -> Result<Self, Error> {
        let rs_id = rs_id.into();
        let allele1 = allele1.into().to_uppercase();
        let allele2 = allele2.into().to_uppercase();

        validate_rs_id(&rs_id).map_err(|_| {
            Error::invalid_snp(format!("rsID {:?} does not match ^rs[0-9]+$", rs_id))
        })?;
        if !POP_ALLELE_RE.is_match(&allele1) {
            return Err(Error::invalid_snp(format!(
                "allele1 {:?} is not - or [ACGT]+",
                allele1
            )));
        }
        if !POP_ALLELE_RE.is_match(&allele2) {
            return Err(Error::invalid_snp(format!(
                "allele2 {:?} is not - or [ACGT]+",
                allele2
            )));
        }
        if !(freq2 > 0.0 && freq2 < 1.0) {
            return Err(Error::invalid_snp(format!(
                "freq2 {} is not strictly inside (0, 1)",
                freq2
            )));
        }
        if !ln_hr2.is_finite() {
            return Err(Error::invalid_snp(format!(
                "lnHR2 {} is not a finite real",
                ln_hr2
            )));
        }

        Ok(Snp {
            rs_id,
            source_ref: source_ref.into(),
            allele1,
            allele2,
            orient,
            freq2,
            ln_hr2,
        })
    }

    /// ln P(G=g) under Hardy-Weinberg equilibrium with p = `freq2`.
    pub fn ln_prob_geno(&self, g: u8) -> LogProb {
        let p = self.freq2;
        match g {
            0 => LogProb(2.0 * (1.0 - p).ln()),
            1 => LogProb(2f64.ln() + p.ln() + (1.0 - p).ln()),
            2 => LogProb(2.0 * p.ln()),
            _ => panic!("genotype code must be 0, 1 or 2, got {}", g),
        }
    }

    /// Draws a genotype code in {0, 1, 2} by summing two independent
    /// Bernoulli(p) draws from `rng`, consuming exactly two `f64` uniforms
    /// in order.
    pub fn random_geno(&self, rng: &mut impl Rng) -> u8 {
        let a: f64 = rng.gen();
        let b: f64 = rng.gen();
        let mut g = 0u8;
        if a < self.freq2 {
            g += 1;
        }
        if b < self.freq2 {
            g += 1;
        }
        g
    }

    /// Scores an input genotype against this SNP's population alleles,
    /// returning the contribution `x * lnHR2` (or the HWE expectation when
    /// fully missing). Fails with `Error::InvalidGenotype` on malformed or
    /// population-incompatible input.
    pub fn geno_score(
        &self,
        in_a1: &str,
        in_a2: &str,
        in_orient: Orientation,
    ) -> Result<f64, Error> {
        let in_a1 = validate_allele_token(in_a1)?;
        let in_a2 = validate_allele_token(in_a2)?;

        let a1_missing = in_a1 == "0";
        let a2_missing = in_a2 == "0";
        if a1_missing != a2_missing {
            return Err(Error::invalid_genotype(
                "Neither or both input alleles must be missing (\"0\")",
            ));
        }
        if a1_missing && a2_missing {
            let p = self.freq2;
            return Ok(self.ln_hr2 * 2.0 * p * (1.0 - p) + 2.0 * self.ln_hr2 * p * p);
        }

        let (oriented_a1, oriented_a2) = if in_orient != self.orient {
            (complement_allele(&in_a1), complement_allele(&in_a2))
        } else {
            (in_a1, in_a2)
        };

        for oriented in &[&oriented_a1, &oriented_a2] {
            if oriented.as_str() != self.allele1 && oriented.as_str() != self.allele2 {
                return Err(Error::invalid_genotype(format!(
                    "input allele {:?} does not match possible population alleles {} / {} for {}",
                    oriented, self.allele1, self.allele2, self.rs_id
                )));
            }
        }

        let count = [&oriented_a1, &oriented_a2]
            .iter()
            .filter(|a| a.as_str() == self.allele2)
            .count();

        Ok(count as f64 * self.ln_hr2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn snp_rs1() -> Snp {
        Snp::new("rs1", "pub1", "A", "G", Orientation::Forward, 0.2, 0.5).unwrap()
    }

    #[test]
    fn hwe_sums_to_one() {
        let snp = Snp::new("rs7", "pub", "A", "C", Orientation::Forward, 0.37, 0.1).unwrap();
        let total = snp.ln_prob_geno(0).exp() + snp.ln_prob_geno(1).exp() + snp.ln_prob_geno(2).exp();
        assert_relative_eq!(total, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn scenario_1_single_snp_forward() {
        let snp = snp_rs1();
        assert_relative_eq!(
            snp.geno_score("a", "A", Orientation::Forward).unwrap(),
            0.0
        );
        assert_relative_eq!(
            snp.geno_score("C", "c", Orientation::Reverse).unwrap(),
            1.0
        );
        assert_relative_eq!(
            snp.geno_score("t", "c", Orientation::Reverse).unwrap(),
            0.5
        );
        assert!(snp.geno_score("t", "C", Orientation::Forward).is_err());
    }

    #[test]
    fn scenario_2_missing_expectation() {
        let snp = snp_rs1();
        let expected = 0.5 * 2.0 * 0.2 * 0.8 + 2.0 * 0.5 * 0.2 * 0.2;
        assert_relative_eq!(
            snp.geno_score("0", "0", Orientation::Forward).unwrap(),
            expected,
            epsilon = 1e-15
        );
    }

    #[test]
    fn scenario_3_multi_character_allele() {
        let snp = Snp::new(
            "rs2",
            "pub",
            "ATTACGCG",
            "-",
            Orientation::Reverse,
            0.5,
            0.25,
        )
        .unwrap();
        assert_relative_eq!(
            snp.geno_score("-", "-", Orientation::Forward).unwrap(),
            0.5
        );
        assert_relative_eq!(
            snp.geno_score("ATTACGCG", "-", Orientation::Reverse)
                .unwrap(),
            0.25
        );
        assert_relative_eq!(
            snp.geno_score("-", "TAATGCGC", Orientation::Forward)
                .unwrap(),
            0.25
        );
        assert!(snp
            .geno_score("-", "TaaTGcGC", Orientation::Reverse)
            .is_err());
    }

    #[test]
    fn strand_flip_idempotence() {
        let snp = snp_rs1();
        let a1 = "C";
        let a2 = "A";
        let direct = snp.geno_score(a1, a2, Orientation::Reverse).unwrap();
        let flipped = snp
            .geno_score(
                &complement_allele(a1),
                &complement_allele(a2),
                Orientation::Forward,
            )
            .unwrap();
        assert_relative_eq!(direct, flipped);
    }

    #[test]
    fn half_missing_rejected() {
        let snp = snp_rs1();
        assert!(snp.geno_score("0", "A", Orientation::Forward).is_err());
    }

    #[test]
    fn invalid_snp_construction() {
        assert!(Snp::new("x1", "pub", "A", "G", Orientation::Forward, 0.2, 0.5).is_err());
        assert!(Snp::new("rs1", "pub", "AX", "G", Orientation::Forward, 0.2, 0.5).is_err());
        assert!(Snp::new("rs1", "pub", "A", "G", Orientation::Forward, 0.0, 0.5).is_err());
        assert!(Snp::new("rs1", "pub", "A", "G", Orientation::Forward, 1.0, 0.5).is_err());
        assert!(Snp::new("rs1", "pub", "A", "G", Orientation::Forward, 0.2, f64::NAN).is_err());
    }
}
