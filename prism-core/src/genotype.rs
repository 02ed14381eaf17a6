use bio::stats::LogProb;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;

use crate::errors::Error;
use crate::snp::Snp;

/// Enumerates the multivariant genotype space across a model's SNPs,
/// caching each point's linear predictor and (for `Exact`) its
/// Hardy-Weinberg-plus-linkage-equilibrium log probability.
///
/// Modeled as a tagged variant rather than two types behind a trait object,
/// since the only difference between the two modes is whether a log
/// probability is stored per point; `weight` unifies both behind one
/// accessor.
#[derive(Debug, Clone)]
pub enum GenotypeDistribution {
    Exact { etas: Vec<f64>, ln_probs: Vec<f64> },
    MonteCarlo { etas: Vec<f64>, n: u64 },
}

impl GenotypeDistribution {
    /// Enumerates all 3^k genotype combinations across `snps`. Index `i`'s
    /// digit for SNP `j` is `(i / 3^(k-1-j)) mod 3`, i.e. SNP 0 varies
    /// slowest. Fails with `Error::NumericInvariant` if the resulting
    /// probabilities don't sum to 1 within `epsilon`.
    pub fn exact(snps: &[Snp], epsilon: f64) -> Result<Self, Error> {
        let k = snps.len();
        let n = 3usize.pow(k as u32);

        let points: Vec<(f64, f64)> = (0..n)
            .into_par_iter()
            .map(|i| {
                let mut digits = vec![0u8; k];
                let mut rest = i;
                for j in (0..k).rev() {
                    digits[j] = (rest % 3) as u8;
                    rest /= 3;
                }

                let mut eta = 0.0;
                let mut ln_prob = LogProb::ln_one();
                for (j, snp) in snps.iter().enumerate() {
                    let g = digits[j];
                    eta += g as f64 * snp.ln_hr2();
                    ln_prob = ln_prob + snp.ln_prob_geno(g);
                }
                (eta, *ln_prob)
            })
            .collect();

        let (etas, ln_probs): (Vec<f64>, Vec<f64>) = points.into_iter().unzip();

        let total = LogProb::ln_sum_exp(
            &ln_probs.iter().map(|&p| LogProb(p)).collect::<Vec<_>>(),
        )
        .exp();
        if (total - 1.0).abs() > epsilon {
            return Err(Error::numeric_invariant(format!(
                "exact genotype probabilities sum to {} (expected 1 within {})",
                total, epsilon
            )));
        }

        Ok(GenotypeDistribution::Exact { etas, ln_probs })
    }

    /// Draws `sample_size` multivariant genotypes, each SNP scored via
    /// `Snp::random_geno`. Samples are independent across the outer index;
    /// each sample's substream is seeded deterministically from `seed` and
    /// the sample index so the whole distribution is reproducible and safe
    /// to compute in parallel (see DESIGN.md for why this departs from a
    /// single continuous MT19937 stream).
    pub fn monte_carlo(snps: &[Snp], sample_size: u64, seed: u64) -> Self {
        let etas: Vec<f64> = (0..sample_size)
            .into_par_iter()
            .map(|sample_idx| {
                let mut rng = StdRng::seed_from_u64(seed.wrapping_add(sample_idx));
                let mut eta = 0.0;
                for snp in snps {
                    let g = snp.random_geno(&mut rng);
                    eta += g as f64 * snp.ln_hr2();
                }
                eta
            })
            .collect();

        GenotypeDistribution::MonteCarlo {
            etas,
            n: sample_size,
        }
    }

    pub fn size(&self) -> usize {
        match self {
            GenotypeDistribution::Exact { etas, .. } => etas.len(),
            GenotypeDistribution::MonteCarlo { etas, .. } => etas.len(),
        }
    }

    pub fn eta(&self, i: usize) -> f64 {
        match self {
            GenotypeDistribution::Exact { etas, .. } => etas[i],
            GenotypeDistribution::MonteCarlo { etas, .. } => etas[i],
        }
    }

    /// `exp(lnP[i])` for `Exact`, `1/N` for `MonteCarlo`.
    pub fn weight(&self, i: usize) -> f64 {
        match self {
            GenotypeDistribution::Exact { ln_probs, .. } => ln_probs[i].exp(),
            GenotypeDistribution::MonteCarlo { n, .. } => 1.0 / (*n as f64),
        }
    }

    /// Stored lnP\[i\]; only meaningful for `Exact`. Callers must branch on
    /// `is_exact` before relying on a `Some` result.
    pub fn ln_prob(&self, i: usize) -> Option<f64> {
        match self {
            GenotypeDistribution::Exact { ln_probs, .. } => Some(ln_probs[i]),
            GenotypeDistribution::MonteCarlo { .. } => None,
        }
    }

    pub fn is_exact(&self) -> bool {
        matches!(self, GenotypeDistribution::Exact { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snp::Orientation;
    use approx::assert_relative_eq;

    #[test]
    fn k_equals_one_yields_hwe_triple() {
        let snp = Snp::new("rs1", "pub", "A", "G", Orientation::Forward, 0.2, 0.5).unwrap();
        let dist = GenotypeDistribution::exact(&[snp], 1e-10).unwrap();
        assert_eq!(dist.size(), 3);
        let probs: Vec<f64> = (0..3).map(|i| dist.weight(i)).collect();
        let p = 0.2;
        let mut sorted = probs.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let mut expected = vec![(1.0 - p) * (1.0 - p), 2.0 * p * (1.0 - p), p * p];
        expected.sort_by(|a, b| a.partial_cmp(b).unwrap());
        for (got, want) in sorted.iter().zip(expected.iter()) {
            assert_relative_eq!(got, want, epsilon = 1e-12);
        }
    }

    #[test]
    fn two_snp_exact_sums_to_one() {
        let snp1 = Snp::new("rs1", "pub", "A", "G", Orientation::Forward, 0.3, 2f64.ln()).unwrap();
        let snp2 = Snp::new("rs2", "pub", "C", "T", Orientation::Forward, 0.4, 1.5f64.ln()).unwrap();
        let dist = GenotypeDistribution::exact(&[snp1, snp2], 1e-10).unwrap();
        assert_eq!(dist.size(), 9);
        let total: f64 = (0..dist.size()).map(|i| dist.weight(i)).sum();
        assert_relative_eq!(total, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn monte_carlo_has_no_ln_prob() {
        let snp = Snp::new("rs1", "pub", "A", "G", Orientation::Forward, 0.2, 0.5).unwrap();
        let dist = GenotypeDistribution::monte_carlo(&[snp], 1000, 314_159_265);
        assert_eq!(dist.size(), 1000);
        assert!(dist.ln_prob(0).is_none());
        assert_relative_eq!(dist.weight(0), 1.0 / 1000.0);
    }
}
