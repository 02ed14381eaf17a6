use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use structopt::StructOpt;

use prism_core::{RiskModel, RiskModelConfig, SerializedRiskModel};

use crate::io;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "prism",
    about = "A polygenic Cox risk-model engine.",
    setting = structopt::clap::AppSettings::ColoredHelp,
)]
pub struct Opt {
    #[structopt(
        short,
        long,
        parse(from_occurrences),
        help = "Increase log verbosity (-v for debug, -vv for trace; default is info)."
    )]
    pub verbose: u8,
    #[structopt(subcommand)]
    pub command: Prism,
}

impl Opt {
    /// Maps the repeated `-v` count to a `fern`/`log` level filter: 0 -> Info,
    /// 1 -> Debug, 2 or more -> Trace.
    pub fn log_level(&self) -> log::LevelFilter {
        match self.verbose {
            0 => log::LevelFilter::Info,
            1 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }
}

#[derive(Debug, StructOpt)]
pub enum Prism {
    #[structopt(
        name = "build-model",
        about = "Build a risk model from a SNP table and an annual-incidence table, \
                 and serialize it to JSON.",
        setting = structopt::clap::AppSettings::ColoredHelp,
    )]
    BuildModel {
        #[structopt(long = "model-id", help = "modelID selecting rows from the input tables.")]
        model_id: String,
        #[structopt(long, help = "Display name recorded on the model (defaults to model-id).")]
        name: Option<String>,
        #[structopt(
            parse(from_os_str),
            long = "snp-table",
            help = "Tab-delimited SNP table (modelID, rsID, sourcePub, allele1, allele2, orientRs, allele2Freq, allele2lnHR)."
        )]
        snp_table: PathBuf,
        #[structopt(
            parse(from_os_str),
            long = "incidence-table",
            help = "Tab-delimited annual-incidence table (modelID, ageYrs, annInc), contiguous from ageYrs=0."
        )]
        incidence_table: PathBuf,
        #[structopt(
            long,
            help = "Force exact 3^k genotype enumeration (fails if k exceeds max-snps-exact)."
        )]
        exact: bool,
        #[structopt(
            long = "monte-carlo",
            help = "Force Monte Carlo genotype sampling, even if exact enumeration would be feasible."
        )]
        monte_carlo: bool,
        #[structopt(
            long = "max-snps-exact",
            default_value = "15",
            help = "Largest SNP count for which exact enumeration is attempted by default."
        )]
        max_snps_exact: usize,
        #[structopt(
            parse(from_os_str),
            long,
            short = "o",
            help = "Path to write the serialized model (JSON)."
        )]
        output: PathBuf,
    },
    #[structopt(
        name = "predict",
        about = "Evaluate a serialized risk model over a table of individual genotypes.",
        setting = structopt::clap::AppSettings::ColoredHelp,
    )]
    Predict {
        #[structopt(parse(from_os_str), long, help = "Serialized model (JSON), as written by build-model.")]
        model: PathBuf,
        #[structopt(
            parse(from_os_str),
            long = "map",
            help = "Ordered (rsID, orientRs) map descriptor fixing the genotype-row column order."
        )]
        map: PathBuf,
        #[structopt(
            parse(from_os_str),
            long,
            help = "Tab-delimited genotype rows: indivID then 2k allele tokens in map-descriptor order."
        )]
        genotypes: PathBuf,
        #[structopt(
            parse(from_os_str),
            long,
            short = "o",
            help = "Path to write predict-time output rows (tab-delimited)."
        )]
        output: PathBuf,
    },
}

pub fn run(opt: Prism) -> Result<()> {
    match opt {
        Prism::BuildModel {
            model_id,
            name,
            snp_table,
            incidence_table,
            exact,
            monte_carlo,
            max_snps_exact,
            output,
        } => {
            let use_exact = match (exact, monte_carlo) {
                (true, true) => bail!("--exact and --monte-carlo are mutually exclusive"),
                (true, false) => Some(true),
                (false, true) => Some(false),
                (false, false) => None,
            };

            let snps = io::load_snp_table(&snp_table, &model_id)?;
            let incidence_rows = io::load_incidence_table(&incidence_table, &model_id)?;
            let (times, marg_surv) = prism_core::annual_incidence_to_survivor(&incidence_rows)?;

            let mut config = RiskModelConfig::default();
            config.max_snps_exact = max_snps_exact;

            let model = RiskModel::build(
                name.unwrap_or_else(|| model_id.clone()),
                snps,
                times,
                marg_surv,
                use_exact,
                config,
            )?;

            let serialized = model.to_serialized();
            let json = serde_json::to_string_pretty(&serialized)
                .context("serializing risk model to JSON")?;
            fs::write(&output, json)
                .with_context(|| format!("writing model to {}", output.display()))?;
            log::info!(
                "built model {:?} from {} SNPs ({}), wrote {}",
                model.name(),
                model.snps().len(),
                if model.is_exact() { "exact" } else { "Monte Carlo" },
                output.display()
            );
            Ok(())
        }
        Prism::Predict {
            model,
            map,
            genotypes,
            output,
        } => {
            let json = fs::read_to_string(&model)
                .with_context(|| format!("reading model from {}", model.display()))?;
            let serialized: SerializedRiskModel =
                serde_json::from_str(&json).context("parsing serialized risk model")?;
            let risk_model = RiskModel::from_serialized(serialized)?;

            let descriptor = io::load_map_descriptor(&map)?;
            let individuals = io::load_genotype_rows(&genotypes, &descriptor)?;

            let predictions = individuals
                .iter()
                .map(|genotypes| risk_model.get_risk_prediction(genotypes))
                .collect::<Result<Vec<_>, _>>()?;

            io::write_predictions(&output, &predictions)?;
            log::info!(
                "predicted {} individuals against model {:?}, wrote {}",
                predictions.len(),
                risk_model.name(),
                output.display()
            );
            Ok(())
        }
    }
}
