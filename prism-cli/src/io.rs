use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use prism_core::{Genotypes, Orientation, RiskPrediction, Snp};

use crate::errors::Error;

fn tsv_reader(path: &Path) -> Result<csv::Reader<std::fs::File>> {
    csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))
}

fn parse_orientation(path: &Path, value: &str) -> Result<Orientation, Error> {
    match value.trim() {
        "Forward" => Ok(Orientation::Forward),
        "Reverse" => Ok(Orientation::Reverse),
        other => Err(Error::InvalidOrientation {
            path: path.to_path_buf(),
            value: other.to_string(),
        }),
    }
}

#[derive(Debug, Deserialize)]
struct SnpRow {
    #[serde(rename = "modelID")]
    model_id: String,
    #[serde(rename = "rsID")]
    rs_id: String,
    #[serde(rename = "sourcePub")]
    source_pub: String,
    allele1: String,
    allele2: String,
    #[serde(rename = "orientRs")]
    orient_rs: String,
    #[serde(rename = "allele2Freq")]
    allele2_freq: f64,
    #[serde(rename = "allele2lnHR")]
    allele2_ln_hr: f64,
}

/// Reads the build-time SNP table (spec.md §6.1), keeping only rows for
/// `model_id`, in file order (SNP storage order is the order rows appear
/// in this table).
pub fn load_snp_table(path: &Path, model_id: &str) -> Result<Vec<Snp>> {
    let mut reader = tsv_reader(path)?;
    let mut snps = Vec::new();
    for result in reader.deserialize() {
        let row: SnpRow =
            result.with_context(|| format!("parsing SNP row in {}", path.display()))?;
        if row.model_id != model_id {
            continue;
        }
        let orient = parse_orientation(path, &row.orient_rs)?;
        let snp = Snp::new(
            row.rs_id,
            row.source_pub,
            row.allele1,
            row.allele2,
            orient,
            row.allele2_freq,
            row.allele2_ln_hr,
        )?;
        snps.push(snp);
    }
    if snps.is_empty() {
        return Err(Error::UnknownModelId {
            path: path.to_path_buf(),
            model_id: model_id.to_string(),
        }
        .into());
    }
    Ok(snps)
}

#[derive(Debug, Deserialize)]
struct IncidenceRow {
    #[serde(rename = "modelID")]
    model_id: String,
    #[serde(rename = "ageYrs")]
    age_yrs: u32,
    #[serde(rename = "annInc")]
    ann_inc: f64,
}

/// Reads the build-time annual-incidence table (spec.md §6.1), keeping
/// only rows for `model_id`, in file order.
pub fn load_incidence_table(path: &Path, model_id: &str) -> Result<Vec<(u32, f64)>> {
    let mut reader = tsv_reader(path)?;
    let mut rows = Vec::new();
    for result in reader.deserialize() {
        let row: IncidenceRow =
            result.with_context(|| format!("parsing incidence row in {}", path.display()))?;
        if row.model_id != model_id {
            continue;
        }
        rows.push((row.age_yrs, row.ann_inc));
    }
    if rows.is_empty() {
        return Err(Error::UnknownModelId {
            path: path.to_path_buf(),
            model_id: model_id.to_string(),
        }
        .into());
    }
    Ok(rows)
}

#[derive(Debug, Deserialize)]
struct MapRow {
    #[serde(rename = "rsID")]
    rs_id: String,
    #[serde(rename = "orientRs")]
    orient_rs: String,
}

/// Reads the predict-time map descriptor (spec.md §6.2): an ordered list
/// of `(rsID, orientRs)` that fixes the column order of the genotype rows
/// that follow it.
pub fn load_map_descriptor(path: &Path) -> Result<Vec<(String, Orientation)>> {
    let mut reader = tsv_reader(path)?;
    let mut descriptor = Vec::new();
    for result in reader.deserialize() {
        let row: MapRow =
            result.with_context(|| format!("parsing map descriptor in {}", path.display()))?;
        let orient = parse_orientation(path, &row.orient_rs)?;
        descriptor.push((row.rs_id, orient));
    }
    Ok(descriptor)
}

/// Reads predict-time genotype rows (spec.md §6.2): `indivID` then 2k
/// allele tokens in the order fixed by `descriptor`.
pub fn load_genotype_rows(path: &Path, descriptor: &[(String, Orientation)]) -> Result<Vec<Genotypes>> {
    let mut reader = tsv_reader(path)?;
    let expected = 1 + 2 * descriptor.len();

    let mut individuals = Vec::new();
    for result in reader.records() {
        let record = result.with_context(|| format!("parsing genotype row in {}", path.display()))?;
        if record.len() != expected {
            return Err(Error::GenotypeRowLength {
                indiv_id: record.get(0).unwrap_or("?").to_string(),
                found: record.len(),
                expected,
            }
            .into());
        }

        let indiv_id = record.get(0).unwrap().to_string();
        let mut genotypes = Genotypes::new(&indiv_id);
        for (i, (rs_id, orient)) in descriptor.iter().enumerate() {
            let a1 = record.get(1 + 2 * i).unwrap();
            let a2 = record.get(2 + 2 * i).unwrap();
            genotypes
                .insert(rs_id.clone(), a1, a2, Some(*orient))
                .with_context(|| format!("individual {} at {}", indiv_id, rs_id))?;
        }
        individuals.push(genotypes);
    }
    Ok(individuals)
}

/// Writes predict-time output rows (spec.md §6.3): one row per individual
/// per model.
pub fn write_predictions(path: &Path, predictions: &[RiskPrediction]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;

    if let Some(first) = predictions.first() {
        let mut header: Vec<String> = vec!["indivID".into(), "modelName".into()];
        header.extend(first.genotypes_used.keys().cloned());
        header.push("PI".into());
        header.push("PIPctl".into());
        header.extend(first.times.iter().map(|t| format!("predCumRisk_t{}", t)));
        writer.write_record(&header)?;
    }

    for prediction in predictions {
        let mut fields: Vec<String> = vec![prediction.indiv_id.clone(), prediction.model_name.clone()];
        fields.extend(prediction.genotypes_used.values().cloned());
        fields.push(prediction.pi.to_string());
        fields.push(prediction.pi_pctl.to_string());
        fields.extend(prediction.pred_cum_risk.iter().map(|r| r.to_string()));
        writer.write_record(&fields)?;
    }
    writer.flush()?;
    Ok(())
}
