use std::path::PathBuf;

use thiserror::Error;

/// Glue-layer errors: malformed tabular input, serialization, and the
/// handful of CLI-only invariants that `prism-core` has no opinion on.
/// Errors from the core engine itself are propagated through `anyhow`
/// rather than wrapped here.
#[derive(Error, Debug)]
pub enum Error {
    #[error("{path}: model id {model_id:?} has no rows in this table")]
    UnknownModelId { path: PathBuf, model_id: String },
    #[error("{path}: unrecognized orientation {value:?} (expected Forward or Reverse)")]
    InvalidOrientation { path: PathBuf, value: String },
    #[error("genotype row for {indiv_id} has {found} allele tokens, expected {expected} (2 per SNP in the map descriptor)")]
    GenotypeRowLength {
        indiv_id: String,
        found: usize,
        expected: usize,
    },
}
