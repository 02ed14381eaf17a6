use thiserror::Error;

/// Errors produced by the PRISM risk-model engine.
///
/// Construction-time variants (`InvalidSnp`, `InvalidArgument`, `InvalidInput`,
/// `NumericInvariant`, `SolverFailed`) are fatal to whatever is being built.
/// `InvalidGenotype` is the only variant that can occur at prediction time; it
/// is per-individual and never poisons the `RiskModel` that produced it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("invalid input: {msg}")]
    InvalidInput { msg: String },

    #[error("invalid argument: {msg}")]
    InvalidArgument { msg: String },

    #[error("invalid SNP: {msg}")]
    InvalidSnp { msg: String },

    #[error("invalid genotype: {msg}")]
    InvalidGenotype { msg: String },

    #[error("numeric invariant violated: {msg}")]
    NumericInvariant { msg: String },

    #[error("root-finder failed to converge: {msg}")]
    SolverFailed {
        msg: String,
        #[source]
        cause: Option<Box<Error>>,
    },
}

impl Error {
    pub(crate) fn invalid_input(msg: impl Into<String>) -> Self {
        Error::InvalidInput { msg: msg.into() }
    }

    pub(crate) fn invalid_argument(msg: impl Into<String>) -> Self {
        Error::InvalidArgument { msg: msg.into() }
    }

    pub(crate) fn invalid_snp(msg: impl Into<String>) -> Self {
        Error::InvalidSnp { msg: msg.into() }
    }

    pub(crate) fn invalid_genotype(msg: impl Into<String>) -> Self {
        Error::InvalidGenotype { msg: msg.into() }
    }

    pub(crate) fn numeric_invariant(msg: impl Into<String>) -> Self {
        Error::NumericInvariant { msg: msg.into() }
    }

    pub(crate) fn solver_failed(msg: impl Into<String>, cause: Option<Error>) -> Self {
        Error::SolverFailed {
            msg: msg.into(),
            cause: cause.map(Box::new),
        }
    }
}
