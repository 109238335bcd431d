//! Engine-level error types (spec §7).

use boxscan_data::DataError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BoxscanError {
    #[error(transparent)]
    Data(#[from] DataError),

    #[error("invalid engine configuration: {0}")]
    IncoherentConfig(String),

    #[error("scoring function raised: {0}")]
    ScoreFunctionError(String),

    #[error("internal invariant violated: {0}")]
    InvariantViolation(String),
}

pub type Result<T> = std::result::Result<T, BoxscanError>;
