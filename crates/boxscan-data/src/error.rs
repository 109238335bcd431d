//! Data-layer error types.

use boxscan_types::ColumnName;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DataError {
    #[error("extract requested with no source and no in-memory data")]
    MissingSource,

    #[error("source kind {0:?} is not recognised")]
    UnsupportedSource(String),

    #[error("select called on predicate over column {0} with no cached mask and no data")]
    MissingMask(ColumnName),
}

pub type Result<T> = std::result::Result<T, DataError>;
