//! Raw, pre-search cell values as they arrive from an external collaborator
//! (CSV reader, SQL driver, ...).

use std::fmt::{self, Display};

/// A single cell of the table before any dtype conversion.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Null,
    Nominal(String),
    Ordinal(i64),
    Numeric(f64),
    Binary(u8),
}

impl Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Null => write!(f, "null"),
            RawValue::Nominal(s) => write!(f, "{s}"),
            RawValue::Ordinal(v) => write!(f, "{v}"),
            RawValue::Numeric(v) => write!(f, "{v}"),
            RawValue::Binary(v) => write!(f, "{v}"),
        }
    }
}
