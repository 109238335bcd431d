//! Column identity.

use std::fmt::{self, Debug, Display};

/// Name of a table column.
///
/// Wraps a `String` so that column identity never leaks into signatures as a
/// bare `&str`/`String`, the way table and column names are wrapped
/// throughout the query layer this crate is modeled on.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ColumnName(String);

impl ColumnName {
    /// Creates a new column name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the column name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Debug for ColumnName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ColumnName({:?})", self.0)
    }
}

impl Display for ColumnName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ColumnName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ColumnName {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}
