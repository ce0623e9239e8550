use std::fmt;

/// A requested column (year population or metric) is absent from the dataset.
///
/// Never fatal: callers log it, show it as a warning and carry on with an
/// empty or degraded view.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MissingColumn {
    pub column: String,
}

impl MissingColumn {
    pub fn new(column: impl Into<String>) -> Self {
        Self { column: column.into() }
    }
}

impl fmt::Display for MissingColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} not found in dataset.", self.column)
    }
}

impl std::error::Error for MissingColumn {}
