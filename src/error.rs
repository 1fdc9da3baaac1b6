use thiserror::Error;

/// Input-validation failures of the calculator and scenario helpers.
#[derive(Debug, Error, PartialEq)]
pub enum FootprintError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("undefined ratio: {0}")]
    UndefinedRatio(&'static str),
}

/// Failures while loading or resolving lookup tables.
#[derive(Debug, Error)]
pub enum TableError {
    #[error("lookup table `{table}` has no entry for `{key}`")]
    MissingEntry { table: &'static str, key: String },
    #[error("lookup table `{table}` holds an invalid factor {value} for `{key}`")]
    InvalidFactor {
        table: &'static str,
        key: String,
        value: f64,
    },
    #[error("failed to read lookup tables: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse lookup tables: {0}")]
    Parse(#[from] serde_json::Error),
}
