//! Error types for loading and deriving case/death series.

use thiserror::Error;

/// Result type alias for series operations.
pub type Result<T> = std::result::Result<T, SeriesError>;

#[derive(Error, Debug)]
pub enum SeriesError {
    /// A required field is missing or could not be parsed.
    ///
    /// `row` is the 1-based data row (the header is row 0); `None` when the
    /// whole column is missing from the header.
    #[error("data format error: field `{field}`{}: {reason}", row_suffix(.row))]
    DataFormat {
        row: Option<usize>,
        field: String,
        reason: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("fetch error: {0}")]
    Fetch(String),

    #[error("configuration error: {name} = {value:?}, {reason}")]
    Config {
        name: String,
        value: String,
        reason: String,
    },
}

impl SeriesError {
    pub fn data_format(row: Option<usize>, field: &str, reason: impl Into<String>) -> Self {
        SeriesError::DataFormat {
            row,
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    /// Returns `true` for structural input problems the caller should surface.
    pub fn is_data_format(&self) -> bool {
        matches!(self, SeriesError::DataFormat { .. })
    }
}

impl From<reqwest::Error> for SeriesError {
    fn from(err: reqwest::Error) -> Self {
        SeriesError::Fetch(err.to_string())
    }
}

fn row_suffix(row: &Option<usize>) -> String {
    match row {
        Some(row) => format!(" (row {row})"),
        None => String::new(),
    }
}
