//! Error types for the fetch, reshape and render stages.
//!
//! Only [`TrendError::CountryLookupMiss`] is recovered from; everything else
//! aborts the run.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrendError {
    /// The source feed could not be read or decoded.
    #[error("Failed to fetch source '{source_name}': {message}")]
    Fetch {
        source_name: String,
        message: String,
    },

    /// A date column label did not match `M/D/YY`.
    #[error("Date column label '{label}' does not match M/D/YY")]
    DateParse { label: String },

    /// A requested country has no rows in the tidy table.
    #[error("No country {country}")]
    CountryLookupMiss { country: String },

    /// The country listing could not be read.
    #[error("Failed to read country listing: {0}")]
    Listing(String),

    /// Writing the chart failed.
    #[error("Failed to render chart: {0}")]
    Render(String),
}

impl TrendError {
    pub fn fetch(source_name: &str, message: impl ToString) -> Self {
        TrendError::Fetch {
            source_name: source_name.to_string(),
            message: message.to_string(),
        }
    }
}

impl From<serde_json::Error> for TrendError {
    fn from(err: serde_json::Error) -> Self {
        TrendError::Render(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TrendError>;
