//! Error handling for the age harmonizer.

use arrow::error::ArrowError;
use parquet::errors::ParquetError;

use crate::models::AgeCategory;

/// Specialized error type for the harmonization pipeline and its table I/O
#[derive(Debug, thiserror::Error)]
pub enum HarmonizerError {
    /// One of `age`, `infant_age` or `age_category` is absent from the input
    #[error("Required column '{0}' not found in input table")]
    MissingRequiredColumn(String),

    /// A category needing imputation has no observed values to draw from
    #[error(
        "Cannot impute category '{category}': no observed values for {missing} rows needing imputation"
    )]
    EmptyReferenceDistribution {
        /// Category whose reference distribution is empty
        category: AgeCategory,
        /// Number of rows in that category with a missing value
        missing: usize,
    },

    /// `age_category` holds a value outside the recognized categories
    #[error("Invalid age category '{value}' in row {row}")]
    InvalidCategoryValue {
        /// The offending cell value
        value: String,
        /// Zero-based input row
        row: usize,
    },

    /// A numeric age cell could not be interpreted as a non-negative number
    #[error("Invalid numeric value '{value}' in column '{column}', row {row}")]
    InvalidNumericValue {
        /// Column name
        column: String,
        /// Zero-based input row
        row: usize,
        /// The offending cell value
        value: String,
    },

    /// A column has an Arrow type the extractor cannot read
    #[error("Column '{column}' is not a {expected} array")]
    ColumnTypeError {
        /// Column name
        column: String,
        /// Expected kind of array
        expected: String,
    },

    /// Error opening, reading or writing a file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error building or converting Arrow data
    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),

    /// Error reading Parquet data
    #[error("Parquet error: {0}")]
    Parquet(#[from] ParquetError),

    /// Error converting rows to record batches or reports to JSON
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<serde_arrow::Error> for HarmonizerError {
    fn from(error: serde_arrow::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

impl From<serde_json::Error> for HarmonizerError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

/// Result type for harmonizer operations
pub type Result<T> = std::result::Result<T, HarmonizerError>;
