//! A Rust library for reconciling, imputing and harmonizing the age fields of
//! biomedical sample-metadata tables.
//!
//! The [`AgeHarmonizer`] reads the `age`, `infant_age` and `age_category`
//! columns of an Arrow table and produces one year-based age and age group
//! per sample.

pub mod algorithm;
pub mod async_io;
pub mod config;
pub mod error;
pub mod models;
pub mod reader;
pub mod utils;
pub mod writer;

// Re-export the most common types for easier use
// Core types
pub use algorithm::harmonize::{
    AgeHarmonizer, HarmonizationOutput, HarmonizationReport, ImputationStrategy, StrategyTable,
};
pub use config::{EmptyReferencePolicy, HarmonizerConfig, ReferenceUnits};
pub use error::{HarmonizerError, Result};
pub use models::{AgeCategory, AgeRecord, AgeUnit, HarmonizedAge, OutputRow, ValueSource};

// Arrow types
pub use arrow::record_batch::RecordBatch;

// Table I/O
pub use async_io::load_input_async;
pub use reader::{load_input, read_table};
pub use writer::{to_record_batch, write_harmonized_csv, write_report_json};
