//! Age harmonization and imputation pipeline
//!
//! This module turns the raw `age`, `infant_age` and `age_category` fields of
//! a sample-metadata table into one consistent age per sample:
//!
//! 1. Ingest & filter: select age columns and drop rows without age data
//! 2. Reconciliation: resolve disagreements between the three fields
//! 3. Category-aware imputation: fill missing values per category
//! 4. Unit harmonization: express every value in years
//!
//! Each stage is a transformation over the working set of records, so the
//! stages can be used and tested on their own.

pub mod impute;
pub mod ingest;
pub mod output;
pub mod pipeline;
pub mod reconcile;
pub mod report;
pub mod statistics;

// Re-export key types
pub use impute::{ImputationOptions, ImputationStrategy, StrategyTable, impute_missing};
pub use ingest::{IngestResult, ingest_batches, is_age_column, select_age_columns};
pub use output::harmonize_record;
pub use pipeline::{AgeHarmonizer, HarmonizationOutput};
pub use reconcile::{ReconciliationSummary, reconcile, reconcile_all};
pub use report::{CategorySummary, HarmonizationReport, ImputationReport};
pub use statistics::ReferenceDistribution;
