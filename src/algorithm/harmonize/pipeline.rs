//! The age harmonization pipeline
//!
//! Runs the four stages over a table in one pass:
//! ingest and filter, reconciliation, category-aware imputation, and unit
//! harmonization.

use std::time::Instant;

use arrow::record_batch::RecordBatch;
use chrono::Utc;
use log::info;
use rand::Rng;

use super::impute::{ImputationOptions, StrategyTable, impute_missing};
use super::ingest::{IngestResult, ingest_batches};
use super::output::harmonize_record;
use super::reconcile::reconcile_all;
use super::report::HarmonizationReport;
use crate::config::HarmonizerConfig;
use crate::error::Result;
use crate::models::{AgeRecord, HarmonizedAge};
use crate::utils::logging::{create_stage_progress_bar, finish_progress_bar};
use crate::utils::log_stage_complete;

/// Harmonized rows together with the report of the run that produced them
#[derive(Debug, Clone)]
pub struct HarmonizationOutput {
    /// One row per retained input row, in input order
    pub rows: Vec<HarmonizedAge>,
    pub report: HarmonizationReport,
}

impl HarmonizationOutput {
    /// Convert the rows to a record batch with the output columns
    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        crate::writer::to_record_batch(&self.rows)
    }
}

/// Reconciles, imputes and harmonizes sample ages
#[derive(Debug, Clone, Default)]
pub struct AgeHarmonizer {
    config: HarmonizerConfig,
    strategies: StrategyTable,
}

impl AgeHarmonizer {
    #[must_use]
    pub fn new(config: HarmonizerConfig) -> Self {
        Self {
            config,
            strategies: StrategyTable::default(),
        }
    }

    /// Use a custom category to strategy table
    #[must_use]
    pub fn with_strategies(mut self, strategies: StrategyTable) -> Self {
        self.strategies = strategies;
        self
    }

    #[must_use]
    pub fn config(&self) -> &HarmonizerConfig {
        &self.config
    }

    /// Harmonize a table using the random source described by the configuration
    pub fn harmonize_batches(&self, batches: &[RecordBatch]) -> Result<HarmonizationOutput> {
        let mut rng = self.config.rng();
        self.harmonize_batches_with_rng(batches, &mut rng)
    }

    /// Harmonize a table drawing samples from `rng`
    pub fn harmonize_batches_with_rng<R: Rng + ?Sized>(
        &self,
        batches: &[RecordBatch],
        rng: &mut R,
    ) -> Result<HarmonizationOutput> {
        let start = Instant::now();
        let ingest = ingest_batches(batches)?;
        log_stage_complete("Ingest & filter", ingest.records.len(), start.elapsed());

        self.run(ingest, rng)
    }

    /// Harmonize records that were already extracted from a table.
    ///
    /// Records with no age field at all are dropped as in table ingest.
    pub fn harmonize_records<R: Rng + ?Sized>(
        &self,
        records: Vec<AgeRecord>,
        rng: &mut R,
    ) -> Result<HarmonizationOutput> {
        let input_rows = records.len();
        let records: Vec<AgeRecord> = records.into_iter().filter(|r| !r.is_empty()).collect();

        let ingest = IngestResult {
            dropped_rows: input_rows - records.len(),
            records,
            age_columns: Vec::new(),
            input_rows,
        };
        self.run(ingest, rng)
    }

    fn run<R: Rng + ?Sized>(&self, ingest: IngestResult, rng: &mut R) -> Result<HarmonizationOutput> {
        let pb = create_stage_progress_bar(3, Some("Reconciling"), self.config.show_progress);

        let start = Instant::now();
        let (mut records, reconciliation) = reconcile_all(ingest.records);
        log_stage_complete("Reconciliation", records.len(), start.elapsed());
        pb.inc(1);
        pb.set_message("Imputing");

        let start = Instant::now();
        let options = ImputationOptions {
            strategies: &self.strategies,
            reference_units: self.config.reference_units,
            empty_reference_policy: self.config.empty_reference_policy,
        };
        let imputation = match impute_missing(&mut records, options, rng) {
            Ok(report) => report,
            Err(e) => {
                pb.abandon_with_message("Imputation failed");
                return Err(e);
            }
        };
        log_stage_complete("Imputation", records.len(), start.elapsed());
        pb.inc(1);
        pb.set_message("Harmonizing units");

        let start = Instant::now();
        let rows: Vec<HarmonizedAge> = records.iter().map(harmonize_record).collect();
        log_stage_complete("Unit harmonization", rows.len(), start.elapsed());
        pb.inc(1);
        finish_progress_bar(&pb, Some("Harmonization complete"));

        info!(
            "Harmonized {} rows ({} imputed, {} unresolved)",
            rows.len(),
            imputation.total_imputed(),
            imputation.total_unresolved()
        );

        let report = HarmonizationReport {
            generated_at: Utc::now(),
            random_seed: self.config.random_seed,
            age_columns: ingest.age_columns,
            input_rows: ingest.input_rows,
            dropped_rows: ingest.dropped_rows,
            output_rows: rows.len(),
            reconciliation,
            imputation,
        };

        Ok(HarmonizationOutput { rows, report })
    }
}
