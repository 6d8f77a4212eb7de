//! Writing harmonized ages
//!
//! Harmonized rows are converted to an Arrow record batch with `serde_arrow`
//! and written as comma-separated text with a header line and no index
//! column.

use std::fs::File;
use std::path::Path;
use std::time::Instant;

use arrow::csv::WriterBuilder;
use arrow::record_batch::RecordBatch;
use arrow_schema::FieldRef;
use serde_arrow::schema::{SchemaLike, TracingOptions};

use crate::algorithm::harmonize::HarmonizationReport;
use crate::error::Result;
use crate::models::{HarmonizedAge, OutputRow};
use crate::utils::{log_operation_complete, log_operation_start};

/// Output column names, in order
pub const OUTPUT_COLUMNS: [&str; 6] = [
    "Source",
    "Original_Value",
    "Original_Unit",
    "Harmonized_Value",
    "Harmonized_Unit",
    "Harmonized_Age_Group",
];

/// Arrow fields of the output table
pub fn output_fields() -> Result<Vec<FieldRef>> {
    Ok(Vec::<FieldRef>::from_type::<OutputRow>(
        TracingOptions::default(),
    )?)
}

/// Convert harmonized rows to a record batch
pub fn to_record_batch(rows: &[HarmonizedAge]) -> Result<RecordBatch> {
    let fields = output_fields()?;
    let output: Vec<OutputRow> = rows.iter().map(OutputRow::from).collect();
    Ok(serde_arrow::to_record_batch(&fields, &output)?)
}

/// Write a record batch as CSV with a header line
pub fn write_csv(path: &Path, batch: &RecordBatch) -> Result<()> {
    let start = Instant::now();
    log_operation_start("Writing harmonized table to", path);

    let file = File::create(path)?;
    let mut writer = WriterBuilder::new().with_header(true).build(file);
    writer.write(batch)?;

    log_operation_complete("wrote", path, batch.num_rows(), Some(start.elapsed()));
    Ok(())
}

/// Write harmonized rows as CSV
pub fn write_harmonized_csv(path: &Path, rows: &[HarmonizedAge]) -> Result<()> {
    write_csv(path, &to_record_batch(rows)?)
}

/// Write a run report as JSON
pub fn write_report_json(path: &Path, report: &HarmonizationReport) -> Result<()> {
    std::fs::write(path, report.to_json()?)?;
    log::info!("Wrote harmonization report to {}", path.display());
    Ok(())
}
