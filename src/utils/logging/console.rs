//! Console output utilities
//!
//! This module provides utilities for summarizing input tables on the console.

use arrow::record_batch::RecordBatch;

/// Print summary information about loaded record batches
pub fn print_batch_summary(batches: &[RecordBatch], elapsed: std::time::Duration) {
    println!("Read {} record batches in {:?}", batches.len(), elapsed);
    println!(
        "Total rows: {}",
        batches.iter().map(RecordBatch::num_rows).sum::<usize>()
    );
}

/// Print the columns of a batch, marking those selected as age columns
pub fn print_schema_info(batch: &RecordBatch, age_columns: &[String]) {
    println!("Schema:");
    for field in batch.schema().fields() {
        let marker = if age_columns.iter().any(|c| c == field.name()) {
            " [age]"
        } else {
            ""
        };
        println!("  - {} ({}){marker}", field.name(), field.data_type());
    }
}
