//! Ingest and filter stage
//!
//! Selects the age columns of a metadata table and turns each row into an
//! [`AgeRecord`], dropping rows that carry no age information at all.

use arrow::array::ArrayRef;
use arrow::datatypes::{DataType, Schema};
use arrow::record_batch::RecordBatch;
use itertools::Itertools;
use log::{debug, info};

use crate::error::{HarmonizerError, Result};
use crate::models::{AgeCategory, AgeRecord};
use crate::utils::arrow_utils::{
    arrow_array_to_numeric, arrow_array_to_string, column_by_name, is_numeric_type,
};

/// Age in years
pub const AGE_COLUMN: &str = "age";
/// Age in days for infants
pub const INFANT_AGE_COLUMN: &str = "infant_age";
/// Life-stage category
pub const AGE_CATEGORY_COLUMN: &str = "age_category";

/// Columns the pipeline cannot run without
pub const REQUIRED_COLUMNS: [&str; 3] = [AGE_COLUMN, INFANT_AGE_COLUMN, AGE_CATEGORY_COLUMN];

/// Whether a column name carries an underscore-bounded `age` token.
///
/// `age`, `infant_age`, `age_category` and `average_age` match;
/// `disease_stage` and `agent` do not.
#[must_use]
pub fn is_age_column(name: &str) -> bool {
    name.split('_')
        .any(|token| token.eq_ignore_ascii_case(AGE_COLUMN))
}

/// Names of all age columns in a schema, in schema order
#[must_use]
pub fn select_age_columns(schema: &Schema) -> Vec<String> {
    schema
        .fields()
        .iter()
        .map(|field| field.name())
        .filter(|name| is_age_column(name))
        .cloned()
        .collect_vec()
}

/// Check that a schema carries every required column
///
/// # Errors
/// Returns `MissingRequiredColumn` naming the first absent column
pub fn validate_required_columns(schema: &Schema) -> Result<()> {
    for column in REQUIRED_COLUMNS {
        if schema.index_of(column).is_err() {
            return Err(HarmonizerError::MissingRequiredColumn(column.to_string()));
        }
    }
    Ok(())
}

/// Working set produced by the ingest stage
#[derive(Debug, Clone, Default)]
pub struct IngestResult {
    /// Records with at least one age field present
    pub records: Vec<AgeRecord>,
    /// Age columns found in the input, across all batches
    pub age_columns: Vec<String>,
    /// Rows read from the input
    pub input_rows: usize,
    /// Rows dropped because all three source fields were missing
    pub dropped_rows: usize,
}

/// Read the age fields of every row in `batches`
///
/// Row numbers continue across batches so errors and records refer to the
/// position in the concatenated table.
///
/// # Errors
/// Returns an error if a required column is missing or a cell is invalid
pub fn ingest_batches(batches: &[RecordBatch]) -> Result<IngestResult> {
    let mut result = IngestResult::default();

    for batch in batches {
        let schema = batch.schema();
        validate_required_columns(&schema)?;
        result.age_columns.extend(select_age_columns(&schema));

        let records = extract_records(batch, result.input_rows)?;
        result.input_rows += batch.num_rows();

        let (kept, dropped): (Vec<_>, Vec<_>) =
            records.into_iter().partition(|record| !record.is_empty());
        result.dropped_rows += dropped.len();
        result.records.extend(kept);
    }

    result.age_columns = result.age_columns.into_iter().unique().collect_vec();

    info!(
        "Selected age columns [{}]; kept {} of {} rows",
        result.age_columns.join(", "),
        result.records.len(),
        result.input_rows
    );
    if result.dropped_rows > 0 {
        debug!(
            "Dropped {} rows without age, infant_age or age_category",
            result.dropped_rows
        );
    }

    Ok(result)
}

/// Extract raw age records from one batch
///
/// # Arguments
/// * `batch` - Batch holding the required columns
/// * `row_offset` - Row number of the first row of the batch
///
/// # Errors
/// Returns an error if a required column is missing, a numeric cell is not a
/// non-negative number or a category is unrecognized
pub fn extract_records(batch: &RecordBatch, row_offset: usize) -> Result<Vec<AgeRecord>> {
    let age_col = column_by_name(batch, AGE_COLUMN)?;
    let infant_age_col = column_by_name(batch, INFANT_AGE_COLUMN)?;
    let category_col = column_by_name(batch, AGE_CATEGORY_COLUMN)?;
    check_numeric_column(age_col, AGE_COLUMN)?;
    check_numeric_column(infant_age_col, INFANT_AGE_COLUMN)?;

    (0..batch.num_rows())
        .map(|i| {
            let row = row_offset + i;
            let age = read_numeric(age_col, AGE_COLUMN, i, row)?;
            let infant_age = read_numeric(infant_age_col, INFANT_AGE_COLUMN, i, row)?;
            let age_category = arrow_array_to_string(category_col, i)?
                .map(|value| {
                    value
                        .parse::<AgeCategory>()
                        .map_err(|value| HarmonizerError::InvalidCategoryValue { value, row })
                })
                .transpose()?;

            Ok(AgeRecord::new(row, age, infant_age, age_category))
        })
        .collect()
}

/// Numeric age columns may hold numbers, text or nothing at all
fn check_numeric_column(array: &ArrayRef, column: &str) -> Result<()> {
    match array.data_type() {
        data_type if is_numeric_type(data_type) => Ok(()),
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Null => Ok(()),
        _ => Err(HarmonizerError::ColumnTypeError {
            column: column.to_string(),
            expected: "numeric or text".to_string(),
        }),
    }
}

fn read_numeric(
    array: &ArrayRef,
    column: &str,
    index: usize,
    row: usize,
) -> Result<Option<f64>> {
    let invalid = |value: String| HarmonizerError::InvalidNumericValue {
        column: column.to_string(),
        row,
        value,
    };

    match arrow_array_to_numeric(array, index).map_err(invalid)? {
        Some(value) if !value.is_finite() || value < 0.0 => Err(invalid(value.to_string())),
        value => Ok(value),
    }
}
