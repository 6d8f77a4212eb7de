//! Arrow utility functions for extracting age cells
//!
//! This module provides helpers for reading individual values out of Arrow
//! arrays, treating the usual missing-value spellings of exported metadata
//! tables as nulls.

use arrow::array::{
    Array, ArrayRef, Float32Array, Float64Array, Int8Array, Int16Array, Int32Array, Int64Array,
    LargeStringArray, StringArray, UInt8Array, UInt16Array, UInt32Array, UInt64Array,
};
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use arrow::util::display::array_value_to_string;

use crate::error::{HarmonizerError, Result};

/// Cell spellings that mean "missing" (compared case-insensitively)
pub const MISSING_TOKENS: [&str; 5] = ["", "na", "nan", "null", "none"];

/// Whether a text cell spells a missing value
#[must_use]
pub fn is_missing_token(value: &str) -> bool {
    let trimmed = value.trim();
    MISSING_TOKENS
        .iter()
        .any(|token| trimmed.eq_ignore_ascii_case(token))
}

/// Get a column by name from a record batch
///
/// # Errors
/// Returns `MissingRequiredColumn` if the batch has no such column
pub fn column_by_name<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a ArrayRef> {
    let idx = batch
        .schema()
        .index_of(name)
        .map_err(|_| HarmonizerError::MissingRequiredColumn(name.to_string()))?;
    Ok(batch.column(idx))
}

/// Extract a text value from an Arrow array at the specified index
///
/// String arrays are read directly; any other type is rendered with Arrow's
/// display formatting. Nulls and missing tokens yield `None`.
///
/// # Errors
/// Returns an Arrow error if the value cannot be rendered
pub fn arrow_array_to_string(array: &ArrayRef, index: usize) -> Result<Option<String>> {
    if array.is_null(index) {
        return Ok(None);
    }

    let value = match array.data_type() {
        DataType::Utf8 => array
            .as_any()
            .downcast_ref::<StringArray>()
            .map(|a| a.value(index).to_string()),
        DataType::LargeUtf8 => array
            .as_any()
            .downcast_ref::<LargeStringArray>()
            .map(|a| a.value(index).to_string()),
        _ => None,
    };
    let value = match value {
        Some(value) => value,
        None => array_value_to_string(array, index)?,
    };

    Ok((!is_missing_token(&value)).then_some(value))
}

/// Extract an f64 value from a numeric Arrow array at the specified index
///
/// Returns `None` for nulls, NaN and non-numeric arrays.
#[must_use]
pub fn arrow_array_to_f64(array: &ArrayRef, index: usize) -> Option<f64> {
    if array.is_null(index) {
        return None;
    }

    let value = match array.data_type() {
        DataType::Int8 => f64::from(array.as_any().downcast_ref::<Int8Array>()?.value(index)),
        DataType::Int16 => f64::from(array.as_any().downcast_ref::<Int16Array>()?.value(index)),
        DataType::Int32 => f64::from(array.as_any().downcast_ref::<Int32Array>()?.value(index)),
        DataType::Int64 => array.as_any().downcast_ref::<Int64Array>()?.value(index) as f64,
        DataType::UInt8 => f64::from(array.as_any().downcast_ref::<UInt8Array>()?.value(index)),
        DataType::UInt16 => f64::from(array.as_any().downcast_ref::<UInt16Array>()?.value(index)),
        DataType::UInt32 => f64::from(array.as_any().downcast_ref::<UInt32Array>()?.value(index)),
        DataType::UInt64 => array.as_any().downcast_ref::<UInt64Array>()?.value(index) as f64,
        DataType::Float32 => {
            f64::from(array.as_any().downcast_ref::<Float32Array>()?.value(index))
        }
        DataType::Float64 => array.as_any().downcast_ref::<Float64Array>()?.value(index),
        _ => return None,
    };

    (!value.is_nan()).then_some(value)
}

/// Whether an Arrow type holds numbers
#[must_use]
pub fn is_numeric_type(data_type: &DataType) -> bool {
    matches!(
        data_type,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Extract a numeric cell from a numeric or text column
///
/// Text cells are parsed as numbers after missing tokens are filtered out.
/// An unparseable text cell is returned as `Err` with its raw content so the
/// caller can report it with row context.
///
/// # Errors
/// Returns the raw cell text when it is not a number
pub fn arrow_array_to_numeric(
    array: &ArrayRef,
    index: usize,
) -> std::result::Result<Option<f64>, String> {
    if is_numeric_type(array.data_type()) {
        return Ok(arrow_array_to_f64(array, index));
    }

    let text = arrow_array_to_string(array, index).map_err(|e| e.to_string())?;
    match text {
        None => Ok(None),
        Some(text) => text.trim().parse::<f64>().map(Some).map_err(|_| text),
    }
}
