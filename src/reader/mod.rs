//! Reading sample-metadata tables into Arrow record batches
//!
//! Tables may be delimited text (`.csv`, `.tsv`) or Parquet files, given as a
//! single file or as a directory of files.

use std::fs::File;
use std::io::Seek;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use arrow::csv::ReaderBuilder;
use arrow::csv::reader::Format;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use itertools::Itertools;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use rayon::prelude::*;

use crate::algorithm::harmonize::ingest::REQUIRED_COLUMNS;
use crate::error::{HarmonizerError, Result};
use crate::utils::{log_operation_complete, log_operation_start, log_warning};

/// Number of records inspected when inferring the schema of a text table
pub const SCHEMA_INFERENCE_RECORDS: usize = 1000;

/// Supported input table formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Csv,
    Tsv,
    Parquet,
}

impl TableFormat {
    /// Detect the format from a file extension
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "csv" => Some(Self::Csv),
            "tsv" | "tab" => Some(Self::Tsv),
            "parquet" => Some(Self::Parquet),
            _ => None,
        }
    }
}

/// Validates that a directory exists and is a directory
///
/// # Errors
/// Returns an error if the directory does not exist or is not a directory
pub fn validate_directory(dir: &Path) -> Result<()> {
    if !dir.is_dir() {
        return Err(HarmonizerError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Directory does not exist: {}", dir.display()),
        )));
    }
    Ok(())
}

fn open_file(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| {
        HarmonizerError::Io(std::io::Error::new(
            e.kind(),
            format!("Failed to open file {}: {}", path.display(), e),
        ))
    })
}

/// Read a delimited text table with a header line, inferring column types
///
/// # Errors
/// Returns an error if the file cannot be opened or parsed
pub fn read_delimited(path: &Path, delimiter: u8, batch_size: usize) -> Result<Vec<RecordBatch>> {
    let start = Instant::now();
    log_operation_start("Reading delimited table", path);

    let mut file = open_file(path)?;
    let format = Format::default()
        .with_header(true)
        .with_delimiter(delimiter);
    let (schema, _) = format.infer_schema(&mut file, Some(SCHEMA_INFERENCE_RECORDS))?;
    file.rewind()?;

    let reader = ReaderBuilder::new(Arc::new(pin_age_columns_to_text(&schema)))
        .with_header(true)
        .with_delimiter(delimiter)
        .with_batch_size(batch_size)
        .build(file)?;
    let batches = reader.collect::<std::result::Result<Vec<_>, _>>()?;

    log_operation_complete("read", path, batches.len(), Some(start.elapsed()));
    Ok(batches)
}

/// Replace the inferred types of the age columns with `Utf8`.
///
/// Inference only sees the first rows: an age column that is empty there is
/// typed `Null` and drops later values, and one that is numeric there fails
/// on a later `NA`. As text, every cell reaches the age extractor, which
/// handles missing tokens and reports bad numbers with their row.
#[must_use]
pub fn pin_age_columns_to_text(schema: &Schema) -> Schema {
    let fields = schema
        .fields()
        .iter()
        .map(|field| {
            if REQUIRED_COLUMNS.contains(&field.name().as_str()) {
                Arc::new(Field::new(field.name(), DataType::Utf8, true))
            } else {
                Arc::clone(field)
            }
        })
        .collect_vec();
    Schema::new_with_metadata(fields, schema.metadata().clone())
}

/// Read a Parquet file into record batches
///
/// # Errors
/// Returns an error if the file cannot be opened or if the Parquet file is invalid
pub fn read_parquet(path: &Path, batch_size: usize) -> Result<Vec<RecordBatch>> {
    let start = Instant::now();
    log_operation_start("Reading parquet file", path);

    let file = open_file(path)?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?
        .with_batch_size(batch_size)
        .build()?;
    let batches = reader.collect::<std::result::Result<Vec<_>, _>>()?;

    log_operation_complete("read", path, batches.len(), Some(start.elapsed()));
    Ok(batches)
}

/// Read one table file, choosing the reader from its extension
///
/// # Errors
/// Returns an error for unsupported extensions or unreadable files
pub fn read_table(path: &Path, batch_size: usize) -> Result<Vec<RecordBatch>> {
    match TableFormat::from_path(path) {
        Some(TableFormat::Csv) => read_delimited(path, b',', batch_size),
        Some(TableFormat::Tsv) => read_delimited(path, b'\t', batch_size),
        Some(TableFormat::Parquet) => read_parquet(path, batch_size),
        None => Err(HarmonizerError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("Unsupported table format: {}", path.display()),
        ))),
    }
}

/// Find all supported table files in a directory, sorted by path
///
/// Sorting keeps the row order of a multi-file table stable between runs,
/// which seeded sampling relies on.
///
/// # Errors
/// Returns an error if directory reading fails
pub fn find_table_files(dir: &Path) -> Result<Vec<PathBuf>> {
    log_operation_start("Searching for table files in", dir);
    validate_directory(dir)?;

    let files = std::fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()?
        .into_iter()
        .filter(|path| path.is_file() && TableFormat::from_path(path).is_some())
        .sorted()
        .collect_vec();

    if files.is_empty() {
        log_warning("No table files found in directory", Some(dir));
    } else {
        log_operation_complete("found", dir, files.len(), None);
    }

    Ok(files)
}

/// Load all table files from a directory in parallel
///
/// Batches are returned in file order.
///
/// # Errors
/// Returns an error if directory reading fails or any file cannot be read
pub fn load_tables_parallel(dir: &Path, batch_size: usize) -> Result<Vec<RecordBatch>> {
    let files = find_table_files(dir)?;
    if files.is_empty() {
        return Ok(Vec::new());
    }

    let per_file: Vec<Result<Vec<RecordBatch>>> = files
        .par_iter()
        .map(|path| read_table(path, batch_size))
        .collect();

    let mut combined = Vec::new();
    for batches in per_file {
        combined.extend(batches?);
    }

    log::info!(
        "Loaded {} batches from {} table files",
        combined.len(),
        files.len()
    );
    Ok(combined)
}

/// Load an input table from a file or a directory of files
///
/// # Errors
/// Returns an error if the path is missing or any file cannot be read
pub fn load_input(path: &Path, batch_size: usize) -> Result<Vec<RecordBatch>> {
    if path.is_dir() {
        load_tables_parallel(path, batch_size)
    } else {
        read_table(path, batch_size)
    }
}
