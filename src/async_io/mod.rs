//! Async table loading
//!
//! Table files are parsed on the tokio blocking pool so callers running in an
//! async context are not stalled. A directory of files is read concurrently
//! while keeping the batches in file order.

use std::path::{Path, PathBuf};

use arrow::record_batch::RecordBatch;
use futures::stream::{self, StreamExt, TryStreamExt};
use tokio::fs;

use crate::error::{HarmonizerError, Result};
use crate::reader::{TableFormat, read_table, validate_directory};
use crate::utils::{log_operation_complete, log_operation_start, log_warning};

/// Read one table file asynchronously
///
/// # Errors
/// Returns an error if the file cannot be read or the blocking task fails
pub async fn read_table_async(path: PathBuf, batch_size: usize) -> Result<Vec<RecordBatch>> {
    tokio::task::spawn_blocking(move || read_table(&path, batch_size))
        .await
        .map_err(|e| HarmonizerError::Io(std::io::Error::other(e)))?
}

/// Find all supported table files in a directory asynchronously, sorted by path
///
/// # Errors
/// Returns an error if directory reading fails
pub async fn find_table_files_async(dir: &Path) -> Result<Vec<PathBuf>> {
    log_operation_start("Searching for table files asynchronously in", dir);
    validate_directory(dir)?;

    let mut files = Vec::new();
    let mut entries = fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let metadata = fs::metadata(&path).await?;
        if metadata.is_file() && TableFormat::from_path(&path).is_some() {
            files.push(path);
        }
    }
    files.sort();

    if files.is_empty() {
        log_warning("No table files found in directory", Some(dir));
    } else {
        log_operation_complete("found", dir, files.len(), None);
    }

    Ok(files)
}

/// Load an input table from a file or a directory of files asynchronously
///
/// # Errors
/// Returns an error if the path is missing or any file cannot be read
pub async fn load_input_async(path: &Path, batch_size: usize) -> Result<Vec<RecordBatch>> {
    if !fs::metadata(path).await?.is_dir() {
        return read_table_async(path.to_path_buf(), batch_size).await;
    }

    let files = find_table_files_async(path).await?;
    let concurrency = std::thread::available_parallelism().map_or(4, usize::from);

    let per_file: Vec<Vec<RecordBatch>> = stream::iter(files)
        .map(|file| read_table_async(file, batch_size))
        .buffered(concurrency)
        .try_collect()
        .await?;

    Ok(per_file.into_iter().flatten().collect())
}
