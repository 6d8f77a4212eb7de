//! Utility functions shared by the reader, writer and pipeline

pub mod arrow_utils;
pub mod logging;

pub use logging::{log_operation_complete, log_operation_start, log_stage_complete, log_warning};
