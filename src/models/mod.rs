//! Domain models for age harmonization
//!
//! This module contains the per-sample age record that moves through the
//! pipeline and the harmonized result it becomes.

pub mod age;
pub mod harmonized;

// Re-export commonly used types
pub use age::{AgeCategory, AgeRecord, AgeUnit, DAYS_PER_YEAR, INFANT_AGE_LIMIT_DAYS, ValueSource};
pub use harmonized::{HarmonizedAge, OutputRow};
