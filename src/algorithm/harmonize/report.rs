//! Harmonization run reports
//!
//! This module collects what each stage did to the working set and renders
//! it as a console summary or JSON.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::impute::ImputationStrategy;
use super::reconcile::ReconciliationSummary;
use crate::error::Result;
use crate::models::AgeCategory;

/// Imputation outcome for one category
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySummary {
    pub category: AgeCategory,
    pub strategy: ImputationStrategy,
    /// Records in the category after reconciliation
    pub rows: usize,
    /// Observed values in the reference distribution
    pub observed: usize,
    /// Values filled by imputation
    pub imputed: usize,
    /// Missing values left unfilled
    pub unresolved: usize,
    /// Median or mean used to fill, absent for sampling
    pub reference_statistic: Option<f64>,
}

/// Imputation outcome across categories
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImputationReport {
    /// One entry per category present in the working set, in age order
    pub categories: Vec<CategorySummary>,
    /// Records with neither a value nor a category
    pub uncategorized: usize,
}

impl ImputationReport {
    #[must_use]
    pub fn category(&self, category: AgeCategory) -> Option<&CategorySummary> {
        self.categories.iter().find(|c| c.category == category)
    }

    #[must_use]
    pub fn total_imputed(&self) -> usize {
        self.categories.iter().map(|c| c.imputed).sum()
    }

    #[must_use]
    pub fn total_unresolved(&self) -> usize {
        self.categories.iter().map(|c| c.unresolved).sum::<usize>() + self.uncategorized
    }
}

/// Summary of a complete harmonization run
#[derive(Debug, Clone, Serialize)]
pub struct HarmonizationReport {
    pub generated_at: DateTime<Utc>,
    /// Seed used for sampling, if any
    pub random_seed: Option<u64>,
    /// Age columns found in the input
    pub age_columns: Vec<String>,
    pub input_rows: usize,
    pub dropped_rows: usize,
    pub output_rows: usize,
    pub reconciliation: ReconciliationSummary,
    pub imputation: ImputationReport,
}

impl HarmonizationReport {
    /// Render the report as pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl fmt::Display for HarmonizationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Age Harmonization Summary:")?;
        writeln!(f, "  Age Columns: {}", self.age_columns.join(", "))?;
        writeln!(f, "  Input Rows: {}", self.input_rows)?;
        writeln!(f, "  Dropped Rows (no age data): {}", self.dropped_rows)?;
        writeln!(f, "  Output Rows: {}", self.output_rows)?;
        writeln!(
            f,
            "  infant_age Corrections (>= 365 days): {}",
            self.reconciliation.infant_age_corrections
        )?;
        writeln!(
            f,
            "  Categories Overridden by age: {}",
            self.reconciliation.category_overrides
        )?;
        writeln!(f, "  Values from infant_age: {}", self.reconciliation.infant_sourced)?;

        writeln!(f, "\nImputation by Category:")?;
        for summary in &self.imputation.categories {
            let statistic = summary
                .reference_statistic
                .map_or_else(|| "-".to_string(), |value| format!("{value:.2}"));
            writeln!(
                f,
                "  {:<10} {:<15} rows={} observed={} imputed={} unresolved={} statistic={}",
                summary.category.output_label(),
                summary.strategy.label(),
                summary.rows,
                summary.observed,
                summary.imputed,
                summary.unresolved,
                statistic
            )?;
        }
        if self.imputation.uncategorized > 0 {
            writeln!(f, "  Uncategorized unresolved: {}", self.imputation.uncategorized)?;
        }
        Ok(())
    }
}
