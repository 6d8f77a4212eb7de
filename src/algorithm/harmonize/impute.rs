//! Category-aware imputation stage
//!
//! Missing `age_all` values are filled per category with the strategy that
//! best preserves the shape of that category's observed distribution:
//! right-skewed categories use the median, the bell-shaped `schoolage`
//! category uses the mean and the roughly uniform `adult` category draws
//! observed values at random.

use std::fmt;

use log::{debug, warn};
use rand::Rng;
use rustc_hash::FxHashMap;
use serde::Serialize;

use super::report::{CategorySummary, ImputationReport};
use super::statistics::{ReferenceDistribution, collect_reference_distributions};
use crate::config::{EmptyReferencePolicy, ReferenceUnits};
use crate::error::{HarmonizerError, Result};
use crate::models::{AgeCategory, AgeRecord, DAYS_PER_YEAR, ValueSource};

/// How a missing value is derived from a category's reference distribution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImputationStrategy {
    /// Median of observed values
    Median,
    /// Mean of observed values
    Mean,
    /// Uniform draw, with replacement, from observed values
    UniformSample,
}

impl ImputationStrategy {
    /// Produce one imputed value, `None` if the reference is empty
    pub fn impute<R: Rng + ?Sized>(
        self,
        reference: &ReferenceDistribution,
        rng: &mut R,
    ) -> Option<f64> {
        match self {
            Self::Median => reference.median(),
            Self::Mean => reference.mean(),
            Self::UniformSample => reference.sample(rng),
        }
    }

    /// The constant a statistic-based strategy fills with
    #[must_use]
    pub fn reference_statistic(self, reference: &ReferenceDistribution) -> Option<f64> {
        match self {
            Self::Median => reference.median(),
            Self::Mean => reference.mean(),
            Self::UniformSample => None,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Median => "median",
            Self::Mean => "mean",
            Self::UniformSample => "uniform_sample",
        }
    }
}

impl fmt::Display for ImputationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Lookup table from age category to imputation strategy
///
/// Holds one entry per category, so every category has a strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrategyTable {
    strategies: [ImputationStrategy; AgeCategory::ALL.len()],
}

impl Default for StrategyTable {
    fn default() -> Self {
        Self::new([
            ImputationStrategy::Median,
            ImputationStrategy::Median,
            ImputationStrategy::Mean,
            ImputationStrategy::UniformSample,
            ImputationStrategy::Median,
        ])
    }
}

impl StrategyTable {
    /// Build a table from strategies listed in [`AgeCategory::ALL`] order
    #[must_use]
    pub const fn new(strategies: [ImputationStrategy; AgeCategory::ALL.len()]) -> Self {
        Self { strategies }
    }

    /// Replace the strategy of one category
    #[must_use]
    pub fn with_strategy(mut self, category: AgeCategory, strategy: ImputationStrategy) -> Self {
        self.strategies[category.index()] = strategy;
        self
    }

    /// Strategy for a category
    #[must_use]
    pub fn strategy_for(&self, category: AgeCategory) -> ImputationStrategy {
        self.strategies[category.index()]
    }
}

/// Settings for one imputation pass
#[derive(Debug, Clone, Copy)]
pub struct ImputationOptions<'a> {
    pub strategies: &'a StrategyTable,
    pub reference_units: ReferenceUnits,
    pub empty_reference_policy: EmptyReferencePolicy,
}

#[derive(Debug, Default, Clone, Copy)]
struct CategoryCounts {
    rows: usize,
    missing: usize,
}

/// Fill missing `age_all` values of reconciled records.
///
/// Reference distributions are taken from the observed values before any
/// value is filled, so imputed values never feed later imputations. With
/// [`EmptyReferencePolicy::Abort`] an empty reference for a category that
/// needs imputation fails the pass before any record is touched.
///
/// # Errors
/// Returns `EmptyReferenceDistribution` under the abort policy
pub fn impute_missing<R: Rng + ?Sized>(
    records: &mut [AgeRecord],
    options: ImputationOptions<'_>,
    rng: &mut R,
) -> Result<ImputationReport> {
    let references = collect_reference_distributions(records, options.reference_units);
    let empty = ReferenceDistribution::default();

    let mut counts: FxHashMap<AgeCategory, CategoryCounts> = FxHashMap::default();
    let mut uncategorized = 0;
    for record in records.iter() {
        match record.age_category {
            Some(category) => {
                let entry = counts.entry(category).or_default();
                entry.rows += 1;
                if record.age_all.is_none() {
                    entry.missing += 1;
                }
            }
            None if record.age_all.is_none() => uncategorized += 1,
            None => {}
        }
    }

    for category in AgeCategory::ALL {
        let missing = counts.get(&category).map_or(0, |c| c.missing);
        let observed = references.get(&category).map_or(0, ReferenceDistribution::len);
        if missing > 0 && observed == 0 {
            match options.empty_reference_policy {
                EmptyReferencePolicy::Abort => {
                    return Err(HarmonizerError::EmptyReferenceDistribution { category, missing });
                }
                EmptyReferencePolicy::MarkUnresolved => warn!(
                    "No observed values for category '{category}'; leaving {missing} rows unresolved"
                ),
            }
        }
    }
    if uncategorized > 0 {
        warn!("{uncategorized} records have neither a value nor a category and stay unresolved");
    }

    let mut imputed: FxHashMap<AgeCategory, usize> = FxHashMap::default();
    for record in records.iter_mut().filter(|r| r.age_all.is_none()) {
        let Some(category) = record.age_category else {
            continue;
        };
        let reference = references.get(&category).unwrap_or(&empty);
        let strategy = options.strategies.strategy_for(category);

        if let Some(value) = strategy.impute(reference, rng) {
            fill(record, value, options.reference_units);
            *imputed.entry(category).or_default() += 1;
        }
    }

    let categories = AgeCategory::ALL
        .into_iter()
        .filter_map(|category| {
            let count = counts.get(&category).copied()?;
            let reference = references.get(&category).unwrap_or(&empty);
            let strategy = options.strategies.strategy_for(category);
            let imputed = imputed.get(&category).copied().unwrap_or(0);

            Some(CategorySummary {
                category,
                strategy,
                rows: count.rows,
                observed: reference.len(),
                imputed,
                unresolved: count.missing - imputed,
                reference_statistic: strategy.reference_statistic(reference),
            })
        })
        .collect::<Vec<_>>();

    for summary in &categories {
        debug!(
            "Category {}: {} rows, {} observed, {} imputed by {}",
            summary.category, summary.rows, summary.observed, summary.imputed, summary.strategy
        );
    }

    Ok(ImputationReport {
        categories,
        uncategorized,
    })
}

/// Store an imputed value in the unit a re-run would read it back from.
///
/// Pooled in years, a value below one year is a day measurement: written as
/// `age` it would re-categorize its record as `newborn`.
fn fill(record: &mut AgeRecord, value: f64, units: ReferenceUnits) {
    let (value, source) = match units {
        ReferenceUnits::Years if value < 1.0 => (value * DAYS_PER_YEAR, ValueSource::InfantAge),
        _ => (value, ValueSource::Age),
    };
    record.age_all = Some(value);
    record.source = source;
    record.imputed = true;
}
