//! Reference distributions for category-aware imputation
//!
//! A reference distribution holds the observed values of one age category.
//! Its mean and median are computed once when it is built.

use rand::Rng;
use rand::seq::IndexedRandom;
use rustc_hash::FxHashMap;

use crate::config::ReferenceUnits;
use crate::models::{AgeCategory, AgeRecord};

/// Arithmetic mean, `None` for an empty slice
#[must_use]
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Median of an ascending slice; the two middle values are averaged for even
/// lengths
fn median_sorted(sorted: &[f64]) -> Option<f64> {
    let n = sorted.len();
    match n {
        0 => None,
        _ if n % 2 == 1 => Some(sorted[n / 2]),
        _ => Some((sorted[n / 2 - 1] + sorted[n / 2]) / 2.0),
    }
}

/// Median, `None` for an empty slice
#[must_use]
pub fn median(values: &[f64]) -> Option<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    median_sorted(&sorted)
}

/// Observed values of one category
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReferenceDistribution {
    values: Vec<f64>,
    mean: Option<f64>,
    median: Option<f64>,
}

impl ReferenceDistribution {
    #[must_use]
    pub fn new(mut values: Vec<f64>) -> Self {
        values.sort_by(f64::total_cmp);
        let mean = mean(&values);
        let median = median_sorted(&values);
        Self {
            values,
            mean,
            median,
        }
    }

    /// Observed values in ascending order
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn mean(&self) -> Option<f64> {
        self.mean
    }

    #[must_use]
    pub fn median(&self) -> Option<f64> {
        self.median
    }

    /// Draw one observed value uniformly, with replacement
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<f64> {
        self.values.choose(rng).copied()
    }
}

/// Build the reference distribution of every category from observed values.
///
/// Only records with both a category and a value contribute. With
/// [`ReferenceUnits::Raw`] values are pooled as recorded.
///
/// With [`ReferenceUnits::Years`] day-sourced values are converted to years
/// and a category pools only the values whose age falls inside its own
/// range. Every statistic of such a pool stays inside the range, so an
/// imputed value never contradicts its category. A category observed only
/// through out-of-range values (a `child` recorded with an `infant_age`)
/// falls back to pooling all of them.
#[must_use]
pub fn collect_reference_distributions(
    records: &[AgeRecord],
    units: ReferenceUnits,
) -> FxHashMap<AgeCategory, ReferenceDistribution> {
    let mut in_range: FxHashMap<AgeCategory, Vec<f64>> = FxHashMap::default();
    let mut out_of_range: FxHashMap<AgeCategory, Vec<f64>> = FxHashMap::default();

    for record in records {
        let value = match units {
            ReferenceUnits::Years => record.value_in_years(),
            ReferenceUnits::Raw => record.age_all,
        };
        let (Some(category), Some(value)) = (record.age_category, value) else {
            continue;
        };

        let consistent =
            units == ReferenceUnits::Raw || AgeCategory::from_age(value) == category;
        let pool = if consistent {
            &mut in_range
        } else {
            &mut out_of_range
        };
        pool.entry(category).or_default().push(value);
    }

    for (category, values) in out_of_range {
        in_range.entry(category).or_insert(values);
    }

    in_range
        .into_iter()
        .map(|(category, values)| (category, ReferenceDistribution::new(values)))
        .collect()
}
