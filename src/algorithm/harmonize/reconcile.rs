//! Reconciliation stage
//!
//! Resolves disagreements between the year-resolution `age`, the
//! day-resolution `infant_age` and the recorded `age_category` of a record
//! before anything is imputed.

use log::debug;

use crate::models::{AgeCategory, AgeRecord, INFANT_AGE_LIMIT_DAYS, ValueSource};

/// Counts of corrections made while reconciling a working set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct ReconciliationSummary {
    /// Records whose `infant_age` was one year or more
    pub infant_age_corrections: usize,
    /// Records whose recorded category disagreed with `age`
    pub category_overrides: usize,
    /// Records whose value comes from `infant_age`
    pub infant_sourced: usize,
}

/// Reconcile one record.
///
/// 1. `infant_age` of 365 days or more marks the record as `child`.
/// 2. A present `age` recomputes the category from the boundary table,
///    overriding step 1.
/// 3. Without `age` the category stays as corrected or recorded.
/// 4. `infant_age` of 365 days or more is nulled.
/// 5. `age_all` takes `infant_age` when present, `age` otherwise.
#[must_use]
pub fn reconcile(mut record: AgeRecord) -> AgeRecord {
    if record
        .infant_age
        .is_some_and(|days| days >= INFANT_AGE_LIMIT_DAYS)
    {
        record.age_category = Some(AgeCategory::Child);
    }

    if let Some(age) = record.age {
        record.age_category = Some(AgeCategory::from_age(age));
    }

    record.infant_age = record
        .infant_age
        .filter(|days| *days < INFANT_AGE_LIMIT_DAYS);

    (record.age_all, record.source) = match record.infant_age {
        Some(days) => (Some(days), ValueSource::InfantAge),
        None => (record.age, ValueSource::Age),
    };

    record
}

/// Reconcile every record of a working set
#[must_use]
pub fn reconcile_all(records: Vec<AgeRecord>) -> (Vec<AgeRecord>, ReconciliationSummary) {
    let mut summary = ReconciliationSummary::default();

    let reconciled: Vec<AgeRecord> = records
        .into_iter()
        .map(|record| {
            if record
                .infant_age
                .is_some_and(|days| days >= INFANT_AGE_LIMIT_DAYS)
            {
                summary.infant_age_corrections += 1;
            }
            if let (Some(age), Some(recorded)) = (record.age, record.age_category) {
                if AgeCategory::from_age(age) != recorded {
                    summary.category_overrides += 1;
                }
            }

            let record = reconcile(record);
            if record.source == ValueSource::InfantAge {
                summary.infant_sourced += 1;
            }
            record
        })
        .collect();

    debug!(
        "Reconciled {} records: {} infant_age corrections, {} category overrides",
        reconciled.len(),
        summary.infant_age_corrections,
        summary.category_overrides
    );

    (reconciled, summary)
}
