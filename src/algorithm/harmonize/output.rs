//! Unit harmonization and output shaping

use crate::models::{AgeRecord, AgeUnit, DAYS_PER_YEAR, HarmonizedAge, ValueSource};

/// Express a reconciled record in years
#[must_use]
pub fn harmonize_record(record: &AgeRecord) -> HarmonizedAge {
    let harmonized_value = record.age_all.map(|value| match record.source {
        ValueSource::InfantAge => value / DAYS_PER_YEAR,
        ValueSource::Age => value,
    });

    HarmonizedAge {
        row: record.row,
        source: record.source,
        original_value: record.age_all,
        original_unit: record.source.unit(),
        harmonized_value,
        harmonized_unit: AgeUnit::Year,
        age_group: record.age_category,
        imputed: record.imputed,
    }
}
