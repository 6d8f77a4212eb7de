//! Harmonized age output model

use serde::{Deserialize, Serialize};

use super::age::{AgeCategory, AgeRecord, AgeUnit, DAYS_PER_YEAR, ValueSource};

/// Final per-sample result of the harmonization pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct HarmonizedAge {
    /// Zero-based row in the input table
    pub row: usize,
    /// Field that supplied the value
    pub source: ValueSource,
    /// Reconciled or imputed value before unit conversion
    pub original_value: Option<f64>,
    /// Unit of `original_value`
    pub original_unit: AgeUnit,
    /// Value in years
    pub harmonized_value: Option<f64>,
    /// Always [`AgeUnit::Year`]
    pub harmonized_unit: AgeUnit,
    /// Reconciled category (rendered with `newborn` as `infant`)
    pub age_group: Option<AgeCategory>,
    /// Whether the value was imputed
    pub imputed: bool,
}

impl HarmonizedAge {
    /// Output label of the age group
    #[must_use]
    pub fn age_group_label(&self) -> Option<&'static str> {
        self.age_group.map(AgeCategory::output_label)
    }

    /// Rebuild raw age fields from this harmonized result.
    ///
    /// Day-sourced values go back to `infant_age` in days, everything else
    /// becomes `age` in years, and the age group becomes the recorded
    /// category. Harmonizing the rebuilt record yields the same age group.
    #[must_use]
    pub fn to_age_record(&self) -> AgeRecord {
        let (age, infant_age) = match self.source {
            ValueSource::InfantAge => (None, self.harmonized_value.map(|v| v * DAYS_PER_YEAR)),
            ValueSource::Age => (self.harmonized_value, None),
        };
        AgeRecord::new(self.row, age, infant_age, self.age_group)
    }
}

/// Flat output row with the column names of the harmonized table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputRow {
    #[serde(rename = "Source")]
    pub source: String,
    #[serde(rename = "Original_Value")]
    pub original_value: Option<f64>,
    #[serde(rename = "Original_Unit")]
    pub original_unit: String,
    #[serde(rename = "Harmonized_Value")]
    pub harmonized_value: Option<f64>,
    #[serde(rename = "Harmonized_Unit")]
    pub harmonized_unit: String,
    #[serde(rename = "Harmonized_Age_Group")]
    pub harmonized_age_group: Option<String>,
}

impl From<&HarmonizedAge> for OutputRow {
    fn from(harmonized: &HarmonizedAge) -> Self {
        Self {
            source: harmonized.source.label().to_string(),
            original_value: harmonized.original_value,
            original_unit: harmonized.original_unit.label().to_string(),
            harmonized_value: harmonized.harmonized_value,
            harmonized_unit: harmonized.harmonized_unit.label().to_string(),
            harmonized_age_group: harmonized.age_group_label().map(str::to_string),
        }
    }
}
