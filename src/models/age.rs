//! Age record model
//!
//! This module defines the per-sample age record that flows through the
//! harmonization stages, together with the age category, unit and value
//! source enumerations.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Number of days that make up one year of age
pub const DAYS_PER_YEAR: f64 = 365.0;

/// Smallest `infant_age` (in days) that is no longer a valid infancy measurement
pub const INFANT_AGE_LIMIT_DAYS: f64 = 365.0;

/// Coarse life-stage bucket derived from a numeric age
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgeCategory {
    /// Age 0
    Newborn,
    /// Ages 1 to 11
    Child,
    /// Ages 12 to 18
    Schoolage,
    /// Ages 19 to 65
    Adult,
    /// Ages above 65
    Senior,
}

impl AgeCategory {
    /// All categories in ascending age order
    pub const ALL: [Self; 5] = [
        Self::Newborn,
        Self::Child,
        Self::Schoolage,
        Self::Adult,
        Self::Senior,
    ];

    /// Position of the category in [`AgeCategory::ALL`]
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Newborn => 0,
            Self::Child => 1,
            Self::Schoolage => 2,
            Self::Adult => 3,
            Self::Senior => 4,
        }
    }

    /// Classify an age in years using the boundary table.
    ///
    /// Fractional ages are classified by completed years.
    #[must_use]
    pub fn from_age(years: f64) -> Self {
        match years.floor() as i64 {
            i64::MIN..=0 => Self::Newborn,
            1..=11 => Self::Child,
            12..=18 => Self::Schoolage,
            19..=65 => Self::Adult,
            _ => Self::Senior,
        }
    }

    /// Label as recorded in the source metadata
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Newborn => "newborn",
            Self::Child => "child",
            Self::Schoolage => "schoolage",
            Self::Adult => "adult",
            Self::Senior => "senior",
        }
    }

    /// Label used in harmonized output, where `newborn` reads as `infant`
    #[must_use]
    pub const fn output_label(self) -> &'static str {
        match self {
            Self::Newborn => "infant",
            other => other.label(),
        }
    }
}

impl fmt::Display for AgeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for AgeCategory {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        Self::ALL
            .into_iter()
            .find(|category| category.label() == trimmed)
            .ok_or_else(|| trimmed.to_string())
    }
}

/// Unit of an age measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgeUnit {
    Year,
    Day,
}

impl AgeUnit {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Year => "year",
            Self::Day => "day",
        }
    }
}

impl fmt::Display for AgeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Which original field supplied the authoritative value of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueSource {
    /// Year-resolution `age` field (also used for imputed values)
    #[default]
    Age,
    /// Day-resolution `infant_age` field
    InfantAge,
}

impl ValueSource {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Age => "age",
            Self::InfantAge => "infant_age",
        }
    }

    /// Unit the source field is recorded in
    #[must_use]
    pub const fn unit(self) -> AgeUnit {
        match self {
            Self::Age => AgeUnit::Year,
            Self::InfantAge => AgeUnit::Day,
        }
    }
}

impl fmt::Display for ValueSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Per-sample age fields as they move through the pipeline
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AgeRecord {
    /// Zero-based row in the input table
    pub row: usize,
    /// Age in years
    pub age: Option<f64>,
    /// Age in days, only meaningful below one year
    pub infant_age: Option<f64>,
    /// Recorded or reconciled life-stage category
    pub age_category: Option<AgeCategory>,
    /// Reconciled (and possibly imputed) measurement in the unit of `source`
    pub age_all: Option<f64>,
    /// Field that supplied `age_all`
    pub source: ValueSource,
    /// Whether `age_all` was filled by imputation
    pub imputed: bool,
}

impl AgeRecord {
    /// Create a record from the three raw source fields
    #[must_use]
    pub fn new(
        row: usize,
        age: Option<f64>,
        infant_age: Option<f64>,
        age_category: Option<AgeCategory>,
    ) -> Self {
        Self {
            row,
            age,
            infant_age,
            age_category,
            ..Self::default()
        }
    }

    /// True when none of the three source fields carries a value
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.age.is_none() && self.infant_age.is_none() && self.age_category.is_none()
    }

    /// `age_all` expressed in years
    #[must_use]
    pub fn value_in_years(&self) -> Option<f64> {
        self.age_all.map(|value| match self.source {
            ValueSource::InfantAge => value / DAYS_PER_YEAR,
            ValueSource::Age => value,
        })
    }
}
