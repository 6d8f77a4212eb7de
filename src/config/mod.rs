//! Configuration for the age harmonizer.

use std::fmt;
use std::str::FromStr;

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::error::{HarmonizerError, Result};

/// Default number of rows per record batch when reading input tables
pub const DEFAULT_BATCH_SIZE: usize = 8192;

/// Environment variable holding the random seed for sampling imputation
pub const SEED_ENV: &str = "HARMONIZER_SEED";
/// Environment variable holding the reader batch size
pub const BATCH_SIZE_ENV: &str = "HARMONIZER_BATCH_SIZE";
/// Environment variable selecting the empty reference policy
pub const EMPTY_REFERENCE_ENV: &str = "HARMONIZER_EMPTY_REFERENCE";
/// Environment variable selecting the reference pooling units
pub const REFERENCE_UNITS_ENV: &str = "HARMONIZER_REFERENCE_UNITS";

/// What to do when a category needs imputation but has no observed values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmptyReferencePolicy {
    /// Fail the whole run
    #[default]
    Abort,
    /// Leave the affected rows without a value and continue
    MarkUnresolved,
}

impl FromStr for EmptyReferencePolicy {
    type Err = HarmonizerError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "abort" => Ok(Self::Abort),
            "unresolved" | "mark_unresolved" => Ok(Self::MarkUnresolved),
            other => Err(HarmonizerError::Config(format!(
                "unknown empty reference policy '{other}' (expected 'abort' or 'unresolved')"
            ))),
        }
    }
}

/// Units observed values are pooled in before computing imputation statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReferenceUnits {
    /// Day-sourced values are converted to years before pooling
    #[default]
    Years,
    /// Values are pooled as recorded, mixing days and years
    Raw,
}

impl FromStr for ReferenceUnits {
    type Err = HarmonizerError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "years" | "year" => Ok(Self::Years),
            "raw" => Ok(Self::Raw),
            other => Err(HarmonizerError::Config(format!(
                "unknown reference units '{other}' (expected 'years' or 'raw')"
            ))),
        }
    }
}

/// Configuration for the `AgeHarmonizer`
#[derive(Debug, Clone)]
pub struct HarmonizerConfig {
    /// Seed for the sampling imputation; OS entropy when absent
    pub random_seed: Option<u64>,
    /// Units for pooling reference distributions
    pub reference_units: ReferenceUnits,
    /// Handling of categories without observed values
    pub empty_reference_policy: EmptyReferencePolicy,
    /// Rows per record batch when reading input tables
    pub batch_size: usize,
    /// Show progress bars while harmonizing
    pub show_progress: bool,
}

impl Default for HarmonizerConfig {
    fn default() -> Self {
        Self {
            random_seed: None,
            reference_units: ReferenceUnits::default(),
            empty_reference_policy: EmptyReferencePolicy::default(),
            batch_size: DEFAULT_BATCH_SIZE,
            show_progress: false,
        }
    }
}

impl HarmonizerConfig {
    /// Build a configuration from `HARMONIZER_*` environment variables,
    /// falling back to defaults for unset variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(seed) = env_var(SEED_ENV) {
            config.random_seed = Some(seed.parse::<u64>().map_err(|e| {
                HarmonizerError::Config(format!("{SEED_ENV}='{seed}' is not a valid u64: {e}"))
            })?);
        }
        if let Some(size) = env_var(BATCH_SIZE_ENV) {
            config.batch_size = size
                .parse::<usize>()
                .ok()
                .filter(|size| *size > 0)
                .ok_or_else(|| {
                    HarmonizerError::Config(format!(
                        "{BATCH_SIZE_ENV}='{size}' is not a positive integer"
                    ))
                })?;
        }
        if let Some(policy) = env_var(EMPTY_REFERENCE_ENV) {
            config.empty_reference_policy = policy.parse()?;
        }
        if let Some(units) = env_var(REFERENCE_UNITS_ENV) {
            config.reference_units = units.parse()?;
        }

        Ok(config)
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }

    #[must_use]
    pub fn with_reference_units(mut self, units: ReferenceUnits) -> Self {
        self.reference_units = units;
        self
    }

    #[must_use]
    pub fn with_empty_reference_policy(mut self, policy: EmptyReferencePolicy) -> Self {
        self.empty_reference_policy = policy;
        self
    }

    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    #[must_use]
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Random source for sampling imputation, seeded when a seed is configured
    #[must_use]
    pub fn rng(&self) -> StdRng {
        match self.random_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.trim().is_empty())
}

impl fmt::Display for HarmonizerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Harmonizer Configuration:")?;
        match self.random_seed {
            Some(seed) => writeln!(f, "  Random Seed: {seed}")?,
            None => writeln!(f, "  Random Seed: none (OS entropy)")?,
        }
        writeln!(f, "  Reference Units: {:?}", self.reference_units)?;
        writeln!(f, "  Empty Reference Policy: {:?}", self.empty_reference_policy)?;
        writeln!(f, "  Batch Size: {}", self.batch_size)?;
        Ok(())
    }
}
