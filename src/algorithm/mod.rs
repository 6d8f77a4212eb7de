//! Algorithm implementations for sample metadata cleaning
//!
//! This module contains the age harmonization pipeline and its stages.

pub mod harmonize;
