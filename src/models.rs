//! Data models for the case views.
//!
//! This module contains the core data structures used throughout
//! the application for representing case records, filters, and the
//! aggregate views derived from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Gender category of a reported case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Gender {
    /// Female cases (`F` in the source data)
    #[serde(rename = "F")]
    Female,
    /// Male cases (`M` in the source data)
    #[serde(rename = "M")]
    Male,
    /// Not reported or any other label (`NR` in the source data)
    #[serde(rename = "NR")]
    Unknown,
}

impl Gender {
    /// Returns the short code used by the source data.
    pub fn code(&self) -> &'static str {
        match self {
            Gender::Female => "F",
            Gender::Male => "M",
            Gender::Unknown => "NR",
        }
    }

    /// Lenient mapping used when reading source rows.
    ///
    /// Empty labels are missing values (`None`). Any other label that is
    /// not recognised as female or male is treated as `Unknown`.
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        if label.is_empty() {
            return None;
        }
        Some(Self::from_known(label).unwrap_or(Gender::Unknown))
    }

    fn from_known(label: &str) -> Option<Self> {
        match label.to_lowercase().as_str() {
            "f" | "female" | "femenino" | "mujer" => Some(Gender::Female),
            "m" | "male" | "masculino" | "hombre" | "varon" | "varón" => Some(Gender::Male),
            "nr" | "unknown" | "x" | "no reportado" | "sin dato" => Some(Gender::Unknown),
            _ => None,
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Strict parsing for user-supplied selections.
impl FromStr for Gender {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_known(s.trim()).ok_or_else(|| FilterError::UnknownGender(s.trim().to_string()))
    }
}

/// One reported case. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseRecord {
    pub gender: Gender,
    pub age: u32,
    pub province: String,
}

impl CaseRecord {
    pub fn new(gender: Gender, age: u32, province: impl Into<String>) -> Self {
        Self {
            gender,
            age,
            province: province.into(),
        }
    }
}

/// Errors raised while building a filter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("age range is inverted: min {min} is greater than max {max}")]
    InvertedAgeRange { min: u32, max: u32 },

    #[error("unknown gender '{0}' (expected F, M or NR)")]
    UnknownGender(String),
}

/// Active filter: selected genders and an inclusive age interval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterState {
    genders: BTreeSet<Gender>,
    age_min: u32,
    age_max: u32,
}

impl FilterState {
    /// Create a filter, rejecting an inverted age interval.
    pub fn new(
        genders: impl IntoIterator<Item = Gender>,
        age_min: u32,
        age_max: u32,
    ) -> Result<Self, FilterError> {
        if age_min > age_max {
            return Err(FilterError::InvertedAgeRange {
                min: age_min,
                max: age_max,
            });
        }

        Ok(Self {
            genders: genders.into_iter().collect(),
            age_min,
            age_max,
        })
    }

    /// A filter that matches no record.
    pub fn empty() -> Self {
        Self {
            genders: BTreeSet::new(),
            age_min: 0,
            age_max: 0,
        }
    }

    pub fn genders(&self) -> &BTreeSet<Gender> {
        &self.genders
    }

    pub fn age_min(&self) -> u32 {
        self.age_min
    }

    pub fn age_max(&self) -> u32 {
        self.age_max
    }

    /// Returns a copy with a different gender selection.
    pub fn with_genders(&self, genders: impl IntoIterator<Item = Gender>) -> Self {
        Self {
            genders: genders.into_iter().collect(),
            ..self.clone()
        }
    }

    /// Returns a copy with a different age interval.
    pub fn with_age_range(&self, age_min: u32, age_max: u32) -> Result<Self, FilterError> {
        Self::new(self.genders.iter().copied(), age_min, age_max)
    }

    /// Whether a record passes this filter. Both age bounds are inclusive.
    pub fn matches(&self, record: &CaseRecord) -> bool {
        self.genders.contains(&record.gender)
            && record.age >= self.age_min
            && record.age <= self.age_max
    }
}

impl fmt::Display for FilterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let genders: Vec<&str> = self.genders.iter().map(Gender::code).collect();
        let genders = if genders.is_empty() {
            "(none)".to_string()
        } else {
            genders.join(", ")
        };
        write!(f, "genders: {} | ages: {}-{}", genders, self.age_min, self.age_max)
    }
}

/// Case count for one province.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionCount {
    pub province: String,
    pub cases: usize,
}

/// Case count for one (age, province, gender) combination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeRegionCount {
    pub age: u32,
    pub province: String,
    pub gender: Gender,
    pub cases: usize,
}

/// Both aggregate views for one filter state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateViews {
    /// Number of records that passed the filter.
    pub filtered_records: usize,
    /// Cases per province, largest first.
    pub region_counts: Vec<RegionCount>,
    /// Cases per (age, province, gender), in key order.
    pub age_region_counts: Vec<AgeRegionCount>,
}

impl AggregateViews {
    pub fn is_empty(&self) -> bool {
        self.filtered_records == 0
    }
}

/// Metadata about a generated report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Path of the source data file.
    pub source: String,
    /// Date and time of generation.
    pub generated_at: DateTime<Utc>,
    /// Data rows read from the source.
    pub rows_read: usize,
    /// Rows dropped during cleaning.
    pub rows_dropped: usize,
    /// Records available after cleaning.
    pub records_loaded: usize,
    /// Records that passed the filter.
    pub records_filtered: usize,
}

/// The complete view report.
#[derive(Debug, Clone, Serialize)]
pub struct ViewReport {
    pub metadata: ReportMetadata,
    pub filter: FilterState,
    pub region_counts: Vec<RegionCount>,
    pub age_region_counts: Vec<AgeRegionCount>,
}
