//! Dataset facets: the values used to configure filters.

use crate::models::{CaseRecord, FilterState, Gender};
use serde::Serialize;
use std::collections::BTreeSet;

/// Spacing of the labelled age marks.
pub const AGE_MARK_STEP: u32 = 10;

/// Filter choices derived from a loaded dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetFacets {
    /// Gender categories in first-encounter order.
    pub genders: Vec<Gender>,
    pub age_min: Option<u32>,
    pub age_max: Option<u32>,
    /// Labelled ages from `age_min` to `age_max` every ten years.
    pub age_marks: Vec<u32>,
    /// Distinct provinces, sorted.
    pub provinces: Vec<String>,
    pub total_records: usize,
}

impl DatasetFacets {
    pub fn from_records(records: &[CaseRecord]) -> Self {
        let mut genders = Vec::new();
        for record in records {
            if !genders.contains(&record.gender) {
                genders.push(record.gender);
            }
        }

        let age_min = records.iter().map(|r| r.age).min();
        let age_max = records.iter().map(|r| r.age).max();

        let age_marks = match (age_min, age_max) {
            (Some(min), Some(max)) => (min..=max).step_by(AGE_MARK_STEP as usize).collect(),
            _ => Vec::new(),
        };

        let provinces: BTreeSet<&str> = records.iter().map(|r| r.province.as_str()).collect();

        Self {
            genders,
            age_min,
            age_max,
            age_marks,
            provinces: provinces.into_iter().map(String::from).collect(),
            total_records: records.len(),
        }
    }

    /// All genders present and the full age range. Matches nothing when
    /// the dataset is empty.
    pub fn default_filter(&self) -> FilterState {
        match (self.age_min, self.age_max) {
            (Some(min), Some(max)) => FilterState::new(self.genders.iter().copied(), min, max)
                .unwrap_or_else(|_| FilterState::empty()),
            _ => FilterState::empty(),
        }
    }
}
