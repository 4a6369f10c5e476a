//! Filtered case aggregation.
//!
//! This module builds the two aggregate views that feed the region bar
//! chart and the age-region scatter plot.

use crate::models::{AgeRegionCount, AggregateViews, CaseRecord, FilterState, Gender, RegionCount};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Filter the records and build both aggregate views.
///
/// An empty gender selection or an interval containing no records yields
/// empty tables rather than an error.
pub fn build_views(records: &[CaseRecord], filter: &FilterState) -> AggregateViews {
    let filtered: Vec<&CaseRecord> = filter_records(records, filter).collect();

    let views = AggregateViews {
        filtered_records: filtered.len(),
        region_counts: region_counts(&filtered),
        age_region_counts: age_region_counts(&filtered),
    };

    debug!(
        "Built views for [{}]: {} records, {} regions, {} age-region rows",
        filter,
        views.filtered_records,
        views.region_counts.len(),
        views.age_region_counts.len()
    );

    views
}

/// Records passing the filter, in source order.
pub fn filter_records<'a>(
    records: &'a [CaseRecord],
    filter: &'a FilterState,
) -> impl Iterator<Item = &'a CaseRecord> + 'a {
    records.iter().filter(move |r| filter.matches(r))
}

/// Count records per province, largest first.
///
/// Provinces with equal counts keep the order in which they were first
/// encountered.
pub fn region_counts(records: &[&CaseRecord]) -> Vec<RegionCount> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut counts: Vec<RegionCount> = Vec::new();

    for record in records {
        match index.get(record.province.as_str()) {
            Some(&i) => counts[i].cases += 1,
            None => {
                index.insert(record.province.as_str(), counts.len());
                counts.push(RegionCount {
                    province: record.province.clone(),
                    cases: 1,
                });
            }
        }
    }

    // sort_by_key is stable
    counts.sort_by_key(|c| std::cmp::Reverse(c.cases));
    counts
}

/// Count records per (age, province, gender), ordered by that key.
pub fn age_region_counts(records: &[&CaseRecord]) -> Vec<AgeRegionCount> {
    let mut grouped: BTreeMap<(u32, &str, Gender), usize> = BTreeMap::new();

    for record in records {
        *grouped
            .entry((record.age, record.province.as_str(), record.gender))
            .or_default() += 1;
    }

    grouped
        .into_iter()
        .map(|((age, province, gender), cases)| AgeRegionCount {
            age,
            province: province.to_string(),
            gender,
            cases,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_records() -> Vec<CaseRecord> {
        vec![
            CaseRecord::new(Gender::Female, 34, "Buenos Aires"),
            CaseRecord::new(Gender::Male, 61, "CABA"),
            CaseRecord::new(Gender::Female, 29, "Córdoba"),
            CaseRecord::new(Gender::Male, 34, "Buenos Aires"),
            CaseRecord::new(Gender::Unknown, 47, "Santa Fe"),
            CaseRecord::new(Gender::Female, 34, "Buenos Aires"),
            CaseRecord::new(Gender::Female, 72, "CABA"),
            CaseRecord::new(Gender::Male, 18, "Buenos Aires"),
            CaseRecord::new(Gender::Female, 5, "Tucumán"),
            CaseRecord::new(Gender::Male, 61, "CABA"),
            CaseRecord::new(Gender::Female, 88, "Córdoba"),
        ]
    }

    fn all_genders(min: u32, max: u32) -> FilterState {
        FilterState::new([Gender::Female, Gender::Male, Gender::Unknown], min, max).unwrap()
    }

    #[test]
    fn test_region_counts_sorted_descending() {
        let views = build_views(&sample_records(), &all_genders(0, 120));

        let counts: Vec<usize> = views.region_counts.iter().map(|r| r.cases).collect();
        assert_eq!(counts, vec![4, 3, 2, 1, 1]);
        assert_eq!(views.region_counts[0].province, "Buenos Aires");
        assert_eq!(views.region_counts[1].province, "CABA");
    }

    #[test]
    fn test_region_ties_keep_encounter_order() {
        let views = build_views(&sample_records(), &all_genders(0, 120));

        // Santa Fe appears before Tucumán in the input; both have one case.
        assert_eq!(views.region_counts[3].province, "Santa Fe");
        assert_eq!(views.region_counts[4].province, "Tucumán");
    }

    #[test]
    fn test_counts_sum_to_filtered_records() {
        let records = sample_records();
        let filters = [
            all_genders(0, 120),
            all_genders(30, 65),
            FilterState::new([Gender::Female], 0, 50).unwrap(),
            FilterState::new([Gender::Male, Gender::Unknown], 40, 100).unwrap(),
        ];

        for filter in &filters {
            let views = build_views(&records, filter);
            let expected = records.iter().filter(|r| filter.matches(r)).count();

            let region_sum: usize = views.region_counts.iter().map(|r| r.cases).sum();
            let age_region_sum: usize = views.age_region_counts.iter().map(|r| r.cases).sum();

            assert_eq!(views.filtered_records, expected);
            assert_eq!(region_sum, expected);
            assert_eq!(age_region_sum, expected);
        }
    }

    #[test]
    fn test_single_gender_filter() {
        let filter = FilterState::new([Gender::Male], 0, 120).unwrap();
        let views = build_views(&sample_records(), &filter);

        assert!(!views.age_region_counts.is_empty());
        assert!(views
            .age_region_counts
            .iter()
            .all(|r| r.gender == Gender::Male));
    }

    #[test]
    fn test_age_interval_is_inclusive() {
        let views = build_views(&sample_records(), &all_genders(34, 61));

        let ages: Vec<u32> = views.age_region_counts.iter().map(|r| r.age).collect();
        assert!(ages.contains(&34));
        assert!(ages.contains(&61));
        assert!(ages.iter().all(|age| (34..=61).contains(age)));
        assert_eq!(views.filtered_records, 6);
    }

    #[test]
    fn test_empty_gender_selection_yields_empty_views() {
        let filter = FilterState::new(Vec::<Gender>::new(), 0, 120).unwrap();
        let views = build_views(&sample_records(), &filter);

        assert!(views.is_empty());
        assert!(views.region_counts.is_empty());
        assert!(views.age_region_counts.is_empty());
    }

    #[test]
    fn test_single_category_yields_single_row() {
        let filter = FilterState::new([Gender::Unknown], 0, 120).unwrap();
        let views = build_views(&sample_records(), &filter);

        assert_eq!(
            views.region_counts,
            vec![RegionCount {
                province: "Santa Fe".to_string(),
                cases: 1,
            }]
        );
        assert_eq!(views.age_region_counts.len(), 1);
    }

    #[test]
    fn test_age_region_grouping_and_order() {
        let views = build_views(&sample_records(), &all_genders(30, 61));

        let keys: Vec<(u32, &str, Gender, usize)> = views
            .age_region_counts
            .iter()
            .map(|r| (r.age, r.province.as_str(), r.gender, r.cases))
            .collect();

        assert_eq!(
            keys,
            vec![
                (34, "Buenos Aires", Gender::Female, 2),
                (34, "Buenos Aires", Gender::Male, 1),
                (47, "Santa Fe", Gender::Unknown, 1),
                (61, "CABA", Gender::Male, 2),
            ]
        );
    }
}
