//! Analysis modules.
//!
//! Aggregation of filtered case records and the dataset facets used to
//! build default filters.

pub mod aggregator;
pub mod facets;

pub use aggregator::*;
pub use facets::DatasetFacets;
