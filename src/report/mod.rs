//! Report output for the aggregate views.

pub mod generator;

pub use generator::*;
