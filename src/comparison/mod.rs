//! Statistical comparison of two test groups.
//!
//! The pipeline runs answer normalization ([`normalize`]), contingency table
//! construction ([`contingency`]), chi-square evaluation ([`chi_square`]),
//! orchestration and aggregation ([`engine`]), and verdict persistence
//! ([`store`]).

pub mod chi_square;
pub mod contingency;
pub mod engine;
pub mod normalize;
pub mod result;
pub mod store;

/// A group is a small sample when fewer than this many of its attempts
/// answered the question under evaluation. Triggers coarser normalization,
/// category collapsing, and relaxed expected-frequency checks throughout
/// the pipeline.
pub const SMALL_SAMPLE_MIN: u32 = 10;
