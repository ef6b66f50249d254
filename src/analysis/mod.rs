//! Statistical analysis of categorical grids

/// Category tallies, global distributions and block modes
pub mod statistics;

pub use statistics::FrequencyTable;
