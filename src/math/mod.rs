//! Mathematical utilities for the simulation

/// Seeded random source
pub mod random;
/// Discrete CDF sampling
pub mod sampling;

pub use random::RandomSource;
