//! Simulation constants and runtime configuration defaults

/// Maximum number of distinct categories a training image may carry
pub const MAX_CATEGORIES: usize = 10;

/// Minimum replicate count a retrieval must exceed to yield a distribution
pub const MIN_REPLICATES: u64 = 1;

// Safety limit for the growing candidate box in template construction
/// Maximum box radius explored by the anisotropic top-K search
pub const MAX_TEMPLATE_RADIUS: i64 = 1024;

/// Percentage of the path below which retrieval starts at the farthest neighbor
pub const DEFAULT_SWITCHOVER: f64 = 95.0;

/// Template neighbor count used when no level tuples are given
pub const DEFAULT_NEIGHBORS: usize = 16;

/// Fixed seed for reproducible generation
pub const DEFAULT_SEED: u32 = 42;

/// Sentinel written and recognized for missing values in GSLIB documents
pub const DEFAULT_SENTINEL: f32 = -99.0;

// Progress is tracked in hundredths of a percent so the clamped
// 99.99% ceiling is representable as an integer position
/// Number of progress units representing a finished run
pub const PROGRESS_BASIS_POINTS: u64 = 10_000;
