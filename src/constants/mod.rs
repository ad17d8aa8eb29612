//! Constants used throughout the engine

pub mod columns;

/// Tolerance used when checking that a distribution sums to one.
pub const DISTRIBUTION_SUM_TOLERANCE: f64 = 1e-9;

/// Tolerance used when checking distance matrix symmetry.
pub const SYMMETRY_TOLERANCE: f64 = 1e-12;

/// Floating slack allowed when comparing a token's entropy to its group threshold.
pub const ENTROPY_THRESHOLD_SLACK: f64 = 1e-12;

/// Cut threshold used when none is configured.
pub const DEFAULT_DISTANCE_THRESHOLD: f64 = 0.5;

/// Directory (below the user cache dir) that holds cached matrices.
pub const CACHE_DIR_NAME: &str = "blockclust";

/// Version tag mixed into cache keys; bump when the matrix format changes.
pub const CACHE_FORMAT_VERSION: u32 = 1;
