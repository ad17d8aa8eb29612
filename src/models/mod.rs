//! Data models for block profiles, score matrices and clustering results

pub mod block;
pub mod distribution;
pub mod matrix;
pub mod cluster;
pub mod report;
#[cfg(test)]
mod tests;

pub use self::block::{BlockId, TokenRecord, VariableType};
pub use self::distribution::{BlockProfile, BlockProfiles, ProbabilityDistribution};
pub use self::matrix::{DistanceMatrix, PairScores, SimilarityMatrix};
pub use self::cluster::{ClusterAssignment, ClusterSummary, Linkage, LinkageTree, MergeStep, SilhouetteReport, SweepPoint};
pub use self::report::AnalysisReport;
