//! Serializable summary of one analysis run

use serde::{Serialize, Deserialize};

use crate::config::AnalysisConfig;
use crate::models::block::BlockId;
use crate::models::cluster::{ClusterAssignment, ClusterSummary, LinkageTree, SilhouetteReport, SweepPoint};

/// Everything a run produced except the (potentially large) score matrices
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Crate version that produced the report
    pub version: String,
    /// Input table, when the run started from a file
    pub input: Option<String>,
    /// Effective configuration
    pub config: AnalysisConfig,
    /// Blocks in matrix order
    pub blocks: Vec<BlockId>,
    /// Input rows excluded as malformed
    pub skipped_records: usize,
    /// Divergences that came out non-finite and were clamped to zero
    pub non_finite_clamps: usize,
    /// Whether the distance matrix was served from the cache
    pub from_cache: bool,
    /// Merge history
    pub linkage: LinkageTree,
    /// Flat clusters, when a threshold was configured
    pub assignment: Option<ClusterAssignment>,
    /// Silhouette coefficients, when defined
    pub silhouette: Option<SilhouetteReport>,
    /// Why the silhouette is missing, when a threshold was configured but it is undefined
    pub silhouette_note: Option<String>,
    /// Per-cluster descriptions
    pub clusters: Vec<ClusterSummary>,
    /// Threshold sweep results
    pub sweep: Vec<SweepPoint>,
}

impl AnalysisReport {
    /// Number of flat clusters (0 when no threshold was applied)
    pub fn cluster_count(&self) -> usize {
        self.assignment.as_ref().map_or(0, |a| a.cluster_count())
    }
}
