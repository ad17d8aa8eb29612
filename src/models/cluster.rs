//! Hierarchical clustering results

use indexmap::IndexMap;
use serde::{Serialize, Deserialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::models::block::BlockId;

/// Rule for computing inter-cluster distance during agglomeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Linkage {
    /// Mean of all pairwise member distances
    #[default]
    Average,
    /// Minimum increase of within-cluster variance
    Ward,
}

impl fmt::Display for Linkage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Linkage::Average => f.write_str("average"),
            Linkage::Ward => f.write_str("ward"),
        }
    }
}

impl FromStr for Linkage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "average" => Ok(Linkage::Average),
            "ward" => Ok(Linkage::Ward),
            other => Err(format!("unknown linkage '{}' (expected 'average' or 'ward')", other)),
        }
    }
}

/// One agglomeration step.
///
/// Cluster ids `0..n` are the original blocks; step `k` creates cluster `n + k`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MergeStep {
    /// Smaller of the two merged cluster ids
    pub left: usize,
    /// Larger of the two merged cluster ids
    pub right: usize,
    /// Distance at which the merge happened
    pub distance: f64,
    /// Number of original blocks in the resulting cluster
    pub size: usize,
}

/// Full merge history (dendrogram) of an agglomerative clustering run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkageTree {
    leaves: usize,
    steps: Vec<MergeStep>,
}

impl LinkageTree {
    pub(crate) fn new(leaves: usize, steps: Vec<MergeStep>) -> Self {
        Self { leaves, steps }
    }

    /// Number of original blocks
    pub fn leaves(&self) -> usize {
        self.leaves
    }

    /// Merge steps in execution order
    pub fn steps(&self) -> &[MergeStep] {
        &self.steps
    }

    /// Number of merge steps (`leaves - 1` for a non-empty tree)
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether no merge happened
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Id of the cluster created by step `k`
    pub fn cluster_id(&self, step: usize) -> usize {
        self.leaves + step
    }
}

/// Flat cluster label per block; the labels partition the block set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClusterAssignment {
    labels: IndexMap<BlockId, usize>,
}

impl ClusterAssignment {
    /// Create an assignment from blocks and their labels (same order)
    pub fn from_labels(block_ids: &[BlockId], labels: &[usize]) -> Self {
        let labels = block_ids
            .iter()
            .cloned()
            .zip(labels.iter().copied())
            .collect();
        Self { labels }
    }

    /// Label of a block
    pub fn label(&self, block_id: &BlockId) -> Option<usize> {
        self.labels.get(block_id).copied()
    }

    /// Iterate blocks and labels in block order
    pub fn iter(&self) -> impl Iterator<Item = (&BlockId, usize)> {
        self.labels.iter().map(|(id, &label)| (id, label))
    }

    /// Number of labelled blocks
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether no block is labelled
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Members of every cluster, keyed by label
    pub fn clusters(&self) -> BTreeMap<usize, Vec<BlockId>> {
        let mut clusters: BTreeMap<usize, Vec<BlockId>> = BTreeMap::new();
        for (id, label) in self.iter() {
            clusters.entry(label).or_default().push(id.clone());
        }
        clusters
    }

    /// Number of distinct clusters
    pub fn cluster_count(&self) -> usize {
        self.clusters().len()
    }
}

/// Per-block silhouette coefficients and their unweighted mean
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SilhouetteReport {
    /// Coefficient per block, in block order
    pub scores: IndexMap<BlockId, f64>,
    /// Unweighted mean over all blocks
    pub mean: f64,
}

/// Description of one flat cluster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterSummary {
    /// Cluster label
    pub label: usize,
    /// Member blocks in block order
    pub members: Vec<BlockId>,
    /// Distinct instruction mnemonics across members
    pub distinct_instructions: usize,
    /// Distinct left operands across members
    pub distinct_left_operands: usize,
    /// Distinct right operands across members
    pub distinct_right_operands: usize,
}

impl ClusterSummary {
    /// Number of member blocks
    pub fn size(&self) -> usize {
        self.members.len()
    }
}

/// Clustering outcome at one candidate cut threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepPoint {
    /// Cut threshold
    pub threshold: f64,
    /// Number of flat clusters
    pub clusters: usize,
    /// Mean silhouette, `None` where it is undefined
    pub mean_silhouette: Option<f64>,
}
