//! Pairwise distance and similarity matrices
//!
//! Every unordered pair is scored exactly once and mirrored. With
//! parallelism enabled the pairs are scored on the rayon pool; each pair
//! owns its own cell, so results are collected and written afterwards.

use log::{debug, info};
use rayon::prelude::*;

use crate::analyzer::divergence::DivergenceEngine;
use crate::errors::{ClusterError, ClusterResult};
use crate::models::{BlockId, BlockProfiles, DistanceMatrix, SimilarityMatrix};

/// Assembles pair scores into symmetric block-by-block matrices
#[derive(Debug, Clone, Copy)]
pub struct DistanceMatrixBuilder {
    parallel: bool,
}

impl Default for DistanceMatrixBuilder {
    fn default() -> Self {
        Self { parallel: true }
    }
}

impl DistanceMatrixBuilder {
    /// Create a builder; `parallel` scores pairs on the rayon pool
    pub fn new(parallel: bool) -> Self {
        Self { parallel }
    }

    /// Score every pair `(i < j)` once
    fn score_pairs<F>(&self, n: usize, score: F) -> Vec<(usize, usize, f64)>
    where
        F: Fn(usize, usize) -> f64 + Sync,
    {
        if self.parallel {
            (0..n)
                .into_par_iter()
                .flat_map_iter(|i| {
                    let score = &score;
                    ((i + 1)..n).map(move |j| (i, j, score(i, j)))
                })
                .collect()
        } else {
            (0..n)
                .flat_map(|i| {
                    let score = &score;
                    ((i + 1)..n).map(move |j| (i, j, score(i, j)))
                })
                .collect()
        }
    }

    /// Build a distance matrix from a pair scoring function.
    ///
    /// `score(i, j)` is called once per pair with `i < j`. Negative or
    /// non-finite scores are rejected with [`ClusterError::InvalidScore`].
    pub fn build<F>(&self, block_ids: Vec<BlockId>, score: F) -> ClusterResult<DistanceMatrix>
    where
        F: Fn(usize, usize) -> f64 + Sync,
    {
        let n = block_ids.len();
        debug!("Scoring {} pair(s) over {} block(s)", n * n.saturating_sub(1) / 2, n);

        let scores = self.score_pairs(n, score);
        let mut matrix = DistanceMatrix::zeros(block_ids);

        for (i, j, value) in scores {
            if !value.is_finite() || value < 0.0 {
                return Err(ClusterError::InvalidScore {
                    left: matrix.block_ids()[i].to_string(),
                    right: matrix.block_ids()[j].to_string(),
                    score: value,
                });
            }
            matrix.set_pair(i, j, value);
        }

        Ok(matrix)
    }

    /// Build a similarity matrix from a pair scoring function.
    ///
    /// Non-finite similarities are rejected; negative ones are legal.
    pub fn build_similarity<F>(&self, block_ids: Vec<BlockId>, score: F) -> ClusterResult<SimilarityMatrix>
    where
        F: Fn(usize, usize) -> f64 + Sync,
    {
        let n = block_ids.len();
        let scores = self.score_pairs(n, score);
        let mut matrix = SimilarityMatrix::zeros(block_ids);

        for (i, j, value) in scores {
            if !value.is_finite() {
                return Err(ClusterError::InvalidScore {
                    left: matrix.block_ids()[i].to_string(),
                    right: matrix.block_ids()[j].to_string(),
                    score: value,
                });
            }
            matrix.set_pair(i, j, value);
        }

        Ok(matrix)
    }

    /// JSD distance matrix over the given profiles, in profile order
    pub fn from_profiles(&self, profiles: &BlockProfiles, engine: &DivergenceEngine) -> ClusterResult<DistanceMatrix> {
        let block_ids: Vec<BlockId> = profiles.keys().cloned().collect();
        let matrix = self.build(block_ids, |i, j| {
            // indices come from the same map, both lookups succeed
            match (profiles.get_index(i), profiles.get_index(j)) {
                (Some((_, left)), Some((_, right))) => engine.block_divergence(left, right),
                _ => f64::NAN,
            }
        })?;

        info!("Built {}x{} divergence matrix", matrix.len(), matrix.len());
        Ok(matrix)
    }

    /// Overlap similarity matrix over the given profiles, in profile order
    pub fn similarity_from_profiles(
        &self,
        profiles: &BlockProfiles,
        engine: &DivergenceEngine,
    ) -> ClusterResult<SimilarityMatrix> {
        let block_ids: Vec<BlockId> = profiles.keys().cloned().collect();
        let matrix = self.build_similarity(block_ids, |i, j| {
            match (profiles.get_index(i), profiles.get_index(j)) {
                (Some((_, left)), Some((_, right))) => engine.block_overlap(left, right),
                _ => f64::NAN,
            }
        })?;

        info!("Built {}x{} overlap similarity matrix", matrix.len(), matrix.len());
        Ok(matrix)
    }
}
