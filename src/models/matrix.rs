//! Square block-by-block score matrices

use serde::{Serialize, Deserialize};

use crate::constants::SYMMETRY_TOLERANCE;
use crate::errors::{ClusterError, ClusterResult};
use crate::models::block::BlockId;

/// Dense row-major square matrix indexed by an ordered set of blocks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Square {
    block_ids: Vec<BlockId>,
    values: Vec<f64>,
}

impl Square {
    fn zeros(block_ids: Vec<BlockId>) -> Self {
        let n = block_ids.len();
        Self { block_ids, values: vec![0.0; n * n] }
    }

    fn from_rows(block_ids: Vec<BlockId>, rows: Vec<Vec<f64>>) -> ClusterResult<Self> {
        let n = block_ids.len();
        if rows.len() != n {
            return Err(ClusterError::InvalidDistanceMatrix {
                row: rows.len(),
                col: 0,
                reason: format!("expected {} rows, found {}", n, rows.len()),
            });
        }

        let mut values = Vec::with_capacity(n * n);
        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != n {
                return Err(ClusterError::InvalidDistanceMatrix {
                    row: i,
                    col: row.len(),
                    reason: format!("expected {} columns, found {}", n, row.len()),
                });
            }
            values.extend(row);
        }

        Ok(Self { block_ids, values })
    }

    fn len(&self) -> usize {
        self.block_ids.len()
    }

    fn get(&self, i: usize, j: usize) -> f64 {
        self.values[i * self.len() + j]
    }

    fn set_pair(&mut self, i: usize, j: usize, value: f64) {
        let n = self.len();
        self.values[i * n + j] = value;
        self.values[j * n + i] = value;
    }

    fn row(&self, i: usize) -> &[f64] {
        let n = self.len();
        &self.values[i * n..(i + 1) * n]
    }

    fn index_of(&self, block_id: &BlockId) -> Option<usize> {
        self.block_ids.iter().position(|id| id == block_id)
    }

    fn pairs(&self) -> impl Iterator<Item = (&BlockId, &BlockId, f64)> + '_ {
        let n = self.len();
        (0..n).flat_map(move |i| {
            ((i + 1)..n).map(move |j| (&self.block_ids[i], &self.block_ids[j], self.get(i, j)))
        })
    }
}

/// Symmetric, zero-diagonal, non-negative dissimilarity matrix over blocks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DistanceMatrix {
    inner: Square,
}

impl DistanceMatrix {
    /// All-zero matrix (every block identical to every other)
    pub fn zeros(block_ids: Vec<BlockId>) -> Self {
        Self { inner: Square::zeros(block_ids) }
    }

    /// Build a matrix from explicit rows.
    ///
    /// Only the shape is checked here; call [`DistanceMatrix::validate`]
    /// for the symmetric / zero-diagonal / non-negative invariants.
    pub fn from_rows(block_ids: Vec<BlockId>, rows: Vec<Vec<f64>>) -> ClusterResult<Self> {
        Ok(Self { inner: Square::from_rows(block_ids, rows)? })
    }

    /// Number of blocks
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether the matrix covers no blocks
    pub fn is_empty(&self) -> bool {
        self.inner.len() == 0
    }

    /// Distance between the blocks at indices `i` and `j`
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.inner.get(i, j)
    }

    /// Write a distance to both `(i, j)` and `(j, i)`
    pub(crate) fn set_pair(&mut self, i: usize, j: usize, value: f64) {
        self.inner.set_pair(i, j, value);
    }

    /// Distances from block `i` to every block
    pub fn row(&self, i: usize) -> &[f64] {
        self.inner.row(i)
    }

    /// Blocks in matrix order
    pub fn block_ids(&self) -> &[BlockId] {
        &self.inner.block_ids
    }

    /// Matrix index of a block
    pub fn index_of(&self, block_id: &BlockId) -> Option<usize> {
        self.inner.index_of(block_id)
    }

    /// Every unordered pair `(i < j)` exactly once
    pub fn pairs(&self) -> impl Iterator<Item = (&BlockId, &BlockId, f64)> + '_ {
        self.inner.pairs()
    }

    /// Check the symmetric / zero-diagonal / non-negative / finite invariants
    pub fn validate(&self) -> ClusterResult<()> {
        let n = self.len();
        for i in 0..n {
            let diagonal = self.get(i, i);
            if diagonal != 0.0 {
                return Err(ClusterError::InvalidDistanceMatrix {
                    row: i,
                    col: i,
                    reason: format!("diagonal entry for block {} is {}", self.block_ids()[i], diagonal),
                });
            }

            for j in (i + 1)..n {
                let upper = self.get(i, j);
                let lower = self.get(j, i);

                for (row, col, value) in [(i, j, upper), (j, i, lower)] {
                    if !value.is_finite() {
                        return Err(ClusterError::InvalidDistanceMatrix {
                            row,
                            col,
                            reason: format!("non-finite distance {}", value),
                        });
                    }
                    if value < 0.0 {
                        return Err(ClusterError::InvalidDistanceMatrix {
                            row,
                            col,
                            reason: format!("negative distance {}", value),
                        });
                    }
                }

                let scale = upper.abs().max(lower.abs()).max(1.0);
                if (upper - lower).abs() > SYMMETRY_TOLERANCE * scale {
                    return Err(ClusterError::InvalidDistanceMatrix {
                        row: i,
                        col: j,
                        reason: format!(
                            "asymmetric: d({}, {}) = {} but d({}, {}) = {}",
                            self.block_ids()[i], self.block_ids()[j], upper,
                            self.block_ids()[j], self.block_ids()[i], lower
                        ),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Symmetric matrix of similarity scores (higher means more alike)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SimilarityMatrix {
    inner: Square,
}

impl SimilarityMatrix {
    /// All-zero similarity matrix
    pub fn zeros(block_ids: Vec<BlockId>) -> Self {
        Self { inner: Square::zeros(block_ids) }
    }

    /// Build a matrix from explicit rows (shape checked only)
    pub fn from_rows(block_ids: Vec<BlockId>, rows: Vec<Vec<f64>>) -> ClusterResult<Self> {
        Ok(Self { inner: Square::from_rows(block_ids, rows)? })
    }

    /// Number of blocks
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether the matrix covers no blocks
    pub fn is_empty(&self) -> bool {
        self.inner.len() == 0
    }

    /// Similarity between the blocks at indices `i` and `j`
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.inner.get(i, j)
    }

    pub(crate) fn set_pair(&mut self, i: usize, j: usize, value: f64) {
        self.inner.set_pair(i, j, value);
    }

    /// Blocks in matrix order
    pub fn block_ids(&self) -> &[BlockId] {
        &self.inner.block_ids
    }

    /// Every unordered pair `(i < j)` exactly once
    pub fn pairs(&self) -> impl Iterator<Item = (&BlockId, &BlockId, f64)> + '_ {
        self.inner.pairs()
    }

    /// Largest similarity between two distinct blocks (0 for fewer than two blocks)
    pub fn max_off_diagonal(&self) -> f64 {
        self.pairs()
            .map(|(_, _, s)| s)
            .fold(None, |acc: Option<f64>, s| Some(acc.map_or(s, |m| m.max(s))))
            .unwrap_or(0.0)
    }

    /// Convert to distances with `distance = max(similarity) - similarity`.
    ///
    /// The maximum is taken over distinct pairs. The diagonal is forced to
    /// zero and any negative result from floating error is clamped to zero.
    pub fn to_distance(&self) -> DistanceMatrix {
        let max_similarity = self.max_off_diagonal();
        let mut distance = DistanceMatrix::zeros(self.block_ids().to_vec());
        let n = self.len();
        for i in 0..n {
            for j in (i + 1)..n {
                let d = (max_similarity - self.get(i, j)).max(0.0);
                distance.set_pair(i, j, d);
            }
        }
        distance
    }
}

/// Output of the scoring stage: distances, plus similarities when the metric produces them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairScores {
    /// Distances fed to clustering
    pub distances: DistanceMatrix,
    /// Raw similarities, for similarity metrics
    pub similarities: Option<SimilarityMatrix>,
    /// Divergences that were non-finite and clamped to zero
    pub non_finite: usize,
}
