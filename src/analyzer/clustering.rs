//! Agglomerative hierarchical clustering
//!
//! Generic agglomeration over a dense working copy of the distance matrix,
//! with a nearest-neighbour cache per slot. Average linkage divides a running
//! sum of member-pair distances, so equal means compare equal; Ward uses the
//! Lance–Williams update. Ties are broken on the lowest (left, right) slot pair; because a
//! merged cluster keeps the slot of its lower member, a slot index is always
//! the lowest original block index in that cluster, so the tie-break is on
//! original block order and never on iteration order.

use log::{debug, info};

use crate::errors::{ClusterError, ClusterResult};
use crate::models::{BlockId, ClusterAssignment, DistanceMatrix, Linkage, LinkageTree, MergeStep};

/// Builds a [`LinkageTree`] from a distance matrix and cuts it into flat clusters
#[derive(Debug, Clone, Copy, Default)]
pub struct HierarchicalClusterer {
    linkage: Linkage,
}

impl HierarchicalClusterer {
    /// Create a clusterer with the given linkage criterion
    pub fn new(linkage: Linkage) -> Self {
        Self { linkage }
    }

    /// Linkage criterion in use
    pub fn linkage(&self) -> Linkage {
        self.linkage
    }

    /// Run agglomerative clustering to a single cluster.
    ///
    /// The matrix is validated first; no merge happens on an invalid one.
    pub fn fit(&self, matrix: &DistanceMatrix) -> ClusterResult<LinkageTree> {
        matrix.validate()?;

        let n = matrix.len();
        if n == 0 {
            return Ok(LinkageTree::new(0, Vec::new()));
        }

        let mut state = Agglomeration::new(matrix);
        let mut steps = Vec::with_capacity(n - 1);

        for step in 0..(n - 1) {
            let Some((a, b)) = state.closest_pair() else {
                break;
            };
            let merge = state.merge(a, b, n + step, self.linkage);
            debug!(
                "Step {}: merged {} and {} at {:.6} (size {})",
                step, merge.left, merge.right, merge.distance, merge.size
            );
            steps.push(merge);
        }

        info!("{} linkage over {} block(s) produced {} merge(s)", self.linkage, n, steps.len());
        Ok(LinkageTree::new(n, steps))
    }

    /// Cut a tree built from `matrix` at `threshold`
    pub fn cut(&self, tree: &LinkageTree, matrix: &DistanceMatrix, threshold: f64) -> ClusterResult<ClusterAssignment> {
        cut_tree(tree, matrix.block_ids(), threshold)
    }

    /// Fit, then cut when a threshold is given
    pub fn fit_cut(
        &self,
        matrix: &DistanceMatrix,
        threshold: Option<f64>,
    ) -> ClusterResult<(LinkageTree, Option<ClusterAssignment>)> {
        let tree = self.fit(matrix)?;
        let assignment = match threshold {
            Some(t) => Some(self.cut(&tree, matrix, t)?),
            None => None,
        };
        Ok((tree, assignment))
    }
}

/// Working state of one agglomeration run
struct Agglomeration {
    n: usize,
    distances: Vec<f64>,
    /// sum of member-pair distances between two slots
    sums: Vec<f64>,
    active: Vec<bool>,
    sizes: Vec<usize>,
    /// scipy-style id of the cluster currently held in each slot
    ids: Vec<usize>,
    /// nearest active slot `j > i`, if any
    nearest: Vec<Option<usize>>,
    nearest_distance: Vec<f64>,
}

impl Agglomeration {
    fn new(matrix: &DistanceMatrix) -> Self {
        let n = matrix.len();
        let mut distances = vec![0.0; n * n];
        for i in 0..n {
            for j in (i + 1)..n {
                // the upper triangle is authoritative, validation bounds the asymmetry
                let d = matrix.get(i, j);
                distances[i * n + j] = d;
                distances[j * n + i] = d;
            }
        }

        let mut state = Self {
            n,
            sums: distances.clone(),
            distances,
            active: vec![true; n],
            sizes: vec![1; n],
            ids: (0..n).collect(),
            nearest: vec![None; n],
            nearest_distance: vec![f64::INFINITY; n],
        };
        for i in 0..n {
            state.refresh_nearest(i);
        }
        state
    }

    fn get(&self, i: usize, j: usize) -> f64 {
        self.distances[i * self.n + j]
    }

    fn set(&mut self, i: usize, j: usize, value: f64) {
        self.distances[i * self.n + j] = value;
        self.distances[j * self.n + i] = value;
    }

    fn sum(&self, i: usize, j: usize) -> f64 {
        self.sums[i * self.n + j]
    }

    fn set_sum(&mut self, i: usize, j: usize, value: f64) {
        self.sums[i * self.n + j] = value;
        self.sums[j * self.n + i] = value;
    }

    /// Recompute the nearest active slot above `i` (lowest slot wins a tie)
    fn refresh_nearest(&mut self, i: usize) {
        let mut best = None;
        let mut best_distance = f64::INFINITY;
        for j in (i + 1)..self.n {
            if self.active[j] && (best.is_none() || self.get(i, j) < best_distance) {
                best = Some(j);
                best_distance = self.get(i, j);
            }
        }
        self.nearest[i] = best;
        self.nearest_distance[i] = best_distance;
    }

    /// Globally closest active pair, lowest `(distance, i, j)` first
    fn closest_pair(&self) -> Option<(usize, usize)> {
        let mut best: Option<(usize, usize)> = None;
        let mut best_distance = f64::INFINITY;
        for i in 0..self.n {
            if !self.active[i] {
                continue;
            }
            if let Some(j) = self.nearest[i] {
                if best.is_none() || self.nearest_distance[i] < best_distance {
                    best = Some((i, j));
                    best_distance = self.nearest_distance[i];
                }
            }
        }
        best
    }

    /// Merge slot `b` into slot `a` (`a < b`) and update distances
    fn merge(&mut self, a: usize, b: usize, new_id: usize, linkage: Linkage) -> MergeStep {
        let d_ab = self.get(a, b);
        let (size_a, size_b) = (self.sizes[a], self.sizes[b]);

        let step = MergeStep {
            left: self.ids[a].min(self.ids[b]),
            right: self.ids[a].max(self.ids[b]),
            distance: d_ab,
            size: size_a + size_b,
        };

        for k in 0..self.n {
            if !self.active[k] || k == a || k == b {
                continue;
            }
            let updated = match linkage {
                Linkage::Average => {
                    let sum = self.sum(k, a) + self.sum(k, b);
                    self.set_sum(k, a, sum);
                    sum / (self.sizes[k] * (size_a + size_b)) as f64
                }
                Linkage::Ward => ward_distance(self.get(k, a), self.get(k, b), d_ab, size_a, size_b, self.sizes[k]),
            };
            self.set(k, a, updated);
        }

        self.active[b] = false;
        self.sizes[a] = size_a + size_b;
        self.sizes[b] = 0;
        self.ids[a] = new_id;
        self.nearest[b] = None;
        self.nearest_distance[b] = f64::INFINITY;

        for i in 0..self.n {
            if !self.active[i] {
                continue;
            }
            if i == a {
                self.refresh_nearest(i);
            } else if i < a {
                match self.nearest[i] {
                    Some(j) if j == a || j == b => self.refresh_nearest(i),
                    Some(j) => {
                        let d = self.get(i, a);
                        if d < self.nearest_distance[i] || (d == self.nearest_distance[i] && a < j) {
                            self.nearest[i] = Some(a);
                            self.nearest_distance[i] = d;
                        }
                    }
                    None => self.refresh_nearest(i),
                }
            } else if i < b && self.nearest[i] == Some(b) {
                self.refresh_nearest(i);
            }
        }

        step
    }
}

/// Lance–Williams Ward distance from cluster `k` to the union of clusters `i` and `j`
fn ward_distance(d_ki: f64, d_kj: f64, d_ij: f64, n_i: usize, n_j: usize, n_k: usize) -> f64 {
    let (n_i, n_j, n_k) = (n_i as f64, n_j as f64, n_k as f64);
    let squared = ((n_i + n_k) * d_ki * d_ki + (n_j + n_k) * d_kj * d_kj - n_k * d_ij * d_ij) / (n_i + n_j + n_k);
    squared.max(0.0).sqrt()
}

/// Flat clusters: two blocks share a label iff merges at distance `<= threshold` join them.
///
/// Labels start at 1 and are numbered by first appearance in block order.
/// Merges are applied in tree order up to the first one above the threshold.
pub fn cut_tree(tree: &LinkageTree, block_ids: &[BlockId], threshold: f64) -> ClusterResult<ClusterAssignment> {
    if tree.leaves() != block_ids.len() {
        return Err(ClusterError::ShapeMismatch(format!(
            "tree has {} leaves but {} block ids were given",
            tree.leaves(),
            block_ids.len()
        )));
    }
    if threshold.is_nan() {
        return Err(ClusterError::Config("cut threshold is NaN".to_string()));
    }

    let n = tree.leaves();
    let mut parent: Vec<usize> = (0..n).collect();
    // any leaf of each cluster id, leaves first then one per merge
    let mut representative: Vec<usize> = (0..n).collect();

    for step in tree.steps() {
        if step.distance > threshold {
            break;
        }
        let (Some(&left), Some(&right)) = (representative.get(step.left), representative.get(step.right)) else {
            return Err(ClusterError::ShapeMismatch(format!(
                "merge of {} and {} references an unknown cluster",
                step.left, step.right
            )));
        };
        let (root_left, root_right) = (find(&mut parent, left), find(&mut parent, right));
        parent[root_right.max(root_left)] = root_left.min(root_right);
        representative.push(left);
    }

    let mut labels = Vec::with_capacity(n);
    let mut label_of_root = vec![0usize; n];
    let mut next_label = 1;
    for leaf in 0..n {
        let root = find(&mut parent, leaf);
        if label_of_root[root] == 0 {
            label_of_root[root] = next_label;
            next_label += 1;
        }
        labels.push(label_of_root[root]);
    }

    debug!("Cut at {} produced {} cluster(s)", threshold, next_label - 1);
    Ok(ClusterAssignment::from_labels(block_ids, &labels))
}

fn find(parent: &mut [usize], mut x: usize) -> usize {
    while parent[x] != x {
        parent[x] = parent[parent[x]];
        x = parent[x];
    }
    x
}
