//! Silhouette coefficients for flat clusterings

use indexmap::IndexMap;
use log::info;
use rayon::prelude::*;
use std::collections::BTreeMap;

use crate::errors::{ClusterError, ClusterResult};
use crate::models::{ClusterAssignment, DistanceMatrix, SilhouetteReport};

/// Per-block silhouette coefficients and their unweighted mean.
///
/// For a block in cluster `C`, `a` is its mean distance to the other
/// members of `C` (0 when `C` is a singleton) and `b` the smallest mean
/// distance to any other cluster; the coefficient is `(b - a) / max(a, b)`,
/// or 0 when both are 0. Fewer than two clusters leave the coefficient
/// undefined, which is reported as [`ClusterError::UndefinedSilhouette`].
/// The matrix is validated first.
pub fn silhouette(matrix: &DistanceMatrix, assignment: &ClusterAssignment) -> ClusterResult<SilhouetteReport> {
    matrix.validate()?;

    if matrix.is_empty() {
        return Err(ClusterError::UndefinedSilhouette("no blocks to evaluate".to_string()));
    }

    let mut labels = Vec::with_capacity(matrix.len());
    for block_id in matrix.block_ids() {
        let label = assignment
            .label(block_id)
            .ok_or_else(|| ClusterError::UnknownBlock(format!("{} has no cluster label", block_id)))?;
        labels.push(label);
    }

    let mut members: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (index, &label) in labels.iter().enumerate() {
        members.entry(label).or_default().push(index);
    }
    if members.len() < 2 {
        return Err(ClusterError::UndefinedSilhouette(format!(
            "{} cluster(s) over {} block(s), at least 2 are required",
            members.len(),
            matrix.len()
        )));
    }

    let scores: Vec<f64> = (0..matrix.len())
        .into_par_iter()
        .map(|index| coefficient(matrix.row(index), index, labels[index], &members))
        .collect();

    let mean = scores.iter().sum::<f64>() / scores.len() as f64;
    info!("Mean silhouette over {} block(s) in {} cluster(s): {:.4}", scores.len(), members.len(), mean);

    let scores: IndexMap<_, _> = matrix.block_ids().iter().cloned().zip(scores).collect();
    Ok(SilhouetteReport { scores, mean })
}

fn coefficient(row: &[f64], index: usize, own: usize, members: &BTreeMap<usize, Vec<usize>>) -> f64 {
    let mut a = 0.0;
    let mut b = f64::INFINITY;

    for (&label, cluster) in members {
        if label == own {
            let others = cluster.len() - 1;
            if others > 0 {
                a = cluster.iter().filter(|&&m| m != index).map(|&m| row[m]).sum::<f64>() / others as f64;
            }
        } else {
            let mean = cluster.iter().map(|&m| row[m]).sum::<f64>() / cluster.len() as f64;
            b = b.min(mean);
        }
    }

    let scale = a.max(b);
    if scale == 0.0 {
        0.0
    } else {
        ((b - a) / scale).clamp(-1.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BlockId;

    fn setup(rows: Vec<Vec<f64>>, labels: &[usize]) -> (DistanceMatrix, ClusterAssignment) {
        let ids: Vec<BlockId> = (0..rows.len()).map(|i| BlockId::new(i.to_string())).collect();
        let assignment = ClusterAssignment::from_labels(&ids, labels);
        (DistanceMatrix::from_rows(ids, rows).unwrap(), assignment)
    }

    #[test]
    fn test_hand_computed_values() {
        let (m, assignment) = setup(
            vec![
                vec![0.0, 1.0, 4.0],
                vec![1.0, 0.0, 3.0],
                vec![4.0, 3.0, 0.0],
            ],
            &[1, 1, 2],
        );
        let report = silhouette(&m, &assignment).unwrap();

        // block 0: a = 1, b = 4 -> 0.75; block 1: a = 1, b = 3 -> 2/3; block 2 singleton: a = 0 -> 1
        assert!((report.scores[&BlockId::new("0")] - 0.75).abs() < 1e-12);
        assert!((report.scores[&BlockId::new("1")] - 2.0 / 3.0).abs() < 1e-12);
        assert!((report.scores[&BlockId::new("2")] - 1.0).abs() < 1e-12);
        assert!((report.mean - (0.75 + 2.0 / 3.0 + 1.0) / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_distances_score_zero() {
        let (m, assignment) = setup(vec![vec![0.0; 2]; 2], &[1, 2]);
        let report = silhouette(&m, &assignment).unwrap();
        assert_eq!(report.mean, 0.0);
    }

    #[test]
    fn test_single_cluster_is_undefined() {
        let (m, assignment) = setup(vec![vec![0.0, 1.0], vec![1.0, 0.0]], &[1, 1]);
        let err = silhouette(&m, &assignment).unwrap_err();
        assert!(matches!(err, ClusterError::UndefinedSilhouette(_)));

        let empty = DistanceMatrix::zeros(Vec::new());
        assert!(silhouette(&empty, &ClusterAssignment::from_labels(&[], &[])).is_err());
    }

    #[test]
    fn test_invalid_matrix_is_rejected() {
        let (nan, assignment) = setup(vec![vec![0.0, f64::NAN], vec![f64::NAN, 0.0]], &[1, 2]);
        let err = silhouette(&nan, &assignment).unwrap_err();
        assert!(matches!(err, ClusterError::InvalidDistanceMatrix { .. }));

        let (negative, assignment) = setup(vec![vec![0.0, -1.0], vec![-1.0, 0.0]], &[1, 2]);
        let err = silhouette(&negative, &assignment).unwrap_err();
        assert!(matches!(err, ClusterError::InvalidDistanceMatrix { .. }));
    }

    #[test]
    fn test_unlabelled_block() {
        let (m, _) = setup(vec![vec![0.0, 1.0], vec![1.0, 0.0]], &[1, 2]);
        let partial = ClusterAssignment::from_labels(&[BlockId::new("0")], &[1]);
        let err = silhouette(&m, &partial).unwrap_err();
        assert!(matches!(err, ClusterError::UnknownBlock(_)));
    }
}
