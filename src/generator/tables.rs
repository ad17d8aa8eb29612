//! CSV renderers for the output tables

use crate::analyzer::EntropyRow;
use crate::constants::columns;
use crate::models::{
    ClusterAssignment, ClusterSummary, DistanceMatrix, LinkageTree, SilhouetteReport, SimilarityMatrix, SweepPoint,
};
use crate::utils::csv::push_record;

/// Separator between block ids inside one summary cell
const MEMBER_SEPARATOR: &str = ";";

/// `Block_ID_1,Block_ID_2,Distance`, one row per unordered pair
pub fn distance_table(matrix: &DistanceMatrix) -> String {
    let mut out = String::new();
    push_record(&mut out, &[columns::BLOCK_ID_1, columns::BLOCK_ID_2, columns::DISTANCE]);
    for (left, right, distance) in matrix.pairs() {
        push_record(&mut out, &[left.to_string(), right.to_string(), distance.to_string()]);
    }
    out
}

/// `Block_ID_1,Block_ID_2,Similarity`, one row per unordered pair
pub fn similarity_table(matrix: &SimilarityMatrix) -> String {
    let mut out = String::new();
    push_record(&mut out, &[columns::BLOCK_ID_1, columns::BLOCK_ID_2, columns::SIMILARITY]);
    for (left, right, similarity) in matrix.pairs() {
        push_record(&mut out, &[left.to_string(), right.to_string(), similarity.to_string()]);
    }
    out
}

/// `Block_ID,Cluster`
pub fn cluster_table(assignment: &ClusterAssignment) -> String {
    let mut out = String::new();
    push_record(&mut out, &[columns::BLOCK_ID, columns::CLUSTER]);
    for (block_id, label) in assignment.iter() {
        push_record(&mut out, &[block_id.to_string(), label.to_string()]);
    }
    out
}

/// `Block_ID,Silhouette_Coefficient`
pub fn silhouette_table(report: &SilhouetteReport) -> String {
    let mut out = String::new();
    push_record(&mut out, &[columns::BLOCK_ID, columns::SILHOUETTE]);
    for (block_id, score) in &report.scores {
        push_record(&mut out, &[block_id.to_string(), score.to_string()]);
    }
    out
}

/// `Step,Left,Right,Distance,Size` with scipy-style cluster ids
pub fn linkage_table(tree: &LinkageTree) -> String {
    let mut out = String::new();
    push_record(&mut out, &[columns::STEP, columns::LEFT, columns::RIGHT, columns::DISTANCE, columns::SIZE]);
    for (step, merge) in tree.steps().iter().enumerate() {
        push_record(
            &mut out,
            &[
                step.to_string(),
                merge.left.to_string(),
                merge.right.to_string(),
                merge.distance.to_string(),
                merge.size.to_string(),
            ],
        );
    }
    out
}

/// `Block_ID,Type,Assembly,Probability,Entropy`
pub fn entropy_table(rows: &[EntropyRow]) -> String {
    let mut out = String::new();
    push_record(
        &mut out,
        &[columns::BLOCK_ID, columns::TYPE, columns::ASSEMBLY, columns::PROBABILITY, columns::ENTROPY],
    );
    for row in rows {
        push_record(
            &mut out,
            &[
                row.block_id.to_string(),
                row.var_type.to_string(),
                row.token.clone(),
                row.probability.to_string(),
                row.entropy.to_string(),
            ],
        );
    }
    out
}

/// `Cluster,Size,Block_IDs,Distinct_Instructions,Distinct_Left_Operands,Distinct_Right_Operands`
pub fn summary_table(summaries: &[ClusterSummary]) -> String {
    let mut out = String::new();
    push_record(
        &mut out,
        &[
            columns::CLUSTER,
            columns::SIZE,
            columns::BLOCK_IDS,
            columns::DISTINCT_INSTRUCTIONS,
            columns::DISTINCT_LEFT_OPERANDS,
            columns::DISTINCT_RIGHT_OPERANDS,
        ],
    );
    for summary in summaries {
        let members: Vec<&str> = summary.members.iter().map(|id| id.as_str()).collect();
        push_record(
            &mut out,
            &[
                summary.label.to_string(),
                summary.size().to_string(),
                members.join(MEMBER_SEPARATOR),
                summary.distinct_instructions.to_string(),
                summary.distinct_left_operands.to_string(),
                summary.distinct_right_operands.to_string(),
            ],
        );
    }
    out
}

/// `Threshold,Clusters,Mean_Silhouette`; an undefined silhouette is left empty
pub fn sweep_table(points: &[SweepPoint]) -> String {
    let mut out = String::new();
    push_record(&mut out, &[columns::THRESHOLD, columns::CLUSTERS, columns::MEAN_SILHOUETTE]);
    for point in points {
        push_record(
            &mut out,
            &[
                point.threshold.to_string(),
                point.clusters.to_string(),
                point.mean_silhouette.map(|s| s.to_string()).unwrap_or_default(),
            ],
        );
    }
    out
}
