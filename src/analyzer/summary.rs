//! Per-cluster token summaries

use std::collections::BTreeSet;

use crate::models::{BlockProfiles, ClusterAssignment, ClusterSummary, VariableType};

/// Describe each flat cluster by its members and distinct tokens per variable type.
///
/// Clusters are returned in label order; members keep block order. Blocks
/// without a profile contribute no tokens.
pub fn summarize_clusters(assignment: &ClusterAssignment, profiles: &BlockProfiles) -> Vec<ClusterSummary> {
    assignment
        .clusters()
        .into_iter()
        .map(|(label, members)| {
            let distinct = |var_type: VariableType| {
                members
                    .iter()
                    .filter_map(|id| profiles.get(id))
                    .filter_map(|profile| profile.get(var_type))
                    .flat_map(|distribution| distribution.tokens())
                    .collect::<BTreeSet<_>>()
                    .len()
            };

            ClusterSummary {
                label,
                distinct_instructions: distinct(VariableType::Instruction),
                distinct_left_operands: distinct(VariableType::LeftOperand),
                distinct_right_operands: distinct(VariableType::RightOperand),
                members,
            }
        })
        .collect()
}
