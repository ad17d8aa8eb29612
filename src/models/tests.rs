#[cfg(test)]
mod tests {
    use crate::constants::DISTRIBUTION_SUM_TOLERANCE;
    use crate::models::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_variable_type_parsing() {
        assert_eq!("Instruction".parse::<VariableType>().unwrap(), VariableType::Instruction);
        assert_eq!("Left Operand".parse::<VariableType>().unwrap(), VariableType::LeftOperand);
        assert_eq!("right_operand".parse::<VariableType>().unwrap(), VariableType::RightOperand);
        assert!("Opcode".parse::<VariableType>().is_err());
        assert_eq!(VariableType::LeftOperand.to_string(), "Left Operand");
    }

    #[test]
    fn test_distribution_from_counts() {
        let mut counts = BTreeMap::new();
        counts.insert("mov".to_string(), 3);
        counts.insert("add".to_string(), 1);

        let distribution = ProbabilityDistribution::from_counts(&counts);
        assert_eq!(distribution.len(), 2);
        assert_eq!(distribution.get("mov"), 0.75);
        assert_eq!(distribution.get("jmp"), 0.0);
        assert!((distribution.total() - 1.0).abs() < DISTRIBUTION_SUM_TOLERANCE);

        assert!(ProbabilityDistribution::from_counts(&BTreeMap::new()).is_empty());
    }

    #[test]
    fn test_distribution_from_weights() {
        let distribution = ProbabilityDistribution::from_weights(vec![("a", 1.0), ("b", 0.0), ("a", 1.0), ("c", 2.0)]);
        assert_eq!(distribution.tokens().collect::<Vec<_>>(), vec!["a", "c"]);
        assert_eq!(distribution.get("a"), 0.5);

        assert!(ProbabilityDistribution::from_weights(vec![("a", 0.0)]).is_empty());
    }

    #[test]
    fn test_profile_keeps_empty_and_missing_apart() {
        let mut profile = BlockProfile::new();
        profile.insert(VariableType::Instruction, ProbabilityDistribution::from_weights(vec![("mov", 1.0)]));
        profile.insert(VariableType::LeftOperand, ProbabilityDistribution::empty());

        assert!(profile.get(VariableType::LeftOperand).is_none());
        assert_eq!(profile.variable_types().collect::<Vec<_>>(), vec![VariableType::Instruction]);

        profile.insert(VariableType::Instruction, ProbabilityDistribution::empty());
        assert!(profile.is_empty());
    }

    #[test]
    fn test_matrix_shape_checks() {
        let ids = vec![BlockId::new("a"), BlockId::new("b")];
        assert!(DistanceMatrix::from_rows(ids.clone(), vec![vec![0.0, 1.0]]).is_err());
        assert!(DistanceMatrix::from_rows(ids.clone(), vec![vec![0.0, 1.0], vec![1.0]]).is_err());

        let matrix = DistanceMatrix::from_rows(ids, vec![vec![0.0, 1.0], vec![1.0, 0.0]]).unwrap();
        assert_eq!(matrix.index_of(&BlockId::new("b")), Some(1));
        assert_eq!(matrix.row(1), &[1.0, 0.0]);
        assert_eq!(matrix.pairs().count(), 1);
    }

    #[test]
    fn test_similarity_to_distance_ignores_diagonal() {
        let ids = vec![BlockId::new("a"), BlockId::new("b"), BlockId::new("c")];
        let similarity = SimilarityMatrix::from_rows(
            ids,
            vec![vec![5.0, 0.8, 0.3], vec![0.8, 5.0, 0.6], vec![0.3, 0.6, 5.0]],
        )
        .unwrap();

        assert_eq!(similarity.max_off_diagonal(), 0.8);
        let distance = similarity.to_distance();
        assert!(distance.validate().is_ok());
        assert_eq!(distance.get(0, 1), 0.0);
        assert!((distance.get(0, 2) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_assignment_clusters() {
        let ids = vec![BlockId::new("x"), BlockId::new("y"), BlockId::new("z")];
        let assignment = ClusterAssignment::from_labels(&ids, &[2, 1, 2]);

        assert_eq!(assignment.cluster_count(), 2);
        assert_eq!(assignment.clusters()[&2], vec![BlockId::new("x"), BlockId::new("z")]);
        assert_eq!(assignment.label(&BlockId::new("y")), Some(1));
        assert_eq!(assignment.label(&BlockId::new("w")), None);
    }

    #[test]
    fn test_linkage_parsing() {
        assert_eq!("Ward".parse::<Linkage>().unwrap(), Linkage::Ward);
        assert_eq!(" average ".parse::<Linkage>().unwrap(), Linkage::Average);
        assert!("single".parse::<Linkage>().is_err());
        assert_eq!(serde_json::to_string(&Linkage::Ward).unwrap(), "\"ward\"");
    }

    #[test]
    fn test_profile_serialization() {
        let mut profile = BlockProfile::new();
        profile.insert(VariableType::RightOperand, ProbabilityDistribution::from_weights(vec![("0x10", 1.0)]));

        let json = serde_json::to_string(&profile).unwrap();
        let parsed: BlockProfile = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, profile);
    }
}
