use blockclust::{
    analyze_file_with_cache, analyze_records, forget_cached_scores,
    cache::Cache,
    config::{AnalysisConfig, InputKind, MalformedPolicy, Metric},
    generator,
    models::{BlockId, Linkage, TokenRecord, VariableType},
    utils::csv::parse_table,
};
use std::fs;
use tempfile::tempdir;

const DISASSEMBLY: &str = "\
Block_ID,Instruction,Left Operand,Right Operand
10,mov,eax,ebx
10,add,eax,1
10,ret,,
20,mov,eax,ebx
20,add,eax,1
20,ret,,
30,push,rbp,
30,call,\"qword ptr [rip+0x20]\",
30,pop,rbp,
40,push,rbp,
40,call,\"qword ptr [rip+0x20]\",
40,leave,,
";

fn config(kind: InputKind) -> AnalysisConfig {
    AnalysisConfig {
        input_kind: kind,
        threshold: Some(0.5),
        use_cache: false,
        ..AnalysisConfig::default()
    }
}

#[test]
fn test_disassembly_file_to_outputs() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("blocks.csv");
    fs::write(&input, DISASSEMBLY).unwrap();
    let out = dir.path().join("out");

    let mut config = config(InputKind::Disassembly);
    config.sweep = vec![0.0, 0.5, 3.0];
    let analysis = analyze_file_with_cache(&input, &config, None, Some(&out)).unwrap();
    let report = &analysis.report;

    assert_eq!(report.blocks.len(), 4);
    assert_eq!(report.skipped_records, 0);
    assert_eq!(report.cluster_count(), 2);

    let assignment = report.assignment.as_ref().unwrap();
    let label = |id: &str| assignment.label(&BlockId::new(id)).unwrap();
    assert_eq!(label("10"), label("20"));
    assert_eq!(label("30"), label("40"));
    assert_ne!(label("10"), label("30"));

    let silhouette = report.silhouette.as_ref().unwrap();
    assert!(silhouette.mean > 0.0 && silhouette.mean <= 1.0);

    for name in [
        generator::DISTANCES_FILE,
        generator::CLUSTERS_FILE,
        generator::SILHOUETTE_FILE,
        generator::LINKAGE_FILE,
        generator::ENTROPY_FILE,
        generator::SUMMARY_FILE,
        generator::SWEEP_FILE,
        generator::REPORT_FILE,
    ] {
        assert!(out.join(name).exists(), "{} was not written", name);
    }
    assert!(!out.join(generator::SIMILARITIES_FILE).exists());

    let distances = parse_table(&fs::read_to_string(out.join(generator::DISTANCES_FILE)).unwrap()).unwrap();
    assert_eq!(distances.records.len(), 6);

    let clusters = parse_table(&fs::read_to_string(out.join(generator::CLUSTERS_FILE)).unwrap()).unwrap();
    assert_eq!(clusters.headers, vec!["Block_ID", "Cluster"]);
    assert_eq!(clusters.records[0].fields, vec!["10", "1"]);

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.join(generator::REPORT_FILE)).unwrap()).unwrap();
    assert_eq!(json["blocks"].as_array().unwrap().len(), 4);
    assert_eq!(json["config"]["input_kind"], "disassembly");
}

#[test]
fn test_occurrence_file_with_malformed_rows() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("occurrences.csv");
    fs::write(
        &input,
        "Block_ID,Type,Assembly\n1,Instruction,mov\n1,Instruction,\n2,Instruction,mov\n3,Operand,eax\n3,Instruction,jmp\n",
    )
    .unwrap();

    let analysis = analyze_file_with_cache(&input, &config(InputKind::Occurrences), None, None).unwrap();
    assert_eq!(analysis.report.skipped_records, 2);
    assert_eq!(analysis.report.blocks.len(), 3);
    assert_eq!(analysis.report.input.as_deref(), Some(input.display().to_string().as_str()));

    let strict = AnalysisConfig {
        malformed: MalformedPolicy::Abort,
        ..config(InputKind::Occurrences)
    };
    let err = analyze_file_with_cache(&input, &strict, None, None).unwrap_err();
    assert!(format!("{:#}", err).contains("line 3"));
}

#[test]
fn test_probability_file_with_overlap_metric() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("probabilities.csv");
    fs::write(
        &input,
        "Block_ID,Type,Assembly,Probability,Entropy\n\
         a,Instruction,mov,0.5,0.5\n\
         a,Instruction,add,0.5,0.5\n\
         b,Instruction,mov,0.5,0.5\n\
         b,Instruction,add,0.5,0.5\n\
         c,Instruction,jmp,1.0,0.0\n",
    )
    .unwrap();
    let out = dir.path().join("out");

    let config = AnalysisConfig {
        metric: Metric::Overlap,
        ..config(InputKind::Probabilities)
    };
    let analysis = analyze_file_with_cache(&input, &config, None, Some(&out)).unwrap();

    assert!(analysis.scores.similarities.is_some());
    assert!(out.join(generator::SIMILARITIES_FILE).exists());
    assert_eq!(analysis.report.cluster_count(), 2);
}

#[test]
fn test_cached_scores_are_reused() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("blocks.csv");
    fs::write(&input, DISASSEMBLY).unwrap();
    let cache = Cache::with_dir(dir.path().join("cache"));

    let mut config = config(InputKind::Disassembly);
    config.use_cache = true;

    let first = analyze_file_with_cache(&input, &config, Some(&cache), None).unwrap();
    assert!(!first.report.from_cache);

    config.linkage = Linkage::Ward;
    let second = analyze_file_with_cache(&input, &config, Some(&cache), None).unwrap();
    assert!(second.report.from_cache);
    let (a, b) = (&first.scores.distances, &second.scores.distances);
    assert_eq!(a.block_ids(), b.block_ids());
    for (x, y) in a.pairs().zip(b.pairs()) {
        assert!((x.2 - y.2).abs() < 1e-12);
    }

    forget_cached_scores(&input, &config, &cache).unwrap();
    let refreshed = analyze_file_with_cache(&input, &config, Some(&cache), None).unwrap();
    assert!(!refreshed.report.from_cache);

    cache.clear_all().unwrap();
    let third = analyze_file_with_cache(&input, &config, Some(&cache), None).unwrap();
    assert!(!third.report.from_cache);
}

#[test]
fn test_records_without_threshold() {
    let records = vec![
        TokenRecord::new("1", VariableType::Instruction, "mov"),
        TokenRecord::new("1", VariableType::LeftOperand, "eax"),
        TokenRecord::new("2", VariableType::Instruction, "mov"),
        TokenRecord::new("3", VariableType::Instruction, "ret"),
    ];
    let config = AnalysisConfig {
        threshold: None,
        ..AnalysisConfig::default()
    };

    let analysis = analyze_records(&records, &config).unwrap();
    assert!(analysis.report.assignment.is_none());
    assert!(analysis.report.silhouette.is_none());
    assert_eq!(analysis.report.linkage.len(), 2);
    // block 1 differs from block 2 only by its left operand
    assert!((analysis.scores.distances.get(0, 1) - 0.5).abs() < 1e-12);
}

#[test]
fn test_missing_input_file() {
    let dir = tempdir().unwrap();
    let err = analyze_file_with_cache(&dir.path().join("absent.csv"), &config(InputKind::Occurrences), None, None)
        .unwrap_err();
    assert!(err.to_string().contains("Failed to read input file"));
}
