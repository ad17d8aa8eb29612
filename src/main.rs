use anyhow::{Context, Result};
use blockclust::{analyze_file, cache::Cache, forget_cached_scores, config::{AnalysisConfig, MalformedPolicy}};
use env_logger::Builder;
use log::{LevelFilter, info};
use std::io::Write;
use std::path::PathBuf;

fn print_usage(program: &str) {
    println!("Block Clustering Engine v{}", blockclust::VERSION);
    println!("\nUsage:");
    println!("  {} <INPUT.csv> [OPTIONS]", program);
    println!("  {} --clear-cache", program);
    println!("  {} --version", program);
    println!("\nOptions:");
    println!("  --output, -o DIR        Write CSV tables and report.json to DIR");
    println!("  --config, -c FILE       Load settings from a JSON file (flags override it)");
    println!("  --kind, -k KIND         Input kind: occurrences, probabilities or disassembly");
    println!("  --metric, -m METRIC     Pair metric: jsd or overlap");
    println!("  --linkage, -l LINKAGE   Linkage: average or ward");
    println!("  --threshold, -t T       Cut the dendrogram at distance T");
    println!("  --sweep T1,T2,...       Also report clusters and silhouette at these thresholds");
    println!("  --entropy-filter        Keep only high-entropy tokens before scoring");
    println!("  --strict                Abort on the first malformed row instead of skipping it");
    println!("  --sequential            Score pairs on a single thread");
    println!("  --no-cache              Don't use cached distance matrices");
    println!("  --refresh-cache         Recompute the cached distance matrix for this input");
    println!("  --clear-cache           Remove every cached distance matrix");
    println!("  --verbose               Log debug output");
    println!("  --version, -v           Show version information");
}

/// Value following a flag
fn flag_value<'a>(args: &'a [String], i: usize, flag: &str) -> Result<&'a str> {
    args.get(i + 1)
        .map(|s| s.as_str())
        .with_context(|| format!("Missing value for {}", flag))
}

// Simple CLI without clap
fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let verbose = args.iter().any(|a| a == "--verbose");

    // Initialize logger
    Builder::new()
        .format(|buf, record| {
            let secs = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or_default();
            writeln!(buf, "{} [{}] - {}", secs, record.level(), record.args())
        })
        .filter(None, if verbose { LevelFilter::Debug } else { LevelFilter::Info })
        .parse_env("RUST_LOG")
        .init();

    // Check for --version command
    if args.len() > 1 && (args[1] == "--version" || args[1] == "-v") {
        println!("Block Clustering Engine v{}", blockclust::VERSION);
        return Ok(());
    }

    // Check for --clear-cache command
    if args.len() > 1 && args[1] == "--clear-cache" {
        Cache::open_default().clear_all()?;
        println!("Cleared all cached distance matrices");
        return Ok(());
    }

    if args.len() < 2 || args[1].starts_with('-') {
        print_usage(&args[0]);
        return Ok(());
    }

    let input = PathBuf::from(&args[1]);

    // Parse optional arguments
    let mut output_dir = None;
    let mut config_path = None;
    let mut overrides: Vec<(String, String)> = Vec::new();
    let mut entropy_filter = false;
    let mut strict = false;
    let mut sequential = false;
    let mut no_cache = false;
    let mut refresh_cache = false;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--output" | "-o" => {
                output_dir = Some(PathBuf::from(flag_value(&args, i, "--output")?));
                i += 2;
            },
            "--config" | "-c" => {
                config_path = Some(PathBuf::from(flag_value(&args, i, "--config")?));
                i += 2;
            },
            flag @ ("--kind" | "-k" | "--metric" | "-m" | "--linkage" | "-l" | "--threshold" | "-t" | "--sweep") => {
                overrides.push((flag.to_string(), flag_value(&args, i, flag)?.to_string()));
                i += 2;
            },
            "--entropy-filter" => {
                entropy_filter = true;
                i += 1;
            },
            "--strict" => {
                strict = true;
                i += 1;
            },
            "--sequential" => {
                sequential = true;
                i += 1;
            },
            "--no-cache" => {
                no_cache = true;
                i += 1;
            },
            "--refresh-cache" => {
                refresh_cache = true;
                i += 1;
            },
            "--verbose" => {
                i += 1;
            },
            _ => {
                println!("Unknown argument: {}", args[i]);
                i += 1;
            }
        }
    }

    // File settings first, flags on top
    let mut config = match &config_path {
        Some(path) => AnalysisConfig::from_file(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => AnalysisConfig::default(),
    };

    for (flag, value) in &overrides {
        match flag.as_str() {
            "--kind" | "-k" => config.input_kind = value.parse().map_err(anyhow::Error::msg)?,
            "--metric" | "-m" => config.metric = value.parse().map_err(anyhow::Error::msg)?,
            "--linkage" | "-l" => config.linkage = value.parse().map_err(anyhow::Error::msg)?,
            "--threshold" | "-t" => {
                let threshold: f64 = value
                    .parse()
                    .with_context(|| format!("Invalid threshold: {}", value))?;
                config.threshold = Some(threshold);
            },
            "--sweep" => {
                config.sweep = value
                    .split(',')
                    .filter(|s| !s.trim().is_empty())
                    .map(|s| s.trim().parse::<f64>().with_context(|| format!("Invalid sweep threshold: {}", s)))
                    .collect::<Result<Vec<_>>>()?;
            },
            _ => {}
        }
    }
    if entropy_filter {
        config.entropy_filter = true;
    }
    if strict {
        config.malformed = MalformedPolicy::Abort;
    }
    if sequential {
        config.parallel = false;
    }
    if no_cache {
        config.use_cache = false;
    }

    if refresh_cache && config.use_cache {
        forget_cached_scores(&input, &config, &Cache::open_default())?;
    }

    // Show progress message
    println!("Clustering blocks from: {}", input.display());
    info!("Configuration: {:?}", config);

    let analysis = analyze_file(&input, &config, output_dir.as_deref())?;
    let report = &analysis.report;

    println!("Blocks: {}", report.blocks.len());
    if report.skipped_records > 0 {
        println!("Skipped malformed records: {}", report.skipped_records);
    }
    if report.assignment.is_some() {
        println!("Clusters: {}", report.cluster_count());
    }
    match (&report.silhouette, &report.silhouette_note) {
        (Some(silhouette), _) => println!("Mean silhouette: {:.4}", silhouette.mean),
        (None, Some(note)) => println!("Mean silhouette: undefined ({})", note),
        (None, None) => {}
    }

    // Print the report if no output directory specified
    match output_dir {
        Some(dir) => println!("Saved to: {}", dir.display()),
        None => println!("{}", serde_json::to_string_pretty(report)?),
    }

    Ok(())
}
