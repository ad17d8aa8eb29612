//! A library for grouping disassembled basic blocks by statistical similarity
//!
//! This crate turns per-block instruction and operand token occurrences into
//! probability distributions, scores every pair of blocks with the
//! Jensen–Shannon divergence (or a probability-overlap similarity), builds an
//! agglomerative clustering over the resulting distance matrix, cuts it into
//! flat clusters and scores them with silhouette coefficients.

pub mod analyzer;
pub mod cache;
pub mod config;
pub mod constants;
pub mod errors;
pub mod generator;
pub mod models;
pub mod utils;

use std::fs;
use std::path::Path;
use anyhow::{Context, Result};
use log::{info, warn};

use crate::analyzer::{Analysis, Analyzer};
use crate::cache::Cache;
use crate::config::AnalysisConfig;
use crate::errors::ClusterResult;
use crate::models::TokenRecord;

/// Main entry point: analyze an input table and optionally write every output to a directory.
///
/// The distance matrix cache under the user cache directory is consulted
/// when `config.use_cache` is set.
pub fn analyze_file(input: &Path, config: &AnalysisConfig, output_dir: Option<&Path>) -> Result<Analysis> {
    let cache = config.use_cache.then(Cache::open_default);
    analyze_file_with_cache(input, config, cache.as_ref(), output_dir)
}

/// Like [`analyze_file`], with an explicit cache (or none)
pub fn analyze_file_with_cache(
    input: &Path,
    config: &AnalysisConfig,
    cache: Option<&Cache>,
    output_dir: Option<&Path>,
) -> Result<Analysis> {
    config.validate()?;

    info!("Reading {} table: {}", config.input_kind, input.display());
    let bytes = fs::read(input)
        .with_context(|| format!("Failed to read input file: {}", input.display()))?;
    let text = std::str::from_utf8(&bytes)
        .with_context(|| format!("Input file is not valid UTF-8: {}", input.display()))?;
    let table = utils::csv::parse_table(text)
        .with_context(|| format!("Failed to parse CSV: {}", input.display()))?;

    // Load profiles
    let analyzer = Analyzer::new(config.clone());
    let (profiles, skipped) = analyzer
        .load_profiles(&table)
        .with_context(|| format!("Failed to build distributions from {}", input.display()))?;

    // Look up cached scores
    let key = Cache::key_for(&bytes, config);
    let cached = match cache {
        Some(cache) => cache.get_scores(&key).unwrap_or_else(|e| {
            warn!("Failed to read score cache: {:#}", e);
            None
        }),
        None => None,
    };

    let mut analysis = analyzer
        .run(profiles, skipped, cached)
        .with_context(|| format!("Analysis of {} failed", input.display()))?;
    analysis.report.input = Some(input.display().to_string());

    if let Some(cache) = cache {
        if !analysis.report.from_cache {
            if let Err(e) = cache.save_scores(&key, &analysis.scores) {
                warn!("Failed to cache scores: {:#}", e);
            }
        }
    }

    // Generate and save the outputs if a directory is provided
    if let Some(dir) = output_dir {
        generator::save_outputs(&analysis, dir)?;
    }

    Ok(analysis)
}

/// Drop the cached scores for an input under the given settings
pub fn forget_cached_scores(input: &Path, config: &AnalysisConfig, cache: &Cache) -> Result<()> {
    let bytes = fs::read(input)
        .with_context(|| format!("Failed to read input file: {}", input.display()))?;
    cache.clear(&Cache::key_for(&bytes, config))
}

/// Analyze in-memory occurrence records (no cache, no files)
pub fn analyze_records(records: &[TokenRecord], config: &AnalysisConfig) -> ClusterResult<Analysis> {
    config.validate()?;
    let analyzer = Analyzer::new(config.clone());
    let profiles = analyzer.profiles_from_records(records);
    analyzer.run(profiles, 0, None)
}

/// Version of the block clustering engine
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
