//! Output generation for analysis results
//!
//! Writes the CSV tables and the JSON report of a run into an output directory.

pub mod tables;

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use anyhow::{Context, Result};
use log::{info, debug, error};

use crate::analyzer::Analysis;
use crate::models::AnalysisReport;
use crate::utils::absolute_path;

pub const DISTANCES_FILE: &str = "distances.csv";
pub const SIMILARITIES_FILE: &str = "similarities.csv";
pub const CLUSTERS_FILE: &str = "clusters.csv";
pub const SILHOUETTE_FILE: &str = "silhouette.csv";
pub const LINKAGE_FILE: &str = "linkage.csv";
pub const ENTROPY_FILE: &str = "entropy.csv";
pub const SUMMARY_FILE: &str = "cluster_summary.csv";
pub const SWEEP_FILE: &str = "threshold_sweep.csv";
pub const REPORT_FILE: &str = "report.json";

/// Write `contents` to `path`, creating parent directories as needed
fn write_file(path: &Path, contents: &str) -> Result<PathBuf> {
    let absolute_path = absolute_path(path)
        .with_context(|| format!("Failed to resolve path: {}", path.display()))?;

    if let Some(parent) = absolute_path.parent() {
        if !parent.exists() {
            info!("Creating directory: {}", parent.display());
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
    }

    let mut file = match File::create(&absolute_path) {
        Ok(f) => f,
        Err(e) => {
            error!("Failed to create file: {} - Error: {}", absolute_path.display(), e);
            return Err(anyhow::anyhow!("Failed to create file: {} - Error: {}", absolute_path.display(), e));
        }
    };

    if let Err(e) = file.write_all(contents.as_bytes()) {
        error!("Failed to write to file: {} - Error: {}", absolute_path.display(), e);
        return Err(anyhow::anyhow!("Failed to write to file: {} - Error: {}", absolute_path.display(), e));
    }

    debug!("Wrote {} bytes to {}", contents.len(), absolute_path.display());
    Ok(absolute_path)
}

/// Save the JSON report to a file
pub fn save_report(report: &AnalysisReport, path: &Path) -> Result<PathBuf> {
    let json = serde_json::to_string_pretty(report)
        .with_context(|| "Failed to serialize report to JSON")?;

    info!("Serialized report to JSON ({} bytes)", json.len());
    write_file(path, &json)
}

/// Save every table of a run, plus the report, into `dir`.
///
/// Tables that do not apply to the run (similarities for a divergence
/// metric, clusters without a threshold, an undefined silhouette, an empty
/// sweep) are not written. Returns the written paths.
pub fn save_outputs(analysis: &Analysis, dir: &Path) -> Result<Vec<PathBuf>> {
    info!("Saving outputs to: {}", dir.display());
    let report = &analysis.report;

    let mut outputs = vec![
        (DISTANCES_FILE, tables::distance_table(&analysis.scores.distances)),
        (LINKAGE_FILE, tables::linkage_table(&report.linkage)),
        (ENTROPY_FILE, tables::entropy_table(&analysis.entropy)),
    ];
    if let Some(similarities) = &analysis.scores.similarities {
        outputs.push((SIMILARITIES_FILE, tables::similarity_table(similarities)));
    }
    if let Some(assignment) = &report.assignment {
        outputs.push((CLUSTERS_FILE, tables::cluster_table(assignment)));
        outputs.push((SUMMARY_FILE, tables::summary_table(&report.clusters)));
    }
    if let Some(silhouette) = &report.silhouette {
        outputs.push((SILHOUETTE_FILE, tables::silhouette_table(silhouette)));
    }
    if !report.sweep.is_empty() {
        outputs.push((SWEEP_FILE, tables::sweep_table(&report.sweep)));
    }

    let mut written = Vec::with_capacity(outputs.len() + 1);
    for (name, contents) in outputs {
        written.push(write_file(&dir.join(name), &contents)?);
    }
    written.push(save_report(report, &dir.join(REPORT_FILE))?);

    info!("Saved {} file(s) to {}", written.len(), dir.display());
    Ok(written)
}
