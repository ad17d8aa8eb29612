//! Analysis configuration
//!
//! A run is fully described by an [`AnalysisConfig`]. It can be loaded from a
//! JSON file; every field has a default so partial files are accepted, and
//! command-line flags override whatever the file sets.

use serde::{Serialize, Deserialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::constants::DEFAULT_DISTANCE_THRESHOLD;
use crate::errors::{ClusterError, ClusterResult, ErrorContext, ErrorExt};
use crate::models::Linkage;

/// Shape of the input table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    /// `Block_ID,Type,Assembly` rows, one per observed occurrence
    #[default]
    Occurrences,
    /// `Block_ID,Type,Assembly,Probability[,Entropy]` rows
    Probabilities,
    /// `Block_ID,Instruction,Left Operand,Right Operand` rows, one per instruction
    Disassembly,
}

impl FromStr for InputKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "occurrences" | "occurrence" => Ok(InputKind::Occurrences),
            "probabilities" | "probability" => Ok(InputKind::Probabilities),
            "disassembly" => Ok(InputKind::Disassembly),
            other => Err(format!("unknown input kind '{}'", other)),
        }
    }
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputKind::Occurrences => f.write_str("occurrences"),
            InputKind::Probabilities => f.write_str("probabilities"),
            InputKind::Disassembly => f.write_str("disassembly"),
        }
    }
}

/// How block pairs are scored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// Jensen-Shannon divergence, used directly as a distance
    #[default]
    Jsd,
    /// Probability-overlap similarity, converted to a distance
    Overlap,
}

impl FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "jsd" | "jensen-shannon" => Ok(Metric::Jsd),
            "overlap" => Ok(Metric::Overlap),
            other => Err(format!("unknown metric '{}' (expected 'jsd' or 'overlap')", other)),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Jsd => f.write_str("jsd"),
            Metric::Overlap => f.write_str("overlap"),
        }
    }
}

/// What to do with an input row that lacks a required field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MalformedPolicy {
    /// Exclude the row and count it
    #[default]
    Skip,
    /// Fail the whole build on the first malformed row
    Abort,
}

/// Configuration of one analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Shape of the input table
    pub input_kind: InputKind,
    /// Pair scoring metric
    pub metric: Metric,
    /// Agglomeration linkage
    pub linkage: Linkage,
    /// Dendrogram cut threshold; no flat clusters are produced without one
    pub threshold: Option<f64>,
    /// Keep only high-entropy tokens before scoring
    pub entropy_filter: bool,
    /// Malformed row handling
    pub malformed: MalformedPolicy,
    /// Score block pairs on the rayon thread pool
    pub parallel: bool,
    /// Read and write the distance matrix cache
    pub use_cache: bool,
    /// Extra thresholds to evaluate after the main cut
    pub sweep: Vec<f64>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            input_kind: InputKind::default(),
            metric: Metric::default(),
            linkage: Linkage::default(),
            threshold: Some(DEFAULT_DISTANCE_THRESHOLD),
            entropy_filter: false,
            malformed: MalformedPolicy::default(),
            parallel: true,
            use_cache: true,
            sweep: Vec::new(),
        }
    }
}

impl AnalysisConfig {
    /// Load a configuration from a JSON file
    pub fn from_file(path: &Path) -> ClusterResult<Self> {
        let context = || ErrorContext {
            component: "config".to_string(),
            operation: "load".to_string(),
            details: Some(path.display().to_string()),
        };

        let json = fs::read_to_string(path).with_context(context())?;
        let config: AnalysisConfig = serde_json::from_str(&json)
            .map_err(|e| ClusterError::Config(format!("{}: {}", context(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    pub fn validate(&self) -> ClusterResult<()> {
        if let Some(threshold) = self.threshold {
            check_threshold(threshold)?;
        }
        for &threshold in &self.sweep {
            check_threshold(threshold)?;
        }
        Ok(())
    }
}

fn check_threshold(threshold: f64) -> ClusterResult<()> {
    if !threshold.is_finite() || threshold < 0.0 {
        return Err(ClusterError::Config(format!(
            "threshold must be a finite non-negative number, got {}",
            threshold
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AnalysisConfig::default();
        assert_eq!(config.metric, Metric::Jsd);
        assert_eq!(config.linkage, Linkage::Average);
        assert_eq!(config.threshold, Some(0.5));
        assert_eq!(config.malformed, MalformedPolicy::Skip);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"linkage": "ward", "threshold": 0.25, "malformed": "abort"}}"#).unwrap();

        let config = AnalysisConfig::from_file(file.path()).unwrap();
        assert_eq!(config.linkage, Linkage::Ward);
        assert_eq!(config.threshold, Some(0.25));
        assert_eq!(config.malformed, MalformedPolicy::Abort);
        assert_eq!(config.input_kind, InputKind::Occurrences);
        assert!(config.parallel);
    }

    #[test]
    fn test_negative_threshold_rejected() {
        let config = AnalysisConfig { threshold: Some(-1.0), ..Default::default() };
        assert!(matches!(config.validate(), Err(ClusterError::Config(_))));

        let config = AnalysisConfig { sweep: vec![0.1, f64::NAN], ..Default::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_json_is_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"linkage": "single"}}"#).unwrap();
        assert!(matches!(AnalysisConfig::from_file(file.path()), Err(ClusterError::Config(_))));
    }

    #[test]
    fn test_parse_enums() {
        assert_eq!("Ward".parse::<Linkage>().unwrap(), Linkage::Ward);
        assert_eq!("overlap".parse::<Metric>().unwrap(), Metric::Overlap);
        assert_eq!("disassembly".parse::<InputKind>().unwrap(), InputKind::Disassembly);
        assert!("complete".parse::<Linkage>().is_err());
    }
}
