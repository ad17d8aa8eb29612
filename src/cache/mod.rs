//! Caching module for computed pair scores
//!
//! Scoring is the quadratic part of a run, so the distance (and similarity)
//! matrices are stored as JSON keyed by a hash of the input bytes and every
//! setting that changes them.

use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Result, Context};
use log::{debug, warn};

use crate::config::AnalysisConfig;
use crate::constants::{CACHE_DIR_NAME, CACHE_FORMAT_VERSION};
use crate::models::PairScores;
use crate::utils::hash::sha256_hex;

/// Cache for pair score matrices
#[derive(Debug, Clone)]
pub struct Cache {
    dir: PathBuf,
}

impl Cache {
    /// Cache under the user cache directory (home directory as fallback)
    pub fn open_default() -> Self {
        let base = dirs::cache_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."));
        Self::with_dir(base.join(CACHE_DIR_NAME))
    }

    /// Cache rooted at an explicit directory
    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Get the cache directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Key for an input and the settings that influence its scores
    pub fn key_for(input: &[u8], config: &AnalysisConfig) -> String {
        let metric = config.metric.to_string();
        let kind = config.input_kind.to_string();
        let filter = [config.entropy_filter as u8];
        let version = CACHE_FORMAT_VERSION.to_le_bytes();

        sha256_hex(&[input, metric.as_bytes(), kind.as_bytes(), &filter[..], &version[..]])
    }

    /// Get the cache file path for a key
    fn cache_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    /// Get cached scores for a key
    pub fn get_scores(&self, key: &str) -> Result<Option<PairScores>> {
        let path = self.cache_path(key);

        if !path.exists() {
            debug!("No cache found for key: {}", key);
            return Ok(None);
        }

        debug!("Found cache for key: {}", key);
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read cache file: {}", path.display()))?;

        match serde_json::from_str(&json) {
            Ok(scores) => Ok(Some(scores)),
            Err(e) => {
                // unreadable entries are treated as misses and overwritten on save
                warn!("Ignoring corrupt cache file {}: {}", path.display(), e);
                Ok(None)
            }
        }
    }

    /// Save scores to the cache
    pub fn save_scores(&self, key: &str, scores: &PairScores) -> Result<()> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir)
                .with_context(|| format!("Failed to create cache directory: {}", self.dir.display()))?;
        }

        let path = self.cache_path(key);
        let json = serde_json::to_string(scores)
            .with_context(|| format!("Failed to serialize scores for key: {}", key))?;

        fs::write(&path, json)
            .with_context(|| format!("Failed to write cache file: {}", path.display()))?;

        debug!("Cached scores for key: {}", key);
        Ok(())
    }

    /// Clear the cache entry for a key
    pub fn clear(&self, key: &str) -> Result<()> {
        let path = self.cache_path(key);
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove cache file: {}", path.display()))?;
            debug!("Cleared cache for key: {}", key);
        } else {
            debug!("No cache to clear for key: {}", key);
        }

        Ok(())
    }

    /// Clear all cached scores
    pub fn clear_all(&self) -> Result<()> {
        if self.dir.exists() {
            fs::remove_dir_all(&self.dir)
                .with_context(|| format!("Failed to remove cache directory: {}", self.dir.display()))?;
            fs::create_dir_all(&self.dir)
                .with_context(|| format!("Failed to recreate cache directory: {}", self.dir.display()))?;
            debug!("Cleared all cached scores");
        } else {
            debug!("No cache directory to clear");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Metric;
    use crate::models::{BlockId, DistanceMatrix};
    use tempfile::tempdir;

    fn scores() -> PairScores {
        let ids = vec![BlockId::new("1"), BlockId::new("2")];
        PairScores {
            distances: DistanceMatrix::from_rows(ids, vec![vec![0.0, 0.25], vec![0.25, 0.0]]).unwrap(),
            similarities: None,
            non_finite: 0,
        }
    }

    #[test]
    fn test_save_get_clear() {
        let dir = tempdir().unwrap();
        let cache = Cache::with_dir(dir.path().join("scores"));
        let key = Cache::key_for(b"Block_ID,Type,Assembly\n", &AnalysisConfig::default());

        assert!(cache.get_scores(&key).unwrap().is_none());
        cache.save_scores(&key, &scores()).unwrap();
        assert_eq!(cache.get_scores(&key).unwrap(), Some(scores()));

        cache.clear(&key).unwrap();
        assert!(cache.get_scores(&key).unwrap().is_none());

        cache.save_scores(&key, &scores()).unwrap();
        cache.clear_all().unwrap();
        assert!(cache.get_scores(&key).unwrap().is_none());
        assert!(cache.dir().exists());
    }

    #[test]
    fn test_key_depends_on_scoring_settings() {
        let input = b"Block_ID,Type,Assembly\n1,Instruction,mov\n";
        let config = AnalysisConfig::default();
        let base = Cache::key_for(input, &config);

        let overlap = AnalysisConfig { metric: Metric::Overlap, ..config.clone() };
        let filtered = AnalysisConfig { entropy_filter: true, ..config.clone() };
        let relinked = AnalysisConfig { threshold: Some(0.9), ..config.clone() };

        assert_ne!(base, Cache::key_for(input, &overlap));
        assert_ne!(base, Cache::key_for(input, &filtered));
        assert_ne!(base, Cache::key_for(b"other", &config));
        // clustering settings do not change the matrix
        assert_eq!(base, Cache::key_for(input, &relinked));
    }

    #[test]
    fn test_corrupt_entry_is_a_miss() {
        let dir = tempdir().unwrap();
        let cache = Cache::with_dir(dir.path());
        fs::write(dir.path().join("bad.json"), "{ not json").unwrap();
        assert!(cache.get_scores("bad").unwrap().is_none());
    }
}
