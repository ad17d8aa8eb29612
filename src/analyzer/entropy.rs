//! Shannon entropy of token distributions and entropy-based token filtering

use log::{debug, info, warn};

use crate::constants::ENTROPY_THRESHOLD_SLACK;
use crate::models::{BlockId, BlockProfile, BlockProfiles, ProbabilityDistribution, VariableType};
use crate::utils::stats;

/// Entropy contribution `-p·log2(p)` of a single probability (0 for `p <= 0`)
pub fn token_entropy(p: f64) -> f64 {
    if p > 0.0 {
        -p * p.log2()
    } else {
        0.0
    }
}

/// Shannon entropy (bits) of a distribution; 0 for the empty distribution
pub fn shannon_entropy(distribution: &ProbabilityDistribution) -> f64 {
    distribution.iter().map(|(_, p)| token_entropy(p)).sum()
}

/// One row of the entropy table
#[derive(Debug, Clone, PartialEq)]
pub struct EntropyRow {
    pub block_id: BlockId,
    pub var_type: VariableType,
    pub token: String,
    pub probability: f64,
    pub entropy: f64,
}

/// Flatten profiles into `(block, type, token, probability, entropy)` rows
pub fn entropy_rows(profiles: &BlockProfiles) -> Vec<EntropyRow> {
    let mut rows = Vec::new();
    for (block_id, profile) in profiles {
        for (var_type, distribution) in profile.iter() {
            for (token, probability) in distribution.iter() {
                rows.push(EntropyRow {
                    block_id: block_id.clone(),
                    var_type,
                    token: token.to_string(),
                    probability,
                    entropy: token_entropy(probability),
                });
            }
        }
    }
    rows
}

/// Keep only high-entropy tokens.
///
/// Within each (block, type) group the threshold is the mean plus the
/// population standard deviation of the tokens' entropy contributions;
/// tokens at or above it survive and are re-normalised. Groups that lose
/// every token are dropped, as are blocks left without any group.
pub fn filter_by_entropy(profiles: &BlockProfiles) -> BlockProfiles {
    let mut filtered = BlockProfiles::new();
    let mut dropped_groups = 0;

    for (block_id, profile) in profiles {
        let mut kept_profile = BlockProfile::new();

        for (var_type, distribution) in profile.iter() {
            let entropies: Vec<f64> = distribution.iter().map(|(_, p)| token_entropy(p)).collect();
            let (Some(mean), Some(std)) = (stats::mean(&entropies), stats::population_std(&entropies)) else {
                continue;
            };
            let threshold = mean + std;

            let kept = distribution
                .iter()
                .filter(|(_, p)| token_entropy(*p) + ENTROPY_THRESHOLD_SLACK >= threshold)
                .map(|(token, p)| (token.to_string(), p));
            let kept = ProbabilityDistribution::from_weights(kept);

            if kept.is_empty() {
                debug!("Entropy filter removed every {} token of block {}", var_type, block_id);
                dropped_groups += 1;
            }
            kept_profile.insert(var_type, kept);
        }

        if kept_profile.is_empty() {
            warn!("Entropy filter left block {} without tokens, dropping it", block_id);
            continue;
        }
        filtered.insert(block_id.clone(), kept_profile);
    }

    info!(
        "Entropy filter kept {} of {} block(s), dropped {} group(s)",
        filtered.len(),
        profiles.len(),
        dropped_groups
    );
    filtered
}

#[cfg(test)]
mod tests {
    use super::*;

    fn distribution(pairs: &[(&str, f64)]) -> ProbabilityDistribution {
        ProbabilityDistribution::from_weights(pairs.iter().map(|(t, p)| (t.to_string(), *p)))
    }

    #[test]
    fn test_entropy_values() {
        assert_eq!(token_entropy(0.0), 0.0);
        assert_eq!(token_entropy(1.0), 0.0);
        assert!((token_entropy(0.5) - 0.5).abs() < 1e-12);

        assert_eq!(shannon_entropy(&ProbabilityDistribution::empty()), 0.0);
        let uniform = distribution(&[("a", 0.25), ("b", 0.25), ("c", 0.25), ("d", 0.25)]);
        assert!((shannon_entropy(&uniform) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_filter_keeps_equal_entropy_group() {
        let mut profile = BlockProfile::new();
        profile.insert(VariableType::Instruction, distribution(&[("mov", 0.5), ("add", 0.5)]));
        let mut profiles = BlockProfiles::new();
        profiles.insert(BlockId::new("1"), profile.clone());

        let filtered = filter_by_entropy(&profiles);
        assert_eq!(filtered.get(&BlockId::new("1")), Some(&profile));
    }

    #[test]
    fn test_filter_drops_low_entropy_tokens_and_renormalises() {
        // h(0.7)≈0.360, h(0.2)≈0.464, h(0.1)≈0.332: only "add" clears mean + std
        let mut profile = BlockProfile::new();
        profile.insert(VariableType::Instruction, distribution(&[("mov", 0.7), ("add", 0.2), ("ret", 0.1)]));
        let mut profiles = BlockProfiles::new();
        profiles.insert(BlockId::new("1"), profile);

        let filtered = filter_by_entropy(&profiles);
        let kept = filtered[&BlockId::new("1")].get(VariableType::Instruction).unwrap();
        assert_eq!(kept.len(), 1);
        assert!((kept.get("add") - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_rows_cover_every_token() {
        let mut profile = BlockProfile::new();
        profile.insert(VariableType::Instruction, distribution(&[("mov", 0.5), ("add", 0.5)]));
        profile.insert(VariableType::LeftOperand, distribution(&[("eax", 1.0)]));
        let mut profiles = BlockProfiles::new();
        profiles.insert(BlockId::new("7"), profile);

        let rows = entropy_rows(&profiles);
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.block_id.as_str() == "7"));
        let eax = rows.iter().find(|r| r.token == "eax").unwrap();
        assert_eq!(eax.var_type, VariableType::LeftOperand);
        assert_eq!(eax.entropy, 0.0);
    }
}
