//! Per-block token probability distributions

use indexmap::IndexMap;
use serde::{Serialize, Deserialize};
use std::collections::BTreeMap;

use crate::models::block::{BlockId, VariableType};

/// Sparse token → probability map for one (block, variable type) scope.
///
/// A non-empty distribution always sums to one. The empty distribution
/// means "no observations" and is distinct from any zero-valued map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProbabilityDistribution {
    probabilities: BTreeMap<String, f64>,
}

impl ProbabilityDistribution {
    /// The "no observations" distribution
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a distribution from occurrence counts
    pub fn from_counts(counts: &BTreeMap<String, usize>) -> Self {
        let total: usize = counts.values().sum();
        if total == 0 {
            return Self::empty();
        }

        let probabilities = counts
            .iter()
            .filter(|(_, &count)| count > 0)
            .map(|(token, &count)| (token.clone(), count as f64 / total as f64))
            .collect();

        Self { probabilities }
    }

    /// Build a distribution by normalising non-negative weights.
    ///
    /// Zero weights are dropped. Returns the empty distribution when the
    /// weights sum to zero. Weights must be finite and non-negative.
    pub fn from_weights<I, S>(weights: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let mut accumulated: BTreeMap<String, f64> = BTreeMap::new();
        for (token, weight) in weights {
            if weight > 0.0 {
                *accumulated.entry(token.into()).or_insert(0.0) += weight;
            }
        }

        let total: f64 = accumulated.values().sum();
        if total <= 0.0 || !total.is_finite() {
            return Self::empty();
        }

        for value in accumulated.values_mut() {
            *value /= total;
        }

        Self { probabilities: accumulated }
    }

    /// Probability of a token (0 when unobserved)
    pub fn get(&self, token: &str) -> f64 {
        self.probabilities.get(token).copied().unwrap_or(0.0)
    }

    /// Whether the scope had no observations
    pub fn is_empty(&self) -> bool {
        self.probabilities.is_empty()
    }

    /// Number of distinct tokens
    pub fn len(&self) -> usize {
        self.probabilities.len()
    }

    /// Sum of all probabilities (1 for non-empty, 0 for empty)
    pub fn total(&self) -> f64 {
        self.probabilities.values().sum()
    }

    /// Iterate tokens and probabilities in token order
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.probabilities.iter().map(|(token, &p)| (token.as_str(), p))
    }

    /// Iterate tokens in token order
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.probabilities.keys().map(|token| token.as_str())
    }
}

/// All distributions observed for one block
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockProfile {
    distributions: BTreeMap<VariableType, ProbabilityDistribution>,
}

impl BlockProfile {
    /// Create an empty profile
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the distribution for a variable type. Empty distributions are not stored.
    pub fn insert(&mut self, var_type: VariableType, distribution: ProbabilityDistribution) {
        if distribution.is_empty() {
            self.distributions.remove(&var_type);
        } else {
            self.distributions.insert(var_type, distribution);
        }
    }

    /// Distribution for a variable type, if the block has any observations of it
    pub fn get(&self, var_type: VariableType) -> Option<&ProbabilityDistribution> {
        self.distributions.get(&var_type)
    }

    /// Variable types present in this block
    pub fn variable_types(&self) -> impl Iterator<Item = VariableType> + '_ {
        self.distributions.keys().copied()
    }

    /// Iterate all (type, distribution) pairs
    pub fn iter(&self) -> impl Iterator<Item = (VariableType, &ProbabilityDistribution)> {
        self.distributions.iter().map(|(t, d)| (*t, d))
    }

    /// Whether the block has no observations at all
    pub fn is_empty(&self) -> bool {
        self.distributions.is_empty()
    }
}

/// Block profiles keyed by block id, in first-appearance order
pub type BlockProfiles = IndexMap<BlockId, BlockProfile>;
