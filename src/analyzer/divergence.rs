//! Jensen–Shannon divergence between token distributions

use log::debug;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::models::{BlockProfile, ProbabilityDistribution, VariableType};

/// Raw Jensen–Shannon divergence (base 2) of two distributions.
///
/// Computed over the union of both supports with `M = (P + Q) / 2`; terms
/// with zero probability on the left of a KL term are skipped. Comparing a
/// non-empty distribution against the empty one yields 0.5, two empty
/// distributions yield 0.
pub fn jensen_shannon(p: &ProbabilityDistribution, q: &ProbabilityDistribution) -> f64 {
    let mut divergence = 0.0;

    for (token, a) in p.iter() {
        let m = 0.5 * (a + q.get(token));
        divergence += 0.5 * kl_term(a, m);
    }
    for (token, b) in q.iter() {
        let m = 0.5 * (p.get(token) + b);
        divergence += 0.5 * kl_term(b, m);
    }

    divergence
}

fn kl_term(a: f64, m: f64) -> f64 {
    if a > 0.0 {
        a * (a / m).log2()
    } else {
        0.0
    }
}

/// Histogram intersection `Σ min(p, q)`; 1 for identical distributions
pub fn overlap(p: &ProbabilityDistribution, q: &ProbabilityDistribution) -> f64 {
    // iterate the smaller side, tokens absent from the other contribute 0
    let (small, large) = if p.len() <= q.len() { (p, q) } else { (q, p) };
    small.iter().map(|(token, a)| a.min(large.get(token))).sum()
}

/// Counters for numerically degenerate divergences
#[derive(Debug, Default)]
pub struct DivergenceDiagnostics {
    non_finite: AtomicUsize,
}

impl DivergenceDiagnostics {
    fn record_non_finite(&self) {
        self.non_finite.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of divergences that were not finite and were clamped to 0
    pub fn non_finite(&self) -> usize {
        self.non_finite.load(Ordering::Relaxed)
    }
}

/// Block-to-block divergence scorer.
///
/// Shared across worker threads while a matrix is built; the only state is
/// the atomic diagnostics counter.
#[derive(Debug, Default)]
pub struct DivergenceEngine {
    diagnostics: DivergenceDiagnostics,
}

impl DivergenceEngine {
    /// Create a new engine with zeroed diagnostics
    pub fn new() -> Self {
        Self::default()
    }

    /// Guarded JSD of two distributions, always finite and in `[0, 1]`
    pub fn divergence(&self, p: &ProbabilityDistribution, q: &ProbabilityDistribution) -> f64 {
        let value = jensen_shannon(p, q);
        if !value.is_finite() {
            debug!("Non-finite divergence {} clamped to 0", value);
            self.diagnostics.record_non_finite();
            return 0.0;
        }
        value.clamp(0.0, 1.0)
    }

    /// Divergence between two blocks, summed over every variable type present in either
    ///
    /// A type present on one side only scores 0.5, against 1.0 for a type whose
    /// tokens are disjoint, so a missing type reads as closer than a mismatched one.
    pub fn block_divergence(&self, left: &BlockProfile, right: &BlockProfile) -> f64 {
        let empty = ProbabilityDistribution::empty();
        VariableType::ALL
            .iter()
            .filter_map(|&var_type| match (left.get(var_type), right.get(var_type)) {
                (None, None) => None,
                (p, q) => Some(self.divergence(p.unwrap_or(&empty), q.unwrap_or(&empty))),
            })
            .sum()
    }

    /// Overlap similarity between two blocks, summed over every variable type
    pub fn block_overlap(&self, left: &BlockProfile, right: &BlockProfile) -> f64 {
        left.iter()
            .filter_map(|(var_type, p)| right.get(var_type).map(|q| overlap(p, q)))
            .sum()
    }

    /// Diagnostics accumulated so far
    pub fn diagnostics(&self) -> &DivergenceDiagnostics {
        &self.diagnostics
    }

    /// Shorthand for `diagnostics().non_finite()`
    pub fn non_finite_count(&self) -> usize {
        self.diagnostics.non_finite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn dist(pairs: &[(&str, f64)]) -> ProbabilityDistribution {
        ProbabilityDistribution::from_weights(pairs.iter().map(|(t, p)| (t.to_string(), *p)))
    }

    fn instruction_profile(pairs: &[(&str, f64)]) -> BlockProfile {
        let mut profile = BlockProfile::new();
        profile.insert(VariableType::Instruction, dist(pairs));
        profile
    }

    #[test]
    fn test_four_block_scenario() {
        let engine = DivergenceEngine::new();
        let a = dist(&[("x", 1.0)]);
        let b = dist(&[("x", 1.0)]);
        let c = dist(&[("y", 1.0)]);
        let d = dist(&[("x", 0.5), ("y", 0.5)]);

        assert_eq!(engine.divergence(&a, &b), 0.0);
        assert!((engine.divergence(&a, &c) - 1.0).abs() < 1e-12);
        let ad = engine.divergence(&a, &d);
        assert!(ad > 0.0 && ad < engine.divergence(&a, &c));
        assert_eq!(engine.non_finite_count(), 0);
    }

    #[test]
    fn test_missing_side_counts_against_empty() {
        let engine = DivergenceEngine::new();
        let empty = ProbabilityDistribution::empty();
        let p = dist(&[("mov", 0.25), ("add", 0.75)]);

        assert!((engine.divergence(&p, &empty) - 0.5).abs() < 1e-12);
        assert_eq!(engine.divergence(&empty, &empty), 0.0);

        let mut left = instruction_profile(&[("mov", 1.0)]);
        left.insert(VariableType::LeftOperand, dist(&[("eax", 1.0)]));
        let right = instruction_profile(&[("mov", 1.0)]);
        assert!((engine.block_divergence(&left, &right) - 0.5).abs() < 1e-12);
        assert!((engine.block_divergence(&right, &left) - 0.5).abs() < 1e-12);

        // disjoint left operands weigh more than a missing one
        let mut disjoint = instruction_profile(&[("mov", 1.0)]);
        disjoint.insert(VariableType::LeftOperand, dist(&[("ebx", 1.0)]));
        assert!((engine.block_divergence(&left, &disjoint) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_random_distributions_bounded_and_symmetric() {
        let engine = DivergenceEngine::new();
        let mut rng = rand::thread_rng();
        let tokens = ["mov", "add", "sub", "jmp", "call", "ret"];

        for _ in 0..200 {
            let mut random = || {
                let mut pairs = Vec::new();
                for token in tokens {
                    if rng.gen_bool(0.6) {
                        pairs.push((token.to_string(), rng.gen_range(0.01..10.0)));
                    }
                }
                ProbabilityDistribution::from_weights(pairs)
            };
            let p = random();
            let q = random();

            let pq = engine.divergence(&p, &q);
            let qp = engine.divergence(&q, &p);
            assert!((0.0..=1.0).contains(&pq));
            assert!((pq - qp).abs() < 1e-12);
            assert!(engine.divergence(&p, &p).abs() < 1e-12);
        }
    }

    #[test]
    fn test_overlap() {
        let engine = DivergenceEngine::new();
        let a = instruction_profile(&[("x", 0.5), ("y", 0.5)]);
        let b = instruction_profile(&[("x", 0.25), ("z", 0.75)]);

        assert!((engine.block_overlap(&a, &a) - 1.0).abs() < 1e-12);
        assert!((engine.block_overlap(&a, &b) - 0.25).abs() < 1e-12);
        assert_eq!(engine.block_overlap(&a, &BlockProfile::new()), 0.0);
    }
}
