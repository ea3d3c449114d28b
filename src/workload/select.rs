//! Weighted choice of the next workload kind.

use rand::Rng;
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;

use super::WorkloadKind;
use crate::error::{LoadpulseError, Result};

/// Draws workload kinds independently from a weighted categorical distribution.
#[derive(Debug, Clone)]
pub struct WorkloadSelector {
    kinds: Vec<WorkloadKind>,
    index: WeightedIndex<f64>,
}

impl WorkloadSelector {
    /// Selector over custom weights. Weights must be non-negative with a positive sum.
    pub fn with_weights(weights: &[(WorkloadKind, f64)]) -> Result<Self> {
        let index = WeightedIndex::new(weights.iter().map(|(_, w)| *w))
            .map_err(|e| LoadpulseError::Config(format!("invalid workload weights: {}", e)))?;
        Ok(Self {
            kinds: weights.iter().map(|(k, _)| *k).collect(),
            index,
        })
    }

    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> WorkloadKind {
        self.kinds[self.index.sample(rng)]
    }
}

impl Default for WorkloadSelector {
    /// The fixed 60/20/10/5/5 split.
    fn default() -> Self {
        let weights: Vec<(WorkloadKind, f64)> = WorkloadKind::ALL.iter().map(|k| (*k, k.weight())).collect();
        Self::with_weights(&weights).expect("built-in workload weights are valid")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashMap;

    #[test]
    fn test_converges_to_configured_weights() {
        let selector = WorkloadSelector::default();
        let mut rng = StdRng::seed_from_u64(42);
        let trials = 100_000;

        let mut counts: HashMap<WorkloadKind, u32> = HashMap::new();
        for _ in 0..trials {
            *counts.entry(selector.choose(&mut rng)).or_default() += 1;
        }

        for kind in WorkloadKind::ALL {
            let p = kind.weight();
            let observed = f64::from(counts.get(&kind).copied().unwrap_or(0)) / f64::from(trials);
            // five standard errors
            let tolerance = 5.0 * (p * (1.0 - p) / f64::from(trials)).sqrt();
            assert!(
                (observed - p).abs() < tolerance,
                "{} observed {} expected {} (tolerance {})",
                kind,
                observed,
                p,
                tolerance
            );
        }
    }

    #[test]
    fn test_zero_weight_never_chosen() {
        let selector =
            WorkloadSelector::with_weights(&[(WorkloadKind::Normal, 0.0), (WorkloadKind::SlowTask, 1.0)]).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..1_000 {
            assert_eq!(selector.choose(&mut rng), WorkloadKind::SlowTask);
        }
    }

    #[test]
    fn test_invalid_weights() {
        assert!(WorkloadSelector::with_weights(&[]).is_err());
        assert!(WorkloadSelector::with_weights(&[(WorkloadKind::Normal, -1.0)]).is_err());
        assert!(WorkloadSelector::with_weights(&[(WorkloadKind::Normal, 0.0)]).is_err());
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let selector = WorkloadSelector::default();
        let mut a = StdRng::seed_from_u64(9);
        let mut b = StdRng::seed_from_u64(9);
        let left: Vec<_> = (0..50).map(|_| selector.choose(&mut a)).collect();
        let right: Vec<_> = (0..50).map(|_| selector.choose(&mut b)).collect();
        assert_eq!(left, right);
    }
}
