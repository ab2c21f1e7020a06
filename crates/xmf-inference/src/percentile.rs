//! Credible-subset selection from an MCMC chain.
//!
//! Draws are ranked by chi-squared; the best `percentile` percent form the
//! credible subset, whose first element is the best-fit draw.

use std::collections::HashSet;

use rand::Rng;
use serde::{Deserialize, Serialize};
use xmf_core::{Chain, Error, ParameterDraw, Result};

/// Minimum number of unique draws a subset must hold to be sampled from.
pub const MIN_SUBSET_SIZE: usize = 100;

/// Default size of the random sample drawn for ensemble measurements.
pub const DEFAULT_SAMPLE_SIZE: usize = 100;

/// Result of [`select`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PercentileSelection {
    /// Unique draws within the percentile, ascending chi-squared.
    pub subset: Vec<ParameterDraw>,
    /// Lowest chi-squared draw (first element of `subset`).
    pub best_fit: ParameterDraw,
    /// Draws inside the cutoff before duplicates were removed.
    pub cutoff: usize,
}

impl PercentileSelection {
    /// Number of unique draws in the subset.
    pub fn len(&self) -> usize {
        self.subset.len()
    }

    /// Always `false` for a successful selection.
    pub fn is_empty(&self) -> bool {
        self.subset.is_empty()
    }

    /// Draw `n` distinct subset members without replacement.
    ///
    /// Sampled draws keep subset (chi-squared) order.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R, n: usize) -> Result<Vec<ParameterDraw>> {
        if n > self.subset.len() {
            return Err(Error::InsufficientSamples { available: self.subset.len(), required: n });
        }
        let mut idx = rand::seq::index::sample(rng, self.subset.len(), n).into_vec();
        idx.sort_unstable();
        Ok(idx.into_iter().map(|i| self.subset[i]).collect())
    }
}

/// Number of draws kept for `percentile` of a chain of length `n`.
///
/// Truncates toward zero.
pub fn cutoff(percentile: f64, n: usize) -> usize {
    ((percentile / 100.0) * n as f64).floor() as usize
}

/// Select the `percentile` best draws of `chain`.
///
/// The sort is stable, so draws with equal chi-squared keep chain order.
/// Exact duplicates (all six values bit-identical) are collapsed to their
/// first occurrence. Fails with [`Error::InsufficientSamples`] when fewer
/// than [`MIN_SUBSET_SIZE`] unique draws remain.
pub fn select(chain: &Chain, percentile: f64) -> Result<PercentileSelection> {
    if !(percentile > 0.0 && percentile <= 100.0) {
        return Err(Error::Validation(format!("percentile must be in (0, 100], got {percentile}")));
    }

    let mut sorted: Vec<ParameterDraw> = chain.draws().to_vec();
    sorted.sort_by(|a, b| a.chi2.total_cmp(&b.chi2));

    let cutoff = cutoff(percentile, sorted.len());
    sorted.truncate(cutoff);

    let mut seen = HashSet::with_capacity(sorted.len());
    let subset: Vec<ParameterDraw> = sorted.into_iter().filter(|d| seen.insert(d.bit_key())).collect();
    if subset.len() < cutoff {
        log::info!("percentile {percentile}: removed {} duplicate draws", cutoff - subset.len());
    }

    if subset.len() < MIN_SUBSET_SIZE {
        return Err(Error::InsufficientSamples {
            available: subset.len(),
            required: MIN_SUBSET_SIZE,
        });
    }

    let best_fit = subset[0];
    Ok(PercentileSelection { subset, best_fit, cutoff })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use xmf_core::SmhmParams;

    fn chain_of(n: usize, seed: u64) -> Chain {
        let mut rng = StdRng::seed_from_u64(seed);
        let draws = (0..n)
            .map(|_| {
                let p = SmhmParams::from_array([
                    12.0 + rng.random::<f64>(),
                    10.5 + rng.random::<f64>() * 0.5,
                    0.3 + rng.random::<f64>() * 0.2,
                    0.4 + rng.random::<f64>() * 0.3,
                    0.1 + rng.random::<f64>() * 0.1,
                ]);
                ParameterDraw::new(p, rng.random::<f64>() * 50.0)
            })
            .collect();
        Chain::new(draws)
    }

    #[test]
    fn test_cutoff_truncates() {
        assert_eq!(cutoff(68.0, 1000), 680);
        assert_eq!(cutoff(68.0, 250_000), 170_000);
        assert_eq!(cutoff(50.0, 3), 1);
        assert_eq!(cutoff(100.0, 7), 7);
    }

    #[test]
    fn test_select_68_percent() {
        let chain = chain_of(1000, 7);
        let sel = select(&chain, 68.0).unwrap();
        assert_eq!(sel.cutoff, 680);
        assert_eq!(sel.len(), 680);
        assert_eq!(sel.best_fit.chi2, chain.min_chi2().unwrap());
        assert!(sel.subset.windows(2).all(|w| w[0].chi2 <= w[1].chi2));

        // Everything left out is at least as bad as the worst kept draw.
        let worst_kept = sel.subset.last().unwrap().chi2;
        let n_better = chain.draws().iter().filter(|d| d.chi2 < worst_kept).count();
        assert!(n_better < 680);
    }

    #[test]
    fn test_select_full_chain() {
        let chain = chain_of(150, 3);
        let sel = select(&chain, 100.0).unwrap();
        assert_eq!(sel.len(), 150);
        assert_eq!(sel.best_fit, sel.subset[0]);
    }

    #[test]
    fn test_duplicates_removed() {
        let chain = chain_of(120, 11);
        let mut draws = chain.draws().to_vec();
        draws.extend_from_slice(&chain.draws()[..30]);
        let sel = select(&Chain::new(draws), 100.0).unwrap();
        assert_eq!(sel.cutoff, 150);
        assert_eq!(sel.len(), 120);
        let keys: HashSet<_> = sel.subset.iter().map(|d| d.bit_key()).collect();
        assert_eq!(keys.len(), 120);
    }

    #[test]
    fn test_stable_on_ties() {
        let draws: Vec<ParameterDraw> = (0..200)
            .map(|i| ParameterDraw::new(SmhmParams::from_array([12.0 + i as f64, 10.5, 0.4, 0.6, 0.2]), 1.0))
            .collect();
        let sel = select(&Chain::new(draws), 100.0).unwrap();
        assert_eq!(sel.best_fit.params.mhalo_c, 12.0);
        assert_eq!(sel.subset[199].params.mhalo_c, 211.0);
    }

    #[test]
    fn test_insufficient_samples() {
        let chain = chain_of(120, 5);
        match select(&chain, 68.0) {
            Err(Error::InsufficientSamples { available, required }) => {
                assert_eq!(available, 81);
                assert_eq!(required, 100);
            }
            other => panic!("expected InsufficientSamples, got {other:?}"),
        }
        assert!(select(&chain, 0.0).is_err());
        assert!(select(&chain, 101.0).is_err());
    }

    #[test]
    fn test_sample_without_replacement() {
        let chain = chain_of(1000, 21);
        let sel = select(&chain, 68.0).unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        let picked = sel.sample(&mut rng, DEFAULT_SAMPLE_SIZE).unwrap();
        assert_eq!(picked.len(), 100);
        let keys: HashSet<_> = picked.iter().map(|d| d.bit_key()).collect();
        assert_eq!(keys.len(), 100);

        let mut rng2 = StdRng::seed_from_u64(42);
        assert_eq!(picked, sel.sample(&mut rng2, DEFAULT_SAMPLE_SIZE).unwrap());
        assert!(sel.sample(&mut rng, 10_000).is_err());
    }
}
