//! Core traits for xmf
//!
//! The abundance-matching model is an external collaborator. Inference code
//! only depends on this seam, never on a concrete model.

use crate::Result;
use crate::types::{MockGalaxy, SmhmParams};

/// Abundance-matching model that populates a fixed halo catalog with galaxies.
///
/// Implementations hold an immutable halo catalog. Every call is a fresh
/// stochastic population driven only by `params` and `seed`: there is no
/// parameter dictionary or RNG state carried between calls.
pub trait HaloPopulator: Send + Sync {
    /// Populate the halo catalog with galaxies for `params`.
    fn populate(&self, params: &SmhmParams, seed: u64) -> Result<Vec<MockGalaxy>>;

    /// Model name (e.g. "behroozi10").
    fn name(&self) -> &str;
}
