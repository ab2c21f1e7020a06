//! Behroozi et al. (2010) stellar-to-halo-mass relation and a subhalo
//! abundance-matching populator built on it.
//!
//! The relation is defined as halo mass at fixed stellar mass. The populator
//! tabulates it on a stellar-mass grid and inverts it by interpolation, then
//! draws log-normal scatter in stellar mass at fixed halo mass.

use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use xmf_core::{Error, Halo, HaloPopulator, MockGalaxy, Result, SmhmParams};

/// Default transition-sharpness exponent (`smhm_gamma_0`).
pub const DEFAULT_GAMMA: f64 = 1.56;

/// Scale-factor evolution of the relation (`*_a` parameters).
///
/// Each `p_0` parameter is evolved as `p_0 + p_a * (a - 1)` with
/// `a = 1 / (1 + z)`. Scatter does not evolve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Evolution {
    /// `smhm_m1_a`
    pub mhalo_c: f64,
    /// `smhm_m0_a`
    pub mstellar_c: f64,
    /// `smhm_beta_a`
    pub lowmass_slope: f64,
    /// `smhm_delta_a`
    pub highmass_slope: f64,
    /// `smhm_gamma_a`
    pub gamma: f64,
}

impl Default for Evolution {
    fn default() -> Self {
        Self { mhalo_c: 0.28, mstellar_c: 0.55, lowmass_slope: 0.18, highmass_slope: 0.17, gamma: 2.51 }
    }
}

impl Evolution {
    /// No evolution.
    pub const NONE: Evolution =
        Evolution { mhalo_c: 0.0, mstellar_c: 0.0, lowmass_slope: 0.0, highmass_slope: 0.0, gamma: 0.0 };

    /// Parameters and gamma evolved to `redshift`.
    pub fn apply(&self, params: &SmhmParams, gamma: f64, redshift: f64) -> (SmhmParams, f64) {
        let da = 1.0 / (1.0 + redshift) - 1.0;
        let p = SmhmParams {
            mhalo_c: params.mhalo_c + self.mhalo_c * da,
            mstellar_c: params.mstellar_c + self.mstellar_c * da,
            lowmass_slope: params.lowmass_slope + self.lowmass_slope * da,
            highmass_slope: params.highmass_slope + self.highmass_slope * da,
            scatter: params.scatter,
        };
        (p, gamma + self.gamma * da)
    }
}

/// log10 halo mass hosting a central of log10 stellar mass `logmstar`.
///
/// `logmh = M1 + beta*log10(Ms/M0) + (Ms/M0)^delta / (1 + (Ms/M0)^-gamma) - 1/2`
pub fn behroozi10_log_halo_mass(logmstar: f64, params: &SmhmParams, gamma: f64) -> f64 {
    let x = logmstar - params.mstellar_c;
    let ratio = 10f64.powf(x);
    params.mhalo_c + params.lowmass_slope * x
        + ratio.powf(params.highmass_slope) / (1.0 + ratio.powf(-gamma))
        - 0.5
}

/// Stellar-mass grid used to tabulate the relation, log10.
const GRID_LO: f64 = 6.0;
const GRID_HI: f64 = 13.0;
const GRID_POINTS: usize = 1401;

/// Tabulated inverse relation: mean log10 stellar mass at log10 halo mass.
#[derive(Debug, Clone)]
struct InverseTable {
    log_halo: Vec<f64>,
    log_stellar: Vec<f64>,
}

impl InverseTable {
    fn build(params: &SmhmParams, gamma: f64) -> Result<Self> {
        let step = (GRID_HI - GRID_LO) / (GRID_POINTS - 1) as f64;
        let log_stellar: Vec<f64> = (0..GRID_POINTS).map(|i| GRID_LO + step * i as f64).collect();
        let log_halo: Vec<f64> =
            log_stellar.iter().map(|&m| behroozi10_log_halo_mass(m, params, gamma)).collect();
        if log_halo.iter().any(|v| !v.is_finite()) || log_halo.windows(2).any(|w| w[1] <= w[0]) {
            return Err(Error::Computation(format!(
                "stellar-to-halo-mass relation is not monotonic for {params:?}"
            )));
        }
        Ok(Self { log_halo, log_stellar })
    }

    /// Linear interpolation, clamped to the table ends.
    fn eval(&self, log_halo: f64) -> f64 {
        let n = self.log_halo.len();
        if log_halo <= self.log_halo[0] {
            return self.log_stellar[0];
        }
        if log_halo >= self.log_halo[n - 1] {
            return self.log_stellar[n - 1];
        }
        let j = self.log_halo.partition_point(|&h| h <= log_halo);
        let (x0, x1) = (self.log_halo[j - 1], self.log_halo[j]);
        let (y0, y1) = (self.log_stellar[j - 1], self.log_stellar[j]);
        y0 + (y1 - y0) * (log_halo - x0) / (x1 - x0)
    }
}

/// Subhalo abundance-matching model: one galaxy per (sub)halo with
/// `halo_macc > 0`, stellar mass from the inverted relation plus scatter.
#[derive(Debug, Clone)]
pub struct Behroozi10Model {
    halos: Arc<[Halo]>,
    redshift: f64,
    gamma: f64,
    evolution: Evolution,
}

impl Behroozi10Model {
    /// Model over `halos` at `redshift` with default gamma and evolution.
    pub fn new(halos: impl Into<Arc<[Halo]>>, redshift: f64) -> Self {
        Self { halos: halos.into(), redshift, gamma: DEFAULT_GAMMA, evolution: Evolution::default() }
    }

    /// Override the transition-sharpness exponent.
    pub fn with_gamma(mut self, gamma: f64) -> Self {
        self.gamma = gamma;
        self
    }

    /// Override the redshift evolution.
    pub fn with_evolution(mut self, evolution: Evolution) -> Self {
        self.evolution = evolution;
        self
    }

    /// Halo catalog.
    pub fn halos(&self) -> &[Halo] {
        &self.halos
    }

    /// Model redshift.
    pub fn redshift(&self) -> f64 {
        self.redshift
    }

    /// Mean log10 stellar mass at log10 halo mass for `params` (no scatter).
    pub fn mean_log_stellar_mass(&self, params: &SmhmParams, log_halo: &[f64]) -> Result<Vec<f64>> {
        let (p, gamma) = self.evolution.apply(params, self.gamma, self.redshift);
        let table = InverseTable::build(&p, gamma)?;
        Ok(log_halo.iter().map(|&h| table.eval(h)).collect())
    }
}

impl HaloPopulator for Behroozi10Model {
    fn populate(&self, params: &SmhmParams, seed: u64) -> Result<Vec<MockGalaxy>> {
        if !params.is_finite() || params.scatter < 0.0 {
            return Err(Error::Validation(format!("invalid model parameters {params:?}")));
        }
        let (p, gamma) = self.evolution.apply(params, self.gamma, self.redshift);
        let table = InverseTable::build(&p, gamma)?;
        let noise = Normal::new(0.0, p.scatter)
            .map_err(|e| Error::Computation(format!("scatter distribution: {e}")))?;
        let mut rng = StdRng::seed_from_u64(seed);

        let galaxies = self
            .halos
            .iter()
            .filter(|h| h.halo_macc > 0.0)
            .enumerate()
            .map(|(i, h)| {
                let log_ms = table.eval(h.halo_macc.log10()) + noise.sample(&mut rng);
                MockGalaxy {
                    galaxy_id: i as u64,
                    stellar_mass: 10f64.powf(log_ms),
                    halo_id: h.halo_id,
                    halo_hostid: h.halo_hostid,
                    halo_mvir: h.halo_mvir,
                }
            })
            .collect();
        Ok(galaxies)
    }

    fn name(&self) -> &str {
        "behroozi10"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn halos() -> Vec<Halo> {
        (0..400)
            .map(|i| {
                let m = 10f64.powf(10.5 + 4.0 * i as f64 / 400.0);
                let host = if i % 5 == 0 { i / 5 } else { i };
                Halo { halo_id: i, halo_hostid: host, halo_mvir: m * 1.1, halo_macc: m }
            })
            .collect()
    }

    #[test]
    fn test_relation_at_characteristic_mass() {
        // At Ms = M0: logmh = M1 + 1/2 - 1/2.
        let p = SmhmParams::BEHROOZI10;
        assert_abs_diff_eq!(behroozi10_log_halo_mass(p.mstellar_c, &p, DEFAULT_GAMMA), p.mhalo_c, epsilon = 1e-12);
    }

    #[test]
    fn test_inverse_round_trip() {
        let model = Behroozi10Model::new(halos(), 0.0);
        let p = SmhmParams::BEHROOZI10;
        let log_ms = [9.0, 10.0, 10.72, 11.3];
        let log_mh: Vec<f64> = log_ms.iter().map(|&m| behroozi10_log_halo_mass(m, &p, DEFAULT_GAMMA)).collect();
        let back = model.mean_log_stellar_mass(&p, &log_mh).unwrap();
        for (a, b) in log_ms.iter().zip(&back) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-3);
        }
    }

    #[test]
    fn test_evolution_at_z0_is_identity() {
        let (p, g) = Evolution::default().apply(&SmhmParams::BEHROOZI10, DEFAULT_GAMMA, 0.0);
        assert_eq!(p, SmhmParams::BEHROOZI10);
        assert_eq!(g, DEFAULT_GAMMA);
    }

    #[test]
    fn test_populate_is_seeded() {
        let model = Behroozi10Model::new(halos(), 0.0187);
        let p = SmhmParams::BEHROOZI10;
        let a = model.populate(&p, 5).unwrap();
        let b = model.populate(&p, 5).unwrap();
        let c = model.populate(&p, 6).unwrap();
        assert_eq!(a.len(), 400);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.iter().filter(|g| g.is_central()).count(), 321);
    }

    #[test]
    fn test_zero_scatter_is_monotonic() {
        let model = Behroozi10Model::new(halos(), 0.0).with_evolution(Evolution::NONE);
        let p = SmhmParams { scatter: 0.0, ..SmhmParams::BEHROOZI10 };
        let gals = model.populate(&p, 1).unwrap();
        assert!(gals.windows(2).all(|w| w[0].stellar_mass <= w[1].stellar_mass));
    }

    #[test]
    fn test_rejects_invalid_params() {
        let model = Behroozi10Model::new(halos(), 0.0);
        let p = SmhmParams { scatter: -0.1, ..SmhmParams::BEHROOZI10 };
        assert!(model.populate(&p, 1).is_err());
        assert_eq!(model.name(), "behroozi10");
    }
}
