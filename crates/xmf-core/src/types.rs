//! Common data types for xmf

use serde::{Deserialize, Serialize};

/// Parameter-dictionary keys of the abundance-matching model, in
/// [`SmhmParams::to_array`] order.
pub const MODEL_PARAM_KEYS: [&str; 5] =
    ["smhm_m1_0", "smhm_m0_0", "smhm_beta_0", "smhm_delta_0", "scatter_model_param1"];

/// The five stellar-to-halo-mass relation parameters sampled by the MCMC.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SmhmParams {
    /// Characteristic halo mass, log10 (`smhm_m1_0`).
    pub mhalo_c: f64,
    /// Characteristic stellar mass, log10 (`smhm_m0_0`).
    pub mstellar_c: f64,
    /// Low-mass slope (`smhm_beta_0`).
    pub lowmass_slope: f64,
    /// High-mass slope (`smhm_delta_0`).
    pub highmass_slope: f64,
    /// Log-normal scatter in stellar mass at fixed halo mass, dex (`scatter_model_param1`).
    pub scatter: f64,
}

impl SmhmParams {
    /// Behroozi et al. (2010) published values.
    pub const BEHROOZI10: SmhmParams = SmhmParams {
        mhalo_c: 12.35,
        mstellar_c: 10.72,
        lowmass_slope: 0.44,
        highmass_slope: 0.57,
        scatter: 0.15,
    };

    /// Build from chain-column order.
    pub fn from_array(v: [f64; 5]) -> Self {
        Self {
            mhalo_c: v[0],
            mstellar_c: v[1],
            lowmass_slope: v[2],
            highmass_slope: v[3],
            scatter: v[4],
        }
    }

    /// Chain-column order.
    pub fn to_array(&self) -> [f64; 5] {
        [self.mhalo_c, self.mstellar_c, self.lowmass_slope, self.highmass_slope, self.scatter]
    }

    /// `(model key, value)` pairs as set on the abundance-matching model.
    pub fn model_params(&self) -> [(&'static str, f64); 5] {
        let v = self.to_array();
        std::array::from_fn(|i| (MODEL_PARAM_KEYS[i], v[i]))
    }

    /// `true` if every component is finite.
    pub fn is_finite(&self) -> bool {
        self.to_array().iter().all(|x| x.is_finite())
    }
}

/// One MCMC sample with its goodness of fit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterDraw {
    /// Model parameters.
    pub params: SmhmParams,
    /// Chi-squared of the draw.
    pub chi2: f64,
}

impl ParameterDraw {
    /// Create a draw.
    pub fn new(params: SmhmParams, chi2: f64) -> Self {
        Self { params, chi2 }
    }

    /// Finite parameters and a finite, non-negative chi-squared.
    pub fn is_valid(&self) -> bool {
        self.params.is_finite() && self.chi2.is_finite() && self.chi2 >= 0.0
    }

    /// Bit pattern of all six values; equal keys mean exact duplicates.
    pub fn bit_key(&self) -> [u64; 6] {
        let p = self.params.to_array();
        [
            p[0].to_bits(),
            p[1].to_bits(),
            p[2].to_bits(),
            p[3].to_bits(),
            p[4].to_bits(),
            self.chi2.to_bits(),
        ]
    }
}

/// How the chi-squared file was flattened relative to the chain rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Chi2Layout {
    /// One value per chain row, same order.
    RowOrder,
    /// Values were written as a `rows x cols` matrix flattened row-major but
    /// the chain iterates it column-major; re-flatten in Fortran order.
    ColumnMajor {
        /// Rows of the written matrix.
        rows: usize,
        /// Columns of the written matrix.
        cols: usize,
    },
}

/// An MCMC chain: ordered, valid parameter draws.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Chain {
    draws: Vec<ParameterDraw>,
}

impl Chain {
    /// Build a chain, dropping invalid draws.
    pub fn new(draws: Vec<ParameterDraw>) -> Self {
        Self { draws: draws.into_iter().filter(ParameterDraw::is_valid).collect() }
    }

    /// Pair parameter rows with chi-squared values (same order).
    pub fn from_parts(rows: &[[f64; 5]], chi2: &[f64]) -> crate::Result<Self> {
        if rows.len() != chi2.len() {
            return Err(crate::Error::DimensionMismatch {
                context: "chi-squared values vs chain rows".to_string(),
                expected: rows.len(),
                actual: chi2.len(),
            });
        }
        let draws = rows
            .iter()
            .zip(chi2)
            .map(|(r, &c)| ParameterDraw::new(SmhmParams::from_array(*r), c))
            .collect();
        Ok(Self::new(draws))
    }

    /// Draws in chain order.
    pub fn draws(&self) -> &[ParameterDraw] {
        &self.draws
    }

    /// Number of draws.
    pub fn len(&self) -> usize {
        self.draws.len()
    }

    /// `true` if the chain has no draws.
    pub fn is_empty(&self) -> bool {
        self.draws.is_empty()
    }

    /// Smallest chi-squared in the chain.
    pub fn min_chi2(&self) -> Option<f64> {
        self.draws.iter().map(|d| d.chi2).min_by(|a, b| a.total_cmp(b))
    }
}

/// Galaxy produced by populating a halo catalog (h=1 units, linear masses).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MockGalaxy {
    /// Galaxy identifier.
    pub galaxy_id: u64,
    /// Stellar mass, Msun/h^2 (linear).
    pub stellar_mass: f64,
    /// Halo the galaxy lives in.
    pub halo_id: u64,
    /// Host halo (equal to `halo_id` for centrals).
    pub halo_hostid: u64,
    /// Virial mass of `halo_id`, Msun/h (linear).
    pub halo_mvir: f64,
}

impl MockGalaxy {
    /// Central iff the galaxy's halo is its own host.
    pub fn is_central(&self) -> bool {
        self.halo_id == self.halo_hostid
    }

    /// `C_S` flag: 1 for centrals, 0 for satellites.
    pub fn cs_flag(&self) -> u8 {
        u8::from(self.is_central())
    }
}

/// Halo from a simulation halo catalog (h=1 units, linear masses).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Halo {
    /// Halo identifier.
    pub halo_id: u64,
    /// Host halo identifier (`halo_id` for host halos).
    pub halo_hostid: u64,
    /// Virial mass.
    pub halo_mvir: f64,
    /// Mass at accretion (primary property for abundance matching).
    pub halo_macc: f64,
}

/// Galaxy row of an ECO/RESOLVE survey catalog (h=0.7 log masses).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyGalaxy {
    /// Galaxy name.
    pub name: String,
    /// Group redshift velocity, km/s.
    pub grpcz: f64,
    /// Absolute r-band magnitude.
    pub absrmag: f64,
    /// log10 stellar mass.
    pub logmstar: f64,
    /// log10 gas mass.
    #[serde(default = "nan")]
    pub logmgas: f64,
    /// Right ascension, degrees.
    pub radeg: f64,
    /// Declination, degrees.
    pub dedeg: f64,
    /// Central flag (1 = central).
    pub fc: u8,
    /// Group halo mass from stellar-mass abundance matching, log10.
    #[serde(default = "nan")]
    pub groupmass_s: f64,
    /// Group halo mass (alternate column used for baryonic relations), log10.
    #[serde(default = "nan")]
    pub logmh_s: f64,
    /// RESOLVE-A footprint flag.
    #[serde(default)]
    pub f_a: u8,
    /// RESOLVE-B footprint flag.
    #[serde(default)]
    pub f_b: u8,
}

/// Galaxy row of an ECO/RESOLVE mock survey catalog.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MockSurveyGalaxy {
    /// Observed redshift velocity, km/s.
    pub cz: f64,
    /// Absolute r-band magnitude.
    #[serde(rename = "M_r")]
    pub m_r: f64,
    /// log10 stellar mass (h=0.7).
    pub logmstar: f64,
    /// HI mass, linear.
    #[serde(default = "nan")]
    pub mhi: f64,
    /// Central flag (1 = central).
    pub cs_flag: u8,
    /// Group mass, log10 (h=1).
    #[serde(rename = "M_group")]
    pub m_group: f64,
}

fn nan() -> f64 {
    f64::NAN
}

/// Differential mass function on fixed bins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MassFunction {
    /// Bin centers, log10 mass.
    pub bin_centers: Vec<f64>,
    /// log10 number density per dex; `-inf` for empty bins.
    pub log_phi: Vec<f64>,
    /// Poisson error on the linear number density.
    pub poisson_err: Vec<f64>,
    /// Bin edges (`bin_centers.len() + 1`).
    pub bin_edges: Vec<f64>,
    /// Raw counts per bin.
    pub counts: Vec<u64>,
}

impl MassFunction {
    /// Width of the (uniform) bins.
    pub fn bin_width(&self) -> f64 {
        match self.bin_edges.as_slice() {
            [a, b, ..] => b - a,
            _ => f64::NAN,
        }
    }

    /// Number of bins.
    pub fn n_bins(&self) -> usize {
        self.bin_centers.len()
    }
}

/// Central galaxies paired with their halo masses (parallel arrays, log10).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CentralPairs {
    /// Central galaxy mass (stellar or baryonic).
    pub galaxy_mass: Vec<f64>,
    /// Host halo mass.
    pub halo_mass: Vec<f64>,
}

impl CentralPairs {
    /// Number of centrals.
    pub fn len(&self) -> usize {
        self.galaxy_mass.len()
    }

    /// `true` if there are no centrals.
    pub fn is_empty(&self) -> bool {
        self.galaxy_mass.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(x: f64) -> [f64; 5] {
        [12.0 + x, 10.5, 0.4, 0.6, 0.2]
    }

    #[test]
    fn test_model_params_keys() {
        let p = SmhmParams::BEHROOZI10.model_params();
        assert_eq!(p[0], ("smhm_m1_0", 12.35));
        assert_eq!(p[1], ("smhm_m0_0", 10.72));
        assert_eq!(p[2], ("smhm_beta_0", 0.44));
        assert_eq!(p[3], ("smhm_delta_0", 0.57));
        assert_eq!(p[4], ("scatter_model_param1", 0.15));
    }

    #[test]
    fn test_chain_drops_invalid_draws() {
        let rows = vec![row(0.0), [f64::NAN, 10.5, 0.4, 0.6, 0.2], row(0.2), row(0.3)];
        let chi2 = vec![1.0, 2.0, f64::NAN, -1.0];
        let chain = Chain::from_parts(&rows, &chi2).unwrap();
        assert_eq!(chain.len(), 1);
        assert_eq!(chain.draws()[0].chi2, 1.0);
    }

    #[test]
    fn test_chain_length_mismatch() {
        let rows = vec![row(0.0), row(0.1)];
        let err = Chain::from_parts(&rows, &[1.0]).unwrap_err();
        assert!(matches!(err, crate::Error::DimensionMismatch { expected: 2, actual: 1, .. }));
    }

    #[test]
    fn test_min_chi2() {
        let rows = vec![row(0.0), row(0.1), row(0.2)];
        let chain = Chain::from_parts(&rows, &[3.0, 0.5, 2.0]).unwrap();
        assert_eq!(chain.min_chi2(), Some(0.5));
        assert_eq!(Chain::default().min_chi2(), None);
    }

    #[test]
    fn test_central_flag() {
        let g = MockGalaxy {
            galaxy_id: 1,
            stellar_mass: 1e10,
            halo_id: 7,
            halo_hostid: 7,
            halo_mvir: 1e12,
        };
        assert!(g.is_central());
        assert_eq!(g.cs_flag(), 1);
        let s = MockGalaxy { halo_hostid: 3, ..g };
        assert_eq!(s.cs_flag(), 0);
    }

    #[test]
    fn test_mass_function_bin_width() {
        let mf = MassFunction {
            bin_centers: vec![9.25, 9.75],
            log_phi: vec![-2.0, -3.0],
            poisson_err: vec![0.0, 0.0],
            bin_edges: vec![9.0, 9.5, 10.0],
            counts: vec![1, 1],
        };
        approx::assert_relative_eq!(mf.bin_width(), 0.5);
        assert_eq!(mf.n_bins(), 2);
    }
}
