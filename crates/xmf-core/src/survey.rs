//! Survey configuration: per-survey constants threaded through every component.
//!
//! ECO, RESOLVE-A and RESOLVE-B differ in volume, redshift window, magnitude
//! and mass completeness limits, and mass-function binning. These are literature
//! values, not tunables: a [`SurveyConfig`] is fully determined by the
//! `(Survey, MassType)` pair.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::Chi2Layout;
use crate::{Error, Result};

/// `h^-2` conversion factor between h=0.7 and h=1.0 masses (`0.7^-2`).
pub const HUBBLE_CONVERSION: f64 = 2.041;

/// Comoving volume of the simulation box, (Mpc/h)^3.
pub const SIM_VOLUME: f64 = 130.0 * 130.0 * 130.0;

/// Speed of light, km/s (redshift from cz).
pub const SPEED_OF_LIGHT_KMS: f64 = 3.0e5;

/// Number of mass-function bins.
pub const N_MASS_FUNCTION_BINS: usize = 6;

/// Width of the halo-mass bins of the central mass relation, dex.
pub const RELATION_BIN_WIDTH: f64 = 0.4;

/// Jackknife grid cells per axis.
pub const JACKKNIFE_GRID_CELLS: usize = 10;

/// Convert a log10 mass from h=0.7 to h=1.0 units.
#[inline]
pub fn h07_to_h1(log_mass: f64) -> f64 {
    (10f64.powf(log_mass) / HUBBLE_CONVERSION).log10()
}

/// Round to one decimal place.
#[inline]
pub fn round_tenth(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

/// Observational survey.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Survey {
    /// Environmental COntext catalog.
    Eco,
    /// RESOLVE survey, A semester.
    #[serde(rename = "resolvea")]
    ResolveA,
    /// RESOLVE survey, B semester.
    #[serde(rename = "resolveb")]
    ResolveB,
}

impl Survey {
    /// Display label used in figures.
    pub fn label(&self) -> &'static str {
        match self {
            Survey::Eco => "ECO",
            Survey::ResolveA => "RESOLVE-A",
            Survey::ResolveB => "RESOLVE-B",
        }
    }
}

impl fmt::Display for Survey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Survey::Eco => write!(f, "eco"),
            Survey::ResolveA => write!(f, "resolvea"),
            Survey::ResolveB => write!(f, "resolveb"),
        }
    }
}

impl FromStr for Survey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "eco" => Ok(Survey::Eco),
            "resolvea" => Ok(Survey::ResolveA),
            "resolveb" => Ok(Survey::ResolveB),
            other => Err(Error::Validation(format!(
                "unknown survey '{other}' (expected eco/resolvea/resolveb)"
            ))),
        }
    }
}

/// Which galaxy mass the analysis is built on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MassType {
    /// Stellar mass function / stellar-to-halo-mass relation.
    Smf,
    /// Baryonic mass function / baryonic-to-halo-mass relation.
    Bmf,
}

impl fmt::Display for MassType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MassType::Smf => write!(f, "smf"),
            MassType::Bmf => write!(f, "bmf"),
        }
    }
}

impl FromStr for MassType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "smf" => Ok(MassType::Smf),
            "bmf" => Ok(MassType::Bmf),
            other => Err(Error::Validation(format!("unknown mass type '{other}' (expected smf/bmf)"))),
        }
    }
}

/// Constants of one survey analysed with one mass type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyConfig {
    /// Survey.
    pub survey: Survey,
    /// Mass type.
    pub mass_type: MassType,
    /// Survey volume without buffer, (Mpc/h)^3.
    pub volume: f64,
    /// Cosmic variance.
    pub cvar: f64,
    /// Lower group-cz limit, km/s.
    pub cz_min: f64,
    /// Upper group-cz limit, km/s.
    pub cz_max: f64,
    /// Absolute-magnitude limit (galaxies must be at most this faint).
    pub mag_limit: f64,
    /// Stellar mass completeness limit, log10 (h=0.7).
    pub stellar_mass_limit: f64,
    /// Baryonic mass completeness limit, log10 (h=0.7).
    pub baryonic_mass_limit: f64,
    /// Mass-function range `(lo, hi)` before unit conversion, log10 (h=0.7).
    pub mass_function_range: (f64, f64),
    /// Number of mock survey catalogs.
    pub num_mocks: usize,
    /// Mock catalog name stem (`{mock_name}_cat_{i}_Planck_memb_cat`).
    pub mock_name: String,
}

impl SurveyConfig {
    /// Constants for `survey` analysed with `mass_type`.
    pub fn new(survey: Survey, mass_type: MassType) -> Self {
        let (volume, cvar, cz_min, mag_limit, stellar_mass_limit, baryonic_mass_limit) =
            match survey {
                Survey::Eco => (151829.26, 0.125, 3000.0, -17.33, 8.9, 9.4),
                Survey::ResolveA => (13172.384, 0.30, 4500.0, -17.33, 8.9, 9.4),
                Survey::ResolveB => (4709.8373, 0.58, 4500.0, -17.0, 8.7, 9.1),
            };
        let mass_function_range = match (survey, mass_type) {
            (Survey::Eco, MassType::Smf) => (8.9, 11.8),
            (Survey::ResolveA, MassType::Smf) => (8.9, 11.5),
            (Survey::ResolveB, MassType::Smf) => (8.7, 11.8),
            (Survey::Eco, MassType::Bmf) => (9.4, 11.8),
            (Survey::ResolveA, MassType::Bmf) => (9.4, 11.5),
            (Survey::ResolveB, MassType::Bmf) => (9.1, 11.5),
        };
        let (num_mocks, mock_name) = match survey {
            Survey::Eco => (8, "ECO"),
            Survey::ResolveA => (59, "A"),
            Survey::ResolveB => (104, "B"),
        };
        Self {
            survey,
            mass_type,
            volume,
            cvar,
            cz_min,
            cz_max: 7000.0,
            mag_limit,
            stellar_mass_limit,
            baryonic_mass_limit,
            mass_function_range,
            num_mocks,
            mock_name: mock_name.to_string(),
        }
    }

    /// Completeness limit of the configured mass type, log10 (h=0.7).
    pub fn mass_limit(&self) -> f64 {
        match self.mass_type {
            MassType::Smf => self.stellar_mass_limit,
            MassType::Bmf => self.baryonic_mass_limit,
        }
    }

    /// Completeness limit converted to h=1 and rounded to 0.1 dex.
    ///
    /// Mocks are cut at `stellar_mass >= 10^completeness_limit_h1()`.
    pub fn completeness_limit_h1(&self) -> f64 {
        round_tenth(h07_to_h1(self.mass_limit()))
    }

    /// Fixed mass-function bin edges (h=1, log10).
    ///
    /// Six equal-width bins between the converted, rounded range limits. The
    /// edges never depend on the data being binned, so mock and survey
    /// measurements are directly comparable.
    pub fn mass_function_edges(&self) -> Vec<f64> {
        let (lo, hi) = self.mass_function_range;
        let lo = round_tenth(h07_to_h1(lo));
        let hi = round_tenth(h07_to_h1(hi));
        let step = (hi - lo) / N_MASS_FUNCTION_BINS as f64;
        (0..=N_MASS_FUNCTION_BINS)
            .map(|i| if i == N_MASS_FUNCTION_BINS { hi } else { lo + step * i as f64 })
            .collect()
    }

    /// Layout of the chi-squared file for this run.
    ///
    /// The ECO stellar-mass run wrote its chi-squared values as a 1000x250
    /// matrix flattened along the other axis than the chain. This is a property
    /// of that run's output, not of the statistic.
    pub fn chi2_layout(&self) -> Chi2Layout {
        match (self.survey, self.mass_type) {
            (Survey::Eco, MassType::Smf) => Chi2Layout::ColumnMajor { rows: 1000, cols: 250 },
            _ => Chi2Layout::RowOrder,
        }
    }

    /// File name of mock catalog `index`.
    pub fn mock_file_name(&self, index: usize) -> String {
        format!("{}_cat_{}_Planck_memb_cat.csv", self.mock_name, index)
    }
}
