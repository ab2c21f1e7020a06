//! Differential mass functions on fixed, survey-specific bins.

use xmf_core::survey::h07_to_h1;
use xmf_core::{Error, MassFunction, Result, SurveyConfig};

/// Units of an input mass array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MassScale {
    /// Linear masses already in h=1 units (mock catalogs).
    LinearH1,
    /// log10 masses in h=0.7 units (survey catalogs).
    LogH07,
}

impl MassScale {
    /// Convert one mass to log10, h=1.
    #[inline]
    pub fn to_log_h1(self, m: f64) -> f64 {
        match self {
            MassScale::LinearH1 => m.log10(),
            MassScale::LogH07 => h07_to_h1(m),
        }
    }
}

/// Baryonic mass `log10(10^logmstar + 10^logmgas)`.
#[inline]
pub fn baryonic_mass(logmstar: f64, logmgas: f64) -> f64 {
    (10f64.powf(logmstar) + 10f64.powf(logmgas)).log10()
}

/// Histogram with numpy semantics: half-open bins, last bin closed, values
/// outside `[edges[0], edges[last]]` (and NaN) ignored.
pub fn histogram(values: &[f64], edges: &[f64]) -> Vec<u64> {
    let n_bins = edges.len().saturating_sub(1);
    let mut counts = vec![0u64; n_bins];
    if n_bins == 0 {
        return counts;
    }
    let lo = edges[0];
    let hi = edges[n_bins];
    for &v in values {
        if !(v >= lo && v <= hi) {
            continue;
        }
        // First edge strictly greater than v; v == hi falls into the last bin.
        let idx = edges.partition_point(|&e| e <= v).saturating_sub(1).min(n_bins - 1);
        counts[idx] += 1;
    }
    counts
}

/// Mass function of `masses` on `edges`, normalised by `volume`.
///
/// Empty bins give `log_phi = -inf` and zero error; callers must tolerate
/// them. The Poisson error is `sqrt(N)/(V dM)` in linear density space, an
/// approximation that is poor for very small counts.
pub fn compute(masses: &[f64], scale: MassScale, volume: f64, edges: &[f64]) -> Result<MassFunction> {
    if edges.len() < 2 {
        return Err(Error::Validation(format!("need at least 2 bin edges, got {}", edges.len())));
    }
    if !(volume.is_finite() && volume > 0.0) {
        return Err(Error::Validation(format!("volume must be positive, got {volume}")));
    }

    let log_masses: Vec<f64> = masses.iter().map(|&m| scale.to_log_h1(m)).collect();
    let counts = histogram(&log_masses, edges);
    let dm = edges[1] - edges[0];
    let norm = volume * dm;

    let bin_centers = edges.windows(2).map(|w| 0.5 * (w[0] + w[1])).collect();
    let log_phi = counts.iter().map(|&c| (c as f64 / norm).log10()).collect();
    let poisson_err = counts.iter().map(|&c| (c as f64).sqrt() / norm).collect();

    Ok(MassFunction { bin_centers, log_phi, poisson_err, bin_edges: edges.to_vec(), counts })
}

/// Mass function on the survey's fixed bins.
pub fn survey_mass_function(
    masses: &[f64],
    scale: MassScale,
    volume: f64,
    config: &SurveyConfig,
) -> Result<MassFunction> {
    compute(masses, scale, volume, &config.mass_function_edges())
}
