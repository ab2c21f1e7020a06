//! Survey sample selection.

use xmf_core::survey::SPEED_OF_LIGHT_KMS;
use xmf_core::{MassType, Survey, SurveyConfig, SurveyGalaxy};

/// Apply the survey's redshift window, magnitude limit, footprint flags and
/// (for stellar-mass analyses) stellar-mass limit.
///
/// RESOLVE-B always requires `f_b == 1`; RESOLVE-A requires `f_a == 1` only
/// for baryonic analyses.
pub fn select_survey_sample(catalog: &[SurveyGalaxy], config: &SurveyConfig) -> Vec<SurveyGalaxy> {
    let selected: Vec<SurveyGalaxy> = catalog
        .iter()
        .filter(|g| g.grpcz >= config.cz_min && g.grpcz <= config.cz_max)
        .filter(|g| g.absrmag <= config.mag_limit)
        .filter(|g| match config.mass_type {
            MassType::Smf => g.logmstar >= config.stellar_mass_limit,
            MassType::Bmf => true,
        })
        .filter(|g| match (config.survey, config.mass_type) {
            (Survey::ResolveA, MassType::Bmf) => g.f_a == 1,
            (Survey::ResolveB, _) => g.f_b == 1,
            _ => true,
        })
        .cloned()
        .collect();
    log::info!(
        "{} {} sample: {} of {} galaxies selected",
        config.survey.label(),
        config.mass_type,
        selected.len(),
        catalog.len()
    );
    selected
}

/// Median redshift `median(grpcz) / c` of a catalog.
pub fn median_redshift(catalog: &[SurveyGalaxy]) -> Option<f64> {
    let mut cz: Vec<f64> = catalog.iter().map(|g| g.grpcz).filter(|v| v.is_finite()).collect();
    if cz.is_empty() {
        return None;
    }
    cz.sort_by(|a, b| a.total_cmp(b));
    let n = cz.len();
    let median = if n % 2 == 1 { cz[n / 2] } else { 0.5 * (cz[n / 2 - 1] + cz[n / 2]) };
    Some(median / SPEED_OF_LIGHT_KMS)
}

/// Redshift the mock population is built at.
///
/// ECO uses the median of its selected sample; RESOLVE uses the whole
/// catalog.
pub fn model_redshift(catalog: &[SurveyGalaxy], sample: &[SurveyGalaxy], survey: Survey) -> Option<f64> {
    match survey {
        Survey::Eco => median_redshift(sample),
        Survey::ResolveA | Survey::ResolveB => median_redshift(catalog),
    }
}

/// Galaxy masses the survey's mass function is built on (log10, h=0.7).
pub fn sample_masses(sample: &[SurveyGalaxy], mass_type: MassType) -> Vec<f64> {
    sample
        .iter()
        .map(|g| match mass_type {
            MassType::Smf => g.logmstar,
            MassType::Bmf => crate::mass_function::baryonic_mass(g.logmstar, g.logmgas),
        })
        .collect()
}
