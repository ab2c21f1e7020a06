//! Central relations measured on survey mock catalogs.
//!
//! The spread of these relations across mocks shows the sample variance
//! expected for the observed relation.

use rayon::prelude::*;
use serde::Serialize;
use xmf_core::survey::RELATION_BIN_WIDTH;
use xmf_core::{MassType, MockSurveyGalaxy, Result, SurveyConfig};

use crate::binned::{BinnedRelation, align_relations, binned_mean};
use crate::centrals::centrals_from_survey_mock;

/// Mock galaxies inside the survey definition: cz window, magnitude limit
/// and, for stellar-mass analyses, the stellar-mass limit.
pub fn select_mock_survey_sample(
    catalog: &[MockSurveyGalaxy],
    config: &SurveyConfig,
) -> Vec<MockSurveyGalaxy> {
    catalog
        .iter()
        .filter(|g| g.cz >= config.cz_min && g.cz <= config.cz_max && g.m_r <= config.mag_limit)
        .filter(|g| match config.mass_type {
            MassType::Smf => g.logmstar >= config.stellar_mass_limit,
            MassType::Bmf => true,
        })
        .copied()
        .collect()
}

/// Binned central relation of one mock catalog.
pub fn mock_relation(catalog: &[MockSurveyGalaxy], config: &SurveyConfig) -> Result<BinnedRelation> {
    let sample = select_mock_survey_sample(catalog, config);
    let centrals = centrals_from_survey_mock(&sample, config);
    binned_mean(&centrals.halo_mass, &centrals.galaxy_mass, RELATION_BIN_WIDTH)
}

/// Binned central relation of every mock catalog, in catalog order.
pub fn mock_relation_ensemble(
    catalogs: &[Vec<MockSurveyGalaxy>],
    config: &SurveyConfig,
) -> Result<Vec<BinnedRelation>> {
    catalogs.par_iter().map(|c| mock_relation(c, config)).collect()
}

/// Spread of the mock relations on the lattice bins they all populate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MockScatter {
    /// Number of mock relations combined.
    pub n_mocks: usize,
    /// Shared lattice indices, ascending.
    pub lattice: Vec<i64>,
    /// Shared bin centers (log10 halo mass).
    pub centers: Vec<f64>,
    /// Mean across mocks per shared bin.
    pub mean: Vec<f64>,
    /// Population standard deviation across mocks per shared bin.
    pub std: Vec<f64>,
    /// Lattice indices some mocks leave empty.
    pub dropped: Vec<i64>,
}

/// Mock-to-mock scatter of the central relation: the error bar on the
/// relation measured in the survey.
pub fn mock_relation_scatter(relations: &[BinnedRelation]) -> MockScatter {
    let aligned = align_relations(relations);
    let n = aligned.means.len();
    let n_bins = aligned.lattice.len();

    let mut mean = vec![f64::NAN; n_bins];
    let mut std = vec![f64::NAN; n_bins];
    if n > 0 {
        for j in 0..n_bins {
            let m = aligned.means.iter().map(|row| row[j]).sum::<f64>() / n as f64;
            let var = aligned.means.iter().map(|row| (row[j] - m).powi(2)).sum::<f64>() / n as f64;
            mean[j] = m;
            std[j] = var.sqrt();
        }
    }
    if !aligned.dropped.is_empty() {
        log::debug!("mock scatter: {} lattice bins not shared by all mocks", aligned.dropped.len());
    }

    MockScatter {
        n_mocks: n,
        lattice: aligned.lattice,
        centers: aligned.centers,
        mean,
        std,
        dropped: aligned.dropped,
    }
}
