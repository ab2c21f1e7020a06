//! `xmf run`: the full post-processing pipeline from one config file.

use anyhow::{Context, Result};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use xmf_core::survey::JACKKNIFE_GRID_CELLS;
use xmf_core::{MassType, Survey, SurveyConfig};
use xmf_inference::behroozi::{Behroozi10Model, DEFAULT_GAMMA};
use xmf_inference::ensemble::{EnsembleOptions, best_fit_measurement, run_ensemble};
use xmf_inference::mass_function::{MassScale, survey_mass_function};
use xmf_inference::selection::sample_masses;
use xmf_inference::{
    SpatialGrid, centrals_from_survey, jackknife, mock_relation_ensemble, mock_relation_scatter,
    model_redshift, select_percentile, select_survey_sample,
};

#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    pub survey: Survey,
    pub mass_type: MassType,
    /// MCMC chain (5 whitespace-delimited columns).
    pub chain: PathBuf,
    /// Chi-squared values, one per chain row.
    pub chi2: PathBuf,
    /// Survey catalog CSV.
    pub catalog: PathBuf,
    /// Halo catalog CSV for populating mocks.
    pub halo_catalog: PathBuf,
    /// Directory of survey mock catalogs (optional).
    #[serde(default)]
    pub mock_dir: Option<PathBuf>,

    #[serde(default = "default_percentile")]
    pub percentile: f64,
    /// Draws sampled from the percentile subset for the ensemble.
    #[serde(default = "default_n_samples")]
    pub n_samples: usize,
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Transition-sharpness exponent of the SMHM relation.
    #[serde(default = "default_gamma")]
    pub gamma: f64,
    /// Jackknife grid cells per axis.
    #[serde(default = "default_grid_cells")]
    pub grid_cells: usize,
}

fn default_percentile() -> f64 {
    68.0
}

fn default_n_samples() -> usize {
    100
}

fn default_workers() -> usize {
    5
}

fn default_seed() -> u64 {
    5
}

fn default_gamma() -> f64 {
    DEFAULT_GAMMA
}

fn default_grid_cells() -> usize {
    JACKKNIFE_GRID_CELLS
}

pub fn read_run_config(path: &Path) -> Result<RunConfig> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let cfg: RunConfig = serde_json::from_slice(&bytes)?;
    if !(cfg.percentile > 0.0 && cfg.percentile <= 100.0) {
        anyhow::bail!("percentile must be in (0, 100], got {}", cfg.percentile);
    }
    if cfg.workers == 0 {
        anyhow::bail!("workers must be > 0");
    }
    Ok(cfg)
}

pub fn run(cfg: &RunConfig) -> Result<serde_json::Value> {
    let config = SurveyConfig::new(cfg.survey, cfg.mass_type);
    tracing::info!(survey = %cfg.survey, mass_type = %cfg.mass_type, "starting run");

    // All input is read before any parallel work.
    let chain = xmf_translate::read_chain_with_chi2(&cfg.chain, &cfg.chi2, config.chi2_layout())?;
    let catalog = xmf_translate::read_survey_catalog(&cfg.catalog)?;
    let halos = xmf_translate::read_halo_catalog(&cfg.halo_catalog)?;
    let mocks = match &cfg.mock_dir {
        Some(dir) => Some(xmf_translate::read_mock_survey_catalogs(dir, &config)?),
        None => None,
    };

    let selection = select_percentile(&chain, cfg.percentile)?;
    let mut rng = StdRng::seed_from_u64(cfg.seed);
    let draws = selection.sample(&mut rng, cfg.n_samples)?;
    tracing::info!(chain = chain.len(), subset = selection.len(), sampled = draws.len(), "selected draws");

    let sample = select_survey_sample(&catalog, &config);
    let redshift = model_redshift(&catalog, &sample, cfg.survey)
        .context("survey sample has no finite grpcz")?;
    let halos: std::sync::Arc<[xmf_core::Halo]> = halos.into();
    let gamma = cfg.gamma;
    let make_model = |_worker: usize| -> xmf_core::Result<Behroozi10Model> {
        Ok(Behroozi10Model::new(halos.clone(), redshift).with_gamma(gamma))
    };

    let options = EnsembleOptions { workers: cfg.workers, seed: cfg.seed };
    let ensemble = run_ensemble(make_model, &draws, &config, options)?;
    let best_model = Behroozi10Model::new(halos.clone(), redshift).with_gamma(gamma);
    let best_fit = best_fit_measurement(&best_model, &selection.best_fit, &config, cfg.seed)?;
    tracing::info!(draws = ensemble.len(), "ensemble complete");

    let data_mf = survey_mass_function(
        &sample_masses(&sample, cfg.mass_type),
        MassScale::LogH07,
        config.volume,
        &config,
    )?;
    let data_centrals = centrals_from_survey(&sample, &config);

    let ra: Vec<f64> = sample.iter().map(|g| g.radeg).collect();
    let dec: Vec<f64> = sample.iter().map(|g| g.dedeg).collect();
    let grid = SpatialGrid::build(&ra, &dec, cfg.grid_cells)?;
    let jk = jackknife(&sample, &config, &grid)?;
    tracing::info!(folds = jk.n_folds, "jackknife complete");

    let mock_relations = match &mocks {
        Some(catalogs) => Some(mock_relation_ensemble(catalogs, &config)?),
        None => None,
    };
    let mock_scatter = mock_relations.as_deref().map(mock_relation_scatter);

    Ok(serde_json::json!({
        "survey": cfg.survey,
        "mass_type": cfg.mass_type,
        "median_redshift": redshift,
        "chain": {
            "n_draws": chain.len(),
            "percentile": cfg.percentile,
            "cutoff": selection.cutoff,
            "n_unique": selection.len(),
            "best_fit": selection.best_fit,
        },
        "data": {
            "n_galaxies": sample.len(),
            "mass_function": data_mf,
            "mf_stddev": jk.mf_stddev,
            "centrals": data_centrals,
        },
        "jackknife": crate::jackknife_json(&jk),
        "best_fit": best_fit,
        "ensemble": {
            "workers": ensemble.workers,
            "envelope": ensemble.mass_function_envelope(),
            "measurements": ensemble.measurements,
        },
        "mock_relations": mock_relations,
        "mock_scatter": mock_scatter,
    }))
}
