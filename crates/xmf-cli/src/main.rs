//! xmf CLI

use anyhow::Result;
use clap::{Parser, Subcommand};
use nalgebra::DMatrix;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::PathBuf;
use xmf_core::survey::JACKKNIFE_GRID_CELLS;
use xmf_core::{MassType, Survey, SurveyConfig};
use xmf_inference::mass_function::{MassScale, survey_mass_function};
use xmf_inference::selection::sample_masses;
use xmf_inference::{
    JackknifeResult, SpatialGrid, centrals_from_survey, jackknife, mock_relation_ensemble,
    mock_relation_scatter, model_redshift, select_percentile, select_survey_sample,
};

mod run;

#[derive(Parser)]
#[command(name = "xmf")]
#[command(about = "xmf - galaxy mass functions and SMHM statistics from MCMC chains")]
#[command(version)]
struct Cli {
    /// Log verbosity level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: tracing::Level,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline from a JSON config
    Run {
        /// Run config (JSON)
        #[arg(short, long)]
        config: PathBuf,

        /// Output file for results (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Select the best-fitting percentile of an MCMC chain
    Select {
        /// Chain file (5 columns)
        #[arg(long)]
        chain: PathBuf,

        /// Chi-squared file (one value per line)
        #[arg(long)]
        chi2: PathBuf,

        /// Survey (eco, resolvea, resolveb); sets the chi-squared layout
        #[arg(long, default_value = "eco")]
        survey: Survey,

        /// Mass type (smf, bmf)
        #[arg(long, default_value = "smf")]
        mass_type: MassType,

        /// Percentile of draws to keep
        #[arg(long, default_value = "68")]
        percentile: f64,

        /// Draws to sample from the subset (0 = none)
        #[arg(long, default_value = "100")]
        sample: usize,

        /// RNG seed for sampling
        #[arg(long, default_value = "5")]
        seed: u64,

        /// Output file for results (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Mass function and central relation of a survey catalog
    MassFunction {
        /// Survey catalog (CSV)
        #[arg(short, long)]
        catalog: PathBuf,

        #[arg(long)]
        survey: Survey,

        #[arg(long, default_value = "smf")]
        mass_type: MassType,

        /// Output file for results (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Jackknife errors of a survey catalog
    Jackknife {
        /// Survey catalog (CSV)
        #[arg(short, long)]
        catalog: PathBuf,

        #[arg(long)]
        survey: Survey,

        #[arg(long, default_value = "smf")]
        mass_type: MassType,

        /// Grid cells per axis
        #[arg(long, default_value_t = JACKKNIFE_GRID_CELLS)]
        cells: usize,

        /// Threads (0 = auto)
        #[arg(long, default_value = "0")]
        threads: usize,

        /// Output file for results (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Central relations of every survey mock catalog in a directory
    Mocks {
        /// Directory holding `{name}_cat_{i}_Planck_memb_cat.csv`
        #[arg(long)]
        dir: PathBuf,

        #[arg(long)]
        survey: Survey,

        #[arg(long, default_value = "smf")]
        mass_type: MassType,

        /// Output file for results (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print version
    Version,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt().with_max_level(cli.log_level).with_target(false).init();

    match cli.command {
        Commands::Run { config, output } => cmd_run(&config, output.as_ref()),
        Commands::Select { chain, chi2, survey, mass_type, percentile, sample, seed, output } => {
            cmd_select(&chain, &chi2, survey, mass_type, percentile, sample, seed, output.as_ref())
        }
        Commands::MassFunction { catalog, survey, mass_type, output } => {
            cmd_mass_function(&catalog, survey, mass_type, output.as_ref())
        }
        Commands::Jackknife { catalog, survey, mass_type, cells, threads, output } => {
            cmd_jackknife(&catalog, survey, mass_type, cells, threads, output.as_ref())
        }
        Commands::Mocks { dir, survey, mass_type, output } => {
            cmd_mocks(&dir, survey, mass_type, output.as_ref())
        }
        Commands::Version => {
            println!("xmf {}", xmf_core::VERSION);
            Ok(())
        }
    }
}

fn cmd_run(config: &PathBuf, output: Option<&PathBuf>) -> Result<()> {
    let cfg = run::read_run_config(config)?;
    let result = run::run(&cfg)?;
    write_json(output, result)
}

#[allow(clippy::too_many_arguments)]
fn cmd_select(
    chain: &PathBuf,
    chi2: &PathBuf,
    survey: Survey,
    mass_type: MassType,
    percentile: f64,
    sample: usize,
    seed: u64,
    output: Option<&PathBuf>,
) -> Result<()> {
    let config = SurveyConfig::new(survey, mass_type);
    let chain = xmf_translate::read_chain_with_chi2(chain, chi2, config.chi2_layout())?;
    let selection = select_percentile(&chain, percentile)?;
    tracing::info!(n_draws = chain.len(), n_unique = selection.len(), "percentile selected");

    let sampled = if sample > 0 {
        let mut rng = StdRng::seed_from_u64(seed);
        selection.sample(&mut rng, sample)?
    } else {
        Vec::new()
    };

    let output_json = serde_json::json!({
        "n_draws": chain.len(),
        "percentile": percentile,
        "cutoff": selection.cutoff,
        "n_unique": selection.len(),
        "best_fit": selection.best_fit,
        "sample": sampled,
    });
    write_json(output, output_json)
}

fn cmd_mass_function(
    catalog: &PathBuf,
    survey: Survey,
    mass_type: MassType,
    output: Option<&PathBuf>,
) -> Result<()> {
    let config = SurveyConfig::new(survey, mass_type);
    let catalog = xmf_translate::read_survey_catalog(catalog)?;
    let sample = select_survey_sample(&catalog, &config);
    let mf = survey_mass_function(
        &sample_masses(&sample, mass_type),
        MassScale::LogH07,
        config.volume,
        &config,
    )?;
    let centrals = centrals_from_survey(&sample, &config);
    let relation = xmf_inference::binned_mean(
        &centrals.halo_mass,
        &centrals.galaxy_mass,
        xmf_core::survey::RELATION_BIN_WIDTH,
    )?;

    let output_json = serde_json::json!({
        "survey": survey,
        "mass_type": mass_type,
        "median_redshift": model_redshift(&catalog, &sample, survey),
        "n_galaxies": sample.len(),
        "mass_function": mf,
        "relation": relation,
    });
    write_json(output, output_json)
}

fn cmd_jackknife(
    catalog: &PathBuf,
    survey: Survey,
    mass_type: MassType,
    cells: usize,
    threads: usize,
    output: Option<&PathBuf>,
) -> Result<()> {
    if threads > 0 {
        // Best-effort; if a global pool already exists, keep going.
        let _ = rayon::ThreadPoolBuilder::new().num_threads(threads).build_global();
    }

    let config = SurveyConfig::new(survey, mass_type);
    let catalog = xmf_translate::read_survey_catalog(catalog)?;
    let sample = select_survey_sample(&catalog, &config);
    let ra: Vec<f64> = sample.iter().map(|g| g.radeg).collect();
    let dec: Vec<f64> = sample.iter().map(|g| g.dedeg).collect();
    let grid = SpatialGrid::build(&ra, &dec, cells)?;
    let jk = jackknife(&sample, &config, &grid)?;
    tracing::info!(folds = jk.n_folds, "jackknife complete");

    write_json(output, jackknife_json(&jk))
}

fn cmd_mocks(dir: &PathBuf, survey: Survey, mass_type: MassType, output: Option<&PathBuf>) -> Result<()> {
    let config = SurveyConfig::new(survey, mass_type);
    let catalogs = xmf_translate::read_mock_survey_catalogs(dir, &config)?;
    let relations = mock_relation_ensemble(&catalogs, &config)?;
    let scatter = mock_relation_scatter(&relations);

    let output_json = serde_json::json!({
        "survey": survey,
        "mass_type": mass_type,
        "n_mocks": relations.len(),
        "relations": relations,
        "scatter": scatter,
    });
    write_json(output, output_json)
}

fn matrix_rows(m: &DMatrix<f64>) -> Vec<Vec<f64>> {
    (0..m.nrows()).map(|i| m.row(i).iter().copied().collect()).collect()
}

fn jackknife_json(jk: &JackknifeResult) -> serde_json::Value {
    serde_json::json!({
        "n_folds": jk.n_folds,
        "cells": jk.cells,
        "mf_bin_centers": jk.mf_bin_centers,
        "mf_stddev": jk.mf_stddev,
        "mf_covariance": matrix_rows(&jk.mf_covariance),
        "mf_correlation": matrix_rows(&jk.mf_correlation()),
        "relation_centers": jk.relation_centers,
        "relation_stddev": jk.relation_stddev,
        "relation_covariance": matrix_rows(&jk.relation_covariance),
        "dropped_relation_centers": jk.dropped_relation_centers,
    })
}

fn write_json(output: Option<&PathBuf>, value: serde_json::Value) -> Result<()> {
    if let Some(path) = output {
        std::fs::write(path, serde_json::to_string_pretty(&value)?)?;
    } else {
        println!("{}", serde_json::to_string_pretty(&value)?);
    }
    Ok(())
}
