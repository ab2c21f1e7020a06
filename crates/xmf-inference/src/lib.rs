//! # xmf-inference
//!
//! Statistics for galaxy mass-function and stellar-to-halo-mass analyses.
//!
//! This crate provides:
//! - Credible-subset selection from MCMC chains
//! - Mock population and mass-function measurement
//! - Central-galaxy relations and their binned statistics
//! - Spatial jackknife covariances for survey data
//! - A parallel ensemble driver over parameter draws
//!
//! ## Architecture
//!
//! Population goes through the `HaloPopulator` trait from xmf-core.
//! [`behroozi::Behroozi10Model`] is the bundled implementation.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Behroozi (2010) relation and subhalo abundance-matching populator.
pub mod behroozi;
/// Binned mean of one array against another on a fixed lattice.
pub mod binned;
/// Central galaxies paired with halo masses.
pub mod centrals;
/// Parallel per-draw mock measurements.
pub mod ensemble;
/// RA / sin(Dec) grid for jackknife folds.
pub mod grid;
/// Jackknife covariance of survey measurements.
pub mod jackknife;
/// Differential mass functions.
pub mod mass_function;
/// Central relations of survey mock catalogs.
pub mod mocks;
/// Percentile selection of chain draws.
pub mod percentile;
/// Mock population with completeness cut.
pub mod populate;
/// Survey sample selection.
pub mod selection;

pub use behroozi::{Behroozi10Model, behroozi10_log_halo_mass};
pub use binned::{AlignedRelations, BinnedRelation, align_relations, binned_mean};
pub use centrals::{centrals_from_mock, centrals_from_survey, centrals_from_survey_mock};
pub use ensemble::{
    EnsembleOptions, EnsembleResult, Envelope, Measurement, best_fit_measurement, run_ensemble,
};
pub use grid::SpatialGrid;
pub use jackknife::{JackknifeResult, jackknife};
pub use mass_function::{MassScale, compute as compute_mass_function, survey_mass_function};
pub use mocks::{
    MockScatter, mock_relation_ensemble, mock_relation_scatter, select_mock_survey_sample,
};
pub use percentile::{PercentileSelection, select as select_percentile};
pub use populate::populate;
pub use selection::{median_redshift, model_redshift, select_survey_sample};
