//! # xmf-core
//!
//! Core types and traits for xmf: error taxonomy, MCMC chain and galaxy
//! catalog types, per-survey constants, and the abundance-matching model seam.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod survey;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use survey::{MassType, Survey, SurveyConfig};
pub use traits::HaloPopulator;
pub use types::{
    CentralPairs, Chain, Chi2Layout, Halo, MassFunction, MockGalaxy, MockSurveyGalaxy,
    ParameterDraw, SmhmParams, SurveyGalaxy,
};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
