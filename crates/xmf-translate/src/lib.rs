//! # xmf-translate
//!
//! Readers for xmf inputs:
//! - MCMC chain files (with repair of spilled scatter values)
//! - chi-squared files (including the column-major provenance quirk)
//! - survey, mock survey and halo catalogs (CSV)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod catalog;
pub mod chain;

pub use catalog::{
    CatalogFormat, read_halo_catalog, read_mock_survey_catalog, read_mock_survey_catalogs,
    read_survey_catalog,
};
pub use chain::{RawChain, read_chain, read_chain_with_chi2, read_chi2};
