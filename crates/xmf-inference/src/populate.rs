//! Populating the simulation box for one parameter draw.

use xmf_core::{HaloPopulator, MockGalaxy, Result, SmhmParams, SurveyConfig};

/// Populate with `model` and keep galaxies above the survey's completeness
/// limit, `stellar_mass >= 10^completeness_limit_h1()`.
///
/// The limit is applied to stellar mass for both mass types.
pub fn populate<P: HaloPopulator + ?Sized>(
    model: &P,
    params: &SmhmParams,
    config: &SurveyConfig,
    seed: u64,
) -> Result<Vec<MockGalaxy>> {
    let limit = 10f64.powf(config.completeness_limit_h1());
    let mut galaxies = model.populate(params, seed)?;
    galaxies.retain(|g| g.stellar_mass >= limit);
    Ok(galaxies)
}
