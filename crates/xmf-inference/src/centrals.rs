//! Central galaxies paired with their halo masses.
//!
//! All extractors return log10 masses in h=1 units, in catalog order.

use xmf_core::survey::{HUBBLE_CONVERSION, h07_to_h1};
use xmf_core::{CentralPairs, MassType, MockGalaxy, MockSurveyGalaxy, SurveyConfig, SurveyGalaxy};

use crate::mass_function::baryonic_mass;

/// Centrals of a populated mock (`halo_id == halo_hostid`).
pub fn centrals_from_mock(galaxies: &[MockGalaxy]) -> CentralPairs {
    let mut out = CentralPairs::default();
    for g in galaxies.iter().filter(|g| g.is_central()) {
        out.galaxy_mass.push(g.stellar_mass.log10());
        out.halo_mass.push(g.halo_mvir.log10());
    }
    out
}

/// Centrals of a survey catalog (`fc == 1`).
///
/// Stellar relations pair `logmstar` with `groupmass_s`. Baryonic relations
/// pair the baryonic mass with `logmh_s` and keep only galaxies above the
/// survey's baryonic completeness limit.
pub fn centrals_from_survey(catalog: &[SurveyGalaxy], config: &SurveyConfig) -> CentralPairs {
    let mut out = CentralPairs::default();
    for (gal, halo) in catalog.iter().filter_map(|g| survey_central_pair(g, config)) {
        out.galaxy_mass.push(gal);
        out.halo_mass.push(halo);
    }
    out
}

/// `(galaxy mass, halo mass)` of one survey galaxy if it enters the central
/// relation of [`centrals_from_survey`].
pub fn survey_central_pair(g: &SurveyGalaxy, config: &SurveyConfig) -> Option<(f64, f64)> {
    if g.fc != 1 {
        return None;
    }
    match config.mass_type {
        MassType::Smf => Some((h07_to_h1(g.logmstar), h07_to_h1(g.groupmass_s))),
        MassType::Bmf => {
            let logmbary = baryonic_mass(g.logmstar, g.logmgas);
            (logmbary >= config.baryonic_mass_limit)
                .then(|| (h07_to_h1(logmbary), h07_to_h1(g.logmh_s)))
        }
    }
}

/// Centrals of a mock survey catalog (`cs_flag == 1`).
///
/// Group masses in mock survey catalogs are already h=1. Gas masses are
/// `1.4 * mhi` (helium correction).
pub fn centrals_from_survey_mock(
    catalog: &[MockSurveyGalaxy],
    config: &SurveyConfig,
) -> CentralPairs {
    let limit_h1 = h07_to_h1(config.baryonic_mass_limit);
    let mut out = CentralPairs::default();
    for g in catalog.iter().filter(|g| g.cs_flag == 1) {
        let logmstar = h07_to_h1(g.logmstar);
        match config.mass_type {
            MassType::Smf => {
                out.galaxy_mass.push(logmstar);
                out.halo_mass.push(g.m_group);
            }
            MassType::Bmf => {
                let logmgas = (1.4 * g.mhi / HUBBLE_CONVERSION).log10();
                let logmbary = baryonic_mass(logmstar, logmgas);
                if logmbary >= limit_h1 {
                    out.galaxy_mass.push(logmbary);
                    out.halo_mass.push(g.m_group);
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use xmf_core::Survey;

    fn galaxy(id: u64, halo: u64, host: u64, ms: f64, mh: f64) -> MockGalaxy {
        MockGalaxy { galaxy_id: id, stellar_mass: ms, halo_id: halo, halo_hostid: host, halo_mvir: mh }
    }

    fn survey_galaxy(name: &str, fc: u8, logmstar: f64, logmgas: f64) -> SurveyGalaxy {
        SurveyGalaxy {
            name: name.to_string(),
            grpcz: 5000.0,
            absrmag: -18.0,
            logmstar,
            logmgas,
            radeg: 150.0,
            dedeg: 1.0,
            fc,
            groupmass_s: 12.0,
            logmh_s: 12.2,
            f_a: 1,
            f_b: 0,
        }
    }

    #[test]
    fn test_mock_centrals_preserve_order() {
        let gals = vec![
            galaxy(1, 10, 10, 1e10, 1e12),
            galaxy(2, 11, 10, 1e9, 1e11),
            galaxy(3, 12, 12, 1e9, 1e11),
        ];
        let c = centrals_from_mock(&gals);
        assert_eq!(c.len(), 2);
        assert_relative_eq!(c.galaxy_mass[0], 10.0, epsilon = 1e-12);
        assert_relative_eq!(c.halo_mass[1], 11.0, epsilon = 1e-12);
        assert_eq!(centrals_from_mock(&gals), c);
    }

    #[test]
    fn test_survey_centrals_smf() {
        let config = SurveyConfig::new(Survey::Eco, MassType::Smf);
        let cat = vec![survey_galaxy("a", 1, 10.0, 9.0), survey_galaxy("b", 0, 10.5, 9.0)];
        let c = centrals_from_survey(&cat, &config);
        assert_eq!(c.len(), 1);
        assert_relative_eq!(c.galaxy_mass[0], h07_to_h1(10.0), epsilon = 1e-12);
        assert_relative_eq!(c.halo_mass[0], h07_to_h1(12.0), epsilon = 1e-12);
    }

    #[test]
    fn test_survey_centrals_bmf_limit() {
        let config = SurveyConfig::new(Survey::Eco, MassType::Bmf);
        // 9.0 + 9.0 -> 9.30 baryonic, below 9.4; 9.3 + 9.0 -> 9.48, above.
        let cat = vec![survey_galaxy("a", 1, 9.0, 9.0), survey_galaxy("b", 1, 9.3, 9.0)];
        let c = centrals_from_survey(&cat, &config);
        assert_eq!(c.len(), 1);
        assert_relative_eq!(c.galaxy_mass[0], h07_to_h1(baryonic_mass(9.3, 9.0)), epsilon = 1e-12);
        assert_relative_eq!(c.halo_mass[0], h07_to_h1(12.2), epsilon = 1e-12);
    }

    #[test]
    fn test_survey_mock_centrals() {
        let cat = vec![
            MockSurveyGalaxy { cz: 4000.0, m_r: -18.0, logmstar: 10.0, mhi: 1e9, cs_flag: 1, m_group: 12.1 },
            MockSurveyGalaxy { cz: 4000.0, m_r: -18.0, logmstar: 10.0, mhi: 1e9, cs_flag: 0, m_group: 12.1 },
        ];
        let smf = centrals_from_survey_mock(&cat, &SurveyConfig::new(Survey::Eco, MassType::Smf));
        assert_eq!(smf.len(), 1);
        assert_eq!(smf.halo_mass[0], 12.1);

        let bmf = centrals_from_survey_mock(&cat, &SurveyConfig::new(Survey::Eco, MassType::Bmf));
        let gas = (1.4e9 / HUBBLE_CONVERSION).log10();
        assert_relative_eq!(bmf.galaxy_mass[0], baryonic_mass(h07_to_h1(10.0), gas), epsilon = 1e-12);
    }
}
