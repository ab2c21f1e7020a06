//! Tabular catalog readers (survey data, survey mocks, halo catalogs).
//!
//! Only CSV with a header row is supported. HDF5 catalogs must be exported to
//! CSV first; their format tag is reported as unsupported.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use xmf_core::{Error, Halo, MockSurveyGalaxy, Result, SurveyConfig, SurveyGalaxy};

/// On-disk catalog format, from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogFormat {
    /// Comma-separated values with a header row.
    Csv,
}

impl CatalogFormat {
    /// Detect the format from `path`'s extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path.extension().and_then(|e| e.to_str()).map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("csv") => Ok(CatalogFormat::Csv),
            Some(other) => Err(Error::UnsupportedFormat(format!(".{other}"))),
            None => Err(Error::UnsupportedFormat(format!("{} (no extension)", path.display()))),
        }
    }
}

fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        return Err(Error::CatalogNotFound(path.to_path_buf()));
    }
    match CatalogFormat::from_path(path)? {
        CatalogFormat::Csv => {
            let mut rdr = csv::ReaderBuilder::new()
                .has_headers(true)
                .trim(csv::Trim::All)
                .from_path(path)
                .map_err(|e| Error::Validation(format!("{}: {e}", path.display())))?;
            rdr.deserialize()
                .enumerate()
                .map(|(i, rec)| {
                    rec.map_err(|e| {
                        Error::Validation(format!("{} record {}: {e}", path.display(), i + 1))
                    })
                })
                .collect()
        }
    }
}

/// Read an ECO/RESOLVE survey catalog.
pub fn read_survey_catalog(path: impl AsRef<Path>) -> Result<Vec<SurveyGalaxy>> {
    let path = path.as_ref();
    let catalog: Vec<SurveyGalaxy> = read_records(path)?;
    log::info!("read {} galaxies from {}", catalog.len(), path.display());
    Ok(catalog)
}

/// Read one ECO/RESOLVE mock survey catalog.
pub fn read_mock_survey_catalog(path: impl AsRef<Path>) -> Result<Vec<MockSurveyGalaxy>> {
    read_records(path.as_ref())
}

/// Read all mock survey catalogs of a survey from `dir`.
///
/// Files are named after [`SurveyConfig::mock_file_name`]; a missing mock is a
/// [`Error::CatalogNotFound`].
pub fn read_mock_survey_catalogs(
    dir: impl AsRef<Path>,
    config: &SurveyConfig,
) -> Result<Vec<Vec<MockSurveyGalaxy>>> {
    let dir = dir.as_ref();
    let catalogs = (0..config.num_mocks)
        .map(|i| {
            let path: PathBuf = dir.join(config.mock_file_name(i));
            read_mock_survey_catalog(&path)
        })
        .collect::<Result<Vec<_>>>()?;
    log::info!("read {} {} mock catalogs from {}", catalogs.len(), config.survey, dir.display());
    Ok(catalogs)
}

/// Read a simulation halo catalog.
pub fn read_halo_catalog(path: impl AsRef<Path>) -> Result<Vec<Halo>> {
    let path = path.as_ref();
    let halos: Vec<Halo> = read_records(path)?;
    log::info!("read {} halos from {}", halos.len(), path.display());
    Ok(halos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use xmf_core::{MassType, Survey};

    fn tmp_path(filename: &str) -> PathBuf {
        std::env::temp_dir().join(format!("xmf_translate_{}_{}", std::process::id(), filename))
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(CatalogFormat::from_path(Path::new("eco_all.CSV")).unwrap(), CatalogFormat::Csv);
        let err = CatalogFormat::from_path(Path::new("ECO_cat_0.hdf5")).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(ref s) if s == ".hdf5"));
        assert!(CatalogFormat::from_path(Path::new("catalog")).is_err());
    }

    #[test]
    fn test_missing_catalog() {
        let err = read_survey_catalog("/definitely/not/here.csv").unwrap_err();
        assert!(matches!(err, Error::CatalogNotFound(_)));
    }

    #[test]
    fn test_read_survey_catalog_optional_columns() {
        let path = tmp_path("survey.csv");
        std::fs::write(
            &path,
            "name,grpcz,absrmag,logmstar,logmgas,radeg,dedeg,fc,groupmass_s\n\
             rs0001, 4000.0, -18.2, 9.8, 9.1, 130.5, 0.5, 1, 11.9\n\
             rs0002, 5000.0, -17.5, 9.2, 9.4, 131.0, -0.2, 0, 11.9\n",
        )
        .unwrap();
        let cat = read_survey_catalog(&path).unwrap();
        assert_eq!(cat.len(), 2);
        assert_eq!(cat[0].name, "rs0001");
        assert_eq!(cat[1].fc, 0);
        assert!(cat[0].logmh_s.is_nan());
        assert_eq!(cat[0].f_b, 0);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_read_halo_catalog() {
        let path = tmp_path("halos.csv");
        std::fs::write(
            &path,
            "halo_id,halo_hostid,halo_mvir,halo_macc\n1,1,1e12,1e12\n2,1,1e11,2e11\n",
        )
        .unwrap();
        let halos = read_halo_catalog(&path).unwrap();
        assert_eq!(halos.len(), 2);
        assert_eq!(halos[1].halo_hostid, 1);
        assert_eq!(halos[1].halo_macc, 2e11);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_read_mock_catalogs_by_name() {
        let dir = tmp_path("mocks");
        std::fs::create_dir_all(&dir).unwrap();
        let config = SurveyConfig::new(Survey::Eco, MassType::Smf);
        for i in 0..config.num_mocks {
            std::fs::write(
                dir.join(config.mock_file_name(i)),
                "cz,M_r,logmstar,mhi,cs_flag,M_group\n4000,-18,9.5,1e9,1,12.0\n",
            )
            .unwrap();
        }
        let mocks = read_mock_survey_catalogs(&dir, &config).unwrap();
        assert_eq!(mocks.len(), 8);
        assert_eq!(mocks[3][0].m_group, 12.0);

        std::fs::remove_file(dir.join(config.mock_file_name(7))).unwrap();
        assert!(matches!(
            read_mock_survey_catalogs(&dir, &config).unwrap_err(),
            Error::CatalogNotFound(_)
        ));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
