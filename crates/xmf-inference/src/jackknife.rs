//! Spatial jackknife errors for survey measurements.
//!
//! Each non-empty grid cell defines one fold: the cell is removed and the mass
//! function and central relation are re-measured on the rest of the sample.
//! Fold measurements are stacked into jackknife covariance matrices.

use nalgebra::DMatrix;
use rayon::prelude::*;
use xmf_core::survey::RELATION_BIN_WIDTH;
use xmf_core::{Error, MassFunction, Result, SurveyConfig, SurveyGalaxy};

use crate::binned::{BinnedRelation, align_relations, binned_mean};
use crate::centrals::survey_central_pair;
use crate::grid::SpatialGrid;
use crate::mass_function::{MassScale, survey_mass_function};
use crate::selection::sample_masses;

/// Jackknife covariances of the mass function and central relation.
#[derive(Debug, Clone)]
pub struct JackknifeResult {
    /// Number of folds (non-empty cells).
    pub n_folds: usize,
    /// Cell removed in each fold.
    pub cells: Vec<usize>,
    /// Mass-function bin centers (h=1, log10).
    pub mf_bin_centers: Vec<f64>,
    /// Covariance of `log_phi` across folds.
    pub mf_covariance: DMatrix<f64>,
    /// Standard deviation of `log_phi` per bin.
    pub mf_stddev: Vec<f64>,
    /// Halo-mass bin centers shared by every fold relation.
    pub relation_centers: Vec<f64>,
    /// Covariance of the binned mean galaxy mass across folds.
    pub relation_covariance: DMatrix<f64>,
    /// Standard deviation of the binned mean galaxy mass per bin.
    pub relation_stddev: Vec<f64>,
    /// Halo-mass bin centers present in some folds but not all.
    pub dropped_relation_centers: Vec<f64>,
}

impl JackknifeResult {
    /// Correlation matrix of the mass function.
    pub fn mf_correlation(&self) -> DMatrix<f64> {
        correlation(&self.mf_covariance)
    }
}

/// Correlation matrix `C_ij / sqrt(C_ii C_jj)`.
pub fn correlation(cov: &DMatrix<f64>) -> DMatrix<f64> {
    let sd: Vec<f64> = cov.diagonal().iter().map(|v| v.sqrt()).collect();
    DMatrix::from_fn(cov.nrows(), cov.ncols(), |i, j| cov[(i, j)] / (sd[i] * sd[j]))
}

/// Jackknife covariance of `N` fold vectors: population covariance times
/// `N - 1`.
///
/// A column with any non-finite value makes its whole row and column NaN.
/// Returns the matrix and the indices of those columns.
pub fn jackknife_covariance(folds: &[Vec<f64>]) -> Result<(DMatrix<f64>, Vec<usize>)> {
    let n = folds.len();
    if n < 2 {
        return Err(Error::Validation(format!("jackknife needs at least 2 folds, got {n}")));
    }
    let p = folds[0].len();
    if let Some(bad) = folds.iter().find(|f| f.len() != p) {
        return Err(Error::DimensionMismatch {
            context: "jackknife fold vectors".to_string(),
            expected: p,
            actual: bad.len(),
        });
    }

    let x = DMatrix::from_fn(n, p, |i, j| folds[i][j]);
    let non_finite: Vec<usize> =
        (0..p).filter(|&j| x.column(j).iter().any(|v| !v.is_finite())).collect();

    let means: Vec<f64> = (0..p).map(|j| x.column(j).mean()).collect();
    let centered = DMatrix::from_fn(n, p, |i, j| x[(i, j)] - means[j]);
    let scale = (n - 1) as f64 / n as f64;
    let mut cov = (centered.transpose() * &centered) * scale;

    for &j in &non_finite {
        cov.row_mut(j).fill(f64::NAN);
        cov.column_mut(j).fill(f64::NAN);
    }
    Ok((cov, non_finite))
}

fn stddev(cov: &DMatrix<f64>) -> Vec<f64> {
    cov.diagonal().iter().map(|v| v.sqrt()).collect()
}

/// One fold: mass function and central relation without `cell`.
fn measure_fold(
    cell: usize,
    grid: &SpatialGrid,
    masses: &[f64],
    pairs: &[Option<(f64, f64)>],
    config: &SurveyConfig,
) -> Result<(MassFunction, BinnedRelation)> {
    let keep = grid.indices_excluding(cell);
    let fold_masses: Vec<f64> = keep.iter().map(|&i| masses[i]).collect();
    let mf = survey_mass_function(&fold_masses, MassScale::LogH07, config.volume, config)?;

    let (gal, halo): (Vec<f64>, Vec<f64>) = keep.iter().filter_map(|&i| pairs[i]).unzip();
    let relation = binned_mean(&halo, &gal, RELATION_BIN_WIDTH)?;
    Ok((mf, relation))
}

/// Jackknife the selected survey `sample` over `grid`.
///
/// `grid` must have been built from the positions of `sample`, in order.
pub fn jackknife(
    sample: &[SurveyGalaxy],
    config: &SurveyConfig,
    grid: &SpatialGrid,
) -> Result<JackknifeResult> {
    if grid.len() != sample.len() {
        return Err(Error::DimensionMismatch {
            context: "grid assignments vs survey sample".to_string(),
            expected: sample.len(),
            actual: grid.len(),
        });
    }

    let masses = sample_masses(sample, config.mass_type);
    let pairs: Vec<Option<(f64, f64)>> =
        sample.iter().map(|g| survey_central_pair(g, config)).collect();
    let cells = grid.nonempty_cells();

    let folds: Vec<(MassFunction, BinnedRelation)> = cells
        .par_iter()
        .map(|&cell| measure_fold(cell, grid, &masses, &pairs, config))
        .collect::<Result<_>>()?;

    let mf_bin_centers = folds.first().map(|(mf, _)| mf.bin_centers.clone()).unwrap_or_default();
    let phi: Vec<Vec<f64>> = folds.iter().map(|(mf, _)| mf.log_phi.clone()).collect();
    let (mf_covariance, bad_mf) = jackknife_covariance(&phi)?;
    if !bad_mf.is_empty() {
        let centers: Vec<f64> = bad_mf.iter().map(|&j| mf_bin_centers[j]).collect();
        log::warn!(
            "{} {} jackknife: mass-function bins {:?} are empty in some folds; covariance is NaN there",
            config.survey.label(),
            config.mass_type,
            centers
        );
    }

    let relations: Vec<BinnedRelation> = folds.into_iter().map(|(_, r)| r).collect();
    let aligned = align_relations(&relations);
    let dropped_relation_centers: Vec<f64> =
        aligned.dropped.iter().map(|&k| (k as f64 + 0.5) * RELATION_BIN_WIDTH).collect();
    if !dropped_relation_centers.is_empty() {
        log::warn!(
            "{} {} jackknife: halo-mass bins {:?} missing from some folds were dropped",
            config.survey.label(),
            config.mass_type,
            dropped_relation_centers
        );
    }
    let (relation_covariance, _) = jackknife_covariance(&aligned.means)?;

    Ok(JackknifeResult {
        n_folds: cells.len(),
        cells,
        mf_stddev: stddev(&mf_covariance),
        mf_bin_centers,
        mf_covariance,
        relation_centers: aligned.centers,
        relation_stddev: stddev(&relation_covariance),
        relation_covariance,
        dropped_relation_centers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use xmf_core::{MassType, Survey};

    fn synthetic_sample(n: usize, seed: u64) -> Vec<SurveyGalaxy> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n)
            .map(|i| {
                let logmh = 11.0 + 3.0 * rng.random::<f64>();
                SurveyGalaxy {
                    name: format!("g{i}"),
                    grpcz: 5000.0,
                    absrmag: -19.0,
                    logmstar: 9.2 + 2.0 * rng.random::<f64>(),
                    logmgas: 9.0 + rng.random::<f64>(),
                    radeg: 130.0 + 100.0 * rng.random::<f64>(),
                    dedeg: -1.0 + 50.0 * rng.random::<f64>(),
                    fc: u8::from(i % 3 != 0),
                    groupmass_s: logmh,
                    logmh_s: logmh,
                    f_a: 1,
                    f_b: 1,
                }
            })
            .collect()
    }

    #[test]
    fn test_covariance_of_identical_folds_is_zero() {
        let folds = vec![vec![1.0, 2.0]; 5];
        let (cov, bad) = jackknife_covariance(&folds).unwrap();
        assert!(bad.is_empty());
        assert!(cov.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_covariance_scaling() {
        // Population variance of [0, 2] is 1; times N-1 = 1.
        let folds = vec![vec![0.0, 5.0], vec![2.0, 1.0]];
        let (cov, _) = jackknife_covariance(&folds).unwrap();
        assert_relative_eq!(cov[(0, 0)], 1.0, epsilon = 1e-12);
        assert_relative_eq!(cov[(1, 1)], 4.0, epsilon = 1e-12);
        assert_relative_eq!(cov[(0, 1)], -2.0, epsilon = 1e-12);

        // Four folds: population variance of [1, 2, 3, 4] = 1.25, times 3.
        let folds: Vec<Vec<f64>> = (1..=4).map(|v| vec![v as f64]).collect();
        let (cov, _) = jackknife_covariance(&folds).unwrap();
        assert_relative_eq!(cov[(0, 0)], 3.75, epsilon = 1e-12);
    }

    #[test]
    fn test_covariance_non_finite_column() {
        let folds = vec![vec![1.0, f64::NEG_INFINITY], vec![2.0, 0.5], vec![3.0, 0.7]];
        let (cov, bad) = jackknife_covariance(&folds).unwrap();
        assert_eq!(bad, vec![1]);
        assert!(cov[(0, 0)].is_finite());
        assert!(cov[(1, 1)].is_nan());
        assert!(cov[(0, 1)].is_nan());
        assert!(jackknife_covariance(&folds[..1]).is_err());
        assert!(jackknife_covariance(&[vec![1.0], vec![1.0, 2.0]]).is_err());
    }

    #[test]
    fn test_correlation_unit_diagonal() {
        let cov = DMatrix::from_row_slice(2, 2, &[4.0, 1.0, 1.0, 9.0]);
        let corr = correlation(&cov);
        assert_relative_eq!(corr[(0, 0)], 1.0, epsilon = 1e-12);
        assert_relative_eq!(corr[(0, 1)], 1.0 / 6.0, epsilon = 1e-12);
    }

    #[test]
    fn test_jackknife_folds_match_nonempty_cells() {
        let config = SurveyConfig::new(Survey::Eco, MassType::Smf);
        let sample = synthetic_sample(3000, 17);
        let ra: Vec<f64> = sample.iter().map(|g| g.radeg).collect();
        let dec: Vec<f64> = sample.iter().map(|g| g.dedeg).collect();
        let grid = SpatialGrid::build(&ra, &dec, 10).unwrap();

        let jk = jackknife(&sample, &config, &grid).unwrap();
        assert_eq!(jk.n_folds, grid.nonempty_cells().len());
        assert_eq!(jk.mf_covariance.nrows(), 6);
        assert_eq!(jk.mf_stddev.len(), 6);
        assert_eq!(jk.relation_covariance.nrows(), jk.relation_centers.len());
        assert_eq!(jk.relation_stddev.len(), jk.relation_centers.len());
        for (i, s) in jk.mf_stddev.iter().enumerate() {
            if s.is_finite() {
                assert_relative_eq!(s * s, jk.mf_covariance[(i, i)], max_relative = 1e-12);
            }
        }
        // Covariance is symmetric.
        let c = &jk.mf_covariance;
        for i in 0..6 {
            for j in 0..6 {
                if c[(i, j)].is_finite() {
                    assert_relative_eq!(c[(i, j)], c[(j, i)], max_relative = 1e-12);
                }
            }
        }
    }

    #[test]
    fn test_uniform_box_occupancy_and_variance() {
        let config = SurveyConfig::new(Survey::Eco, MassType::Smf);
        let mut rng = StdRng::seed_from_u64(42);
        let sample: Vec<SurveyGalaxy> = (0..100)
            .map(|i| SurveyGalaxy {
                name: format!("u{i}"),
                grpcz: 5000.0,
                absrmag: -19.0,
                // h=1 masses all land in the lowest ECO bin.
                logmstar: 9.2 + 0.1 * rng.random::<f64>(),
                logmgas: 9.0,
                radeg: 120.0 + 10.0 * rng.random::<f64>(),
                dedeg: -1.0 + 2.0 * rng.random::<f64>(),
                fc: 1,
                groupmass_s: 12.2,
                logmh_s: 12.2,
                f_a: 1,
                f_b: 1,
            })
            .collect();
        let ra: Vec<f64> = sample.iter().map(|g| g.radeg).collect();
        let dec: Vec<f64> = sample.iter().map(|g| g.dedeg).collect();
        let grid = SpatialGrid::build(&ra, &dec, 10).unwrap();

        let occupancy = grid.occupancy();
        assert_eq!(occupancy.iter().sum::<usize>(), 100);
        assert!(occupancy.iter().copied().max().unwrap() <= 10);
        assert!(grid.nonempty_cells().len() >= 50);

        let jk = jackknife(&sample, &config, &grid).unwrap();
        assert_eq!(jk.n_folds, grid.nonempty_cells().len());
        assert!(jk.mf_covariance[(0, 0)].is_finite());
        assert!(jk.mf_covariance[(0, 0)] > 0.0);
        assert!(jk.mf_stddev[0] > 0.0);
        // Empty upper bins have no finite variance.
        assert!(jk.mf_covariance[(5, 5)].is_nan());
        assert_eq!(jk.relation_centers.len(), 1);
        assert!(jk.dropped_relation_centers.is_empty());
    }

    #[test]
    fn test_grid_must_match_sample() {
        let config = SurveyConfig::new(Survey::Eco, MassType::Smf);
        let sample = synthetic_sample(50, 1);
        let grid = SpatialGrid::build(&[1.0, 2.0], &[1.0, 2.0], 10).unwrap();
        assert!(matches!(jackknife(&sample, &config, &grid), Err(Error::DimensionMismatch { .. })));
    }
}
