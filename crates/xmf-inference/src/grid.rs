//! Spatial grid over a survey footprint for jackknife resampling.
//!
//! The footprint is split into `n x n` cells, equally spaced in right
//! ascension and in `sin(dec)` (so cells have roughly equal solid angle).
//! Cells are half-open `[lo, hi)` except the last row and column, which are
//! closed so that galaxies on the maximum edge are kept.

use serde::{Deserialize, Serialize};
use xmf_core::{Error, Result};

/// Assignment of every galaxy to one grid cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatialGrid {
    /// Cells per axis.
    pub n_cells: usize,
    /// RA edges, degrees (`n_cells + 1`).
    pub ra_edges: Vec<f64>,
    /// `sin(dec)` edges, in the degree-scaled units of [`sin_dec_deg`].
    pub sin_dec_edges: Vec<f64>,
    /// Cell id of each galaxy (row-major: `dec_idx * n_cells + ra_idx`).
    pub cell_ids: Vec<usize>,
}

/// `sin(dec)` scaled by `180/pi`, as used for the declination edges.
#[inline]
pub fn sin_dec_deg(dec_deg: f64) -> f64 {
    dec_deg.to_radians().sin().to_degrees()
}

fn linspace(lo: f64, hi: f64, n: usize) -> Vec<f64> {
    let step = (hi - lo) / (n - 1) as f64;
    (0..n).map(|i| if i == n - 1 { hi } else { lo + step * i as f64 }).collect()
}

fn min_max(values: &[f64]) -> (f64, f64) {
    values.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
}

/// Index of the cell containing `v`, with the last cell closed above.
fn cell_index(v: f64, edges: &[f64]) -> usize {
    let n = edges.len() - 1;
    edges.partition_point(|&e| e <= v).saturating_sub(1).min(n - 1)
}

impl SpatialGrid {
    /// Grid `n_cells x n_cells` over the bounding box of the given positions.
    pub fn build(ra_deg: &[f64], dec_deg: &[f64], n_cells: usize) -> Result<Self> {
        if ra_deg.len() != dec_deg.len() {
            return Err(Error::DimensionMismatch {
                context: "grid RA vs Dec".to_string(),
                expected: ra_deg.len(),
                actual: dec_deg.len(),
            });
        }
        if ra_deg.is_empty() {
            return Err(Error::Validation("cannot build a grid over an empty catalog".into()));
        }
        if n_cells == 0 {
            return Err(Error::Validation("grid needs at least one cell per axis".into()));
        }
        if ra_deg.iter().chain(dec_deg).any(|v| !v.is_finite()) {
            return Err(Error::Validation("grid positions must be finite".into()));
        }

        let sin_dec: Vec<f64> = dec_deg.iter().map(|&d| sin_dec_deg(d)).collect();
        let (ra_lo, ra_hi) = min_max(ra_deg);
        let (sd_lo, sd_hi) = min_max(&sin_dec);
        let ra_edges = linspace(ra_lo, ra_hi, n_cells + 1);
        let sin_dec_edges = linspace(sd_lo, sd_hi, n_cells + 1);

        let cell_ids = ra_deg
            .iter()
            .zip(&sin_dec)
            .map(|(&ra, &sd)| cell_index(sd, &sin_dec_edges) * n_cells + cell_index(ra, &ra_edges))
            .collect();

        Ok(Self { n_cells, ra_edges, sin_dec_edges, cell_ids })
    }

    /// Number of galaxies assigned.
    pub fn len(&self) -> usize {
        self.cell_ids.len()
    }

    /// `true` if no galaxy is assigned.
    pub fn is_empty(&self) -> bool {
        self.cell_ids.is_empty()
    }

    /// Galaxies per cell (`n_cells^2` entries).
    pub fn occupancy(&self) -> Vec<usize> {
        let mut occ = vec![0; self.n_cells * self.n_cells];
        for &c in &self.cell_ids {
            occ[c] += 1;
        }
        occ
    }

    /// Ids of the cells holding at least one galaxy, ascending.
    pub fn nonempty_cells(&self) -> Vec<usize> {
        self.occupancy().iter().enumerate().filter(|(_, n)| **n > 0).map(|(c, _)| c).collect()
    }

    /// Indices of the galaxies outside `cell`.
    pub fn indices_excluding(&self, cell: usize) -> Vec<usize> {
        self.cell_ids.iter().enumerate().filter(|(_, c)| **c != cell).map(|(i, _)| i).collect()
    }
}
