//! Binned statistics of one array against another (mass relations).
//!
//! Halo-mass bins sit on a fixed lattice `[k*base, (k+1)*base)`, so relations
//! measured on different subsets of the same catalog can be aligned by the
//! integer lattice index `k` even when their data ranges differ.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use xmf_core::{Error, Result};

/// Mean of `y` in lattice bins of `x`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinnedRelation {
    /// Bin width.
    pub base: f64,
    /// Lattice index of each non-empty bin, ascending.
    pub lattice: Vec<i64>,
    /// Bin centers.
    pub centers: Vec<f64>,
    /// Mean of `y` per bin.
    pub mean: Vec<f64>,
    /// Population standard deviation of `y` per bin.
    pub std: Vec<f64>,
    /// Standard error of the mean per bin.
    pub std_err: Vec<f64>,
    /// Points per bin.
    pub counts: Vec<usize>,
}

impl BinnedRelation {
    /// Number of non-empty bins.
    pub fn len(&self) -> usize {
        self.lattice.len()
    }

    /// `true` if no bin has data.
    pub fn is_empty(&self) -> bool {
        self.lattice.is_empty()
    }

    /// Mean at lattice index `k`, if that bin is populated.
    pub fn mean_at(&self, k: i64) -> Option<f64> {
        self.lattice.binary_search(&k).ok().map(|i| self.mean[i])
    }
}

/// Lattice index of `x`.
#[inline]
pub fn lattice_index(x: f64, base: f64) -> i64 {
    (x / base).floor() as i64
}

/// Bin `y` by `x` on a `base`-wide lattice and summarise each non-empty bin.
///
/// Pairs with a non-finite coordinate are skipped.
pub fn binned_mean(x: &[f64], y: &[f64], base: f64) -> Result<BinnedRelation> {
    if x.len() != y.len() {
        return Err(Error::DimensionMismatch {
            context: "binned relation x vs y".to_string(),
            expected: x.len(),
            actual: y.len(),
        });
    }
    if !(base.is_finite() && base > 0.0) {
        return Err(Error::Validation(format!("bin width must be positive, got {base}")));
    }

    let mut bins: BTreeMap<i64, Vec<f64>> = BTreeMap::new();
    for (&xi, &yi) in x.iter().zip(y) {
        if xi.is_finite() && yi.is_finite() {
            bins.entry(lattice_index(xi, base)).or_default().push(yi);
        }
    }

    let mut out = BinnedRelation {
        base,
        lattice: Vec::with_capacity(bins.len()),
        centers: Vec::with_capacity(bins.len()),
        mean: Vec::with_capacity(bins.len()),
        std: Vec::with_capacity(bins.len()),
        std_err: Vec::with_capacity(bins.len()),
        counts: Vec::with_capacity(bins.len()),
    };
    for (k, values) in bins {
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
        let std = var.sqrt();
        out.lattice.push(k);
        out.centers.push((k as f64 + 0.5) * base);
        out.mean.push(mean);
        out.std.push(std);
        out.std_err.push(std / n.sqrt());
        out.counts.push(values.len());
    }
    Ok(out)
}

/// Relations re-expressed on the lattice bins populated in all of them.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedRelations {
    /// Shared lattice indices, ascending.
    pub lattice: Vec<i64>,
    /// Shared bin centers.
    pub centers: Vec<f64>,
    /// `means[i][j]`: relation `i` at shared bin `j`.
    pub means: Vec<Vec<f64>>,
    /// Lattice indices populated in some relations but not all.
    pub dropped: Vec<i64>,
}

/// Align relations on the bins every one of them populates.
///
/// Subsets of a catalog can leave a sparse edge bin empty, which makes their
/// relation vectors shorter than the others'. Comparing them position by
/// position would shift every later bin; aligning on the lattice keeps bins
/// matched and reports what could not be matched.
pub fn align_relations(relations: &[BinnedRelation]) -> AlignedRelations {
    let base = relations.first().map(|r| r.base).unwrap_or(f64::NAN);

    let mut all: BTreeSet<i64> = BTreeSet::new();
    for r in relations {
        all.extend(r.lattice.iter().copied());
    }
    let (lattice, dropped): (Vec<i64>, Vec<i64>) =
        all.into_iter().partition(|k| relations.iter().all(|r| r.mean_at(*k).is_some()));

    let means = relations
        .iter()
        .map(|r| lattice.iter().filter_map(|&k| r.mean_at(k)).collect())
        .collect();
    let centers = lattice.iter().map(|&k| (k as f64 + 0.5) * base).collect();

    AlignedRelations { lattice, centers, means, dropped }
}
