//! Parallel measurement of mock mass functions and central relations for a
//! set of parameter draws.
//!
//! Draws are dealt to workers in interleaved chunks (`draws[w::workers]`).
//! Every worker builds its own model, processes its chunk in order and sends
//! each result over a channel keyed by draw index. Seeds depend only on the
//! draw index, so results do not depend on the worker count.

use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam_channel::unbounded;
use serde::{Deserialize, Serialize};
use xmf_core::survey::{RELATION_BIN_WIDTH, SIM_VOLUME};
use xmf_core::{
    CentralPairs, Error, HaloPopulator, MassFunction, ParameterDraw, Result, SurveyConfig,
};

use crate::binned::{BinnedRelation, binned_mean};
use crate::centrals::centrals_from_mock;
use crate::mass_function::{MassScale, survey_mass_function};
use crate::populate::populate;

/// Worker pool options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnsembleOptions {
    /// Number of worker threads (and chunks).
    pub workers: usize,
    /// Base seed; draw `i` is populated with `seed + i`.
    pub seed: u64,
}

impl Default for EnsembleOptions {
    fn default() -> Self {
        Self { workers: 5, seed: 5 }
    }
}

/// Mock measurements for one parameter draw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// The draw.
    pub draw: ParameterDraw,
    /// Seed the mock was populated with.
    pub seed: u64,
    /// Galaxies above the completeness limit.
    pub n_galaxies: usize,
    /// Mass function in the simulation volume.
    pub mass_function: MassFunction,
    /// Centrals (log10 galaxy mass, log10 halo mass).
    #[serde(skip)]
    pub centrals: CentralPairs,
    /// Binned mean galaxy mass vs halo mass of the centrals.
    pub relation: BinnedRelation,
}

/// Populate `model` for `draw` and measure the mass function and central
/// relation.
pub fn measure<P: HaloPopulator + ?Sized>(
    model: &P,
    draw: &ParameterDraw,
    config: &SurveyConfig,
    seed: u64,
) -> Result<Measurement> {
    let galaxies = populate(model, &draw.params, config, seed)?;
    let masses: Vec<f64> = galaxies.iter().map(|g| g.stellar_mass).collect();
    let mass_function = survey_mass_function(&masses, MassScale::LinearH1, SIM_VOLUME, config)?;
    let centrals = centrals_from_mock(&galaxies);
    let relation = binned_mean(&centrals.halo_mass, &centrals.galaxy_mass, RELATION_BIN_WIDTH)?;
    Ok(Measurement { draw: *draw, seed, n_galaxies: galaxies.len(), mass_function, centrals, relation })
}

/// Measure the best-fit draw once.
pub fn best_fit_measurement<P: HaloPopulator + ?Sized>(
    model: &P,
    best_fit: &ParameterDraw,
    config: &SurveyConfig,
    seed: u64,
) -> Result<Measurement> {
    measure(model, best_fit, config, seed)
}

/// Per-bin range of a set of mass functions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Bin centers.
    pub bin_centers: Vec<f64>,
    /// Minimum finite `log_phi` per bin (NaN if none is finite).
    pub lower: Vec<f64>,
    /// Maximum finite `log_phi` per bin (NaN if none is finite).
    pub upper: Vec<f64>,
}

/// Measurements of all draws.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleResult {
    /// Worker count used.
    pub workers: usize,
    /// Measurements in draw order.
    pub measurements: Vec<Measurement>,
}

impl EnsembleResult {
    /// Number of measured draws.
    pub fn len(&self) -> usize {
        self.measurements.len()
    }

    /// `true` if no draw was measured.
    pub fn is_empty(&self) -> bool {
        self.measurements.is_empty()
    }

    /// Worker that measured draw `index`.
    pub fn worker_of(&self, index: usize) -> usize {
        index % self.workers.max(1)
    }

    /// Measurements grouped by worker, each group in processing order.
    pub fn by_worker(&self) -> Vec<Vec<&Measurement>> {
        (0..self.workers)
            .map(|w| self.measurements.iter().skip(w).step_by(self.workers).collect())
            .collect()
    }

    /// Central relations in draw order.
    pub fn relations(&self) -> Vec<&BinnedRelation> {
        self.measurements.iter().map(|m| &m.relation).collect()
    }

    /// Min/max `log_phi` per bin over all draws, ignoring non-finite values.
    pub fn mass_function_envelope(&self) -> Option<Envelope> {
        let first = self.measurements.first()?;
        let n = first.mass_function.n_bins();
        let mut lower = vec![f64::INFINITY; n];
        let mut upper = vec![f64::NEG_INFINITY; n];
        for m in &self.measurements {
            for (j, &v) in m.mass_function.log_phi.iter().enumerate().take(n) {
                if v.is_finite() {
                    lower[j] = lower[j].min(v);
                    upper[j] = upper[j].max(v);
                }
            }
        }
        for j in 0..n {
            if !lower[j].is_finite() {
                lower[j] = f64::NAN;
                upper[j] = f64::NAN;
            }
        }
        Some(Envelope { bin_centers: first.mass_function.bin_centers.clone(), lower, upper })
    }
}

struct Keyed {
    worker: usize,
    /// `None` if the worker failed to build its model.
    draw: Option<usize>,
    result: Result<Measurement>,
}

/// Measure every draw on a pool of `options.workers` threads.
///
/// `make_model(worker)` builds one model per worker. The first error aborts
/// the run: other workers stop before their next draw and the error is
/// returned.
pub fn run_ensemble<P, F>(
    make_model: F,
    draws: &[ParameterDraw],
    config: &SurveyConfig,
    options: EnsembleOptions,
) -> Result<EnsembleResult>
where
    P: HaloPopulator,
    F: Fn(usize) -> Result<P> + Sync,
{
    if options.workers == 0 {
        return Err(Error::Validation("ensemble needs at least one worker".into()));
    }
    let workers = options.workers;
    if draws.is_empty() {
        return Ok(EnsembleResult { workers, measurements: Vec::new() });
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .map_err(|e| Error::Computation(format!("failed to create thread pool: {e}")))?;

    let (tx, rx) = unbounded::<Keyed>();
    let abort = AtomicBool::new(false);

    pool.scope(|s| {
        for worker in 0..workers {
            let tx = tx.clone();
            let abort = &abort;
            let make_model = &make_model;
            s.spawn(move |_| {
                let model = match make_model(worker) {
                    Ok(m) => m,
                    Err(e) => {
                        abort.store(true, Ordering::Relaxed);
                        let _ = tx.send(Keyed { worker, draw: None, result: Err(e) });
                        return;
                    }
                };
                for idx in (worker..draws.len()).step_by(workers) {
                    if abort.load(Ordering::Relaxed) {
                        break;
                    }
                    let seed = options.seed.wrapping_add(idx as u64);
                    let result = measure(&model, &draws[idx], config, seed);
                    if result.is_err() {
                        abort.store(true, Ordering::Relaxed);
                    }
                    if tx.send(Keyed { worker, draw: Some(idx), result }).is_err() {
                        break;
                    }
                }
            });
        }
    });
    drop(tx);

    let mut slots: Vec<Option<Measurement>> = vec![None; draws.len()];
    let mut first_error: Option<Error> = None;
    for msg in rx.iter() {
        match (msg.draw, msg.result) {
            (Some(idx), Ok(m)) => slots[idx] = Some(m),
            (draw, Err(e)) => {
                log::warn!("ensemble worker {} failed on draw {:?}: {e}", msg.worker, draw);
                first_error.get_or_insert(e);
            }
            (None, Ok(_)) => {}
        }
    }
    if let Some(e) = first_error {
        return Err(e);
    }

    let measurements: Vec<Measurement> = slots.into_iter().flatten().collect();
    if measurements.len() != draws.len() {
        return Err(Error::Computation(format!(
            "ensemble returned {} of {} draws",
            measurements.len(),
            draws.len()
        )));
    }
    log::info!("ensemble: measured {} draws on {} workers", draws.len(), workers);
    Ok(EnsembleResult { workers, measurements })
}
