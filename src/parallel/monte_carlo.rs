//! Monte Carlo estimate of pi spread over worker processes.

use super::{Seed, SharedRegion, fork_worker, join_worker};
use crate::error::ParallelError;
use nix::unistd::getpid;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicU64, Ordering};

/// Result of one estimation run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PiEstimate {
    /// `4 * hits / samples`, with `samples` as requested.
    pub estimate: f64,
    /// Points that fell inside the quarter circle.
    pub hits: u64,
    /// Points actually drawn: `workers * (samples / workers)`.
    pub samples_drawn: u64,
    pub workers: u64,
}

/// Count how many of `samples` uniform points in the unit square lie inside the
/// unit quarter circle.
pub fn sample_quarter_circle(samples: u64, seed: u64) -> u64 {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut hits = 0;
    for _ in 0..samples {
        let x: f64 = rng.gen_range(0.0..1.0);
        let y: f64 = rng.gen_range(0.0..1.0);
        if x * x + y * y <= 1.0 {
            hits += 1;
        }
    }
    hits
}

/// Estimate pi with `workers` processes drawing `samples` points in total.
///
/// Each worker draws `samples / workers` points, counts hits locally and adds its
/// count to a shared atomic counter exactly once. When `samples` is not a multiple
/// of `workers` the remainder is not drawn, but the estimate is still divided by
/// the requested `samples`.
pub fn estimate_pi(workers: u64, samples: u64, seed: Seed) -> Result<PiEstimate, ParallelError> {
    if samples == 0 {
        return Err(ParallelError::InvalidSamples);
    }
    if workers == 0 || workers > samples {
        return Err(ParallelError::InvalidWorkers { workers, samples });
    }
    let per_worker = samples / workers;

    let counter = SharedRegion::<AtomicU64>::create(1)?;
    let mut pids = Vec::new();
    let mut failure = None;

    for _ in 0..workers {
        let spawned = fork_worker(|| {
            let hits = sample_quarter_circle(per_worker, seed.for_worker(getpid()));
            counter.as_slice()[0].fetch_add(hits, Ordering::SeqCst);
            0
        });
        match spawned {
            Ok(pid) => pids.push(pid),
            Err(e) => {
                failure = Some(e);
                break;
            }
        }
    }
    tracing::debug!(workers = pids.len(), per_worker, "monte carlo workers started");

    // Every started worker is joined, even when a later fork failed.
    for pid in pids {
        if let Err(e) = join_worker(pid) {
            failure.get_or_insert(e);
        }
    }
    if let Some(e) = failure {
        return Err(e);
    }

    let hits = counter.as_slice()[0].load(Ordering::SeqCst);
    counter.release()?;

    Ok(PiEstimate {
        estimate: 4.0 * hits as f64 / samples as f64,
        hits,
        samples_drawn: per_worker * workers,
        workers,
    })
}
