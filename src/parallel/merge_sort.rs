//! Merge sort as a binary tree of forked processes.
//!
//! Both halves of every span live in one shared region. A node forks a child for
//! the lower half, sorts the upper half itself, then waits for that exact child
//! before merging; waiting for any other process could merge against a half that
//! is still being sorted.

use super::{SharedRegion, fork_worker, join_worker};
use crate::error::ParallelError;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Default span length at or below which a node sorts in place without forking.
pub const DEFAULT_THRESHOLD: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortOutcome {
    pub sorted: Vec<i32>,
    /// Processes forked across the whole tree.
    pub forks: usize,
}

/// Sort a copy of `input` with the fork-join tree.
pub fn fork_join_sort(input: &[i32], threshold: usize) -> Result<SortOutcome, ParallelError> {
    if threshold == 0 {
        return Err(ParallelError::InvalidThreshold);
    }

    let mut data = SharedRegion::<i32>::create(input.len())?;
    data.map_for_write().copy_from_slice(input);
    let forks = SharedRegion::<AtomicUsize>::create(1)?;

    sort_span(&data, &forks.as_slice()[0], 0, input.len(), threshold)?;

    let sorted = data.as_slice().to_vec();
    let forks_total = forks.as_slice()[0].load(Ordering::SeqCst);
    data.release()?;
    forks.release()?;

    tracing::debug!(len = sorted.len(), forks = forks_total, "fork-join sort finished");
    Ok(SortOutcome {
        sorted,
        forks: forks_total,
    })
}

fn sort_span(
    data: &SharedRegion<i32>,
    forks: &AtomicUsize,
    low: usize,
    high: usize,
    threshold: usize,
) -> Result<(), ParallelError> {
    if high - low <= threshold {
        // SAFETY: no other process has been given any part of [low, high).
        insertion_sort(unsafe { data.slice_mut(low..high) });
        return Ok(());
    }

    let mid = low + (high - low) / 2;
    let child = fork_worker(|| match sort_span(data, forks, low, mid, threshold) {
        Ok(()) => 0,
        Err(_) => 1,
    })?;
    forks.fetch_add(1, Ordering::SeqCst);

    let upper = sort_span(data, forks, mid, high, threshold);
    let joined = join_worker(child);
    upper?;
    joined?;

    // SAFETY: the child owning [low, mid) has been joined; [mid, high) was sorted
    // by this process and every grandchild below it has been joined as well.
    merge(unsafe { data.slice_mut(low..high) }, mid - low);
    Ok(())
}

/// Plain in-place insertion sort for the leaves of the tree.
fn insertion_sort(span: &mut [i32]) {
    for i in 1..span.len() {
        let value = span[i];
        let mut j = i;
        while j > 0 && span[j - 1] > value {
            span[j] = span[j - 1];
            j -= 1;
        }
        span[j] = value;
    }
}

/// Merge the sorted runs `span[..mid]` and `span[mid..]` through a buffer.
fn merge(span: &mut [i32], mid: usize) {
    let mut merged = Vec::with_capacity(span.len());
    let (mut i, mut j) = (0, mid);
    while i < mid && j < span.len() {
        if span[i] <= span[j] {
            merged.push(span[i]);
            i += 1;
        } else {
            merged.push(span[j]);
            j += 1;
        }
    }
    merged.extend_from_slice(&span[i..mid]);
    merged.extend_from_slice(&span[j..]);
    span.copy_from_slice(&merged);
}
