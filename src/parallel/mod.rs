//! Fork-join parallel computations.
//!
//! Every unit of parallelism is a separate process created with `fork`. Results
//! flow back only through a [`SharedRegion`], and `waitpid` on a known pid is the
//! only synchronization: nothing reads a region before the workers writing to it
//! have been joined.

pub mod merge_sort;
pub mod monte_carlo;
pub mod shared;

pub use shared::SharedRegion;

use crate::error::{LaunchError, ParallelError};
use crate::launcher;
use nix::sys::wait::WaitStatus;
use nix::unistd::{ForkResult, Pid, fork};
use std::panic::{self, AssertUnwindSafe};
use std::time::{SystemTime, UNIX_EPOCH};

/// Where a worker's random sequence starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Seed {
    /// Wall-clock nanoseconds at the moment the worker starts.
    Clock,
    /// A caller-chosen base value.
    Fixed(u64),
}

impl Seed {
    /// Seed for the worker running as `pid`.
    ///
    /// The pid is always mixed in so that workers started in the same instant,
    /// or from the same fixed base, draw different sequences.
    pub fn for_worker(self, pid: Pid) -> u64 {
        let base = match self {
            Seed::Clock => SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or_default(),
            Seed::Fixed(seed) => seed,
        };
        base ^ (pid.as_raw() as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
    }
}

/// Fork a worker that runs `work` and exits with the code it returns.
///
/// The worker never returns into the caller's stack: a panic becomes exit
/// status 101 and the process always leaves through `_exit`.
pub(crate) fn fork_worker(work: impl FnOnce() -> i32) -> Result<Pid, ParallelError> {
    // SAFETY: the worker only computes, writes to shared regions and forks its
    // own children before calling _exit.
    match unsafe { fork() }.map_err(LaunchError::Spawn)? {
        ForkResult::Child => {
            let code = panic::catch_unwind(AssertUnwindSafe(work)).unwrap_or(101);
            // SAFETY: the worker owns no state that must be dropped in this process.
            unsafe { nix::libc::_exit(code) }
        }
        ForkResult::Parent { child } => Ok(child),
    }
}

/// Join exactly `pid` and require that it exited with status 0.
pub(crate) fn join_worker(pid: Pid) -> Result<(), ParallelError> {
    match launcher::join(pid)? {
        WaitStatus::Exited(_, 0) => Ok(()),
        status => {
            tracing::warn!(pid = pid.as_raw(), ?status, "worker failed");
            Err(ParallelError::WorkerFailed {
                pid: pid.as_raw(),
                status: format!("{:?}", status),
            })
        }
    }
}
