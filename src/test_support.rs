use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

/// Serializes tests that change the working directory, fork, or reap children.
///
/// The reaper waits for any child of the process, so a test that forks must not
/// run while another one reaps.
pub(crate) fn lock_process_state() -> MutexGuard<'static, ()> {
    static MUTEX: OnceLock<Mutex<()>> = OnceLock::new();
    MUTEX
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
}
