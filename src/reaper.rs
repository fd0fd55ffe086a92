use nix::errno::Errno;
use nix::sys::wait::{WaitPidFlag, WaitStatus, waitpid};
use nix::unistd::Pid;

/// Reclaim every child of this process that has already terminated.
///
/// Never blocks: the loop stops as soon as no exited child is left, either
/// because the remaining ones are still running or because there are none at
/// all. Statuses are discarded; the return value only counts reclaimed children.
pub fn reap() -> usize {
    let mut reclaimed = 0;
    loop {
        match waitpid(Pid::from_raw(-1), Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::StillAlive) => break,
            Ok(status) => {
                tracing::debug!(pid = ?status.pid(), ?status, "reaped background child");
                reclaimed += 1;
            }
            Err(Errno::EINTR) => continue,
            Err(Errno::ECHILD) => break,
            Err(e) => {
                tracing::warn!(error = %e, "waitpid failed while reaping");
                break;
            }
        }
    }
    reclaimed
}
