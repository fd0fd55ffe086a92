//! Process creation for external commands and two-stage pipelines.
//!
//! Every child is created with `fork` and replaces its image with `execvp`, so the
//! program is looked up through `PATH` exactly as a POSIX shell does. All argument
//! conversion happens before forking; a child only rewires descriptors, execs, and
//! on failure writes a prepared message and leaves through `_exit`.

use crate::command::{EXEC_FAILURE, ExitCode};
use crate::error::LaunchError;
use nix::errno::Errno;
use nix::libc::{STDIN_FILENO, STDOUT_FILENO};
use nix::sys::wait::{WaitStatus, waitpid};
use nix::unistd::{ForkResult, Pid, close, dup2, execvp, fork, pipe};
use std::ffi::CString;
use std::os::fd::{AsRawFd, RawFd};

/// A spawned process and whether the shell waits for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Job {
    pub pid: Pid,
    pub background: bool,
}

/// What happened to a launched command by the time control returns to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Foreground child that has been joined.
    Completed(ExitCode),
    /// Background child left running; reclaimed later by the reaper.
    Detached(Job),
}

/// An argument vector ready for `execvp`.
struct Program {
    argv: Vec<CString>,
    not_found: Vec<u8>,
}

impl Program {
    fn new(argv: &[&str]) -> Result<Self, LaunchError> {
        let name = *argv.first().ok_or(LaunchError::EmptyCommand)?;
        let argv = argv
            .iter()
            .map(|arg| CString::new(*arg).map_err(|_| LaunchError::InvalidArgument(arg.to_string())))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            argv,
            not_found: format!("uinxsh: command not found: {}\n", name).into_bytes(),
        })
    }

    /// Replace the current process image. Only called in a freshly forked child.
    fn exec(&self) -> ! {
        let _ = execvp(&self.argv[0], &self.argv);
        child_fail(&self.not_found)
    }
}

fn child_fail(message: &[u8]) -> ! {
    let _ = nix::unistd::write(std::io::stderr(), message);
    // SAFETY: _exit skips the parent's destructors and atexit handlers.
    unsafe { nix::libc::_exit(EXEC_FAILURE) }
}

/// Fork a child that runs `rewire` and then execs `program`.
fn spawn(program: &Program, rewire: impl FnOnce() -> nix::Result<()>) -> Result<Pid, LaunchError> {
    // SAFETY: the child touches nothing but its own descriptors before exec or _exit.
    match unsafe { fork() }.map_err(LaunchError::Spawn)? {
        ForkResult::Child => {
            if let Err(e) = rewire() {
                child_fail(format!("uinxsh: cannot set up pipe: {}\n", e).as_bytes());
            }
            program.exec()
        }
        ForkResult::Parent { child } => {
            tracing::debug!(pid = child.as_raw(), program = ?program.argv[0], "spawned child");
            Ok(child)
        }
    }
}

/// Point `target` at `source`, then close both channel ends in this process.
fn redirect(source: RawFd, target: RawFd, ends: [RawFd; 2]) -> nix::Result<()> {
    dup2(source, target)?;
    for fd in ends {
        if fd != target {
            close(fd)?;
        }
    }
    Ok(())
}

/// Block until exactly `pid` terminates.
pub fn join(pid: Pid) -> Result<WaitStatus, LaunchError> {
    loop {
        match waitpid(pid, None) {
            Ok(status) => {
                tracing::debug!(pid = pid.as_raw(), ?status, "joined child");
                return Ok(status);
            }
            Err(Errno::EINTR) => continue,
            Err(e) => return Err(LaunchError::Wait(e)),
        }
    }
}

/// Shell-style exit code for a terminal wait status.
pub fn exit_code(status: WaitStatus) -> ExitCode {
    match status {
        WaitStatus::Exited(_, code) => code,
        WaitStatus::Signaled(_, signal, _) => 128 + signal as i32,
        _ => -1,
    }
}

/// Run one external command.
///
/// In the foreground the caller blocks until that specific child exits. In the
/// background the child's pid is returned at once and nothing else is recorded.
pub fn launch(argv: &[&str], background: bool) -> Result<Outcome, LaunchError> {
    let program = Program::new(argv)?;
    let pid = spawn(&program, || Ok(()))?;

    if background {
        return Ok(Outcome::Detached(Job {
            pid,
            background: true,
        }));
    }
    let status = join(pid)?;
    Ok(Outcome::Completed(exit_code(status)))
}

/// Run `left | right` and wait for both stages.
///
/// The parent closes both channel ends right after spawning, so the reader sees
/// end-of-stream as soon as the writer exits. Both children are joined no matter
/// how either of them ends.
pub fn launch_pipeline(left: &[&str], right: &[&str]) -> Result<(ExitCode, ExitCode), LaunchError> {
    let left = Program::new(left)?;
    let right = Program::new(right)?;

    let (read_end, write_end) = pipe().map_err(LaunchError::Pipe)?;
    let ends = [read_end.as_raw_fd(), write_end.as_raw_fd()];

    let writer = spawn(&left, || redirect(ends[1], STDOUT_FILENO, ends))?;
    let reader = spawn(&right, || redirect(ends[0], STDIN_FILENO, ends));

    drop(read_end);
    drop(write_end);

    let reader = match reader {
        Ok(pid) => pid,
        Err(e) => {
            join(writer)?;
            return Err(e);
        }
    };

    let writer_status = join(writer)?;
    let reader_status = join(reader)?;
    Ok((exit_code(writer_status), exit_code(reader_status)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::lock_process_state;
    use std::fs;
    use std::time::{Duration, Instant};

    #[test]
    fn foreground_reports_exit_status() {
        let _lock = lock_process_state();
        assert_eq!(launch(&["true"], false).unwrap(), Outcome::Completed(0));
        assert_eq!(launch(&["false"], false).unwrap(), Outcome::Completed(1));
        assert_eq!(
            launch(&["sh", "-c", "exit 3"], false).unwrap(),
            Outcome::Completed(3)
        );
    }

    #[test]
    fn unknown_program_exits_with_exec_failure() {
        let _lock = lock_process_state();
        let outcome = launch(&["definitely-not-a-real-command-uinxsh"], false).unwrap();
        assert_eq!(outcome, Outcome::Completed(EXEC_FAILURE));
    }

    #[test]
    fn killed_child_maps_to_signal_code() {
        let _lock = lock_process_state();
        let outcome = launch(&["sh", "-c", "kill -9 $$"], false).unwrap();
        assert_eq!(outcome, Outcome::Completed(128 + 9));
    }

    #[test]
    fn nul_bytes_are_rejected_before_forking() {
        let err = launch(&["echo", "a\0b"], false).unwrap_err();
        assert!(matches!(err, LaunchError::InvalidArgument(_)));
        assert!(matches!(launch(&[], false), Err(LaunchError::EmptyCommand)));
    }

    #[test]
    fn background_returns_without_waiting() {
        let _lock = lock_process_state();
        let started = Instant::now();
        let outcome = launch(&["sleep", "1"], true).unwrap();
        assert!(started.elapsed() < Duration::from_millis(900));

        let Outcome::Detached(job) = outcome else {
            panic!("expected a detached job, got {:?}", outcome);
        };
        assert!(job.background);
        // Clean up so the child does not outlive the test.
        assert_eq!(exit_code(join(job.pid).unwrap()), 0);
    }

    #[test]
    fn pipeline_feeds_left_output_to_right_input() {
        let _lock = lock_process_state();
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("count");
        let consumer = format!("wc -c > {}", out.display());

        let codes = launch_pipeline(&["printf", "hello"], &["sh", "-c", &consumer]).unwrap();

        assert_eq!(codes, (0, 0));
        assert_eq!(fs::read_to_string(&out).unwrap().trim(), "5");
    }

    #[test]
    fn pipeline_reader_sees_end_of_stream() {
        let _lock = lock_process_state();
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("copy");
        let consumer = format!("cat > {}", out.display());

        // cat only returns once every write end is closed.
        let codes = launch_pipeline(&["echo", "one", "two"], &["sh", "-c", &consumer]).unwrap();

        assert_eq!(codes, (0, 0));
        assert_eq!(fs::read_to_string(&out).unwrap(), "one two\n");
    }

    #[test]
    fn pipeline_with_missing_program_still_joins_both() {
        let _lock = lock_process_state();
        let codes = launch_pipeline(&["echo", "x"], &["no-such-reader-uinxsh"]).unwrap();
        assert_eq!(codes.1, EXEC_FAILURE);
    }
}
