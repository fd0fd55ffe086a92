use crate::command::ExitCode;
use crate::parallel::Seed;
use crate::parallel::merge_sort::{self, DEFAULT_THRESHOLD};
use crate::parallel::monte_carlo;
use crate::session::Session;
use anyhow::{Context, Result, anyhow};
use argh::{EarlyExit, FromArgs};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::env;
use std::io::Write;

/// Built-in commands known to the shell at compile time.
///
/// Builtins are parsed using the [`argh`] crate (`FromArgs`) and executed directly
/// in-process; the dispatcher never forks to run one.
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Canonical name of the command, e.g. "pwd" or "cd".
    fn name() -> &'static str;

    /// One-line description shown by `help`.
    fn summary() -> &'static str;

    /// Executes the command, writing user-visible output to `stdout`.
    ///
    /// Return value should follow shell conventions: 0 for success, non-zero for error.
    fn execute(self, stdout: &mut dyn Write, session: &mut Session) -> Result<ExitCode>;
}

/// Argument parsing stopped early, either for `--help` or for bad arguments.
#[derive(Debug)]
pub struct Usage {
    pub output: String,
    pub is_error: bool,
}

/// A resolved built-in invocation with its arguments already parsed.
#[derive(Debug)]
pub enum Builtin {
    Exit(Exit),
    Pwd(Pwd),
    Cd(Cd),
    Help(Help),
    Clear(Clear),
    Sort(ParallelSort),
    Pi(MonteCarloPi),
    Usage(Usage),
}

fn parse_as<T: BuiltinCommand>(args: &[&str], wrap: fn(T) -> Builtin) -> Builtin {
    match T::from_args(&[T::name()], args) {
        Ok(cmd) => wrap(cmd),
        Err(EarlyExit { output, status }) => Builtin::Usage(Usage {
            output,
            is_error: status.is_err(),
        }),
    }
}

impl Builtin {
    /// Recognize `name` as a built-in and parse `args` for it.
    ///
    /// Returns `None` for names that should be looked up as external programs.
    pub fn parse(name: &str, args: &[&str]) -> Option<Builtin> {
        let builtin = if name == Exit::name() {
            parse_as(args, Builtin::Exit)
        } else if name == Pwd::name() {
            parse_as(args, Builtin::Pwd)
        } else if name == Cd::name() {
            parse_as(args, Builtin::Cd)
        } else if name == Help::name() {
            parse_as(args, Builtin::Help)
        } else if name == Clear::name() {
            parse_as(args, Builtin::Clear)
        } else if name == ParallelSort::name() {
            parse_as(args, Builtin::Sort)
        } else if name == MonteCarloPi::name() {
            parse_as(args, Builtin::Pi)
        } else {
            return None;
        };
        Some(builtin)
    }

    /// Run the built-in in the current process.
    pub fn run(self, stdout: &mut dyn Write, session: &mut Session) -> Result<ExitCode> {
        match self {
            Builtin::Exit(cmd) => cmd.execute(stdout, session),
            Builtin::Pwd(cmd) => cmd.execute(stdout, session),
            Builtin::Cd(cmd) => cmd.execute(stdout, session),
            Builtin::Help(cmd) => cmd.execute(stdout, session),
            Builtin::Clear(cmd) => cmd.execute(stdout, session),
            Builtin::Sort(cmd) => cmd.execute(stdout, session),
            Builtin::Pi(cmd) => cmd.execute(stdout, session),
            Builtin::Usage(Usage { output, is_error }) => {
                writeln!(stdout, "{}", output.trim_end())?;
                Ok(if is_error { 1 } else { 0 })
            }
        }
    }
}

#[derive(FromArgs, Debug)]
/// Leave the shell.
pub struct Exit {}

impl BuiltinCommand for Exit {
    fn name() -> &'static str {
        "exit"
    }

    fn summary() -> &'static str {
        "exit the shell"
    }

    fn execute(self, _stdout: &mut dyn Write, session: &mut Session) -> Result<ExitCode> {
        session.should_exit = true;
        Ok(0)
    }
}

#[derive(FromArgs, Debug)]
/// Print the current working directory to standard output.
pub struct Pwd {}

impl BuiltinCommand for Pwd {
    fn name() -> &'static str {
        "pwd"
    }

    fn summary() -> &'static str {
        "print the current working directory"
    }

    fn execute(self, stdout: &mut dyn Write, _session: &mut Session) -> Result<ExitCode> {
        let cwd = env::current_dir().context("pwd")?;
        writeln!(stdout, "{}", cwd.display())?;
        Ok(0)
    }
}

#[derive(FromArgs, Debug)]
/// Change the current working directory.
pub struct Cd {
    #[argh(positional)]
    /// directory to switch to; absolute or relative to the current directory.
    pub target: Option<String>,
}

impl BuiltinCommand for Cd {
    fn name() -> &'static str {
        "cd"
    }

    fn summary() -> &'static str {
        "cd <dir>: change the working directory"
    }

    fn execute(self, _stdout: &mut dyn Write, _session: &mut Session) -> Result<ExitCode> {
        let target = match self.target {
            Some(t) if !t.is_empty() => t,
            _ => return Err(anyhow!("expected argument to \"cd\"")),
        };
        env::set_current_dir(&target).map_err(|e| anyhow!("cd: {}: {}", target, e))?;
        tracing::debug!(dir = %target, "changed directory");
        Ok(0)
    }
}

#[derive(FromArgs, Debug)]
/// Describe the built-in commands.
pub struct Help {}

impl BuiltinCommand for Help {
    fn name() -> &'static str {
        "help"
    }

    fn summary() -> &'static str {
        "show this summary"
    }

    fn execute(self, stdout: &mut dyn Write, _session: &mut Session) -> Result<ExitCode> {
        writeln!(stdout, "Built-in commands:")?;
        let entries = [
            (Exit::name(), Exit::summary()),
            (Pwd::name(), Pwd::summary()),
            (Cd::name(), Cd::summary()),
            (Help::name(), Help::summary()),
            (Clear::name(), Clear::summary()),
            (crate::history::RECALL_TOKEN, "re-run the last command"),
            (ParallelSort::name(), ParallelSort::summary()),
            (MonteCarloPi::name(), MonteCarloPi::summary()),
        ];
        for (name, summary) in entries {
            writeln!(stdout, "  {:<7} {}", name, summary)?;
        }
        writeln!(stdout)?;
        writeln!(stdout, "Other commands are run from PATH.")?;
        writeln!(stdout, "  cmd &        run in the background")?;
        writeln!(stdout, "  cmd1 | cmd2  connect two commands with a pipe")?;
        Ok(0)
    }
}

/// Cursor home followed by erase-display.
const CLEAR_SEQUENCE: &str = "\x1b[H\x1b[2J";

#[derive(FromArgs, Debug)]
/// Clear the terminal screen.
pub struct Clear {}

impl BuiltinCommand for Clear {
    fn name() -> &'static str {
        "clear"
    }

    fn summary() -> &'static str {
        "clear the screen"
    }

    fn execute(self, stdout: &mut dyn Write, _session: &mut Session) -> Result<ExitCode> {
        write!(stdout, "{}", CLEAR_SEQUENCE)?;
        stdout.flush()?;
        Ok(0)
    }
}

/// Largest array `psort` will generate.
pub const MAX_SORT_SIZE: usize = 4096;

#[derive(FromArgs, Debug)]
/// Sort a generated array with a fork-join merge sort.
pub struct ParallelSort {
    #[argh(option, default = "64")]
    /// number of integers to generate
    pub size: usize,

    #[argh(option, default = "DEFAULT_THRESHOLD")]
    /// spans at or below this length are sorted without forking
    pub threshold: usize,

    #[argh(option)]
    /// seed for the generated input; random when omitted
    pub seed: Option<u64>,
}

impl BuiltinCommand for ParallelSort {
    fn name() -> &'static str {
        "psort"
    }

    fn summary() -> &'static str {
        "fork-join merge sort demo"
    }

    fn execute(self, stdout: &mut dyn Write, _session: &mut Session) -> Result<ExitCode> {
        if self.size > MAX_SORT_SIZE {
            return Err(anyhow!(
                "psort: --size must be at most {}, got {}",
                MAX_SORT_SIZE,
                self.size
            ));
        }
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let input: Vec<i32> = (0..self.size).map(|_| rng.gen_range(0..1000)).collect();
        writeln!(stdout, "Input:  {:?}", input)?;

        let outcome = merge_sort::fork_join_sort(&input, self.threshold)?;
        writeln!(stdout, "Sorted: {:?}", outcome.sorted)?;
        writeln!(stdout, "Processes forked: {}", outcome.forks)?;
        Ok(0)
    }
}

#[derive(FromArgs, Debug)]
/// Estimate pi by Monte Carlo sampling across worker processes.
pub struct MonteCarloPi {
    #[argh(positional)]
    /// number of worker processes
    pub workers: u64,

    #[argh(positional)]
    /// total number of samples to draw
    pub samples: u64,

    #[argh(option)]
    /// base seed mixed with each worker's pid; clock based when omitted
    pub seed: Option<u64>,
}

impl BuiltinCommand for MonteCarloPi {
    fn name() -> &'static str {
        "mcpi"
    }

    fn summary() -> &'static str {
        "mcpi <processes> <samples>: Monte Carlo estimate of pi"
    }

    fn execute(self, stdout: &mut dyn Write, _session: &mut Session) -> Result<ExitCode> {
        let seed = self.seed.map_or(Seed::Clock, Seed::Fixed);
        let estimate = monte_carlo::estimate_pi(self.workers, self.samples, seed)?;
        writeln!(stdout, "Estimated value of pi: {:.6}", estimate.estimate)?;
        writeln!(
            stdout,
            "({} samples over {} processes, {} inside the circle)",
            estimate.samples_drawn, estimate.workers, estimate.hits
        )?;
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Config;
    use crate::test_support::lock_process_state;
    use std::env as stdenv;
    use std::fs;

    fn session() -> Session {
        Session::new(Config::default())
    }

    #[test]
    fn test_pwd_prints_current_dir() {
        let _lock = lock_process_state();
        let cur = stdenv::current_dir().unwrap();

        let mut out = Vec::new();
        let res = Pwd {}.execute(&mut out, &mut session());

        assert!(res.is_ok());
        let s = String::from_utf8(out).unwrap();
        assert_eq!(s, format!("{}\n", cur.display()));
    }

    #[test]
    fn test_cd_to_absolute_path() {
        let _lock = lock_process_state();
        let temp = tempfile::tempdir().expect("failed to create temp dir");
        let canonical_temp = fs::canonicalize(temp.path()).expect("canonicalize failed");
        let orig = stdenv::current_dir().unwrap();

        let cmd = Cd {
            target: Some(canonical_temp.to_string_lossy().to_string()),
        };
        let res = cmd.execute(&mut Vec::new(), &mut session());

        let new_cwd = fs::canonicalize(stdenv::current_dir().unwrap()).unwrap();
        stdenv::set_current_dir(orig).expect("failed to restore cwd");

        assert!(res.is_ok());
        assert_eq!(new_cwd, canonical_temp);
    }

    #[test]
    fn test_cd_nonexistent_path_errors() {
        let _lock = lock_process_state();
        let orig = stdenv::current_dir().unwrap();

        let name = format!("nonexistent_dir_for_uinxsh_test_{}", std::process::id());
        let cmd = Cd { target: Some(name) };
        let res = cmd.execute(&mut Vec::new(), &mut session());

        assert!(res.is_err());
        assert!(res.unwrap_err().to_string().starts_with("cd: nonexistent_dir"));
        assert_eq!(stdenv::current_dir().unwrap(), orig);
    }

    #[test]
    fn test_cd_without_target_is_advisory() {
        let _lock = lock_process_state();
        let orig = stdenv::current_dir().unwrap();

        let res = Cd { target: None }.execute(&mut Vec::new(), &mut session());

        assert_eq!(
            res.unwrap_err().to_string(),
            "expected argument to \"cd\""
        );
        assert_eq!(stdenv::current_dir().unwrap(), orig);
    }

    #[test]
    fn test_exit_sets_flag() {
        let mut session = session();
        let code = Exit {}.execute(&mut Vec::new(), &mut session).unwrap();
        assert_eq!(code, 0);
        assert!(session.should_exit);
    }

    #[test]
    fn test_clear_emits_escape_sequence() {
        let mut out = Vec::new();
        Clear {}.execute(&mut out, &mut session()).unwrap();
        assert_eq!(out, CLEAR_SEQUENCE.as_bytes());
    }

    #[test]
    fn test_help_lists_every_builtin() {
        let mut out = Vec::new();
        Help {}.execute(&mut out, &mut session()).unwrap();
        let s = String::from_utf8(out).unwrap();
        for name in ["exit", "pwd", "cd", "help", "clear", "!!", "psort", "mcpi"] {
            assert!(s.contains(name), "help output is missing {name}");
        }
    }

    #[test]
    fn test_parse_recognizes_only_builtin_names() {
        assert!(matches!(Builtin::parse("pwd", &[]), Some(Builtin::Pwd(_))));
        assert!(matches!(
            Builtin::parse("mcpi", &["4", "1000"]),
            Some(Builtin::Pi(MonteCarloPi {
                workers: 4,
                samples: 1000,
                seed: None
            }))
        ));
        assert!(Builtin::parse("ls", &["-l"]).is_none());
    }

    #[test]
    fn test_malformed_arguments_become_usage() {
        let parsed = Builtin::parse("mcpi", &["four", "1000"]).unwrap();
        match parsed {
            Builtin::Usage(usage) => assert!(usage.is_error),
            other => panic!("expected usage, got {:?}", other),
        }

        let parsed = Builtin::parse("exit", &["now"]).unwrap();
        assert!(matches!(parsed, Builtin::Usage(Usage { is_error: true, .. })));
    }

    #[test]
    fn test_help_flag_is_not_an_error() {
        let parsed = Builtin::parse("psort", &["--help"]).unwrap();
        let mut out = Vec::new();
        let code = parsed.run(&mut out, &mut session()).unwrap();
        assert_eq!(code, 0);
        assert!(String::from_utf8(out).unwrap().contains("--threshold"));
    }

    #[test]
    fn test_psort_prints_sorted_output() {
        let _lock = lock_process_state();
        let cmd = ParallelSort {
            size: 40,
            threshold: 8,
            seed: Some(7),
        };
        let mut out = Vec::new();
        assert_eq!(cmd.execute(&mut out, &mut session()).unwrap(), 0);

        let s = String::from_utf8(out).unwrap();
        let sorted_line = s.lines().find(|l| l.starts_with("Sorted:")).unwrap();
        let values: Vec<i32> = sorted_line
            .trim_start_matches("Sorted:")
            .trim()
            .trim_matches(['[', ']'])
            .split(", ")
            .map(|v| v.parse().unwrap())
            .collect();
        assert_eq!(values.len(), 40);
        assert!(values.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_psort_rejects_oversized_input() {
        let cmd = ParallelSort {
            size: usize::MAX,
            threshold: 8,
            seed: None,
        };
        let mut out = Vec::new();
        let err = cmd.execute(&mut out, &mut session()).unwrap_err();
        assert!(err.to_string().contains("--size"));
        assert!(out.is_empty());
    }

    #[test]
    fn test_mcpi_rejects_more_workers_than_samples() {
        let _lock = lock_process_state();
        let cmd = MonteCarloPi {
            workers: 10,
            samples: 5,
            seed: None,
        };
        assert!(cmd.execute(&mut Vec::new(), &mut session()).is_err());
    }
}
