use crate::builtin::Builtin;

/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
/// This mirrors the convention used by POSIX shells and many command-line tools.
pub type ExitCode = i32;

/// Exit status a child uses when its program image could not be replaced.
pub const EXEC_FAILURE: ExitCode = 127;

/// Token that separates the two stages of a pipeline.
pub const PIPE_MARKER: &str = "|";

/// Trailing token that requests background execution.
pub const BACKGROUND_MARKER: &str = "&";

/// A fully resolved input line.
///
/// Produced once by [`crate::parser::resolve`]; every later stage branches on this
/// closed set instead of comparing strings again. Argument slices borrow the input
/// line and live only as long as it does.
#[derive(Debug)]
pub enum Command<'a> {
    /// Nothing to do this cycle.
    Empty,
    /// An in-process command. Never forks for dispatch.
    Builtin(Builtin),
    /// A program looked up through `PATH`.
    External {
        argv: Vec<&'a str>,
        background: bool,
    },
    /// Two programs joined by a single pipe; always waited on in the foreground.
    Pipeline {
        left: Vec<&'a str>,
        right: Vec<&'a str>,
    },
}

impl Command<'_> {
    /// Whether the shell returns to the prompt without waiting for this command.
    pub fn is_background(&self) -> bool {
        matches!(
            self,
            Command::External {
                background: true,
                ..
            }
        )
    }
}
