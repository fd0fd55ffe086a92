use crate::history::History;
use crate::lexer::MAX_LINE;

/// Prompt printed before every line when none is configured.
pub const DEFAULT_PROMPT: &str = "uinxsh> ";

/// Settings fixed for the lifetime of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Text shown before each input line.
    pub prompt: String,
    /// Longest accepted input line in bytes; the rest is dropped.
    pub max_line: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            prompt: DEFAULT_PROMPT.to_string(),
            max_line: MAX_LINE,
        }
    }
}

/// Mutable, per-shell state threaded through each read-eval cycle.
///
/// The working directory is not stored here: it is process state owned by the OS
/// and only `cd` changes it. Each field below has a single writer:
/// - `history`: the interpreter, once per cycle.
/// - `should_exit`: the `exit` built-in.
#[derive(Debug, Clone)]
pub struct Session {
    pub config: Config,
    pub history: History,
    /// When set, the read-eval loop stops after the current cycle.
    pub should_exit: bool,
}

impl Session {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            history: History::new(),
            should_exit: false,
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(Config::default())
    }
}
