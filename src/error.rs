//! Error types for uinxsh

use thiserror::Error;

/// Result type alias for shell operations
pub type ShellResult<T> = Result<T, ShellError>;

/// Problems found while classifying a tokenized line.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// `cmd |` with nothing after the marker
    #[error("syntax error: expected a command after '|'")]
    MissingPipeTarget,

    /// `| cmd` with nothing before the marker
    #[error("syntax error: expected a command before '|'")]
    MissingPipeSource,

    /// More than one `|` on a line
    #[error("only a single '|' is supported")]
    MultiStagePipeline,

    /// A pipeline that also ends in `&`
    #[error("pipelines cannot run in the background")]
    BackgroundPipeline,

    /// A line consisting of nothing but `&`
    #[error("syntax error: expected a command before '&'")]
    EmptyCommand,
}

/// Failures while creating processes or the channel between them.
#[derive(Error, Debug)]
pub enum LaunchError {
    /// Nothing to execute
    #[error("empty command")]
    EmptyCommand,

    /// An argument cannot be handed to `execvp`
    #[error("invalid argument {0:?}: contains a NUL byte")]
    InvalidArgument(String),

    /// `fork` failed
    #[error("fork failed: {0}")]
    Spawn(#[source] nix::Error),

    /// `pipe` failed
    #[error("pipe creation failed: {0}")]
    Pipe(#[source] nix::Error),

    /// `waitpid` on a known child failed
    #[error("wait failed: {0}")]
    Wait(#[source] nix::Error),
}

/// Failures of the parallel compute demonstrations.
#[derive(Error, Debug)]
pub enum ParallelError {
    /// Worker count outside `1..=samples`
    #[error("number of processes must be between 1 and the number of samples (got {workers} for {samples})")]
    InvalidWorkers { workers: u64, samples: u64 },

    /// Zero samples requested
    #[error("number of samples must be positive")]
    InvalidSamples,

    /// Base case size of zero
    #[error("sort threshold must be at least 1")]
    InvalidThreshold,

    /// The anonymous shared mapping could not be created
    #[error("shared memory allocation failed: {0}")]
    SharedMemory(#[source] nix::Error),

    /// A worker could not be forked or joined
    #[error(transparent)]
    Launch(#[from] LaunchError),

    /// A worker terminated without reporting success
    #[error("worker {pid} did not finish cleanly: {status}")]
    WorkerFailed { pid: i32, status: String },
}

/// Error types for one read-eval cycle
#[derive(Error, Debug)]
pub enum ShellError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Launch(#[from] LaunchError),

    #[error(transparent)]
    Parallel(#[from] ParallelError),

    /// A built-in reported failure
    #[error("{0}")]
    Builtin(String),

    /// IO error writing to the terminal
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<anyhow::Error> for ShellError {
    fn from(err: anyhow::Error) -> Self {
        ShellError::Builtin(format!("{err:#}"))
    }
}
