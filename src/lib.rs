//! A small interactive Unix shell built directly on `fork`/`exec`.
//!
//! The crate reads one line per cycle, resolves it to a built-in or an external
//! program and runs it in the foreground, in the background or as a two-stage
//! pipeline. Two parallel demonstrations, a Monte Carlo estimator of pi and a
//! fork-join merge sort, reuse the same process substrate and communicate only
//! through an explicit shared-memory region.
//!
//! The main entry point is [`Interpreter`]. The public modules expose the pieces
//! it is assembled from so they can be driven and tested on their own.

pub mod builtin;
pub mod command;
pub mod error;
pub mod history;
mod interpreter;
pub mod launcher;
pub mod lexer;
pub mod parallel;
pub mod parser;
pub mod reaper;
pub mod session;

#[cfg(test)]
pub(crate) mod test_support;

/// Re-export of the read-eval loop driver.
///
/// See [`Interpreter`] for the high-level API.
pub use interpreter::Interpreter;
pub use session::{Config, Session};
