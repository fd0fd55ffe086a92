//! Classification of a tokenized line into a [`Command`].

use crate::builtin::Builtin;
use crate::command::{BACKGROUND_MARKER, Command, PIPE_MARKER};
use crate::error::ResolveError;

/// Resolve an argument vector into the command it denotes.
///
/// The checks run in a fixed order:
/// 1. no tokens is a no-op cycle;
/// 2. a built-in name in first position is dispatched as a built-in, whatever follows;
/// 3. a `|` splits the line into exactly two stages;
/// 4. otherwise a trailing `&` selects background execution.
///
/// Pipe detection wins over the background marker, and a pipeline with `&` closing
/// either stage is rejected: pipelines always run in the foreground.
pub fn resolve<'a>(tokens: &[&'a str]) -> Result<Command<'a>, ResolveError> {
    let Some((&name, args)) = tokens.split_first() else {
        return Ok(Command::Empty);
    };

    if let Some(builtin) = Builtin::parse(name, args) {
        return Ok(Command::Builtin(builtin));
    }

    if let Some(k) = tokens.iter().position(|&t| t == PIPE_MARKER) {
        return split_pipeline(tokens, k);
    }

    match tokens.split_last() {
        Some((&last, rest)) if last == BACKGROUND_MARKER => {
            if rest.is_empty() {
                return Err(ResolveError::EmptyCommand);
            }
            Ok(Command::External {
                argv: rest.to_vec(),
                background: true,
            })
        }
        _ => Ok(Command::External {
            argv: tokens.to_vec(),
            background: false,
        }),
    }
}

fn split_pipeline<'a>(tokens: &[&'a str], k: usize) -> Result<Command<'a>, ResolveError> {
    let left = &tokens[..k];
    let right = &tokens[k + 1..];

    if left.is_empty() {
        return Err(ResolveError::MissingPipeSource);
    }
    if right.is_empty() {
        return Err(ResolveError::MissingPipeTarget);
    }
    if right.contains(&PIPE_MARKER) {
        return Err(ResolveError::MultiStagePipeline);
    }
    if left.last() == Some(&BACKGROUND_MARKER) || right.last() == Some(&BACKGROUND_MARKER) {
        return Err(ResolveError::BackgroundPipeline);
    }

    Ok(Command::Pipeline {
        left: left.to_vec(),
        right: right.to_vec(),
    })
}
