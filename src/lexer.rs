//! Tokenization of a single input line.
//!
//! The shell has no quoting, escaping or substitutions: a line is a run of words
//! separated by whitespace. A word that merely contains `|` or `&` (for example
//! `a|b`) is an ordinary word, only the standalone markers mean anything.

/// Default upper bound on the length of one input line, in bytes.
pub const MAX_LINE: usize = 80;

/// Cut `line` to at most `max` bytes and drop its line terminator.
///
/// The cut never splits a UTF-8 sequence; the rest of an overlong line is
/// discarded rather than carried into the next cycle.
pub fn truncate_line(line: &str, max: usize) -> &str {
    let line = line.trim_end_matches(['\n', '\r']);
    if line.len() <= max {
        return line;
    }
    let mut end = max;
    while !line.is_char_boundary(end) {
        end -= 1;
    }
    &line[..end]
}

/// Split a line into argument tokens.
///
/// Each token borrows from `line`. Leading and trailing whitespace and control
/// characters are stripped from every token, and tokens left empty by that are
/// dropped, so a blank line produces an empty vector.
pub fn tokenize(line: &str) -> Vec<&str> {
    line.split_whitespace()
        .map(|word| word.trim_matches(|c: char| c.is_whitespace() || c.is_control()))
        .filter(|word| !word.is_empty())
        .collect()
}
