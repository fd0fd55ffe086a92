/// The two-character token that re-runs the previous line.
pub const RECALL_TOKEN: &str = "!!";

/// Outcome of checking a line for the recall token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recall<'a> {
    /// The line is an ordinary command.
    NotRequested,
    /// `!!` was entered but nothing has been recorded yet.
    Empty,
    /// `!!` was entered; this is the line to run instead.
    Line(&'a str),
}

/// A single-slot history holding the most recent non-empty command line.
///
/// Recording overwrites the slot. The recall token itself is never recorded, so
/// repeated recalls keep re-running the same line.
#[derive(Debug, Default, Clone)]
pub struct History {
    last: Option<String>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `line` against the stored entry.
    pub fn recall(&self, line: &str) -> Recall<'_> {
        if line.trim() != RECALL_TOKEN {
            return Recall::NotRequested;
        }
        match &self.last {
            Some(last) => Recall::Line(last),
            None => Recall::Empty,
        }
    }

    /// Store `line` as the last command.
    ///
    /// Blank lines and the recall token are ignored.
    pub fn record(&mut self, line: &str) {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed == RECALL_TOKEN {
            return;
        }
        match &mut self.last {
            Some(last) => {
                last.clear();
                last.push_str(line);
            }
            None => self.last = Some(line.to_string()),
        }
    }

    /// The stored line, if any.
    pub fn last(&self) -> Option<&str> {
        self.last.as_deref()
    }
}
