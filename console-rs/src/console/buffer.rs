//! Multi-line input accumulation.
//!
//! Script lines are collected until the text gathered so far is a complete
//! unit, as judged by the evaluator's completeness oracle, or until the user
//! submits a blank line.  The completed text is handed back and the buffer
//! starts over.

/// Whether a partial unit is pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferState {
    Empty,
    Accumulating,
}

/// Outcome of [`InputBuffer::submit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// The accumulated text is ready to evaluate; the buffer is now empty.
    Complete(String),
    /// More input is needed.
    Pending,
}

/// Text of a partially entered multi-line unit.
#[derive(Debug, Clone, Default)]
pub struct InputBuffer {
    text: String,
}

impl InputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> BufferState {
        if self.text.is_empty() {
            BufferState::Empty
        } else {
            BufferState::Accumulating
        }
    }

    /// The text accumulated so far.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Append `line` (preceded by a newline) and check for completion.
    ///
    /// A blank line always completes the unit; otherwise `is_complete` is
    /// asked about the whole buffer.
    pub fn submit(&mut self, line: &str, is_complete: impl FnOnce(&str) -> bool) -> Submission {
        self.text.push('\n');
        self.text.push_str(line);

        if line.trim().is_empty() || is_complete(&self.text) {
            Submission::Complete(self.take())
        } else {
            Submission::Pending
        }
    }

    /// Empty the buffer, returning what it held.
    pub fn take(&mut self) -> String {
        std::mem::take(&mut self.text)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_empty() {
        let buf = InputBuffer::new();
        assert_eq!(buf.state(), BufferState::Empty);
        assert_eq!(buf.as_str(), "");
    }

    #[test]
    fn first_line_gets_newline_prefix() {
        let mut buf = InputBuffer::new();
        assert_eq!(
            buf.submit("1 + 1", |_| true),
            Submission::Complete("\n1 + 1".to_owned())
        );
        assert_eq!(buf.state(), BufferState::Empty);
    }

    #[test]
    fn accumulates_until_complete() {
        let mut buf = InputBuffer::new();
        let mut seen = Vec::new();
        assert_eq!(
            buf.submit("1 +", |s| {
                seen.push(s.to_owned());
                false
            }),
            Submission::Pending
        );
        assert_eq!(buf.state(), BufferState::Accumulating);
        assert_eq!(
            buf.submit("1", |s| {
                seen.push(s.to_owned());
                true
            }),
            Submission::Complete("\n1 +\n1".to_owned())
        );
        assert_eq!(seen, vec!["\n1 +", "\n1 +\n1"]);
        assert_eq!(buf.state(), BufferState::Empty);
    }

    #[test]
    fn blank_line_forces_completion_without_oracle() {
        let mut buf = InputBuffer::new();
        buf.submit("(", |_| false);
        let out = buf.submit("   ", |_| panic!("oracle consulted on blank line"));
        assert_eq!(out, Submission::Complete("\n(\n   ".to_owned()));
    }

    #[test]
    fn take_discards_pending() {
        let mut buf = InputBuffer::new();
        buf.submit("[1,", |_| false);
        assert_eq!(buf.take(), "\n[1,");
        assert_eq!(buf.state(), BufferState::Empty);
    }
}
