//! Bounded diagnostic log — the "logged" half of error paths that are not
//! fatal to the host.

use std::collections::VecDeque;

/// One recoverable error condition, recorded for the host to inspect.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    Stall {
        path: Option<String>,
        visit_count: u32,
        turn_index: u32,
    },
    UnknownTargetChat {
        attempted: Option<String>,
    },
    StoryError {
        message: String,
    },
    InvalidChoiceIndex {
        index: usize,
    },
    ChoiceChatMismatch {
        index: usize,
    },
    UnresolvedQuoteRef {
        label: String,
    },
    DataRequestFailed {
        source: String,
    },
}

/// A ring buffer the host can drain without the core needing a specific
/// log sink, mirroring `StateMachine::history`'s bounded `Vec` pattern.
#[derive(Debug, Clone)]
pub struct DiagnosticLog {
    entries: VecDeque<Diagnostic>,
    max_entries: usize,
}

impl Default for DiagnosticLog {
    fn default() -> Self {
        DiagnosticLog {
            entries: VecDeque::new(),
            max_entries: 100,
        }
    }
}

impl DiagnosticLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        tracing::warn!(?diagnostic, "conversation runtime diagnostic");
        if self.entries.len() >= self.max_entries {
            self.entries.pop_front();
        }
        self.entries.push_back(diagnostic);
    }

    pub fn entries(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }
}

/// Evaluate whether the story is stalled.
///
/// Non-fatal; callers push the result into a `DiagnosticLog` rather than
/// treating it as an error.
pub fn detect_stall(
    path: Option<String>,
    visit_count: u32,
    turn_index: u32,
    is_ending_path: bool,
    visit_threshold: u32,
    turn_threshold: u32,
) -> Option<Diagnostic> {
    if visit_count > visit_threshold || (turn_index > turn_threshold && !is_ending_path) {
        Some(Diagnostic::Stall {
            path,
            visit_count,
            turn_index,
        })
    } else {
        None
    }
}

/// `"unknown"` target chats get one forensic diagnostic per unique id,
/// logged once and not repeated — callers dedupe against
/// `ConversationContext::notified_unknown_chats` before calling this.
pub fn unknown_target_chat(attempted: Option<String>) -> Diagnostic {
    Diagnostic::UnknownTargetChat { attempted }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn high_visit_count_stalls() {
        assert!(detect_stall(None, 11, 0, false, 10, 100).is_some());
        assert!(detect_stall(None, 10, 0, false, 10, 100).is_none());
    }

    #[test]
    fn ending_path_never_stalls_on_turn_count_alone() {
        assert!(detect_stall(None, 0, 200, true, 10, 100).is_none());
        assert!(detect_stall(None, 0, 200, false, 10, 100).is_some());
    }

    #[test]
    fn log_is_bounded() {
        let mut log = DiagnosticLog::new();
        for i in 0..150 {
            log.push(Diagnostic::InvalidChoiceIndex { index: i });
        }
        assert_eq!(log.entries().count(), 100);
    }
}
