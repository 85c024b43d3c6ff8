//! Session domain entities

use crate::stream::classifier::{Classification, Classifier};
use crate::stream::phase::StreamPhase;
use crate::stream::snapshot::StreamSnapshot;
use serde::{Deserialize, Serialize};

/// Opaque handle of a streaming session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub u64);

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// One streaming request/response cycle (Entity)
///
/// Owns the append-only raw buffer and the latest [`Classification`] of it.
/// `thoughts` and `answer` are never stored separately; they are always
/// derived from the buffer through the classifier.
///
/// Once the session reaches `Done` or `Errored` it is frozen: further
/// fragments are ignored.
#[derive(Debug, Clone)]
pub struct Session {
    id: SessionId,
    buffer: String,
    classification: Classification,
    terminal: Option<StreamPhase>,
    error: Option<String>,
    fragments: usize,
}

impl Session {
    pub fn new(id: SessionId) -> Self {
        Self {
            id,
            buffer: String::new(),
            classification: Classification::pending(),
            terminal: None,
            error: None,
            fragments: 0,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Concatenation of every accepted fragment, in arrival order.
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn phase(&self) -> StreamPhase {
        self.terminal.unwrap_or(self.classification.phase())
    }

    pub fn thoughts(&self) -> &str {
        self.classification.thoughts_in(&self.buffer)
    }

    pub fn answer(&self) -> &str {
        self.classification.answer_in(&self.buffer)
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn fragment_count(&self) -> usize {
        self.fragments
    }

    pub fn classification(&self) -> &Classification {
        &self.classification
    }

    /// Append a fragment and reclassify the whole buffer.
    ///
    /// Returns `false` (and changes nothing) if the session already ended.
    pub fn push_fragment(&mut self, classifier: &Classifier, fragment: &str) -> bool {
        if self.terminal.is_some() {
            return false;
        }
        self.buffer.push_str(fragment);
        self.fragments += 1;
        self.classification = classifier.classify(&self.buffer, &self.classification);
        true
    }

    /// Mark the stream as completed normally.
    pub fn finish(&mut self) {
        if self.terminal.is_none() {
            self.terminal = Some(StreamPhase::Done);
        }
    }

    /// Mark the stream as failed. Thoughts and answer keep their last values.
    pub fn fail(&mut self, cause: impl Into<String>) {
        if self.terminal.is_none() {
            self.terminal = Some(StreamPhase::Errored);
            self.error = Some(cause.into());
        }
    }

    pub fn snapshot(&self) -> StreamSnapshot {
        StreamSnapshot {
            session: Some(self.id),
            phase: self.phase(),
            thoughts: self.thoughts().to_string(),
            answer: self.answer().to_string(),
            error: self.error.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(fragments: &[&str]) -> Session {
        let classifier = Classifier::default();
        let mut session = Session::new(SessionId(1));
        for fragment in fragments {
            assert!(session.push_fragment(&classifier, fragment));
        }
        session
    }

    #[test]
    fn test_new_session_is_connecting() {
        let session = Session::new(SessionId(7));
        assert_eq!(session.phase(), StreamPhase::Connecting);
        assert_eq!(session.buffer(), "");
        assert_eq!(session.snapshot(), StreamSnapshot::connecting(SessionId(7)));
    }

    #[test]
    fn test_buffer_is_concatenation_of_fragments() {
        let fragments = ["a", "", "bc", "<think>", "d"];
        let session = run(&fragments);
        assert_eq!(session.buffer(), fragments.concat());
        assert_eq!(session.fragment_count(), 5);
    }

    #[test]
    fn test_finish_freezes_output() {
        let classifier = Classifier::default();
        let mut session = run(&["<think>x</think>y"]);
        session.finish();
        assert_eq!(session.phase(), StreamPhase::Done);

        assert!(!session.push_fragment(&classifier, "more"));
        assert_eq!(session.answer(), "y");
        assert_eq!(session.buffer(), "<think>x</think>y");
    }

    #[test]
    fn test_finish_while_buffering() {
        let mut session = run(&["short"]);
        session.finish();
        let snapshot = session.snapshot();
        assert_eq!(snapshot.phase, StreamPhase::Done);
        assert_eq!(snapshot.answer, "");
    }

    #[test]
    fn test_fail_keeps_partial_output() {
        let mut session = run(&["<think>partial reasoning"]);
        assert_eq!(session.thoughts(), "partial reasoning");

        session.fail("connection reset");
        let snapshot = session.snapshot();
        assert_eq!(snapshot.phase, StreamPhase::Errored);
        assert_eq!(snapshot.thoughts, "partial reasoning");
        assert_eq!(snapshot.error.as_deref(), Some("connection reset"));
    }

    #[test]
    fn test_fail_after_done_is_ignored() {
        let mut session = run(&["x"]);
        session.finish();
        session.fail("late");
        assert_eq!(session.phase(), StreamPhase::Done);
        assert!(session.error().is_none());
    }

    #[test]
    fn test_session_id_display() {
        assert_eq!(SessionId(12).to_string(), "session-12");
    }
}
