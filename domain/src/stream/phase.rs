//! Phase of a streaming session.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle phase of a reasoning-stream session.
///
/// ```text
/// Idle → Connecting → {Thinking | Answering(heuristic)} → Answering → Done
///                       └──────────── any active phase ──────────→ Errored
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamPhase {
    /// No session is running.
    #[default]
    Idle,
    /// Request issued; buffering until a marker or the length threshold.
    Connecting,
    /// Start marker seen, end marker not yet.
    Thinking,
    /// Final answer is being streamed.
    Answering,
    /// Stream completed normally.
    Done,
    /// Transport failed; partial output is retained.
    Errored,
}

impl StreamPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamPhase::Idle => "idle",
            StreamPhase::Connecting => "connecting",
            StreamPhase::Thinking => "thinking",
            StreamPhase::Answering => "answering",
            StreamPhase::Done => "done",
            StreamPhase::Errored => "errored",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            StreamPhase::Idle => "Idle",
            StreamPhase::Connecting => "Connecting",
            StreamPhase::Thinking => "Thinking",
            StreamPhase::Answering => "Answering",
            StreamPhase::Done => "Done",
            StreamPhase::Errored => "Errored",
        }
    }

    /// A transport sequence is (or should be) open in this phase.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            StreamPhase::Connecting | StreamPhase::Thinking | StreamPhase::Answering
        )
    }

    /// The session ended and will not change until reset or restarted.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamPhase::Done | StreamPhase::Errored)
    }
}

impl fmt::Display for StreamPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_idle() {
        assert_eq!(StreamPhase::default(), StreamPhase::Idle);
    }

    #[test]
    fn test_active_and_terminal_are_disjoint() {
        let all = [
            StreamPhase::Idle,
            StreamPhase::Connecting,
            StreamPhase::Thinking,
            StreamPhase::Answering,
            StreamPhase::Done,
            StreamPhase::Errored,
        ];
        for phase in all {
            assert!(!(phase.is_active() && phase.is_terminal()), "{phase}");
        }
        assert!(!StreamPhase::Idle.is_active());
        assert!(!StreamPhase::Idle.is_terminal());
    }

    #[test]
    fn test_serde_uses_snake_case() {
        let json = serde_json::to_string(&StreamPhase::Answering).unwrap();
        assert_eq!(json, "\"answering\"");
        let phase: StreamPhase = serde_json::from_str("\"errored\"").unwrap();
        assert_eq!(phase, StreamPhase::Errored);
    }
}
