//! Observable state of a streaming session.

use super::phase::StreamPhase;
use crate::session::entities::SessionId;
use serde::{Deserialize, Serialize};

/// Snapshot published to observers after every processed fragment.
///
/// `thoughts` and `answer` are owned copies of the session's current
/// classification; `error` is only set in [`StreamPhase::Errored`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StreamSnapshot {
    /// Session this snapshot belongs to (`None` when idle).
    pub session: Option<SessionId>,
    pub phase: StreamPhase,
    pub thoughts: String,
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StreamSnapshot {
    /// Empty `Idle` state.
    pub fn idle() -> Self {
        Self::default()
    }

    /// Fresh state of a session that has just started.
    pub fn connecting(session: SessionId) -> Self {
        Self {
            session: Some(session),
            phase: StreamPhase::Connecting,
            ..Self::default()
        }
    }

    pub fn is_active(&self) -> bool {
        self.phase.is_active()
    }

    pub fn is_terminal(&self) -> bool {
        self.phase.is_terminal()
    }
}
