//! Incremental classifier for reasoning streams.
//!
//! The [`Classifier`] is a pure function of the accumulated buffer and the
//! previous [`Classification`]:
//!
//! ```text
//! (buffer, previous) → Classification { phase, thoughts, answer }
//! ```
//!
//! # Rule
//!
//! Evaluated against the whole buffer on every fragment, since a marker may
//! straddle two fragments:
//!
//! 1. Start and end marker found → `Answering`; thoughts between, answer after.
//!    Terminal: later growth only extends the answer.
//! 2. Only the start marker found → `Thinking`; thoughts run to end of buffer.
//! 3. No marker, buffer at or below the threshold → `Connecting`, no output.
//! 4. No marker, buffer above the threshold → heuristic `Answering` with the
//!    whole buffer as answer.
//!
//! # Tail scanning
//!
//! The result is identical to a full rescan, but each call only searches the
//! bytes appended since the previous call plus `marker.len() - 1` bytes of
//! overlap, so a marker split across fragments is still found. Previously
//! scanned bytes cannot contain an earlier first occurrence.

use super::markers::ThinkMarkers;
use super::phase::StreamPhase;
use crate::core::error::ClassificationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

/// Number of characters buffered before unmarked output is treated as answer.
pub const DEFAULT_HEURISTIC_THRESHOLD: usize = 50;

/// What happens when a start marker shows up after the heuristic already
/// committed unmarked output to the answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeuristicPolicy {
    /// Heuristic commitment is final; later markers stay in the answer.
    #[default]
    Sticky,
    /// Keep searching for a start marker and switch to `Thinking` if one
    /// appears, discarding the answer shown so far.
    Reevaluate,
}

impl HeuristicPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            HeuristicPolicy::Sticky => "sticky",
            HeuristicPolicy::Reevaluate => "reevaluate",
        }
    }
}

impl fmt::Display for HeuristicPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for HeuristicPolicy {
    type Err = ClassificationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sticky" => Ok(HeuristicPolicy::Sticky),
            "reevaluate" | "re-evaluate" => Ok(HeuristicPolicy::Reevaluate),
            _ => Err(ClassificationError::InvalidPolicy(s.to_string())),
        }
    }
}

/// Classifier settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifierConfig {
    pub markers: ThinkMarkers,
    /// Characters of unmarked output tolerated before the heuristic commits.
    pub threshold: usize,
    pub policy: HeuristicPolicy,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            markers: ThinkMarkers::default(),
            threshold: DEFAULT_HEURISTIC_THRESHOLD,
            policy: HeuristicPolicy::default(),
        }
    }
}

impl ClassifierConfig {
    pub fn with_markers(mut self, markers: ThinkMarkers) -> Self {
        self.markers = markers;
        self
    }

    pub fn with_threshold(mut self, threshold: usize) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_policy(mut self, policy: HeuristicPolicy) -> Self {
        self.policy = policy;
        self
    }
}

/// Search progress carried from one classification to the next.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Scan {
    /// No start marker in the first `scanned` bytes.
    Unmarked { scanned: usize },
    /// Start marker ends at `body`; no end marker in `body..scanned`.
    Open { body: usize, scanned: usize },
    /// Both markers located; the answer starts at `tail`.
    Closed { thoughts: Range<usize>, tail: usize },
    /// Sticky heuristic commitment.
    Heuristic,
}

/// Result of classifying a buffer.
///
/// `thoughts` and `answer` are byte ranges into the buffer that was
/// classified; use [`thoughts_in`](Self::thoughts_in) and
/// [`answer_in`](Self::answer_in) to slice them out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    phase: StreamPhase,
    thoughts: Range<usize>,
    answer: Range<usize>,
    scan: Scan,
}

impl Default for Classification {
    fn default() -> Self {
        Self::pending()
    }
}

impl Classification {
    /// Initial classification of an empty buffer.
    pub fn pending() -> Self {
        Self::connecting(0)
    }

    fn connecting(scanned: usize) -> Self {
        Self {
            phase: StreamPhase::Connecting,
            thoughts: 0..0,
            answer: 0..0,
            scan: Scan::Unmarked { scanned },
        }
    }

    /// Always one of `Connecting`, `Thinking` or `Answering`.
    pub fn phase(&self) -> StreamPhase {
        self.phase
    }

    pub fn thoughts_range(&self) -> Range<usize> {
        self.thoughts.clone()
    }

    pub fn answer_range(&self) -> Range<usize> {
        self.answer.clone()
    }

    pub fn thoughts_in<'a>(&self, buffer: &'a str) -> &'a str {
        buffer.get(self.thoughts.clone()).unwrap_or("")
    }

    pub fn answer_in<'a>(&self, buffer: &'a str) -> &'a str {
        buffer.get(self.answer.clone()).unwrap_or("")
    }

    /// Both markers were found; classification can no longer change shape.
    pub fn is_committed(&self) -> bool {
        matches!(self.scan, Scan::Closed { .. })
    }

    /// The answer came from the length heuristic rather than markers.
    pub fn is_heuristic(&self) -> bool {
        self.phase == StreamPhase::Answering && !self.is_committed()
    }
}

/// Pure marker-based classifier.
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    config: ClassifierConfig,
}

impl Classifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Classify `buffer`, which must extend the buffer `previous` was computed
    /// from (append-only).
    pub fn classify(&self, buffer: &str, previous: &Classification) -> Classification {
        let len = buffer.len();

        match &previous.scan {
            Scan::Closed { thoughts, tail } => Classification {
                phase: StreamPhase::Answering,
                thoughts: thoughts.clone(),
                answer: *tail..len,
                scan: previous.scan.clone(),
            },
            Scan::Heuristic => Self::heuristic(len, Scan::Heuristic),
            Scan::Open { body, scanned } => self.after_open(buffer, *body, *scanned),
            Scan::Unmarked { scanned } => {
                let open = self.config.markers.open();
                match find_from(buffer, open, 0, *scanned) {
                    Some(at) => {
                        let body = at + open.len();
                        self.after_open(buffer, body, body)
                    }
                    None if exceeds(settled(buffer, open), self.config.threshold) => {
                        match self.config.policy {
                            HeuristicPolicy::Sticky => Self::heuristic(len, Scan::Heuristic),
                            HeuristicPolicy::Reevaluate => {
                                Self::heuristic(len, Scan::Unmarked { scanned: len })
                            }
                        }
                    }
                    None => Classification::connecting(len),
                }
            }
        }
    }

    /// Classify a complete buffer from scratch.
    pub fn classify_all(&self, buffer: &str) -> Classification {
        self.classify(buffer, &Classification::pending())
    }

    fn after_open(&self, buffer: &str, body: usize, scanned: usize) -> Classification {
        let len = buffer.len();
        let close = self.config.markers.close();

        match find_from(buffer, close, body, scanned) {
            Some(at) => {
                let tail = at + close.len();
                Classification {
                    phase: StreamPhase::Answering,
                    thoughts: body..at,
                    answer: tail..len,
                    scan: Scan::Closed {
                        thoughts: body..at,
                        tail,
                    },
                }
            }
            None => Classification {
                phase: StreamPhase::Thinking,
                thoughts: body..len,
                answer: len..len,
                scan: Scan::Open { body, scanned: len },
            },
        }
    }

    fn heuristic(len: usize, scan: Scan) -> Classification {
        Classification {
            phase: StreamPhase::Answering,
            thoughts: 0..0,
            answer: 0..len,
            scan,
        }
    }
}

/// Find the first `needle` at or after `floor`, given that `floor..scanned`
/// is already known not to contain it.
fn find_from(haystack: &str, needle: &str, floor: usize, scanned: usize) -> Option<usize> {
    let overlap = needle.len().saturating_sub(1);
    let mut from = scanned.saturating_sub(overlap).max(floor).min(haystack.len());
    while !haystack.is_char_boundary(from) {
        from -= 1;
    }
    haystack[from..].find(needle).map(|at| from + at)
}

/// `buffer` without a trailing partial start marker.
///
/// A buffer ending in `"<thi"` may still become `"<think>"`, so those bytes
/// do not count towards the heuristic threshold yet.
fn settled<'a>(buffer: &'a str, open: &str) -> &'a str {
    let longest = open.len().saturating_sub(1).min(buffer.len());
    for held in (1..=longest).rev() {
        let cut = buffer.len() - held;
        if open.is_char_boundary(held)
            && buffer.is_char_boundary(cut)
            && buffer.as_bytes()[cut..] == open.as_bytes()[..held]
        {
            return &buffer[..cut];
        }
    }
    buffer
}

/// Character count strictly greater than `threshold`.
fn exceeds(buffer: &str, threshold: usize) -> bool {
    buffer.chars().nth(threshold).is_some()
}
