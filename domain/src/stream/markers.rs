//! Literal delimiters of the thinking trace.

use crate::core::error::ClassificationError;
use serde::{Deserialize, Serialize};

/// Default start marker (7 bytes).
pub const DEFAULT_OPEN_MARKER: &str = "<think>";

/// Default end marker (8 bytes).
pub const DEFAULT_CLOSE_MARKER: &str = "</think>";

/// Start/end marker pair delimiting the thinking trace.
///
/// Matching is exact, case-sensitive substring search. Only the first
/// start marker and the first end marker after it are honored.
///
/// # Examples
///
/// ```
/// use thinkstream_domain::ThinkMarkers;
///
/// let markers = ThinkMarkers::default();
/// assert_eq!(markers.open(), "<think>");
/// assert_eq!(markers.close(), "</think>");
///
/// assert!(ThinkMarkers::new("", "</r>").is_err());
/// assert!(ThinkMarkers::new("<r>", "<r>").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThinkMarkers {
    open: String,
    close: String,
}

impl ThinkMarkers {
    pub fn new(
        open: impl Into<String>,
        close: impl Into<String>,
    ) -> Result<Self, ClassificationError> {
        let open = open.into();
        let close = close.into();

        if open.is_empty() || close.is_empty() {
            return Err(ClassificationError::InvalidMarkers(
                "markers must not be empty".to_string(),
            ));
        }
        if open == close {
            return Err(ClassificationError::InvalidMarkers(format!(
                "start and end markers are identical ({open})"
            )));
        }

        Ok(Self { open, close })
    }

    pub fn open(&self) -> &str {
        &self.open
    }

    pub fn close(&self) -> &str {
        &self.close
    }
}

impl Default for ThinkMarkers {
    fn default() -> Self {
        Self {
            open: DEFAULT_OPEN_MARKER.to_string(),
            close: DEFAULT_CLOSE_MARKER.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_marker_lengths() {
        let markers = ThinkMarkers::default();
        assert_eq!(markers.open().len(), 7);
        assert_eq!(markers.close().len(), 8);
    }

    #[test]
    fn test_custom_markers() {
        let markers = ThinkMarkers::new("<reasoning>", "</reasoning>").unwrap();
        assert_eq!(markers.open(), "<reasoning>");
        assert_eq!(markers.close(), "</reasoning>");
    }

    #[test]
    fn test_rejects_empty_close() {
        let err = ThinkMarkers::new("<think>", "").unwrap_err();
        assert!(matches!(err, ClassificationError::InvalidMarkers(_)));
    }

    #[test]
    fn test_rejects_identical() {
        let err = ThinkMarkers::new("|", "|").unwrap_err();
        assert!(err.to_string().contains("identical"));
    }
}
