//! JSON output for the final snapshot

use thinkstream_domain::StreamSnapshot;

/// Format a snapshot as pretty-printed JSON
pub fn format_json(snapshot: &StreamSnapshot) -> String {
    serde_json::to_string_pretty(snapshot).unwrap_or_else(|_| "{}".to_string())
}
