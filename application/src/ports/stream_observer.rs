//! Stream observer port
//!
//! Defines how state snapshots reach the presentation layer.

use thinkstream_domain::StreamSnapshot;

/// Callback invoked with every published snapshot.
///
/// Called synchronously from the session driver after each fragment is
/// classified, and from `start`/`reset`. Implementations must return quickly
/// and must not call back into the controller.
pub trait StreamObserver: Send + Sync {
    fn on_snapshot(&self, snapshot: &StreamSnapshot);
}

/// No-op observer for when only the latest state is of interest
pub struct NoObserver;

impl StreamObserver for NoObserver {
    fn on_snapshot(&self, _snapshot: &StreamSnapshot) {}
}

impl<F> StreamObserver for F
where
    F: Fn(&StreamSnapshot) + Send + Sync,
{
    fn on_snapshot(&self, snapshot: &StreamSnapshot) {
        self(snapshot)
    }
}
