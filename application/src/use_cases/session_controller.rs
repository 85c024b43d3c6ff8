//! Session Controller
//!
//! Composes the [`TransportReader`] and the domain [`Classifier`] into a
//! single streaming session:
//!
//! ```text
//! start(url, payload)
//!   └─ spawn driver ─ open reader ─┬─ fragment → append → classify → publish
//!                                  ├─ end       → Done    → publish
//!                                  └─ error     → Errored → publish
//! reset() ─ cancel driver → publish Idle
//! ```
//!
//! Each fragment is processed to completion before the next one is awaited.
//! Every publication is tagged with its session id and dropped if that
//! session is no longer current, so nothing from a cancelled stream reaches
//! observers after `reset` or a new `start`.

use crate::ports::stream_observer::StreamObserver;
use crate::ports::transport_reader::{StreamRequest, TransportError, TransportReader};
use futures::StreamExt;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thinkstream_domain::{Classifier, ClassifierConfig, Session, SessionId, StreamSnapshot};
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Errors returned by controller entry points.
///
/// Transport failures are never returned here; they surface as
/// [`StreamPhase::Errored`](thinkstream_domain::StreamPhase::Errored) in the
/// published state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ControllerError {
    #[error("Session {0} is still streaming; reset it first")]
    SessionActive(SessionId),

    #[error("No tokio runtime available to drive the stream")]
    NoRuntime,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct HubState {
    current: Option<SessionId>,
    observers: Vec<Arc<dyn StreamObserver>>,
}

/// Single publication point for snapshots.
struct SnapshotHub {
    state: Mutex<HubState>,
    tx: watch::Sender<StreamSnapshot>,
}

impl SnapshotHub {
    fn new() -> Self {
        let (tx, _rx) = watch::channel(StreamSnapshot::idle());
        Self {
            state: Mutex::new(HubState {
                current: None,
                observers: Vec::new(),
            }),
            tx,
        }
    }

    fn emit(&self, state: &HubState, snapshot: StreamSnapshot) {
        for observer in &state.observers {
            observer.on_snapshot(&snapshot);
        }
        self.tx.send_replace(snapshot);
    }

    /// Make `id` the current session and publish its fresh state.
    fn begin(&self, id: SessionId) -> Result<(), ControllerError> {
        let mut state = lock(&self.state);
        if let Some(current) = state.current {
            if self.tx.borrow().is_active() {
                return Err(ControllerError::SessionActive(current));
            }
        }
        state.current = Some(id);
        self.emit(&state, StreamSnapshot::connecting(id));
        Ok(())
    }

    /// Publish a session snapshot; returns `false` if the session is stale.
    fn publish(&self, snapshot: StreamSnapshot) -> bool {
        let state = lock(&self.state);
        if snapshot.session.is_none() || snapshot.session != state.current {
            return false;
        }
        self.emit(&state, snapshot);
        true
    }

    fn clear(&self) {
        let mut state = lock(&self.state);
        state.current = None;
        self.emit(&state, StreamSnapshot::idle());
    }
}

struct ActiveStream {
    id: SessionId,
    cancel: CancellationToken,
    // Detached on drop; the driver exits on its own once cancelled.
    _task: JoinHandle<()>,
}

/// Drives one reasoning-stream session at a time.
///
/// `start` and `reset` are synchronous; the stream itself is driven by a task
/// spawned on the ambient tokio runtime. Observe progress through
/// [`with_observer`](Self::with_observer), [`subscribe`](Self::subscribe) or
/// [`wait_settled`](Self::wait_settled).
pub struct SessionController {
    reader: Arc<dyn TransportReader>,
    classifier: Classifier,
    hub: Arc<SnapshotHub>,
    next_id: AtomicU64,
    active: Mutex<Option<ActiveStream>>,
}

impl SessionController {
    pub fn new(reader: Arc<dyn TransportReader>) -> Self {
        Self {
            reader,
            classifier: Classifier::default(),
            hub: Arc::new(SnapshotHub::new()),
            next_id: AtomicU64::new(0),
            active: Mutex::new(None),
        }
    }

    /// Use custom classifier settings for subsequent sessions.
    pub fn with_classifier(mut self, config: ClassifierConfig) -> Self {
        self.classifier = Classifier::new(config);
        self
    }

    /// Register an observer.
    pub fn with_observer(self, observer: Arc<dyn StreamObserver>) -> Self {
        self.add_observer(observer);
        self
    }

    /// Register an observer (mutator).
    pub fn add_observer(&self, observer: Arc<dyn StreamObserver>) {
        lock(&self.hub.state).observers.push(observer);
    }

    pub fn classifier_config(&self) -> &ClassifierConfig {
        self.classifier.config()
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> StreamSnapshot {
        self.hub.tx.borrow().clone()
    }

    /// Receiver that always holds the latest snapshot.
    pub fn subscribe(&self) -> watch::Receiver<StreamSnapshot> {
        self.hub.tx.subscribe()
    }

    /// Start streaming `payload` to `url`.
    ///
    /// Fails fast if a session is still active. A finished or errored session
    /// is discarded; observers first see a fresh `Connecting` state.
    pub fn start(
        &self,
        url: impl Into<String>,
        payload: Value,
    ) -> Result<SessionId, ControllerError> {
        let runtime = Handle::try_current().map_err(|_| ControllerError::NoRuntime)?;

        let mut active = lock(&self.active);
        let id = SessionId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        self.hub.begin(id)?;

        if let Some(previous) = active.take() {
            previous.cancel.cancel();
        }

        let request = StreamRequest::new(url, payload);
        info!("Starting {} against {}", id, request.url);

        let cancel = CancellationToken::new();
        let driver = Driver {
            session: Session::new(id),
            classifier: self.classifier.clone(),
            reader: Arc::clone(&self.reader),
            hub: Arc::clone(&self.hub),
            cancel: cancel.clone(),
        };
        let task = runtime.spawn(driver.run(request));

        *active = Some(ActiveStream {
            id,
            cancel,
            _task: task,
        });
        Ok(id)
    }

    /// Cancel any in-flight stream and publish an empty `Idle` state.
    ///
    /// Safe to call at any time; calling it repeatedly has no further effect
    /// on the published state.
    pub fn reset(&self) {
        let mut active = lock(&self.active);
        if let Some(stream) = active.take() {
            debug!("Cancelling {}", stream.id);
            stream.cancel.cancel();
        }
        self.hub.clear();
    }

    /// Wait until the current session is no longer active and return the
    /// snapshot that ended it (`Done`, `Errored`, or `Idle` after a reset).
    pub async fn wait_settled(&self) -> StreamSnapshot {
        let mut rx = self.subscribe();
        match rx.wait_for(|snapshot| !snapshot.is_active()).await {
            Ok(snapshot) => snapshot.clone(),
            Err(_) => self.snapshot(),
        }
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        if let Some(stream) = lock(&self.active).take() {
            stream.cancel.cancel();
        }
    }
}

/// Owns the session record for the lifetime of one stream.
struct Driver {
    session: Session,
    classifier: Classifier,
    reader: Arc<dyn TransportReader>,
    hub: Arc<SnapshotHub>,
    cancel: CancellationToken,
}

impl Driver {
    async fn run(mut self, request: StreamRequest) {
        let id = self.session.id();

        let opened = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                debug!("{} cancelled before the stream opened", id);
                return;
            }
            opened = self.reader.open(&request) => opened,
        };

        let mut fragments = match opened {
            Ok(fragments) => fragments,
            Err(e) => {
                self.fail(e);
                return;
            }
        };

        let mut phase = self.session.phase();
        loop {
            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    debug!("{} cancelled after {} fragments", id, self.session.fragment_count());
                    return;
                }
                next = fragments.next() => next,
            };

            match next {
                Some(Ok(fragment)) => {
                    self.session.push_fragment(&self.classifier, &fragment);
                    debug!(
                        "{}: fragment {} ({} bytes, buffer {} bytes)",
                        id,
                        self.session.fragment_count(),
                        fragment.len(),
                        self.session.buffer().len()
                    );

                    let current = self.session.phase();
                    if current != phase {
                        debug!("{}: {} -> {}", id, phase, current);
                        phase = current;
                    }

                    if !self.hub.publish(self.session.snapshot()) {
                        warn!("{} is no longer current; discarding fragment", id);
                        return;
                    }
                }
                Some(Err(e)) => {
                    self.fail(e);
                    return;
                }
                None => {
                    self.session.finish();
                    info!(
                        "{} done: {} fragments, {} bytes",
                        id,
                        self.session.fragment_count(),
                        self.session.buffer().len()
                    );
                    self.hub.publish(self.session.snapshot());
                    return;
                }
            }
        }
    }

    fn fail(&mut self, error: TransportError) {
        warn!("{} failed: {}", self.session.id(), error);
        self.session.fail(error.to_string());
        self.hub.publish(self.session.snapshot());
    }
}
