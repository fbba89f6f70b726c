//! Session lifecycle management.
//!
//! Every logical connection is identified by an opaque UUID assigned during
//! initialization and carried on each subsequent request. The
//! [`SessionManager`] owns the id-to-session map; all insert/lookup/remove
//! operations go through it so session transitions stay atomic with respect
//! to concurrent request handling.
//!
//! Each session also owns the outbound notification channel feeding its
//! server-initiated stream. Notifications carry a monotonically increasing
//! per-session event id, and delivery is FIFO per session.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex as StdMutex;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tokio::sync::mpsc::{self, Receiver, Sender, error::TrySendError};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::protocol::JsonRpcNotification;

/// Per-session notification buffer capacity. Events past this limit are
/// dropped until the stream drains, keeping a reader-less session from
/// growing without bound.
const NOTIFY_BUFFER: usize = 256;

/// Session lifecycle states. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Initializing,
    Active,
    Closed,
}

/// A notification stamped with its per-session delivery position.
#[derive(Debug, Clone)]
pub struct OutboundEvent {
    /// Monotonically increasing event id, usable as a resumption marker.
    pub id: u64,
    pub notification: JsonRpcNotification,
}

struct NotifyChannel {
    // Sender is dropped on close so open streams terminate.
    tx: Option<Sender<OutboundEvent>>,
    next_event_id: u64,
}

/// Per-session state: identity, lifecycle, and the notification channel.
pub struct Session {
    id: String,
    created_at: DateTime<Utc>,
    state: StdMutex<SessionState>,
    channel: StdMutex<NotifyChannel>,
    // Claimed by the one live notification stream for this session;
    // re-armed when that stream is dropped so the client can reconnect.
    stream_slot: StdMutex<Option<Receiver<OutboundEvent>>>,
    // Updated on every routed request; idle sessions get reaped.
    last_seen: StdMutex<Instant>,
}

impl Session {
    fn new() -> Self {
        let (tx, rx) = mpsc::channel(NOTIFY_BUFFER);
        Self {
            id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            state: StdMutex::new(SessionState::Initializing),
            channel: StdMutex::new(NotifyChannel {
                tx: Some(tx),
                next_event_id: 0,
            }),
            stream_slot: StdMutex::new(Some(rx)),
            last_seen: StdMutex::new(Instant::now()),
        }
    }

    /// The opaque session identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// When this session was created.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        *self.state.lock().expect("session state lock poisoned")
    }

    fn activate(&self) {
        let mut state = self.state.lock().expect("session state lock poisoned");
        if *state == SessionState::Initializing {
            *state = SessionState::Active;
        }
    }

    fn close(&self) {
        *self.state.lock().expect("session state lock poisoned") = SessionState::Closed;
        // Dropping the sender ends any open notification stream.
        self.channel
            .lock()
            .expect("session channel lock poisoned")
            .tx
            .take();
    }

    /// Enqueue a notification on this session's stream.
    ///
    /// Event id assignment and enqueueing happen under one lock so the
    /// delivery order always matches the id order. Returns false once the
    /// session is closed or when the buffer is full.
    pub fn notify(&self, notification: JsonRpcNotification) -> bool {
        let mut channel = self.channel.lock().expect("session channel lock poisoned");
        channel.next_event_id += 1;
        let event = OutboundEvent {
            id: channel.next_event_id,
            notification,
        };
        let Some(tx) = channel.tx.as_ref() else {
            return false;
        };
        match tx.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!("Session {} notification buffer full, dropping event", self.id);
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }

    /// Claim the notification stream. Returns `None` while another stream
    /// holds the receiver.
    pub fn take_stream(&self) -> Option<Receiver<OutboundEvent>> {
        self.stream_slot
            .lock()
            .expect("session stream lock poisoned")
            .take()
    }

    /// Return the receiver after a stream disconnect so the client can
    /// reconnect and resume.
    pub fn restore_stream(&self, rx: Receiver<OutboundEvent>) {
        *self
            .stream_slot
            .lock()
            .expect("session stream lock poisoned") = Some(rx);
    }

    fn touch(&self) {
        *self.last_seen.lock().expect("session last_seen lock poisoned") = Instant::now();
    }

    /// True when no request has touched this session within `max_idle` and
    /// no notification stream is currently open.
    fn is_idle(&self, max_idle: Duration) -> bool {
        let stream_open = self
            .stream_slot
            .lock()
            .expect("session stream lock poisoned")
            .is_none();
        if stream_open {
            return false;
        }
        self.last_seen
            .lock()
            .expect("session last_seen lock poisoned")
            .elapsed()
            >= max_idle
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Owner of the session map.
///
/// The map is the single piece of shared mutable state in the server; the
/// `RwLock` serializes insert/lookup/remove so no handler can observe a
/// half-initialized session.
#[derive(Debug, Default)]
pub struct SessionManager {
    sessions: RwLock<HashMap<String, std::sync::Arc<Session>>>,
}

impl SessionManager {
    /// Create an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new session and register it. This is the only path that
    /// creates sessions; the session is `Active` before it becomes visible.
    pub async fn create(&self) -> std::sync::Arc<Session> {
        let session = std::sync::Arc::new(Session::new());
        session.activate();
        let mut sessions = self.sessions.write().await;
        sessions.insert(session.id.clone(), session.clone());
        info!("Session {} created ({} active)", session.id, sessions.len());
        session
    }

    /// Look up a session by id regardless of state.
    pub async fn get(&self, id: &str) -> Option<std::sync::Arc<Session>> {
        self.sessions.read().await.get(id).cloned()
    }

    /// Look up a session that is `Active`, refreshing its idle clock.
    pub async fn get_active(&self, id: &str) -> Option<std::sync::Arc<Session>> {
        let session = self
            .get(id)
            .await
            .filter(|s| s.state() == SessionState::Active)?;
        session.touch();
        Some(session)
    }

    /// Tear down a session: mark it closed, release its notification
    /// channel, and remove it from the map. Returns false for unknown ids.
    pub async fn remove(&self, id: &str) -> bool {
        let removed = self.sessions.write().await.remove(id);
        match removed {
            Some(session) => {
                session.close();
                let age = Utc::now() - session.created_at();
                info!("Session {} terminated after {}s", id, age.num_seconds());
                true
            }
            None => {
                debug!("Termination requested for unknown session {}", id);
                false
            }
        }
    }

    /// Close and forget every session idle longer than `max_idle`.
    ///
    /// Sessions with an open notification stream are never reaped; their
    /// client is still connected even if it sends no requests. Returns the
    /// number of sessions removed.
    pub async fn remove_idle(&self, max_idle: Duration) -> usize {
        let mut sessions = self.sessions.write().await;
        let stale: Vec<String> = sessions
            .iter()
            .filter(|(_, session)| session.is_idle(max_idle))
            .map(|(id, _)| id.clone())
            .collect();
        for id in &stale {
            if let Some(session) = sessions.remove(id) {
                session.close();
                info!("Session {} expired after {:?} idle", id, max_idle);
            }
        }
        stale.len()
    }

    /// Number of live sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// True when no sessions are registered.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
