//! [`TelemetryLink`] – persistent WebSocket connection to the glove.
//!
//! ```text
//! Disconnected ──connect──▶ Connecting ──handshake ok──▶ Connected
//!      ▲                        │                            │
//!      │◀──── handshake failed ─┘                            │
//!      │◀──── stream error / peer closed ────────────────────┤
//!      └───────────────── Closing ◀──────── close ───────────┘
//! ```
//!
//! [`TelemetryLink::connect`] spawns one Tokio task per connection attempt
//! and returns immediately.  That task is the I/O context: it performs the
//! handshake, decodes every inbound text frame with a [`FrameDecoder`],
//! pushes accepted records into the [`IngestProducer`], and publishes state
//! changes, frames and errors on the [`EventBus`].  Nothing else runs there.
//!
//! There is no reconnect and no timeout.  A failed or dropped connection
//! publishes a [`HandError::Transport`] and settles in
//! [`LinkState::Disconnected`]; calling `connect` again is up to the owner.
//! [`TelemetryLink::close`] is idempotent, never blocks, and is also run on
//! drop.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use handlink_types::{HandError, LinkEvent, LinkPayload, LinkState};
use tokio::runtime::Handle;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

use crate::bus::EventBus;
use crate::decoder::FrameDecoder;
use crate::queue::IngestProducer;

/// Port the glove firmware serves its WebSocket on.
pub const DEFAULT_PORT: u16 = 81;

// ---------------------------------------------------------------------------
// Endpoint
// ---------------------------------------------------------------------------

/// Address of the glove's WebSocket server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    /// Request path, with or without a leading `/`.
    pub path: String,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            path: String::new(),
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// `ws://host:port/path`
    pub fn url(&self) -> String {
        let path = self.path.trim_start_matches('/');
        format!("ws://{}:{}/{}", self.host, self.port, path)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url())
    }
}

// ---------------------------------------------------------------------------
// TelemetryLink
// ---------------------------------------------------------------------------

/// Everything the I/O task needs, shared between the link and its tasks.
struct Shared {
    decoder: FrameDecoder,
    producer: IngestProducer,
    bus: Arc<EventBus>,
    state: watch::Sender<LinkState>,
}

impl Shared {
    fn transition(&self, session: Uuid, next: LinkState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            info!(%session, from = %previous, to = %next, "link state changed");
            self.publish(session, LinkPayload::StateChanged(next));
        }
    }

    /// Move to `next` only if the current state is one of `from`.  The check
    /// and the write happen under the watch lock, so a concurrent
    /// `Disconnected` from the I/O task is never overwritten.
    fn transition_from(&self, session: Uuid, from: &[LinkState], next: LinkState) -> bool {
        let mut previous = next;
        let changed = self.state.send_if_modified(|state| {
            if *state == next || !from.contains(state) {
                return false;
            }
            previous = std::mem::replace(state, next);
            true
        });
        if changed {
            info!(%session, from = %previous, to = %next, "link state changed");
            self.publish(session, LinkPayload::StateChanged(next));
        }
        changed
    }

    fn fail(&self, session: Uuid, err: HandError) {
        error!(%session, error = %err, "telemetry link error");
        self.publish(session, LinkPayload::Error(err));
    }

    fn publish(&self, session: Uuid, payload: LinkPayload) {
        // No subscribers is normal.
        let _ = self.bus.publish(LinkEvent {
            session,
            timestamp: Utc::now(),
            payload,
        });
    }

    /// Decode one frame and hand the record to the simulation context.
    fn ingest(&self, session: Uuid, frame: &str) {
        trace!(%session, frame, "frame received");
        self.publish(session, LinkPayload::Frame(frame.to_string()));
        if let Some(record) = self.decoder.decode_or_warn(frame) {
            if let Err(e) = self.producer.push(record) {
                warn!(%session, error = %e, "decoded record discarded");
            }
        }
    }
}

struct ActiveConnection {
    session: Uuid,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// Owner of the glove connection.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use handlink_middleware::{EventBus, Endpoint, FrameDecoder, TelemetryLink, ingest_queue};
///
/// # async fn run() -> Result<(), handlink_types::HandError> {
/// let (producer, mut consumer) = ingest_queue();
/// let link = TelemetryLink::new(FrameDecoder::default(), producer, Arc::new(EventBus::default()));
/// link.connect(&Endpoint::new("192.168.0.12", 81))?;
/// // ... each simulation tick:
/// let records = consumer.drain();
/// # drop(records);
/// link.close();
/// # Ok(())
/// # }
/// ```
pub struct TelemetryLink {
    shared: Arc<Shared>,
    active: Mutex<Option<ActiveConnection>>,
}

impl TelemetryLink {
    pub fn new(decoder: FrameDecoder, producer: IngestProducer, bus: Arc<EventBus>) -> Self {
        let (state, _) = watch::channel(LinkState::Disconnected);
        Self {
            shared: Arc::new(Shared {
                decoder,
                producer,
                bus,
                state,
            }),
            active: Mutex::new(None),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LinkState {
        *self.shared.state.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == LinkState::Connected
    }

    /// A receiver that observes every state change.
    pub fn watch_state(&self) -> watch::Receiver<LinkState> {
        self.shared.state.subscribe()
    }

    /// Resolve once the link reaches `target`.  Resolves immediately if it
    /// is already there.
    pub async fn wait_for(&self, target: LinkState) {
        let mut rx = self.watch_state();
        // The sender lives as long as `self`, so this cannot observe a closed channel.
        let _ = rx.wait_for(|state| *state == target).await;
    }

    /// Start connecting to `endpoint` and return the new session id.
    ///
    /// Returns as soon as the connection task is spawned; progress is
    /// reported through [`state`][Self::state] and the event bus.
    ///
    /// # Errors
    ///
    /// [`HandError::Transport`] if a connection is already in progress or
    /// established, or if called outside a Tokio runtime.
    pub fn connect(&self, endpoint: &Endpoint) -> Result<Uuid, HandError> {
        let runtime = Handle::try_current()
            .map_err(|e| HandError::Transport(format!("no async runtime for link: {e}")))?;

        let mut active = self.lock_active();
        let current = self.state();
        if current != LinkState::Disconnected {
            return Err(HandError::Transport(format!(
                "cannot connect to {endpoint}: link is {current}"
            )));
        }
        // A finished previous session leaves a completed task behind.
        active.take();

        let session = Uuid::new_v4();
        let url = endpoint.url();
        info!(%session, %url, "connecting telemetry link");
        self.shared.transition(session, LinkState::Connecting);

        let (shutdown, shutdown_rx) = oneshot::channel();
        let shared = Arc::clone(&self.shared);
        let task = runtime.spawn(run_connection(shared, session, url, shutdown_rx));

        *active = Some(ActiveConnection {
            session,
            shutdown,
            task,
        });
        Ok(session)
    }

    /// Request the connection to close.
    ///
    /// Idempotent and non-blocking: the I/O task sends a close frame (or
    /// abandons the handshake) and then moves the link to
    /// [`LinkState::Disconnected`].  Use [`wait_for`][Self::wait_for] to
    /// await that.
    pub fn close(&self) {
        let Some(conn) = self.lock_active().take() else {
            return;
        };
        if conn.task.is_finished() {
            return;
        }
        self.shared.transition_from(
            conn.session,
            &[LinkState::Connecting, LinkState::Connected],
            LinkState::Closing,
        );
        debug!(session = %conn.session, "close requested");
        // The task may have exited since the check above.
        let _ = conn.shutdown.send(());
    }

    fn lock_active(&self) -> MutexGuard<'_, Option<ActiveConnection>> {
        self.active
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for TelemetryLink {
    fn drop(&mut self) {
        self.close();
    }
}

// ---------------------------------------------------------------------------
// I/O task
// ---------------------------------------------------------------------------

async fn run_connection(
    shared: Arc<Shared>,
    session: Uuid,
    url: String,
    mut shutdown: oneshot::Receiver<()>,
) {
    let ws_stream = tokio::select! {
        _ = &mut shutdown => {
            debug!(%session, "connect abandoned by close");
            shared.transition(session, LinkState::Disconnected);
            return;
        }
        result = connect_async(url.as_str()) => match result {
            Ok((stream, _response)) => stream,
            Err(e) => {
                shared.fail(session, HandError::Transport(format!("connect to {url} failed: {e}")));
                shared.transition(session, LinkState::Disconnected);
                return;
            }
        }
    };

    // A close that raced the handshake already moved the link to Closing.
    shared.transition_from(session, &[LinkState::Connecting], LinkState::Connected);
    let (mut ws_tx, mut ws_rx) = ws_stream.split();

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                if let Err(e) = ws_tx.send(Message::Close(None)).await {
                    debug!(%session, error = %e, "close frame not delivered");
                }
                break;
            }
            msg = ws_rx.next() => match msg {
                Some(Ok(Message::Text(text))) => shared.ingest(session, text.as_str()),
                Some(Ok(Message::Binary(bytes))) => match std::str::from_utf8(&bytes) {
                    Ok(text) => shared.ingest(session, text),
                    Err(_) => debug!(%session, len = bytes.len(), "non-UTF-8 binary frame ignored"),
                },
                Some(Ok(Message::Close(frame))) => {
                    info!(%session, ?frame, "glove closed the connection");
                    break;
                }
                // Ping/Pong are answered by tungstenite.
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    shared.fail(session, HandError::Transport(format!("connection dropped: {e}")));
                    break;
                }
                None => {
                    let err = HandError::Transport("stream ended without close".to_string());
                    shared.fail(session, err);
                    break;
                }
            }
        }
    }

    shared.transition(session, LinkState::Disconnected);
}
