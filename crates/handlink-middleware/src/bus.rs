//! Broadcast bus for telemetry-link notifications.
//!
//! The link publishes every state change, raw frame and transport error as a
//! [`LinkEvent`].  Publishing happens on the I/O context (inside the link's
//! Tokio task); observers such as loggers, UIs or tests subscribe from
//! wherever they run.  The simulation context never needs the bus: decoded
//! records reach it through the ingest queue instead.
//!
//! Uses [`tokio::sync::broadcast`] so a slow subscriber lags (and is told how
//! far) instead of stalling the link.

use handlink_types::{HandError, LinkEvent, LinkPayload};
use tokio::sync::broadcast;
use tracing::warn;

/// Default channel capacity (number of buffered events before old ones are
/// dropped for slow subscribers).
const DEFAULT_CAPACITY: usize = 256;

/// Coarse classification of a [`LinkEvent`], used to filter subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    State,
    Frame,
    Error,
}

impl EventKind {
    pub fn of(event: &LinkEvent) -> Self {
        match event.payload {
            LinkPayload::StateChanged(_) => EventKind::State,
            LinkPayload::Frame(_) => EventKind::Frame,
            LinkPayload::Error(_) => EventKind::Error,
        }
    }
}

/// Shared link-event bus.  Clone it cheaply – all clones share the same
/// underlying broadcast channel.
#[derive(Clone, Debug)]
pub struct EventBus {
    sender: broadcast::Sender<LinkEvent>,
}

impl EventBus {
    /// Create a new bus with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to every current subscriber.
    ///
    /// Returns the number of receivers that were handed the event, or a
    /// [`HandError::Transport`] when nobody is listening.  Callers on the
    /// link's hot path ignore that case.
    pub fn publish(&self, event: LinkEvent) -> Result<usize, HandError> {
        self.sender
            .send(event)
            .map_err(|e| HandError::Transport(format!("link event bus send error: {e}")))
    }

    /// Subscribe to every event.
    pub fn subscribe(&self) -> broadcast::Receiver<LinkEvent> {
        self.sender.subscribe()
    }

    /// Subscribe to events of one [`EventKind`] only.
    pub fn subscribe_kind(&self, kind: EventKind) -> KindSubscriber {
        KindSubscriber {
            kind,
            receiver: self.sender.subscribe(),
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// A subscriber that only delivers events of a single [`EventKind`].
pub struct KindSubscriber {
    kind: EventKind,
    receiver: broadcast::Receiver<LinkEvent>,
}

impl KindSubscriber {
    /// Wait for the next matching event.
    ///
    /// Returns `None` when the bus is closed and no further events will arrive.
    pub async fn recv(&mut self) -> Option<LinkEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if EventKind::of(&event) == self.kind => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(kind = ?self.kind, lagged_by = n, "link event subscriber lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }
}
