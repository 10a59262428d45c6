//! `handlink-middleware` – The I/O Context
//!
//! Everything that touches the network lives here.  Decoded telemetry leaves
//! this crate through exactly one door: the ingest queue.
//!
//! # Modules
//!
//! - [`link`] – WebSocket client owning the glove connection and its
//!   lifecycle state machine.
//! - [`decoder`] – Parses `Side:Channel:Value` text frames into
//!   [`TelemetryRecord`][handlink_types::TelemetryRecord]s.
//! - [`queue`] – Single-producer single-consumer hand-off from the I/O
//!   context to the simulation context.
//! - [`bus`] – Broadcast bus carrying link state changes, raw frames and
//!   errors to observers.

pub mod bus;
pub mod decoder;
pub mod link;
pub mod queue;

pub use bus::{EventBus, EventKind, KindSubscriber};
pub use decoder::FrameDecoder;
pub use link::{DEFAULT_PORT, Endpoint, TelemetryLink};
pub use queue::{IngestConsumer, IngestProducer, ingest_queue};
