//! `handlink-runtime` – The Simulation Context
//!
//! Everything that runs on the fixed-rate tick.  The I/O context only ever
//! reaches this crate through the ingest queue.
//!
//! # Modules
//!
//! - [`mapper`] – [`StateMapper`][mapper::StateMapper]: keeps the last
//!   accepted value per channel and converts each record into a local
//!   rotation or translation of the bound rig targets.
//! - [`gesture`] – [`GestureEngine`][gesture::GestureEngine]: ordered
//!   threshold rules that spawn, clear and push scene objects, level- or
//!   edge-triggered.
//! - [`session`] – [`HandSession`][session::HandSession]: owns the queue
//!   consumer, mapper, engine and object registry and runs one tick at a
//!   time.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: installs the
//!   global `tracing` subscriber with an optional OTLP span exporter.

pub mod gesture;
pub mod mapper;
pub mod session;
pub mod telemetry;

pub use gesture::{GestureConfig, GestureEngine, GestureReport, TriggerMode};
pub use mapper::{
    Bindings, ChannelState, MapperConfig, StateMapper, TargetBinding, TransformUpdate,
    TranslateXPolicy,
};
pub use session::{HandSession, SessionConfig, TickReport};
pub use telemetry::{TracerProviderGuard, init_tracing};
