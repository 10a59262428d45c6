//! `handlink-hal` – the scene-host boundary.
//!
//! The rendering/physics host owns bones, roots and spawned objects.  This
//! crate only describes what the pipeline needs from it and keeps track of
//! the objects the gesture engine creates.
//!
//! # Modules
//!
//! - [`sink`] – [`RigSink`] (pose get/set for named targets) and
//!   [`SceneSink`] (spawn, destroy, apply force).
//! - [`registry`] – [`ObjectRegistry`]: ownership bookkeeping for transient
//!   objects, with bulk disposal and batch force application.
//! - [`sim`] – [`SimScene`]: an in-process host implementing both sinks that
//!   records every operation, for tests and headless runs.

pub mod registry;
pub mod sim;
pub mod sink;

pub use registry::ObjectRegistry;
pub use sim::{SceneOp, SimScene};
pub use sink::{ROOT_TARGET, RigSink, SceneSink, finger_bone_target};
