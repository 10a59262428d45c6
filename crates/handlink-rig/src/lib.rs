//! `handlink-rig` – pose math for the virtual hand rig.
//!
//! The glove reports incremental joint motion; sinks apply it to bone and
//! root transforms expressed as a [`Pose`][transform::Pose].
//!
//! # Modules
//!
//! - [`transform`] – [`Vec3`][transform::Vec3],
//!   [`Quaternion`][transform::Quaternion] and [`Pose`][transform::Pose] with
//!   local-space rotation and translation, matching how a scene graph applies
//!   a "rotate by euler angles in self space" or "translate in self space"
//!   command.

pub mod transform;

pub use transform::{Pose, Quaternion, Vec3};
