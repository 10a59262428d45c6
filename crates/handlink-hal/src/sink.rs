//! Sink traits implemented by the scene host.
//!
//! The pipeline never touches scene objects directly.  It reads and writes
//! target poses through [`RigSink`] and creates, destroys and pushes
//! transient objects through [`SceneSink`], so a headless simulator and a
//! real engine binding are interchangeable.

use handlink_rig::{Pose, Vec3};
use handlink_types::{Channel, HandError, ObjectId};

/// Name of the hand root target (wrist) on the conventional left-hand rig.
pub const ROOT_TARGET: &str = "left_hand";

/// Conventional name of finger bone `segment` driven by `channel` on the
/// left-hand rig, e.g. `"left_index_0"`.
pub fn finger_bone_target(channel: Channel, segment: usize) -> String {
    format!("left_{}_{}", channel.label().to_lowercase(), segment)
}

/// Access to the poses of named rig targets (finger bones, hand root).
pub trait RigSink: Send {
    /// Current pose of `target`, or `None` if the host has no such target.
    fn pose(&self, target: &str) -> Option<Pose>;

    /// Replace the pose of `target`.
    ///
    /// # Errors
    ///
    /// Returns [`HandError::Scene`] if the host has no such target.
    fn set_pose(&mut self, target: &str, pose: Pose) -> Result<(), HandError>;
}

/// Creation, destruction and physics impulses for transient scene objects.
pub trait SceneSink: Send {
    /// Instantiate a primitive object at `position` and return its handle.
    fn spawn(&mut self, position: Vec3) -> Result<ObjectId, HandError>;

    /// Destroy a previously spawned object.
    ///
    /// # Errors
    ///
    /// Returns [`HandError::Scene`] if the object does not exist (already
    /// destroyed by the host, for example).
    fn destroy(&mut self, object: ObjectId) -> Result<(), HandError>;

    /// Apply an instantaneous force to a spawned object.
    fn apply_force(&mut self, object: ObjectId, force: Vec3) -> Result<(), HandError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Minimal in-process rig used only for tests.
    struct MockRig {
        poses: HashMap<String, Pose>,
    }

    impl RigSink for MockRig {
        fn pose(&self, target: &str) -> Option<Pose> {
            self.poses.get(target).copied()
        }

        fn set_pose(&mut self, target: &str, pose: Pose) -> Result<(), HandError> {
            match self.poses.get_mut(target) {
                Some(slot) => {
                    *slot = pose;
                    Ok(())
                }
                None => Err(HandError::Scene {
                    target: target.to_string(),
                    details: "unknown target".to_string(),
                }),
            }
        }
    }

    #[test]
    fn mock_rig_set_and_get_pose() {
        let mut rig = MockRig {
            poses: HashMap::from([(ROOT_TARGET.to_string(), Pose::identity())]),
        };
        let moved = Pose::new(Vec3::new(0.0, 1.0, 0.0), Pose::identity().rotation);
        rig.set_pose(ROOT_TARGET, moved).unwrap();
        assert_eq!(rig.pose(ROOT_TARGET), Some(moved));
        assert!(rig.set_pose("right_hand", moved).is_err());
        assert!(rig.pose("right_hand").is_none());
    }

    #[test]
    fn finger_bone_names_follow_rig_convention() {
        assert_eq!(finger_bone_target(Channel::IndexFlex, 0), "left_index_0");
        assert_eq!(finger_bone_target(Channel::ThumbFlex, 2), "left_thumb_2");
    }
}
