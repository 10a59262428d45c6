//! In-process scene host for CI and headless runs.
//!
//! [`SimScene`] implements both [`RigSink`] and [`SceneSink`] without a
//! rendering or physics engine.  Rig targets hold a [`Pose`]; spawned objects
//! hold their spawn position and the sum of every force applied to them.
//! Every mutating call is appended to a [`SceneOp`] journal so tests can
//! assert on exactly what the pipeline asked the host to do.
//!
//! # Example
//!
//! ```rust
//! use handlink_hal::sim::SimScene;
//! use handlink_hal::sink::{ROOT_TARGET, RigSink, SceneSink};
//! use handlink_rig::Vec3;
//!
//! let mut scene = SimScene::builder().with_hand_rig(3).build();
//! assert!(scene.pose(ROOT_TARGET).is_some());
//!
//! let cube = scene.spawn(Vec3::new(0.0, 2.0, 4.0)).unwrap();
//! scene.apply_force(cube, Vec3::new(0.0, 30.0, 0.0)).unwrap();
//! assert_eq!(scene.object_count(), 1);
//! ```

use std::collections::HashMap;

use handlink_rig::{Pose, Vec3};
use handlink_types::{Channel, HandError, ObjectId};

use crate::sink::{ROOT_TARGET, RigSink, SceneSink, finger_bone_target};

// ────────────────────────────────────────────────────────────────────────────
// Journal
// ────────────────────────────────────────────────────────────────────────────

/// One mutating call received by a [`SimScene`].
#[derive(Debug, Clone, PartialEq)]
pub enum SceneOp {
    SetPose { target: String, pose: Pose },
    Spawn { object: ObjectId, position: Vec3 },
    Destroy { object: ObjectId },
    Force { object: ObjectId, force: Vec3 },
}

/// State of one spawned object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimObject {
    pub position: Vec3,
    pub accumulated_force: Vec3,
}

// ────────────────────────────────────────────────────────────────────────────
// SimScene
// ────────────────────────────────────────────────────────────────────────────

/// A scene host that records commands instead of rendering them.
#[derive(Debug, Default)]
pub struct SimScene {
    targets: HashMap<String, Pose>,
    objects: HashMap<ObjectId, SimObject>,
    journal: Vec<SceneOp>,
}

impl SimScene {
    /// Start building a scene.
    pub fn builder() -> SimSceneBuilder {
        SimSceneBuilder::default()
    }

    /// Number of live spawned objects.
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// State of a live object.
    pub fn object(&self, object: ObjectId) -> Option<&SimObject> {
        self.objects.get(&object)
    }

    /// Every mutating call received so far, oldest first.
    pub fn journal(&self) -> &[SceneOp] {
        &self.journal
    }

    /// Forget the journal without touching scene state.
    pub fn clear_journal(&mut self) {
        self.journal.clear();
    }

    /// Names of every rig target, sorted.
    pub fn target_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.targets.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    fn unknown_object(object: ObjectId) -> HandError {
        HandError::Scene {
            target: object.to_string(),
            details: format!("object {object} does not exist"),
        }
    }
}

impl RigSink for SimScene {
    fn pose(&self, target: &str) -> Option<Pose> {
        self.targets.get(target).copied()
    }

    fn set_pose(&mut self, target: &str, pose: Pose) -> Result<(), HandError> {
        let slot = self.targets.get_mut(target).ok_or_else(|| HandError::Scene {
            target: target.to_string(),
            details: format!("rig target '{target}' is not registered"),
        })?;
        *slot = pose;
        self.journal.push(SceneOp::SetPose {
            target: target.to_string(),
            pose,
        });
        Ok(())
    }
}

impl SceneSink for SimScene {
    fn spawn(&mut self, position: Vec3) -> Result<ObjectId, HandError> {
        let object = ObjectId::new();
        self.objects.insert(
            object,
            SimObject {
                position,
                accumulated_force: Vec3::zero(),
            },
        );
        self.journal.push(SceneOp::Spawn { object, position });
        Ok(object)
    }

    fn destroy(&mut self, object: ObjectId) -> Result<(), HandError> {
        self.objects
            .remove(&object)
            .ok_or_else(|| Self::unknown_object(object))?;
        self.journal.push(SceneOp::Destroy { object });
        Ok(())
    }

    fn apply_force(&mut self, object: ObjectId, force: Vec3) -> Result<(), HandError> {
        let state = self
            .objects
            .get_mut(&object)
            .ok_or_else(|| Self::unknown_object(object))?;
        state.accumulated_force = state.accumulated_force.add(force);
        self.journal.push(SceneOp::Force { object, force });
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Builder
// ────────────────────────────────────────────────────────────────────────────

/// Builder for a [`SimScene`] populated with named rig targets.
#[derive(Default)]
pub struct SimSceneBuilder {
    targets: Vec<String>,
}

impl SimSceneBuilder {
    /// Register a rig target at the identity pose.
    pub fn with_target(mut self, id: impl Into<String>) -> Self {
        self.targets.push(id.into());
        self
    }

    /// Register the conventional left-hand rig: [`ROOT_TARGET`] plus
    /// `segments` bones per finger named by [`finger_bone_target`].
    pub fn with_hand_rig(mut self, segments: usize) -> Self {
        self.targets.push(ROOT_TARGET.to_string());
        for channel in Channel::ALL.into_iter().filter(|c| c.is_finger()) {
            for segment in 0..segments {
                self.targets.push(finger_bone_target(channel, segment));
            }
        }
        self
    }

    pub fn build(self) -> SimScene {
        SimScene {
            targets: self
                .targets
                .into_iter()
                .map(|id| (id, Pose::identity()))
                .collect(),
            ..SimScene::default()
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use handlink_types::Axis;

    #[test]
    fn hand_rig_has_root_and_finger_bones() {
        let scene = SimScene::builder().with_hand_rig(3).build();
        // 1 root + 5 fingers × 3 segments.
        assert_eq!(scene.target_names().len(), 16);
        assert!(scene.pose(ROOT_TARGET).is_some());
        assert!(scene.pose("left_pinky_2").is_some());
        assert!(scene.pose("left_pinky_3").is_none());
    }

    #[test]
    fn set_pose_updates_and_journals() {
        let mut scene = SimScene::builder().with_target("wrist").build();
        let mut pose = Pose::identity();
        pose.rotate_local(Axis::Z, 10.0);

        scene.set_pose("wrist", pose).unwrap();

        assert_eq!(scene.pose("wrist"), Some(pose));
        assert_eq!(
            scene.journal(),
            &[SceneOp::SetPose {
                target: "wrist".to_string(),
                pose
            }]
        );
    }

    #[test]
    fn set_pose_unknown_target_is_scene_error() {
        let mut scene = SimScene::builder().build();
        let result = scene.set_pose("ghost", Pose::identity());
        assert!(matches!(result, Err(HandError::Scene { .. })));
        assert!(scene.journal().is_empty());
    }

    #[test]
    fn spawn_destroy_lifecycle() {
        let mut scene = SimScene::builder().build();
        let cube = scene.spawn(Vec3::new(-1.0, 2.0, 4.0)).unwrap();
        assert_eq!(scene.object(cube).unwrap().position, Vec3::new(-1.0, 2.0, 4.0));

        scene.destroy(cube).unwrap();
        assert_eq!(scene.object_count(), 0);
        assert!(scene.destroy(cube).is_err(), "double destroy must fail");
        assert!(scene.apply_force(cube, Vec3::zero()).is_err());
    }

    #[test]
    fn forces_accumulate() {
        let mut scene = SimScene::builder().build();
        let cube = scene.spawn(Vec3::zero()).unwrap();
        scene.apply_force(cube, Vec3::new(0.0, 30.0, 0.0)).unwrap();
        scene.apply_force(cube, Vec3::new(0.0, 30.0, 0.0)).unwrap();
        assert_eq!(
            scene.object(cube).unwrap().accumulated_force,
            Vec3::new(0.0, 60.0, 0.0)
        );
    }

    #[test]
    fn clear_journal_keeps_state() {
        let mut scene = SimScene::builder().build();
        scene.spawn(Vec3::zero()).unwrap();
        scene.clear_journal();
        assert!(scene.journal().is_empty());
        assert_eq!(scene.object_count(), 1);
    }
}
