//! [`ObjectRegistry`] – ownership bookkeeping for transient scene objects.
//!
//! Every object the gesture engine spawns is recorded here until it is
//! explicitly cleared.  The registry has no capacity bound: repeatedly
//! spawning without clearing grows it without limit, and objects that are
//! never cleared persist for the life of the session.
//!
//! The registry only stores handles.  Destroying objects and applying forces
//! go through the [`SceneSink`] that created them.

use handlink_rig::Vec3;
use handlink_types::{HandError, ObjectId};
use tracing::warn;

use crate::sink::SceneSink;

/// Ordered set of spawned objects owned by the simulation context.
#[derive(Debug, Default)]
pub struct ObjectRegistry {
    objects: Vec<ObjectId>,
}

impl ObjectRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record ownership of a newly spawned object.
    pub fn add(&mut self, object: ObjectId) {
        self.objects.push(object);
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn contains(&self, object: ObjectId) -> bool {
        self.objects.contains(&object)
    }

    /// Tracked objects, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.objects.iter().copied()
    }

    /// Destroy every tracked object through `scene` and empty the registry.
    ///
    /// A failed destroy is logged and the handle is dropped anyway: the
    /// registry never keeps an object it cannot account for.  Returns the
    /// number of objects the scene confirmed destroyed.
    pub fn clear(&mut self, scene: &mut dyn SceneSink) -> usize {
        let mut destroyed = 0;
        for object in self.objects.drain(..) {
            match scene.destroy(object) {
                Ok(()) => destroyed += 1,
                Err(e) => {
                    warn!(object = %object, error = %e, "destroy failed during registry clear")
                }
            }
        }
        destroyed
    }

    /// Apply `action` to every tracked object, oldest first.
    ///
    /// Errors from individual objects are logged and do not stop the batch.
    /// Returns the number of objects for which `action` succeeded.
    pub fn for_each<F>(&self, mut action: F) -> usize
    where
        F: FnMut(ObjectId) -> Result<(), HandError>,
    {
        let mut applied = 0;
        for object in self.iter() {
            match action(object) {
                Ok(()) => applied += 1,
                Err(e) => warn!(object = %object, error = %e, "registry action failed"),
            }
        }
        applied
    }

    /// Push every tracked object with the same instantaneous `force`.
    pub fn apply_force_all(&self, scene: &mut dyn SceneSink, force: Vec3) -> usize {
        self.for_each(|object| scene.apply_force(object, force))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{SceneOp, SimScene};

    fn spawn_n(scene: &mut SimScene, registry: &mut ObjectRegistry, n: usize) {
        for i in 0..n {
            let id = scene.spawn(Vec3::new(i as f32, 0.0, 0.0)).unwrap();
            registry.add(id);
        }
    }

    #[test]
    fn add_tracks_objects_in_order() {
        let mut scene = SimScene::builder().build();
        let mut registry = ObjectRegistry::new();
        assert!(registry.is_empty());

        let a = scene.spawn(Vec3::zero()).unwrap();
        let b = scene.spawn(Vec3::zero()).unwrap();
        registry.add(a);
        registry.add(b);

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.iter().collect::<Vec<_>>(), vec![a, b]);
        assert!(registry.contains(a));
    }

    #[test]
    fn clear_destroys_everything_and_empties() {
        let mut scene = SimScene::builder().build();
        let mut registry = ObjectRegistry::new();
        spawn_n(&mut scene, &mut registry, 5);

        let destroyed = registry.clear(&mut scene);

        assert_eq!(destroyed, 5);
        assert!(registry.is_empty());
        assert_eq!(scene.object_count(), 0);
    }

    #[test]
    fn clear_drops_handles_the_scene_already_lost() {
        let mut scene = SimScene::builder().build();
        let mut registry = ObjectRegistry::new();
        spawn_n(&mut scene, &mut registry, 2);

        // The host destroyed one object behind the registry's back.
        let first = registry.iter().next().unwrap();
        scene.destroy(first).unwrap();

        let destroyed = registry.clear(&mut scene);
        assert_eq!(destroyed, 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn clear_on_empty_registry_is_noop() {
        let mut scene = SimScene::builder().build();
        let mut registry = ObjectRegistry::new();
        assert_eq!(registry.clear(&mut scene), 0);
        assert!(scene.journal().is_empty());
    }

    #[test]
    fn apply_force_all_pushes_every_object() {
        let mut scene = SimScene::builder().build();
        let mut registry = ObjectRegistry::new();
        spawn_n(&mut scene, &mut registry, 3);

        let pushed = registry.apply_force_all(&mut scene, Vec3::new(0.0, 30.0, 0.0));

        assert_eq!(pushed, 3);
        for object in registry.iter() {
            let state = scene.object(object).unwrap();
            assert_eq!(state.accumulated_force, Vec3::new(0.0, 30.0, 0.0));
        }
        let forces = scene
            .journal()
            .iter()
            .filter(|op| matches!(op, SceneOp::Force { .. }))
            .count();
        assert_eq!(forces, 3);
    }

    #[test]
    fn for_each_continues_past_failures() {
        let registry = {
            let mut r = ObjectRegistry::new();
            r.add(ObjectId::new());
            r.add(ObjectId::new());
            r.add(ObjectId::new());
            r
        };
        let mut calls = 0;
        let applied = registry.for_each(|_| {
            calls += 1;
            if calls == 2 {
                Err(HandError::Scene {
                    target: "object".to_string(),
                    details: "gone".to_string(),
                })
            } else {
                Ok(())
            }
        });
        assert_eq!(calls, 3);
        assert_eq!(applied, 2);
    }
}
