//! Rig transform primitives.
//!
//! A [`Pose`] is the position + orientation of one bone or root target.
//! Glove updates arrive as *changes*, so the two operations that matter are
//! [`Pose::rotate_local`] and [`Pose::translate_local`]: both act in the
//! target's own frame, the same way a scene graph applies a self-space
//! rotate/translate.
//!
//! # Example
//!
//! ```rust
//! use handlink_rig::transform::{Pose, Vec3};
//! use handlink_types::Axis;
//!
//! let mut wrist = Pose::identity();
//! // Yaw the wrist 90° then move 1 unit "forward" along its own X axis.
//! wrist.rotate_local(Axis::Z, 90.0);
//! wrist.translate_local(Vec3::new(1.0, 0.0, 0.0));
//!
//! assert!(wrist.position.x.abs() < 1e-5);
//! assert!((wrist.position.y - 1.0).abs() < 1e-5);
//! ```

use handlink_types::Axis;
use serde::{Deserialize, Serialize};

// ────────────────────────────────────────────────────────────────────────────
// Primitive types
// ────────────────────────────────────────────────────────────────────────────

/// A 3-D vector (positions, offsets, forces).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub const fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// Unit vector along `axis`.
    pub fn unit(axis: Axis) -> Self {
        match axis {
            Axis::X => Self::new(1.0, 0.0, 0.0),
            Axis::Y => Self::new(0.0, 1.0, 0.0),
            Axis::Z => Self::new(0.0, 0.0, 1.0),
        }
    }

    pub fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }

    pub fn scale(self, k: f32) -> Self {
        Self::new(self.x * k, self.y * k, self.z * k)
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

/// A unit quaternion representing a 3-D rotation (w, x, y, z convention).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub w: f32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Quaternion {
    /// Create a quaternion.  The caller is responsible for providing a unit
    /// quaternion (|q| = 1).
    pub const fn new(w: f32, x: f32, y: f32, z: f32) -> Self {
        Self { w, x, y, z }
    }

    pub const fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 0.0)
    }

    /// Rotation of `degrees` about a principal `axis`.
    pub fn from_axis_deg(axis: Axis, degrees: f32) -> Self {
        let half = degrees.to_radians() * 0.5;
        let (s, c) = half.sin_cos();
        match axis {
            Axis::X => Self::new(c, s, 0.0, 0.0),
            Axis::Y => Self::new(c, 0.0, s, 0.0),
            Axis::Z => Self::new(c, 0.0, 0.0, s),
        }
    }

    /// Hamilton product: `self` followed by `rhs` in `self`'s frame.
    pub fn mul(self, rhs: Self) -> Self {
        Self::new(
            self.w * rhs.w - self.x * rhs.x - self.y * rhs.y - self.z * rhs.z,
            self.w * rhs.x + self.x * rhs.w + self.y * rhs.z - self.z * rhs.y,
            self.w * rhs.y - self.x * rhs.z + self.y * rhs.w + self.z * rhs.x,
            self.w * rhs.z + self.x * rhs.y - self.y * rhs.x + self.z * rhs.w,
        )
    }

    /// Conjugate (== inverse for a unit quaternion).
    pub fn conjugate(self) -> Self {
        Self::new(self.w, -self.x, -self.y, -self.z)
    }

    /// Rotate a vector by this quaternion: p' = q * p * q*.
    pub fn rotate(self, v: Vec3) -> Vec3 {
        let p = Self::new(0.0, v.x, v.y, v.z);
        let rotated = self.mul(p).mul(self.conjugate());
        Vec3::new(rotated.x, rotated.y, rotated.z)
    }

    /// Renormalise to unit length.  Long runs of small incremental rotations
    /// accumulate floating-point drift.
    pub fn normalized(self) -> Self {
        let n = (self.w * self.w + self.x * self.x + self.y * self.y + self.z * self.z).sqrt();
        if n <= f32::EPSILON {
            return Self::identity();
        }
        Self::new(self.w / n, self.x / n, self.y / n, self.z / n)
    }

    /// Smallest rotation angle (degrees) between `self` and `other`.
    pub fn angle_to_deg(self, other: Self) -> f32 {
        // atan2 rather than acos(dot): must resolve sub-millidegree angles.
        let rel = self.conjugate().mul(other);
        let v = (rel.x * rel.x + rel.y * rel.y + rel.z * rel.z).sqrt();
        (2.0 * v.atan2(rel.w.abs())).to_degrees()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Pose
// ────────────────────────────────────────────────────────────────────────────

/// Position and orientation of a rig target in its parent's space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vec3,
    pub rotation: Quaternion,
}

impl Pose {
    pub fn new(position: Vec3, rotation: Quaternion) -> Self {
        Self { position, rotation }
    }

    pub fn identity() -> Self {
        Self::new(Vec3::zero(), Quaternion::identity())
    }

    /// Rotate by `degrees` about the target's own `axis`.
    pub fn rotate_local(&mut self, axis: Axis, degrees: f32) {
        self.rotation = self
            .rotation
            .mul(Quaternion::from_axis_deg(axis, degrees))
            .normalized();
    }

    /// Move by `offset` expressed in the target's own frame.
    pub fn translate_local(&mut self, offset: Vec3) {
        self.position = self.position.add(self.rotation.rotate(offset));
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_1_SQRT_2;

    #[test]
    fn quaternion_identity_rotate_is_noop() {
        let r = Quaternion::identity().rotate(Vec3::new(1.0, 2.0, 3.0));
        assert!((r.x - 1.0).abs() < 1e-5);
        assert!((r.y - 2.0).abs() < 1e-5);
        assert!((r.z - 3.0).abs() < 1e-5);
    }

    #[test]
    fn from_axis_deg_matches_half_angle_form() {
        let q = Quaternion::from_axis_deg(Axis::Z, 90.0);
        assert!((q.w - FRAC_1_SQRT_2).abs() < 1e-5);
        assert!((q.z - FRAC_1_SQRT_2).abs() < 1e-5);
        assert!(q.x.abs() < 1e-6 && q.y.abs() < 1e-6);
    }

    #[test]
    fn quaternion_conjugate_is_inverse() {
        let q = Quaternion::from_axis_deg(Axis::Y, 37.0);
        let prod = q.mul(q.conjugate());
        assert!((prod.w - 1.0).abs() < 1e-5);
        assert!(prod.x.abs() < 1e-5);
        assert!(prod.y.abs() < 1e-5);
        assert!(prod.z.abs() < 1e-5);
    }

    #[test]
    fn angle_to_deg_measures_rotation() {
        let q = Quaternion::from_axis_deg(Axis::X, -38.9);
        let angle = Quaternion::identity().angle_to_deg(q);
        assert!((angle - 38.9).abs() < 1e-3, "angle={angle}");
    }

    #[test]
    fn rotate_local_accumulates() {
        let mut pose = Pose::identity();
        pose.rotate_local(Axis::Z, 30.0);
        pose.rotate_local(Axis::Z, 15.0);
        let expected = Quaternion::from_axis_deg(Axis::Z, 45.0);
        assert!(pose.rotation.angle_to_deg(expected) < 1e-3);
    }

    #[test]
    fn rotate_local_then_reverse_returns_to_start() {
        let mut pose = Pose::identity();
        pose.rotate_local(Axis::X, 72.5);
        pose.rotate_local(Axis::X, -72.5);
        assert!(pose.rotation.angle_to_deg(Quaternion::identity()) < 1e-3);
    }

    #[test]
    fn translate_local_follows_orientation() {
        // Yawed 90° about Z, local +X points along world +Y.
        let mut pose = Pose::identity();
        pose.rotate_local(Axis::Z, 90.0);
        pose.translate_local(Vec3::new(2.0, 0.0, 0.0));
        assert!(pose.position.x.abs() < 1e-5, "x={}", pose.position.x);
        assert!((pose.position.y - 2.0).abs() < 1e-5, "y={}", pose.position.y);
        assert!(pose.position.z.abs() < 1e-5);
    }

    #[test]
    fn translate_local_identity_adds() {
        let mut pose = Pose::new(Vec3::new(1.0, 1.0, 1.0), Quaternion::identity());
        pose.translate_local(Vec3::new(0.0, 0.5, -1.0));
        assert_eq!(pose.position, Vec3::new(1.0, 1.5, 0.0));
    }

    #[test]
    fn vec3_helpers() {
        assert_eq!(Vec3::unit(Axis::Y), Vec3::new(0.0, 1.0, 0.0));
        assert_eq!(Vec3::new(1.0, -2.0, 3.0).scale(2.0), Vec3::new(2.0, -4.0, 6.0));
        assert!((Vec3::new(3.0, 4.0, 0.0).length() - 5.0).abs() < 1e-6);
    }
}
