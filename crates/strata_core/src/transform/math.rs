//! # Transform Math
//!
//! Minimal vector/quaternion types for the transform graph.
//!
//! All types are `#[repr(C)]` and `Pod`, so they can be copied straight into
//! GPU buffers by a rendering collaborator.

use std::ops::{Add, AddAssign, Mul, Neg, Sub};

use bytemuck::{Pod, Zeroable};

/// 3D vector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Vec3 {
    /// X component.
    pub x: f32,
    /// Y component.
    pub y: f32,
    /// Z component.
    pub z: f32,
}

impl Vec3 {
    /// All zeros.
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);
    /// All ones.
    pub const ONE: Self = Self::new(1.0, 1.0, 1.0);
    /// Unit X.
    pub const X: Self = Self::new(1.0, 0.0, 0.0);
    /// Unit Y.
    pub const Y: Self = Self::new(0.0, 1.0, 0.0);
    /// Unit Z.
    pub const Z: Self = Self::new(0.0, 0.0, 1.0);

    /// Creates a vector.
    #[inline]
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Creates a vector with all components set to `v`.
    #[inline]
    #[must_use]
    pub const fn splat(v: f32) -> Self {
        Self::new(v, v, v)
    }

    /// Component-wise product.
    #[inline]
    #[must_use]
    pub fn hadamard(self, other: Self) -> Self {
        Self::new(self.x * other.x, self.y * other.y, self.z * other.z)
    }

    /// Dot product.
    #[inline]
    #[must_use]
    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Cross product.
    #[inline]
    #[must_use]
    pub fn cross(self, other: Self) -> Self {
        Self::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    /// Squared length.
    ///
    /// This avoids the sqrt call for length comparisons.
    #[inline]
    #[must_use]
    pub fn length_squared(self) -> f32 {
        self.dot(self)
    }

    /// Length.
    #[inline]
    #[must_use]
    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    /// Whether every component is within `epsilon` of `other`'s.
    #[must_use]
    pub fn approx_eq(self, other: Self, epsilon: f32) -> bool {
        (self.x - other.x).abs() <= epsilon
            && (self.y - other.y).abs() <= epsilon
            && (self.z - other.z).abs() <= epsilon
    }
}

impl Add for Vec3 {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl AddAssign for Vec3 {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for Vec3 {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f32> for Vec3 {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Neg for Vec3 {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

impl From<[f32; 3]> for Vec3 {
    fn from([x, y, z]: [f32; 3]) -> Self {
        Self::new(x, y, z)
    }
}

/// Rotation quaternion `(x, y, z, w)`.
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Quat {
    /// Vector part X.
    pub x: f32,
    /// Vector part Y.
    pub y: f32,
    /// Vector part Z.
    pub z: f32,
    /// Scalar part.
    pub w: f32,
}

impl Default for Quat {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Quat {
    /// No rotation.
    pub const IDENTITY: Self = Self::from_xyzw(0.0, 0.0, 0.0, 1.0);

    /// Creates a quaternion from raw components.
    #[inline]
    #[must_use]
    pub const fn from_xyzw(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    /// Rotation of `angle` radians around `axis` (normalized here).
    #[must_use]
    pub fn from_axis_angle(axis: Vec3, angle: f32) -> Self {
        let len = axis.length();
        if len <= f32::EPSILON {
            return Self::IDENTITY;
        }
        let axis = axis * (1.0 / len);
        let (sin, cos) = (angle * 0.5).sin_cos();
        Self::from_xyzw(axis.x * sin, axis.y * sin, axis.z * sin, cos)
    }

    /// Rotation around the Y axis.
    #[must_use]
    pub fn from_rotation_y(angle: f32) -> Self {
        Self::from_axis_angle(Vec3::Y, angle)
    }

    /// Rotation around the Z axis.
    #[must_use]
    pub fn from_rotation_z(angle: f32) -> Self {
        Self::from_axis_angle(Vec3::Z, angle)
    }

    /// Inverse rotation for unit quaternions.
    #[inline]
    #[must_use]
    pub fn conjugate(self) -> Self {
        Self::from_xyzw(-self.x, -self.y, -self.z, self.w)
    }

    /// Scales to unit length; degenerate input yields identity.
    #[must_use]
    pub fn normalize(self) -> Self {
        let len = (self.x * self.x + self.y * self.y + self.z * self.z + self.w * self.w).sqrt();
        if len <= f32::EPSILON {
            return Self::IDENTITY;
        }
        let inv = 1.0 / len;
        Self::from_xyzw(self.x * inv, self.y * inv, self.z * inv, self.w * inv)
    }

    /// Rotates `v`.
    #[inline]
    #[must_use]
    pub fn rotate(self, v: Vec3) -> Vec3 {
        let q = Vec3::new(self.x, self.y, self.z);
        let t = q.cross(v) * 2.0;
        v + t * self.w + q.cross(t)
    }

    /// Whether every component is within `epsilon` of `other`'s.
    #[must_use]
    pub fn approx_eq(self, other: Self, epsilon: f32) -> bool {
        (self.x - other.x).abs() <= epsilon
            && (self.y - other.y).abs() <= epsilon
            && (self.z - other.z).abs() <= epsilon
            && (self.w - other.w).abs() <= epsilon
    }
}

impl Mul for Quat {
    type Output = Self;

    /// Hamilton product: `self * rhs` applies `rhs` first.
    #[inline]
    fn mul(self, rhs: Self) -> Self {
        Self::from_xyzw(
            self.w * rhs.x + self.x * rhs.w + self.y * rhs.z - self.z * rhs.y,
            self.w * rhs.y - self.x * rhs.z + self.y * rhs.w + self.z * rhs.x,
            self.w * rhs.z + self.x * rhs.y - self.y * rhs.x + self.z * rhs.w,
            self.w * rhs.w - self.x * rhs.x - self.y * rhs.y - self.z * rhs.z,
        )
    }
}

impl Mul<Vec3> for Quat {
    type Output = Vec3;

    #[inline]
    fn mul(self, rhs: Vec3) -> Vec3 {
        self.rotate(rhs)
    }
}

/// Translation, rotation and scale.
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Trs {
    /// Position.
    pub translation: Vec3,
    /// Orientation.
    pub rotation: Quat,
    /// Per-axis scale.
    pub scale: Vec3,
}

impl Default for Trs {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Trs {
    /// Origin, no rotation, unit scale.
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    /// Creates a TRS.
    #[must_use]
    pub const fn new(translation: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self {
            translation,
            rotation,
            scale,
        }
    }

    /// Pure translation.
    #[must_use]
    pub const fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }

    /// Places `local` in the space described by `self` (the parent's world
    /// transform).
    ///
    /// - translation: `parent.t + parent.r * (parent.s ⊙ local.t)`
    /// - rotation: `parent.r * local.r`
    /// - scale: `parent.s ⊙ local.s`
    #[inline]
    #[must_use]
    pub fn compose(&self, local: &Self) -> Self {
        Self {
            translation: self.translation
                + self.rotation.rotate(self.scale.hadamard(local.translation)),
            rotation: self.rotation * local.rotation,
            scale: self.scale.hadamard(local.scale),
        }
    }

    /// Transforms a point from local to this space.
    #[must_use]
    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.translation + self.rotation.rotate(self.scale.hadamard(point))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    const EPS: f32 = 1e-5;

    #[test]
    fn test_pod_layout() {
        assert_eq!(std::mem::size_of::<Vec3>(), 12);
        assert_eq!(std::mem::size_of::<Quat>(), 16);
        assert_eq!(std::mem::size_of::<Trs>(), 40);
        let bytes = bytemuck::bytes_of(&Trs::IDENTITY);
        assert_eq!(bytes.len(), 40);
    }

    #[test]
    fn test_rotate_quarter_turn() {
        let q = Quat::from_rotation_z(FRAC_PI_2);
        assert!(q.rotate(Vec3::X).approx_eq(Vec3::Y, EPS));
        assert!((q * Vec3::Y).approx_eq(-Vec3::X, EPS));
    }

    #[test]
    fn test_quat_composition_order() {
        let a = Quat::from_rotation_z(FRAC_PI_2);
        let b = Quat::from_rotation_y(FRAC_PI_2);
        let v = Vec3::X;
        assert!((a * b).rotate(v).approx_eq(a.rotate(b.rotate(v)), EPS));
        assert!((a * a.conjugate()).approx_eq(Quat::IDENTITY, EPS));
    }

    #[test]
    fn test_compose_identity_parent() {
        let local = Trs::new(Vec3::new(1.0, 2.0, 3.0), Quat::from_rotation_y(0.3), Vec3::splat(2.0));
        assert_eq!(Trs::IDENTITY.compose(&local), local);
    }

    #[test]
    fn test_compose_formula() {
        let parent = Trs::new(
            Vec3::new(10.0, 0.0, 0.0),
            Quat::from_rotation_z(FRAC_PI_2),
            Vec3::splat(2.0),
        );
        let local = Trs::from_translation(Vec3::new(1.0, 0.0, 0.0));
        let world = parent.compose(&local);
        // 10 + rot90(2 * 1, 0, 0) = (10, 2, 0)
        assert!(world.translation.approx_eq(Vec3::new(10.0, 2.0, 0.0), EPS));
        assert_eq!(world.scale, Vec3::splat(2.0));
        assert!(world.rotation.approx_eq(parent.rotation, EPS));
    }

    #[test]
    fn test_degenerate_inputs() {
        assert_eq!(Quat::from_axis_angle(Vec3::ZERO, 1.0), Quat::IDENTITY);
        assert_eq!(Quat::from_xyzw(0.0, 0.0, 0.0, 0.0).normalize(), Quat::IDENTITY);
    }
}
