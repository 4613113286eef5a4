//! Local transforms for scene graph nodes.

use glam::{EulerRot, Mat4, Quat, Vec3};

/// A local transform: translation, rotation and scale relative to the parent.
///
/// # Example
///
/// ```
/// use carnival::{Transform, Vec3};
///
/// let transform = Transform::from_position(Vec3::new(1.0, 2.0, 3.0));
/// assert_eq!(transform.position, Vec3::new(1.0, 2.0, 3.0));
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    /// Translation relative to the parent frame.
    pub position: Vec3,
    /// Rotation as a unit quaternion.
    pub rotation: Quat,
    /// Scale factors for each axis.
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    /// Identity transform (origin, no rotation, unit scale).
    pub fn new() -> Self {
        Self::default()
    }

    /// Transform positioned at the given location with no rotation or scale.
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    pub fn position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    /// Sets the rotation from Euler angles in radians, applied X then Y then Z.
    ///
    /// ```
    /// use carnival::{Transform, Vec3};
    ///
    /// // Lay a rectangle flat on the ground
    /// let floor = Transform::new().euler(Vec3::new(270f32.to_radians(), 0.0, 0.0));
    /// ```
    pub fn euler(mut self, angles: Vec3) -> Self {
        self.rotation = Quat::from_euler(EulerRot::XYZ, angles.x, angles.y, angles.z);
        self
    }

    pub fn scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    pub fn uniform_scale(mut self, scale: f32) -> Self {
        self.scale = Vec3::splat(scale);
        self
    }

    /// The local matrix, applied in SRT order (scale, rotate, translate).
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }
}
