//! Ray/plane picking for controller pointers.
//!
//! - [`Ray`]: origin and direction, usually taken from a tracked controller pose
//! - [`Plane`]: a normal and a point on the plane
//! - [`intersect`]: the pure ray/plane test, returning a [`CollisionResult`]
//! - [`PlanarCollider`]: a plane bound to a scene node, declared in the node's
//!   untransformed local frame and moved into world space on every cast
//!
//! # Sign convention
//!
//! [`CollisionResult::point_of_interest`] is the *negated* distance along the
//! ray. A hit in front of the ray origin reports a negative value; a hit behind
//! it reports a positive one. Pointer code branches on this sign to decide
//! whether the cursor is shown.
//!
//! ```
//! use carnival::{Plane, Ray, Vec3, intersect};
//!
//! let floor = Plane::new(Vec3::Y, Vec3::ZERO);
//! let ray = Ray::new(Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.0, -1.0, -1.0));
//!
//! let hit = intersect(&ray, &floor);
//! assert!(hit.is_forward_hit());
//! assert!(hit.point_of_interest < 0.0);
//! ```

use crate::ecs::Shape;
use crate::error::SceneError;
use crate::scene::SceneGraph;
use glam::{Mat4, Quat, Vec2, Vec3};
use hecs::Entity;

/// Below this `|normal · direction|` the ray counts as parallel to the plane.
pub const PARALLEL_EPSILON: f32 = 1e-6;

/// A ray in 3D space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    /// Create a ray; the direction is normalized.
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    /// Ray along the local -Z axis of a tracked pose.
    pub fn from_pose(position: Vec3, orientation: Quat) -> Self {
        Self::new(position, orientation * Vec3::NEG_Z)
    }

    /// Point at parameter `t` along the ray.
    #[inline]
    pub fn point_at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// An infinite plane.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Plane {
    pub normal: Vec3,
    pub point: Vec3,
}

impl Plane {
    pub fn new(normal: Vec3, point: Vec3) -> Self {
        Self { normal, point }
    }

    /// The plane of a [`Shape::Rectangle`] in its own local frame: z = 0, facing -Z.
    pub fn rectangle_local() -> Self {
        Self::new(Vec3::NEG_Z, Vec3::ZERO)
    }

    /// Move the plane through an affine transform.
    ///
    /// Normals go through the inverse transpose so non-uniform scale keeps
    /// them perpendicular.
    pub fn transformed(&self, matrix: Mat4) -> Self {
        let normal = matrix
            .inverse()
            .transpose()
            .transform_vector3(self.normal)
            .normalize_or_zero();
        Self {
            normal,
            point: matrix.transform_point3(self.point),
        }
    }

    /// Signed distance from `point` to the plane, in units of the normal's length.
    pub fn signed_distance(&self, point: Vec3) -> f32 {
        self.normal.dot(point - self.point)
    }
}

/// Outcome of a ray/plane test.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CollisionResult {
    /// Negated parametric distance to the intersection. Negative means in front.
    pub point_of_interest: f32,
    /// World-space intersection, `None` when the ray is parallel to the plane.
    pub collision_point: Option<Vec3>,
}

impl CollisionResult {
    /// No intersection. The point of interest is non-negative so sign checks fail.
    pub const MISS: Self = Self {
        point_of_interest: f32::INFINITY,
        collision_point: None,
    };

    /// True for an intersection in front of the ray origin.
    pub fn is_forward_hit(&self) -> bool {
        self.collision_point.is_some() && self.point_of_interest < 0.0
    }

    /// The hit point, only for forward hits.
    pub fn forward_point(&self) -> Option<Vec3> {
        self.collision_point.filter(|_| self.point_of_interest < 0.0)
    }
}

/// Intersect `ray` with `plane`. Both must be expressed in the same frame.
///
/// A parallel ray is not an error; it returns [`CollisionResult::MISS`].
pub fn intersect(ray: &Ray, plane: &Plane) -> CollisionResult {
    let denom = plane.normal.dot(ray.direction);
    if denom.abs() < PARALLEL_EPSILON {
        return CollisionResult::MISS;
    }
    let t = plane.normal.dot(plane.point - ray.origin) / denom;
    CollisionResult {
        point_of_interest: -t,
        collision_point: Some(ray.point_at(t)),
    }
}

/// A plane collider attached to a scene node.
///
/// The plane is stored in the target's local, untransformed frame and carried
/// into world space with the target's current world transform on each cast,
/// so rotating the target (e.g. laying a rectangle flat as a floor) needs no
/// matching edit to the collider.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlanarCollider {
    target: Entity,
    local_plane: Plane,
    /// Local XY extents; hits outside are reported as misses.
    bounds: Option<(Vec2, Vec2)>,
}

impl PlanarCollider {
    /// Collider for an explicit local-frame plane.
    pub fn new(target: Entity, local_plane: Plane) -> Self {
        Self {
            target,
            local_plane,
            bounds: None,
        }
    }

    /// Derive the plane from the target's rectangle geometry.
    pub fn for_rectangle(graph: &SceneGraph, target: Entity) -> Result<Self, SceneError> {
        let shape = graph
            .world()
            .get::<&Shape>(target)
            .map_err(|_| SceneError::NotPlanar(target))?;
        match &*shape {
            Shape::Rectangle { .. } => Ok(Self::new(target, Plane::rectangle_local())),
            _ => Err(SceneError::NotPlanar(target)),
        }
    }

    /// Restrict hits to the target rectangle's extents.
    ///
    /// Only meaningful for colliders built with [`for_rectangle`](Self::for_rectangle).
    pub fn bounded(mut self, graph: &SceneGraph) -> Self {
        if let Ok(shape) = graph.world().get::<&Shape>(self.target) {
            if let Shape::Rectangle { min, max, .. } = &*shape {
                self.bounds = Some((*min, *max));
            }
        }
        self
    }

    pub fn target(&self) -> Entity {
        self.target
    }

    pub fn local_plane(&self) -> Plane {
        self.local_plane
    }

    /// The plane in world space, given the target's current placement.
    pub fn world_plane(&self, graph: &SceneGraph) -> Result<Plane, SceneError> {
        let matrix = graph.world_transform(self.target)?;
        Ok(self.local_plane.transformed(matrix))
    }

    /// Cast a world-space ray against this collider.
    pub fn cast(&self, graph: &SceneGraph, ray: &Ray) -> Result<CollisionResult, SceneError> {
        let matrix = graph.world_transform(self.target)?;
        let result = intersect(ray, &self.local_plane.transformed(matrix));

        if let (Some((min, max)), Some(point)) = (self.bounds, result.collision_point) {
            let local = matrix.inverse().transform_point3(point);
            let inside =
                local.x >= min.x && local.x <= max.x && local.y >= min.y && local.y <= max.y;
            if !inside {
                return Ok(CollisionResult::MISS);
            }
        }
        Ok(result)
    }
}
