//! Controller pointers: a ray from a tracked controller, a set of colliders,
//! and a cursor node parked on the nearest forward hit.

use crate::error::SceneError;
use crate::picking::{CollisionResult, PlanarCollider, Ray};
use crate::scene::{CURSOR_LABEL, SceneGraph};
use glam::Vec3;

/// Settings for a [`Pointer`].
///
/// ```
/// use carnival::PointerConfig;
///
/// let config = PointerConfig::new(1).cursor_label("teleport_cursor");
/// assert_eq!(config.controller, 1);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct PointerConfig {
    /// Index of the controller whose pose drives the ray.
    pub controller: usize,
    /// Label of the node that follows hits.
    pub cursor_label: String,
}

impl PointerConfig {
    pub fn new(controller: usize) -> Self {
        Self {
            controller,
            cursor_label: CURSOR_LABEL.to_string(),
        }
    }

    pub fn cursor_label(mut self, label: impl Into<String>) -> Self {
        self.cursor_label = label.into();
        self
    }
}

/// Casts one controller's ray each frame and moves the cursor to the hit.
///
/// The cursor is looked up by label on every update, so it may be spawned
/// after the pointer is registered.
#[derive(Clone, Debug)]
pub struct Pointer {
    config: PointerConfig,
    colliders: Vec<PlanarCollider>,
    last_hit: Option<CollisionResult>,
}

impl Pointer {
    pub fn new(config: PointerConfig) -> Self {
        Self {
            config,
            colliders: Vec::new(),
            last_hit: None,
        }
    }

    pub fn collider(mut self, collider: PlanarCollider) -> Self {
        self.colliders.push(collider);
        self
    }

    pub fn add_collider(&mut self, collider: PlanarCollider) {
        self.colliders.push(collider);
    }

    pub fn controller(&self) -> usize {
        self.config.controller
    }

    pub fn config(&self) -> &PointerConfig {
        &self.config
    }

    pub fn colliders(&self) -> &[PlanarCollider] {
        &self.colliders
    }

    /// The hit chosen by the latest update, if any.
    pub fn last_hit(&self) -> Option<CollisionResult> {
        self.last_hit
    }

    /// Nearest forward hit across all colliders.
    ///
    /// Colliders whose target has been removed are skipped.
    pub fn pick(&self, graph: &SceneGraph, ray: &Ray) -> Option<CollisionResult> {
        self.colliders
            .iter()
            .filter_map(|collider| match collider.cast(graph, ray) {
                Ok(result) => Some(result),
                Err(err) => {
                    log::debug!("collider skipped: {}", err);
                    None
                }
            })
            .filter(CollisionResult::is_forward_hit)
            // Forward hits are negative; the nearest is the one closest to zero.
            .max_by(|a, b| a.point_of_interest.total_cmp(&b.point_of_interest))
    }

    /// Cast `ray` and place the cursor.
    ///
    /// On a forward hit the cursor moves to the collision point and is shown.
    /// Otherwise it is hidden where it is. Returns the world-space hit point.
    pub fn update(
        &mut self,
        graph: &mut SceneGraph,
        ray: &Ray,
    ) -> Result<Option<Vec3>, SceneError> {
        let cursor = graph.expect_label(&self.config.cursor_label)?;
        self.last_hit = self.pick(graph, ray);

        let point = self.last_hit.and_then(|hit| hit.forward_point());
        match point {
            Some(point) => {
                let local = match graph.parent(cursor) {
                    Some(parent) => {
                        graph.world_transform(parent)?.inverse().transform_point3(point)
                    }
                    None => point,
                };
                graph.set_position(cursor, local)?;
                graph.set_hidden(cursor, false)?;
            }
            None => graph.set_hidden(cursor, true)?,
        }
        Ok(point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::Shape;
    use crate::scene::{HIDDEN_POSITION, NodeDesc};
    use glam::{Quat, Vec2};
    use std::f32::consts::FRAC_PI_2;

    struct Rig {
        graph: SceneGraph,
        pointer: Pointer,
    }

    fn rig() -> Rig {
        let mut graph = SceneGraph::new();
        let floor = graph.spawn(
            NodeDesc::at(Vec3::new(0.0, -0.02, 0.0))
                .rotation(Vec3::new(270f32.to_radians(), 0.0, 0.0))
                .shape(Shape::rectangle(Vec2::splat(-10.0), Vec2::splat(10.0)))
                .label("floor"),
        );
        let wall = graph.spawn(
            NodeDesc::at(Vec3::new(0.0, 0.0, -3.0))
                .shape(Shape::rectangle(Vec2::splat(-2.0), Vec2::splat(2.0)))
                .label("wall"),
        );
        graph.spawn(
            NodeDesc::at(HIDDEN_POSITION)
                .shape(Shape::cube(0.05))
                .label(CURSOR_LABEL)
                .hidden(true),
        );

        let pointer = Pointer::new(PointerConfig::new(0))
            .collider(PlanarCollider::for_rectangle(&graph, floor).unwrap())
            .collider(PlanarCollider::for_rectangle(&graph, wall).unwrap().bounded(&graph));
        Rig { graph, pointer }
    }

    #[test]
    fn cursor_follows_floor_hit() {
        let Rig { mut graph, mut pointer } = rig();
        let ray = Ray::new(Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.0, -1.0, -1.0));

        let point = pointer.update(&mut graph, &ray).unwrap().unwrap();

        assert!(point.abs_diff_eq(Vec3::new(0.0, -0.02, -1.02), 1e-4));
        let cursor = graph.expect_label(CURSOR_LABEL).unwrap();
        assert!(graph.world_position(cursor).unwrap().abs_diff_eq(point, 1e-5));
        assert!(graph.is_visible(cursor));
    }

    #[test]
    fn nearest_forward_hit_wins() {
        let Rig { mut graph, mut pointer } = rig();
        // Shallow enough to reach the wall before the floor.
        let ray = Ray::new(Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.0, -0.1, -1.0));

        let point = pointer.update(&mut graph, &ray).unwrap().unwrap();

        assert!((point.z + 3.0).abs() < 1e-4);
        assert!(pointer.last_hit().unwrap().point_of_interest < 0.0);
    }

    #[test]
    fn pointing_away_hides_the_cursor() {
        let Rig { mut graph, mut pointer } = rig();
        pointer
            .update(&mut graph, &Ray::new(Vec3::Y, Vec3::new(0.0, -1.0, -1.0)))
            .unwrap();
        let cursor = graph.expect_label(CURSOR_LABEL).unwrap();
        let before = graph.world_position(cursor).unwrap();

        let up = Ray::from_pose(Vec3::Y, Quat::from_rotation_x(FRAC_PI_2));
        assert_eq!(pointer.update(&mut graph, &up).unwrap(), None);

        assert!(graph.is_hidden(cursor));
        assert_eq!(graph.world_position(cursor).unwrap(), before);
    }

    #[test]
    fn cursor_under_a_parent_lands_on_the_hit() {
        let mut graph = SceneGraph::new();
        let floor = graph.spawn(
            NodeDesc::at(Vec3::ZERO)
                .rotation(Vec3::new(270f32.to_radians(), 0.0, 0.0))
                .shape(Shape::rectangle(Vec2::splat(-10.0), Vec2::splat(10.0))),
        );
        let holder = graph.spawn(NodeDesc::at(Vec3::new(5.0, 0.0, 5.0)));
        graph
            .spawn_child(holder, NodeDesc::at(Vec3::ZERO).label(CURSOR_LABEL))
            .unwrap();
        let collider = PlanarCollider::for_rectangle(&graph, floor).unwrap();
        let mut pointer = Pointer::new(PointerConfig::new(0)).collider(collider);

        let point = pointer
            .update(&mut graph, &Ray::new(Vec3::new(1.0, 1.0, 1.0), Vec3::NEG_Y))
            .unwrap()
            .unwrap();

        let cursor = graph.expect_label(CURSOR_LABEL).unwrap();
        assert!(graph.world_position(cursor).unwrap().abs_diff_eq(point, 1e-5));
    }

    #[test]
    fn missing_cursor_is_an_error() {
        let mut graph = SceneGraph::new();
        let mut pointer = Pointer::new(PointerConfig::new(0).cursor_label("nowhere"));
        assert_eq!(
            pointer.update(&mut graph, &Ray::new(Vec3::ZERO, Vec3::NEG_Z)),
            Err(SceneError::MissingLabel("nowhere".into()))
        );
    }
}
