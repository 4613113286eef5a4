//! Scene graph: container nodes with relative transforms, stored in a `hecs` world.
//!
//! Nodes are attached exactly once. [`SceneGraph::add_child`] refuses to move a
//! node that already has a parent and refuses to close a loop, so the graph is
//! always a forest. All traversals are depth-first, visiting roots and children
//! in insertion order, which keeps group membership stable between calls.

use crate::ecs::{Appearance, Behaviour, Group, Hierarchy, Label, Shape, Visibility};
use crate::error::SceneError;
use crate::transform::Transform;
use glam::{Mat4, Quat, Vec3};
use hecs::{Entity, EntityBuilder, World};

/// Everything needed to spawn a node. Only the transform is mandatory.
#[derive(Clone, Debug, Default)]
pub struct NodeDesc {
    transform: Transform,
    shape: Option<Shape>,
    label: Option<String>,
    group: Option<String>,
    appearance: Option<Appearance>,
    behaviour: Option<Behaviour>,
    hidden: bool,
}

impl NodeDesc {
    /// A node at `position` relative to its eventual parent.
    pub fn at(position: Vec3) -> Self {
        Self {
            transform: Transform::from_position(position),
            ..Default::default()
        }
    }

    pub fn transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    /// Euler rotation in radians (X, then Y, then Z).
    pub fn rotation(mut self, angles: Vec3) -> Self {
        self.transform = self.transform.euler(angles);
        self
    }

    pub fn shape(mut self, shape: Shape) -> Self {
        self.shape = Some(shape);
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn appearance(mut self, appearance: Appearance) -> Self {
        self.appearance = Some(appearance);
        self
    }

    pub fn behaviour(mut self, behaviour: Behaviour) -> Self {
        self.behaviour = Some(behaviour);
        self
    }

    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }
}

/// A renderable node as seen by the host renderer for one frame.
#[derive(Clone, Debug)]
pub struct RenderItem {
    pub entity: Entity,
    pub label: Option<String>,
    pub group: Option<String>,
    pub shape: Shape,
    pub appearance: Appearance,
    /// Composed world matrix (parent chain, then local).
    pub world: Mat4,
}

/// Forest of scene nodes.
pub struct SceneGraph {
    world: World,
    roots: Vec<Entity>,
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneGraph {
    pub fn new() -> Self {
        Self {
            world: World::new(),
            roots: Vec::new(),
        }
    }

    /// Spawn a new root node.
    pub fn spawn(&mut self, desc: NodeDesc) -> Entity {
        let mut builder = EntityBuilder::new();
        builder
            .add(desc.transform)
            .add(Hierarchy::default())
            .add(Visibility {
                hidden: desc.hidden,
            });
        if let Some(shape) = desc.shape {
            builder.add(shape);
        }
        if let Some(label) = desc.label {
            builder.add(Label(label));
        }
        if let Some(group) = desc.group {
            builder.add(Group(group));
        }
        if let Some(appearance) = desc.appearance {
            builder.add(appearance);
        }
        if let Some(behaviour) = desc.behaviour {
            builder.add(behaviour);
        }
        let entity = self.world.spawn(builder.build());
        self.roots.push(entity);
        entity
    }

    /// Attach `child` under `parent`.
    ///
    /// Fails if the child already has a parent, or if the attachment would make
    /// a node its own ancestor.
    pub fn add_child(&mut self, parent: Entity, child: Entity) -> Result<(), SceneError> {
        self.ensure(parent)?;
        let child_links = self.hierarchy(child)?;
        if let Some(existing) = child_links.parent {
            return Err(SceneError::AlreadyParented {
                child,
                parent: existing,
            });
        }
        if parent == child || self.ancestors(parent).contains(&child) {
            return Err(SceneError::Cycle { parent, child });
        }

        self.roots.retain(|&root| root != child);
        self.hierarchy_mut(child, |h| h.parent = Some(parent))?;
        self.hierarchy_mut(parent, |h| h.children.push(child))?;
        Ok(())
    }

    /// Spawn a node directly under `parent`.
    pub fn spawn_child(&mut self, parent: Entity, desc: NodeDesc) -> Result<Entity, SceneError> {
        self.ensure(parent)?;
        let child = self.spawn(desc);
        self.add_child(parent, child)?;
        Ok(child)
    }

    pub fn contains(&self, node: Entity) -> bool {
        self.world.contains(node)
    }

    pub fn len(&self) -> usize {
        self.world.len() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.world.is_empty()
    }

    /// Root nodes in insertion order.
    pub fn roots(&self) -> &[Entity] {
        &self.roots
    }

    pub fn parent(&self, node: Entity) -> Option<Entity> {
        self.hierarchy(node).ok().and_then(|h| h.parent)
    }

    pub fn children(&self, node: Entity) -> Vec<Entity> {
        self.hierarchy(node)
            .map(|h| h.children)
            .unwrap_or_default()
    }

    pub fn local_transform(&self, node: Entity) -> Result<Transform, SceneError> {
        self.world
            .get::<&Transform>(node)
            .map(|t| *t)
            .map_err(|_| SceneError::NoSuchNode(node))
    }

    /// Mutate a node's local transform in place.
    pub fn update_transform(
        &mut self,
        node: Entity,
        f: impl FnOnce(&mut Transform),
    ) -> Result<(), SceneError> {
        let mut transform = self
            .world
            .get::<&mut Transform>(node)
            .map_err(|_| SceneError::NoSuchNode(node))?;
        f(&mut *transform);
        Ok(())
    }

    pub fn set_position(&mut self, node: Entity, position: Vec3) -> Result<(), SceneError> {
        self.update_transform(node, |t| t.position = position)
    }

    /// Compose the local transforms from the root down to `node`.
    pub fn world_transform(&self, node: Entity) -> Result<Mat4, SceneError> {
        let mut chain = vec![node];
        chain.extend(self.ancestors(node));

        let mut world = Mat4::IDENTITY;
        for entity in chain.into_iter().rev() {
            world *= self.local_transform(entity)?.matrix();
        }
        Ok(world)
    }

    /// World-space position of the node origin.
    pub fn world_position(&self, node: Entity) -> Result<Vec3, SceneError> {
        Ok(self.world_transform(node)?.transform_point3(Vec3::ZERO))
    }

    /// Every node in the graph, depth-first, roots and children in insertion order.
    pub fn walk(&self) -> Vec<Entity> {
        let mut out = Vec::with_capacity(self.len());
        for &root in &self.roots {
            self.collect_subtree(root, &mut out);
        }
        out
    }

    /// `node` followed by all its descendants, depth-first.
    pub fn subtree(&self, node: Entity) -> Vec<Entity> {
        let mut out = Vec::new();
        if self.contains(node) {
            self.collect_subtree(node, &mut out);
        }
        out
    }

    /// Descendants of `node`, excluding itself.
    pub fn descendants(&self, node: Entity) -> Vec<Entity> {
        let mut nodes = self.subtree(node);
        if !nodes.is_empty() {
            nodes.remove(0);
        }
        nodes
    }

    /// First node carrying `label`, in traversal order.
    pub fn find_by_label(&self, label: &str) -> Option<Entity> {
        self.walk().into_iter().find(|&e| {
            self.world
                .get::<&Label>(e)
                .is_ok_and(|l| l.0 == label)
        })
    }

    /// Like [`find_by_label`](Self::find_by_label) but an error if absent.
    pub fn expect_label(&self, label: &str) -> Result<Entity, SceneError> {
        self.find_by_label(label)
            .ok_or_else(|| SceneError::MissingLabel(label.to_string()))
    }

    pub fn label(&self, node: Entity) -> Option<String> {
        self.world.get::<&Label>(node).ok().map(|l| l.0.clone())
    }

    pub fn group(&self, node: Entity) -> Option<String> {
        self.world.get::<&Group>(node).ok().map(|g| g.0.clone())
    }

    /// Nodes tagged with `group`, in traversal order.
    pub fn group_members(&self, group: &str) -> Vec<Entity> {
        self.walk()
            .into_iter()
            .filter(|&e| self.world.get::<&Group>(e).is_ok_and(|g| g.0 == group))
            .collect()
    }

    /// Remove `node` and its whole subtree. Returns how many nodes were removed.
    pub fn remove(&mut self, node: Entity) -> Result<usize, SceneError> {
        let links = self.hierarchy(node)?;
        match links.parent {
            Some(parent) => self.hierarchy_mut(parent, |h| h.children.retain(|&c| c != node))?,
            None => self.roots.retain(|&root| root != node),
        }

        let doomed = self.subtree(node);
        for &entity in &doomed {
            self.world
                .despawn(entity)
                .map_err(|_| SceneError::NoSuchNode(entity))?;
        }
        Ok(doomed.len())
    }

    /// Remove every node tagged with `group`, including their subtrees.
    pub fn remove_group(&mut self, group: &str) -> usize {
        let mut removed = 0;
        for node in self.group_members(group) {
            // An earlier member may have been an ancestor of this one.
            if self.contains(node) {
                match self.remove(node) {
                    Ok(count) => removed += count,
                    Err(err) => log::warn!("group '{}' member not removed: {}", group, err),
                }
            }
        }
        if removed > 0 {
            log::debug!("removed {} node(s) in group '{}'", removed, group);
        }
        removed
    }

    pub fn set_hidden(&mut self, node: Entity, hidden: bool) -> Result<(), SceneError> {
        let mut visibility = self
            .world
            .get::<&mut Visibility>(node)
            .map_err(|_| SceneError::NoSuchNode(node))?;
        visibility.hidden = hidden;
        Ok(())
    }

    /// Whether the node itself is flagged hidden.
    pub fn is_hidden(&self, node: Entity) -> bool {
        self.world
            .get::<&Visibility>(node)
            .map(|v| v.hidden)
            .unwrap_or(true)
    }

    /// Visible only if neither the node nor any ancestor is hidden.
    pub fn is_visible(&self, node: Entity) -> bool {
        self.contains(node)
            && !self.is_hidden(node)
            && self.ancestors(node).into_iter().all(|a| !self.is_hidden(a))
    }

    /// Advance per-node behaviours to absolute time `time` (seconds).
    pub fn apply_behaviours(&mut self, time: f32) {
        for (_, (transform, behaviour)) in self.world.query_mut::<(&mut Transform, &Behaviour)>() {
            match *behaviour {
                Behaviour::Revolve { period } if period > 0.0 => {
                    let angle = std::f32::consts::TAU * (time / period);
                    transform.rotation = Quat::from_rotation_y(angle);
                }
                Behaviour::Revolve { .. } => {}
            }
        }
    }

    /// Renderable, visible nodes with their composed world matrices.
    ///
    /// Hidden nodes prune their whole subtree.
    pub fn render_list(&self) -> Vec<RenderItem> {
        let mut items = Vec::new();
        for &root in &self.roots {
            self.collect_render(root, Mat4::IDENTITY, &mut items);
        }
        items
    }

    /// Direct access to the underlying ECS world.
    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    fn collect_render(&self, node: Entity, parent: Mat4, items: &mut Vec<RenderItem>) {
        if self.is_hidden(node) {
            return;
        }
        let Ok(local) = self.local_transform(node) else {
            return;
        };
        let world = parent * local.matrix();

        if let Ok(shape) = self.world.get::<&Shape>(node) {
            items.push(RenderItem {
                entity: node,
                label: self.label(node),
                group: self.group(node),
                shape: (*shape).clone(),
                appearance: self
                    .world
                    .get::<&Appearance>(node)
                    .map(|a| (*a).clone())
                    .unwrap_or_default(),
                world,
            });
        }

        for child in self.children(node) {
            self.collect_render(child, world, items);
        }
    }

    fn collect_subtree(&self, node: Entity, out: &mut Vec<Entity>) {
        out.push(node);
        for child in self.children(node) {
            self.collect_subtree(child, out);
        }
    }

    /// Parent, grandparent, ... up to the root.
    fn ancestors(&self, node: Entity) -> Vec<Entity> {
        let mut out = Vec::new();
        let mut current = self.parent(node);
        while let Some(p) = current {
            out.push(p);
            current = self.parent(p);
        }
        out
    }

    fn ensure(&self, node: Entity) -> Result<(), SceneError> {
        if self.contains(node) {
            Ok(())
        } else {
            Err(SceneError::NoSuchNode(node))
        }
    }

    fn hierarchy(&self, node: Entity) -> Result<Hierarchy, SceneError> {
        self.world
            .get::<&Hierarchy>(node)
            .map(|h| (*h).clone())
            .map_err(|_| SceneError::NoSuchNode(node))
    }

    fn hierarchy_mut(
        &mut self,
        node: Entity,
        f: impl FnOnce(&mut Hierarchy),
    ) -> Result<(), SceneError> {
        let mut links = self
            .world
            .get::<&mut Hierarchy>(node)
            .map_err(|_| SceneError::NoSuchNode(node))?;
        f(&mut *links);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(x: f32, y: f32, z: f32) -> NodeDesc {
        NodeDesc::at(Vec3::new(x, y, z))
    }

    #[test]
    fn child_world_transform_composes_parent_then_local() {
        let mut graph = SceneGraph::new();
        let parent = graph.spawn(node(2.0, 0.0, 1.0).rotation(Vec3::new(0.0, 0.7, 0.0)));
        let child = graph.spawn(node(0.0, 1.0, 1.0));
        graph.add_child(parent, child).unwrap();

        let expected = graph.local_transform(parent).unwrap().matrix()
            * graph.local_transform(child).unwrap().matrix();
        assert!(graph.world_transform(child).unwrap().abs_diff_eq(expected, 1e-6));
    }

    #[test]
    fn three_level_chain_matches_render_list() {
        let mut graph = SceneGraph::new();
        let root = graph.spawn(node(2.0, 0.0, 1.0).shape(Shape::cube(0.5)));
        let tilted = |angle: f32| {
            node(0.0, 1.0, 0.0)
                .rotation(Vec3::new(angle, 0.0, 0.0))
                .shape(Shape::cube(0.3))
        };
        let mid = graph.spawn_child(root, tilted(0.2)).unwrap();
        let leaf = graph.spawn_child(mid, tilted(0.5)).unwrap();

        let direct = graph.world_transform(leaf).unwrap();
        let cached =
            graph.world_transform(mid).unwrap() * graph.local_transform(leaf).unwrap().matrix();
        assert!(direct.abs_diff_eq(cached, 1e-5));

        let from_render = graph
            .render_list()
            .into_iter()
            .find(|item| item.entity == leaf)
            .unwrap()
            .world;
        assert!(direct.abs_diff_eq(from_render, 1e-5));
    }

    #[test]
    fn translations_accumulate_down_the_chain() {
        let mut graph = SceneGraph::new();
        let a = graph.spawn(node(2.0, 0.0, 1.0));
        let b = graph.spawn_child(a, node(0.0, 1.0, 0.0)).unwrap();
        let c = graph.spawn_child(b, node(0.0, 1.0, 0.0)).unwrap();

        let p = graph.world_position(c).unwrap();
        assert!(p.abs_diff_eq(Vec3::new(2.0, 2.0, 1.0), 1e-6));
    }

    #[test]
    fn reattaching_is_an_error() {
        let mut graph = SceneGraph::new();
        let a = graph.spawn(node(0.0, 0.0, 0.0));
        let b = graph.spawn(node(0.0, 0.0, 0.0));
        let c = graph.spawn(node(0.0, 0.0, 0.0));
        graph.add_child(a, c).unwrap();

        assert_eq!(
            graph.add_child(b, c),
            Err(SceneError::AlreadyParented { child: c, parent: a })
        );
        assert_eq!(graph.children(b), Vec::<Entity>::new());
    }

    #[test]
    fn cycles_are_rejected() {
        let mut graph = SceneGraph::new();
        let a = graph.spawn(node(0.0, 0.0, 0.0));
        let b = graph.spawn_child(a, node(0.0, 0.0, 0.0)).unwrap();

        assert_eq!(graph.add_child(b, a), Err(SceneError::Cycle { parent: b, child: a }));
        assert_eq!(graph.add_child(a, a), Err(SceneError::Cycle { parent: a, child: a }));
    }

    #[test]
    fn traversal_is_depth_first_in_insertion_order() {
        let mut graph = SceneGraph::new();
        let root = graph.spawn(node(0.0, 0.0, 0.0));
        let a = graph.spawn_child(root, node(0.0, 0.0, 0.0)).unwrap();
        let b = graph.spawn_child(root, node(0.0, 0.0, 0.0)).unwrap();
        let a1 = graph.spawn_child(a, node(0.0, 0.0, 0.0)).unwrap();
        let other = graph.spawn(node(0.0, 0.0, 0.0));

        assert_eq!(graph.walk(), vec![root, a, a1, b, other]);
        assert_eq!(graph.descendants(root), vec![a, a1, b]);
        assert_eq!(graph.roots(), &[root, other]);
    }

    #[test]
    fn remove_group_drops_subtrees_and_detaches() {
        let mut graph = SceneGraph::new();
        let root = graph.spawn(node(0.0, 0.0, 0.0));
        let lamp = graph.spawn_child(root, node(0.0, 0.0, 0.0).group("lamps")).unwrap();
        let _inner = graph.spawn_child(lamp, node(0.0, 0.0, 0.0).group("lamps")).unwrap();
        let _loose = graph.spawn(node(0.0, 0.0, 0.0).group("lamps"));

        assert_eq!(graph.remove_group("lamps"), 3);
        assert!(graph.group_members("lamps").is_empty());
        assert!(graph.children(root).is_empty());
        assert_eq!(graph.walk(), vec![root]);
    }

    #[test]
    fn hidden_parent_prunes_render_list() {
        let mut graph = SceneGraph::new();
        let root = graph.spawn(node(0.0, 0.0, 0.0).shape(Shape::cube(1.0)));
        let child = graph.spawn_child(root, node(1.0, 0.0, 0.0).shape(Shape::cube(1.0))).unwrap();
        assert_eq!(graph.render_list().len(), 2);

        graph.set_hidden(root, true).unwrap();
        assert!(graph.render_list().is_empty());
        assert!(!graph.is_visible(child));
    }

    #[test]
    fn labels_resolve_in_traversal_order() {
        let mut graph = SceneGraph::new();
        let first = graph.spawn(node(0.0, 0.0, 0.0).label("cursor"));
        graph.spawn(node(0.0, 0.0, 0.0).label("cursor"));

        assert_eq!(graph.find_by_label("cursor"), Some(first));
        assert_eq!(
            graph.expect_label("floor"),
            Err(SceneError::MissingLabel("floor".into()))
        );
    }

    #[test]
    fn revolve_behaviour_tracks_time() {
        let mut graph = SceneGraph::new();
        let cursor = graph.spawn(node(0.0, 0.0, 0.0).behaviour(Behaviour::Revolve { period: 7.0 }));

        graph.apply_behaviours(1.75);
        let rotation = graph.local_transform(cursor).unwrap().rotation;
        assert!(rotation.abs_diff_eq(Quat::from_rotation_y(std::f32::consts::FRAC_PI_2), 1e-5));
    }
}
