//! ECS components attached to scene graph nodes.
//!
//! Every node in a [`SceneGraph`](crate::SceneGraph) is a `hecs` entity carrying a
//! [`Transform`](crate::Transform) and a [`Hierarchy`]. The remaining components are
//! optional capabilities:
//!
//! - [`Shape`] makes a node renderable. A node without one is a plain container.
//! - [`Label`] makes a node addressable by name.
//! - [`Group`] tags a node for bulk enumeration or removal.
//! - [`Appearance`] carries material/texture/shader metadata for the host renderer.
//! - [`Behaviour`] runs a small per-frame update.
//!
//! # Example
//!
//! ```
//! use carnival::{Appearance, NodeDesc, SceneGraph, Shape, Vec3};
//!
//! let mut graph = SceneGraph::new();
//! let lamp = graph.spawn(
//!     NodeDesc::at(Vec3::new(0.0, 2.0, 0.0))
//!         .shape(Shape::cube(0.3))
//!         .appearance(Appearance::shader("basic"))
//!         .group("lamps"),
//! );
//! assert_eq!(graph.group_members("lamps"), vec![lamp]);
//! ```

use crate::color::Color;
use glam::{UVec2, Vec2, Vec3};
use hecs::Entity;

/// Parent/child links. Present on every node.
#[derive(Clone, Debug, Default)]
pub struct Hierarchy {
    pub(crate) parent: Option<Entity>,
    pub(crate) children: Vec<Entity>,
}

impl Hierarchy {
    pub fn parent(&self) -> Option<Entity> {
        self.parent
    }

    /// Children in insertion order.
    pub fn children(&self) -> &[Entity] {
        &self.children
    }
}

/// Unique lookup name for a node.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Label(pub String);

/// Group tag used for bulk operations, e.g. all debug lamp markers.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Group(pub String);

/// Hidden nodes (and their descendants) are left out of the render list.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Visibility {
    pub hidden: bool,
}

/// Renderable geometry, declared in the node's local, untransformed frame.
#[derive(Clone, Debug, PartialEq)]
pub enum Shape {
    /// Box centred on the node origin with full extents `size`.
    Cuboid { size: Vec3 },
    /// Flat rectangle in the local XY plane (z = 0), facing -Z.
    Rectangle {
        min: Vec2,
        max: Vec2,
        segments: UVec2,
    },
    /// Externally loaded mesh, identified by its source URI.
    Mesh { source: String, scale: f32 },
}

impl Shape {
    pub fn cuboid(size: Vec3) -> Self {
        Shape::Cuboid { size }
    }

    pub fn cube(edge: f32) -> Self {
        Shape::Cuboid {
            size: Vec3::splat(edge),
        }
    }

    /// Single-segment rectangle spanning `min..max` in local XY.
    pub fn rectangle(min: Vec2, max: Vec2) -> Self {
        Shape::Rectangle {
            min,
            max,
            segments: UVec2::ONE,
        }
    }

    pub fn mesh(source: impl Into<String>) -> Self {
        Shape::Mesh {
            source: source.into(),
            scale: 1.0,
        }
    }

    /// Overrides mesh scale. No effect on other shapes.
    pub fn scaled(mut self, factor: f32) -> Self {
        if let Shape::Mesh { scale, .. } = &mut self {
            *scale = factor;
        }
        self
    }

    /// Overrides rectangle tessellation. No effect on other shapes.
    pub fn segments(mut self, x: u32, y: u32) -> Self {
        if let Shape::Rectangle { segments, .. } = &mut self {
            *segments = UVec2::new(x, y);
        }
        self
    }
}

/// Material metadata handed to the host renderer.
///
/// `texture` may name a loaded texture or a palette colour.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Appearance {
    pub material: Option<String>,
    pub texture: Option<String>,
    pub shader: Option<String>,
    /// Solid colour used when no texture label applies.
    pub color: Option<Color>,
}

impl Appearance {
    pub fn material(label: impl Into<String>) -> Self {
        Self {
            material: Some(label.into()),
            ..Default::default()
        }
    }

    pub fn shader(label: impl Into<String>) -> Self {
        Self {
            shader: Some(label.into()),
            ..Default::default()
        }
    }

    pub fn with_texture(mut self, label: impl Into<String>) -> Self {
        self.texture = Some(label.into());
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }
}

/// Per-frame update applied to a node's local transform.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Behaviour {
    /// Rotate about the local Y axis, one full turn every `period` seconds.
    Revolve { period: f32 },
}
