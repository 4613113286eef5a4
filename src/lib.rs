//! # Carnival
//!
//! **An interactive runtime for room-scale VR scenes.**
//!
//! Declare what a scene needs, build it as a tree of nodes, point at things
//! with a tracked controller. The host keeps the headset, the GPU and the
//! network; Carnival keeps the scene.
//!
//! ## Quick Start
//!
//! ```no_run
//! use carnival::*;
//! use carnival::scene::{FrameInput, SceneDefinition, SceneLifecycle, SceneSetupContext, default_button_handler};
//! use futures::FutureExt;
//! use std::rc::Rc;
//!
//! struct Gallery;
//!
//! impl SceneDefinition for Gallery {
//!     fn setup_scene(&mut self, ctx: &mut SceneSetupContext<'_>) -> Result<(), SceneError> {
//!         let floor = ctx.spawn(
//!             NodeDesc::at(Vec3::new(0.0, -0.02, 0.0))
//!                 .rotation(Vec3::new(270f32.to_radians(), 0.0, 0.0))
//!                 .shape(Shape::rectangle(Vec2::splat(-10.0), Vec2::splat(10.0))),
//!         );
//!         ctx.cursor(Shape::cube(0.08), Appearance::shader("basic"));
//!         let collider = PlanarCollider::for_rectangle(ctx.graph(), floor)?;
//!         ctx.pointer(Pointer::new(PointerConfig::new(0)).collider(collider));
//!         ctx.on_buttons(0, default_button_handler);
//!         Ok(())
//!     }
//! }
//!
//! let loader = AsyncLoader::new(|spec: &PrerequisiteSpec| {
//!     let label = spec.label.clone();
//!     async move { Ok(Rc::new(label) as Resource) }.boxed_local()
//! });
//! let mut lifecycle = SceneLifecycle::from_config(Gallery, SceneConfig::new(), loader).unwrap();
//! pollster::block_on(lifecycle.setup()).unwrap();
//!
//! loop {
//!     let frame = lifecycle.frame(&FrameInput::new(0.0));
//!     // hand frame.items and frame.lights to the renderer
//! #   break;
//! }
//! ```
//!
//! ## Philosophy
//!
//! - **Async at the edges**: Loading is awaited once up front; every frame is synchronous.
//! - **State is explicit**: Handlers get `&mut SceneState`, nothing hides in globals.
//! - **Colliders follow their nodes**: Planes are declared locally and move with the node.

mod color;
mod config;
mod ecs;
mod error;
mod input;
mod lights;
mod loader;
mod picking;
mod pointer;
pub mod scene;
mod transform;

pub use color::{Color, Palette};
pub use config::{
    AssetSpec, ColorSpec, MESH_IDENTITY, MaterialSpec, SceneConfig, StageParams, TEXTURE_IDENTITY,
};
pub use error::{ConfigError, LoadError, SceneError, TransportError};
pub use input::{
    ButtonEvent, ButtonState, ButtonStateTracker, ControllerInput, ControllerSample,
    DEFAULT_CENTER_DEADZONE, Pose, TrackpadConfig, TrackpadSector, ViveButton,
};
pub use lights::{
    LAMP_GROUP, LAMP_SHADER, LAMP_SIZE, Light, LightUniform, MAX_LIGHTS, light_uniforms,
    rebuild_lamps,
};
pub use loader::{AsyncLoader, ComponentLoader, PrerequisiteSpec, Registry, Resource};
pub use pointer::{Pointer, PointerConfig};
pub use scene::{NodeDesc, RenderItem, SceneGraph, SceneState};
pub use transform::Transform;

// Re-export glam math types for convenience
pub use glam::{Mat4, Quat, Vec2, Vec3, Vec4};

// ECS components and the hecs types behind scene nodes
pub use ecs::{Appearance, Behaviour, Group, Hierarchy, Label, Shape, Visibility};
pub use hecs::{Entity, World};

// Ray/plane picking
pub use picking::{CollisionResult, PARALLEL_EPSILON, PlanarCollider, Plane, Ray, intersect};
