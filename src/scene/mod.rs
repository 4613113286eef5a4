//! Scene management for Carnival.
//!
//! A scene is a [`SceneGraph`] of nodes plus the systems that animate it each
//! frame. [`SceneLifecycle`] drives a [`SceneDefinition`] through loading and
//! construction and then runs its frames.
//!
//! # Overview
//!
//! - [`SceneGraph`]: hecs-backed forest of nodes with relative transforms
//! - [`SceneState`]: graph, loaded resources, lights and player placement,
//!   passed by `&mut` to everything that mutates the scene
//! - [`SceneSetupContext`]: used by [`SceneDefinition::setup_scene`] to
//!   spawn nodes and register button handlers, pointers and pop-ins
//! - [`SceneLifecycle`]: staged async setup, then [`SceneLifecycle::frame`]
//!
//! # Example
//!
//! ```
//! use carnival::scene::{FrameInput, SceneDefinition, SceneLifecycle, SceneSetupContext, SceneState};
//! use carnival::{AsyncLoader, NodeDesc, PrerequisiteSpec, Resource, SceneError, Vec3};
//! use futures::FutureExt;
//! use std::rc::Rc;
//!
//! struct Lobby;
//!
//! impl SceneDefinition for Lobby {
//!     fn setup_scene(&mut self, ctx: &mut SceneSetupContext<'_>) -> Result<(), SceneError> {
//!         ctx.spawn(NodeDesc::at(Vec3::new(0.0, 1.0, -2.0)).label("sign"));
//!         Ok(())
//!     }
//! }
//!
//! let loader = AsyncLoader::new(|spec: &PrerequisiteSpec| {
//!     let label = spec.label.clone();
//!     async move { Ok(Rc::new(label) as Resource) }.boxed_local()
//! });
//! let mut lifecycle = SceneLifecycle::new(Lobby, SceneState::new(), loader);
//! pollster::block_on(lifecycle.setup()).unwrap();
//!
//! let frame = lifecycle.frame(&FrameInput::new(0.0));
//! assert_eq!(frame.items.len(), 0); // "sign" has no shape
//! ```

pub mod graph;
pub mod lifecycle;
mod setup;
mod state;

pub use graph::{NodeDesc, RenderItem, SceneGraph};
pub use lifecycle::{FrameInput, FrameOutput, PrereqContext, SceneDefinition, SceneLifecycle, Stage};
pub use setup::{
    ButtonHandler, CURSOR_REVOLVE_PERIOD, PopInSpawner, SceneSetupContext, default_button_handler,
};
pub use state::{CURSOR_LABEL, HIDDEN_POSITION, PlayerState, RAFT_LABEL, SceneState};
