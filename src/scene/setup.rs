//! Context handed to a scene definition while it builds its scene.

use super::graph::{NodeDesc, SceneGraph};
use super::lifecycle::{ControllerTracker, FrameSystems, PopIn};
use super::state::{CURSOR_LABEL, HIDDEN_POSITION, RAFT_LABEL, SceneState};
use crate::ecs::{Appearance, Behaviour, Shape};
use crate::error::{LoadError, SceneError};
use crate::input::{ButtonEvent, ButtonState, TrackpadConfig, ViveButton};
use crate::pointer::Pointer;
use futures::FutureExt;
use glam::{Vec2, Vec3};
use hecs::Entity;
use std::future::Future;

/// Seconds per revolution of the pointer cursor.
pub const CURSOR_REVOLVE_PERIOD: f32 = 7.0;

/// Called once per button per frame for a tracked controller.
pub type ButtonHandler = Box<dyn FnMut(&mut SceneState, &ButtonEvent)>;

/// Applies a finished pop-in to the scene.
pub type PopInSpawner = Box<dyn FnOnce(&mut SceneState) -> Result<(), SceneError>>;

/// Scene construction context.
///
/// Gives access to the [`SceneState`] and registers the per-frame pieces:
/// controller trackers, pointers and async pop-ins.
///
/// # Example
///
/// ```ignore
/// fn setup_scene(&mut self, ctx: &mut SceneSetupContext<'_>) -> Result<(), SceneError> {
///     let floor = ctx.spawn(NodeDesc::at(Vec3::new(0.0, -0.02, 0.0)).shape(floor_shape));
///     ctx.cursor(Shape::cube(0.1), Appearance::shader("basic"));
///     ctx.pointer(Pointer::new(PointerConfig::new(0)).collider(
///         PlanarCollider::for_rectangle(ctx.graph(), floor)?,
///     ));
///     ctx.on_buttons(0, default_button_handler);
///     Ok(())
/// }
/// ```
pub struct SceneSetupContext<'a> {
    pub state: &'a mut SceneState,
    systems: &'a mut FrameSystems,
}

impl<'a> SceneSetupContext<'a> {
    pub(crate) fn new(state: &'a mut SceneState, systems: &'a mut FrameSystems) -> Self {
        Self { state, systems }
    }

    pub fn graph(&mut self) -> &mut SceneGraph {
        &mut self.state.graph
    }

    pub fn spawn(&mut self, desc: NodeDesc) -> Entity {
        self.state.graph.spawn(desc)
    }

    pub fn spawn_child(&mut self, parent: Entity, desc: NodeDesc) -> Result<Entity, SceneError> {
        self.state.graph.spawn_child(parent, desc)
    }

    /// Spawn the raft: a floor patch the size of the tracked play area,
    /// laid flat at the player origin.
    pub fn raft(&mut self, appearance: Appearance) -> Entity {
        let stage = self.state.stage();
        let half = Vec2::new(stage.size_x, stage.size_z) / 2.0;
        let desc = NodeDesc::at(self.state.player.origin)
            .rotation(Vec3::new(270f32.to_radians(), 0.0, 0.0))
            .shape(Shape::rectangle(-half, half))
            .appearance(appearance)
            .label(RAFT_LABEL);
        self.state.graph.spawn(desc)
    }

    /// Spawn the pointer cursor, parked out of sight until the first hit.
    pub fn cursor(&mut self, shape: Shape, appearance: Appearance) -> Entity {
        let desc = NodeDesc::at(HIDDEN_POSITION)
            .shape(shape)
            .appearance(appearance)
            .behaviour(Behaviour::Revolve {
                period: CURSOR_REVOLVE_PERIOD,
            })
            .label(CURSOR_LABEL)
            .hidden(true);
        self.state.graph.spawn(desc)
    }

    /// Track a controller's pose without handling its buttons.
    pub fn track(&mut self, controller: usize) {
        self.systems.tracker(controller);
    }

    /// Call `handler` for every button of `controller` each frame.
    pub fn on_buttons(
        &mut self,
        controller: usize,
        handler: impl FnMut(&mut SceneState, &ButtonEvent) + 'static,
    ) {
        self.systems.tracker(controller).handlers.push(Box::new(handler));
    }

    /// Like [`on_buttons`](Self::on_buttons), with custom trackpad tuning for the controller.
    pub fn on_buttons_with(
        &mut self,
        controller: usize,
        trackpad: TrackpadConfig,
        handler: impl FnMut(&mut SceneState, &ButtonEvent) + 'static,
    ) {
        let tracker = self.systems.tracker(controller);
        tracker.configure(trackpad);
        tracker.handlers.push(Box::new(handler));
    }

    pub fn pointer(&mut self, pointer: Pointer) {
        self.systems.pointers.push(pointer);
    }

    /// Register content that appears once `future` resolves.
    ///
    /// The future is polled once per frame. Its output runs against the scene
    /// state on the frame it completes; anything it depends on should be
    /// looked up by label at that point. Failures are logged and dropped.
    pub fn pop_in<Fut, F>(&mut self, label: impl Into<String>, future: Fut)
    where
        Fut: Future<Output = Result<F, LoadError>> + 'static,
        F: FnOnce(&mut SceneState) -> Result<(), SceneError> + 'static,
    {
        let future = future
            .map(|result| result.map(|spawn| Box::new(spawn) as PopInSpawner))
            .boxed_local();
        self.systems.pending.push(PopIn {
            label: label.into(),
            future,
        });
    }
}

impl FrameSystems {
    fn tracker(&mut self, controller: usize) -> &mut ControllerTracker {
        let index = match self.trackers.iter().position(|t| t.controller == controller) {
            Some(index) => index,
            None => {
                self.trackers.push(ControllerTracker::new(controller));
                self.trackers.len() - 1
            }
        };
        &mut self.trackers[index]
    }
}

/// Stock controller bindings.
///
/// Grip teleports to the cursor, menu toggles the lamp markers, trigger logs
/// the hand position, and trackpad activity logs its sector.
pub fn default_button_handler(state: &mut SceneState, event: &ButtonEvent) {
    if event.state == ButtonState::Up {
        return;
    }
    log::debug!(
        "controller {} button {} {}",
        event.controller,
        event.button,
        event.state
    );

    let pressed = event.state == ButtonState::Pressed;
    match ViveButton::from_index(event.button) {
        Some(ViveButton::Grip) if pressed => {
            if let Err(err) = state.teleport_to_cursor() {
                log::warn!("teleport failed: {}", err);
            }
        }
        Some(ViveButton::Menu) if pressed => {
            state.show_lights(None);
        }
        Some(ViveButton::Trigger) if pressed => match state.hand(event.controller) {
            Some(pose) => log::info!("hand {} at {:?}", event.controller, pose.position),
            None => log::info!("hand {} not tracked yet", event.controller),
        },
        Some(ViveButton::Trackpad) => {
            if let Some(sector) = event.sector {
                log::info!("trackpad {} {} ({})", event.controller, sector, event.state);
            }
        }
        _ => {}
    }
}
