//! Mutable scene state shared by setup code, button handlers and pointers.
//!
//! There is one [`SceneState`] per scene. It is handed by `&mut` to whatever
//! needs it on the frame-loop thread; nothing keeps a long-lived reference.

use super::graph::SceneGraph;
use crate::color::Palette;
use crate::config::{SceneConfig, StageParams};
use crate::error::{ConfigError, SceneError};
use crate::input::Pose;
use crate::lights::{self, Light, LightUniform, MAX_LIGHTS};
use crate::loader::Registry;
use glam::Vec3;
use hecs::Entity;
use std::collections::HashMap;

/// Label of the pointer cursor node.
pub const CURSOR_LABEL: &str = "cursor";

/// Label of the raft: the patch of floor matching the player's tracked play area.
pub const RAFT_LABEL: &str = "raft";

/// Where dynamically positioned nodes wait until their first real placement.
pub const HIDDEN_POSITION: Vec3 = Vec3::new(0.0, -100.0, 0.0);

/// Player placement in the virtual world.
#[derive(Clone, Debug, Default)]
pub struct PlayerState {
    /// World position of the play-area origin.
    pub origin: Vec3,
    /// Latest world-space pose per controller index.
    pub hands: HashMap<usize, Pose>,
}

impl PlayerState {
    /// Move a pose reported in play-area space into the world.
    pub fn world_pose(&self, tracked: Pose) -> Pose {
        Pose {
            position: self.origin + tracked.position,
            orientation: tracked.orientation,
        }
    }
}

pub struct SceneState {
    pub graph: SceneGraph,
    pub registry: Registry,
    pub palette: Palette,
    pub config: SceneConfig,
    pub lights: Vec<Light>,
    pub player: PlayerState,
    /// Seconds since the frame loop started.
    pub time: f32,
    lights_shown: bool,
}

impl SceneState {
    pub fn new() -> Self {
        Self {
            graph: SceneGraph::new(),
            registry: Registry::new(),
            palette: Palette::new(),
            config: SceneConfig::default(),
            lights: Vec::new(),
            player: PlayerState::default(),
            time: 0.0,
            lights_shown: false,
        }
    }

    /// State seeded from a validated config: palette and lights.
    pub fn from_config(config: SceneConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut state = Self::new();
        state.palette = config.palette()?;
        state.lights = config.lights.clone();
        state.config = config;
        Ok(state)
    }

    pub fn stage(&self) -> StageParams {
        self.config.stage
    }

    pub fn lights_shown(&self) -> bool {
        self.lights_shown
    }

    /// Show or hide the debug lamp markers.
    ///
    /// `Some(v)` sets the state, `None` flips it. Markers are rebuilt from the
    /// current light list every call. Returns the new markers.
    pub fn show_lights(&mut self, state: Option<bool>) -> Vec<Entity> {
        let shown = state.unwrap_or(!self.lights_shown);
        self.lights_shown = shown;
        let lamps = lights::rebuild_lamps(&mut self.graph, &self.lights, shown);
        log::info!("lights {} ({} marker(s))", if shown { "shown" } else { "hidden" }, lamps.len());
        lamps
    }

    /// Current lights packed for the host's shader uniforms.
    pub fn light_uniforms(&self) -> [LightUniform; MAX_LIGHTS] {
        lights::light_uniforms(&self.lights)
    }

    /// Move the raft and the player origin to `point`. No validation is done.
    pub fn teleport_to(&mut self, point: Vec3) -> Result<(), SceneError> {
        if let Some(raft) = self.graph.find_by_label(RAFT_LABEL) {
            self.graph.set_position(raft, point)?;
        }
        self.player.origin = point;
        log::info!("teleported to {:?}", point);
        Ok(())
    }

    /// Teleport to wherever the cursor currently sits.
    pub fn teleport_to_cursor(&mut self) -> Result<(), SceneError> {
        let cursor = self.graph.expect_label(CURSOR_LABEL)?;
        let point = self.graph.world_position(cursor)?;
        self.teleport_to(point)
    }

    pub fn hand(&self, controller: usize) -> Option<Pose> {
        self.player.hands.get(&controller).copied()
    }
}

impl Default for SceneState {
    fn default() -> Self {
        Self::new()
    }
}
