//! Scene lifecycle: staged asynchronous setup followed by a synchronous frame loop.
//!
//! ```text
//! Constructed -> LoadingPrerequisites -> SettingUp -> Building -> Running
//!                        \___________________\___________\______-> Failed
//! ```
//!
//! Each stage starts only after the previous one has completed. A failure in
//! any setup stage is fatal; [`SceneLifecycle::frame`] then does nothing.

use super::graph::RenderItem;
use super::setup::{ButtonHandler, PopInSpawner, SceneSetupContext};
use super::state::SceneState;
use crate::config::SceneConfig;
use crate::error::{ConfigError, LoadError, SceneError};
use crate::input::{ControllerInput, ControllerSample, TrackpadConfig};
use crate::lights::{LightUniform, MAX_LIGHTS};
use crate::loader::{AsyncLoader, Registry};
use crate::picking::Ray;
use crate::pointer::Pointer;
use futures::FutureExt;
use futures::future::LocalBoxFuture;
use futures::task::noop_waker_ref;
use std::fmt;
use std::task::{Context, Poll};

/// Where a [`SceneLifecycle`] is in its setup sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Constructed,
    LoadingPrerequisites,
    SettingUp,
    Building,
    Running,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Constructed => "constructed",
            Stage::LoadingPrerequisites => "loading prerequisites",
            Stage::SettingUp => "setting up",
            Stage::Building => "building",
            Stage::Running => "running",
            Stage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// What the optional async setup hook may touch.
pub struct PrereqContext<'a> {
    pub loader: &'a AsyncLoader,
    pub registry: &'a mut Registry,
    pub config: &'a SceneConfig,
}

/// A concrete scene.
pub trait SceneDefinition {
    fn name(&self) -> &str {
        "scene"
    }

    /// Extra asynchronous setup, run after the declared prerequisites have
    /// loaded and before [`setup_scene`](Self::setup_scene).
    fn setup_prereqs<'a>(
        &'a mut self,
        _ctx: PrereqContext<'a>,
    ) -> LocalBoxFuture<'a, Result<(), LoadError>> {
        async { Ok(()) }.boxed_local()
    }

    /// Build the scene graph and register trackers, pointers and pop-ins.
    fn setup_scene(&mut self, ctx: &mut SceneSetupContext<'_>) -> Result<(), SceneError>;
}

/// Host input for one frame.
#[derive(Clone, Debug, Default)]
pub struct FrameInput {
    /// Seconds since the frame loop started.
    pub time: f32,
    pub controllers: Vec<ControllerSample>,
}

impl FrameInput {
    pub fn new(time: f32) -> Self {
        Self {
            time,
            controllers: Vec::new(),
        }
    }

    pub fn controller(mut self, sample: ControllerSample) -> Self {
        self.controllers.push(sample);
        self
    }
}

/// What the host draws this frame.
#[derive(Clone, Debug, Default)]
pub struct FrameOutput {
    pub items: Vec<RenderItem>,
    pub lights: [LightUniform; MAX_LIGHTS],
}

/// Button sampling and handlers for one controller.
pub(crate) struct ControllerTracker {
    pub(crate) controller: usize,
    input: ControllerInput,
    pub(crate) handlers: Vec<ButtonHandler>,
}

impl ControllerTracker {
    pub(crate) fn new(controller: usize) -> Self {
        Self {
            controller,
            input: ControllerInput::new(),
            handlers: Vec::new(),
        }
    }

    pub(crate) fn configure(&mut self, trackpad: TrackpadConfig) {
        self.input = ControllerInput::with_config(trackpad);
    }
}

/// Content waiting on a future before it joins the scene.
pub(crate) struct PopIn {
    pub(crate) label: String,
    pub(crate) future: LocalBoxFuture<'static, Result<PopInSpawner, LoadError>>,
}

/// Everything that runs each frame once the scene is built.
#[derive(Default)]
pub(crate) struct FrameSystems {
    pub(crate) trackers: Vec<ControllerTracker>,
    pub(crate) pointers: Vec<Pointer>,
    pub(crate) pending: Vec<PopIn>,
}

impl FrameSystems {
    /// Record every pose in world space, then sample each tracked controller
    /// once and feed its handlers.
    fn run_trackers(&mut self, state: &mut SceneState, samples: &[ControllerSample]) {
        for sample in samples {
            let pose = state.player.world_pose(sample.pose);
            state.player.hands.insert(sample.index, pose);
        }
        for tracker in &mut self.trackers {
            let Some(sample) = samples.iter().find(|s| s.index == tracker.controller) else {
                continue;
            };
            let events = tracker.input.sample(sample);
            for handler in &mut tracker.handlers {
                for event in &events {
                    handler(state, event);
                }
            }
        }
    }

    fn run_pointers(&mut self, state: &mut SceneState, samples: &[ControllerSample]) {
        for pointer in &mut self.pointers {
            let Some(sample) = samples.iter().find(|s| s.index == pointer.controller()) else {
                continue;
            };
            let pose = state.player.world_pose(sample.pose);
            let ray = Ray::from_pose(pose.position, pose.orientation);
            if let Err(err) = pointer.update(&mut state.graph, &ray) {
                log::debug!("pointer {} skipped: {}", pointer.controller(), err);
            }
        }
    }

    /// Poll every pending pop-in once and apply the ones that finished.
    fn poll_pop_ins(&mut self, state: &mut SceneState) {
        let mut cx = Context::from_waker(noop_waker_ref());
        let mut finished = Vec::new();
        self.pending.retain_mut(|pop_in| match pop_in.future.poll_unpin(&mut cx) {
            Poll::Ready(result) => {
                finished.push((std::mem::take(&mut pop_in.label), result));
                false
            }
            Poll::Pending => true,
        });

        for (label, result) in finished {
            let applied = result.and_then(|spawn| spawn(state).map_err(LoadError::from));
            match applied {
                Ok(()) => log::info!("'{}' popped in", label),
                Err(err) => log::warn!("pop-in '{}' dropped: {}", label, err),
            }
        }
    }
}

/// Drives a [`SceneDefinition`] through setup and then frame by frame.
pub struct SceneLifecycle<S> {
    scene: S,
    loader: AsyncLoader,
    state: SceneState,
    systems: FrameSystems,
    stage: Stage,
}

impl<S: SceneDefinition> SceneLifecycle<S> {
    pub fn new(scene: S, state: SceneState, loader: AsyncLoader) -> Self {
        Self {
            scene,
            loader,
            state,
            systems: FrameSystems::default(),
            stage: Stage::Constructed,
        }
    }

    pub fn from_config(
        scene: S,
        config: SceneConfig,
        loader: AsyncLoader,
    ) -> Result<Self, ConfigError> {
        Ok(Self::new(scene, SceneState::from_config(config)?, loader))
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn scene(&self) -> &S {
        &self.scene
    }

    pub fn state(&self) -> &SceneState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut SceneState {
        &mut self.state
    }

    /// Pop-ins still waiting on their future.
    pub fn pending_pop_ins(&self) -> usize {
        self.systems.pending.len()
    }

    /// Run every setup stage. Call once.
    ///
    /// On error the lifecycle ends up in [`Stage::Failed`] and the scene is
    /// never built.
    pub async fn setup(&mut self) -> Result<(), LoadError> {
        if self.stage != Stage::Constructed {
            return Err(LoadError::Setup(format!(
                "{} cannot be set up while {}",
                self.scene.name(),
                self.stage
            )));
        }

        let result = self.run_setup().await;
        if let Err(err) = &result {
            self.stage = Stage::Failed;
            log::warn!("{} failed to start: {}", self.scene.name(), err);
        }
        result
    }

    async fn run_setup(&mut self) -> Result<(), LoadError> {
        self.enter(Stage::LoadingPrerequisites);
        let specs = self.state.config.prerequisite_specs();
        self.loader.load_all(&specs, &mut self.state.registry).await?;

        self.enter(Stage::SettingUp);
        let ctx = PrereqContext {
            loader: &self.loader,
            registry: &mut self.state.registry,
            config: &self.state.config,
        };
        self.scene.setup_prereqs(ctx).await?;

        self.enter(Stage::Building);
        let mut ctx = SceneSetupContext::new(&mut self.state, &mut self.systems);
        self.scene.setup_scene(&mut ctx)?;

        self.enter(Stage::Running);
        Ok(())
    }

    fn enter(&mut self, stage: Stage) {
        log::info!("{}: {}", self.scene.name(), stage);
        self.stage = stage;
    }

    /// Advance one frame and return what to draw.
    ///
    /// Trackers run first, then pointers, then behaviours, then pending
    /// pop-ins. Returns an empty frame until setup has finished.
    pub fn frame(&mut self, input: &FrameInput) -> FrameOutput {
        if self.stage != Stage::Running {
            return FrameOutput::default();
        }

        self.state.time = input.time;
        self.systems.run_trackers(&mut self.state, &input.controllers);
        self.systems.run_pointers(&mut self.state, &input.controllers);
        self.state.graph.apply_behaviours(input.time);
        self.systems.poll_pop_ins(&mut self.state);

        FrameOutput {
            items: self.state.graph.render_list(),
            lights: self.state.light_uniforms(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StageParams;
    use crate::ecs::{Appearance, Shape};
    use crate::error::TransportError;
    use crate::input::ButtonEvent;
    use crate::lights::Light;
    use crate::loader::{PrerequisiteSpec, Resource};
    use crate::picking::PlanarCollider;
    use crate::pointer::PointerConfig;
    use crate::scene::{CURSOR_LABEL, NodeDesc, default_button_handler};
    use futures::channel::oneshot;
    use glam::{Quat, Vec2, Vec3, Vec4};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn loader(fail: Option<&'static str>) -> AsyncLoader {
        AsyncLoader::new(move |spec: &PrerequisiteSpec| {
            let label = spec.label.clone();
            async move {
                if Some(label.as_str()) == fail {
                    Err::<Resource, TransportError>("unreachable host".into())
                } else {
                    Ok(Rc::new(label) as Resource)
                }
            }
            .boxed_local()
        })
    }

    fn config() -> SceneConfig {
        let mut config = SceneConfig::new();
        config.prerequisites = vec![
            PrerequisiteSpec::new(
                "net.meta4vr.vrui.sys.controller.vive_lowpoly",
                "/c.js",
                "controller",
            ),
            PrerequisiteSpec::new("net.meta4vr.vrcomponents.arrow", "/a.js", "arrow"),
            PrerequisiteSpec::new("net.meta4vr.vrui.text.glyphtext", "/g.js", "glyphtext"),
        ];
        config.lights = vec![Light::at(Vec4::new(0.0, 2.0, 0.0, 0.0)).diffuse([0.8, 0.0, 0.0])];
        config.stage = StageParams {
            size_x: 3.0,
            size_z: 2.0,
        };
        config
    }

    /// Floor, raft, cursor, one pointer and the stock handler on controller 0.
    #[derive(Default)]
    struct Playground {
        built: bool,
        prereqs_seen: usize,
        pop_in: Option<oneshot::Receiver<()>>,
    }

    impl SceneDefinition for Playground {
        fn name(&self) -> &str {
            "playground"
        }

        fn setup_prereqs<'a>(
            &'a mut self,
            ctx: PrereqContext<'a>,
        ) -> LocalBoxFuture<'a, Result<(), LoadError>> {
            async move {
                self.prereqs_seen = ctx.registry.len();
                Ok(())
            }
            .boxed_local()
        }

        fn setup_scene(&mut self, ctx: &mut SceneSetupContext<'_>) -> Result<(), SceneError> {
            let floor = ctx.spawn(
                NodeDesc::at(Vec3::new(0.0, -0.02, 0.0))
                    .rotation(Vec3::new(270f32.to_radians(), 0.0, 0.0))
                    .shape(Shape::rectangle(Vec2::splat(-10.0), Vec2::splat(10.0)))
                    .label("floor"),
            );
            ctx.raft(Appearance::material("concrete"));
            ctx.cursor(Shape::cube(0.1), Appearance::shader("basic"));
            let collider = PlanarCollider::for_rectangle(ctx.graph(), floor)?;
            ctx.pointer(Pointer::new(PointerConfig::new(0)).collider(collider));
            ctx.on_buttons(0, default_button_handler);

            if let Some(rx) = self.pop_in.take() {
                ctx.pop_in("label_display", async move {
                    rx.await.map_err(|e| LoadError::Setup(e.to_string()))?;
                    Ok::<_, LoadError>(|state: &mut SceneState| {
                        state.graph.spawn(
                            NodeDesc::at(Vec3::new(0.0, 1.5, -2.0))
                                .shape(Shape::rectangle(Vec2::new(-0.5, -0.1), Vec2::new(0.5, 0.1)))
                                .label("label_display"),
                        );
                        Ok::<(), SceneError>(())
                    })
                });
            }
            self.built = true;
            Ok(())
        }
    }

    fn playground() -> SceneLifecycle<Playground> {
        SceneLifecycle::from_config(Playground::default(), config(), loader(None)).unwrap()
    }

    fn pointing_down(buttons: [bool; 4]) -> ControllerSample {
        ControllerSample::new(0)
            .pose(Vec3::new(1.0, 1.0, 0.0), Quat::from_rotation_x(-45f32.to_radians()))
            .buttons(buttons)
    }

    #[test]
    fn stages_run_in_order_and_fill_registry() {
        let mut lifecycle = playground();
        assert_eq!(lifecycle.stage(), Stage::Constructed);

        pollster::block_on(lifecycle.setup()).unwrap();

        assert_eq!(lifecycle.stage(), Stage::Running);
        assert_eq!(lifecycle.scene().prereqs_seen, 3);
        assert!(lifecycle.scene().built);
        assert_eq!(lifecycle.state().registry.len(), 3);
    }

    #[test]
    fn failed_prerequisite_stops_setup() {
        let mut lifecycle =
            SceneLifecycle::from_config(Playground::default(), config(), loader(Some("arrow")))
                .unwrap();

        let err = pollster::block_on(lifecycle.setup()).unwrap_err();

        assert!(matches!(err, LoadError::Prerequisite { ref label, .. } if label == "arrow"));
        assert_eq!(lifecycle.stage(), Stage::Failed);
        assert!(!lifecycle.scene().built);
        assert!(lifecycle.state().graph.is_empty());
        assert!(lifecycle.frame(&FrameInput::new(0.0)).items.is_empty());
    }

    #[test]
    fn setup_runs_once() {
        let mut lifecycle = playground();
        pollster::block_on(lifecycle.setup()).unwrap();
        assert!(matches!(
            pollster::block_on(lifecycle.setup()),
            Err(LoadError::Setup(_))
        ));
        assert_eq!(lifecycle.stage(), Stage::Running);
    }

    #[test]
    fn raft_matches_the_play_area() {
        let mut lifecycle = playground();
        pollster::block_on(lifecycle.setup()).unwrap();

        let graph = &lifecycle.state().graph;
        let raft = graph.expect_label("raft").unwrap();
        let shape = graph.world().get::<&Shape>(raft).unwrap();
        assert!(matches!(
            *shape,
            Shape::Rectangle { min, max, .. }
                if min == Vec2::new(-1.5, -1.0) && max == Vec2::new(1.5, 1.0)
        ));
    }

    #[test]
    fn pointer_shows_cursor_and_grip_teleports() {
        let mut lifecycle = playground();
        pollster::block_on(lifecycle.setup()).unwrap();

        lifecycle.frame(&FrameInput::new(0.0).controller(pointing_down([false; 4])));
        let cursor = lifecycle.state().graph.expect_label(CURSOR_LABEL).unwrap();
        let hit = lifecycle.state().graph.world_position(cursor).unwrap();
        assert!(hit.abs_diff_eq(Vec3::new(1.0, -0.02, -1.02), 1e-4));
        assert!(lifecycle.state().graph.is_visible(cursor));

        // Handlers run before pointers, so the grip uses last frame's cursor.
        let grip = [false, false, true, false];
        lifecycle.frame(&FrameInput::new(0.1).controller(pointing_down(grip)));
        assert!(lifecycle.state().player.origin.abs_diff_eq(hit, 1e-5));
        let raft = lifecycle.state().graph.expect_label("raft").unwrap();
        assert!(lifecycle.state().graph.world_position(raft).unwrap().abs_diff_eq(hit, 1e-5));
    }

    #[test]
    fn pointer_ray_starts_from_the_teleported_origin() {
        let mut lifecycle = playground();
        pollster::block_on(lifecycle.setup()).unwrap();
        let grip = [false, false, true, false];

        lifecycle.frame(&FrameInput::new(0.0).controller(pointing_down([false; 4])));
        lifecycle.frame(&FrameInput::new(0.1).controller(pointing_down(grip)));
        let first = lifecycle.state().player.origin;
        assert!(first.abs_diff_eq(Vec3::new(1.0, -0.02, -1.02), 1e-4));

        let cursor = lifecycle.state().graph.expect_label(CURSOR_LABEL).unwrap();
        let aimed = lifecycle.state().graph.world_position(cursor).unwrap();
        assert!(aimed.abs_diff_eq(Vec3::new(2.0, -0.02, -2.02), 1e-4));

        lifecycle.frame(&FrameInput::new(0.2).controller(pointing_down([false; 4])));
        lifecycle.frame(&FrameInput::new(0.3).controller(pointing_down(grip)));
        let second = lifecycle.state().player.origin;
        assert!(second.abs_diff_eq(Vec3::new(2.0, -0.02, -2.02), 1e-4));
        assert!(!second.abs_diff_eq(first, 0.5));

        lifecycle.frame(&FrameInput::new(0.4).controller(pointing_down([false; 4])));
        let hand = lifecycle.state().hand(0).unwrap();
        assert!(hand.position.abs_diff_eq(second + Vec3::new(1.0, 1.0, 0.0), 1e-4));
    }

    #[test]
    fn menu_press_toggles_lamps_once_per_press() {
        let mut lifecycle = playground();
        pollster::block_on(lifecycle.setup()).unwrap();
        let menu = [false, false, false, true];

        lifecycle.frame(&FrameInput::new(0.0).controller(pointing_down(menu)));
        lifecycle.frame(&FrameInput::new(0.1).controller(pointing_down(menu)));
        assert!(lifecycle.state().lights_shown());
        assert_eq!(lifecycle.state().graph.group_members("lamps").len(), 1);

        lifecycle.frame(&FrameInput::new(0.2).controller(pointing_down([false; 4])));
        lifecycle.frame(&FrameInput::new(0.3).controller(pointing_down(menu)));
        assert!(!lifecycle.state().lights_shown());
        assert!(lifecycle.state().graph.group_members("lamps").is_empty());
    }

    #[test]
    fn hands_are_recorded_for_every_sample() {
        let mut lifecycle = playground();
        pollster::block_on(lifecycle.setup()).unwrap();

        let other = ControllerSample::new(1).pose(Vec3::new(-0.3, 1.1, 0.2), Quat::IDENTITY);
        lifecycle.frame(&FrameInput::new(0.0).controller(other));

        assert_eq!(lifecycle.state().hand(1).unwrap().position, Vec3::new(-0.3, 1.1, 0.2));
        assert!(lifecycle.state().hand(0).is_none());
    }

    #[test]
    fn custom_handlers_see_every_button() {
        struct Recorder(Rc<RefCell<Vec<ButtonEvent>>>);
        impl SceneDefinition for Recorder {
            fn setup_scene(&mut self, ctx: &mut SceneSetupContext<'_>) -> Result<(), SceneError> {
                let log = self.0.clone();
                ctx.on_buttons_with(2, TrackpadConfig::new().deadzone(0.1), move |_, event| {
                    log.borrow_mut().push(*event)
                });
                Ok(())
            }
        }

        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut lifecycle =
            SceneLifecycle::new(Recorder(seen.clone()), SceneState::new(), loader(None));
        pollster::block_on(lifecycle.setup()).unwrap();

        let sample = ControllerSample::new(2)
            .buttons([true, false])
            .trackpad(Vec2::new(0.2, 0.0));
        lifecycle.frame(&FrameInput::new(0.0).controller(sample.clone()));
        lifecycle.frame(&FrameInput::new(0.1).controller(sample));

        let seen = seen.borrow();
        assert_eq!(seen.len(), 4);
        assert_eq!(seen[0].state, crate::input::ButtonState::Pressed);
        assert_eq!(seen[2].state, crate::input::ButtonState::Held);
        assert_eq!(seen[0].sector, Some(crate::input::TrackpadSector::E));
    }

    #[test]
    fn pop_in_appears_on_the_frame_it_resolves() {
        let (tx, rx) = oneshot::channel();
        let scene = Playground {
            pop_in: Some(rx),
            ..Default::default()
        };
        let mut lifecycle = SceneLifecycle::from_config(scene, config(), loader(None)).unwrap();
        pollster::block_on(lifecycle.setup()).unwrap();

        lifecycle.frame(&FrameInput::new(0.0));
        assert_eq!(lifecycle.pending_pop_ins(), 1);
        assert!(lifecycle.state().graph.find_by_label("label_display").is_none());

        tx.send(()).unwrap();
        let frame = lifecycle.frame(&FrameInput::new(0.1));
        assert_eq!(lifecycle.pending_pop_ins(), 0);
        assert!(frame.items.iter().any(|item| item.label.as_deref() == Some("label_display")));
    }

    #[test]
    fn failed_pop_in_is_dropped() {
        let (tx, rx) = oneshot::channel::<()>();
        let scene = Playground {
            pop_in: Some(rx),
            ..Default::default()
        };
        let mut lifecycle = SceneLifecycle::from_config(scene, config(), loader(None)).unwrap();
        pollster::block_on(lifecycle.setup()).unwrap();

        drop(tx);
        lifecycle.frame(&FrameInput::new(0.0));

        assert_eq!(lifecycle.pending_pop_ins(), 0);
        assert!(lifecycle.state().graph.find_by_label("label_display").is_none());
        assert_eq!(lifecycle.stage(), Stage::Running);
    }

    #[test]
    fn frame_output_carries_lights() {
        let mut lifecycle = playground();
        pollster::block_on(lifecycle.setup()).unwrap();

        let frame = lifecycle.frame(&FrameInput::new(0.0));
        assert_eq!(frame.lights[0].diffuse, [0.8, 0.0, 0.0, 1.0]);
        assert_eq!(frame.lights[1], LightUniform::default());
    }
}
