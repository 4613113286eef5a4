//! Headless run of the camera-test scene.
//!
//! Loads `scenes/camtest.json`, builds the scene, then plays a scripted
//! controller sequence through the frame loop:
//! - controller 0 points at the floor, the cursor follows
//! - grip teleports to the cursor
//! - menu toggles the lamp markers
//! - trigger logs the hand position, trackpad logs its sector
//! - pointing at the sky hides the cursor
//!
//! Run with `RUST_LOG=debug` to see every button event.

use carnival::scene::{
    FrameInput, PrereqContext, SceneDefinition, SceneLifecycle, SceneSetupContext, SceneState,
    default_button_handler,
};
use carnival::{
    Appearance, AsyncLoader, ControllerSample, LoadError, NodeDesc, PlanarCollider, Pointer,
    PointerConfig, PrerequisiteSpec, Quat, Resource, SceneConfig, SceneError, Shape, Vec2, Vec3,
};
use futures::FutureExt;
use futures::channel::oneshot;
use futures::future::LocalBoxFuture;
use std::rc::Rc;

const SCENE_JSON: &str = include_str!("../scenes/camtest.json");

const FRAME_RATE: f32 = 90.0;
const FRAMES: u32 = 270;

/// Stand-in for a component the host would have fetched and evaluated.
#[derive(Debug)]
struct LoadedComponent {
    identity: String,
    source: String,
}

fn loader() -> AsyncLoader {
    AsyncLoader::new(|spec: &PrerequisiteSpec| {
        let component = LoadedComponent {
            identity: spec.identity.clone(),
            source: spec.source.clone(),
        };
        async move { Ok(Rc::new(component) as Resource) }.boxed_local()
    })
}

struct CamTest {
    /// Resolves with the icon mesh URI once the host has it.
    icon_mesh: Option<oneshot::Receiver<String>>,
}

impl CamTest {
    fn cube_container(position: Vec3, edge: f32, tilt: f32) -> NodeDesc {
        NodeDesc::at(position)
            .rotation(Vec3::new(tilt, 0.0, 0.0))
            .shape(Shape::cube(edge))
            .appearance(Appearance::material("matteplastic"))
    }

    fn glyph_text(text: &str, position: Vec3, yaw: f32) -> NodeDesc {
        NodeDesc::at(position)
            .rotation(Vec3::new(0.0, yaw, 0.0))
            .shape(Shape::mesh("glyphtext"))
            .appearance(Appearance::material("matteplastic"))
            .label(text)
    }
}

impl SceneDefinition for CamTest {
    fn name(&self) -> &str {
        "camtest"
    }

    fn setup_prereqs<'a>(
        &'a mut self,
        ctx: PrereqContext<'a>,
    ) -> LocalBoxFuture<'a, Result<(), LoadError>> {
        async move {
            for label in ["controller", "arrow", "glyphtext"] {
                let component = ctx
                    .registry
                    .get::<LoadedComponent>(label)
                    .ok_or_else(|| LoadError::Setup(format!("component '{label}' missing")))?;
                log::debug!("{} -> {} ({})", label, component.identity, component.source);
            }
            Ok(())
        }
        .boxed_local()
    }

    fn setup_scene(&mut self, ctx: &mut SceneSetupContext<'_>) -> Result<(), SceneError> {
        ctx.cursor(
            Shape::cube(0.3),
            Appearance::material("matteplastic").with_texture("red"),
        );

        let floor = ctx.spawn(
            NodeDesc::at(Vec3::new(0.0, -0.02, 0.0))
                .rotation(Vec3::new(270f32.to_radians(), 0.0, 0.0))
                .shape(Shape::rectangle(Vec2::splat(-20.0), Vec2::splat(20.0)).segments(10, 10))
                .appearance(Appearance::material("concrete"))
                .label("floor"),
        );
        ctx.raft(Appearance::material("concrete").with_texture("royalblue"));

        let floor_collider = PlanarCollider::for_rectangle(ctx.graph(), floor)?;
        ctx.pointer(Pointer::new(PointerConfig::new(0)).collider(floor_collider));
        ctx.on_buttons(0, default_button_handler);
        ctx.on_buttons(1, default_button_handler);

        ctx.spawn(
            NodeDesc::at(Vec3::new(0.0, 0.0, 2.0))
                .shape(Shape::mesh("arrow").scaled(0.5))
                .label("arrow"),
        );
        ctx.spawn(Self::glyph_text(
            "#virtualreality",
            Vec3::new(2.0, 0.3, 3.0),
            180f32.to_radians(),
        ));
        ctx.spawn(Self::glyph_text("/meta4vr", Vec3::new(-1.7, 0.3, -3.0), 0.0));

        let gd1 = ctx.spawn(Self::cube_container(Vec3::new(2.0, 0.0, 1.0), 0.5, 0.0).label("gd1"));
        ctx.spawn_child(gd1, Self::cube_container(Vec3::new(0.0, 1.0, 1.0), 0.3, 0.0))?;
        ctx.spawn_child(gd1, Self::cube_container(Vec3::new(0.0, 1.0, -1.0), 0.3, 0.0))?;
        let gd1c = ctx.spawn_child(gd1, Self::cube_container(Vec3::new(0.0, 1.0, 0.0), 0.3, 0.2))?;
        ctx.spawn_child(gd1c, Self::cube_container(Vec3::new(0.0, 1.0, 0.0), 0.3, 0.5))?;
        ctx.spawn_child(gd1c, Self::cube_container(Vec3::new(0.0, 1.0, 0.0), 0.3, -0.5))?;

        if let Some(icon_mesh) = self.icon_mesh.take() {
            ctx.pop_in("icon", async move {
                let source = icon_mesh
                    .await
                    .map_err(|_| LoadError::Setup("icon mesh never arrived".into()))?;
                Ok::<_, LoadError>(move |state: &mut SceneState| {
                    state.graph.spawn(
                        NodeDesc::at(Vec3::new(-2.7, 0.3, -3.0))
                            .shape(Shape::mesh(source))
                            .appearance(Appearance::material("matteplastic"))
                            .label("icon"),
                    );
                    Ok::<(), SceneError>(())
                })
            });
        }
        Ok(())
    }
}

/// Controller 0 script. Buttons are [trackpad, trigger, grip, menu].
fn controller_0(frame: u32) -> ControllerSample {
    let at_floor =
        Quat::from_rotation_y(frame as f32 * 0.004) * Quat::from_rotation_x(-35f32.to_radians());
    let at_sky = Quat::from_rotation_x(60f32.to_radians());
    let orientation = if frame >= 240 { at_sky } else { at_floor };

    let mut buttons = [false; 4];
    match frame {
        60..=62 => buttons[2] = true,
        120..=121 => buttons[3] = true,
        150 => buttons[1] = true,
        180..=184 => buttons[0] = true,
        _ => {}
    }

    let sample = ControllerSample::new(0)
        .pose(Vec3::new(0.2, 1.1, -0.1), orientation)
        .buttons(buttons);
    if (180..=184).contains(&frame) {
        sample.trackpad(Vec2::new(-0.7, 0.6))
    } else {
        sample
    }
}

fn controller_1(frame: u32) -> ControllerSample {
    let mut buttons = [false; 4];
    if frame == 200 {
        buttons[3] = true;
    }
    ControllerSample::new(1)
        .pose(Vec3::new(-0.25, 1.0, 0.0), Quat::IDENTITY)
        .buttons(buttons)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = SceneConfig::from_json_str(SCENE_JSON)?;
    let (icon_tx, icon_rx) = oneshot::channel();
    let scene = CamTest {
        icon_mesh: Some(icon_rx),
    };
    let mut lifecycle = SceneLifecycle::from_config(scene, config, loader())?;
    pollster::block_on(lifecycle.setup())?;

    let mut icon_tx = Some(icon_tx);
    let mut last_items = 0;
    for frame in 0..FRAMES {
        if frame == 30 {
            if let Some(tx) = icon_tx.take() {
                let icon = "//meshbase.meta4vr.net/_typography/fontawesome/glyph_62000.obj";
                if let Err(source) = tx.send(icon.into()) {
                    log::warn!("icon mesh {} not delivered: scene dropped its receiver", source);
                }
            }
        }

        let input = FrameInput::new(frame as f32 / FRAME_RATE)
            .controller(controller_0(frame))
            .controller(controller_1(frame));
        let output = lifecycle.frame(&input);

        if output.items.len() != last_items {
            log::info!("frame {}: {} render item(s)", frame, output.items.len());
            last_items = output.items.len();
        }
    }

    let state = lifecycle.state();
    log::info!(
        "done: origin {:?}, lights shown {}, {} node(s), {} resource(s)",
        state.player.origin,
        state.lights_shown(),
        state.graph.len(),
        state.registry.len()
    );
    Ok(())
}
