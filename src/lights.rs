//! Scene lights, their shader-uniform layout, and the debug lamp toggle.

use crate::color::Color;
use crate::ecs::{Appearance, Shape};
use crate::scene::{NodeDesc, SceneGraph};
use bytemuck::{Pod, Zeroable};
use glam::{Vec3, Vec4};
use hecs::Entity;
use serde::{Deserialize, Serialize};

/// Reserved group label for debug lamp markers.
pub const LAMP_GROUP: &str = "lamps";

/// Edge length of a debug lamp cube, in metres.
pub const LAMP_SIZE: f32 = 0.3;

/// Shader used to draw lamp markers; it ignores lighting so markers show their true colour.
pub const LAMP_SHADER: &str = "basic";

/// Most lights the ADS shader accepts.
pub const MAX_LIGHTS: usize = 7;

/// A positional light in the host's attribute format.
///
/// `position.w` is kept as given; the host shader interprets it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Light {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub position: Vec4,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ambient: Option<[f32; 3]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diffuse: Option<[f32; 3]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specular: Option<[f32; 3]>,
}

impl Light {
    pub fn at(position: Vec4) -> Self {
        Self {
            label: None,
            position,
            ambient: None,
            diffuse: None,
            specular: None,
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn ambient(mut self, rgb: [f32; 3]) -> Self {
        self.ambient = Some(rgb);
        self
    }

    pub fn diffuse(mut self, rgb: [f32; 3]) -> Self {
        self.diffuse = Some(rgb);
        self
    }

    pub fn specular(mut self, rgb: [f32; 3]) -> Self {
        self.specular = Some(rgb);
        self
    }
}

/// GPU-ready light slot. Absent terms are zeroed and flagged off.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct LightUniform {
    pub position: [f32; 4],
    /// RGB plus an enable flag in `w` (1.0 on, 0.0 off).
    pub ambient: [f32; 4],
    pub diffuse: [f32; 4],
    pub specular: [f32; 4],
}

impl From<&Light> for LightUniform {
    fn from(light: &Light) -> Self {
        let term = |rgb: Option<[f32; 3]>| match rgb {
            Some([r, g, b]) => [r, g, b, 1.0],
            None => [0.0; 4],
        };
        Self {
            position: light.position.to_array(),
            ambient: term(light.ambient),
            diffuse: term(light.diffuse),
            specular: term(light.specular),
        }
    }
}

/// Pack lights into the fixed uniform array. Extra lights are dropped with a warning.
pub fn light_uniforms(lights: &[Light]) -> [LightUniform; MAX_LIGHTS] {
    if lights.len() > MAX_LIGHTS {
        log::warn!(
            "{} lights configured, only the first {} are bound",
            lights.len(),
            MAX_LIGHTS
        );
    }
    let mut slots = [LightUniform::zeroed(); MAX_LIGHTS];
    for (slot, light) in slots.iter_mut().zip(lights) {
        *slot = LightUniform::from(light);
    }
    slots
}

/// Rebuild the lamp markers for `lights`.
///
/// Existing markers are always removed first, so repeated calls with the same
/// `shown` value leave the same set behind. Only lights with a diffuse term
/// get a marker, coloured by that term.
pub fn rebuild_lamps(graph: &mut SceneGraph, lights: &[Light], shown: bool) -> Vec<Entity> {
    graph.remove_group(LAMP_GROUP);
    if !shown {
        return Vec::new();
    }

    lights
        .iter()
        .filter_map(|light| {
            let diffuse = light.diffuse?;
            let desc = NodeDesc::at(light.position.truncate())
                .shape(Shape::cuboid(Vec3::splat(LAMP_SIZE)))
                .appearance(
                    Appearance::shader(LAMP_SHADER).with_color(Color::from_rgb_array(diffuse)),
                )
                .group(LAMP_GROUP);
            Some(graph.spawn(desc))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rig() -> Vec<Light> {
        vec![
            Light::at(Vec4::new(0.0, 3.0, 1.0, 1.0))
                .ambient([0.5, 0.5, 0.5])
                .diffuse([0.7, 0.7, 0.6])
                .specular([0.0, 0.0, 0.0]),
            Light::at(Vec4::new(0.0, 2.0, 0.0, 0.0)).diffuse([0.8, 0.0, 0.0]),
            Light::at(Vec4::new(2.0, 2.0, 0.0, 0.0)).ambient([0.1, 0.1, 0.1]),
        ]
    }

    #[test]
    fn uniform_flags_missing_terms() {
        let uniform = LightUniform::from(&rig()[1]);
        assert_eq!(uniform.position, [0.0, 2.0, 0.0, 0.0]);
        assert_eq!(uniform.diffuse, [0.8, 0.0, 0.0, 1.0]);
        assert_eq!(uniform.ambient, [0.0; 4]);
        assert_eq!(std::mem::size_of::<LightUniform>(), 64);
    }

    #[test]
    fn uniform_array_is_padded() {
        let slots = light_uniforms(&rig());
        assert_eq!(slots[0].ambient, [0.5, 0.5, 0.5, 1.0]);
        assert!(slots[3..].iter().all(|s| *s == LightUniform::zeroed()));
        assert_eq!(bytemuck::cast_slice::<LightUniform, u8>(&slots).len(), 64 * MAX_LIGHTS);
    }

    #[test]
    fn lamps_only_for_diffuse_lights() {
        let mut graph = SceneGraph::new();
        let lamps = rebuild_lamps(&mut graph, &rig(), true);

        assert_eq!(lamps.len(), 2);
        assert_eq!(graph.group_members(LAMP_GROUP), lamps);
        let pos = graph.world_position(lamps[1]).unwrap();
        assert!(pos.abs_diff_eq(Vec3::new(0.0, 2.0, 0.0), 1e-6));
    }

    #[test]
    fn rebuilding_twice_keeps_one_set() {
        let mut graph = SceneGraph::new();
        rebuild_lamps(&mut graph, &rig(), true);
        rebuild_lamps(&mut graph, &rig(), true);
        assert_eq!(graph.group_members(LAMP_GROUP).len(), 2);

        assert!(rebuild_lamps(&mut graph, &rig(), false).is_empty());
        assert!(graph.is_empty());
    }

    #[test]
    fn light_parses_from_json() {
        let light: Light = serde_json::from_str(
            r#"{"position": [0, 2, 0, 0], "diffuse": [0.8, 0.0, 0.0]}"#,
        )
        .unwrap();
        assert_eq!(light.position, Vec4::new(0.0, 2.0, 0.0, 0.0));
        assert_eq!(light.ambient, None);
    }
}
