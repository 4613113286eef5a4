//! Declarative scene configuration loaded from JSON.
//!
//! ```
//! use carnival::SceneConfig;
//!
//! let config = SceneConfig::from_json_str(r##"{
//!     "prerequisites": [
//!         {"ident": "net.meta4vr.vrcomponents.arrow", "src": "/_components/arrowcomponent.js", "label": "arrow"}
//!     ],
//!     "colors": [
//!         {"label": "royalblue", "hex": "#4169e1"},
//!         {"label": "controllerGreen", "r": 0.2, "g": 0.9, "b": 0.6}
//!     ],
//!     "materials": [
//!         {"label": "matteplastic", "texture": "royalblue", "shader": "ads", "diffuse": [0.8, 0.8, 0.8]}
//!     ],
//!     "stage": {"size_x": 3.0, "size_z": 2.0}
//! }"##).unwrap();
//!
//! assert_eq!(config.palette().unwrap().len(), 2);
//! ```

use crate::color::{Color, Palette};
use crate::error::ConfigError;
use crate::lights::Light;
use crate::loader::PrerequisiteSpec;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Identity tag given to texture prerequisites.
pub const TEXTURE_IDENTITY: &str = "texture";

/// Identity tag given to mesh prerequisites.
pub const MESH_IDENTITY: &str = "mesh";

/// A named colour, either `#rrggbb` or explicit channels.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColorSpec {
    Hex { label: String, hex: String },
    Rgb { label: String, r: f32, g: f32, b: f32 },
}

impl ColorSpec {
    pub fn label(&self) -> &str {
        match self {
            ColorSpec::Hex { label, .. } | ColorSpec::Rgb { label, .. } => label,
        }
    }

    pub fn color(&self) -> Result<Color, ConfigError> {
        match self {
            ColorSpec::Hex { label, hex } => {
                Color::from_hex(hex).ok_or_else(|| ConfigError::BadHex {
                    label: label.clone(),
                    hex: hex.clone(),
                })
            }
            ColorSpec::Rgb { r, g, b, .. } => Ok(Color::rgb(*r, *g, *b)),
        }
    }
}

/// A texture or mesh fetched by URI.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetSpec {
    pub label: String,
    #[serde(alias = "source")]
    pub src: String,
}

/// Material parameters for the host's lighting shader.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MaterialSpec {
    pub label: String,
    /// Texture or palette colour label.
    #[serde(alias = "textureLabel")]
    pub texture: String,
    #[serde(alias = "shaderLabel")]
    pub shader: String,
    #[serde(default)]
    pub ambient: Option<[f32; 3]>,
    #[serde(default)]
    pub diffuse: Option<[f32; 3]>,
    #[serde(default)]
    pub specular: Option<[f32; 3]>,
}

/// Physical play-area size reported by the headset, in metres.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StageParams {
    pub size_x: f32,
    pub size_z: f32,
}

impl Default for StageParams {
    fn default() -> Self {
        Self {
            size_x: 2.0,
            size_z: 2.0,
        }
    }
}

/// Everything a scene declares up front.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneConfig {
    #[serde(default)]
    pub prerequisites: Vec<PrerequisiteSpec>,
    #[serde(default)]
    pub meshes: Vec<AssetSpec>,
    #[serde(default)]
    pub textures: Vec<AssetSpec>,
    #[serde(default)]
    pub colors: Vec<ColorSpec>,
    #[serde(default)]
    pub materials: Vec<MaterialSpec>,
    #[serde(default)]
    pub lights: Vec<Light>,
    #[serde(default)]
    pub stage: StageParams,
}

impl SceneConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a JSON scene description.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: SceneConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check colours parse, labels are unique, and materials reference known textures.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let palette = self.palette()?;

        let mut textures = HashSet::new();
        for texture in &self.textures {
            if !textures.insert(texture.label.as_str()) {
                return Err(ConfigError::DuplicateLabel {
                    kind: "texture",
                    label: texture.label.clone(),
                });
            }
        }

        let mut materials = HashSet::new();
        for material in &self.materials {
            if !materials.insert(material.label.as_str()) {
                return Err(ConfigError::DuplicateLabel {
                    kind: "material",
                    label: material.label.clone(),
                });
            }
            if !textures.contains(material.texture.as_str())
                && !palette.contains(&material.texture)
            {
                return Err(ConfigError::UnknownTexture {
                    material: material.label.clone(),
                    texture: material.texture.clone(),
                });
            }
        }
        Ok(())
    }

    /// Build the colour palette. Later entries never silently replace earlier ones.
    pub fn palette(&self) -> Result<Palette, ConfigError> {
        let mut palette = Palette::new();
        for spec in &self.colors {
            if palette.contains(spec.label()) {
                return Err(ConfigError::DuplicateLabel {
                    kind: "colour",
                    label: spec.label().to_string(),
                });
            }
            palette.insert(spec.label(), spec.color()?);
        }
        Ok(palette)
    }

    /// Components, meshes and textures as one loader batch.
    pub fn prerequisite_specs(&self) -> Vec<PrerequisiteSpec> {
        let assets = |identity: &str, list: &[AssetSpec]| -> Vec<PrerequisiteSpec> {
            list.iter()
                .map(|a| PrerequisiteSpec::new(identity, a.src.clone(), a.label.clone()))
                .collect()
        };
        let mut specs = self.prerequisites.clone();
        specs.extend(assets(MESH_IDENTITY, &self.meshes));
        specs.extend(assets(TEXTURE_IDENTITY, &self.textures));
        specs
    }

    pub fn material(&self, label: &str) -> Option<&MaterialSpec> {
        self.materials.iter().find(|m| m.label == label)
    }
}
