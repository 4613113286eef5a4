//! Colours and the named colour palette used for textureless materials.

use std::collections::HashMap;

/// RGBA color, components in `0.0..=1.0`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const WHITE: Color = Color::rgba(1.0, 1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::rgba(0.0, 0.0, 0.0, 1.0);
    pub const RED: Color = Color::rgba(1.0, 0.0, 0.0, 1.0);

    /// Parse `#rrggbb` (the leading `#` is optional).
    ///
    /// Returns `None` for anything that is not exactly six hex digits.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.strip_prefix('#').unwrap_or(hex);
        if digits.len() != 6 || !digits.is_ascii() {
            return None;
        }
        let channel = |i: usize| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .ok()
                .map(|v| v as f32 / 255.0)
        };
        Some(Self::rgb(channel(0)?, channel(2)?, channel(4)?))
    }

    /// Build an opaque colour from the first three entries of a light term.
    pub fn from_rgb_array(rgb: [f32; 3]) -> Self {
        Self::rgb(rgb[0], rgb[1], rgb[2])
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// Colours registered by label, usable anywhere a texture label is expected.
#[derive(Clone, Debug, Default)]
pub struct Palette {
    colors: HashMap<String, Color>,
}

impl Palette {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a colour under `label`.
    pub fn insert(&mut self, label: impl Into<String>, color: Color) {
        self.colors.insert(label.into(), color);
    }

    pub fn get(&self, label: &str) -> Option<Color> {
        self.colors.get(label).copied()
    }

    pub fn contains(&self, label: &str) -> bool {
        self.colors.contains_key(label)
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}
