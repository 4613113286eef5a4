//! Controller button state and trackpad sectors.
//!
//! [`ButtonStateTracker`] turns raw per-frame button booleans into edge-aware
//! [`ButtonState`]s. It keeps nothing but the previous sample per
//! (controller, button) pair, so it must see every button exactly once per
//! frame: skipping a frame or sampling twice makes `Pressed`/`Released` fire on
//! the wrong frame. That cadence is the caller's responsibility.

use glam::{Quat, Vec2, Vec3};
use std::collections::HashMap;
use std::fmt;

/// Status of a button for the current frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ButtonState {
    /// Not pressed, and was not pressed last frame.
    Up,
    /// Went down this frame.
    Pressed,
    /// Went up this frame.
    Released,
    /// Down this frame and last frame.
    Held,
}

impl ButtonState {
    /// Apply the transition table to a previous and current sample.
    pub fn from_samples(previous: bool, current: bool) -> Self {
        match (previous, current) {
            (false, false) => ButtonState::Up,
            (false, true) => ButtonState::Pressed,
            (true, true) => ButtonState::Held,
            (true, false) => ButtonState::Released,
        }
    }

    pub fn is_down(self) -> bool {
        matches!(self, ButtonState::Pressed | ButtonState::Held)
    }
}

impl fmt::Display for ButtonState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ButtonState::Up => "up",
            ButtonState::Pressed => "pressed",
            ButtonState::Released => "released",
            ButtonState::Held => "held",
        };
        f.write_str(name)
    }
}

/// Button indices on a Vive wand.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ViveButton {
    Trackpad = 0,
    Trigger = 1,
    Grip = 2,
    Menu = 3,
}

impl ViveButton {
    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(ViveButton::Trackpad),
            1 => Some(ViveButton::Trigger),
            2 => Some(ViveButton::Grip),
            3 => Some(ViveButton::Menu),
            _ => None,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Previous-sample memory for every (controller, button) pair seen so far.
#[derive(Debug, Default)]
pub struct ButtonStateTracker {
    previous: HashMap<(usize, usize), bool>,
}

impl ButtonStateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record this frame's sample and return the resulting state.
    ///
    /// Call exactly once per button per frame. A pair seen for the first time
    /// is treated as previously up.
    pub fn update(&mut self, controller: usize, button: usize, pressed: bool) -> ButtonState {
        let previous = self
            .previous
            .insert((controller, button), pressed)
            .unwrap_or(false);
        ButtonState::from_samples(previous, pressed)
    }

    /// Forget all samples, e.g. after a controller disconnects.
    pub fn reset(&mut self) {
        self.previous.clear();
    }
}

/// Default radius of the trackpad's central dead zone.
pub const DEFAULT_CENTER_DEADZONE: f32 = 0.3;

/// Coarse trackpad position: eight compass sectors plus a central dead zone.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TrackpadSector {
    N,
    NE,
    E,
    SE,
    S,
    SW,
    W,
    NW,
    Center,
}

impl TrackpadSector {
    /// Counter-clockwise from east, matching `atan2` with +y pointing north.
    const RING: [TrackpadSector; 8] = [
        TrackpadSector::E,
        TrackpadSector::NE,
        TrackpadSector::N,
        TrackpadSector::NW,
        TrackpadSector::W,
        TrackpadSector::SW,
        TrackpadSector::S,
        TrackpadSector::SE,
    ];

    /// Classify a touch position in `[-1, 1] x [-1, 1]`.
    ///
    /// Sectors are 45° wide and centred on their compass direction, so `E`
    /// covers `[-22.5°, 22.5°)`. Each lower boundary belongs to the sector
    /// counter-clockwise of it. Points closer to the middle than `deadzone`
    /// are [`TrackpadSector::Center`].
    pub fn classify(point: Vec2, deadzone: f32) -> Self {
        if point.length() < deadzone {
            return TrackpadSector::Center;
        }
        Self::from_degrees(point.y.atan2(point.x).to_degrees())
    }

    /// Compass sector for an angle in degrees, counter-clockwise from east.
    /// Any angle is accepted; it is wrapped into one turn first.
    pub fn from_degrees(angle: f32) -> Self {
        let shifted = (angle + 22.5).rem_euclid(360.0);
        let index = (shifted / 45.0) as usize % 8;
        Self::RING[index]
    }
}

impl fmt::Display for TrackpadSector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TrackpadSector::N => "n",
            TrackpadSector::NE => "ne",
            TrackpadSector::E => "e",
            TrackpadSector::SE => "se",
            TrackpadSector::S => "s",
            TrackpadSector::SW => "sw",
            TrackpadSector::W => "w",
            TrackpadSector::NW => "nw",
            TrackpadSector::Center => "center",
        };
        f.write_str(name)
    }
}

/// Tracked pose of a controller or headset.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    pub orientation: Quat,
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
        }
    }
}

/// One frame of raw controller data from the host.
#[derive(Clone, Debug, Default)]
pub struct ControllerSample {
    pub index: usize,
    /// Pose in play-area space, relative to the player's origin.
    pub pose: Pose,
    /// Pressed flag per button index.
    pub buttons: Vec<bool>,
    /// Trackpad touch position, if the controller reports one.
    pub trackpad: Option<Vec2>,
}

impl ControllerSample {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            ..Default::default()
        }
    }

    pub fn pose(mut self, position: Vec3, orientation: Quat) -> Self {
        self.pose = Pose {
            position,
            orientation,
        };
        self
    }

    pub fn buttons(mut self, buttons: impl Into<Vec<bool>>) -> Self {
        self.buttons = buttons.into();
        self
    }

    pub fn trackpad(mut self, point: Vec2) -> Self {
        self.trackpad = Some(point);
        self
    }
}

/// A single button's status for one frame, as passed to button handlers.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ButtonEvent {
    pub controller: usize,
    pub button: usize,
    pub state: ButtonState,
    /// Trackpad sector for this frame, when the controller reports a touch position.
    pub sector: Option<TrackpadSector>,
}

/// Trackpad tuning.
///
/// ```
/// use carnival::TrackpadConfig;
///
/// let config = TrackpadConfig::new().deadzone(0.5);
/// assert_eq!(config.deadzone, 0.5);
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrackpadConfig {
    /// Touches closer to the middle than this classify as [`TrackpadSector::Center`].
    pub deadzone: f32,
}

impl Default for TrackpadConfig {
    fn default() -> Self {
        Self {
            deadzone: DEFAULT_CENTER_DEADZONE,
        }
    }
}

impl TrackpadConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deadzone(mut self, deadzone: f32) -> Self {
        self.deadzone = deadzone;
        self
    }
}

/// Samples every button of a controller sample and emits one event per button.
#[derive(Debug, Default)]
pub struct ControllerInput {
    tracker: ButtonStateTracker,
    trackpad: TrackpadConfig,
}

impl ControllerInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(trackpad: TrackpadConfig) -> Self {
        Self {
            tracker: ButtonStateTracker::new(),
            trackpad,
        }
    }

    /// Advance one frame for `sample`. Call once per controller per frame.
    pub fn sample(&mut self, sample: &ControllerSample) -> Vec<ButtonEvent> {
        let sector = sample
            .trackpad
            .map(|p| TrackpadSector::classify(p, self.trackpad.deadzone));

        sample
            .buttons
            .iter()
            .enumerate()
            .map(|(button, &pressed)| ButtonEvent {
                controller: sample.index,
                button,
                state: self.tracker.update(sample.index, button, pressed),
                sector,
            })
            .collect()
    }
}
