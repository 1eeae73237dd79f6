//! Scene configuration: spawn/scale parameters, motion flags, background,
//! and canvas size.
//!
//! Every value here may change at any time; the scheduler, motion model, and
//! renderer read them fresh on every frame.

use std::path::Path;
use std::str::FromStr;

use blaster_common::error::{BlasterError, BlasterResult};
use serde::{Deserialize, Serialize};

use crate::geometry::CanvasSize;

/// Spawn, lifetime, and scale parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlastConfig {
    /// Frames between successive admissions.
    pub spawn_interval: f64,

    /// Frames an instance stays active.
    pub lifetime: f64,

    /// Frames over which scale moves from `start_scale` to `end_scale`.
    pub animation_duration: f64,

    /// Scale at spawn, relative to native media size.
    pub start_scale: f64,

    /// Scale once the animation completes.
    pub end_scale: f64,

    /// Maximum per-axis offset (pixels) of a spawn position from the centre.
    pub spread_radius: f64,
}

impl Default for BlastConfig {
    fn default() -> Self {
        Self {
            spawn_interval: 5.0,
            lifetime: 200.0,
            animation_duration: 200.0,
            start_scale: 0.4,
            end_scale: 0.4,
            spread_radius: 0.0,
        }
    }
}

impl BlastConfig {
    /// Reject values the scheduler and renderer cannot work with.
    ///
    /// `start_scale` and `end_scale` are independent; only their sign is
    /// checked.
    pub fn validate(&self) -> BlasterResult<()> {
        let finite = [
            ("spawn_interval", self.spawn_interval),
            ("lifetime", self.lifetime),
            ("animation_duration", self.animation_duration),
            ("start_scale", self.start_scale),
            ("end_scale", self.end_scale),
            ("spread_radius", self.spread_radius),
        ];
        for (name, value) in finite {
            if !value.is_finite() {
                return Err(BlasterError::config(format!("{name} must be finite")));
            }
        }
        if self.spawn_interval <= 0.0 {
            return Err(BlasterError::config("spawn_interval must be positive"));
        }
        if self.lifetime <= 0.0 {
            return Err(BlasterError::config("lifetime must be positive"));
        }
        if self.animation_duration <= 0.0 {
            return Err(BlasterError::config("animation_duration must be positive"));
        }
        if self.start_scale < 0.0 || self.end_scale < 0.0 {
            return Err(BlasterError::config("scales must be non-negative"));
        }
        if self.spread_radius < 0.0 {
            return Err(BlasterError::config("spread_radius must be non-negative"));
        }
        Ok(())
    }
}

/// A motion direction the operator can toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
    Inward,
    Outward,
}

impl Direction {
    pub fn opposite(self) -> Direction {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
            Self::Left => Self::Right,
            Self::Right => Self::Left,
            Self::Inward => Self::Outward,
            Self::Outward => Self::Inward,
        }
    }
}

impl FromStr for Direction {
    type Err = BlasterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" => Ok(Self::Up),
            "down" => Ok(Self::Down),
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            "inward" | "in" => Ok(Self::Inward),
            "outward" | "out" => Ok(Self::Outward),
            other => Err(BlasterError::config(format!(
                "unknown direction `{other}` (use up, down, left, right, inward, outward)"
            ))),
        }
    }
}

/// Enabled motion flags and the per-frame speed in pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    pub inward: bool,
    pub outward: bool,
    pub speed: f64,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            up: false,
            down: false,
            left: false,
            right: false,
            inward: false,
            outward: false,
            speed: 5.0,
        }
    }
}

impl MotionConfig {
    pub fn is_enabled(&self, direction: Direction) -> bool {
        match direction {
            Direction::Up => self.up,
            Direction::Down => self.down,
            Direction::Left => self.left,
            Direction::Right => self.right,
            Direction::Inward => self.inward,
            Direction::Outward => self.outward,
        }
    }

    pub fn set(&mut self, direction: Direction, enabled: bool) {
        let flag = match direction {
            Direction::Up => &mut self.up,
            Direction::Down => &mut self.down,
            Direction::Left => &mut self.left,
            Direction::Right => &mut self.right,
            Direction::Inward => &mut self.inward,
            Direction::Outward => &mut self.outward,
        };
        *flag = enabled;
    }

    /// Flip a direction the way the control buttons do: the opposite
    /// direction is switched off first. Returns the new state.
    pub fn toggle(&mut self, direction: Direction) -> bool {
        if self.is_enabled(direction.opposite()) {
            self.set(direction.opposite(), false);
        }
        let enabled = !self.is_enabled(direction);
        self.set(direction, enabled);
        enabled
    }

    /// Whether any flag is set.
    pub fn any(&self) -> bool {
        self.up || self.down || self.left || self.right || self.inward || self.outward
    }
}

/// Opaque RGB background colour, written as `#rrggbb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BackgroundColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl BackgroundColor {
    pub const BLACK: BackgroundColor = BackgroundColor { r: 0, g: 0, b: 0 };

    pub fn rgba(&self) -> [u8; 4] {
        [self.r, self.g, self.b, 255]
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl Default for BackgroundColor {
    fn default() -> Self {
        Self::BLACK
    }
}

impl FromStr for BackgroundColor {
    type Err = BlasterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().trim_start_matches('#');
        let invalid = || BlasterError::config(format!("invalid colour `{s}` (expected #rrggbb)"));
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(invalid());
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16).map_err(|_| invalid())
        };
        Ok(Self {
            r: channel(0..2)?,
            g: channel(2..4)?,
            b: channel(4..6)?,
        })
    }
}

impl TryFrom<String> for BackgroundColor {
    type Error = BlasterError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<BackgroundColor> for String {
    fn from(value: BackgroundColor) -> Self {
        value.to_hex()
    }
}

/// Everything the operator can tune about a scene, persisted as a JSON preset.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SceneSettings {
    #[serde(default)]
    pub blast: BlastConfig,

    #[serde(default)]
    pub motion: MotionConfig,

    #[serde(default)]
    pub background: BackgroundColor,

    #[serde(default)]
    pub canvas: CanvasSize,
}

impl SceneSettings {
    pub fn validate(&self) -> BlasterResult<()> {
        self.blast.validate()?;
        if !self.motion.speed.is_finite() || self.motion.speed < 0.0 {
            return Err(BlasterError::config("motion speed must be non-negative"));
        }
        Ok(())
    }

    /// Load and validate a preset file.
    pub fn load(path: &Path) -> BlasterResult<Self> {
        if !path.exists() {
            return Err(BlasterError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        let settings: SceneSettings = serde_json::from_str(&content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Write the preset as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> BlasterResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}
