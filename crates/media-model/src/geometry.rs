//! Canvas geometry: points and the supported output sizes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A 2D point in canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance_to(&self, other: &Point2D) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Output resolutions offered by the canvas size selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CanvasSize {
    /// 1080x1080.
    #[default]
    #[serde(rename = "1080x1080")]
    Square,
    /// 1920x1080.
    #[serde(rename = "1920x1080")]
    Landscape,
    /// 1080x1920.
    #[serde(rename = "1080x1920")]
    Portrait,
}

impl CanvasSize {
    pub const ALL: [CanvasSize; 3] = [Self::Square, Self::Landscape, Self::Portrait];

    pub fn width(&self) -> u32 {
        match self {
            Self::Square | Self::Portrait => 1080,
            Self::Landscape => 1920,
        }
    }

    pub fn height(&self) -> u32 {
        match self {
            Self::Square | Self::Landscape => 1080,
            Self::Portrait => 1920,
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    /// Centre of the canvas; spawn origin and the pivot for radial motion.
    pub fn center(&self) -> Point2D {
        Point2D::new(self.width() as f64 / 2.0, self.height() as f64 / 2.0)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Square => "1080x1080",
            Self::Landscape => "1920x1080",
            Self::Portrait => "1080x1920",
        }
    }
}

impl fmt::Display for CanvasSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string is not one of the enumerated canvas sizes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported canvas size `{0}` (expected 1080x1080, 1920x1080 or 1080x1920)")]
pub struct ParseCanvasSizeError(pub String);

impl FromStr for CanvasSize {
    type Err = ParseCanvasSizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|size| size.as_str() == s.trim())
            .ok_or_else(|| ParseCanvasSizeError(s.to_string()))
    }
}
