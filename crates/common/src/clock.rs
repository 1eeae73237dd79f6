//! The global frame clock.
//!
//! Every time-dependent decision in Blaster (spawning, retirement, scale
//! interpolation, GIF frame selection, video seek positions) is derived from a
//! single monotonic frame counter. Wall-clock time only paces the real-time
//! preview; it never feeds the simulation.

use std::time::Duration;

/// Monotonic frame counter paired with the timeline frame rate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameClock {
    frame: u64,
    fps: u32,
}

impl FrameClock {
    /// Create a clock at frame 0. A zero rate is treated as 1 fps.
    pub fn new(fps: u32) -> Self {
        Self {
            frame: 0,
            fps: fps.max(1),
        }
    }

    /// Current frame index.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Timeline frame rate.
    pub fn fps(&self) -> u32 {
        self.fps
    }

    /// Advance by exactly one tick and return the new frame index.
    pub fn advance(&mut self) -> u64 {
        self.frame += 1;
        self.frame
    }

    /// Rewind to frame 0.
    pub fn reset(&mut self) {
        self.frame = 0;
    }

    /// Position of the current frame on the global timeline, in seconds.
    pub fn timeline_secs(&self) -> f64 {
        Self::frame_to_secs(self.frame, self.fps)
    }

    /// Wall-clock spacing between frames at this rate (preview pacing only).
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.fps as f64)
    }

    /// Number of frames covering `secs` of output at this rate.
    pub fn frames_for_secs(&self, secs: f64) -> u64 {
        if !secs.is_finite() || secs <= 0.0 {
            return 0;
        }
        (secs * self.fps as f64).round() as u64
    }

    /// Convert a frame index to seconds at the given rate.
    pub fn frame_to_secs(frame: u64, fps: u32) -> f64 {
        frame as f64 / fps.max(1) as f64
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new(30)
    }
}
