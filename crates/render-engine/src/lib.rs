//! Blaster Render Engine
//!
//! Draws the animated collage and records it frame-accurately to video.
//!
//! # Pipeline Architecture
//!
//! ```text
//! frame counter ──► SpawnScheduler ──► apply_motion
//!                                          │
//!                     video seeks (timeline position, shared deadline)
//!                                          │
//!                                  decode settle delay
//!                                          │
//!                          render_frame ───┼──► live surface
//!                                          └──► recording buffer
//!                                                    │
//!                                           VideoEncoder (RGBA)
//!                                                    │
//!                                                    ▼
//!                                ExportSink ──► blaster.mp4 / blaster.gif
//! ```
//!
//! During an export nothing advances on wall-clock time: each frame waits
//! for its seeks and for the encoder before the next one starts.

pub mod compositor;
pub mod encoder;
pub mod export;
pub mod preview;
pub mod session;
pub mod surface;

pub use compositor::{render_frame, RenderStats};
pub use encoder::{
    EncoderFactory, EncoderSettings, ExportFormat, FfmpegEncoder, FfmpegEncoderFactory,
    GifEncoderFactory, GifVideoEncoder, VideoEncoder, GIF_FILE_NAME, MP4_FILE_NAME,
};
pub use export::*;
pub use preview::run_preview;
pub use session::BlasterSession;
pub use surface::{RasterSurface, Surface};
