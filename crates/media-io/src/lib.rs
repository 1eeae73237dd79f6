//! Blaster Media IO
//!
//! Turns files on disk into registry items:
//! - Stills (JPEG, PNG) and animated GIFs decode in-process via `image`
//! - MP4 videos become [`FfmpegVideoSource`]s that probe with `ffprobe` and
//!   decode frames on demand with `ffmpeg`
//!
//! Loading the same file twice produces two independent items.

pub mod loader;
pub mod probe;
pub mod video;

pub use loader::{LoadSummary, LoadedMedia, MediaLoader};
pub use probe::{probe_video, VideoProbe};
pub use video::FfmpegVideoSource;
