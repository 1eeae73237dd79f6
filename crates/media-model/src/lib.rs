//! Blaster Media Model
//!
//! Defines the data contracts shared by the simulation, the renderer, and
//! the recording pipeline:
//! - **Media:** decoded media items and the ordered registry that owns them
//! - **Video:** the seekable video source contract and its completion signal
//! - **Settings:** blast, motion, background, and canvas configuration
//! - **Geometry:** points and the enumerated canvas sizes
//!
//! Positions are expressed in canvas pixels with `(0, 0)` at the top-left.

pub mod geometry;
pub mod media;
pub mod settings;
pub mod video;

pub use geometry::*;
pub use media::*;
pub use settings::*;
pub use video::*;
