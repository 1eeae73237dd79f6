//! Decoded media items and the ordered registry that owns them.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use blaster_common::error::{BlasterError, BlasterResult};
use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::video::VideoSource;

/// Stable identifier of a registered media item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MediaId(pub u64);

impl fmt::Display for MediaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "media#{}", self.0)
    }
}

/// What kind of source a media item was decoded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Gif,
    Video,
}

impl MediaKind {
    /// Map a MIME type to a kind. Only the accepted upload types match.
    pub fn from_mime(mime: &str) -> Option<MediaKind> {
        match mime {
            "image/jpeg" | "image/png" => Some(Self::Image),
            "image/gif" => Some(Self::Gif),
            "video/mp4" => Some(Self::Video),
            _ => None,
        }
    }
}

/// Guess the MIME type of a file from its extension.
pub fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "mp4" | "m4v" => Some("video/mp4"),
        _ => None,
    }
}

/// One frame of an animated image.
#[derive(Debug, Clone)]
pub struct AnimationFrame {
    pub image: RgbaImage,
    pub delay: Duration,
}

/// A decoded multi-frame image (GIF). Frames are selected from the global
/// timeline, so every render of the same frame index shows the same picture.
#[derive(Debug, Clone)]
pub struct AnimatedImage {
    frames: Vec<AnimationFrame>,
    total: Duration,
}

impl AnimatedImage {
    /// Build from decoded frames. Fails on an empty frame list.
    pub fn new(frames: Vec<AnimationFrame>) -> BlasterResult<Self> {
        if frames.is_empty() {
            return Err(BlasterError::decode("animation has no frames"));
        }
        let total = frames.iter().map(|f| f.delay).sum();
        Ok(Self { frames, total })
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn total_duration(&self) -> Duration {
        self.total
    }

    pub fn width(&self) -> u32 {
        self.frames[0].image.width()
    }

    pub fn height(&self) -> u32 {
        self.frames[0].image.height()
    }

    /// Frame shown at `secs` on the timeline, looping.
    pub fn frame_at(&self, secs: f64) -> &RgbaImage {
        let total = self.total.as_secs_f64();
        if total <= 0.0 || !secs.is_finite() {
            return &self.frames[0].image;
        }
        let mut t = secs.rem_euclid(total);
        for frame in &self.frames {
            let delay = frame.delay.as_secs_f64();
            if t < delay {
                return &frame.image;
            }
            t -= delay;
        }
        &self.frames[self.frames.len() - 1].image
    }
}

/// Decoded media payload.
pub enum MediaHandle {
    Still(RgbaImage),
    Animated(AnimatedImage),
    Video(Box<dyn VideoSource>),
}

impl fmt::Debug for MediaHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Still(img) => write!(f, "Still({}x{})", img.width(), img.height()),
            Self::Animated(anim) => write!(
                f,
                "Animated({}x{}, {} frames)",
                anim.width(),
                anim.height(),
                anim.frame_count()
            ),
            Self::Video(video) => write!(
                f,
                "Video({}x{}, {:.3}s)",
                video.width(),
                video.height(),
                video.duration_secs()
            ),
        }
    }
}

/// A loaded media item.
#[derive(Debug)]
pub struct MediaItem {
    pub id: MediaId,
    pub kind: MediaKind,
    /// Display name, usually the file name.
    pub name: String,
    pub handle: MediaHandle,
}

impl MediaItem {
    /// Native pixel dimensions. `(0, 0)` means "not decoded yet".
    pub fn dimensions(&self) -> (u32, u32) {
        match &self.handle {
            MediaHandle::Still(img) => (img.width(), img.height()),
            MediaHandle::Animated(anim) => (anim.width(), anim.height()),
            MediaHandle::Video(video) => (video.width(), video.height()),
        }
    }

    /// The picture to draw at `timeline_secs`.
    pub fn frame_at(&self, timeline_secs: f64) -> Option<&RgbaImage> {
        match &self.handle {
            MediaHandle::Still(img) => Some(img),
            MediaHandle::Animated(anim) => Some(anim.frame_at(timeline_secs)),
            MediaHandle::Video(video) => video.current_frame(),
        }
    }

    pub fn video(&self) -> Option<&dyn VideoSource> {
        match &self.handle {
            MediaHandle::Video(video) => Some(video.as_ref()),
            _ => None,
        }
    }

    pub fn video_mut(&mut self) -> Option<&mut dyn VideoSource> {
        match &mut self.handle {
            MediaHandle::Video(video) => Some(video.as_mut()),
            _ => None,
        }
    }

    fn release(&mut self) {
        if let Some(video) = self.video_mut() {
            video.pause();
            video.release();
        }
    }
}

/// Ordered list of loaded media. Order is the round-robin spawn order.
#[derive(Debug, Default)]
pub struct MediaRegistry {
    items: Vec<MediaItem>,
    next_id: u64,
}

impl MediaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a decoded item and return its id.
    pub fn add(&mut self, kind: MediaKind, name: impl Into<String>, handle: MediaHandle) -> MediaId {
        let id = MediaId(self.next_id);
        self.next_id += 1;
        let item = MediaItem {
            id,
            kind,
            name: name.into(),
            handle,
        };
        tracing::debug!(%id, kind = ?kind, name = %item.name, "Media registered");
        self.items.push(item);
        id
    }

    /// Remove an item and release its resources. Returns the released item.
    pub fn remove(&mut self, id: MediaId) -> Option<MediaItem> {
        let index = self.index_of(id)?;
        let mut item = self.items.remove(index);
        item.release();
        tracing::debug!(%id, "Media removed");
        Some(item)
    }

    /// Move the item at `from` so that it ends up at index `to`.
    pub fn move_item(&mut self, from: usize, to: usize) -> BlasterResult<()> {
        let len = self.items.len();
        if from >= len || to >= len {
            return Err(BlasterError::config(format!(
                "reorder {from} -> {to} out of range for {len} items"
            )));
        }
        let item = self.items.remove(from);
        self.items.insert(to, item);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn index_of(&self, id: MediaId) -> Option<usize> {
        self.items.iter().position(|item| item.id == id)
    }

    /// Item at a round-robin index.
    pub fn at(&self, index: usize) -> Option<&MediaItem> {
        self.items.get(index)
    }

    pub fn get(&self, id: MediaId) -> Option<&MediaItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn get_mut(&mut self, id: MediaId) -> Option<&mut MediaItem> {
        self.items.iter_mut().find(|item| item.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MediaItem> {
        self.items.iter()
    }

    pub fn ids(&self) -> Vec<MediaId> {
        self.items.iter().map(|item| item.id).collect()
    }

    /// Let every video absorb finished decodes.
    pub fn poll_videos(&mut self) {
        for item in &mut self.items {
            if let Some(video) = item.video_mut() {
                video.poll();
            }
        }
    }

    /// Rewind every video to the start of its stream and pause it.
    pub fn rewind_videos(&mut self) {
        for item in &mut self.items {
            if let Some(video) = item.video_mut() {
                drop(video.seek(0.0));
                video.pause();
            }
        }
    }
}
