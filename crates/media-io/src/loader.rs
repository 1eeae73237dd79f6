//! File-to-registry loading.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;

use blaster_common::error::{BlasterError, BlasterResult};
use blaster_media_model::{
    mime_for_path, AnimatedImage, AnimationFrame, MediaHandle, MediaId, MediaKind, MediaRegistry,
};
use image::codecs::gif::GifDecoder;
use image::AnimationDecoder;

use crate::video::FfmpegVideoSource;

/// GIF frames with a delay at or below this are shown for [`DEFAULT_GIF_DELAY`],
/// matching how browsers play them.
const MIN_GIF_DELAY: Duration = Duration::from_millis(10);
const DEFAULT_GIF_DELAY: Duration = Duration::from_millis(100);

/// A decoded file, ready to be registered.
#[derive(Debug)]
pub struct LoadedMedia {
    pub kind: MediaKind,
    pub name: String,
    pub handle: MediaHandle,
}

/// Outcome of loading a batch of files.
#[derive(Debug, Default)]
pub struct LoadSummary {
    /// Ids of registered items, in input order.
    pub loaded: Vec<MediaId>,

    /// Files that failed, with the reason.
    pub failed: Vec<(PathBuf, BlasterError)>,
}

/// Decodes media files by MIME type.
#[derive(Debug, Clone, Default)]
pub struct MediaLoader;

impl MediaLoader {
    pub fn new() -> Self {
        Self
    }

    /// Decode one file.
    pub fn load(&self, path: &Path) -> BlasterResult<LoadedMedia> {
        if !path.exists() {
            return Err(BlasterError::FileNotFound {
                path: path.to_path_buf(),
            });
        }

        let mime = mime_for_path(path).ok_or_else(|| {
            let ext = path
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("<none>");
            BlasterError::unsupported_media(format!("extension `{ext}`"))
        })?;
        let kind = MediaKind::from_mime(mime).ok_or_else(|| BlasterError::unsupported_media(mime))?;

        let handle = match kind {
            MediaKind::Image => MediaHandle::Still(decode_still(path)?),
            MediaKind::Gif => MediaHandle::Animated(decode_gif(path)?),
            MediaKind::Video => MediaHandle::Video(Box::new(FfmpegVideoSource::open(path)?)),
        };

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Ok(LoadedMedia { kind, name, handle })
    }

    /// Decode one file and append it to the registry.
    pub fn load_into(&self, registry: &mut MediaRegistry, path: &Path) -> BlasterResult<MediaId> {
        let media = self.load(path)?;
        Ok(registry.add(media.kind, media.name, media.handle))
    }

    /// Load files strictly in order. Failures are logged and skipped.
    pub fn load_all<P: AsRef<Path>>(&self, registry: &mut MediaRegistry, paths: &[P]) -> LoadSummary {
        let mut summary = LoadSummary::default();
        for path in paths {
            let path = path.as_ref();
            match self.load_into(registry, path) {
                Ok(id) => {
                    tracing::info!(%id, path = %path.display(), "Media loaded");
                    summary.loaded.push(id);
                }
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "Skipping media that failed to load");
                    summary.failed.push((path.to_path_buf(), err));
                }
            }
        }
        summary
    }
}

fn decode_still(path: &Path) -> BlasterResult<image::RgbaImage> {
    let img = image::open(path)
        .map_err(|e| BlasterError::media_load(format!("{}: {e}", path.display())))?;
    Ok(img.to_rgba8())
}

fn decode_gif(path: &Path) -> BlasterResult<AnimatedImage> {
    let reader = BufReader::new(File::open(path)?);
    let decoder = GifDecoder::new(reader)
        .map_err(|e| BlasterError::media_load(format!("{}: {e}", path.display())))?;
    let frames = decoder
        .into_frames()
        .collect_frames()
        .map_err(|e| BlasterError::decode(format!("{}: {e}", path.display())))?;

    let frames = frames
        .into_iter()
        .map(|frame| {
            let (numer, denom) = frame.delay().numer_denom_ms();
            let millis = if denom == 0 { 0 } else { numer / denom };
            let mut delay = Duration::from_millis(u64::from(millis));
            if delay <= MIN_GIF_DELAY {
                delay = DEFAULT_GIF_DELAY;
            }
            AnimationFrame {
                image: frame.into_buffer(),
                delay,
            }
        })
        .collect();

    AnimatedImage::new(frames)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::codecs::gif::GifEncoder;
    use image::{Delay, Frame, Rgba, RgbaImage};

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("blaster-loader-{tag}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_png(path: &Path, w: u32, h: u32) {
        RgbaImage::from_pixel(w, h, Rgba([200, 10, 10, 255]))
            .save(path)
            .unwrap();
    }

    fn write_gif(path: &Path, delays_ms: &[u32]) {
        let file = File::create(path).unwrap();
        let mut encoder = GifEncoder::new(file);
        let frames = delays_ms.iter().enumerate().map(|(i, ms)| {
            let shade = (i as u8).wrapping_mul(60);
            Frame::from_parts(
                RgbaImage::from_pixel(3, 3, Rgba([shade, shade, shade, 255])),
                0,
                0,
                Delay::from_numer_denom_ms(*ms, 1),
            )
        });
        encoder.encode_frames(frames).unwrap();
    }

    #[test]
    fn test_load_png_as_still() {
        let dir = temp_dir("png");
        let path = dir.join("photo.png");
        write_png(&path, 8, 6);

        let media = MediaLoader::new().load(&path).unwrap();
        assert_eq!(media.kind, MediaKind::Image);
        assert_eq!(media.name, "photo.png");
        assert!(matches!(media.handle, MediaHandle::Still(ref img) if img.dimensions() == (8, 6)));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_load_gif_frames_and_delays() {
        let dir = temp_dir("gif");
        let path = dir.join("loop.gif");
        write_gif(&path, &[200, 0]);

        let media = MediaLoader::new().load(&path).unwrap();
        let MediaHandle::Animated(anim) = media.handle else {
            panic!("expected animated handle");
        };
        assert_eq!(anim.frame_count(), 2);
        assert_eq!(anim.total_duration(), Duration::from_millis(300));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_unsupported_extension_rejected() {
        let dir = temp_dir("txt");
        let path = dir.join("notes.txt");
        std::fs::write(&path, "hello").unwrap();

        let err = MediaLoader::new().load(&path).unwrap_err();
        assert!(matches!(err, BlasterError::UnsupportedMedia { .. }));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_load_all_keeps_order_and_skips_failures() {
        let dir = temp_dir("batch");
        let first = dir.join("a.png");
        let broken = dir.join("broken.png");
        let second = dir.join("b.png");
        write_png(&first, 2, 2);
        std::fs::write(&broken, b"not a png").unwrap();
        write_png(&second, 4, 4);

        let mut registry = MediaRegistry::new();
        let summary = MediaLoader::new().load_all(&mut registry, &[&first, &broken, &second]);

        assert_eq!(summary.loaded.len(), 2);
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].0, broken);
        assert_eq!(registry.ids(), summary.loaded);
        assert_eq!(registry.at(0).unwrap().name, "a.png");
        assert_eq!(registry.at(1).unwrap().name, "b.png");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_same_file_twice_gives_two_items() {
        let dir = temp_dir("twice");
        let path = dir.join("same.png");
        write_png(&path, 2, 2);

        let mut registry = MediaRegistry::new();
        let loader = MediaLoader::new();
        let a = loader.load_into(&mut registry, &path).unwrap();
        let b = loader.load_into(&mut registry, &path).unwrap();
        assert_ne!(a, b);
        assert_eq!(registry.len(), 2);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_missing_file() {
        let err = MediaLoader::new()
            .load(Path::new("/nonexistent/blaster/a.png"))
            .unwrap_err();
        assert!(matches!(err, BlasterError::FileNotFound { .. }));
    }
}
