//! ffmpeg-backed [`VideoSource`].
//!
//! Each seek decodes exactly one frame at the requested timestamp by running
//! `ffmpeg` and reading raw RGBA from its stdout. A source runs at most one
//! decode at a time, on tokio's blocking pool when a runtime is available and
//! inline otherwise. Seeks issued while a decode is running replace each
//! other in a single-slot queue: only the newest target is decoded next, and
//! the replaced seeks resolve as abandoned. Results are tagged with the seek
//! generation; [`poll`] only accepts a result from the most recent seek.
//!
//! [`poll`]: VideoSource::poll

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use blaster_common::error::{BlasterError, BlasterResult};
use blaster_media_model::{SeekCompletion, SeekNotifier, VideoSource};
use image::RgbaImage;

use crate::probe::{probe_video, VideoProbe};

/// Decodes the frame at a timestamp.
type FrameDecoder = Arc<dyn Fn(f64) -> BlasterResult<RgbaImage> + Send + Sync>;

struct SeekRequest {
    secs: f64,
    generation: u64,
    notifier: SeekNotifier,
}

#[derive(Default)]
struct DecodeQueue {
    /// A worker is decoding.
    busy: bool,
    /// Newest seek waiting for the worker.
    next: Option<SeekRequest>,
    /// Finished frame and the generation it was requested under.
    result: Option<(u64, RgbaImage)>,
}

type SharedQueue = Arc<Mutex<DecodeQueue>>;

fn lock(queue: &Mutex<DecodeQueue>) -> MutexGuard<'_, DecodeQueue> {
    queue.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A video file decoded frame-by-frame with ffmpeg.
pub struct FfmpegVideoSource {
    path: PathBuf,
    probe: VideoProbe,
    current_time: f64,
    paused: bool,
    released: bool,
    frame: Option<RgbaImage>,
    queue: SharedQueue,
    generation: Arc<AtomicU64>,
    decoder: FrameDecoder,
}

impl FfmpegVideoSource {
    /// Probe `path` and decode its first frame.
    pub fn open(path: &Path) -> BlasterResult<Self> {
        let probe = probe_video(path)?;
        let mut source = Self::with_probe(path, probe);
        source.frame = Some((source.decoder)(0.0)?);
        tracing::debug!(
            path = %path.display(),
            width = probe.width,
            height = probe.height,
            duration_secs = probe.duration_secs,
            "Video source opened"
        );
        Ok(source)
    }

    fn with_probe(path: &Path, probe: VideoProbe) -> Self {
        let decode_path = path.to_path_buf();
        let decoder: FrameDecoder = Arc::new(move |secs| {
            decode_frame_at(&decode_path, secs, probe.width, probe.height)
        });
        Self::with_decoder(path, probe, decoder)
    }

    fn with_decoder(path: &Path, probe: VideoProbe, decoder: FrameDecoder) -> Self {
        Self {
            path: path.to_path_buf(),
            probe,
            current_time: 0.0,
            paused: true,
            released: false,
            frame: None,
            queue: SharedQueue::default(),
            generation: Arc::new(AtomicU64::new(0)),
            decoder,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn spawn_worker(&self, first: SeekRequest) {
        let path = self.path.clone();
        let queue = Arc::clone(&self.queue);
        let latest = Arc::clone(&self.generation);
        let decoder = Arc::clone(&self.decoder);

        let task = move || {
            let mut request = first;
            loop {
                match decoder(request.secs) {
                    Ok(frame) => {
                        if latest.load(Ordering::Acquire) == request.generation {
                            lock(&queue).result = Some((request.generation, frame));
                        }
                        request.notifier.notify();
                    }
                    Err(err) => {
                        // Dropping the notifier reports the seek as abandoned.
                        tracing::warn!(
                            path = %path.display(),
                            secs = request.secs,
                            error = %err,
                            "Seek decode failed"
                        );
                    }
                }

                let mut pending = lock(&queue);
                match pending.next.take() {
                    Some(next) => request = next,
                    None => {
                        pending.busy = false;
                        return;
                    }
                }
            }
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(task);
            }
            Err(_) => task(),
        }
    }
}

impl VideoSource for FfmpegVideoSource {
    fn width(&self) -> u32 {
        self.probe.width
    }

    fn height(&self) -> u32 {
        self.probe.height
    }

    fn duration_secs(&self) -> f64 {
        self.probe.duration_secs
    }

    fn current_time(&self) -> f64 {
        self.current_time
    }

    fn seek(&mut self, secs: f64) -> SeekCompletion {
        let secs = if secs.is_finite() { secs.max(0.0) } else { 0.0 };
        self.current_time = secs;
        if self.released {
            return SeekCompletion::ready();
        }

        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let (notifier, completion) = SeekCompletion::channel();
        let request = SeekRequest {
            secs,
            generation,
            notifier,
        };

        let mut queue = lock(&self.queue);
        if queue.busy {
            if queue.next.replace(request).is_some() {
                tracing::trace!(path = %self.path.display(), secs, "Queued seek superseded");
            }
            return completion;
        }
        queue.busy = true;
        drop(queue);

        self.spawn_worker(request);
        completion
    }

    fn poll(&mut self) {
        let current = self.generation.load(Ordering::Acquire);
        if let Some((generation, frame)) = lock(&self.queue).result.take() {
            if generation == current {
                self.frame = Some(frame);
            }
        }
    }

    fn current_frame(&self) -> Option<&RgbaImage> {
        self.frame.as_ref()
    }

    fn play(&mut self) {
        if !self.released {
            self.paused = false;
        }
    }

    fn pause(&mut self) {
        self.paused = true;
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn release(&mut self) {
        self.paused = true;
        self.released = true;
        // Invalidate in-flight decodes and drop the queued one.
        self.generation.fetch_add(1, Ordering::AcqRel);
        lock(&self.queue).next = None;
        self.frame = None;
        tracing::debug!(path = %self.path.display(), "Video source released");
    }
}

/// Decode the single frame at `secs` as RGBA.
fn decode_frame_at(path: &Path, secs: f64, width: u32, height: u32) -> BlasterResult<RgbaImage> {
    let output = Command::new("ffmpeg")
        .args(["-v", "error", "-ss"])
        .arg(format!("{secs:.3}"))
        .arg("-i")
        .arg(path)
        .args(["-frames:v", "1", "-f", "rawvideo", "-pix_fmt", "rgba"])
        .args(["-s", &format!("{width}x{height}")])
        .arg("pipe:1")
        .output()
        .map_err(|e| BlasterError::decode(format!("Failed to start ffmpeg: {e}")))?;

    if !output.status.success() {
        return Err(BlasterError::decode(format!(
            "ffmpeg frame decode failed (status {}): {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    let expected = width as usize * height as usize * 4;
    if output.stdout.len() < expected {
        return Err(BlasterError::decode(format!(
            "short frame at {secs:.3}s: got {} bytes, expected {expected}",
            output.stdout.len()
        )));
    }

    let mut bytes = output.stdout;
    bytes.truncate(expected);
    RgbaImage::from_raw(width, height, bytes)
        .ok_or_else(|| BlasterError::decode("frame buffer size mismatch"))
}
