//! In-memory stand-ins for the video decoder, encoder, and export sink.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use blaster_common::error::{BlasterError, BlasterResult};
use blaster_media_model::{
    MediaHandle, SceneSettings, SeekCompletion, SeekNotifier, VideoSource,
};
use blaster_render_engine::{
    BlasterSession, EncoderFactory, EncoderSettings, ExportSettings, ExportSink, VideoEncoder,
};
use image::{Rgba, RgbaImage};

pub fn fnv1a_64(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in bytes {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

pub fn still(w: u32, h: u32, rgba: [u8; 4]) -> MediaHandle {
    MediaHandle::Still(RgbaImage::from_pixel(w, h, Rgba(rgba)))
}

/// A video that resolves every seek immediately and counts them.
pub struct FakeVideo {
    pub width: u32,
    pub height: u32,
    pub duration: f64,
    pub time: f64,
    pub paused: bool,
    pub seeks: Arc<AtomicUsize>,
    pub frame: RgbaImage,
    /// When set, seeks never complete.
    pub hang: bool,
    pub held: Vec<SeekNotifier>,
}

impl FakeVideo {
    pub fn new(duration: f64) -> (Self, Arc<AtomicUsize>) {
        let seeks = Arc::new(AtomicUsize::new(0));
        let video = Self {
            width: 64,
            height: 36,
            duration,
            time: 0.0,
            paused: true,
            seeks: Arc::clone(&seeks),
            frame: RgbaImage::from_pixel(64, 36, Rgba([0, 0, 255, 255])),
            hang: false,
            held: Vec::new(),
        };
        (video, seeks)
    }

    pub fn hanging(duration: f64) -> (Self, Arc<AtomicUsize>) {
        let (mut video, seeks) = Self::new(duration);
        video.hang = true;
        (video, seeks)
    }
}

impl VideoSource for FakeVideo {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn duration_secs(&self) -> f64 {
        self.duration
    }

    fn current_time(&self) -> f64 {
        self.time
    }

    fn seek(&mut self, secs: f64) -> SeekCompletion {
        self.time = secs;
        self.seeks.fetch_add(1, Ordering::SeqCst);
        if self.hang {
            let (notifier, completion) = SeekCompletion::channel();
            self.held.push(notifier);
            completion
        } else {
            SeekCompletion::ready()
        }
    }

    fn poll(&mut self) {}

    fn current_frame(&self) -> Option<&RgbaImage> {
        Some(&self.frame)
    }

    fn play(&mut self) {
        self.paused = false;
    }

    fn pause(&mut self) {
        self.paused = true;
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn release(&mut self) {
        self.paused = true;
    }
}

/// Everything the fake encoders saw.
#[derive(Debug, Default)]
pub struct EncoderLog {
    pub created: Vec<EncoderSettings>,
    pub frames: Vec<usize>,
    pub frame_hashes: Vec<u64>,
    pub finalized: usize,
}

pub type SharedLog = Arc<Mutex<EncoderLog>>;

pub struct FakeEncoder {
    settings: EncoderSettings,
    log: SharedLog,
    fail_at: Option<u64>,
    count: u64,
}

impl VideoEncoder for FakeEncoder {
    fn settings(&self) -> &EncoderSettings {
        &self.settings
    }

    fn add_frame_rgba(&mut self, rgba: &[u8]) -> BlasterResult<()> {
        if Some(self.count) == self.fail_at {
            return Err(BlasterError::encode("injected encode failure"));
        }
        if rgba.len() != self.settings.frame_bytes() {
            return Err(BlasterError::encode("wrong frame size"));
        }
        self.count += 1;
        let mut log = self.log.lock().unwrap();
        log.frames.push(rgba.len());
        log.frame_hashes.push(fnv1a_64(rgba));
        Ok(())
    }

    fn finalize(&mut self) -> BlasterResult<Vec<u8>> {
        self.log.lock().unwrap().finalized += 1;
        Ok(format!("fake-mp4:{}", self.count).into_bytes())
    }
}

pub struct FakeEncoderFactory {
    pub log: SharedLog,
    /// Encoders fail when asked for this frame index.
    pub fail_at: Option<u64>,
}

impl FakeEncoderFactory {
    pub fn new() -> (Self, SharedLog) {
        let log = SharedLog::default();
        (
            Self {
                log: Arc::clone(&log),
                fail_at: None,
            },
            log,
        )
    }
}

impl EncoderFactory for FakeEncoderFactory {
    fn create(&self, settings: EncoderSettings) -> BlasterResult<Box<dyn VideoEncoder>> {
        self.log.lock().unwrap().created.push(settings);
        Ok(Box::new(FakeEncoder {
            settings,
            log: Arc::clone(&self.log),
            fail_at: self.fail_at,
            count: 0,
        }))
    }

    fn is_available(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "fake"
    }
}

/// Keeps delivered files in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub files: Vec<(String, Vec<u8>)>,
}

#[async_trait]
impl ExportSink for MemorySink {
    async fn deliver(&mut self, file_name: &str, bytes: &[u8]) -> BlasterResult<PathBuf> {
        self.files.push((file_name.to_string(), bytes.to_vec()));
        Ok(PathBuf::from("/memory").join(file_name))
    }
}

/// A session on the default square canvas recording `secs` seconds.
pub fn session_with(factory: FakeEncoderFactory, secs: f64) -> BlasterSession {
    let settings = ExportSettings {
        video_length_secs: secs,
        ..ExportSettings::default()
    };
    BlasterSession::new(SceneSettings::default(), settings, Box::new(factory), 7)
}
