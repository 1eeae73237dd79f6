//! Recording pipeline building blocks.
//!
//! The [`Recorder`] owns the encoder, the fixed-resolution recording buffer,
//! and the `Idle -> Recording -> Finalizing -> Idle` state. The session
//! drives it frame by frame; this module also provides the video seek
//! synchronisation step and the types an export reports back.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use blaster_animation_core::ActiveInstance;
use blaster_common::clock::FrameClock;
use blaster_common::config::RecordingDefaults;
use blaster_common::error::{BlasterError, BlasterResult};
use blaster_media_model::{CanvasSize, MediaKind, MediaRegistry};
use serde::{Deserialize, Serialize};

use crate::encoder::{EncoderFactory, EncoderSettings, VideoEncoder};
use crate::surface::{RasterSurface, Surface};

/// Seeks closer than this to the target are skipped.
pub const SEEK_TOLERANCE_SECS: f64 = 0.001;

/// Progress is logged every this many recorded frames.
pub const PROGRESS_LOG_INTERVAL: u64 = 30;

/// Recording parameters. Canvas dimensions come from the session.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportSettings {
    pub fps: u32,
    pub video_length_secs: f64,
    pub bitrate_kbps: u32,
    pub keyframe_interval: u32,
    /// Deadline shared by all seeks issued for one frame.
    pub seek_timeout: Duration,
    /// Fixed wait after seeks, before rendering.
    pub decode_settle: Duration,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self::from(&RecordingDefaults::default())
    }
}

impl From<&RecordingDefaults> for ExportSettings {
    fn from(defaults: &RecordingDefaults) -> Self {
        Self {
            fps: defaults.fps.max(1),
            video_length_secs: defaults.video_length_secs,
            bitrate_kbps: defaults.bitrate_kbps,
            keyframe_interval: defaults.keyframe_interval,
            seek_timeout: Duration::from_millis(defaults.seek_timeout_ms),
            decode_settle: Duration::from_millis(defaults.decode_settle_ms),
        }
    }
}

impl ExportSettings {
    /// Frames a full recording contains.
    pub fn target_frames(&self) -> u64 {
        FrameClock::new(self.fps).frames_for_secs(self.video_length_secs)
    }

    pub fn encoder_settings(&self, width: u32, height: u32) -> EncoderSettings {
        EncoderSettings {
            width,
            height,
            fps: self.fps,
            bitrate_kbps: self.bitrate_kbps,
            keyframe_interval: self.keyframe_interval,
        }
    }
}

/// State of the recording pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecorderState {
    /// Preview running, ready to record.
    Idle,
    /// Frames are being rendered and encoded.
    Recording,
    /// Encoder is being flushed and the result delivered.
    Finalizing,
}

/// Progress callback for export rendering.
pub type ProgressCallback = Box<dyn Fn(ExportProgress) + Send>;

/// Export progress report.
#[derive(Debug, Clone)]
pub struct ExportProgress {
    /// Current progress [0.0, 1.0].
    pub progress: f64,

    /// Frames encoded so far.
    pub frames_recorded: u64,

    /// Total frames to encode.
    pub total_frames: u64,

    /// Current stage.
    pub stage: ExportStage,
}

impl ExportProgress {
    pub fn new(frames_recorded: u64, total_frames: u64, stage: ExportStage) -> Self {
        let progress = if total_frames == 0 {
            1.0
        } else {
            (frames_recorded as f64 / total_frames as f64).clamp(0.0, 1.0)
        };
        Self {
            progress,
            frames_recorded,
            total_frames,
            stage,
        }
    }
}

/// Stages of the export process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportStage {
    Preparing,
    Recording,
    Finalizing,
    Complete,
    Cancelled,
    Failed,
}

/// Seek activity during a recording.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeekStats {
    pub issued: u64,
    pub timed_out: u64,
    /// Seeks whose decoder gave up without delivering a frame.
    pub abandoned: u64,
}

impl SeekStats {
    pub fn absorb(&mut self, other: SeekStats) {
        self.issued += other.issued;
        self.timed_out += other.timed_out;
        self.abandoned += other.abandoned;
    }
}

/// Summary of a finished export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportReport {
    /// Where the sink put the video.
    pub output_path: PathBuf,
    pub frames: u64,
    pub fps: u32,
    pub width: u32,
    pub height: u32,
    pub bytes: u64,
    pub seeks: SeekStats,
    pub elapsed_secs: f64,
    /// RFC 3339 completion timestamp.
    pub finished_at: String,
}

impl ExportReport {
    /// Path of the JSON report that sits next to the video.
    pub fn report_path(&self) -> PathBuf {
        self.output_path.with_extension("export.json")
    }

    /// Write the report as pretty JSON next to the video.
    pub fn save_beside_output(&self) -> BlasterResult<PathBuf> {
        let path = self.report_path();
        std::fs::write(&path, serde_json::to_string_pretty(self)?)?;
        Ok(path)
    }
}

/// How an export ended. The session is back in `Idle` in every case.
#[derive(Debug, Clone)]
pub enum ExportOutcome {
    Saved(ExportReport),
    Failed { message: String },
    /// Stopped by the stop flag; nothing was delivered.
    Cancelled,
}

impl ExportOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, Self::Saved(_))
    }

    pub fn stage(&self) -> ExportStage {
        match self {
            Self::Saved(_) => ExportStage::Complete,
            Self::Failed { .. } => ExportStage::Failed,
            Self::Cancelled => ExportStage::Cancelled,
        }
    }
}

/// Destination for the finished container bytes.
#[async_trait]
pub trait ExportSink: Send {
    /// Store `bytes` under `file_name` and return where they went.
    async fn deliver(&mut self, file_name: &str, bytes: &[u8]) -> BlasterResult<PathBuf>;
}

/// Writes exports into a directory, replacing any previous file.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl ExportSink for DirectorySink {
    async fn deliver(&mut self, file_name: &str, bytes: &[u8]) -> BlasterResult<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(file_name);
        tokio::fs::write(&path, bytes).await?;
        tracing::info!(path = %path.display(), bytes = bytes.len(), "Export written");
        Ok(path)
    }
}

/// Position on a video's own timeline for a global timeline position.
/// Videos loop; an unknown or zero duration pins the video to its start.
pub fn video_target_secs(timeline_secs: f64, duration_secs: f64) -> f64 {
    if !duration_secs.is_finite() || duration_secs <= 0.0 || !timeline_secs.is_finite() {
        return 0.0;
    }
    timeline_secs.rem_euclid(duration_secs)
}

/// Seek every distinct video among `active` to its timeline position and wait
/// for the seeks, all bounded by one shared deadline.
///
/// A video shown by several instances is seeked once. Timeouts are counted,
/// never fatal.
pub async fn sync_video_sources(
    registry: &mut MediaRegistry,
    active: &[ActiveInstance],
    timeline_secs: f64,
    timeout: Duration,
) -> SeekStats {
    let mut seen = HashSet::new();
    let mut pending = Vec::new();

    for instance in active {
        if instance.kind != MediaKind::Video || !seen.insert(instance.media) {
            continue;
        }
        let Some(video) = registry
            .get_mut(instance.media)
            .and_then(|item| item.video_mut())
        else {
            continue;
        };
        let target = video_target_secs(timeline_secs, video.duration_secs());
        if (video.current_time() - target).abs() > SEEK_TOLERANCE_SECS {
            pending.push((instance.media, video.seek(target)));
        }
    }

    let mut stats = SeekStats {
        issued: pending.len() as u64,
        ..SeekStats::default()
    };
    if pending.is_empty() {
        return stats;
    }

    // Every decode is already in flight; waiting on them in turn against the
    // shared deadline bounds the whole step by `timeout`.
    let deadline = tokio::time::Instant::now() + timeout;
    for (media, completion) in pending {
        match tokio::time::timeout_at(deadline, completion).await {
            Ok(Ok(())) => {}
            Ok(Err(_)) => {
                stats.abandoned += 1;
                tracing::debug!(%media, "Seek abandoned");
            }
            Err(_) => {
                stats.timed_out += 1;
                tracing::debug!(%media, timeline_secs, "Seek timed out");
            }
        }
    }
    stats
}

/// Encoder, recording buffer, and pipeline state.
pub struct Recorder {
    state: RecorderState,
    settings: ExportSettings,
    factory: Box<dyn EncoderFactory>,
    encoder: Option<Box<dyn VideoEncoder>>,
    buffer: RasterSurface,
    recorded_frames: u64,
    target_frames: u64,
    seeks: SeekStats,
    started_at: Option<Instant>,
    stop_flag: Arc<AtomicBool>,
}

impl Recorder {
    /// Build a recorder for `canvas`. Encoder creation failures are logged
    /// and retried when the next recording starts.
    pub fn new(settings: ExportSettings, factory: Box<dyn EncoderFactory>, canvas: CanvasSize) -> Self {
        let mut recorder = Self {
            state: RecorderState::Idle,
            target_frames: settings.target_frames(),
            settings,
            factory,
            encoder: None,
            buffer: RasterSurface::for_canvas(canvas),
            recorded_frames: 0,
            seeks: SeekStats::default(),
            started_at: None,
            stop_flag: Arc::new(AtomicBool::new(false)),
        };
        recorder.replace_encoder();
        recorder
    }

    pub fn state(&self) -> RecorderState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == RecorderState::Idle
    }

    pub fn settings(&self) -> &ExportSettings {
        &self.settings
    }

    /// Name the finished recording is delivered under.
    pub fn file_name(&self) -> &str {
        self.factory.file_name()
    }

    /// Settings changes apply from the next recording on.
    pub fn settings_mut(&mut self) -> &mut ExportSettings {
        &mut self.settings
    }

    pub fn recorded_frames(&self) -> u64 {
        self.recorded_frames
    }

    /// Frame count of the current (or next) recording.
    pub fn target_frames(&self) -> u64 {
        if self.state == RecorderState::Idle {
            self.settings.target_frames()
        } else {
            self.target_frames
        }
    }

    pub fn is_complete(&self) -> bool {
        self.recorded_frames >= self.target_frames
    }

    pub fn seek_stats(&self) -> SeekStats {
        self.seeks
    }

    pub fn record_seeks(&mut self, stats: SeekStats) {
        self.seeks.absorb(stats);
    }

    pub fn buffer(&self) -> &RasterSurface {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut RasterSurface {
        &mut self.buffer
    }

    pub fn has_encoder(&self) -> bool {
        self.encoder.is_some()
    }

    /// Get a clone of the stop flag for use in other tasks.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.stop_flag.clone()
    }

    pub fn stop_requested(&self) -> bool {
        self.stop_flag.load(Ordering::SeqCst)
    }

    /// Enter `Recording`. Only valid from `Idle`.
    pub fn begin(&mut self) -> BlasterResult<()> {
        if self.state != RecorderState::Idle {
            return Err(BlasterError::recording("Recording already in progress"));
        }
        if self.encoder.is_none() {
            let settings = self.current_encoder_settings();
            self.encoder = Some(self.factory.create(settings)?);
        }

        self.stop_flag.store(false, Ordering::SeqCst);
        self.recorded_frames = 0;
        self.target_frames = self.settings.target_frames();
        self.seeks = SeekStats::default();
        self.started_at = Some(Instant::now());
        self.state = RecorderState::Recording;

        tracing::info!(
            target_frames = self.target_frames,
            fps = self.settings.fps,
            width = self.buffer.width(),
            height = self.buffer.height(),
            encoder = self.factory.name(),
            "Recording started"
        );
        Ok(())
    }

    /// Hand the recording buffer to the encoder.
    pub fn submit_frame(&mut self) -> BlasterResult<u64> {
        if self.state != RecorderState::Recording {
            return Err(BlasterError::recording("Not recording"));
        }
        let encoder = self
            .encoder
            .as_mut()
            .ok_or_else(|| BlasterError::recording("No encoder available"))?;
        encoder.add_frame_rgba(self.buffer.as_rgba())?;
        self.recorded_frames += 1;

        if self.recorded_frames % PROGRESS_LOG_INTERVAL == 0 {
            tracing::info!(
                frame = self.recorded_frames,
                total = self.target_frames,
                "Encoded frame"
            );
        }
        Ok(self.recorded_frames)
    }

    /// Enter `Finalizing`.
    pub fn begin_finalizing(&mut self) {
        self.state = RecorderState::Finalizing;
    }

    /// Flush the encoder and return the container bytes.
    pub fn finish_encode(&mut self) -> BlasterResult<Vec<u8>> {
        let mut encoder = self
            .encoder
            .take()
            .ok_or_else(|| BlasterError::recording("No encoder available"))?;
        encoder.finalize()
    }

    /// Drop the current encoder along with any partial output.
    pub fn discard_encode(&mut self) {
        if self.encoder.take().is_some() {
            tracing::debug!(frames = self.recorded_frames, "Partial encode discarded");
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.map(|t| t.elapsed()).unwrap_or_default()
    }

    /// Return to `Idle` with a fresh encoder.
    pub fn reset(&mut self) {
        self.replace_encoder();
        self.recorded_frames = 0;
        self.started_at = None;
        self.stop_flag.store(false, Ordering::SeqCst);
        self.state = RecorderState::Idle;
    }

    /// Reallocate the recording buffer and encoder for a new canvas.
    pub fn reconfigure(&mut self, canvas: CanvasSize) -> BlasterResult<()> {
        if self.state != RecorderState::Idle {
            return Err(BlasterError::recording("Cannot resize while recording"));
        }
        self.buffer = RasterSurface::for_canvas(canvas);
        self.replace_encoder();
        Ok(())
    }

    fn current_encoder_settings(&self) -> EncoderSettings {
        self.settings
            .encoder_settings(self.buffer.width(), self.buffer.height())
    }

    fn replace_encoder(&mut self) {
        self.encoder = None;
        let settings = self.current_encoder_settings();
        match self.factory.create(settings) {
            Ok(encoder) => self.encoder = Some(encoder),
            Err(e) => {
                tracing::warn!(error = %e, encoder = self.factory.name(), "Failed to create encoder");
            }
        }
    }
}

impl std::fmt::Debug for Recorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Recorder")
            .field("state", &self.state)
            .field("settings", &self.settings)
            .field("encoder", &self.factory.name())
            .field("has_encoder", &self.encoder.is_some())
            .field("recorded_frames", &self.recorded_frames)
            .field("target_frames", &self.target_frames)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::MP4_FILE_NAME;

    #[test]
    fn test_target_frames_rounds() {
        let mut settings = ExportSettings::default();
        assert_eq!(settings.target_frames(), 300);
        settings.video_length_secs = 2.5;
        settings.fps = 24;
        assert_eq!(settings.target_frames(), 60);
        settings.video_length_secs = 0.0;
        assert_eq!(settings.target_frames(), 0);
    }

    #[test]
    fn test_defaults_match_recording_defaults() {
        let settings = ExportSettings::default();
        assert_eq!(settings.fps, 30);
        assert_eq!(settings.bitrate_kbps, 50_000);
        assert_eq!(settings.keyframe_interval, 10);
        assert_eq!(settings.seek_timeout, Duration::from_millis(100));
        assert_eq!(settings.decode_settle, Duration::from_millis(50));
    }

    #[test]
    fn test_video_target_loops() {
        assert!((video_target_secs(7.5, 3.0) - 1.5).abs() < 1e-12);
        assert_eq!(video_target_secs(2.0, 3.0), 2.0);
        assert_eq!(video_target_secs(5.0, 0.0), 0.0);
        assert_eq!(video_target_secs(5.0, f64::NAN), 0.0);
        assert_eq!(video_target_secs(5.0, f64::INFINITY), 0.0);
    }

    #[test]
    fn test_progress_fraction() {
        let p = ExportProgress::new(150, 300, ExportStage::Recording);
        assert!((p.progress - 0.5).abs() < 1e-12);
        assert_eq!(ExportProgress::new(0, 0, ExportStage::Complete).progress, 1.0);
    }

    #[test]
    fn test_report_path_sits_beside_video() {
        let report = ExportReport {
            output_path: PathBuf::from("/out/blaster.mp4"),
            frames: 300,
            fps: 30,
            width: 1080,
            height: 1080,
            bytes: 1,
            seeks: SeekStats::default(),
            elapsed_secs: 1.0,
            finished_at: "2026-01-01T00:00:00+00:00".to_string(),
        };
        assert_eq!(report.report_path(), PathBuf::from("/out/blaster.export.json"));
    }

    proptest::proptest! {
        #[test]
        fn prop_video_target_within_duration(
            frame in 0u64..1_000_000,
            duration in 0.01f64..600.0,
        ) {
            let target = video_target_secs(FrameClock::frame_to_secs(frame, 30), duration);
            proptest::prop_assert!(target >= 0.0 && target < duration);
        }
    }

    #[tokio::test]
    async fn test_directory_sink_writes_file() {
        let dir = std::env::temp_dir().join(format!("blaster-sink-{}", std::process::id()));
        let mut sink = DirectorySink::new(&dir);
        let path = sink.deliver(MP4_FILE_NAME, b"mp4 bytes").await.unwrap();
        assert_eq!(path, dir.join("blaster.mp4"));
        assert_eq!(std::fs::read(&path).unwrap(), b"mp4 bytes");
        std::fs::remove_dir_all(&dir).ok();
    }
}
