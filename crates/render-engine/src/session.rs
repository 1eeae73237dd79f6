//! The Blaster session: media, simulation, preview, and recording.
//!
//! A session owns every piece of mutable state. The live preview advances
//! through [`BlasterSession::preview_tick`]; an export takes over the same
//! simulation and drives it frame by frame until the recording is complete,
//! then hands control back to the preview with a freshly restarted timeline.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use blaster_animation_core::{apply_motion, SimulationState, SpawnScheduler};
use blaster_common::error::{BlasterError, BlasterResult};
use blaster_media_model::{
    BackgroundColor, BlastConfig, CanvasSize, Direction, MediaHandle, MediaId, MediaKind,
    MediaRegistry, MotionConfig, SceneSettings,
};

use crate::compositor::{render_frame, RenderStats};
use crate::encoder::EncoderFactory;
use crate::export::{
    sync_video_sources, video_target_secs, ExportOutcome, ExportProgress, ExportReport,
    ExportSettings, ExportSink, ExportStage, ProgressCallback, Recorder, RecorderState,
    SEEK_TOLERANCE_SECS,
};
use crate::surface::{RasterSurface, Surface};

/// One collage: loaded media, scene settings, simulation, and recorder.
#[derive(Debug)]
pub struct BlasterSession {
    registry: MediaRegistry,
    state: SimulationState,
    scheduler: SpawnScheduler,
    scene: SceneSettings,
    live: RasterSurface,
    recorder: Recorder,
}

impl BlasterSession {
    pub fn new(
        scene: SceneSettings,
        settings: ExportSettings,
        factory: Box<dyn EncoderFactory>,
        seed: u64,
    ) -> Self {
        Self::from_registry(MediaRegistry::new(), scene, settings, factory, seed)
    }

    /// Build a session around media that was already loaded.
    pub fn from_registry(
        registry: MediaRegistry,
        scene: SceneSettings,
        settings: ExportSettings,
        factory: Box<dyn EncoderFactory>,
        seed: u64,
    ) -> Self {
        let fps = settings.fps;
        let canvas = scene.canvas;
        Self {
            registry,
            state: SimulationState::new(fps),
            scheduler: SpawnScheduler::new(seed),
            live: RasterSurface::for_canvas(canvas),
            recorder: Recorder::new(settings, factory, canvas),
            scene,
        }
    }

    // Accessors

    pub fn registry(&self) -> &MediaRegistry {
        &self.registry
    }

    pub fn simulation(&self) -> &SimulationState {
        &self.state
    }

    pub fn scene(&self) -> &SceneSettings {
        &self.scene
    }

    pub fn live_surface(&self) -> &RasterSurface {
        &self.live
    }

    pub fn recorder(&self) -> &Recorder {
        &self.recorder
    }

    pub fn recorder_state(&self) -> RecorderState {
        self.recorder.state()
    }

    /// Setting the flag stops a running export before its next frame.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.recorder.stop_flag()
    }

    // Media registry

    /// Register a decoded item at the end of the spawn order.
    pub fn add_media(&mut self, kind: MediaKind, name: impl Into<String>, handle: MediaHandle) -> MediaId {
        self.registry.add(kind, name, handle)
    }

    /// Remove an item, release its resources, and drop its active instances.
    pub fn remove_media(&mut self, id: MediaId) -> bool {
        match self.registry.remove(id) {
            Some(_) => {
                let pruned = self.state.prune_media(id);
                tracing::info!(%id, pruned, "Media removed from session");
                true
            }
            None => false,
        }
    }

    /// Move the item at `from` to index `to` in the spawn order.
    pub fn move_media(&mut self, from: usize, to: usize) -> BlasterResult<()> {
        self.registry.move_item(from, to)
    }

    // Scene settings

    pub fn set_blast_config(&mut self, blast: BlastConfig) -> BlasterResult<()> {
        blast.validate()?;
        self.scene.blast = blast;
        Ok(())
    }

    pub fn set_motion(&mut self, motion: MotionConfig) {
        self.scene.motion = motion;
    }

    /// Flip a motion direction, disabling its opposite.
    pub fn toggle_motion(&mut self, direction: Direction) -> bool {
        self.scene.motion.toggle(direction)
    }

    pub fn set_background(&mut self, background: BackgroundColor) {
        self.scene.background = background;
    }

    /// Applies from the next recording on.
    pub fn set_video_length(&mut self, secs: f64) -> BlasterResult<()> {
        if !secs.is_finite() || secs <= 0.0 {
            return Err(BlasterError::config("video length must be positive"));
        }
        self.recorder.settings_mut().video_length_secs = secs;
        Ok(())
    }

    /// Switch canvas size. Reallocates the live surface, the recording
    /// buffer, and the encoder. Only allowed while idle.
    pub fn set_canvas_size(&mut self, canvas: CanvasSize) -> BlasterResult<()> {
        if !self.recorder.is_idle() {
            return Err(BlasterError::recording("Cannot resize the canvas while recording"));
        }
        self.recorder.reconfigure(canvas)?;
        self.live = RasterSurface::for_canvas(canvas);
        self.scene.canvas = canvas;
        tracing::info!(canvas = %canvas, "Canvas size updated");
        Ok(())
    }

    /// Replace all scene settings at once, resizing if the canvas changed.
    pub fn apply_scene(&mut self, scene: SceneSettings) -> BlasterResult<()> {
        scene.validate()?;
        if scene.canvas != self.scene.canvas {
            self.set_canvas_size(scene.canvas)?;
        }
        self.scene = scene;
        Ok(())
    }

    // Timeline

    /// Reset the timeline: frame 0, no active instances, first item next,
    /// spawn positions replayed from the seed, every video rewound and paused.
    pub fn restart(&mut self) {
        self.state.restart();
        self.scheduler.reseed();
        self.registry.rewind_videos();
        tracing::debug!("Timeline restarted");
    }

    /// Advance the live preview by one frame. Does nothing unless idle.
    ///
    /// Video seeks are issued without waiting; the preview shows whatever has
    /// been decoded so far.
    pub fn preview_tick(&mut self) -> Option<RenderStats> {
        if !self.recorder.is_idle() {
            return None;
        }
        self.state.advance();
        self.simulate();

        let timeline_secs = self.state.timeline_secs();
        for instance in self.state.active() {
            if instance.kind != MediaKind::Video {
                continue;
            }
            if let Some(video) = self
                .registry
                .get_mut(instance.media)
                .and_then(|item| item.video_mut())
            {
                let target = video_target_secs(timeline_secs, video.duration_secs());
                if (video.current_time() - target).abs() > SEEK_TOLERANCE_SECS {
                    drop(video.seek(target));
                }
                video.play();
            }
        }
        self.registry.poll_videos();

        Some(render_frame(
            &mut self.live,
            &self.state,
            &self.registry,
            &self.scene.blast,
            self.scene.background,
        ))
    }

    // Recording

    /// Enter `Recording` and reset the timeline. Fails if not idle.
    pub fn start_recording(&mut self) -> BlasterResult<()> {
        self.recorder.begin()?;
        self.restart();
        Ok(())
    }

    /// Produce and encode the next frame. Returns the recorded frame count.
    pub async fn record_frame(&mut self) -> BlasterResult<u64> {
        if self.recorder.state() != RecorderState::Recording {
            return Err(BlasterError::recording("Not recording"));
        }

        self.state.advance();
        self.simulate();

        let settings = self.recorder.settings().clone();
        let seeks = sync_video_sources(
            &mut self.registry,
            self.state.active(),
            self.state.timeline_secs(),
            settings.seek_timeout,
        )
        .await;
        self.recorder.record_seeks(seeks);

        tokio::time::sleep(settings.decode_settle).await;
        self.registry.poll_videos();

        render_frame(
            &mut self.live,
            &self.state,
            &self.registry,
            &self.scene.blast,
            self.scene.background,
        );
        render_frame(
            self.recorder.buffer_mut(),
            &self.state,
            &self.registry,
            &self.scene.blast,
            self.scene.background,
        );

        self.recorder.submit_frame()
    }

    /// Leave `Recording`: deliver or discard the encode, then return to
    /// `Idle` with a fresh encoder and a restarted timeline.
    ///
    /// `failure` carries an error that aborted the frame loop. Without one,
    /// an incomplete recording with the stop flag set counts as cancelled.
    pub async fn finish_recording(
        &mut self,
        sink: &mut dyn ExportSink,
        failure: Option<BlasterError>,
    ) -> ExportOutcome {
        self.recorder.begin_finalizing();
        tracing::info!(frames = self.recorder.recorded_frames(), "Finalizing video");

        let outcome = match failure {
            Some(err) => {
                self.recorder.discard_encode();
                tracing::error!(error = %err, "Recording failed");
                ExportOutcome::Failed {
                    message: err.to_string(),
                }
            }
            None if self.recorder.stop_requested() && !self.recorder.is_complete() => {
                self.recorder.discard_encode();
                tracing::info!(frames = self.recorder.recorded_frames(), "Recording cancelled");
                ExportOutcome::Cancelled
            }
            None => match self.deliver(sink).await {
                Ok(report) => ExportOutcome::Saved(report),
                Err(err) => {
                    tracing::error!(error = %err, "Failed to save video");
                    ExportOutcome::Failed {
                        message: err.to_string(),
                    }
                }
            },
        };

        self.recorder.reset();
        self.restart();
        outcome
    }

    /// Record a full video and deliver it to `sink`.
    ///
    /// Returns `Err` only if the recording could not start. Every started
    /// recording ends back in `Idle`, whatever the outcome.
    pub async fn export(
        &mut self,
        sink: &mut dyn ExportSink,
        progress: Option<ProgressCallback>,
    ) -> BlasterResult<ExportOutcome> {
        self.start_recording()?;
        let total = self.recorder.target_frames();
        let report = |frames: u64, stage: ExportStage| {
            if let Some(cb) = &progress {
                cb(ExportProgress::new(frames, total, stage));
            }
        };
        report(0, ExportStage::Preparing);

        let mut failure = None;
        while !self.recorder.is_complete() {
            if self.recorder.stop_requested() {
                break;
            }
            match self.record_frame().await {
                Ok(frames) => report(frames, ExportStage::Recording),
                Err(err) => {
                    failure = Some(err);
                    break;
                }
            }
        }

        let recorded = self.recorder.recorded_frames();
        report(recorded, ExportStage::Finalizing);
        let outcome = self.finish_recording(sink, failure).await;
        report(recorded, outcome.stage());
        Ok(outcome)
    }

    fn simulate(&mut self) {
        let center = self.scene.canvas.center();
        self.scheduler
            .step(&mut self.state, &mut self.registry, &self.scene.blast, center);
        apply_motion(self.state.active_mut(), &self.scene.motion, center);
    }

    async fn deliver(&mut self, sink: &mut dyn ExportSink) -> BlasterResult<ExportReport> {
        let bytes = self.recorder.finish_encode()?;
        let output_path = sink.deliver(self.recorder.file_name(), &bytes).await?;
        let settings = self.recorder.settings();
        let report = ExportReport {
            output_path,
            frames: self.recorder.recorded_frames(),
            fps: settings.fps,
            width: self.recorder.buffer().width(),
            height: self.recorder.buffer().height(),
            bytes: bytes.len() as u64,
            seeks: self.recorder.seek_stats(),
            elapsed_secs: self.recorder.elapsed().as_secs_f64(),
            finished_at: chrono::Utc::now().to_rfc3339(),
        };
        tracing::info!(
            path = %report.output_path.display(),
            frames = report.frames,
            seeks_issued = report.seeks.issued,
            seeks_timed_out = report.seeks.timed_out,
            "Video saved successfully"
        );
        Ok(report)
    }
}
