//! Run the real-time preview for a while and keep the last frame.

use std::path::PathBuf;

use blaster_common::config::AppConfig;
use blaster_render_engine::{run_preview, FfmpegEncoderFactory};

use crate::SceneArgs;

pub async fn run(
    config: &AppConfig,
    scene: SceneArgs,
    seconds: f64,
    snapshot: PathBuf,
) -> anyhow::Result<()> {
    if !seconds.is_finite() || seconds <= 0.0 {
        anyhow::bail!("Preview length must be positive");
    }

    let settings = super::export_settings(config, &scene);
    let fps = settings.fps;
    let mut session =
        super::build_session(config, &scene, settings, Box::new(FfmpegEncoderFactory))?;

    let frames = (seconds * fps as f64).round().max(1.0) as u64;
    println!("Previewing {frames} frames at {fps} fps...");

    let mut peak = 0usize;
    let rendered = run_preview(&mut session, frames, |session, stats| {
        peak = peak.max(stats.drawn);
        tracing::trace!(
            frame = session.simulation().frame(),
            drawn = stats.drawn,
            skipped = stats.skipped,
            "Preview frame"
        );
    })
    .await;

    session.live_surface().save_png(&snapshot)?;

    println!("  Frames rendered: {rendered}");
    println!("  Active instances: {}", session.simulation().active().len());
    println!("  Peak instances drawn: {peak}");
    println!("Snapshot saved: {}", snapshot.display());
    Ok(())
}
