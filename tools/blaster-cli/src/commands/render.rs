//! Record a collage video.

use std::path::PathBuf;
use std::sync::atomic::Ordering;

use blaster_common::config::AppConfig;
use blaster_render_engine::{
    DirectorySink, ExportFormat, ExportOutcome, ExportProgress, ExportStage,
};

use crate::SceneArgs;

pub async fn run(
    config: &AppConfig,
    scene: SceneArgs,
    output: Option<PathBuf>,
    seconds: Option<f64>,
    format: ExportFormat,
    write_report: bool,
) -> anyhow::Result<()> {
    let factory = format.factory();
    if !factory.is_available() {
        anyhow::bail!(
            "{format} recording is not supported: {} is unavailable",
            factory.name()
        );
    }

    let settings = super::export_settings(config, &scene);
    let mut session = super::build_session(config, &scene, settings, factory)?;
    if let Some(secs) = seconds {
        session.set_video_length(secs)?;
    }

    let output_dir = output.unwrap_or_else(|| config.output_dir.clone());
    let recording = session.recorder().settings();
    let canvas = session.scene().canvas;
    println!(
        "Recording {}s at {} fps as {format}",
        recording.video_length_secs, recording.fps
    );
    println!("  Canvas: {canvas}");
    println!("  Output: {}", output_dir.join(session.recorder().file_name()).display());
    println!("Press Ctrl+C to cancel...");
    println!();

    let stop = session.stop_flag();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            stop.store(true, Ordering::SeqCst);
        }
    });

    let progress_cb: Box<dyn Fn(ExportProgress) + Send> = Box::new(|p| match p.stage {
        ExportStage::Recording => print!(
            "\r  Progress: {:.1}% ({}/{} frames)  ",
            p.progress * 100.0,
            p.frames_recorded,
            p.total_frames,
        ),
        ExportStage::Finalizing => print!("\r  Finalizing video...                    "),
        _ => {}
    });

    let mut sink = DirectorySink::new(output_dir);
    let outcome = session.export(&mut sink, Some(progress_cb)).await;
    ctrl_c.abort();

    match outcome? {
        ExportOutcome::Saved(report) => {
            println!("\nVideo saved: {}", report.output_path.display());
            println!(
                "  {} frames, {}x{}, {} bytes in {:.1}s",
                report.frames, report.width, report.height, report.bytes, report.elapsed_secs
            );
            if report.seeks.timed_out > 0 || report.seeks.abandoned > 0 {
                println!(
                    "  [WARN] {} of {} video seeks did not finish in time",
                    report.seeks.timed_out + report.seeks.abandoned,
                    report.seeks.issued
                );
            }
            if write_report {
                let path = report.save_beside_output()?;
                println!("  Report: {}", path.display());
            }
        }
        ExportOutcome::Failed { message } => {
            anyhow::bail!("Failed to save video: {message}");
        }
        ExportOutcome::Cancelled => {
            println!("\nRecording cancelled, nothing was saved.");
        }
    }

    Ok(())
}
