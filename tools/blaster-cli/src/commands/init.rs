//! Write a default scene preset.

use std::path::PathBuf;

use blaster_media_model::{CanvasSize, SceneSettings};

pub fn run(path: PathBuf, canvas: CanvasSize, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }

    let scene = SceneSettings {
        canvas,
        ..SceneSettings::default()
    };
    scene
        .save(&path)
        .map_err(|e| anyhow::anyhow!("Failed to write preset: {e}"))?;

    println!("Preset written: {}", path.display());
    println!("  Canvas: {canvas}");
    println!(
        "  Spawn every {} frames, lifetime {} frames",
        scene.blast.spawn_interval, scene.blast.lifetime
    );
    println!(
        "  Scale {} -> {} over {} frames",
        scene.blast.start_scale, scene.blast.end_scale, scene.blast.animation_duration
    );
    println!("  Background: {}", scene.background.to_hex());

    Ok(())
}
