//! Validate a scene preset.

use std::path::PathBuf;

use blaster_media_model::{Direction, SceneSettings};

pub fn run(path: PathBuf) -> anyhow::Result<()> {
    println!("Validating preset at: {}", path.display());

    let scene = SceneSettings::load(&path).map_err(|e| anyhow::anyhow!("Invalid preset: {e}"))?;

    println!("  Canvas: {}", scene.canvas);
    println!("  Background: {}", scene.background.to_hex());
    println!("  Spawn interval: {} frames", scene.blast.spawn_interval);
    println!("  Lifetime: {} frames", scene.blast.lifetime);
    println!(
        "  Scale: {} -> {} over {} frames",
        scene.blast.start_scale, scene.blast.end_scale, scene.blast.animation_duration
    );
    println!("  Spread: {} px", scene.blast.spread_radius);

    let enabled: Vec<String> = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
        Direction::Inward,
        Direction::Outward,
    ]
    .into_iter()
    .filter(|d| scene.motion.is_enabled(*d))
    .map(|d| format!("{d:?}").to_lowercase())
    .collect();
    if enabled.is_empty() {
        println!("  Motion: none");
    } else {
        println!("  Motion: {} at {} px/frame", enabled.join(", "), scene.motion.speed);
    }

    println!("\nPreset is valid.");
    Ok(())
}
