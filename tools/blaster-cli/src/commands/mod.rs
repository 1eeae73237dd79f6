pub mod check;
pub mod config;
pub mod init;
pub mod preview;
pub mod render;
pub mod validate;

use blaster_common::config::AppConfig;
use blaster_media_io::MediaLoader;
use blaster_media_model::{MediaRegistry, SceneSettings};
use blaster_render_engine::{BlasterSession, EncoderFactory, ExportSettings};

use crate::SceneArgs;

/// Resolve scene settings: preset first, then command-line overrides.
fn scene_settings(args: &SceneArgs) -> anyhow::Result<SceneSettings> {
    let mut scene = match &args.preset {
        Some(path) => SceneSettings::load(path)
            .map_err(|e| anyhow::anyhow!("Failed to load preset {}: {e}", path.display()))?,
        None => SceneSettings::default(),
    };
    if let Some(canvas) = args.canvas {
        scene.canvas = canvas;
    }
    if let Some(background) = args.background {
        scene.background = background;
    }
    for direction in &args.motion {
        if !scene.motion.is_enabled(*direction) {
            scene.motion.toggle(*direction);
        }
    }
    scene.validate()?;
    Ok(scene)
}

/// Load media and build a session ready to preview or record.
pub(crate) fn build_session(
    config: &AppConfig,
    args: &SceneArgs,
    settings: ExportSettings,
    factory: Box<dyn EncoderFactory>,
) -> anyhow::Result<BlasterSession> {
    let scene = scene_settings(args)?;

    println!("Loading {} media file(s)...", args.files.len());
    let mut registry = MediaRegistry::new();
    let summary = MediaLoader::new().load_all(&mut registry, &args.files);
    for (path, err) in &summary.failed {
        let label = if err.is_per_item() { "SKIP" } else { "FAIL" };
        println!("  [{label}] {}: {err}", path.display());
    }
    for item in registry.iter() {
        let (w, h) = item.dimensions();
        println!("  [OK]   {} ({:?}, {w}x{h})", item.name, item.kind);
    }
    if registry.is_empty() {
        anyhow::bail!("No media could be loaded");
    }

    let seed = args.seed.unwrap_or(config.recording.seed);
    Ok(BlasterSession::from_registry(
        registry, scene, settings, factory, seed,
    ))
}

/// Export settings from the config, with the frame rate override applied.
pub(crate) fn export_settings(config: &AppConfig, args: &SceneArgs) -> ExportSettings {
    let mut settings = ExportSettings::from(&config.recording);
    if let Some(fps) = args.fps {
        settings.fps = fps.max(1);
    }
    settings
}
