//! Check system capabilities.

use blaster_common::config::config_file_path;
use blaster_common::process::command_exists;
use blaster_render_engine::{EncoderFactory, FfmpegEncoderFactory, GifEncoderFactory};

pub fn run() -> anyhow::Result<()> {
    println!("Blaster System Check");
    println!("{}", "=".repeat(50));

    let mut ready = true;
    for (binary, purpose) in [("ffmpeg", "video decode and encode"), ("ffprobe", "video probing")] {
        if command_exists(binary) {
            println!("[OK]   {binary} ({purpose})");
        } else {
            println!("[MISS] {binary} ({purpose})");
            ready = false;
        }
    }

    let factory = FfmpegEncoderFactory;
    if factory.is_available() {
        println!("[OK]   Encoder backend: {}", factory.name());
    } else {
        println!("[MISS] Encoder backend: {}", factory.name());
    }
    println!("[OK]   Encoder backend: {} (built in)", GifEncoderFactory.name());

    let config_path = config_file_path();
    if config_path.exists() {
        println!("[OK]   Config: {}", config_path.display());
    } else {
        println!("[INFO] Config: {} (not present, using defaults)", config_path.display());
    }

    println!();
    if ready {
        println!("Images, GIFs, and videos are supported. Blaster is ready.");
    } else {
        println!("Install ffmpeg to record videos or use video sources.");
        println!("Still images and GIFs can be previewed and exported as GIF without it.");
    }

    Ok(())
}
