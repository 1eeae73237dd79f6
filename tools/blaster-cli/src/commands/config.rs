//! Show or write the application config.

use blaster_common::config::{config_file_path, AppConfig};

pub fn run(config: AppConfig, write: bool) -> anyhow::Result<()> {
    let path = config_file_path();
    println!("Config file: {}", path.display());
    println!("{}", serde_json::to_string_pretty(&config)?);

    if write {
        config
            .save()
            .map_err(|e| anyhow::anyhow!("Failed to write config: {e}"))?;
        println!("\nConfig written.");
    }
    Ok(())
}
