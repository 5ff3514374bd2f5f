mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    // Try default locations
    let default_paths = [
        "./livedash.toml",
        "~/.config/livedash/config.toml",
        "/etc/livedash/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.manifest.max_segments == 0 {
        anyhow::bail!("manifest.max_segments must be at least 1");
    }
    if config.manifest.min_buffer_ms < 0 {
        anyhow::bail!("manifest.min_buffer_ms cannot be negative");
    }

    if config.video.timescale == 0 {
        anyhow::bail!("video.timescale cannot be 0");
    }
    if config.video.frame_rate == Some(0) {
        anyhow::bail!("video.frame_rate cannot be 0");
    }

    let audio = &config.audio;
    if audio.enabled {
        if audio.timescale == 0 || audio.sample_rate == 0 {
            anyhow::bail!("audio.timescale and audio.sample_rate cannot be 0");
        }
        if audio.channels == 0 {
            anyhow::bail!("audio.channels cannot be 0");
        }
    }

    Ok(())
}
