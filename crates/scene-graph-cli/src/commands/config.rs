//! Config command implementation.
//!
//! Manages CLI configuration.

use anyhow::{Context, Result};

use scene_graph_client::{Config, CONFIG_KEYS};

/// Show current configuration.
pub fn show(config: &Config) -> Result<()> {
    println!("Scene Graph CLI Configuration");
    println!("{:-<40}", "");

    println!("Endpoint:        {}", config.endpoint);
    println!("Timeout:         {} s", config.timeout_secs);
    println!("Show overview:   {}", config.show_overview);

    if let Some(config_path) = Config::config_file_path() {
        println!("\nConfig file: {}", config_path.display());
    }

    Ok(())
}

/// Set a configuration value.
pub fn set(config: &mut Config, key: &str, value: &str) -> Result<()> {
    config.set(key, value)?;
    let path = config.save().context("Failed to save configuration")?;
    println!("Set {} to: {}", key, value);
    tracing::debug!(path = %path.display(), "Configuration saved");
    Ok(())
}

/// Get a configuration value.
pub fn get(config: &Config, key: &str) -> Result<()> {
    let Some(value) = config.get(key) else {
        anyhow::bail!(
            "Unknown config key: {}. Valid keys: {}",
            key,
            CONFIG_KEYS.join(", ")
        );
    };
    println!("{}", value);
    Ok(())
}

/// Reset configuration to defaults.
pub fn reset() -> Result<()> {
    let config = Config::default();
    config.save().context("Failed to save configuration")?;
    println!("Configuration reset to defaults");
    Ok(())
}
