//! Configuration loader

use crate::config::StatikConfig;
use crate::error::{Error, Result};
use std::path::Path;

/// Configuration loader for the supported formats
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load and validate configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<StatikConfig> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        let config = match ext {
            "json" => Self::from_json(&content)?,
            "toml" => Self::from_toml(&content)?,
            _ => return Err(Error::Config(format!("Unknown config format: {}", ext))),
        };

        config.validate()?;
        tracing::debug!(
            "Loaded {} mount(s) from {}",
            config.mounts.len(),
            path.display()
        );
        Ok(config)
    }

    /// Parse JSON configuration
    pub fn from_json(content: &str) -> Result<StatikConfig> {
        serde_json::from_str(content).map_err(|e| Error::Config(format!("Invalid JSON: {}", e)))
    }

    /// Parse TOML configuration
    pub fn from_toml(content: &str) -> Result<StatikConfig> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))
    }
}
