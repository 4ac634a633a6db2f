//! Configuration loading and validation

mod schema;

pub use schema::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "tonebox.yaml";

/// Load configuration from a YAML file
pub fn load_config(path: &Path) -> Result<ToneboxConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config: {}", path.display()))?;
    let config: ToneboxConfig = serde_yaml::from_str(&contents)
        .with_context(|| format!("failed to parse config: {}", path.display()))?;
    config.validate()?;
    Ok(config)
}

/// Load `path` if it exists, otherwise use defaults
pub fn load_or_default(path: &Path) -> Result<ToneboxConfig> {
    if path.exists() {
        load_config(path)
    } else {
        Ok(ToneboxConfig::default())
    }
}
