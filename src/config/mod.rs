mod schema;

pub use schema::Config;

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Load configuration from a YAML file.
///
/// # Errors
///
/// Returns an error if:
/// - The config file does not exist
/// - The config file cannot be read
/// - The YAML cannot be parsed
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        anyhow::bail!("Config file not found at {}", path.display());
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file at {}", path.display()))?;

    parse_config(&content)
        .with_context(|| format!("Failed to parse config: invalid YAML in {}", path.display()))
}

/// Parse configuration from a YAML string.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = serde_saphyr::from_str(content)?;
    Ok(config)
}
