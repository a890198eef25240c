use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use cardio_classifiers::PipelineConfig;

/// Read a JSON pipeline configuration; absent keys take their defaults.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<PipelineConfig> {
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config: {}", path.as_ref().display()))?;
    let config: PipelineConfig = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config: {}", path.as_ref().display()))?;
    Ok(config)
}

/// Use the given file, or the built-in defaults when none is passed.
pub fn resolve_config(path: Option<&PathBuf>) -> Result<PipelineConfig> {
    match path {
        Some(path) => load_config(path),
        None => Ok(PipelineConfig::default()),
    }
}

pub fn default_config_json() -> Result<String> {
    serde_json::to_string_pretty(&PipelineConfig::default())
        .context("Failed to serialize the default configuration")
}
