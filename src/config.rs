use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File looked up in the working directory when `SCRIBE_CONFIG` is unset.
pub const CONFIG_FILE: &str = "scribe.json";

/// Top-level scribe.json schema.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScribeConfig {
    /// Wiki base URL, e.g. `https://wiki.example.com`.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Default space key for new pages.
    #[serde(default)]
    pub space: Option<String>,

    /// Default parent page id for new pages.
    #[serde(default)]
    pub parent: Option<String>,
}

impl Default for ScribeConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            space: None,
            parent: None,
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8090".to_string()
}

/// Where the config file lives: `SCRIBE_CONFIG` if set, else `scribe.json`
/// under `dir`.
pub fn config_path(dir: &Path) -> PathBuf {
    match std::env::var_os("SCRIBE_CONFIG") {
        Some(path) if !path.is_empty() => PathBuf::from(path),
        _ => dir.join(CONFIG_FILE),
    }
}

/// Load config from scribe.json, or defaults if missing, then apply
/// environment overrides.
pub fn load_config(dir: &Path) -> Result<ScribeConfig> {
    let path = config_path(dir);
    let mut config = read_config_file(&path)?;
    apply_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

fn read_config_file(path: &Path) -> Result<ScribeConfig> {
    if !path.exists() {
        log::debug!("no config at {}, using defaults", path.display());
        return Ok(ScribeConfig::default());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let config: ScribeConfig = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(config)
}

/// Apply `SCRIBE_URL`, `SCRIBE_SPACE` and `SCRIBE_PARENT`. Empty values are
/// ignored.
fn apply_overrides(config: &mut ScribeConfig, var: impl Fn(&str) -> Option<String>) {
    let var = |key: &str| var(key).filter(|v| !v.trim().is_empty());
    if let Some(url) = var("SCRIBE_URL") {
        config.base_url = url;
    }
    if let Some(space) = var("SCRIBE_SPACE") {
        config.space = Some(space);
    }
    if let Some(parent) = var("SCRIBE_PARENT") {
        config.parent = Some(parent);
    }
}
