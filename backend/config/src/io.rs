//! Config file read/write with backup rotation.

use crate::schema::MiruConfig;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

const CONFIG_FILE_NAME: &str = "config.yaml";

/// Number of rolling backups to keep.
const MAX_BACKUPS: usize = 3;

/// Resolve the Miru config directory.
/// Priority: `MIRU_CONFIG_DIR` env > `~/.miru/` > `./.miru/`
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("MIRU_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .map(|home| home.join(".miru"))
        .unwrap_or_else(|| PathBuf::from(".miru"))
}

pub fn config_file_path(config_dir: &Path) -> PathBuf {
    config_dir.join(CONFIG_FILE_NAME)
}

/// Load and parse the config from disk.
///
/// A missing file is not an error; it yields an empty config.
pub async fn load_config(path: &Path) -> Result<MiruConfig> {
    if !path.exists() {
        debug!(path = %path.display(), "Config file does not exist; using defaults");
        return Ok(MiruConfig::default());
    }

    let raw = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: MiruConfig = if raw.trim().is_empty() {
        MiruConfig::default()
    } else {
        serde_yaml::from_str(&raw)
            .with_context(|| format!("Failed to parse config YAML at: {}", path.display()))?
    };

    info!(path = %path.display(), "Loaded config");
    Ok(config)
}

/// Write config to disk via a temp file and rename, keeping the previous
/// file as `config.yaml.bak.1`.
pub async fn write_config(config: &MiruConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await.with_context(|| {
            format!("Failed to create config directory: {}", parent.display())
        })?;
    }

    if path.exists() {
        rotate_backups(path).await;
    }

    let yaml = serde_yaml::to_string(config).context("Failed to serialize config to YAML")?;

    let tmp_path = path.with_extension("yaml.tmp");
    fs::write(&tmp_path, yaml.as_bytes())
        .await
        .with_context(|| format!("Failed to write temp config: {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path)
        .await
        .with_context(|| format!("Failed to rename temp config to: {}", path.display()))?;

    info!(path = %path.display(), "Wrote config");
    Ok(())
}

async fn rotate_backups(path: &Path) {
    for i in (1..MAX_BACKUPS).rev() {
        let older = path.with_extension(format!("yaml.bak.{}", i));
        let newer = path.with_extension(format!("yaml.bak.{}", i + 1));
        if older.exists() {
            if let Err(e) = fs::rename(&older, &newer).await {
                warn!("Failed to rotate backup {}: {}", older.display(), e);
            }
        }
    }

    let bak = path.with_extension("yaml.bak.1");
    if let Err(e) = fs::copy(path, &bak).await {
        warn!("Failed to create backup {}: {}", bak.display(), e);
    }
}
