//! Config and transcript files
//!
//! Writes go through a temp file that is synced and then renamed over the
//! target, so a crash never leaves a half-written config behind.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;
use anyhow::{Context, Result};

use super::ActivityConfig;
use super::error::ConfigError;
use super::turn::TurnRecord;

/// Default config file name
pub const CONFIG_FILE: &str = "spacey.json";

/// Write `data` to `path` atomically
pub fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let temp_path = path.with_extension("tmp");

    let mut file = File::create(&temp_path)
        .with_context(|| format!("Failed to create temp file: {:?}", temp_path))?;
    file.write_all(data)
        .context("Failed to write data")?;
    file.sync_all()
        .context("Failed to sync file")?;
    drop(file);

    fs::rename(&temp_path, path)
        .with_context(|| format!("Failed to rename {:?} to {:?}", temp_path, path))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        let dir = OpenOptions::new()
            .read(true)
            .open(parent)
            .with_context(|| format!("Failed to open directory: {:?}", parent))?;
        dir.sync_all()
            .context("Failed to sync directory")?;
    }

    Ok(())
}

/// Write `config` as pretty JSON
pub fn write_config(path: &Path, config: &ActivityConfig) -> Result<()> {
    let json = serde_json::to_vec_pretty(config)
        .context("Failed to serialize config")?;
    write_atomic(path, &json)
}

/// Load and validate a config file
pub fn load_config(path: &Path) -> Result<ActivityConfig> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()).into());
    }
    let data = fs::read(path)
        .map_err(ConfigError::from)
        .with_context(|| format!("Failed to read file: {:?}", path))?;
    let config: ActivityConfig = serde_json::from_slice(&data)
        .map_err(ConfigError::from)
        .with_context(|| format!("Failed to deserialize config: {:?}", path))?;
    config.validate()?;
    Ok(config)
}

/// Write turn records as newline-delimited JSON
pub fn write_transcript<'a>(
    path: &Path,
    records: impl IntoIterator<Item = &'a TurnRecord>,
) -> Result<()> {
    let mut buf = Vec::new();
    for record in records {
        serde_json::to_writer(&mut buf, record)
            .context("Failed to serialize turn record")?;
        buf.push(b'\n');
    }
    write_atomic(path, &buf)
}
