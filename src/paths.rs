//! Data directory layout
//!
//! Everything Keiro keeps locally lives under `~/.config/keiro/`:
//! - `config.toml` - user configuration
//! - `credentials.enc` - encrypted session token
//! - `keiro.sqlite` - local-mode drafts, schedule and library
//! - `local_storage.json` - guest session keys

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

/// Keiro data directory (`~/.config/keiro/`), created on first use
pub fn keiro_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    let dir = home.join(".config").join("keiro");
    fs::create_dir_all(&dir).context("Failed to create keiro directory")?;
    Ok(dir)
}

/// `~/.config/keiro/config.toml`
pub fn config_path() -> Result<PathBuf> {
    Ok(keiro_dir()?.join("config.toml"))
}

/// `~/.config/keiro/keiro.sqlite`
pub fn database_path() -> Result<PathBuf> {
    Ok(keiro_dir()?.join("keiro.sqlite"))
}

/// `~/.config/keiro/credentials.enc`
pub fn credentials_path() -> Result<PathBuf> {
    Ok(keiro_dir()?.join("credentials.enc"))
}

/// `~/.config/keiro/local_storage.json`
pub fn guest_store_path() -> Result<PathBuf> {
    Ok(keiro_dir()?.join("local_storage.json"))
}
