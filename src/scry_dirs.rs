//! Centralized filesystem paths for scry.
//!
//! Provides a single source of truth for the directories the pipeline
//! touches. Uses the [`dirs`] crate for platform-appropriate resolution.
//!
//! # Directory Layout
//!
//! | Purpose | macOS | Linux |
//! |---------|-------|-------|
//! | Config | `~/Library/Application Support/scry/` | `~/.config/scry/` |
//! | Cache | `~/Library/Caches/scry/` | `~/.cache/scry/` |
//! | Data (logs) | `~/Library/Application Support/scry/` | `~/.local/share/scry/` |
//!
//! # Environment Overrides
//!
//! All paths can be overridden for testing or custom deployments:
//! - `SCRY_CONFIG_DIR` — overrides [`config_dir`]
//! - `SCRY_CACHE_ROOT` — overrides [`cache_dir`]
//! - `SCRY_DATA_DIR` — overrides [`data_dir`]
//! - `SCRY_LOG_DIR` — overrides [`logs_dir`]

use std::path::PathBuf;

/// Application data root directory.
///
/// Resolves to `dirs::data_dir()/scry/` by default. Override with the
/// `SCRY_DATA_DIR` environment variable.
#[must_use]
pub fn data_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("SCRY_DATA_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::data_dir()
        .map(|d| d.join("scry"))
        .unwrap_or_else(|| PathBuf::from("/tmp/scry-data"))
}

/// Application config directory.
///
/// Holds `config.toml`. Resolves to `dirs::config_dir()/scry/` by
/// default. Override with the `SCRY_CONFIG_DIR` environment variable.
#[must_use]
pub fn config_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("SCRY_CONFIG_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::config_dir()
        .map(|d| d.join("scry"))
        .unwrap_or_else(|| PathBuf::from("/tmp/scry-config"))
}

/// Research cache root directory.
///
/// Topic caches (search results, documents, summaries, answers) live
/// under here. Resolves to `dirs::cache_dir()/scry/` by default.
/// Override with the `SCRY_CACHE_ROOT` environment variable.
#[must_use]
pub fn cache_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("SCRY_CACHE_ROOT") {
        return PathBuf::from(override_dir);
    }
    dirs::cache_dir()
        .map(|d| d.join("scry"))
        .unwrap_or_else(|| PathBuf::from("/tmp/scry-cache"))
}

/// Log file directory.
///
/// Resolves to `data_dir()/logs/` by default. Override with the
/// `SCRY_LOG_DIR` environment variable.
#[must_use]
pub fn logs_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("SCRY_LOG_DIR") {
        return PathBuf::from(override_dir);
    }
    data_dir().join("logs")
}

/// Main config file path (`config_dir()/config.toml`).
#[must_use]
pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}
