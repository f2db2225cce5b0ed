//! # Configuration Module
//!
//! Session tunables and where to find them on disk.
//!
//! Every value has a default, so a config file only needs the keys it wants to
//! change. The default file lives in the platform config directory:
//! - Linux: `~/.config/moodq/config.json`
//! - macOS: `~/Library/Application Support/moodq/config.json`
//! - Windows: `%APPDATA%\moodq\config.json`
//!
//! Nothing here is session state: the smoothing window and stability state are
//! always rebuilt from scratch when a session starts.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::emotion::EmotionLabel;

/// Returns the platform-appropriate config file path.
///
/// Unlike a data directory, the config directory is not created here: a
/// missing file simply means "use the defaults".
///
/// # Errors
///
/// Returns an error if the platform config directory cannot be determined.
pub fn default_config_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir().ok_or_else(|| {
        anyhow::anyhow!(
            "Could not determine system config directory. Pass --config explicitly."
        )
    })?;

    Ok(config_dir.join("moodq").join("config.json"))
}

/// Track search limits and keyword overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Playlists requested per search.
    pub playlist_search_limit: usize,
    /// Tracks requested per playlist.
    pub playlist_track_limit: usize,
    /// Replaces the built-in keyword list for the listed emotions.
    pub queries: BTreeMap<EmotionLabel, Vec<String>>,
    /// Fixes the query choice for reproducible runs.
    pub seed: Option<u64>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            playlist_search_limit: 5,
            playlist_track_limit: 50,
            queries: BTreeMap::new(),
            seed: None,
        }
    }
}

/// Everything a session can be tuned with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Labels kept for the majority vote.
    pub window_capacity: usize,
    /// Consecutive confirmations needed to switch emotion.
    pub stability_threshold: u32,
    /// Top up when the queue holds fewer tracks than this.
    pub low_water: usize,
    /// Queue length a top-up aims for.
    pub refill_target: usize,
    /// Classify every Nth frame.
    pub analysis_interval: u64,
    /// Emit the smoothed label every Nth frame.
    pub check_interval: u64,
    /// Tracks requested when switching emotion.
    pub switch_batch: usize,
    pub provider: ProviderConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            window_capacity: 5,
            stability_threshold: 3,
            low_water: 3,
            refill_target: 5,
            analysis_interval: 3,
            check_interval: 30,
            switch_batch: 10,
            provider: ProviderConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Reads a JSON config file. Missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: SessionConfig = serde_json::from_str(&text)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `explicit` if given (it must exist), otherwise the default file
    /// if present, otherwise the built-in defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        match default_config_path() {
            Ok(path) if path.exists() => {
                log::debug!("Loading config from {}", path.display());
                Self::from_file(&path)
            }
            Ok(_) => Ok(Self::default()),
            Err(e) => {
                log::debug!("No default config location: {e}");
                Ok(Self::default())
            }
        }
    }

    /// Rejects values that would stall or break the control loop.
    pub fn validate(&self) -> Result<()> {
        if self.window_capacity == 0 {
            bail!("window_capacity must be at least 1");
        }
        if self.stability_threshold == 0 {
            bail!("stability_threshold must be at least 1");
        }
        if self.analysis_interval == 0 || self.check_interval == 0 {
            bail!("analysis_interval and check_interval must be at least 1");
        }
        if self.switch_batch == 0 {
            bail!("switch_batch must be at least 1");
        }
        if self.refill_target < self.low_water {
            bail!(
                "refill_target ({}) must not be below low_water ({})",
                self.refill_target,
                self.low_water
            );
        }
        if self.provider.playlist_search_limit == 0 || self.provider.playlist_track_limit == 0 {
            bail!("provider search and track limits must be at least 1");
        }
        Ok(())
    }
}
