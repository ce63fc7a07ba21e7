//! Configuration service implementation.
//!
//! This module provides a ConfigService that loads `QuireConfig` from
//! `config.toml` (by default `~/.config/quire/config.toml`) and caches it.

use crate::paths::QuirePaths;
use quire_core::config::QuireConfig;
use quire_core::error::{QuireError, Result};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// Configuration service that loads and caches the root configuration.
///
/// A missing file yields defaults; a malformed one is a `Config` error and is
/// not cached, so fixing the file and calling again recovers.
#[derive(Debug, Clone)]
pub struct ConfigService {
    /// Explicit file location; `None` means the platform default.
    path: Option<PathBuf>,
    config: Arc<RwLock<Option<QuireConfig>>>,
}

impl ConfigService {
    /// Creates a service reading the platform default location.
    ///
    /// The configuration is loaded lazily on first access.
    pub fn new() -> Self {
        Self {
            path: None,
            config: Arc::new(RwLock::new(None)),
        }
    }

    /// Creates a service reading `path` instead of the default location.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            config: Arc::new(RwLock::new(None)),
        }
    }

    /// Gets the configuration, loading from file if not cached.
    pub fn get_config(&self) -> Result<QuireConfig> {
        {
            let cached = self.config.read().unwrap_or_else(|e| e.into_inner());
            if let Some(ref config) = *cached {
                return Ok(config.clone());
            }
        }

        let path = self.config_path()?;
        let loaded = Self::load_config(&path)?;

        let mut cached = self.config.write().unwrap_or_else(|e| e.into_inner());
        *cached = Some(loaded.clone());
        Ok(loaded)
    }

    /// Invalidates the cache, forcing a reload on next access.
    pub fn invalidate_cache(&self) {
        let mut cached = self.config.write().unwrap_or_else(|e| e.into_inner());
        *cached = None;
    }

    /// Returns the file this service reads.
    pub fn config_path(&self) -> Result<PathBuf> {
        match &self.path {
            Some(path) => Ok(path.clone()),
            None => Ok(QuirePaths::config_file()?),
        }
    }

    fn load_config(path: &Path) -> Result<QuireConfig> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file, using defaults");
                return Ok(QuireConfig::default());
            }
            Err(err) => {
                return Err(QuireError::config(format!(
                    "Failed to read {}: {}",
                    path.display(),
                    err
                )));
            }
        };

        toml::from_str(&content).map_err(|err| {
            QuireError::config(format!("Failed to parse {}: {}", path.display(), err))
        })
    }
}

impl Default for ConfigService {
    fn default() -> Self {
        Self::new()
    }
}
