//! Well-known locations for quire configuration and session documents.
//!
//! Resolved through `dirs` so the layout follows each platform's conventions
//! (XDG on Linux, `Library/Application Support` on macOS, `AppData` on
//! Windows).

use std::path::PathBuf;

const APP_DIR: &str = "quire";

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// The platform exposes no configuration or data directory.
    BaseDirNotFound(&'static str),
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::BaseDirNotFound(kind) => write!(f, "Cannot find {} directory", kind),
        }
    }
}

impl std::error::Error for PathError {}

impl From<PathError> for quire_core::QuireError {
    fn from(err: PathError) -> Self {
        quire_core::QuireError::config(err.to_string())
    }
}

/// Path helpers for quire.
///
/// # Directory Structure
///
/// ```text
/// ~/.config/quire/             # Config directory
/// └── config.toml              # Application configuration
///
/// ~/.local/share/quire/        # Data directory
/// └── sessions/                # Default root for relative backing paths
/// ```
pub struct QuirePaths;

impl QuirePaths {
    /// Returns the quire configuration directory.
    ///
    /// # Returns
    ///
    /// - `Ok(PathBuf)`: Path to config directory (e.g., `~/.config/quire/`)
    /// - `Err(PathError::BaseDirNotFound)`: Could not determine directory
    pub fn config_dir() -> Result<PathBuf, PathError> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or(PathError::BaseDirNotFound("config"))
    }

    /// Returns the quire data directory.
    pub fn data_dir() -> Result<PathBuf, PathError> {
        dirs::data_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or(PathError::BaseDirNotFound("data"))
    }

    /// Returns the path to the main configuration file.
    pub fn config_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Returns the directory relative backing paths resolve against when the
    /// configuration names none.
    pub fn sessions_dir() -> Result<PathBuf, PathError> {
        Ok(Self::data_dir()?.join("sessions"))
    }
}
