use crate::history::DEFAULT_HISTORY_CAPACITY;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root of `config.toml`. Every section and field is optional.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct QuireConfig {
    pub registry: RegistryConfig,
    pub engine: EngineConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct RegistryConfig {
    /// Maximum undo depth per session
    pub history_capacity: usize,
    /// Base directory for relative backing paths
    pub root_dir: Option<PathBuf>,
    pub default_timeout_secs: f64,
    /// Upper bound applied to every requested timeout
    pub max_timeout_secs: f64,
    /// Items shown on each side of the focus in operation reports
    pub context_radius: usize,
}

const BUILTIN_DEFAULT_TIMEOUT_SECS: f64 = 30.0;
const BUILTIN_MAX_TIMEOUT_SECS: f64 = 600.0;
/// Hard ceiling for `max_timeout_secs`: one day
const TIMEOUT_CEILING_SECS: f64 = 86_400.0;
const TIMEOUT_FLOOR_SECS: f64 = 0.001;

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            root_dir: None,
            default_timeout_secs: BUILTIN_DEFAULT_TIMEOUT_SECS,
            max_timeout_secs: BUILTIN_MAX_TIMEOUT_SECS,
            context_radius: 2,
        }
    }
}

impl RegistryConfig {
    /// Clamps a requested timeout to `(0, max_timeout_secs]`, falling back to
    /// the default when none (or a non-positive one) is given.
    ///
    /// Non-finite or non-positive config values fall back to the built-in
    /// ones, and the maximum never exceeds one day.
    pub fn effective_timeout(&self, requested: Option<f64>) -> Duration {
        let max = positive_or(self.max_timeout_secs, BUILTIN_MAX_TIMEOUT_SECS)
            .clamp(TIMEOUT_FLOOR_SECS, TIMEOUT_CEILING_SECS);
        let default = positive_or(self.default_timeout_secs, BUILTIN_DEFAULT_TIMEOUT_SECS);
        let secs = requested.map_or(default, |secs| positive_or(secs, default));
        Duration::try_from_secs_f64(secs.clamp(TIMEOUT_FLOOR_SECS, max))
            .unwrap_or(Duration::from_secs(BUILTIN_DEFAULT_TIMEOUT_SECS as u64))
    }
}

fn positive_or(secs: f64, fallback: f64) -> f64 {
    if secs.is_finite() && secs > 0.0 {
        secs
    } else {
        fallback
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Interpreter executable
    pub program: String,
    /// Arguments making the interpreter read source from stdin
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            program: "python3".to_string(),
            args: vec!["-".to_string()],
            working_dir: None,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    /// Pretty-print stored documents
    pub pretty: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { pretty: true }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive; `RUST_LOG` takes precedence
    pub filter: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            json: false,
        }
    }
}
