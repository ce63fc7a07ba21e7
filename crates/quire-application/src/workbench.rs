//! The workbench: one notebook registry and one dialog registry sharing a
//! store, an engine factory and a configuration.
//!
//! Lifecycle is `Workbench::new` (or `from_config` / `load`) → serve
//! requests through [`Workbench::notebooks`] and [`Workbench::dialogs`] →
//! [`Workbench::shutdown`].

use anyhow::{Context, Result};
use quire_core::config::QuireConfig;
use quire_core::engine::EngineFactory;
use quire_core::error::QuireError;
use quire_core::session::{DialogRegistry, NotebookRegistry};
use quire_core::store::ItemStore;
use quire_core::{IdentifierResolver, PositionalResolver};
use quire_execution::ProcessEngineFactory;
use quire_infrastructure::{ConfigService, JsonItemStore, QuirePaths};
use std::sync::Arc;

/// Holds both session registries.
///
/// # Thread Safety
///
/// The registries are shared through `Arc` and synchronise internally, so a
/// `Workbench` can be cloned into request handlers freely.
#[derive(Clone)]
pub struct Workbench {
    notebooks: Arc<NotebookRegistry>,
    dialogs: Arc<DialogRegistry>,
    config: QuireConfig,
}

impl Workbench {
    /// Creates a workbench from explicit collaborators.
    ///
    /// # Arguments
    ///
    /// * `config` - Registry settings shared by both registries
    /// * `store` - Backend for backing files
    /// * `engines` - Factory producing one execution engine per session
    pub fn new(
        config: QuireConfig,
        store: Arc<dyn ItemStore>,
        engines: Arc<dyn EngineFactory>,
    ) -> Self {
        let notebooks = Arc::new(NotebookRegistry::new(
            PositionalResolver,
            Arc::clone(&store),
            Arc::clone(&engines),
            config.registry.clone(),
        ));
        let dialogs = Arc::new(DialogRegistry::new(
            IdentifierResolver,
            store,
            engines,
            config.registry.clone(),
        ));
        Self {
            notebooks,
            dialogs,
            config,
        }
    }

    /// Creates a workbench backed by [`JsonItemStore`] and
    /// [`ProcessEngineFactory`].
    ///
    /// Without a configured `root_dir`, relative backing paths resolve
    /// against the platform sessions directory when one exists.
    pub fn from_config(mut config: QuireConfig) -> Self {
        if config.registry.root_dir.is_none() {
            config.registry.root_dir = QuirePaths::sessions_dir().ok();
        }
        let store = Arc::new(JsonItemStore::new(&config.storage));
        let engines = Arc::new(ProcessEngineFactory::new(config.engine.clone()));
        Self::new(config, store, engines)
    }

    /// Loads the configuration through `config_service` and builds the
    /// default workbench from it.
    pub fn load(config_service: &ConfigService) -> Result<Self> {
        let config = config_service
            .get_config()
            .context("Failed to load quire configuration")?;
        tracing::info!(
            history_capacity = config.registry.history_capacity,
            program = %config.engine.program,
            "Workbench configured"
        );
        Ok(Self::from_config(config))
    }

    pub fn notebooks(&self) -> &Arc<NotebookRegistry> {
        &self.notebooks
    }

    pub fn dialogs(&self) -> &Arc<DialogRegistry> {
        &self.dialogs
    }

    pub fn config(&self) -> &QuireConfig {
        &self.config
    }

    /// Releases every session in both registries.
    ///
    /// Keeps going past failures; sessions that could not be released (for
    /// instance because their final save failed) stay registered and are
    /// returned with their error.
    pub async fn shutdown(&self) -> Vec<(String, QuireError)> {
        let mut failures = Vec::new();
        for summary in self.notebooks.list_sessions().await {
            if let Err(err) = self.notebooks.release(&summary.name).await {
                failures.push((summary.name, err));
            }
        }
        for summary in self.dialogs.list_sessions().await {
            if let Err(err) = self.dialogs.release(&summary.name).await {
                failures.push((summary.name, err));
            }
        }
        if failures.is_empty() {
            tracing::info!("Workbench shut down");
        } else {
            tracing::warn!(failed = failures.len(), "Workbench shut down with failures");
        }
        failures
    }
}
