//! JSON-file ItemStore implementation

use crate::dto::{DocumentDTO, StoredDocument};
use crate::storage::AtomicJsonFile;
use async_trait::async_trait;
use quire_core::config::StorageConfig;
use quire_core::error::{QuireError, Result};
use quire_core::item::Item;
use quire_core::store::ItemStore;
use std::path::Path;

/// Stores each session as one JSON document.
///
/// Responsibilities:
/// - Convert between the versioned document DTO and domain items
/// - Write atomically through [`AtomicJsonFile`]
/// - Report every read failure as `LoadFailed` with the offending path
///
/// Does NOT:
/// - Repair identifiers (the registry re-issues malformed or duplicate ones)
#[derive(Debug, Clone, Default)]
pub struct JsonItemStore {
    pretty: bool,
}

impl JsonItemStore {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            pretty: config.pretty,
        }
    }

    fn file(&self, path: &Path) -> AtomicJsonFile<StoredDocument> {
        AtomicJsonFile::new(path).pretty(self.pretty)
    }
}

#[async_trait]
impl ItemStore for JsonItemStore {
    async fn load(&self, path: &Path) -> Result<Vec<Item>> {
        let shown = path.display().to_string();
        if !self.exists(path).await {
            return Err(QuireError::load_failed(shown, "file does not exist"));
        }

        let stored = self
            .file(path)
            .load()
            .await
            .map_err(|err| QuireError::load_failed(&shown, err.to_string()))?;

        let document = match stored {
            Some(stored) => stored
                .into_current()
                .map_err(|message| QuireError::load_failed(&shown, message))?,
            None => return Ok(Vec::new()),
        };

        tracing::debug!(path = %shown, items = document.items.len(), "Loaded document");
        Ok(document.items.into_iter().map(Item::from).collect())
    }

    async fn save(&self, items: &[Item], path: &Path) -> Result<()> {
        let document = StoredDocument::Versioned(DocumentDTO::from_items(items));
        self.file(path).save(&document).await?;
        tracing::debug!(path = %path.display(), items = items.len(), "Saved document");
        Ok(())
    }

    async fn exists(&self, path: &Path) -> bool {
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }
}
