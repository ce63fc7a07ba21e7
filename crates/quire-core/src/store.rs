//! Item store trait.
//!
//! Defines the interface for loading and saving a session's items, decoupling
//! the registry from the on-disk document format.

use crate::error::Result;
use crate::item::Item;
use async_trait::async_trait;
use std::path::Path;

#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Loads the ordered items stored at `path`.
    ///
    /// # Returns
    ///
    /// - `Ok(items)`: Document parsed
    /// - `Err(QuireError::LoadFailed)`: Missing, unreadable or malformed file
    async fn load(&self, path: &Path) -> Result<Vec<Item>>;

    /// Writes `items` to `path`, replacing any previous document.
    async fn save(&self, items: &[Item], path: &Path) -> Result<()>;

    /// Checks whether a document exists at `path`.
    async fn exists(&self, path: &Path) -> bool;
}
