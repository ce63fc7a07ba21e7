//! Session document DTOs.

use quire_core::item::{Item, ItemFlags, ItemId, ItemKind, ItemOutput};
use serde::{Deserialize, Serialize};

/// Version written by this build.
pub const CURRENT_FORMAT_VERSION: u32 = 1;

fn default_format_version() -> u32 {
    CURRENT_FORMAT_VERSION
}

/// One stored item.
///
/// The identifier is kept as a plain string: files edited by hand may carry
/// malformed or duplicate ids, which the registry re-issues on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDTO {
    #[serde(default)]
    pub id: String,
    pub kind: ItemKind,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "ItemOutput::is_empty")]
    pub output: ItemOutput,
    #[serde(default)]
    pub flags: ItemFlags,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_run: Option<String>,
}

impl From<&Item> for ItemDTO {
    fn from(item: &Item) -> Self {
        Self {
            id: item.id().to_string(),
            kind: item.kind,
            content: item.content.clone(),
            output: item.output.clone(),
            flags: item.flags,
            execution_count: item.execution_count,
            time_run: item.time_run.clone(),
        }
    }
}

impl From<ItemDTO> for Item {
    fn from(dto: ItemDTO) -> Self {
        let mut item = Item::with_id(ItemId::new(dto.id), dto.kind, dto.content);
        item.output = dto.output;
        item.flags = dto.flags;
        item.execution_count = dto.execution_count;
        item.time_run = dto.time_run;
        item
    }
}

/// Versioned document envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentDTO {
    #[serde(default = "default_format_version")]
    pub format_version: u32,
    pub items: Vec<ItemDTO>,
}

impl DocumentDTO {
    pub fn from_items(items: &[Item]) -> Self {
        Self {
            format_version: CURRENT_FORMAT_VERSION,
            items: items.iter().map(ItemDTO::from).collect(),
        }
    }
}

/// Any document shape accepted on load.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredDocument {
    Versioned(DocumentDTO),
    Bare(Vec<ItemDTO>),
}

impl StoredDocument {
    /// Unwraps into the current envelope, rejecting versions newer than this
    /// build understands.
    pub fn into_current(self) -> Result<DocumentDTO, String> {
        match self {
            StoredDocument::Versioned(doc) if doc.format_version > CURRENT_FORMAT_VERSION => {
                Err(format!(
                    "unsupported format version {} (newest known: {})",
                    doc.format_version, CURRENT_FORMAT_VERSION
                ))
            }
            StoredDocument::Versioned(doc) => Ok(doc),
            StoredDocument::Bare(items) => Ok(DocumentDTO {
                format_version: CURRENT_FORMAT_VERSION,
                items,
            }),
        }
    }
}
