//! Result payloads returned by registry operations.

use crate::address::ItemAddress;
use crate::command::{Command, OperationKind};
use crate::engine::ExecutionOutcome;
use crate::item::{Item, ItemId, ItemKind, ItemList};
use serde::{Deserialize, Serialize};

const PREVIEW_CHARS: usize = 60;

/// One-line view of an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemPreview {
    pub index: usize,
    pub id: ItemId,
    pub kind: ItemKind,
    pub first_line: String,
    /// Set on the item an operation centred on
    pub focus: bool,
}

impl ItemPreview {
    pub fn new(index: usize, item: &Item) -> Self {
        Self {
            index,
            id: item.id().clone(),
            kind: item.kind,
            first_line: item.first_line(PREVIEW_CHARS),
            focus: false,
        }
    }
}

/// What an applied operation changed, with enough surroundings to render a
/// confirmation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationReport {
    pub session: String,
    pub kind: OperationKind,
    pub description: String,
    /// Resulting location of the affected item, when there is one
    pub address: Option<ItemAddress>,
    /// Items removed by a delete, in original order
    pub removed: Vec<Item>,
    /// Items around the focus after the change
    pub context: Vec<ItemPreview>,
    pub item_count: usize,
    /// Commands dropped from the bottom of the undo stack
    pub evicted: usize,
}

impl OperationReport {
    pub(crate) fn from_command(
        session: &str,
        command: &Command,
        items: &ItemList,
        radius: usize,
    ) -> Self {
        let focus = command.focus();
        let address = match command {
            Command::Delete(_) | Command::Reorder(_) => None,
            _ => focus.and_then(|index| {
                items.get(index).map(|item| ItemAddress {
                    index,
                    id: item.id().clone(),
                })
            }),
        };
        let removed = match command {
            Command::Delete(delete) => delete.removed(),
            _ => Vec::new(),
        };
        let marked = address.as_ref().map(|a| a.index);
        Self {
            session: session.to_string(),
            kind: command.kind(),
            description: command.description(),
            address,
            removed,
            context: context_window(items, focus.unwrap_or(0), radius, marked),
            item_count: items.len(),
            evicted: 0,
        }
    }
}

/// Previews of the items within `radius` of `center`.
pub fn context_window(
    items: &ItemList,
    center: usize,
    radius: usize,
    marked: Option<usize>,
) -> Vec<ItemPreview> {
    if items.is_empty() {
        return Vec::new();
    }
    let center = center.min(items.len() - 1);
    let start = center.saturating_sub(radius);
    let end = (center + radius + 1).min(items.len());
    (start..end)
        .filter_map(|index| {
            items.get(index).map(|item| ItemPreview {
                focus: marked == Some(index),
                ..ItemPreview::new(index, item)
            })
        })
        .collect()
}

/// Outcome of executing a stored item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub session: String,
    /// Where the outputs were stored; `None` if the item vanished meanwhile
    pub address: Option<ItemAddress>,
    pub outcome: ExecutionOutcome,
}
