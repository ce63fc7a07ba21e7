use crate::command::Command;
use crate::engine::ExecutionEngine;
use crate::error::Result;
use crate::history::{HistoryStep, OperationHistory};
use crate::item::ItemList;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Which session an operation targets.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionRef {
    /// The registry's active session
    #[default]
    Active,
    Named(String),
}

impl From<&str> for SessionRef {
    fn from(name: &str) -> Self {
        SessionRef::Named(name.to_string())
    }
}

impl From<String> for SessionRef {
    fn from(name: String) -> Self {
        SessionRef::Named(name)
    }
}

impl From<Option<&str>> for SessionRef {
    fn from(name: Option<&str>) -> Self {
        name.map_or(SessionRef::Active, |name| SessionRef::Named(name.to_string()))
    }
}

/// How [`register`](super::SessionRegistry::register) obtains the items.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RegisterMode {
    /// Start empty; a backing file must not exist yet
    Create,
    /// Load items from an existing backing file
    Connect,
}

/// A named, independently stateful container of items.
///
/// Fields are private to the crate: the item list changes only through
/// commands applied by the registry, plus untracked output writes.
pub struct Session {
    pub(crate) name: String,
    pub(crate) backing_path: Option<PathBuf>,
    pub(crate) items: ItemList,
    pub(crate) history: OperationHistory,
    pub(crate) engine: Arc<dyn ExecutionEngine>,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) last_activity: DateTime<Utc>,
    revision: u64,
    saved_revision: u64,
}

impl Session {
    pub(crate) fn new(
        name: String,
        backing_path: Option<PathBuf>,
        items: ItemList,
        history_capacity: usize,
        engine: Arc<dyn ExecutionEngine>,
    ) -> Self {
        let now = Utc::now();
        Self {
            name,
            backing_path,
            items,
            history: OperationHistory::new(history_capacity),
            engine,
            created_at: now,
            last_activity: now,
            revision: 0,
            saved_revision: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn items(&self) -> &ItemList {
        &self.items
    }

    /// Applies a freshly built command; the caller records it afterwards.
    pub(crate) fn commit(&mut self, command: &mut Command) -> Result<()> {
        command.apply(&mut self.items)?;
        self.mark_changed();
        Ok(())
    }

    pub(crate) fn undo(&mut self, steps: usize) -> Result<HistoryStep> {
        let step = self.history.undo(&mut self.items, steps);
        self.after_history(&step);
        step
    }

    pub(crate) fn redo(&mut self, steps: usize) -> Result<HistoryStep> {
        let step = self.history.redo(&mut self.items, steps);
        self.after_history(&step);
        step
    }

    fn after_history(&mut self, step: &Result<HistoryStep>) {
        match step {
            Ok(step) if step.performed == 0 => {}
            // A failed step may follow successful ones.
            _ => self.mark_changed(),
        }
    }

    pub(crate) fn mark_changed(&mut self) {
        self.revision += 1;
        self.last_activity = Utc::now();
    }

    pub(crate) fn revision(&self) -> u64 {
        self.revision
    }

    pub(crate) fn mark_saved(&mut self, revision: u64) {
        self.saved_revision = self.saved_revision.max(revision);
    }

    /// True when the items changed since the last save or load.
    pub fn is_dirty(&self) -> bool {
        self.revision != self.saved_revision
    }

    pub(crate) fn summary(&self, is_active: bool) -> SessionSummary {
        let mut kind_counts = BTreeMap::new();
        for item in self.items.iter() {
            *kind_counts.entry(item.kind.to_string()).or_insert(0) += 1;
        }
        SessionSummary {
            name: self.name.clone(),
            backing_path: self.backing_path.clone(),
            item_count: self.items.len(),
            kind_counts,
            undo_depth: self.history.undo_depth(),
            redo_depth: self.history.redo_depth(),
            created_at: self.created_at,
            last_activity: self.last_activity,
            is_active,
            is_dirty: self.is_dirty(),
        }
    }
}

/// Read-only view of a session for listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub name: String,
    pub backing_path: Option<PathBuf>,
    pub item_count: usize,
    /// Item count per kind name
    pub kind_counts: BTreeMap<String, usize>,
    pub undo_depth: usize,
    pub redo_depth: usize,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub is_active: bool,
    pub is_dirty: bool,
}
