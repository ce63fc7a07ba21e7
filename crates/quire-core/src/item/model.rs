//! Item domain model.

use super::id::ItemId;
use super::kind::ItemKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One addressable unit inside a session (a notebook cell or a dialog message).
///
/// The identifier is fixed at creation. Everything else is mutated only by
/// commands, except the output slot which execution writes directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    id: ItemId,
    /// Kind tag (code, markdown, note, prompt, raw)
    pub kind: ItemKind,
    /// Main content: source code, markdown or prompt text
    pub content: String,
    /// Result slot; not tracked by undo history
    #[serde(default)]
    pub output: ItemOutput,
    /// Presentation and context flags
    #[serde(default)]
    pub flags: ItemFlags,
    /// Execution counter reported by the engine for the last run
    #[serde(default)]
    pub execution_count: Option<u64>,
    /// Wall-clock time of the last run (e.g. `02:30:45pm`)
    #[serde(default)]
    pub time_run: Option<String>,
}

impl Item {
    /// Creates an item with a freshly generated identifier.
    pub fn new(kind: ItemKind, content: impl Into<String>) -> Self {
        Self::with_id(ItemId::generate(), kind, content)
    }

    /// Creates an item with a known identifier (e.g. when loading from disk).
    pub fn with_id(id: ItemId, kind: ItemKind, content: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            content: content.into(),
            output: ItemOutput::Empty,
            flags: ItemFlags::default(),
            execution_count: None,
            time_run: None,
        }
    }

    /// Replaces the flags, builder-style.
    pub fn with_flags(mut self, flags: ItemFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Returns the item's stable identifier.
    pub fn id(&self) -> &ItemId {
        &self.id
    }

    pub(crate) fn reissue_id(&mut self, id: ItemId) {
        self.id = id;
    }

    /// First line of the content, truncated to `max_chars` characters.
    pub fn first_line(&self, max_chars: usize) -> String {
        let line = self.content.lines().next().unwrap_or("");
        if line.is_empty() {
            return "(empty)".to_string();
        }
        let mut preview: String = line.chars().take(max_chars).collect();
        if line.chars().count() > max_chars {
            preview.push_str("...");
        }
        preview
    }
}

/// Boolean flags, each meaningful only to the item kinds that use it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemFlags {
    /// Always include in LLM context
    pub pinned: bool,
    /// Exclude from LLM context
    pub skipped: bool,
    /// Export to a module (code only)
    pub exported: bool,
    pub input_collapsed: bool,
    pub output_collapsed: bool,
    pub heading_collapsed: bool,
    /// Enable extended thinking (prompts only)
    pub use_thinking: bool,
}

/// Content of an item's output slot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ItemOutput {
    #[default]
    Empty,
    /// Free text, e.g. an LLM reply to a prompt
    Text(String),
    /// Structured records produced by the execution engine
    Records(Vec<OutputRecord>),
}

impl ItemOutput {
    pub fn is_empty(&self) -> bool {
        match self {
            ItemOutput::Empty => true,
            ItemOutput::Text(text) => text.is_empty(),
            ItemOutput::Records(records) => records.is_empty(),
        }
    }
}

/// A single structured output record returned by an execution engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "output_type", rename_all = "snake_case")]
pub enum OutputRecord {
    /// Text written to a named stream (`stdout`, `stderr`)
    Stream { name: String, text: String },
    /// Value of the last expression, keyed by MIME type
    ExecuteResult { data: BTreeMap<String, String> },
    /// Rich display output, keyed by MIME type
    DisplayData { data: BTreeMap<String, String> },
    /// Raised error
    Error {
        ename: String,
        evalue: String,
        #[serde(default)]
        traceback: Vec<String>,
    },
}

impl OutputRecord {
    /// Convenience constructor for a stream record.
    pub fn stream(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self::Stream {
            name: name.into(),
            text: text.into(),
        }
    }

    /// Convenience constructor for a `text/plain` execute result.
    pub fn plain_result(text: impl Into<String>) -> Self {
        let mut data = BTreeMap::new();
        data.insert("text/plain".to_string(), text.into());
        Self::ExecuteResult { data }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, OutputRecord::Error { .. })
    }
}
