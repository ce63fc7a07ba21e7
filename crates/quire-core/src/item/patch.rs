//! Field-level item updates.

use super::kind::ItemKind;
use super::model::Item;
use crate::error::{QuireError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;

/// A set of field changes for one item.
///
/// Only the `Some` fields are touched. Applying a patch yields another patch
/// holding the previous values of exactly those fields, which is what the
/// update command keeps for undo.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemPatch {
    pub content: Option<String>,
    pub kind: Option<ItemKind>,
    pub pinned: Option<bool>,
    pub skipped: Option<bool>,
    pub exported: Option<bool>,
    pub input_collapsed: Option<bool>,
    pub output_collapsed: Option<bool>,
    pub heading_collapsed: Option<bool>,
    pub use_thinking: Option<bool>,
}

const FLAG_FIELDS: [&str; 7] = [
    "pinned",
    "skipped",
    "exported",
    "input_collapsed",
    "output_collapsed",
    "heading_collapsed",
    "use_thinking",
];

impl ItemPatch {
    /// Patch replacing the content only.
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    pub fn with_kind(mut self, kind: ItemKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_pinned(mut self, pinned: bool) -> Self {
        self.pinned = Some(pinned);
        self
    }

    pub fn with_skipped(mut self, skipped: bool) -> Self {
        self.skipped = Some(skipped);
        self
    }

    /// Builds a patch from a loose JSON object, as sent by protocol adapters.
    ///
    /// Flags accept booleans or the integers `0`/`1`. The output slot is not
    /// history-tracked and therefore rejected here.
    pub fn from_fields(fields: &Map<String, Value>) -> Result<Self> {
        let mut patch = Self::default();
        for (name, value) in fields {
            match name.as_str() {
                "content" => {
                    let text = value.as_str().ok_or_else(|| {
                        QuireError::InvalidField(format!("'content' must be a string, got {value}"))
                    })?;
                    patch.content = Some(text.to_string());
                }
                "kind" | "msg_type" | "cell_type" => {
                    let text = value.as_str().ok_or_else(|| {
                        QuireError::InvalidField(format!("'{name}' must be a string, got {value}"))
                    })?;
                    let kind = ItemKind::from_str(text).map_err(|_| {
                        QuireError::InvalidField(format!("unknown kind '{text}'"))
                    })?;
                    patch.kind = Some(kind);
                }
                "output" => {
                    return Err(QuireError::InvalidField(
                        "'output' is not undoable; write it with set_output".to_string(),
                    ));
                }
                flag if FLAG_FIELDS.contains(&flag) => {
                    *patch.flag_slot(flag) = Some(flag_value(flag, value)?);
                }
                other => {
                    return Err(QuireError::InvalidField(format!("unknown field '{other}'")));
                }
            }
        }
        if patch.is_empty() {
            return Err(QuireError::InvalidField("no fields to update".to_string()));
        }
        Ok(patch)
    }

    /// Returns true when the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.field_names().is_empty()
    }

    /// Names of the fields this patch touches, in a fixed order.
    pub fn field_names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.content.is_some() {
            names.push("content");
        }
        if self.kind.is_some() {
            names.push("kind");
        }
        for (name, value) in FLAG_FIELDS.iter().zip(self.flag_values()) {
            if value.is_some() {
                names.push(*name);
            }
        }
        names
    }

    /// Applies the patch and returns the snapshot of the replaced values.
    pub(crate) fn apply_to(&self, item: &mut Item) -> ItemPatch {
        ItemPatch {
            content: swap_in(&mut item.content, &self.content),
            kind: swap_in(&mut item.kind, &self.kind),
            pinned: swap_in(&mut item.flags.pinned, &self.pinned),
            skipped: swap_in(&mut item.flags.skipped, &self.skipped),
            exported: swap_in(&mut item.flags.exported, &self.exported),
            input_collapsed: swap_in(&mut item.flags.input_collapsed, &self.input_collapsed),
            output_collapsed: swap_in(&mut item.flags.output_collapsed, &self.output_collapsed),
            heading_collapsed: swap_in(&mut item.flags.heading_collapsed, &self.heading_collapsed),
            use_thinking: swap_in(&mut item.flags.use_thinking, &self.use_thinking),
        }
    }

    fn flag_values(&self) -> [Option<bool>; 7] {
        [
            self.pinned,
            self.skipped,
            self.exported,
            self.input_collapsed,
            self.output_collapsed,
            self.heading_collapsed,
            self.use_thinking,
        ]
    }

    fn flag_slot(&mut self, name: &str) -> &mut Option<bool> {
        match name {
            "pinned" => &mut self.pinned,
            "skipped" => &mut self.skipped,
            "exported" => &mut self.exported,
            "input_collapsed" => &mut self.input_collapsed,
            "output_collapsed" => &mut self.output_collapsed,
            "heading_collapsed" => &mut self.heading_collapsed,
            _ => &mut self.use_thinking,
        }
    }
}

fn swap_in<T: Clone>(slot: &mut T, new: &Option<T>) -> Option<T> {
    new.as_ref().map(|value| std::mem::replace(slot, value.clone()))
}

fn flag_value(name: &str, value: &Value) -> Result<bool> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Number(n) if n.as_u64() == Some(0) => Ok(false),
        Value::Number(n) if n.as_u64() == Some(1) => Ok(true),
        other => Err(QuireError::InvalidField(format!(
            "'{name}' must be a boolean or 0/1, got {other}"
        ))),
    }
}
