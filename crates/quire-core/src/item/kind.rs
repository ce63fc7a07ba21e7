use crate::error::{QuireError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Kind tag of an item.
///
/// Notebook sessions use `code` and `markdown`; dialog sessions use `code`,
/// `note`, `prompt` and `raw`. Which kinds a session accepts is decided by its
/// resolver.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ItemKind {
    Code,
    Markdown,
    Note,
    Prompt,
    Raw,
}

impl ItemKind {
    /// Parses a kind name, reporting the accepted names on failure.
    pub fn parse(name: &str, allowed: &[ItemKind]) -> Result<Self> {
        let kind = ItemKind::from_str(name.trim()).map_err(|_| invalid_kind(name, allowed))?;
        if allowed.contains(&kind) {
            Ok(kind)
        } else {
            Err(invalid_kind(name, allowed))
        }
    }

    /// Whether items of this kind can be executed.
    pub fn is_executable(self) -> bool {
        matches!(self, ItemKind::Code)
    }
}

pub(crate) fn invalid_kind(name: &str, allowed: &[ItemKind]) -> QuireError {
    let allowed = allowed
        .iter()
        .map(|k| k.as_ref())
        .collect::<Vec<_>>()
        .join(", ");
    QuireError::InvalidKind {
        kind: name.to_string(),
        allowed,
    }
}
