//! Stable item identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

const ID_PREFIX: char = '_';
const ID_HEX_LEN: usize = 8;

/// Opaque, stable identifier of an item.
///
/// Generated identifiers are `_` followed by eight lowercase hex characters
/// (the notebook cell-id convention). Values read back from callers are not
/// validated: a malformed or stale token simply fails to resolve.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    /// Wraps a raw identifier string without validating it.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Generates a fresh identifier from a random UUID.
    pub fn generate() -> Self {
        let hex = Uuid::new_v4().simple().to_string();
        Self(format!("{}{}", ID_PREFIX, &hex[..ID_HEX_LEN]))
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Checks whether the identifier follows the generated format.
    pub fn is_well_formed(&self) -> bool {
        let mut chars = self.0.chars();
        chars.next() == Some(ID_PREFIX)
            && self.0.len() == ID_HEX_LEN + 1
            && chars.all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for ItemId {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}
