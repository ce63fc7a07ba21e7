//! Item addressing.
//!
//! Callers refer to items with an [`Address`]. Each session kind plugs in an
//! [`AddressResolver`] that turns addresses into positions of its
//! [`ItemList`](crate::item::ItemList) and declares which item kinds it accepts.

mod identifier;
mod positional;

pub use identifier::IdentifierResolver;
pub use positional::PositionalResolver;

use crate::error::{QuireError, Result};
use crate::item::{ItemId, ItemKind, ItemList, invalid_kind};
use serde::{Deserialize, Serialize};
use std::fmt;

/// External reference to an item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Address {
    /// Zero-based position; `-1` is the append slot on insert and the last
    /// item otherwise.
    Index(i64),
    /// Stable identifier assigned at creation.
    Id(ItemId),
}

impl Address {
    /// The append/last sentinel.
    pub const END: Address = Address::Index(-1);

    /// Parses loose adapter input: integers become positions, anything else an
    /// identifier.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        match raw.parse::<i64>() {
            Ok(index) => Address::Index(index),
            Err(_) => Address::Id(ItemId::new(raw)),
        }
    }
}

impl From<i64> for Address {
    fn from(index: i64) -> Self {
        Address::Index(index)
    }
}

impl From<ItemId> for Address {
    fn from(id: ItemId) -> Self {
        Address::Id(id)
    }
}

impl From<&ItemId> for Address {
    fn from(id: &ItemId) -> Self {
        Address::Id(id.clone())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::Index(index) => write!(f, "{index}"),
            Address::Id(id) => write!(f, "{id}"),
        }
    }
}

/// A resolved item location, reported back to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemAddress {
    pub index: usize,
    pub id: ItemId,
}

impl fmt::Display for ItemAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.index, self.id)
    }
}

/// Addressing strategy and validation rules of one session kind.
///
/// The registry is generic over this trait, so notebook and dialog sessions
/// share the same command and history machinery.
pub trait AddressResolver: Send + Sync + 'static {
    /// Name used for sessions of this kind in errors and logs.
    const SESSION_NOUN: &'static str;
    /// Name used for items of this kind in errors and logs.
    const ITEM_NOUN: &'static str;

    fn allowed_kinds(&self) -> &'static [ItemKind];

    fn default_kind(&self) -> ItemKind;

    /// Resolves an address to an existing position in `0..len`.
    fn resolve(&self, items: &ItemList, address: &Address) -> Result<usize>;

    /// Resolves an insertion slot in `0..=len`.
    fn resolve_insert(&self, items: &ItemList, address: &Address) -> Result<usize>;

    /// Checks that `kind` is accepted by this session kind.
    fn check_kind(&self, kind: ItemKind) -> Result<()> {
        if self.allowed_kinds().contains(&kind) {
            Ok(())
        } else {
            Err(invalid_kind(kind.as_ref(), self.allowed_kinds()))
        }
    }

    /// Parses a kind name against [`AddressResolver::allowed_kinds`].
    fn parse_kind(&self, name: &str) -> Result<ItemKind> {
        ItemKind::parse(name, self.allowed_kinds())
    }
}

/// Maps a read/mutate position to `0..len`.
pub(crate) fn existing_position(index: i64, len: usize) -> Result<usize> {
    let position = if index == -1 {
        len.checked_sub(1)
    } else {
        usize::try_from(index).ok().filter(|&p| p < len)
    };
    position.ok_or_else(|| QuireError::out_of_range(index, len))
}

/// Maps an insertion position to `0..=len`.
pub(crate) fn insert_position(index: i64, len: usize) -> Result<usize> {
    if index == -1 {
        return Ok(len);
    }
    usize::try_from(index)
        .ok()
        .filter(|&p| p <= len)
        .ok_or_else(|| QuireError::out_of_range(index, len))
}
