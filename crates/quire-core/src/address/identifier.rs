use super::{Address, AddressResolver, existing_position, insert_position};
use crate::error::{QuireError, Result};
use crate::item::{ItemKind, ItemList};

/// Identifier addressing used by dialog sessions.
///
/// Identifiers are looked up through the list's reverse index. Positions are
/// accepted too, with the same bounds as [`PositionalResolver`](super::PositionalResolver).
/// An identifier given as an insertion slot means "before that message".
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentifierResolver;

const DIALOG_KINDS: &[ItemKind] = &[
    ItemKind::Code,
    ItemKind::Note,
    ItemKind::Prompt,
    ItemKind::Raw,
];

impl AddressResolver for IdentifierResolver {
    const SESSION_NOUN: &'static str = "dialog";
    const ITEM_NOUN: &'static str = "message";

    fn allowed_kinds(&self) -> &'static [ItemKind] {
        DIALOG_KINDS
    }

    fn default_kind(&self) -> ItemKind {
        ItemKind::Note
    }

    fn resolve(&self, items: &ItemList, address: &Address) -> Result<usize> {
        match address {
            Address::Index(index) => existing_position(*index, items.len()),
            Address::Id(id) => items
                .position_of(id)
                .ok_or_else(|| QuireError::not_found(Self::ITEM_NOUN, id.as_str())),
        }
    }

    fn resolve_insert(&self, items: &ItemList, address: &Address) -> Result<usize> {
        match address {
            Address::Index(index) => insert_position(*index, items.len()),
            Address::Id(_) => self.resolve(items, address),
        }
    }
}
