use super::{Address, AddressResolver, existing_position, insert_position};
use crate::error::{QuireError, Result};
use crate::item::{ItemKind, ItemList};

/// Ordinal addressing used by notebook sessions.
///
/// Only [`Address::Index`] is understood; cells are `code` or `markdown`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PositionalResolver;

const NOTEBOOK_KINDS: &[ItemKind] = &[ItemKind::Code, ItemKind::Markdown];

impl AddressResolver for PositionalResolver {
    const SESSION_NOUN: &'static str = "notebook";
    const ITEM_NOUN: &'static str = "cell";

    fn allowed_kinds(&self) -> &'static [ItemKind] {
        NOTEBOOK_KINDS
    }

    fn default_kind(&self) -> ItemKind {
        ItemKind::Code
    }

    fn resolve(&self, items: &ItemList, address: &Address) -> Result<usize> {
        match address {
            Address::Index(index) => existing_position(*index, items.len()),
            Address::Id(id) => Err(unsupported(id.as_str())),
        }
    }

    fn resolve_insert(&self, items: &ItemList, address: &Address) -> Result<usize> {
        match address {
            Address::Index(index) => insert_position(*index, items.len()),
            Address::Id(id) => Err(unsupported(id.as_str())),
        }
    }
}

fn unsupported(id: &str) -> QuireError {
    QuireError::UnsupportedAddress(format!(
        "notebook cells are addressed by index, got identifier '{id}'"
    ))
}
