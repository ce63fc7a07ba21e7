//! Ordered item storage with an identifier index.

use super::id::ItemId;
use super::model::Item;
use crate::error::{QuireError, Result};
use std::collections::{HashMap, HashSet};

/// The ordered items of one session plus a reverse lookup from identifier to
/// current position.
///
/// Every structural method updates the lookup inside the same call as the
/// vector mutation, and validates its inputs before touching either, so a
/// failed call leaves the list exactly as it was.
///
/// The list also remembers every identifier it has ever held, so
/// [`ItemList::issue_id`] never hands out the identifier of a deleted item.
#[derive(Debug, Clone, Default)]
pub struct ItemList {
    items: Vec<Item>,
    positions: HashMap<ItemId, usize>,
    issued: HashSet<ItemId>,
}

impl ItemList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a list from loaded items.
    ///
    /// Items with malformed or duplicate identifiers get a fresh identifier.
    /// Returns the list and how many identifiers were re-issued.
    pub fn from_items(items: Vec<Item>) -> (Self, usize) {
        let mut list = Self::new();
        let mut reissued = 0;
        for mut item in items {
            if !item.id().is_well_formed() || list.issued.contains(item.id()) {
                let fresh = list.issue_id();
                item.reissue_id(fresh);
                reissued += 1;
            }
            list.issued.insert(item.id().clone());
            list.positions.insert(item.id().clone(), list.items.len());
            list.items.push(item);
        }
        (list, reissued)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<&Item> {
        self.items.get(position)
    }

    /// Mutable access for field updates; identifiers cannot change through it.
    pub(crate) fn get_mut(&mut self, position: usize) -> Option<&mut Item> {
        self.items.get_mut(position)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Item> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[Item] {
        &self.items
    }

    /// Current position of an identifier.
    pub fn position_of(&self, id: &ItemId) -> Option<usize> {
        self.positions.get(id).copied()
    }

    /// Identifiers in list order.
    pub fn ids(&self) -> Vec<ItemId> {
        self.items.iter().map(|item| item.id().clone()).collect()
    }

    /// Generates an identifier this list has never held.
    pub fn issue_id(&self) -> ItemId {
        loop {
            let id = ItemId::generate();
            if !self.issued.contains(&id) {
                return id;
            }
        }
    }

    /// Inserts an item at `position` (`0..=len`).
    ///
    /// Fails with a consistency fault if the identifier is already present.
    pub(crate) fn insert(&mut self, position: usize, item: Item) -> Result<()> {
        if position > self.items.len() {
            return Err(QuireError::out_of_range(position as i64, self.items.len()));
        }
        if self.positions.contains_key(item.id()) {
            return Err(QuireError::consistency(format!(
                "identifier {} is already present",
                item.id()
            )));
        }
        self.issued.insert(item.id().clone());
        self.items.insert(position, item);
        self.reindex_from(position);
        Ok(())
    }

    /// Removes and returns the item at `position`.
    pub(crate) fn remove(&mut self, position: usize) -> Result<Item> {
        if position >= self.items.len() {
            return Err(QuireError::out_of_range(position as i64, self.items.len()));
        }
        let item = self.items.remove(position);
        self.positions.remove(item.id());
        self.reindex_from(position);
        Ok(item)
    }

    /// Moves the item at `from` so that it ends up at `to`.
    ///
    /// `to` is a position in the resulting list, so both bounds are `0..len`.
    pub(crate) fn relocate(&mut self, from: usize, to: usize) -> Result<()> {
        let len = self.items.len();
        if from >= len {
            return Err(QuireError::out_of_range(from as i64, len));
        }
        if to >= len {
            return Err(QuireError::out_of_range(to as i64, len));
        }
        let item = self.items.remove(from);
        self.items.insert(to, item);
        self.reindex_from(from.min(to));
        Ok(())
    }

    /// Exchanges two positions; `a == b` is a valid no-op.
    pub(crate) fn swap(&mut self, a: usize, b: usize) -> Result<()> {
        let len = self.items.len();
        for position in [a, b] {
            if position >= len {
                return Err(QuireError::out_of_range(position as i64, len));
            }
        }
        self.items.swap(a, b);
        self.positions.insert(self.items[a].id().clone(), a);
        self.positions.insert(self.items[b].id().clone(), b);
        Ok(())
    }

    /// Rearranges items so that new position `i` holds the item previously at
    /// `order[i]`. The order must be a permutation of `0..len`.
    pub(crate) fn arrange(&mut self, order: &[usize]) -> Result<()> {
        validate_permutation(order, self.items.len())?;
        let mut slots: Vec<Option<Item>> = self.items.drain(..).map(Some).collect();
        self.items = order
            .iter()
            .filter_map(|&old| slots[old].take())
            .collect();
        self.reindex_from(0);
        Ok(())
    }

    fn reindex_from(&mut self, start: usize) {
        for (offset, item) in self.items[start..].iter().enumerate() {
            self.positions.insert(item.id().clone(), start + offset);
        }
    }
}

/// Checks that `order` rearranges every index of `0..len` exactly once.
pub fn validate_permutation(order: &[usize], len: usize) -> Result<()> {
    if order.len() != len {
        return Err(QuireError::InvalidPermutation(format!(
            "order has {} entries but the session has {} items",
            order.len(),
            len
        )));
    }
    let mut seen = vec![false; len];
    let mut duplicates = Vec::new();
    let mut invalid = Vec::new();
    for &index in order {
        match seen.get_mut(index) {
            Some(true) => duplicates.push(index),
            Some(slot) => *slot = true,
            None => invalid.push(index),
        }
    }
    let missing: Vec<usize> = seen
        .iter()
        .enumerate()
        .filter(|(_, present)| !**present)
        .map(|(index, _)| index)
        .collect();
    if duplicates.is_empty() && invalid.is_empty() && missing.is_empty() {
        return Ok(());
    }
    let mut problems = Vec::new();
    if !missing.is_empty() {
        problems.push(format!("missing indices {missing:?}"));
    }
    if !duplicates.is_empty() {
        problems.push(format!("duplicate indices {duplicates:?}"));
    }
    if !invalid.is_empty() {
        problems.push(format!("indices out of range {invalid:?}"));
    }
    Err(QuireError::InvalidPermutation(problems.join("; ")))
}
