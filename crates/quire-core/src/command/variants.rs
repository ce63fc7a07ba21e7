//! The six reversible mutations.
//!
//! Each command captures positions together with the identifiers it expects
//! to find there. `apply` and `revert` check those expectations before
//! mutating anything and fail with a consistency fault when they do not hold.

use crate::error::{QuireError, Result};
use crate::item::{Item, ItemId, ItemKind, ItemList, ItemPatch};

fn expect_at(items: &ItemList, position: usize, id: &ItemId, action: &str) -> Result<()> {
    match items.get(position) {
        Some(item) if item.id() == id => Ok(()),
        Some(item) => Err(QuireError::consistency(format!(
            "{action}: expected {id} at {position}, found {}",
            item.id()
        ))),
        None => Err(QuireError::consistency(format!(
            "{action}: expected {id} at {position}, list has {} items",
            items.len()
        ))),
    }
}

/// Splices one item in at `index`.
///
/// The item lives in the command while it is not in the list, so redo puts
/// back exactly the item that undo took out.
#[derive(Debug, Clone)]
pub struct InsertCommand {
    pub(crate) index: usize,
    pub(crate) id: ItemId,
    pub(crate) kind: ItemKind,
    pub(crate) pending: Option<Item>,
}

impl InsertCommand {
    pub(crate) fn new(index: usize, item: Item) -> Self {
        Self {
            index,
            id: item.id().clone(),
            kind: item.kind,
            pending: Some(item),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn id(&self) -> &ItemId {
        &self.id
    }

    pub(crate) fn apply(&mut self, items: &mut ItemList) -> Result<()> {
        if self.index > items.len() {
            return Err(QuireError::consistency(format!(
                "insert: slot {} beyond list of {} items",
                self.index,
                items.len()
            )));
        }
        if items.position_of(&self.id).is_some() {
            return Err(QuireError::consistency(format!(
                "insert: {} is already in the list",
                self.id
            )));
        }
        let item = self.pending.take().ok_or_else(|| {
            QuireError::consistency(format!("insert: {} is already applied", self.id))
        })?;
        items.insert(self.index, item)
    }

    pub(crate) fn revert(&mut self, items: &mut ItemList) -> Result<()> {
        expect_at(items, self.index, &self.id, "undo insert")?;
        self.pending = Some(items.remove(self.index)?);
        Ok(())
    }
}

/// Removes a batch of items.
///
/// Targets are held in descending position order; removal walks them in that
/// order and restoration walks the captures in ascending order.
#[derive(Debug, Clone)]
pub struct DeleteCommand {
    pub(crate) targets: Vec<(usize, ItemId)>,
    pub(crate) removed: Vec<(usize, Item)>,
}

impl DeleteCommand {
    /// Builds from resolved `(position, id)` pairs in any order; duplicates
    /// collapse.
    pub(crate) fn new(mut targets: Vec<(usize, ItemId)>) -> Self {
        targets.sort_by(|a, b| b.0.cmp(&a.0));
        targets.dedup_by(|a, b| a.0 == b.0);
        Self {
            targets,
            removed: Vec::new(),
        }
    }

    /// Positions in descending order.
    pub fn positions(&self) -> Vec<usize> {
        self.targets.iter().map(|(position, _)| *position).collect()
    }

    /// Removed items in ascending original position, empty while reverted.
    pub fn removed(&self) -> Vec<Item> {
        self.removed.iter().rev().map(|(_, item)| item.clone()).collect()
    }

    pub(crate) fn apply(&mut self, items: &mut ItemList) -> Result<()> {
        for (position, id) in &self.targets {
            expect_at(items, *position, id, "delete")?;
        }
        let mut removed = Vec::with_capacity(self.targets.len());
        for (position, _) in &self.targets {
            removed.push((*position, items.remove(*position)?));
        }
        self.removed = removed;
        Ok(())
    }

    pub(crate) fn revert(&mut self, items: &mut ItemList) -> Result<()> {
        if self.removed.len() != self.targets.len() {
            return Err(QuireError::consistency("undo delete: nothing captured"));
        }
        let mut len = items.len();
        for (position, item) in self.removed.iter().rev() {
            if *position > len || items.position_of(item.id()).is_some() {
                return Err(QuireError::consistency(format!(
                    "undo delete: cannot restore {} at {position}",
                    item.id()
                )));
            }
            len += 1;
        }
        for (position, item) in std::mem::take(&mut self.removed).into_iter().rev() {
            items.insert(position, item)?;
        }
        Ok(())
    }
}

/// Changes selected fields of one item.
#[derive(Debug, Clone)]
pub struct UpdateCommand {
    pub(crate) index: usize,
    pub(crate) id: ItemId,
    pub(crate) patch: ItemPatch,
    pub(crate) previous: Option<ItemPatch>,
}

impl UpdateCommand {
    pub(crate) fn new(index: usize, id: ItemId, patch: ItemPatch) -> Self {
        Self {
            index,
            id,
            patch,
            previous: None,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn patch(&self) -> &ItemPatch {
        &self.patch
    }

    pub(crate) fn apply(&mut self, items: &mut ItemList) -> Result<()> {
        expect_at(items, self.index, &self.id, "update")?;
        let item = items
            .get_mut(self.index)
            .ok_or_else(|| QuireError::consistency("update: slot vanished"))?;
        self.previous = Some(self.patch.apply_to(item));
        Ok(())
    }

    pub(crate) fn revert(&mut self, items: &mut ItemList) -> Result<()> {
        expect_at(items, self.index, &self.id, "undo update")?;
        let previous = self
            .previous
            .take()
            .ok_or_else(|| QuireError::consistency("undo update: nothing captured"))?;
        let item = items
            .get_mut(self.index)
            .ok_or_else(|| QuireError::consistency("undo update: slot vanished"))?;
        previous.apply_to(item);
        Ok(())
    }
}

/// Moves one item so that it ends up at `to`.
#[derive(Debug, Clone)]
pub struct MoveCommand {
    pub(crate) from: usize,
    pub(crate) to: usize,
    pub(crate) id: ItemId,
}

impl MoveCommand {
    pub fn from(&self) -> usize {
        self.from
    }

    pub fn to(&self) -> usize {
        self.to
    }

    pub(crate) fn apply(&mut self, items: &mut ItemList) -> Result<()> {
        expect_at(items, self.from, &self.id, "move")?;
        if self.to >= items.len() {
            return Err(QuireError::consistency(format!(
                "move: target {} beyond list of {} items",
                self.to,
                items.len()
            )));
        }
        items.relocate(self.from, self.to)
    }

    pub(crate) fn revert(&mut self, items: &mut ItemList) -> Result<()> {
        expect_at(items, self.to, &self.id, "undo move")?;
        if self.from >= items.len() {
            return Err(QuireError::consistency(format!(
                "undo move: origin {} beyond list of {} items",
                self.from,
                items.len()
            )));
        }
        items.relocate(self.to, self.from)
    }
}

/// Exchanges two positions. Its own inverse.
#[derive(Debug, Clone)]
pub struct SwapCommand {
    pub(crate) first: (usize, ItemId),
    pub(crate) second: (usize, ItemId),
}

impl SwapCommand {
    pub fn positions(&self) -> (usize, usize) {
        (self.first.0, self.second.0)
    }

    fn exchange(&self, items: &mut ItemList, swapped: bool, action: &str) -> Result<()> {
        let (at_first, at_second) = if swapped {
            (&self.second.1, &self.first.1)
        } else {
            (&self.first.1, &self.second.1)
        };
        expect_at(items, self.first.0, at_first, action)?;
        expect_at(items, self.second.0, at_second, action)?;
        items.swap(self.first.0, self.second.0)
    }

    pub(crate) fn apply(&mut self, items: &mut ItemList) -> Result<()> {
        self.exchange(items, false, "swap")
    }

    pub(crate) fn revert(&mut self, items: &mut ItemList) -> Result<()> {
        self.exchange(items, true, "undo swap")
    }
}

/// Rearranges the whole list.
///
/// Undo does not invert `order`; it restores the identifier sequence captured
/// when the command was built.
#[derive(Debug, Clone)]
pub struct ReorderCommand {
    pub(crate) order: Vec<usize>,
    pub(crate) previous: Vec<ItemId>,
}

impl ReorderCommand {
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    pub(crate) fn apply(&mut self, items: &mut ItemList) -> Result<()> {
        if items.ids() != self.previous {
            return Err(QuireError::consistency(
                "reorder: list differs from the captured ordering",
            ));
        }
        items.arrange(&self.order)
    }

    pub(crate) fn revert(&mut self, items: &mut ItemList) -> Result<()> {
        if items.len() != self.previous.len() {
            return Err(QuireError::consistency(format!(
                "undo reorder: captured {} items, list has {}",
                self.previous.len(),
                items.len()
            )));
        }
        let restore = self
            .previous
            .iter()
            .map(|id| {
                items.position_of(id).ok_or_else(|| {
                    QuireError::consistency(format!("undo reorder: {id} is missing"))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        items.arrange(&restore)
    }
}
