//! Reversible mutations of a session's item list.
//!
//! An [`Operation`] is what a caller asks for, expressed in [`Address`]es.
//! Building it against a resolver and the live list produces a [`Command`]
//! that holds resolved positions and everything needed to undo itself. The
//! item list is mutated only through commands; the registry is the sole
//! place that builds and applies them.

mod variants;

pub use variants::{
    DeleteCommand, InsertCommand, MoveCommand, ReorderCommand, SwapCommand, UpdateCommand,
};

use crate::address::{Address, AddressResolver};
use crate::error::{QuireError, Result};
use crate::item::{Item, ItemFlags, ItemId, ItemKind, ItemList, ItemPatch, validate_permutation};
use serde::{Deserialize, Serialize};

/// Tag of an operation, used in logs and summaries.
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
    strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OperationKind {
    Insert,
    Delete,
    Update,
    Move,
    Swap,
    Reorder,
}

/// A structural mutation requested by a caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum Operation {
    /// Insert a new item; `kind` falls back to the session's default kind.
    Insert {
        at: Address,
        kind: Option<ItemKind>,
        content: String,
        #[serde(default)]
        flags: ItemFlags,
    },
    /// Delete a batch of items atomically.
    Delete { targets: Vec<Address> },
    Update { target: Address, patch: ItemPatch },
    /// Move an item so it ends up at position `to`.
    Move { from: Address, to: Address },
    Swap { first: Address, second: Address },
    /// New position `i` receives the item currently at `order[i]`.
    Reorder { order: Vec<usize> },
}

impl Operation {
    /// Insert with default kind and flags.
    pub fn insert(at: impl Into<Address>, content: impl Into<String>) -> Self {
        Operation::Insert {
            at: at.into(),
            kind: None,
            content: content.into(),
            flags: ItemFlags::default(),
        }
    }

    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::Insert { .. } => OperationKind::Insert,
            Operation::Delete { .. } => OperationKind::Delete,
            Operation::Update { .. } => OperationKind::Update,
            Operation::Move { .. } => OperationKind::Move,
            Operation::Swap { .. } => OperationKind::Swap,
            Operation::Reorder { .. } => OperationKind::Reorder,
        }
    }

    /// Resolves and validates the request against the current list.
    ///
    /// Nothing is mutated here; every address and kind error surfaces before
    /// the resulting command touches the list.
    pub fn build<R: AddressResolver>(self, resolver: &R, items: &ItemList) -> Result<Command> {
        let command = match self {
            Operation::Insert {
                at,
                kind,
                content,
                flags,
            } => {
                let kind = kind.unwrap_or_else(|| resolver.default_kind());
                resolver.check_kind(kind)?;
                let index = resolver.resolve_insert(items, &at)?;
                let item = Item::with_id(items.issue_id(), kind, content).with_flags(flags);
                Command::Insert(InsertCommand::new(index, item))
            }
            Operation::Delete { targets } => {
                if targets.is_empty() {
                    return Err(QuireError::InvalidArgument(
                        "delete needs at least one address".to_string(),
                    ));
                }
                let resolved = targets
                    .iter()
                    .map(|address| {
                        let position = resolver.resolve(items, address)?;
                        Ok((position, id_at(items, position)?))
                    })
                    .collect::<Result<Vec<_>>>()?;
                Command::Delete(DeleteCommand::new(resolved))
            }
            Operation::Update { target, patch } => {
                if patch.is_empty() {
                    return Err(QuireError::InvalidField("no fields to update".to_string()));
                }
                if let Some(kind) = patch.kind {
                    resolver.check_kind(kind)?;
                }
                let index = resolver.resolve(items, &target)?;
                Command::Update(UpdateCommand::new(index, id_at(items, index)?, patch))
            }
            Operation::Move { from, to } => {
                let from = resolver.resolve(items, &from)?;
                let to = resolver.resolve(items, &to)?;
                Command::Move(MoveCommand {
                    from,
                    to,
                    id: id_at(items, from)?,
                })
            }
            Operation::Swap { first, second } => {
                let first = resolver.resolve(items, &first)?;
                let second = resolver.resolve(items, &second)?;
                Command::Swap(SwapCommand {
                    first: (first, id_at(items, first)?),
                    second: (second, id_at(items, second)?),
                })
            }
            Operation::Reorder { order } => {
                validate_permutation(&order, items.len())?;
                Command::Reorder(ReorderCommand {
                    order,
                    previous: items.ids(),
                })
            }
        };
        Ok(command)
    }
}

fn id_at(items: &ItemList, position: usize) -> Result<ItemId> {
    items
        .get(position)
        .map(|item| item.id().clone())
        .ok_or_else(|| QuireError::out_of_range(position as i64, items.len()))
}

/// A resolved, self-contained, reversible mutation.
#[derive(Debug, Clone)]
pub enum Command {
    Insert(InsertCommand),
    Delete(DeleteCommand),
    Update(UpdateCommand),
    Move(MoveCommand),
    Swap(SwapCommand),
    Reorder(ReorderCommand),
}

impl Command {
    pub fn kind(&self) -> OperationKind {
        match self {
            Command::Insert(_) => OperationKind::Insert,
            Command::Delete(_) => OperationKind::Delete,
            Command::Update(_) => OperationKind::Update,
            Command::Move(_) => OperationKind::Move,
            Command::Swap(_) => OperationKind::Swap,
            Command::Reorder(_) => OperationKind::Reorder,
        }
    }

    /// Applies the command (first time or redo).
    pub fn apply(&mut self, items: &mut ItemList) -> Result<()> {
        match self {
            Command::Insert(cmd) => cmd.apply(items),
            Command::Delete(cmd) => cmd.apply(items),
            Command::Update(cmd) => cmd.apply(items),
            Command::Move(cmd) => cmd.apply(items),
            Command::Swap(cmd) => cmd.apply(items),
            Command::Reorder(cmd) => cmd.apply(items),
        }
    }

    /// Reverses a previous [`Command::apply`].
    pub fn revert(&mut self, items: &mut ItemList) -> Result<()> {
        match self {
            Command::Insert(cmd) => cmd.revert(items),
            Command::Delete(cmd) => cmd.revert(items),
            Command::Update(cmd) => cmd.revert(items),
            Command::Move(cmd) => cmd.revert(items),
            Command::Swap(cmd) => cmd.revert(items),
            Command::Reorder(cmd) => cmd.revert(items),
        }
    }

    /// Position the command's effect centres on once applied.
    pub fn focus(&self) -> Option<usize> {
        match self {
            Command::Insert(cmd) => Some(cmd.index),
            Command::Delete(cmd) => cmd.targets.last().map(|(position, _)| *position),
            Command::Update(cmd) => Some(cmd.index),
            Command::Move(cmd) => Some(cmd.to),
            Command::Swap(cmd) => Some(cmd.first.0.min(cmd.second.0)),
            Command::Reorder(_) => None,
        }
    }

    /// Human-readable summary: operation kind and target address.
    pub fn description(&self) -> String {
        match self {
            Command::Insert(cmd) => format!("insert {} at {} ({})", cmd.kind, cmd.index, cmd.id),
            Command::Delete(cmd) => {
                let mut positions = cmd.positions();
                positions.reverse();
                match positions.as_slice() {
                    [single] => format!("delete {single} ({})", cmd.targets[0].1),
                    many => format!("delete {} items at {many:?}", many.len()),
                }
            }
            Command::Update(cmd) => format!(
                "update {} ({}): {}",
                cmd.index,
                cmd.id,
                cmd.patch.field_names().join(", ")
            ),
            Command::Move(cmd) => format!("move {} -> {} ({})", cmd.from, cmd.to, cmd.id),
            Command::Swap(cmd) => format!("swap {} <-> {}", cmd.first.0, cmd.second.0),
            Command::Reorder(cmd) => format!("reorder {} items", cmd.order.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::{IdentifierResolver, PositionalResolver};

    fn list_of(contents: &[&str]) -> ItemList {
        let items = contents
            .iter()
            .map(|c| Item::new(ItemKind::Code, *c))
            .collect();
        ItemList::from_items(items).0
    }

    fn contents(list: &ItemList) -> Vec<String> {
        list.iter().map(|item| item.content.clone()).collect()
    }

    fn run(op: Operation, list: &mut ItemList) -> Command {
        let mut command = op.build(&PositionalResolver, list).unwrap();
        command.apply(list).unwrap();
        command
    }

    #[test]
    fn test_delete_descending_restore_ascending() {
        let mut list = list_of(&["A", "B", "C", "D", "E"]);
        let mut cmd = run(
            Operation::Delete {
                targets: vec![Address::Index(1), Address::Index(3)],
            },
            &mut list,
        );
        assert_eq!(contents(&list), ["A", "C", "E"]);
        if let Command::Delete(delete) = &cmd {
            assert_eq!(delete.positions(), vec![3, 1]);
            let removed: Vec<_> = delete.removed().into_iter().map(|i| i.content).collect();
            assert_eq!(removed, ["B", "D"]);
        }

        cmd.revert(&mut list).unwrap();
        assert_eq!(contents(&list), ["A", "B", "C", "D", "E"]);
    }

    #[test]
    fn test_delete_is_atomic_on_bad_address() {
        let list = list_of(&["A", "B"]);
        let err = Operation::Delete {
            targets: vec![Address::Index(0), Address::Index(5)],
        }
        .build(&PositionalResolver, &list)
        .unwrap_err();
        assert!(err.is_out_of_range());
        assert_eq!(contents(&list), ["A", "B"]);
    }

    #[test]
    fn test_move_and_reorder_undo() {
        let mut list = list_of(&["A", "B", "C", "D"]);
        let mut mv = run(
            Operation::Move {
                from: Address::Index(3),
                to: Address::Index(0),
            },
            &mut list,
        );
        assert_eq!(contents(&list), ["D", "A", "B", "C"]);
        mv.revert(&mut list).unwrap();
        assert_eq!(contents(&list), ["A", "B", "C", "D"]);

        let mut reorder = run(
            Operation::Reorder {
                order: vec![2, 0, 3, 1],
            },
            &mut list,
        );
        assert_eq!(contents(&list), ["C", "A", "D", "B"]);
        reorder.revert(&mut list).unwrap();
        assert_eq!(contents(&list), ["A", "B", "C", "D"]);
    }

    #[test]
    fn test_insert_redo_restores_same_item() {
        let mut list = list_of(&["A"]);
        let mut insert = run(Operation::insert(Address::END, "B"), &mut list);
        let id = list.get(1).unwrap().id().clone();

        insert.revert(&mut list).unwrap();
        assert_eq!(contents(&list), ["A"]);
        insert.apply(&mut list).unwrap();
        assert_eq!(list.get(1).unwrap().id(), &id);
        assert_eq!(insert.description(), format!("insert code at 1 ({id})"));
    }

    #[test]
    fn test_update_touches_only_patched_fields() {
        let mut list = list_of(&["A"]);
        let mut update = run(
            Operation::Update {
                target: Address::Index(0),
                patch: ItemPatch::content("A2").with_pinned(true),
            },
            &mut list,
        );
        list.get_mut(0).unwrap().execution_count = Some(4);

        update.revert(&mut list).unwrap();
        let item = list.get(0).unwrap();
        assert_eq!(item.content, "A");
        assert!(!item.flags.pinned);
        assert_eq!(item.execution_count, Some(4));
    }

    #[test]
    fn test_swap_self_is_recorded_noop() {
        let mut list = list_of(&["A", "B"]);
        let mut swap = run(
            Operation::Swap {
                first: Address::Index(1),
                second: Address::Index(1),
            },
            &mut list,
        );
        assert_eq!(contents(&list), ["A", "B"]);
        swap.revert(&mut list).unwrap();
        assert_eq!(contents(&list), ["A", "B"]);
        assert_eq!(swap.description(), "swap 1 <-> 1");
    }

    #[test]
    fn test_kind_validation_per_resolver() {
        let list = ItemList::new();
        let op = Operation::Insert {
            at: Address::END,
            kind: Some(ItemKind::Prompt),
            content: "hi".to_string(),
            flags: ItemFlags::default(),
        };
        assert!(matches!(
            op.clone().build(&PositionalResolver, &list).unwrap_err(),
            QuireError::InvalidKind { .. }
        ));
        assert!(op.build(&IdentifierResolver, &list).is_ok());
    }

    #[test]
    fn test_revert_detects_out_of_band_change() {
        let mut list = list_of(&["A", "B", "C"]);
        let mut mv = run(
            Operation::Move {
                from: Address::Index(0),
                to: Address::Index(2),
            },
            &mut list,
        );
        list.swap(0, 2).unwrap();

        let before = contents(&list);
        let err = mv.revert(&mut list).unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(contents(&list), before);
    }
}
