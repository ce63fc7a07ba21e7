//! Per-session undo/redo history.
//!
//! Two stacks of applied [`Command`]s. Recording a new command clears the
//! redo stack, and only the undo stack is capped: once it exceeds its
//! capacity the oldest command is discarded for good.
//!
//! ```text
//! record(c4)            undo x2              record(c5)
//! undo: [c1 c2 c3 c4]   undo: [c1 c2]        undo: [c1 c2 c5]
//! redo: []              redo: [c4 c3]        redo: []
//! ```

use crate::command::Command;
use crate::error::Result;
use crate::item::ItemList;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// Outcome of an undo or redo request.
///
/// Asking for more steps than are available is not an error: `performed`
/// simply comes back smaller than `requested` (zero on an empty stack).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryStep {
    pub requested: usize,
    pub performed: usize,
    /// Descriptions of the commands undone or redone, in processing order
    pub descriptions: Vec<String>,
}

impl HistoryStep {
    pub fn is_exhausted(&self) -> bool {
        self.performed < self.requested
    }
}

/// Descriptions of both stacks, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistorySnapshot {
    pub undo: Vec<String>,
    pub redo: Vec<String>,
}

#[derive(Debug)]
pub struct OperationHistory {
    undo_stack: VecDeque<Command>,
    redo_stack: VecDeque<Command>,
    capacity: usize,
}

impl Default for OperationHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl OperationHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: VecDeque::new(),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Records an already-applied command.
    ///
    /// Returns how many old commands were evicted to stay within capacity.
    pub fn record(&mut self, command: Command) -> usize {
        self.redo_stack.clear();
        self.undo_stack.push_back(command);
        let mut evicted = 0;
        while self.undo_stack.len() > self.capacity {
            self.undo_stack.pop_front();
            evicted += 1;
        }
        evicted
    }

    /// Reverts up to `steps` commands against `items`.
    ///
    /// A failing revert leaves that command on the undo stack and returns the
    /// error; steps completed before it stay undone.
    pub fn undo(&mut self, items: &mut ItemList, steps: usize) -> Result<HistoryStep> {
        let mut step = HistoryStep {
            requested: steps,
            ..HistoryStep::default()
        };
        for _ in 0..steps.min(self.undo_stack.len()) {
            let Some(mut command) = self.undo_stack.pop_back() else {
                break;
            };
            if let Err(err) = command.revert(items) {
                self.undo_stack.push_back(command);
                return Err(err);
            }
            step.descriptions.push(command.description());
            step.performed += 1;
            self.redo_stack.push_back(command);
        }
        Ok(step)
    }

    /// Re-applies up to `steps` undone commands; mirror of [`Self::undo`].
    pub fn redo(&mut self, items: &mut ItemList, steps: usize) -> Result<HistoryStep> {
        let mut step = HistoryStep {
            requested: steps,
            ..HistoryStep::default()
        };
        for _ in 0..steps.min(self.redo_stack.len()) {
            let Some(mut command) = self.redo_stack.pop_back() else {
                break;
            };
            if let Err(err) = command.apply(items) {
                self.redo_stack.push_back(command);
                return Err(err);
            }
            step.descriptions.push(command.description());
            step.performed += 1;
            self.undo_stack.push_back(command);
        }
        Ok(step)
    }

    pub fn snapshot(&self) -> HistorySnapshot {
        HistorySnapshot {
            undo: self.undo_stack.iter().map(Command::description).collect(),
            redo: self.redo_stack.iter().map(Command::description).collect(),
        }
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    /// Drops both stacks; the item list is untouched.
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}
