//! Session registry with command-based undo/redo for notebooks and dialogs.
//!
//! Items live in named sessions. Every structural change goes through a
//! reversible [`Command`](command::Command) recorded in the session's
//! [`OperationHistory`](history::OperationHistory); the
//! [`SessionRegistry`](session::SessionRegistry) is the only entry point that
//! builds and applies them.

pub mod address;
pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod history;
pub mod item;
pub mod session;
pub mod store;

pub use address::{Address, AddressResolver, IdentifierResolver, ItemAddress, PositionalResolver};
pub use command::{Command, Operation, OperationKind};
pub use config::QuireConfig;
pub use engine::{EngineFactory, ExecutionEngine, ExecutionOutcome};
pub use error::{QuireError, Result};
pub use history::{HistorySnapshot, HistoryStep, OperationHistory};
pub use item::{Item, ItemFlags, ItemId, ItemKind, ItemList, ItemOutput, ItemPatch, OutputRecord};
pub use session::{
    DialogRegistry, NotebookRegistry, RegisterMode, SessionRef, SessionRegistry, SessionSummary,
};
pub use store::ItemStore;
