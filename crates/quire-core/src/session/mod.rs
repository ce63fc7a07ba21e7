//! Session domain module.
//!
//! # Module Structure
//!
//! - `model`: The session itself, its summary and targeting types
//! - `report`: Payloads returned by registry operations
//! - `registry`: Session lifecycle, command application and history (`SessionRegistry`)
//!
//! # Usage
//!
//! ```ignore
//! use quire_core::session::{NotebookRegistry, RegisterMode, SessionRef};
//! ```

mod model;
mod registry;
mod report;

#[cfg(test)]
mod registry_test;

pub use model::{RegisterMode, Session, SessionRef, SessionSummary};
pub use registry::{DialogRegistry, ItemQuery, NotebookRegistry, SessionRegistry};
pub use report::{ExecutionReport, ItemPreview, OperationReport, context_window};
