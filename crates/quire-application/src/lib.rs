//! Application layer for quire.
//!
//! Wires the session registries to the JSON store and the process engine,
//! and renders registry results as plain text for adapters that speak text
//! (a tool-calling protocol, a terminal).

pub mod render;
pub mod workbench;

pub use workbench::Workbench;
