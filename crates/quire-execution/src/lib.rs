//! Execution engines backing quire sessions.

pub mod process_engine;

pub use process_engine::{ProcessEngine, ProcessEngineFactory};
