//! Data Transfer Objects (DTOs) for persistence.
//!
//! These DTOs are the on-disk schema of a session document. They are private
//! to the infrastructure layer so the domain model can evolve without
//! breaking stored files.
//!
//! ## Document Version History
//! - **1**: `{ "format_version": 1, "items": [...] }`; a bare item array is
//!   read as version 1 as well

mod document;

pub use document::{CURRENT_FORMAT_VERSION, DocumentDTO, ItemDTO, StoredDocument};
