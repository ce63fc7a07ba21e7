//! Item domain module.
//!
//! # Module Structure
//!
//! - `id`: Stable identifiers (`ItemId`)
//! - `kind`: Kind tags (`ItemKind`)
//! - `model`: The item itself, its flags and output slot
//! - `patch`: Field-level updates (`ItemPatch`)
//! - `list`: Ordered storage with identifier index (`ItemList`)

mod id;
mod kind;
mod list;
mod model;
mod patch;

pub use id::ItemId;
pub use kind::ItemKind;
pub(crate) use kind::invalid_kind;
pub use list::{ItemList, validate_permutation};
pub use model::{Item, ItemFlags, ItemOutput, OutputRecord};
pub use patch::ItemPatch;
