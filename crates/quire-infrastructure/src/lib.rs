pub mod config_service;
pub mod dto;
pub mod json_item_store;
pub mod logging;
pub mod paths;
pub mod storage;

pub use crate::config_service::ConfigService;
pub use crate::json_item_store::JsonItemStore;
pub use crate::logging::{ActivityEvent, ActivityLayer, init_logging};
pub use crate::paths::QuirePaths;
