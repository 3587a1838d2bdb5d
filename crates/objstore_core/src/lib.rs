//! Minimal object persistence: an in-memory entity registry saved to and
//! reloaded from one JSON snapshot file.

pub mod config;
pub mod logging;
pub mod model;
pub mod storage;

pub use config::{StoreConfig, DEFAULT_FILE_PATH};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::base_model::BaseModel;
pub use model::entity::{
    format_timestamp, parse_timestamp, Attributes, Entity, EntityBase, EntityError, EntityKind,
    EntityResult, Timestamp, TIMESTAMP_FORMAT,
};
pub use model::user::User;
pub use storage::file_storage::{FileStorage, ObjectMap};
pub use storage::registry::{RegistryError, TypeRegistry};
pub use storage::{composite_key, StoreError, StoreResult, KEY_SEPARATOR};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
