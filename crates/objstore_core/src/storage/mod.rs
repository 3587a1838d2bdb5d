//! File-backed object registry and its supporting types.
//!
//! # Responsibility
//! - Hold the in-process registry of live entities (`file_storage`).
//! - Resolve persisted type names to reconstruction constructors (`registry`).
//!
//! # Invariants
//! - Registry keys are always `type_name + "." + id`.
//! - Failed operations leave the in-memory registry exactly as it was.

use crate::model::entity::EntityError;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;
use std::path::PathBuf;

pub mod file_storage;
pub mod registry;

/// Separator between type name and id in a composite key.
///
/// Neither part is escaped; type names and ids are expected not to contain it.
pub const KEY_SEPARATOR: char = '.';

pub type StoreResult<T> = Result<T, StoreError>;

/// Storage engine error.
#[derive(Debug)]
pub enum StoreError {
    /// Registration of an entity without a usable type name or id.
    InvalidEntity(String),
    /// I/O failure while reading or writing the backing file.
    Persistence { path: PathBuf, source: io::Error },
    /// Backing file is not a JSON object of JSON objects.
    CorruptStore { path: PathBuf, reason: String },
    /// Persisted `type_name` has no registered reconstruction constructor.
    UnknownType { key: String, type_name: String },
    /// Persisted entry failed reconstruction.
    MalformedAttributes { key: String, source: EntityError },
    /// No entity registered under the key.
    NotFound(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidEntity(message) => write!(f, "invalid entity: {message}"),
            Self::Persistence { path, source } => {
                write!(f, "store file `{}` I/O failed: {source}", path.display())
            }
            Self::CorruptStore { path, reason } => {
                write!(f, "store file `{}` is corrupt: {reason}", path.display())
            }
            Self::UnknownType { key, type_name } => {
                write!(f, "unknown entity type `{type_name}` for key `{key}`")
            }
            Self::MalformedAttributes { key, source } => {
                write!(f, "malformed attributes for key `{key}`: {source}")
            }
            Self::NotFound(key) => write!(f, "entity not found: {key}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Persistence { source, .. } => Some(source),
            Self::MalformedAttributes { source, .. } => Some(source),
            Self::InvalidEntity(_)
            | Self::CorruptStore { .. }
            | Self::UnknownType { .. }
            | Self::NotFound(_) => None,
        }
    }
}

impl StoreError {
    /// Stable short code used in log events.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidEntity(_) => "invalid_entity",
            Self::Persistence { .. } => "persistence_error",
            Self::CorruptStore { .. } => "corrupt_store",
            Self::UnknownType { .. } => "unknown_type",
            Self::MalformedAttributes { .. } => "malformed_attributes",
            Self::NotFound(_) => "not_found",
        }
    }
}

/// Builds the registry key for one entity.
pub fn composite_key(type_name: &str, id: &str) -> String {
    format!("{type_name}{KEY_SEPARATOR}{id}")
}
