//! JSON snapshot storage engine.
//!
//! # Responsibility
//! - Own the registry `composite key -> entity` for one backing file.
//! - Save the whole registry as one snapshot; reload it as a full replace.
//!
//! # Invariants
//! - `save` never leaves a partially written file at the configured path.
//! - `reload` of a missing file is a no-op; any other failure leaves the
//!   registry untouched.
//! - An unknown `type_name` aborts the whole reload.
//! - No internal locking: callers serialize access through `&mut self`.

use super::registry::TypeRegistry;
use super::{composite_key, StoreError, StoreResult};
use crate::config::StoreConfig;
use crate::model::entity::{Attributes, Entity, FIELD_TYPE_NAME};
use log::{debug, error, info};
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tempfile::NamedTempFile;

/// Registry contents keyed by composite key, ordered by key.
pub type ObjectMap = BTreeMap<String, Box<dyn Entity>>;

/// File-backed object registry.
#[derive(Debug)]
pub struct FileStorage {
    file_path: PathBuf,
    objects: ObjectMap,
    types: TypeRegistry,
}

impl FileStorage {
    /// Creates an empty engine. No file I/O occurs.
    pub fn new(config: StoreConfig, types: TypeRegistry) -> Self {
        Self {
            file_path: config.file_path,
            objects: ObjectMap::new(),
            types,
        }
    }

    /// Creates an engine and loads the existing snapshot, if any.
    pub fn open(config: StoreConfig, types: TypeRegistry) -> StoreResult<Self> {
        let mut storage = Self::new(config, types);
        storage.reload()?;
        Ok(storage)
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    /// Returns the full registry. Entries are read-only through this view.
    pub fn all(&self) -> &ObjectMap {
        &self.objects
    }

    pub fn get(&self, key: &str) -> Option<&dyn Entity> {
        self.objects.get(key).map(|entity| &**entity)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Registers an entity under `type_name.id`, replacing any previous entry.
    ///
    /// Returns the composite key. No file I/O occurs.
    ///
    /// # Errors
    /// - `InvalidEntity` when the type name or id is blank, or the type name
    ///   has no reconstruction constructor in this engine's registry.
    pub fn new_entity(&mut self, entity: Box<dyn Entity>) -> StoreResult<String> {
        let type_name = entity.type_name();
        if type_name.trim().is_empty() {
            return Err(StoreError::InvalidEntity(
                "entity has no type name".to_string(),
            ));
        }
        if entity.id().trim().is_empty() {
            return Err(StoreError::InvalidEntity(format!(
                "`{type_name}` entity has no id"
            )));
        }
        if !self.types.contains(type_name) {
            return Err(StoreError::InvalidEntity(format!(
                "entity type `{type_name}` is not registered"
            )));
        }

        let key = composite_key(type_name, entity.id());
        if self.objects.insert(key.clone(), entity).is_some() {
            debug!("event=store_new module=store status=ok replaced=true");
        } else {
            debug!("event=store_new module=store status=ok replaced=false");
        }
        Ok(key)
    }

    /// Writes every registered entity to the backing file as one snapshot.
    ///
    /// The snapshot is written to a temporary file beside the target and then
    /// renamed over it. Entities are not touched.
    ///
    /// # Errors
    /// - `Persistence` on any I/O failure; the previous file stays intact.
    pub fn save(&self) -> StoreResult<()> {
        let started_at = Instant::now();
        let snapshot: Attributes = self
            .objects
            .iter()
            .map(|(key, entity)| (key.clone(), Value::Object(entity.to_dict())))
            .collect();

        match self.write_snapshot(&Value::Object(snapshot)) {
            Ok(()) => {
                info!(
                    "event=store_save module=store status=ok entities={} duration_ms={}",
                    self.objects.len(),
                    started_at.elapsed().as_millis()
                );
                Ok(())
            }
            Err(source) => {
                let err = StoreError::Persistence {
                    path: self.file_path.clone(),
                    source,
                };
                log_failure("store_save", started_at, &err);
                Err(err)
            }
        }
    }

    /// Refreshes `updated_at` of the entity under `key`, then saves.
    ///
    /// # Errors
    /// - `NotFound` when no entity is registered under `key`.
    /// - Any error from [`FileStorage::save`].
    pub fn touch_and_save(&mut self, key: &str) -> StoreResult<()> {
        let entity = self
            .objects
            .get_mut(key)
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;
        entity.touch();
        self.save()
    }

    /// Replaces the registry with the snapshot stored in the backing file.
    ///
    /// # Errors
    /// - `Persistence` when the file exists but cannot be read.
    /// - `CorruptStore` when the content is not a JSON object of objects, an
    ///   entry lacks a string `type_name`, or a key does not match its entry.
    /// - `UnknownType` when a `type_name` is not registered.
    /// - `MalformedAttributes` when an entry fails reconstruction.
    pub fn reload(&mut self) -> StoreResult<()> {
        let started_at = Instant::now();
        let content = match std::fs::read_to_string(&self.file_path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                info!("event=store_reload module=store status=skipped reason=missing_file");
                return Ok(());
            }
            Err(source) => {
                let err = StoreError::Persistence {
                    path: self.file_path.clone(),
                    source,
                };
                log_failure("store_reload", started_at, &err);
                return Err(err);
            }
        };

        match self.decode_snapshot(&content) {
            Ok(objects) => {
                self.objects = objects;
                info!(
                    "event=store_reload module=store status=ok entities={} duration_ms={}",
                    self.objects.len(),
                    started_at.elapsed().as_millis()
                );
                Ok(())
            }
            Err(err) => {
                log_failure("store_reload", started_at, &err);
                Err(err)
            }
        }
    }

    fn write_snapshot(&self, snapshot: &Value) -> io::Result<()> {
        let payload = serde_json::to_vec(snapshot)?;
        let dir = match self.file_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut file = NamedTempFile::new_in(dir)?;
        file.write_all(&payload)?;
        file.flush()?;
        file.as_file().sync_all()?;
        file.persist(&self.file_path).map_err(|err| err.error)?;
        Ok(())
    }

    fn decode_snapshot(&self, content: &str) -> StoreResult<ObjectMap> {
        let root: Value = serde_json::from_str(content)
            .map_err(|err| self.corrupt(format!("invalid JSON: {err}")))?;
        let Value::Object(entries) = root else {
            return Err(self.corrupt("top-level value is not an object".to_string()));
        };

        let mut objects = ObjectMap::new();
        for (key, value) in entries {
            let Value::Object(attrs) = value else {
                return Err(self.corrupt(format!("entry `{key}` is not an object")));
            };
            let Some(Value::String(type_name)) = attrs.get(FIELD_TYPE_NAME) else {
                return Err(self.corrupt(format!("entry `{key}` has no string `type_name`")));
            };
            let Some(reconstruct) = self.types.get(type_name) else {
                return Err(StoreError::UnknownType {
                    key,
                    type_name: type_name.clone(),
                });
            };

            let entity = match reconstruct(&attrs) {
                Ok(entity) => entity,
                Err(source) => return Err(StoreError::MalformedAttributes { key, source }),
            };
            let expected_key = composite_key(entity.type_name(), entity.id());
            if expected_key != key {
                return Err(self.corrupt(format!(
                    "entry `{key}` does not match its identity `{expected_key}`"
                )));
            }
            objects.insert(key, entity);
        }

        Ok(objects)
    }

    fn corrupt(&self, reason: String) -> StoreError {
        StoreError::CorruptStore {
            path: self.file_path.clone(),
            reason,
        }
    }
}

fn log_failure(event: &str, started_at: Instant, err: &StoreError) {
    error!(
        "event={} module=store status=error duration_ms={} error_code={} error={}",
        event,
        started_at.elapsed().as_millis(),
        err.code(),
        err
    );
}
