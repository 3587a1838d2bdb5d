//! Type-name dispatch table used by reload.

use super::KEY_SEPARATOR;
use crate::model::base_model::BaseModel;
use crate::model::entity::{Attributes, Entity, EntityKind, EntityResult};
use crate::model::user::User;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};

/// Reconstruction constructor for one registered variant.
pub type Reconstructor = fn(&Attributes) -> EntityResult<Box<dyn Entity>>;

/// Variant registration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    InvalidTypeName(String),
    DuplicateTypeName(String),
}

impl Display for RegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidTypeName(value) => write!(f, "entity type name is invalid: `{value}`"),
            Self::DuplicateTypeName(value) => {
                write!(f, "entity type name already registered: `{value}`")
            }
        }
    }
}

impl Error for RegistryError {}

/// Maps persisted `type_name` values to reconstruction constructors.
#[derive(Clone, Default)]
pub struct TypeRegistry {
    kinds: BTreeMap<&'static str, Reconstructor>,
}

impl Debug for TypeRegistry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.kinds.keys()).finish()
    }
}

impl TypeRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the variants shipped with this crate.
    pub fn with_builtin_kinds() -> Self {
        let mut registry = Self::new();
        registry.kinds.insert(BaseModel::TYPE_NAME, reconstruct::<BaseModel>);
        registry.kinds.insert(User::TYPE_NAME, reconstruct::<User>);
        registry
    }

    /// Registers one variant by its `TYPE_NAME`.
    pub fn register<T: EntityKind>(&mut self) -> Result<(), RegistryError> {
        let type_name = T::TYPE_NAME;
        if !is_valid_type_name(type_name) {
            return Err(RegistryError::InvalidTypeName(type_name.to_string()));
        }
        if self.kinds.contains_key(type_name) {
            return Err(RegistryError::DuplicateTypeName(type_name.to_string()));
        }

        self.kinds.insert(type_name, reconstruct::<T>);
        Ok(())
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.kinds.contains_key(type_name)
    }

    pub fn get(&self, type_name: &str) -> Option<Reconstructor> {
        self.kinds.get(type_name).copied()
    }

    /// Returns sorted registered type names.
    pub fn type_names(&self) -> Vec<&'static str> {
        self.kinds.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

fn reconstruct<T: EntityKind>(attrs: &Attributes) -> EntityResult<Box<dyn Entity>> {
    Ok(Box::new(T::from_attributes(attrs)?))
}

fn is_valid_type_name(value: &str) -> bool {
    !value.trim().is_empty() && !value.contains(KEY_SEPARATOR)
}
