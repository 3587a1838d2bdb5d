//! Generic variant with no attributes of its own.

use super::entity::{Attributes, Entity, EntityBase, EntityKind, EntityResult};

/// Plain stored object; every attribute beyond the base lives in extras.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BaseModel {
    base: EntityBase,
}

impl BaseModel {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Entity for BaseModel {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn base(&self) -> &EntityBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut EntityBase {
        &mut self.base
    }

    fn clone_boxed(&self) -> Box<dyn Entity> {
        Box::new(self.clone())
    }
}

impl EntityKind for BaseModel {
    const TYPE_NAME: &'static str = "BaseModel";

    fn from_attributes(attrs: &Attributes) -> EntityResult<Self> {
        Ok(Self {
            base: EntityBase::from_attributes(attrs)?,
        })
    }
}
