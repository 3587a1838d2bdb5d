//! User account variant.
//!
//! # Invariants
//! - `email`, `password`, `first_name`, `last_name` are always present in
//!   `to_dict()`, defaulting to empty strings.

use super::entity::{Attributes, Entity, EntityBase, EntityKind, EntityResult};
use serde_json::Value;

const FIELD_EMAIL: &str = "email";
const FIELD_PASSWORD: &str = "password";
const FIELD_FIRST_NAME: &str = "first_name";
const FIELD_LAST_NAME: &str = "last_name";

#[derive(Debug, Clone, PartialEq, Default)]
pub struct User {
    base: EntityBase,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

impl User {
    /// Creates a user with fresh identity and empty profile fields.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a user with fresh identity and the given email.
    pub fn with_email(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            ..Self::default()
        }
    }
}

impl Entity for User {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn base(&self) -> &EntityBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut EntityBase {
        &mut self.base
    }

    fn attributes(&self) -> Attributes {
        let mut attrs = Attributes::new();
        attrs.insert(FIELD_EMAIL.to_string(), Value::String(self.email.clone()));
        attrs.insert(
            FIELD_PASSWORD.to_string(),
            Value::String(self.password.clone()),
        );
        attrs.insert(
            FIELD_FIRST_NAME.to_string(),
            Value::String(self.first_name.clone()),
        );
        attrs.insert(
            FIELD_LAST_NAME.to_string(),
            Value::String(self.last_name.clone()),
        );
        attrs
    }

    fn clone_boxed(&self) -> Box<dyn Entity> {
        Box::new(self.clone())
    }
}

impl EntityKind for User {
    const TYPE_NAME: &'static str = "User";

    fn from_attributes(attrs: &Attributes) -> EntityResult<Self> {
        let mut base = EntityBase::from_attributes(attrs)?;
        let email = base.take_string(FIELD_EMAIL)?.unwrap_or_default();
        let password = base.take_string(FIELD_PASSWORD)?.unwrap_or_default();
        let first_name = base.take_string(FIELD_FIRST_NAME)?.unwrap_or_default();
        let last_name = base.take_string(FIELD_LAST_NAME)?.unwrap_or_default();

        Ok(Self {
            base,
            email,
            password,
            first_name,
            last_name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::User;
    use crate::model::entity::{Entity, EntityError, EntityKind};
    use serde_json::json;

    #[test]
    fn new_user_dict_has_empty_profile_fields() {
        let dict = User::new().to_dict();
        assert_eq!(dict["type_name"], "User");
        assert_eq!(dict["email"], "");
        assert_eq!(dict["last_name"], "");
    }

    #[test]
    fn profile_fields_are_not_duplicated_into_extras() {
        let user = User::with_email("a@b.c");
        let rebuilt = User::from_attributes(&user.to_dict()).expect("round-trip should succeed");
        assert!(rebuilt.base().extra().is_empty());
        assert_eq!(rebuilt, user);
    }

    #[test]
    fn set_attribute_refuses_owned_field_names() {
        let mut user = User::new();
        let err = user
            .set_attribute("email", json!("x@y.z"))
            .expect_err("email is owned by the variant");
        assert_eq!(err, EntityError::ReservedAttribute("email".to_string()));
    }
}
