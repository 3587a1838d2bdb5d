//! Entity base contract shared by every storable variant.
//!
//! # Responsibility
//! - Assign identity and creation/update timestamps.
//! - Map an entity to and from a flat attribute dictionary.
//!
//! # Invariants
//! - `id` and `created_at` never change after construction.
//! - `to_dict()` always carries `type_name`, `id`, `created_at`, `updated_at`.
//! - Reconstruction takes timestamps from the dictionary, never from "now".
//! - Attribute values are JSON primitives (null, bool, number, string).

use chrono::{NaiveDateTime, SubsecRound, Utc};
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use uuid::Uuid;

/// Flat attribute dictionary, the persisted shape of one entity.
pub type Attributes = Map<String, Value>;

/// Naive UTC timestamp with microsecond precision.
pub type Timestamp = NaiveDateTime;

pub type EntityResult<T> = Result<T, EntityError>;

/// Fixed textual format used for every serialized timestamp.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";
// `%.f` also accepts text without a fractional part.
const TIMESTAMP_PARSE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

pub const FIELD_TYPE_NAME: &str = "type_name";
pub const FIELD_ID: &str = "id";
pub const FIELD_CREATED_AT: &str = "created_at";
pub const FIELD_UPDATED_AT: &str = "updated_at";

const RESERVED_FIELDS: &[&str] = &[FIELD_TYPE_NAME, FIELD_ID, FIELD_CREATED_AT, FIELD_UPDATED_AT];

/// Malformed attribute input for reconstruction or attribute writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityError {
    MissingField(&'static str),
    EmptyId,
    InvalidFieldType {
        field: String,
        expected: &'static str,
    },
    InvalidTimestamp {
        field: &'static str,
        value: String,
    },
    NonFlatValue(String),
    ReservedAttribute(String),
}

impl Display for EntityError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField(field) => write!(f, "missing required attribute `{field}`"),
            Self::EmptyId => write!(f, "attribute `id` must not be empty"),
            Self::InvalidFieldType { field, expected } => {
                write!(f, "attribute `{field}` must be a {expected}")
            }
            Self::InvalidTimestamp { field, value } => write!(
                f,
                "attribute `{field}` has unparseable timestamp `{value}`; expected YYYY-MM-DDTHH:MM:SS.ffffff"
            ),
            Self::NonFlatValue(field) => {
                write!(f, "attribute `{field}` must be a primitive value, not an array or object")
            }
            Self::ReservedAttribute(field) => {
                write!(f, "attribute `{field}` is reserved and cannot be set directly")
            }
        }
    }
}

impl Error for EntityError {}

/// Renders a timestamp in the fixed persisted format.
pub fn format_timestamp(value: &Timestamp) -> String {
    value.format(TIMESTAMP_FORMAT).to_string()
}

/// Parses a timestamp written by [`format_timestamp`].
///
/// Fractional seconds are optional on input; digits beyond microseconds
/// are truncated so the value matches its own formatted form.
pub fn parse_timestamp(value: &str) -> Result<Timestamp, chrono::ParseError> {
    NaiveDateTime::parse_from_str(value.trim(), TIMESTAMP_PARSE_FORMAT)
        .map(|parsed| parsed.trunc_subsecs(6))
}

fn now() -> Timestamp {
    // Truncated so a fresh value equals its own formatted round-trip.
    Utc::now().naive_utc().trunc_subsecs(6)
}

/// Identity, timestamps and free-form attributes common to all variants.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityBase {
    id: String,
    created_at: Timestamp,
    updated_at: Timestamp,
    extra: Attributes,
}

impl Default for EntityBase {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityBase {
    /// Creates a fresh base with a generated id and `created_at == updated_at == now`.
    pub fn new() -> Self {
        let created_at = now();
        Self {
            id: Uuid::new_v4().to_string(),
            created_at,
            updated_at: created_at,
            extra: Attributes::new(),
        }
    }

    /// Rebuilds a base from a persisted dictionary.
    ///
    /// An empty dictionary yields a fresh base. Otherwise `id`, `created_at`
    /// and `updated_at` are required, `type_name` is ignored, and every other
    /// attribute is copied verbatim into the extra attributes.
    ///
    /// # Errors
    /// - Any required field missing, mistyped or unparseable.
    /// - Any attribute value that is an array or object.
    pub fn from_attributes(attrs: &Attributes) -> EntityResult<Self> {
        if attrs.is_empty() {
            return Ok(Self::new());
        }

        let id = required_str(attrs, FIELD_ID)?;
        if id.trim().is_empty() {
            return Err(EntityError::EmptyId);
        }
        let created_at = required_timestamp(attrs, FIELD_CREATED_AT)?;
        let updated_at = required_timestamp(attrs, FIELD_UPDATED_AT)?;

        let mut extra = Attributes::new();
        for (name, value) in attrs {
            if RESERVED_FIELDS.contains(&name.as_str()) {
                continue;
            }
            ensure_flat(name, value)?;
            extra.insert(name.clone(), value.clone());
        }

        Ok(Self {
            id: id.to_string(),
            created_at,
            updated_at,
            extra,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    /// Sets `updated_at` to the current time.
    pub fn touch(&mut self) {
        self.updated_at = now();
    }

    /// Free-form attributes not owned by the concrete variant.
    pub fn extra(&self) -> &Attributes {
        &self.extra
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.extra.get(name)
    }

    /// Stores one free-form attribute.
    ///
    /// # Errors
    /// - `name` is one of the base fields.
    /// - `value` is an array or object.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: Value) -> EntityResult<()> {
        let name = name.into();
        if RESERVED_FIELDS.contains(&name.as_str()) {
            return Err(EntityError::ReservedAttribute(name));
        }
        ensure_flat(&name, &value)?;
        self.extra.insert(name, value);
        Ok(())
    }

    /// Removes a string attribute from the extras so a variant can own it.
    ///
    /// Used by variant reconstruction constructors. Returns `None` when the
    /// attribute is absent.
    pub fn take_string(&mut self, name: &str) -> EntityResult<Option<String>> {
        match self.extra.remove(name) {
            None => Ok(None),
            Some(Value::String(value)) => Ok(Some(value)),
            Some(other) => {
                self.extra.insert(name.to_string(), other);
                Err(EntityError::InvalidFieldType {
                    field: name.to_string(),
                    expected: "string",
                })
            }
        }
    }

    fn identity_attributes(&self) -> Attributes {
        let mut attrs = Attributes::new();
        attrs.insert(FIELD_ID.to_string(), Value::String(self.id.clone()));
        attrs.insert(
            FIELD_CREATED_AT.to_string(),
            Value::String(format_timestamp(&self.created_at)),
        );
        attrs.insert(
            FIELD_UPDATED_AT.to_string(),
            Value::String(format_timestamp(&self.updated_at)),
        );
        attrs
    }
}

/// Capability every storable variant exposes to the storage engine.
pub trait Entity: Debug {
    /// Concrete kind, used in the composite key and serialized output.
    fn type_name(&self) -> &'static str;

    fn base(&self) -> &EntityBase;

    fn base_mut(&mut self) -> &mut EntityBase;

    /// Variant-owned attributes, excluding base fields and extras.
    fn attributes(&self) -> Attributes {
        Attributes::new()
    }

    fn clone_boxed(&self) -> Box<dyn Entity>;

    fn id(&self) -> &str {
        self.base().id()
    }

    fn created_at(&self) -> Timestamp {
        self.base().created_at()
    }

    fn updated_at(&self) -> Timestamp {
        self.base().updated_at()
    }

    fn touch(&mut self) {
        self.base_mut().touch();
    }

    /// Flat dictionary form. Stable between mutations.
    ///
    /// Base fields are written last; a variant cannot override identity.
    fn to_dict(&self) -> Attributes {
        let mut dict = self.base().extra().clone();
        dict.extend(self.attributes());
        dict.extend(self.base().identity_attributes());
        dict.insert(
            FIELD_TYPE_NAME.to_string(),
            Value::String(self.type_name().to_string()),
        );
        dict
    }

    /// Stores a free-form attribute, refusing names the variant already owns.
    fn set_attribute(&mut self, name: &str, value: Value) -> EntityResult<()> {
        if self.attributes().contains_key(name) {
            return Err(EntityError::ReservedAttribute(name.to_string()));
        }
        self.base_mut().set_attribute(name, value)
    }
}

/// Variant that can be rebuilt from a persisted dictionary.
pub trait EntityKind: Entity + Sized + 'static {
    const TYPE_NAME: &'static str;

    /// Reconstruction constructor.
    fn from_attributes(attrs: &Attributes) -> EntityResult<Self>;
}

impl PartialEq for dyn Entity + '_ {
    fn eq(&self, other: &Self) -> bool {
        self.to_dict() == other.to_dict()
    }
}

impl Clone for Box<dyn Entity> {
    fn clone(&self) -> Self {
        self.clone_boxed()
    }
}

impl Display for dyn Entity + '_ {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] ({}) {}",
            self.type_name(),
            self.id(),
            Value::Object(self.to_dict())
        )
    }
}

fn required_str<'a>(attrs: &'a Attributes, field: &'static str) -> EntityResult<&'a str> {
    match attrs.get(field) {
        None | Some(Value::Null) => Err(EntityError::MissingField(field)),
        Some(Value::String(value)) => Ok(value.as_str()),
        Some(_) => Err(EntityError::InvalidFieldType {
            field: field.to_string(),
            expected: "string",
        }),
    }
}

fn required_timestamp(attrs: &Attributes, field: &'static str) -> EntityResult<Timestamp> {
    let text = required_str(attrs, field)?;
    parse_timestamp(text).map_err(|_| EntityError::InvalidTimestamp {
        field,
        value: text.to_string(),
    })
}

fn ensure_flat(name: &str, value: &Value) -> EntityResult<()> {
    match value {
        Value::Array(_) | Value::Object(_) => Err(EntityError::NonFlatValue(name.to_string())),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::{format_timestamp, parse_timestamp, Attributes, Entity, EntityBase, EntityError};
    use serde_json::{json, Value};

    #[derive(Debug, Clone)]
    struct Shadowing {
        base: EntityBase,
    }

    impl Entity for Shadowing {
        fn type_name(&self) -> &'static str {
            "Shadowing"
        }

        fn base(&self) -> &EntityBase {
            &self.base
        }

        fn base_mut(&mut self) -> &mut EntityBase {
            &mut self.base
        }

        fn attributes(&self) -> Attributes {
            attrs(json!({ "id": "spoofed", "created_at": "bogus", "label": "kept" }))
        }

        fn clone_boxed(&self) -> Box<dyn Entity> {
            Box::new(self.clone())
        }
    }

    fn attrs(value: Value) -> Attributes {
        match value {
            Value::Object(map) => map,
            _ => panic!("test attributes must be a JSON object"),
        }
    }

    #[test]
    fn fresh_base_has_equal_timestamps_and_uuid_id() {
        let base = EntityBase::new();
        assert_eq!(base.created_at(), base.updated_at());
        assert!(uuid::Uuid::parse_str(base.id()).is_ok());
    }

    #[test]
    fn timestamp_format_keeps_six_fraction_digits() {
        let ts = parse_timestamp("2024-03-01T10:20:30.000100").expect("timestamp should parse");
        assert_eq!(format_timestamp(&ts), "2024-03-01T10:20:30.000100");
    }

    #[test]
    fn timestamp_parse_accepts_missing_fraction() {
        let ts = parse_timestamp("2024-03-01T10:20:30").expect("timestamp should parse");
        assert_eq!(format_timestamp(&ts), "2024-03-01T10:20:30.000000");
    }

    #[test]
    fn timestamp_parse_truncates_to_microseconds() {
        let ts = parse_timestamp("2024-03-01T10:20:30.123456789").expect("timestamp should parse");
        let reparsed = parse_timestamp(&format_timestamp(&ts)).expect("formatted value parses");
        assert_eq!(format_timestamp(&ts), "2024-03-01T10:20:30.123456");
        assert_eq!(ts, reparsed);
    }

    #[test]
    fn empty_attributes_build_fresh_base() {
        let base = EntityBase::from_attributes(&Attributes::new()).expect("empty map is fresh");
        assert!(!base.id().is_empty());
        assert!(base.extra().is_empty());
    }

    #[test]
    fn reconstruction_rejects_missing_updated_at() {
        let err = EntityBase::from_attributes(&attrs(json!({
            "id": "x",
            "created_at": "2024-03-01T10:20:30.000000"
        })))
        .expect_err("updated_at is required");
        assert_eq!(err, EntityError::MissingField("updated_at"));
    }

    #[test]
    fn reconstruction_rejects_bad_timestamp() {
        let err = EntityBase::from_attributes(&attrs(json!({
            "id": "x",
            "created_at": "yesterday",
            "updated_at": "2024-03-01T10:20:30.000000"
        })))
        .expect_err("bad timestamp must fail");
        assert!(matches!(
            err,
            EntityError::InvalidTimestamp {
                field: "created_at",
                ..
            }
        ));
    }

    #[test]
    fn reconstruction_rejects_nested_values() {
        let err = EntityBase::from_attributes(&attrs(json!({
            "id": "x",
            "created_at": "2024-03-01T10:20:30.000000",
            "updated_at": "2024-03-01T10:20:30.000000",
            "tags": ["a"]
        })))
        .expect_err("arrays are not flat");
        assert_eq!(err, EntityError::NonFlatValue("tags".to_string()));
    }

    #[test]
    fn set_attribute_rejects_reserved_names() {
        let mut base = EntityBase::new();
        let err = base
            .set_attribute("id", json!("other"))
            .expect_err("id is reserved");
        assert_eq!(err, EntityError::ReservedAttribute("id".to_string()));
    }

    #[test]
    fn take_string_keeps_mistyped_value() {
        let mut base = EntityBase::new();
        base.set_attribute("email", json!(7)).unwrap();
        assert!(base.take_string("email").is_err());
        assert_eq!(base.attribute("email"), Some(&json!(7)));
    }

    #[test]
    fn to_dict_keeps_identity_over_variant_attributes() {
        let entity = Shadowing {
            base: EntityBase::new(),
        };
        let dict = entity.to_dict();
        assert_eq!(dict["id"], entity.base.id());
        assert_eq!(dict["created_at"], format_timestamp(&entity.base.created_at()));
        assert_eq!(dict["label"], "kept");
        assert_eq!(dict["type_name"], "Shadowing");
    }

    #[test]
    fn touch_moves_only_updated_at() {
        let mut base = EntityBase::from_attributes(&attrs(json!({
            "id": "fixed",
            "created_at": "2000-01-01T00:00:00.000000",
            "updated_at": "2000-01-01T00:00:00.000000"
        })))
        .unwrap();
        let created_at = base.created_at();
        base.touch();
        assert_eq!(base.created_at(), created_at);
        assert!(base.updated_at() > created_at);
        assert_eq!(base.id(), "fixed");
    }
}
