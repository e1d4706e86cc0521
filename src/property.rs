//! Typed property values as returned by an opened environment.
//!
//! The service wraps every value it resolves in an envelope: a JSON object
//! whose `value` key holds the payload and whose other keys (`secret`,
//! `unknown`, `trace`) describe it. Envelopes nest inside lists and
//! mappings, and may wrap other envelopes.
//!
//! [`TypedProperty`] decides once, when the JSON is read, whether an object
//! is an envelope or a plain mapping. Everything downstream matches on the
//! variant instead of inspecting keys again.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value as JsonValue};

/// Key whose presence marks a JSON object as an envelope.
pub const VALUE_KEY: &str = "value";

/// Metadata key flagging an envelope's payload as secret.
pub const SECRET_KEY: &str = "secret";

/// Metadata key flagging an envelope's payload as unknown.
pub const UNKNOWN_KEY: &str = "unknown";

/// One node of a typed property tree.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "JsonValue", into = "JsonValue")]
pub enum TypedProperty {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Sequence(Vec<TypedProperty>),
    Mapping(BTreeMap<String, TypedProperty>),
    Envelope(Envelope),
}

/// A wrapper layer: the payload plus the metadata keys that sat next to it.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub value: Box<TypedProperty>,
    pub metadata: Map<String, JsonValue>,
}

impl Envelope {
    /// Wrap a payload without metadata.
    pub fn new(value: TypedProperty) -> Self {
        Self {
            value: Box::new(value),
            metadata: Map::new(),
        }
    }

    /// Wrap a payload and flag it as secret.
    pub fn secret(value: TypedProperty) -> Self {
        let mut envelope = Self::new(value);
        envelope.metadata.insert(SECRET_KEY.to_string(), JsonValue::Bool(true));
        envelope
    }

    pub fn is_secret(&self) -> bool {
        self.flag(SECRET_KEY)
    }

    pub fn is_unknown(&self) -> bool {
        self.flag(UNKNOWN_KEY)
    }

    fn flag(&self, key: &str) -> bool {
        self.metadata.get(key).and_then(JsonValue::as_bool).unwrap_or(false)
    }
}

impl TypedProperty {
    pub fn is_null(&self) -> bool {
        matches!(self, TypedProperty::Null)
    }

    pub fn is_envelope(&self) -> bool {
        matches!(self, TypedProperty::Envelope(_))
    }

    /// True for null, booleans, numbers and strings.
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            TypedProperty::Null | TypedProperty::Bool(_) | TypedProperty::Number(_) | TypedProperty::String(_)
        )
    }

    pub fn as_envelope(&self) -> Option<&Envelope> {
        match self {
            TypedProperty::Envelope(envelope) => Some(envelope),
            _ => None,
        }
    }

    /// Strip every envelope layer at the top of this node.
    ///
    /// Returns the first non-envelope payload and whether any stripped layer
    /// was flagged secret.
    pub fn unwrap_envelopes(&self) -> (&TypedProperty, bool) {
        let mut current = self;
        let mut secret = false;
        while let TypedProperty::Envelope(envelope) = current {
            secret |= envelope.is_secret();
            current = &envelope.value;
        }
        (current, secret)
    }
}

impl From<JsonValue> for TypedProperty {
    fn from(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => TypedProperty::Null,
            JsonValue::Bool(b) => TypedProperty::Bool(b),
            JsonValue::Number(n) => TypedProperty::Number(n),
            JsonValue::String(s) => TypedProperty::String(s),
            JsonValue::Array(items) => TypedProperty::Sequence(items.into_iter().map(TypedProperty::from).collect()),
            JsonValue::Object(mut map) => match map.remove(VALUE_KEY) {
                Some(payload) => TypedProperty::Envelope(Envelope {
                    value: Box::new(TypedProperty::from(payload)),
                    metadata: map,
                }),
                None => TypedProperty::Mapping(map.into_iter().map(|(k, v)| (k, TypedProperty::from(v))).collect()),
            },
        }
    }
}

impl From<TypedProperty> for JsonValue {
    fn from(property: TypedProperty) -> Self {
        match property {
            TypedProperty::Null => JsonValue::Null,
            TypedProperty::Bool(b) => JsonValue::Bool(b),
            TypedProperty::Number(n) => JsonValue::Number(n),
            TypedProperty::String(s) => JsonValue::String(s),
            TypedProperty::Sequence(items) => JsonValue::Array(items.into_iter().map(JsonValue::from).collect()),
            TypedProperty::Mapping(entries) => {
                JsonValue::Object(entries.into_iter().map(|(k, v)| (k, JsonValue::from(v))).collect())
            }
            TypedProperty::Envelope(envelope) => {
                let mut map = envelope.metadata;
                map.insert(VALUE_KEY.to_string(), JsonValue::from(*envelope.value));
                JsonValue::Object(map)
            }
        }
    }
}

impl From<&str> for TypedProperty {
    fn from(value: &str) -> Self {
        TypedProperty::String(value.to_string())
    }
}

impl From<String> for TypedProperty {
    fn from(value: String) -> Self {
        TypedProperty::String(value)
    }
}

impl From<bool> for TypedProperty {
    fn from(value: bool) -> Self {
        TypedProperty::Bool(value)
    }
}

impl From<i64> for TypedProperty {
    fn from(value: i64) -> Self {
        TypedProperty::Number(value.into())
    }
}

impl From<Envelope> for TypedProperty {
    fn from(value: Envelope) -> Self {
        TypedProperty::Envelope(value)
    }
}
