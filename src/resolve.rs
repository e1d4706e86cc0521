//! Resolution of typed properties into plain values.
//!
//! Envelopes are stripped, lists and mappings are rebuilt element by
//! element, scalars pass through. Resolution is total and never touches its
//! input.

use serde_json::{Map, Value as JsonValue};

use crate::models::NamedProperties;
use crate::property::TypedProperty;

/// Replacement text for secret values in redacted output.
pub const REDACTED: &str = "[secret]";

/// Resolve one typed property into a plain value.
///
/// Every envelope layer is replaced by its resolved payload; its metadata
/// is dropped.
pub fn resolve_property(property: &TypedProperty) -> JsonValue {
    walk(property, false)
}

/// Resolve the top-level properties of an opened environment.
///
/// The output has exactly the input's keys, each mapped to its resolved
/// payload. `None` stays `None`.
pub fn resolve_named_properties(properties: Option<&NamedProperties>) -> Option<Map<String, JsonValue>> {
    properties.map(|props| {
        props
            .iter()
            .map(|(name, record)| (name.clone(), resolve_property(&record.value)))
            .collect()
    })
}

/// Resolve raw JSON as received from the service.
pub fn resolve_json(raw: &JsonValue) -> JsonValue {
    resolve_property(&TypedProperty::from(raw.clone()))
}

/// Like [`resolve_property`], but secret envelopes become [`REDACTED`].
pub fn redact_secrets(property: &TypedProperty) -> JsonValue {
    walk(property, true)
}

/// Like [`resolve_named_properties`], but secrets become [`REDACTED`].
///
/// A record flagged secret at the top level is redacted as a whole.
pub fn redact_named_properties(properties: Option<&NamedProperties>) -> Option<Map<String, JsonValue>> {
    properties.map(|props| {
        props
            .iter()
            .map(|(name, record)| {
                let value = if record.is_secret() {
                    JsonValue::String(REDACTED.to_string())
                } else {
                    redact_secrets(&record.value)
                };
                (name.clone(), value)
            })
            .collect()
    })
}

fn walk(property: &TypedProperty, redact: bool) -> JsonValue {
    match property {
        TypedProperty::Envelope(envelope) => {
            if redact && envelope.is_secret() {
                JsonValue::String(REDACTED.to_string())
            } else {
                walk(&envelope.value, redact)
            }
        }

        TypedProperty::Sequence(items) => JsonValue::Array(items.iter().map(|item| walk(item, redact)).collect()),

        TypedProperty::Mapping(entries) => JsonValue::Object(
            entries
                .iter()
                .map(|(key, value)| (key.clone(), walk(value, redact)))
                .collect(),
        ),

        TypedProperty::Null => JsonValue::Null,
        TypedProperty::Bool(b) => JsonValue::Bool(*b),
        TypedProperty::Number(n) => JsonValue::Number(n.clone()),
        TypedProperty::String(s) => JsonValue::String(s.clone()),
    }
}
