//! JSON serializer for remote values.
//!
//! Converts [`RemoteValue`] trees into JSON-safe values. The mappings here are
//! the wire format agents rely on, so changes must stay backward compatible.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use bson::Document;
use chrono::{DateTime, Utc};
use serde_json::{Map, Number, Value};

use crate::value::{RemoteValue, UuidEncoding, UUID_SUBTYPE};

/// Largest integer a JSON consumer can represent without loss (2^53 - 1).
pub const MAX_SAFE_INTEGER: i64 = 9_007_199_254_740_991;

/// Converts remote values into JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct Serializer {
    uuid: UuidEncoding,
}

impl Serializer {
    pub fn new(uuid: UuidEncoding) -> Self {
        Self { uuid }
    }

    pub fn uuid_encoding(&self) -> UuidEncoding {
        self.uuid
    }

    /// Serializes a value tree, recursing into objects and arrays.
    pub fn serialize(&self, value: RemoteValue) -> Value {
        match value {
            RemoteValue::Null => Value::Null,
            RemoteValue::ObjectId(oid) => Value::String(oid.to_hex()),
            RemoteValue::DateTime(ms) => Value::String(iso_date(ms)),
            RemoteValue::Binary { subtype, bytes } => self.binary(subtype, &bytes),
            RemoteValue::Long(v) => {
                if (-MAX_SAFE_INTEGER..=MAX_SAFE_INTEGER).contains(&v) {
                    Value::Number(v.into())
                } else {
                    Value::String(v.to_string())
                }
            }
            RemoteValue::Decimal(d) => Value::String(d.to_string()),
            RemoteValue::Regex { pattern, options } => {
                Value::String(format!("/{}/{}", pattern, options))
            }
            RemoteValue::String(s) => Value::String(s),
            RemoteValue::Int(v) => Value::Number(v.into()),
            // NaN and infinities have no JSON form.
            RemoteValue::Double(v) => Number::from_f64(v).map_or(Value::Null, Value::Number),
            RemoteValue::Boolean(v) => Value::Bool(v),
            RemoteValue::Object(fields) => {
                let mut map = Map::with_capacity(fields.len());
                for (key, value) in fields {
                    map.insert(key, self.serialize(value));
                }
                Value::Object(map)
            }
            RemoteValue::Array(items) => {
                Value::Array(items.into_iter().map(|item| self.serialize(item)).collect())
            }
            RemoteValue::Other { display, .. } => Value::String(display),
        }
    }

    pub fn serialize_document(&self, doc: Document) -> Value {
        self.serialize(RemoteValue::from(doc))
    }

    pub fn serialize_documents(&self, docs: Vec<Document>) -> Vec<Value> {
        docs.into_iter()
            .map(|doc| self.serialize_document(doc))
            .collect()
    }

    fn binary(&self, subtype: u8, bytes: &[u8]) -> Value {
        if subtype == UUID_SUBTYPE && self.uuid == UuidEncoding::Hyphenated {
            if let Ok(uuid) = uuid::Uuid::from_slice(bytes) {
                return Value::String(uuid.hyphenated().to_string());
            }
        }
        Value::String(STANDARD.encode(bytes))
    }
}

/// ISO-8601 with millisecond precision and a `Z` suffix.
fn iso_date(ms: i64) -> String {
    match DateTime::<Utc>::from_timestamp_millis(ms) {
        Some(dt) => dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
        None => bson::DateTime::from_millis(ms).to_string(),
    }
}
