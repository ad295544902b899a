//! Remote value model.
//!
//! Raw driver values are converted into [`RemoteValue`] once, where they are
//! received. The serializer and the schema walker then match on this closed
//! set of variants instead of probing driver types.

use std::cmp::Ordering;
use std::fmt;

use bson::{oid::ObjectId, Bson, Decimal128, Document};
use serde::{Serialize, Serializer};

/// BSON binary subtype used for UUIDs.
pub const UUID_SUBTYPE: u8 = 0x04;

/// How binary UUID values are rendered.
///
/// The default keeps the historic behavior: a UUID is a binary blob and
/// serializes as base64 with the `binary` type tag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UuidEncoding {
    #[default]
    Base64,
    Hyphenated,
}

/// A value as received from the document store.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteValue {
    Null,
    ObjectId(ObjectId),
    /// Milliseconds since the Unix epoch.
    DateTime(i64),
    Binary { subtype: u8, bytes: Vec<u8> },
    Long(i64),
    Decimal(Decimal128),
    Regex { pattern: String, options: String },
    String(String),
    Int(i32),
    Double(f64),
    Boolean(bool),
    Object(Vec<(String, RemoteValue)>),
    Array(Vec<RemoteValue>),
    /// Any other BSON kind, kept as its type name and display form.
    Other { type_name: &'static str, display: String },
}

impl From<Bson> for RemoteValue {
    fn from(value: Bson) -> Self {
        match value {
            Bson::Null | Bson::Undefined => RemoteValue::Null,
            Bson::ObjectId(oid) => RemoteValue::ObjectId(oid),
            Bson::DateTime(dt) => RemoteValue::DateTime(dt.timestamp_millis()),
            Bson::Binary(binary) => RemoteValue::Binary {
                subtype: u8::from(binary.subtype),
                bytes: binary.bytes,
            },
            Bson::Int64(v) => RemoteValue::Long(v),
            Bson::Decimal128(d) => RemoteValue::Decimal(d),
            Bson::RegularExpression(regex) => RemoteValue::Regex {
                pattern: regex.pattern,
                options: regex.options,
            },
            Bson::String(s) => RemoteValue::String(s),
            Bson::Int32(v) => RemoteValue::Int(v),
            Bson::Double(v) => RemoteValue::Double(v),
            Bson::Boolean(v) => RemoteValue::Boolean(v),
            Bson::Document(doc) => RemoteValue::from(doc),
            Bson::Array(items) => {
                RemoteValue::Array(items.into_iter().map(RemoteValue::from).collect())
            }
            other => RemoteValue::Other {
                type_name: other_type_name(&other),
                display: other.to_string(),
            },
        }
    }
}

impl From<Document> for RemoteValue {
    fn from(doc: Document) -> Self {
        RemoteValue::Object(
            doc.into_iter()
                .map(|(key, value)| (key, RemoteValue::from(value)))
                .collect(),
        )
    }
}

fn other_type_name(value: &Bson) -> &'static str {
    match value {
        Bson::Timestamp(_) => "timestamp",
        Bson::JavaScriptCode(_) => "javascript",
        Bson::JavaScriptCodeWithScope(_) => "javascriptWithScope",
        Bson::Symbol(_) => "symbol",
        Bson::DbPointer(_) => "dbPointer",
        Bson::MaxKey => "maxKey",
        Bson::MinKey => "minKey",
        _ => "unknown",
    }
}

impl RemoteValue {
    /// Type tag reported by schema inference.
    pub fn type_tag(&self, uuid: UuidEncoding) -> TypeTag {
        match self {
            RemoteValue::Null => TypeTag::Null,
            RemoteValue::ObjectId(_) => TypeTag::ObjectId,
            RemoteValue::DateTime(_) => TypeTag::Date,
            RemoteValue::Binary { subtype, .. }
                if *subtype == UUID_SUBTYPE && uuid == UuidEncoding::Hyphenated =>
            {
                TypeTag::Uuid
            }
            RemoteValue::Binary { .. } => TypeTag::Binary,
            RemoteValue::Long(_) => TypeTag::Long,
            RemoteValue::Decimal(_) => TypeTag::Decimal,
            RemoteValue::Regex { .. } => TypeTag::Regex,
            RemoteValue::Array(_) => TypeTag::Array,
            RemoteValue::String(_) => TypeTag::String,
            RemoteValue::Int(_) => TypeTag::Int,
            RemoteValue::Double(v) if v.is_finite() && v.fract() == 0.0 => TypeTag::Int,
            RemoteValue::Double(_) => TypeTag::Double,
            RemoteValue::Boolean(_) => TypeTag::Boolean,
            RemoteValue::Object(_) => TypeTag::Object,
            RemoteValue::Other { type_name, .. } => TypeTag::Other(type_name),
        }
    }
}

/// Type vocabulary of inferred schemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    Null,
    ObjectId,
    Date,
    Binary,
    Long,
    Decimal,
    Uuid,
    Regex,
    Array,
    String,
    Int,
    Double,
    Boolean,
    Object,
    Other(&'static str),
}

impl TypeTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeTag::Null => "null",
            TypeTag::ObjectId => "ObjectId",
            TypeTag::Date => "date",
            TypeTag::Binary => "binary",
            TypeTag::Long => "long",
            TypeTag::Decimal => "decimal",
            TypeTag::Uuid => "uuid",
            TypeTag::Regex => "regex",
            TypeTag::Array => "array",
            TypeTag::String => "string",
            TypeTag::Int => "int",
            TypeTag::Double => "double",
            TypeTag::Boolean => "boolean",
            TypeTag::Object => "object",
            TypeTag::Other(name) => name,
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Ordered by name so tag sets print in lexicographic order.
impl Ord for TypeTag {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_str().cmp(other.as_str())
    }
}

impl PartialOrd for TypeTag {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Serialize for TypeTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}
