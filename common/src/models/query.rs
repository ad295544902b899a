//! Query request models and derived schema records.

use bson::{oid::ObjectId, Bson, Document};
use serde::Serialize;

use crate::errors::{AppError, AppResult};
use crate::value::TypeTag;

/// Arguments of a `find` call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindSpec {
    pub filter: Document,
    pub sort: Option<Document>,
    pub projection: Option<Document>,
    pub skip: u64,
    /// Maximum number of documents to fetch (callers probe one extra).
    pub limit: i64,
}

/// How a raw `_id` argument should be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdType {
    ObjectId,
    String,
    Number,
}

impl IdType {
    pub const VALID: &'static str = "objectid, string, number";

    pub fn parse(raw: &str) -> AppResult<Self> {
        match raw {
            "objectid" => Ok(IdType::ObjectId),
            "string" => Ok(IdType::String),
            "number" => Ok(IdType::Number),
            other => Err(AppError::Validation(format!(
                "Invalid --type: \"{}\". Valid: {}",
                other,
                Self::VALID
            ))),
        }
    }

    /// Converts a raw id into the BSON value used in the `_id` filter.
    ///
    /// Without an explicit type, 24 hex characters are treated as an ObjectId
    /// and anything else as a string.
    pub fn to_bson(kind: Option<IdType>, raw: &str) -> AppResult<Bson> {
        let looks_like_oid = raw.len() == 24 && raw.chars().all(|c| c.is_ascii_hexdigit());
        match kind {
            Some(IdType::ObjectId) => ObjectId::parse_str(raw)
                .map(Bson::ObjectId)
                .map_err(|_| AppError::Validation(format!("Invalid ObjectId: \"{}\"", raw))),
            None if looks_like_oid => ObjectId::parse_str(raw)
                .map(Bson::ObjectId)
                .map_err(|_| AppError::Validation(format!("Invalid ObjectId: \"{}\"", raw))),
            Some(IdType::Number) => parse_number_id(raw),
            Some(IdType::String) | None => Ok(Bson::String(raw.to_string())),
        }
    }
}

fn parse_number_id(raw: &str) -> AppResult<Bson> {
    if let Ok(int) = raw.parse::<i64>() {
        return Ok(match i32::try_from(int) {
            Ok(small) => Bson::Int32(small),
            Err(_) => Bson::Int64(int),
        });
    }
    match raw.parse::<f64>() {
        Ok(float) if float.is_finite() => Ok(Bson::Double(float)),
        _ => Err(AppError::Validation(format!("Invalid number ID: \"{}\"", raw))),
    }
}

/// Inferred schema record for one dotted path.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FieldInfo {
    pub path: String,
    pub types: Vec<TypeTag>,
    pub presence: f64,
}
