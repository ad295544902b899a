//! Parsing of JSON command arguments.
//!
//! Filters, sorts, projections and pipelines are accepted as MongoDB Extended
//! JSON, so `{"_id": {"$oid": "..."}}` reaches the server as an ObjectId.

use bson::{Bson, Document};
use serde_json::Value;

use crate::errors::{AppError, AppResult};

const PIPELINE_SHAPE: &str = "Pipeline must be a JSON array of stage objects.";

/// Parses `raw` as JSON, naming the offending `--argument` on failure.
pub fn parse_json(argument: &str, raw: &str) -> AppResult<Value> {
    serde_json::from_str(raw).map_err(|_| AppError::InvalidJson {
        argument: argument.to_string(),
        input: raw.to_string(),
    })
}

/// Parses an Extended JSON object argument into a BSON document.
pub fn parse_document(argument: &str, raw: &str) -> AppResult<Document> {
    let value = parse_json(argument, raw)?;
    to_document(value).ok_or_else(|| AppError::InvalidJson {
        argument: argument.to_string(),
        input: raw.to_string(),
    })
}

/// Converts a JSON object into a BSON document. Non-objects yield `None`.
pub fn to_document(value: Value) -> Option<Document> {
    match Bson::try_from(value) {
        Ok(Bson::Document(doc)) => Some(doc),
        _ => None,
    }
}

/// Parses a pipeline argument into its raw stages.
pub fn parse_pipeline(raw: &str) -> AppResult<Vec<Value>> {
    let parsed: Value = serde_json::from_str(raw).map_err(|_| {
        let preview: String = raw.chars().take(100).collect();
        let ellipsis = if raw.chars().count() > 100 { "..." } else { "" };
        AppError::Validation(format!("Invalid JSON pipeline: {}{}", preview, ellipsis))
    })?;
    match parsed {
        Value::Array(stages) => Ok(stages),
        _ => Err(AppError::Validation(PIPELINE_SHAPE.to_string())),
    }
}

/// Converts validated stages into BSON documents.
pub fn pipeline_documents(stages: Vec<Value>) -> AppResult<Vec<Document>> {
    stages
        .into_iter()
        .map(|stage| to_document(stage).ok_or_else(|| AppError::Validation(PIPELINE_SHAPE.to_string())))
        .collect()
}
