//! Aggregation pipeline validator.
//!
//! Provides read-only validation for aggregation pipelines.

use serde_json::Value;

use crate::errors::AppError;

/// Validates aggregation pipelines before they reach the server.
pub struct PipelineValidator;

/// Pipeline operators that write to a collection.
const FORBIDDEN_STAGES: [&str; 2] = ["$out", "$merge"];

impl PipelineValidator {
    /// Validates a pipeline for state-mutating stages.
    ///
    /// Every key of every stage object is inspected, in pipeline order.
    /// Entries that are not objects are skipped.
    ///
    /// # Errors
    /// Returns `AppError::UnsafePipeline` naming the first forbidden operator.
    pub fn validate(pipeline: &[Value]) -> Result<(), AppError> {
        for stage in pipeline {
            let Some(stage) = stage.as_object() else {
                continue;
            };
            if let Some(operator) = stage.keys().find(|key| FORBIDDEN_STAGES.contains(&key.as_str())) {
                return Err(AppError::UnsafePipeline {
                    operator: operator.clone(),
                });
            }
        }
        Ok(())
    }

    /// Checks if any stage already carries a `$limit`.
    pub fn has_limit_stage(pipeline: &[Value]) -> bool {
        pipeline
            .iter()
            .filter_map(Value::as_object)
            .any(|stage| stage.contains_key("$limit"))
    }
}
