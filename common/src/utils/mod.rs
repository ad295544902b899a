//! Utility functions and helpers.

pub mod extended_json;
pub mod pipeline_validator;
pub mod serializer;

// Re-export commonly used types
pub use pipeline_validator::PipelineValidator;
pub use serializer::Serializer;
