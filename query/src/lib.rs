//! Read-only query execution for agent-mongo.
//!
//! Every operation takes an already resolved [`DocumentSession`] so the
//! services stay independent of how sessions are opened and cached.
//!
//! [`DocumentSession`]: common::session::DocumentSession

pub mod discovery;
pub mod schema;
pub mod service;

pub use discovery::{CollectionPage, CollectionStats, DatabaseStats, DiscoveryService, IndexInfo, IndexList};
pub use schema::{SchemaInferencer, SchemaResult, DEFAULT_SCHEMA_SAMPLE_SIZE};
pub use service::{AggregateResult, CountResult, DistinctResult, FindArgs, FindPage, QueryService, SampleResult};
