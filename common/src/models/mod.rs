//! Shared data models for all crates.

pub mod connection;
pub mod credential;
pub mod database;
pub mod query;

// Re-export commonly used types
pub use connection::{Connection, ConnectionItem, ConnectionUpdate, NewConnection};
pub use credential::{Credential, CredentialItem, CredentialStorage, NewCredential, StoredCredential};
pub use database::{CollectionSummary, DatabaseList, DatabaseSummary, IndexSummary};
pub use query::{FieldInfo, FindSpec, IdType};
