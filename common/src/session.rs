//! Remote session abstraction.
//!
//! [`DocumentSession`] is the seam between command logic and the database
//! driver. The `connection` crate implements it on top of `mongodb`; tests
//! use in-memory fakes.

use std::time::Duration;

use async_trait::async_trait;
use bson::{Bson, Document};

use crate::errors::AppResult;
use crate::models::{CollectionSummary, DatabaseList, FindSpec, IndexSummary};

/// Read-only operations against one open session.
///
/// Every call takes the time bound it must respect.
#[async_trait]
pub trait DocumentSession: Send + Sync {
    /// Runs `{ping: 1}` against `database`.
    async fn ping(&self, database: &str, timeout: Duration) -> AppResult<Document>;

    async fn list_databases(&self, timeout: Duration) -> AppResult<DatabaseList>;

    /// Raw `dbStats` command output.
    async fn database_stats(&self, database: &str, timeout: Duration) -> AppResult<Document>;

    async fn list_collections(
        &self,
        database: &str,
        timeout: Duration,
    ) -> AppResult<Vec<CollectionSummary>>;

    /// Raw `collStats` command output.
    async fn collection_stats(
        &self,
        database: &str,
        collection: &str,
        timeout: Duration,
    ) -> AppResult<Document>;

    async fn list_indexes(
        &self,
        database: &str,
        collection: &str,
        timeout: Duration,
    ) -> AppResult<Vec<IndexSummary>>;

    async fn find(
        &self,
        database: &str,
        collection: &str,
        spec: FindSpec,
        timeout: Duration,
    ) -> AppResult<Vec<Document>>;

    async fn count_documents(
        &self,
        database: &str,
        collection: &str,
        filter: Document,
        timeout: Duration,
    ) -> AppResult<u64>;

    /// Metadata-based count; cheap but approximate.
    async fn estimated_document_count(
        &self,
        database: &str,
        collection: &str,
        timeout: Duration,
    ) -> AppResult<u64>;

    async fn distinct(
        &self,
        database: &str,
        collection: &str,
        field: &str,
        filter: Document,
        timeout: Duration,
    ) -> AppResult<Vec<Bson>>;

    async fn aggregate(
        &self,
        database: &str,
        collection: &str,
        pipeline: Vec<Document>,
        timeout: Duration,
    ) -> AppResult<Vec<Document>>;

    /// Releases the underlying client.
    async fn close(&self) -> AppResult<()>;
}
