//! MongoDB-backed session.
//!
//! Wraps a `mongodb::Client` behind [`DocumentSession`]. Every operation sends
//! `maxTimeMS` where the server supports it and is also bounded client-side,
//! so a stalled server selection cannot outlive the configured timeout.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bson::{doc, Bson, Document};
use futures::TryStreamExt;
use mongodb::error::{Error as DriverError, ErrorKind as DriverErrorKind};
use mongodb::options::ClientOptions;
use mongodb::results::CollectionType;
use mongodb::Client;

use common::errors::{AppError, AppResult};
use common::models::{CollectionSummary, DatabaseList, FindSpec, IndexSummary};
use common::session::DocumentSession;

use crate::session_manager::{SessionOpener, SessionTarget};

/// Server error code for `MaxTimeMSExpired`.
const MAX_TIME_EXPIRED: i32 = 50;
const APP_NAME: &str = "agent-mongo";

/// Opens [`MongoSession`]s.
#[derive(Debug, Default)]
pub struct MongoOpener;

#[async_trait]
impl SessionOpener for MongoOpener {
    async fn open(&self, target: &SessionTarget) -> AppResult<Arc<dyn DocumentSession>> {
        let mut options = ClientOptions::parse(&target.connection_string)
            .await
            .map_err(|e| AppError::DatabaseConnection(format!("Invalid connection string: {}", e)))?;

        if options.app_name.is_none() {
            options.app_name = Some(APP_NAME.to_string());
        }
        if options.server_selection_timeout.is_none() {
            options.server_selection_timeout = Some(target.timeout);
        }
        if let Some(credential) = &target.credential {
            let mut auth = options.credential.take().unwrap_or_default();
            auth.username = Some(credential.username.clone());
            auth.password = Some(credential.password.clone());
            options.credential = Some(auth);
        }

        let client = Client::with_options(options)
            .map_err(|e| AppError::DatabaseConnection(e.to_string()))?;
        tracing::debug!(alias = %target.alias, "MongoDB client created");
        Ok(Arc::new(MongoSession { client }))
    }
}

/// Live MongoDB session.
pub struct MongoSession {
    client: Client,
}

impl MongoSession {
    fn collection(&self, database: &str, collection: &str) -> mongodb::Collection<Document> {
        self.client.database(database).collection::<Document>(collection)
    }

    async fn command(&self, database: &str, command: Document, timeout: Duration) -> AppResult<Document> {
        let db = self.client.database(database);
        bounded(timeout, async move { db.run_command(command).await }).await
    }
}

#[async_trait]
impl DocumentSession for MongoSession {
    async fn ping(&self, database: &str, timeout: Duration) -> AppResult<Document> {
        self.command(database, doc! { "ping": 1 }, timeout).await
    }

    async fn list_databases(&self, timeout: Duration) -> AppResult<DatabaseList> {
        let reply = self
            .command("admin", doc! { "listDatabases": 1, "maxTimeMS": millis(timeout) }, timeout)
            .await?;
        Ok(DatabaseList::from_command(&reply))
    }

    async fn database_stats(&self, database: &str, timeout: Duration) -> AppResult<Document> {
        self.command(database, doc! { "dbStats": 1, "maxTimeMS": millis(timeout) }, timeout)
            .await
    }

    async fn list_collections(
        &self,
        database: &str,
        timeout: Duration,
    ) -> AppResult<Vec<CollectionSummary>> {
        let db = self.client.database(database);
        let specs: Vec<_> = bounded(timeout, async move {
            db.list_collections().await?.try_collect().await
        })
        .await?;

        Ok(specs
            .into_iter()
            .map(|spec| CollectionSummary {
                name: spec.name,
                collection_type: match spec.collection_type {
                    CollectionType::View => "view",
                    CollectionType::Timeseries => "timeseries",
                    _ => "collection",
                }
                .to_string(),
            })
            .collect())
    }

    async fn collection_stats(
        &self,
        database: &str,
        collection: &str,
        timeout: Duration,
    ) -> AppResult<Document> {
        self.command(
            database,
            doc! { "collStats": collection, "maxTimeMS": millis(timeout) },
            timeout,
        )
        .await
    }

    async fn list_indexes(
        &self,
        database: &str,
        collection: &str,
        timeout: Duration,
    ) -> AppResult<Vec<IndexSummary>> {
        let coll = self.collection(database, collection);
        let models: Vec<_> = bounded(timeout, async move {
            coll.list_indexes().await?.try_collect().await
        })
        .await?;

        Ok(models
            .into_iter()
            .map(|model| {
                let options = model.options.unwrap_or_default();
                IndexSummary {
                    name: options.name,
                    key: model.keys,
                    unique: options.unique.unwrap_or(false),
                    sparse: options.sparse.unwrap_or(false),
                    expire_after_seconds: options.expire_after.map(|d| d.as_secs()),
                    partial_filter_expression: options.partial_filter_expression,
                }
            })
            .collect())
    }

    async fn find(
        &self,
        database: &str,
        collection: &str,
        spec: FindSpec,
        timeout: Duration,
    ) -> AppResult<Vec<Document>> {
        let coll = self.collection(database, collection);
        bounded(timeout, async move {
            let mut action = coll
                .find(spec.filter)
                .skip(spec.skip)
                .limit(spec.limit)
                .max_time(timeout);
            if let Some(sort) = spec.sort {
                action = action.sort(sort);
            }
            if let Some(projection) = spec.projection {
                action = action.projection(projection);
            }
            action.await?.try_collect().await
        })
        .await
    }

    async fn count_documents(
        &self,
        database: &str,
        collection: &str,
        filter: Document,
        timeout: Duration,
    ) -> AppResult<u64> {
        let coll = self.collection(database, collection);
        bounded(timeout, async move {
            coll.count_documents(filter).max_time(timeout).await
        })
        .await
    }

    async fn estimated_document_count(
        &self,
        database: &str,
        collection: &str,
        timeout: Duration,
    ) -> AppResult<u64> {
        let coll = self.collection(database, collection);
        bounded(timeout, async move {
            coll.estimated_document_count().max_time(timeout).await
        })
        .await
    }

    async fn distinct(
        &self,
        database: &str,
        collection: &str,
        field: &str,
        filter: Document,
        timeout: Duration,
    ) -> AppResult<Vec<Bson>> {
        let coll = self.collection(database, collection);
        let field = field.to_string();
        bounded(timeout, async move {
            coll.distinct(field, filter).max_time(timeout).await
        })
        .await
    }

    async fn aggregate(
        &self,
        database: &str,
        collection: &str,
        pipeline: Vec<Document>,
        timeout: Duration,
    ) -> AppResult<Vec<Document>> {
        let coll = self.collection(database, collection);
        bounded(timeout, async move {
            coll.aggregate(pipeline).max_time(timeout).await?.try_collect().await
        })
        .await
    }

    async fn close(&self) -> AppResult<()> {
        self.client.clone().shutdown().await;
        Ok(())
    }
}

fn millis(timeout: Duration) -> i64 {
    i64::try_from(timeout.as_millis()).unwrap_or(i64::MAX)
}

/// Runs a driver future under a client-side deadline and maps its errors.
async fn bounded<T, F>(timeout: Duration, fut: F) -> AppResult<T>
where
    F: Future<Output = Result<T, DriverError>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result.map_err(|e| driver_error(e, timeout)),
        Err(_) => Err(AppError::Timeout {
            message: "Operation exceeded time limit".to_string(),
            timeout_ms: timeout.as_millis() as u64,
            context: None,
        }),
    }
}

/// Maps a driver error. `MaxTimeMSExpired` becomes a timeout; everything else
/// passes its message through.
fn driver_error(err: DriverError, timeout: Duration) -> AppError {
    if let DriverErrorKind::Command(ref command) = *err.kind {
        if command.code == MAX_TIME_EXPIRED {
            return AppError::Timeout {
                message: command.message.clone(),
                timeout_ms: timeout.as_millis() as u64,
                context: None,
            };
        }
    }
    AppError::DatabaseQuery(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_millis_saturates() {
        assert_eq!(millis(Duration::from_millis(5000)), 5000);
        assert_eq!(millis(Duration::MAX), i64::MAX);
    }

    #[tokio::test]
    async fn test_bounded_reports_client_side_timeout() {
        let err = bounded::<(), _>(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Timeout { timeout_ms: 10, .. }));
    }

    #[tokio::test]
    async fn test_open_rejects_malformed_uri() {
        let target = SessionTarget {
            alias: "bad".into(),
            connection_string: "mongodb://".into(),
            credential: None,
            timeout: Duration::from_secs(1),
        };
        assert!(MongoOpener.open(&target).await.is_err());
    }
}
