use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bson::{doc, Bson, Document};
use serde_json::json;
use tempfile::TempDir;

use common::errors::{AppError, AppResult};
use common::models::{CollectionSummary, DatabaseList, FindSpec, IndexSummary};
use common::secret::DisabledSecretBackend;
use common::session::DocumentSession;
use common::utils::extended_json::parse_pipeline;
use common::utils::Serializer;
use common::{RuntimeConfig, SettingsStore};
use query::{DiscoveryService, FindArgs, QueryService, SchemaInferencer};

/// In-memory session over one collection that records what it was asked.
#[derive(Default)]
struct RecordingSession {
    docs: Vec<Document>,
    collections: Vec<CollectionSummary>,
    stats: Document,
    timeouts: Mutex<Vec<(&'static str, Duration)>>,
    finds: Mutex<Vec<FindSpec>>,
    pipelines: Mutex<Vec<Vec<Document>>>,
}

impl RecordingSession {
    fn with_docs(count: usize) -> Self {
        Self {
            docs: (0..count as i32).map(|i| doc! { "_id": i, "n": i }).collect(),
            collections: vec![CollectionSummary::collection("users")],
            ..Default::default()
        }
    }

    fn record(&self, op: &'static str, timeout: Duration) {
        self.timeouts.lock().unwrap().push((op, timeout));
    }

    fn ops(&self) -> Vec<&'static str> {
        self.timeouts.lock().unwrap().iter().map(|(op, _)| *op).collect()
    }
}

fn stage_size(pipeline: &[Document], stage: &str) -> Option<usize> {
    pipeline.iter().find_map(|s| match s.get(stage)? {
        Bson::Int64(n) => Some(*n as usize),
        Bson::Int32(n) => Some(*n as usize),
        Bson::Document(inner) => inner.get_i64("size").ok().map(|n| n as usize),
        _ => None,
    })
}

#[async_trait]
impl DocumentSession for RecordingSession {
    async fn ping(&self, _database: &str, timeout: Duration) -> AppResult<Document> {
        self.record("ping", timeout);
        Ok(doc! { "ok": 1 })
    }
    async fn list_databases(&self, timeout: Duration) -> AppResult<DatabaseList> {
        self.record("listDatabases", timeout);
        Ok(DatabaseList::from_command(&doc! {
            "databases": [{ "name": "shop", "sizeOnDisk": 8192.0, "empty": false }],
            "totalSize": 8192.0,
        }))
    }
    async fn database_stats(&self, _database: &str, timeout: Duration) -> AppResult<Document> {
        self.record("dbStats", timeout);
        Ok(self.stats.clone())
    }
    async fn list_collections(&self, _database: &str, timeout: Duration) -> AppResult<Vec<CollectionSummary>> {
        self.record("listCollections", timeout);
        Ok(self.collections.clone())
    }
    async fn collection_stats(&self, _d: &str, _c: &str, timeout: Duration) -> AppResult<Document> {
        self.record("collStats", timeout);
        Ok(self.stats.clone())
    }
    async fn list_indexes(&self, _d: &str, _c: &str, timeout: Duration) -> AppResult<Vec<IndexSummary>> {
        self.record("listIndexes", timeout);
        Ok(Vec::new())
    }
    async fn find(&self, _d: &str, _c: &str, spec: FindSpec, timeout: Duration) -> AppResult<Vec<Document>> {
        self.record("find", timeout);
        let docs = self
            .docs
            .iter()
            .filter(|d| spec.filter.iter().all(|(k, v)| d.get(k) == Some(v)))
            .skip(spec.skip as usize)
            .take(spec.limit as usize)
            .cloned()
            .collect();
        self.finds.lock().unwrap().push(spec);
        Ok(docs)
    }
    async fn count_documents(&self, _d: &str, _c: &str, _f: Document, timeout: Duration) -> AppResult<u64> {
        self.record("countDocuments", timeout);
        Ok(1)
    }
    async fn estimated_document_count(&self, _d: &str, _c: &str, timeout: Duration) -> AppResult<u64> {
        self.record("estimatedDocumentCount", timeout);
        Ok(self.docs.len() as u64)
    }
    async fn distinct(&self, _d: &str, _c: &str, field: &str, _f: Document, timeout: Duration) -> AppResult<Vec<Bson>> {
        self.record("distinct", timeout);
        Ok(self.docs.iter().filter_map(|d| d.get(field).cloned()).collect())
    }
    async fn aggregate(&self, _d: &str, _c: &str, pipeline: Vec<Document>, timeout: Duration) -> AppResult<Vec<Document>> {
        self.record("aggregate", timeout);
        let take = stage_size(&pipeline, "$limit")
            .or_else(|| stage_size(&pipeline, "$sample"))
            .unwrap_or(usize::MAX);
        self.pipelines.lock().unwrap().push(pipeline);
        Ok(self.docs.iter().take(take).cloned().collect())
    }
    async fn close(&self) -> AppResult<()> {
        Ok(())
    }
}

fn query_service() -> QueryService {
    QueryService::new(RuntimeConfig::default(), Serializer::default())
}

#[tokio::test]
async fn test_find_probes_one_extra_document_for_has_more() {
    let session = RecordingSession::with_docs(3);
    let page = query_service()
        .find(
            &session,
            "shop",
            "users",
            FindArgs {
                limit: Some(2),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(page.items.len(), 2);
    assert_eq!(page.context.count, 2);
    assert_eq!(page.context.total_matching, 3);
    assert!(page.page.has_more);
    assert_eq!(page.page.next_cursor.as_deref(), Some("2"));

    let spec = &session.finds.lock().unwrap()[0];
    assert_eq!(spec.limit, 3);
    assert_eq!(spec.sort, Some(doc! { "_id": -1 }));
    assert_eq!(session.ops(), vec!["find", "estimatedDocumentCount"]);
}

#[tokio::test]
async fn test_find_last_page_and_exact_count_for_filters() {
    let session = RecordingSession::with_docs(3);
    let page = query_service()
        .find(
            &session,
            "shop",
            "users",
            FindArgs {
                filter: doc! { "n": 1 },
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(page.items, vec![json!({ "_id": 1, "n": 1 })]);
    assert!(!page.page.has_more);
    assert_eq!(page.page.next_cursor, None);
    assert_eq!(page.context.filter, json!({ "n": 1 }));
    assert_eq!(session.ops(), vec!["find", "countDocuments"]);
}

#[tokio::test]
async fn test_find_limit_is_capped_by_max_documents() {
    let session = RecordingSession::with_docs(1);
    query_service()
        .find(
            &session,
            "shop",
            "users",
            FindArgs {
                limit: Some(5000),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(session.finds.lock().unwrap()[0].limit, 101);
}

#[tokio::test]
async fn test_get_reports_missing_document() {
    let session = RecordingSession::with_docs(1);
    let err = query_service()
        .get(&session, "shop", "users", "nobody", None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::DocumentNotFound { .. }));
    assert_eq!(err.to_string(), "Document not found: _id=nobody in shop.users");
}

#[tokio::test]
async fn test_aggregate_appends_limit_when_missing() {
    let session = RecordingSession::with_docs(30);
    let stages = parse_pipeline(r#"[{"$match": {}}]"#).unwrap();
    let result = query_service()
        .aggregate(&session, "shop", "users", stages, None)
        .await
        .unwrap();
    assert_eq!(result.count, 20);

    let pipelines = session.pipelines.lock().unwrap();
    assert_eq!(pipelines[0].len(), 2);
    assert_eq!(pipelines[0][1], doc! { "$limit": Bson::Int64(20) });
}

#[tokio::test]
async fn test_aggregate_keeps_existing_limit() {
    let session = RecordingSession::with_docs(30);
    let stages = parse_pipeline(r#"[{"$sort": {"n": 1}}, {"$limit": 5}]"#).unwrap();
    let result = query_service()
        .aggregate(&session, "shop", "users", stages, Some(50))
        .await
        .unwrap();
    assert_eq!(result.count, 5);
    assert_eq!(session.pipelines.lock().unwrap()[0].len(), 2);
}

#[tokio::test]
async fn test_aggregate_rejects_write_stages_before_any_remote_call() {
    let session = RecordingSession::with_docs(3);
    let stages = parse_pipeline(r#"[{"$match": {}}, {"$merge": "other"}]"#).unwrap();
    let err = query_service()
        .aggregate(&session, "shop", "users", stages, None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::UnsafePipeline { .. }));
    assert!(session.ops().is_empty());
}

#[tokio::test]
async fn test_sample_caps_size_and_matches_first() {
    let session = RecordingSession::with_docs(3);
    let result = query_service()
        .sample(&session, "shop", "users", Some(500), doc! { "n": { "$gt": 0 } })
        .await
        .unwrap();
    assert_eq!(result.sample_size, 3);

    let pipeline = &session.pipelines.lock().unwrap()[0];
    assert!(pipeline[0].contains_key("$match"));
    assert_eq!(pipeline[1], doc! { "$sample": { "size": Bson::Int64(100) } });
}

#[tokio::test]
async fn test_distinct_serializes_values() {
    let session = RecordingSession::with_docs(2);
    let result = query_service()
        .distinct(&session, "shop", "users", "n", Document::new())
        .await
        .unwrap();
    assert_eq!(result.values, vec![json!(0), json!(1)]);
    assert_eq!(result.count, 2);
}

#[tokio::test]
async fn test_schema_requires_existing_collection() {
    let session = RecordingSession::with_docs(2);
    let err = SchemaInferencer::new(RuntimeConfig::default(), Default::default())
        .infer(&session, "shop", "orders", 100, None)
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Collection \"orders\" not found in database \"shop\". Available: users"
    );
    assert_eq!(session.ops(), vec!["listCollections"]);
}

#[tokio::test]
async fn test_schema_samples_at_most_the_collection_size() {
    let session = RecordingSession::with_docs(2);
    let schema = SchemaInferencer::new(RuntimeConfig::default(), Default::default())
        .infer(&session, "shop", "users", 100, None)
        .await
        .unwrap();
    assert_eq!(schema.sample_size, 2);
    assert_eq!(schema.total_documents, 2);
    let paths: Vec<&str> = schema.fields.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(paths, vec!["_id", "n"]);
    assert_eq!(
        session.pipelines.lock().unwrap()[0],
        vec![doc! { "$sample": { "size": Bson::Int64(2) } }]
    );
}

#[tokio::test]
async fn test_collection_listing_is_sorted_and_paginated() {
    let session = RecordingSession {
        collections: vec![
            CollectionSummary::collection("users"),
            CollectionSummary::collection("audit"),
            CollectionSummary::collection("orders"),
        ],
        ..Default::default()
    };
    let discovery = DiscoveryService::new(RuntimeConfig::default(), Serializer::default());

    let page = discovery
        .list_collections(&session, "shop", Some(2), 0)
        .await
        .unwrap();
    let names: Vec<&str> = page.items.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["audit", "orders"]);
    assert_eq!(page.page.next_cursor.as_deref(), Some("2"));

    let all = discovery.list_collections(&session, "shop", None, 0).await.unwrap();
    assert_eq!(all.items.len(), 3);
    assert!(!all.page.has_more);
}

#[tokio::test]
async fn test_collection_stats_renames_server_fields() {
    let session = RecordingSession {
        collections: vec![CollectionSummary::collection("users")],
        stats: doc! {
            "count": 42, "size": 4200.0, "avgObjSize": 100, "storageSize": Bson::Int64(8192),
            "nindexes": 2, "totalIndexSize": 4096, "capped": false, "ok": 1.0,
        },
        ..Default::default()
    };
    let stats = DiscoveryService::new(RuntimeConfig::default(), Serializer::default())
        .collection_stats(&session, "shop", "users")
        .await
        .unwrap();
    assert_eq!(
        serde_json::to_value(&stats).unwrap(),
        json!({
            "database": "shop", "collection": "users", "documentCount": 42,
            "dataSize": 4200, "avgDocumentSize": 100, "storageSize": 8192,
            "indexes": 2, "indexSize": 4096, "capped": false
        })
    );
}

#[tokio::test]
async fn test_configured_timeout_bounds_queries() {
    let dir = TempDir::new().unwrap();
    let store = SettingsStore::new(dir.path(), Arc::new(DisabledSecretBackend));
    assert_eq!(store.update_setting("query.timeout", "5000").unwrap(), 5000);
    assert_eq!(store.get_setting("query.timeout"), Some(json!(5000)));

    let config = store.runtime_config();
    let session = RecordingSession::with_docs(1);
    QueryService::new(config, Serializer::default())
        .find(&session, "shop", "users", FindArgs::default())
        .await
        .unwrap();

    let timeouts = session.timeouts.lock().unwrap();
    assert!(!timeouts.is_empty());
    assert!(timeouts.iter().all(|(_, t)| *t == Duration::from_millis(5000)));
}
