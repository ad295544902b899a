//! 数据库与集合发现服务
//!
//! 列出数据库、集合、索引，并把服务端统计命令的结果整理成稳定的字段名。

use std::time::Duration;

use bson::Document;
use serde::Serialize;
use serde_json::Value;

use common::errors::{AppError, AppResult};
use common::models::database::as_u64;
use common::models::{CollectionSummary, DatabaseList, IndexSummary};
use common::response::{paginate, PageInfo};
use common::session::DocumentSession;
use common::utils::Serializer;
use common::RuntimeConfig;

/// `db stats` 输出
#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseStats {
    pub database: String,
    pub collections: u64,
    pub documents: u64,
    pub data_size: u64,
    pub storage_size: u64,
    pub indexes: u64,
    pub index_size: u64,
}

/// `collection stats` 输出
#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CollectionStats {
    pub database: String,
    pub collection: String,
    pub document_count: u64,
    pub data_size: u64,
    pub avg_document_size: u64,
    pub storage_size: u64,
    pub indexes: u64,
    pub index_size: u64,
    pub capped: bool,
}

/// 一页集合列表
#[derive(Debug)]
pub struct CollectionPage {
    pub database: String,
    pub items: Vec<CollectionSummary>,
    pub page: PageInfo,
}

/// 单个索引的展示形式；为 false 的选项不输出
#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IndexInfo {
    pub name: Option<String>,
    pub key: Value,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub unique: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub sparse: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expire_after_seconds: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partial_filter_expression: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct IndexList {
    pub database: String,
    pub collection: String,
    pub indexes: Vec<IndexInfo>,
}

/// 发现服务
pub struct DiscoveryService {
    config: RuntimeConfig,
    serializer: Serializer,
}

impl DiscoveryService {
    pub fn new(config: RuntimeConfig, serializer: Serializer) -> Self {
        Self { config, serializer }
    }

    /// 列出所有数据库
    pub async fn list_databases(&self, session: &dyn DocumentSession) -> AppResult<DatabaseList> {
        session.list_databases(self.config.query_timeout()).await
    }

    /// 数据库统计（`dbStats`）
    pub async fn database_stats(&self, session: &dyn DocumentSession, database: &str) -> AppResult<DatabaseStats> {
        let reply = session
            .database_stats(database, self.config.query_timeout())
            .await?;
        Ok(DatabaseStats {
            database: database.to_string(),
            collections: as_u64(reply.get("collections")),
            documents: as_u64(reply.get("objects")),
            data_size: as_u64(reply.get("dataSize")),
            storage_size: as_u64(reply.get("storageSize")),
            indexes: as_u64(reply.get("indexes")),
            index_size: as_u64(reply.get("indexSize")),
        })
    }

    /// 按名称排序后分页列出集合；未指定 limit 时返回全部
    pub async fn list_collections(
        &self,
        session: &dyn DocumentSession,
        database: &str,
        limit: Option<u64>,
        skip: u64,
    ) -> AppResult<CollectionPage> {
        let mut collections = session
            .list_collections(database, self.config.query_timeout())
            .await?;
        collections.sort_by(|a, b| a.name.cmp(&b.name));
        let (items, page) = paginate(collections, skip, limit.unwrap_or(u64::MAX));
        Ok(CollectionPage {
            database: database.to_string(),
            items,
            page,
        })
    }

    /// 集合统计（`collStats`）
    pub async fn collection_stats(
        &self,
        session: &dyn DocumentSession,
        database: &str,
        collection: &str,
    ) -> AppResult<CollectionStats> {
        let timeout = self.config.query_timeout();
        ensure_collection(session, database, collection, timeout).await?;
        let reply = session
            .collection_stats(database, collection, timeout)
            .await
            .map_err(|e| e.with_collection_context(database, collection))?;
        Ok(CollectionStats {
            database: database.to_string(),
            collection: collection.to_string(),
            document_count: as_u64(reply.get("count")),
            data_size: as_u64(reply.get("size")),
            avg_document_size: as_u64(reply.get("avgObjSize")),
            storage_size: as_u64(reply.get("storageSize")),
            indexes: as_u64(reply.get("nindexes")),
            index_size: as_u64(reply.get("totalIndexSize")),
            capped: reply.get_bool("capped").unwrap_or(false),
        })
    }

    /// 列出集合索引
    pub async fn list_indexes(
        &self,
        session: &dyn DocumentSession,
        database: &str,
        collection: &str,
    ) -> AppResult<IndexList> {
        let timeout = self.config.query_timeout();
        ensure_collection(session, database, collection, timeout).await?;
        let indexes = session
            .list_indexes(database, collection, timeout)
            .await
            .map_err(|e| e.with_collection_context(database, collection))?;
        Ok(IndexList {
            database: database.to_string(),
            collection: collection.to_string(),
            indexes: indexes.into_iter().map(|index| self.index_info(index)).collect(),
        })
    }

    fn index_info(&self, index: IndexSummary) -> IndexInfo {
        IndexInfo {
            name: index.name,
            key: self.document_value(index.key),
            unique: index.unique,
            sparse: index.sparse,
            expire_after_seconds: index.expire_after_seconds,
            partial_filter_expression: index.partial_filter_expression.map(|doc| self.document_value(doc)),
        }
    }

    fn document_value(&self, doc: Document) -> Value {
        self.serializer.serialize_document(doc)
    }
}

/// 确认集合存在，否则返回列出可用集合的 NotFound 错误
pub async fn ensure_collection(
    session: &dyn DocumentSession,
    database: &str,
    collection: &str,
    timeout: Duration,
) -> AppResult<()> {
    let collections = session.list_collections(database, timeout).await?;
    if collections.iter().any(|c| c.name == collection) {
        return Ok(());
    }
    let mut available: Vec<String> = collections.into_iter().map(|c| c.name).collect();
    available.sort();
    Err(AppError::CollectionNotFound {
        database: database.to_string(),
        collection: collection.to_string(),
        available,
    })
}
