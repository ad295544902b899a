//! 只读查询服务模块

use bson::{doc, Bson, Document};
use serde::Serialize;
use serde_json::Value;

use common::errors::{AppError, AppResult};
use common::models::{FindSpec, IdType};
use common::response::PageInfo;
use common::session::DocumentSession;
use common::utils::extended_json::pipeline_documents;
use common::utils::{PipelineValidator, Serializer};
use common::RuntimeConfig;

/// `query find` 参数
#[derive(Debug, Clone, Default)]
pub struct FindArgs {
    pub filter: Document,
    /// 默认按 `_id` 倒序
    pub sort: Option<Document>,
    pub projection: Option<Document>,
    pub limit: Option<u64>,
    pub skip: u64,
}

/// `query find` 上下文字段
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FindContext {
    pub database: String,
    pub collection: String,
    pub filter: Value,
    pub count: usize,
    pub total_matching: u64,
}

/// 一页查询结果
#[derive(Debug)]
pub struct FindPage {
    pub context: FindContext,
    pub items: Vec<Value>,
    pub page: PageInfo,
}

#[derive(Debug, Serialize)]
pub struct CountResult {
    pub database: String,
    pub collection: String,
    pub filter: Value,
    pub count: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleResult {
    pub database: String,
    pub collection: String,
    pub sample_size: usize,
    pub documents: Vec<Value>,
}

#[derive(Debug, Serialize)]
pub struct DistinctResult {
    pub database: String,
    pub collection: String,
    pub field: String,
    pub values: Vec<Value>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct AggregateResult {
    pub database: String,
    pub collection: String,
    pub documents: Vec<Value>,
    pub count: usize,
}

/// 只读查询执行服务
pub struct QueryService {
    config: RuntimeConfig,
    serializer: Serializer,
}

impl QueryService {
    /// 创建新的查询服务实例
    pub fn new(config: RuntimeConfig, serializer: Serializer) -> Self {
        Self { config, serializer }
    }

    /// 分页查询：多取一条判断是否还有下一页
    pub async fn find(
        &self,
        session: &dyn DocumentSession,
        database: &str,
        collection: &str,
        args: FindArgs,
    ) -> AppResult<FindPage> {
        let timeout = self.config.query_timeout();
        let limit = self.config.page_size(args.limit);
        let spec = FindSpec {
            filter: args.filter.clone(),
            sort: Some(args.sort.unwrap_or_else(|| doc! { "_id": -1 })),
            projection: args.projection,
            skip: args.skip,
            limit: i64::try_from(limit.saturating_add(1)).unwrap_or(i64::MAX),
        };

        let mut docs = session
            .find(database, collection, spec, timeout)
            .await
            .map_err(|e| e.with_collection_context(database, collection))?;
        let has_more = docs.len() as u64 > limit;
        docs.truncate(limit as usize);

        let total_matching = self
            .count_matching(session, database, collection, args.filter.clone())
            .await?;

        let count = docs.len();
        Ok(FindPage {
            context: FindContext {
                database: database.to_string(),
                collection: collection.to_string(),
                filter: self.serializer.serialize_document(args.filter),
                count,
                total_matching,
            },
            items: self.serializer.serialize_documents(docs),
            page: PageInfo::from_offset(args.skip, count, has_more),
        })
    }

    /// 按 `_id` 获取单个文档
    pub async fn get(
        &self,
        session: &dyn DocumentSession,
        database: &str,
        collection: &str,
        raw_id: &str,
        id_type: Option<IdType>,
        projection: Option<Document>,
    ) -> AppResult<Value> {
        let id = IdType::to_bson(id_type, raw_id)?;
        let spec = FindSpec {
            filter: doc! { "_id": id },
            sort: None,
            projection,
            skip: 0,
            limit: 1,
        };
        let doc = session
            .find(database, collection, spec, self.config.query_timeout())
            .await
            .map_err(|e| e.with_collection_context(database, collection))?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::DocumentNotFound {
                id: raw_id.to_string(),
                database: database.to_string(),
                collection: collection.to_string(),
            })?;
        Ok(self.serializer.serialize_document(doc))
    }

    /// 统计文档数；空过滤条件使用估算值
    pub async fn count(
        &self,
        session: &dyn DocumentSession,
        database: &str,
        collection: &str,
        filter: Document,
    ) -> AppResult<CountResult> {
        let count = self
            .count_matching(session, database, collection, filter.clone())
            .await?;
        Ok(CountResult {
            database: database.to_string(),
            collection: collection.to_string(),
            filter: self.serializer.serialize_document(filter),
            count,
        })
    }

    /// 随机抽样，数量受 `query.maxDocuments` 限制
    pub async fn sample(
        &self,
        session: &dyn DocumentSession,
        database: &str,
        collection: &str,
        size: Option<u64>,
        filter: Document,
    ) -> AppResult<SampleResult> {
        let requested = size.unwrap_or(self.config.default_sample_size);
        if requested < 1 {
            return Err(AppError::Validation(format!(
                "Invalid --size: \"{}\". Must be a positive integer.",
                requested
            )));
        }
        let size = requested.min(self.config.max_documents);

        let mut pipeline = Vec::with_capacity(2);
        if !filter.is_empty() {
            pipeline.push(doc! { "$match": filter });
        }
        pipeline.push(doc! { "$sample": { "size": size as i64 } });

        let docs = session
            .aggregate(database, collection, pipeline, self.config.query_timeout())
            .await
            .map_err(|e| e.with_collection_context(database, collection))?;
        Ok(SampleResult {
            database: database.to_string(),
            collection: collection.to_string(),
            sample_size: docs.len(),
            documents: self.serializer.serialize_documents(docs),
        })
    }

    /// 字段去重取值
    pub async fn distinct(
        &self,
        session: &dyn DocumentSession,
        database: &str,
        collection: &str,
        field: &str,
        filter: Document,
    ) -> AppResult<DistinctResult> {
        let values = session
            .distinct(database, collection, field, filter, self.config.query_timeout())
            .await
            .map_err(|e| e.with_collection_context(database, collection))?;
        let values: Vec<Value> = values
            .into_iter()
            .map(|value| self.serializer.serialize(value.into()))
            .collect();
        Ok(DistinctResult {
            database: database.to_string(),
            collection: collection.to_string(),
            field: field.to_string(),
            count: values.len(),
            values,
        })
    }

    /// 执行只读聚合；缺少 `$limit` 时追加一个
    pub async fn aggregate(
        &self,
        session: &dyn DocumentSession,
        database: &str,
        collection: &str,
        stages: Vec<Value>,
        limit: Option<u64>,
    ) -> AppResult<AggregateResult> {
        PipelineValidator::validate(&stages)?;
        let has_limit = PipelineValidator::has_limit_stage(&stages);
        let mut pipeline = pipeline_documents(stages)?;
        if !has_limit {
            let limit = self.config.page_size(limit);
            tracing::debug!(limit, "管道缺少 $limit，已自动追加");
            pipeline.push(doc! { "$limit": Bson::Int64(limit as i64) });
        }

        let docs = session
            .aggregate(database, collection, pipeline, self.config.query_timeout())
            .await
            .map_err(|e| e.with_collection_context(database, collection))?;
        Ok(AggregateResult {
            database: database.to_string(),
            collection: collection.to_string(),
            count: docs.len(),
            documents: self.serializer.serialize_documents(docs),
        })
    }

    async fn count_matching(
        &self,
        session: &dyn DocumentSession,
        database: &str,
        collection: &str,
        filter: Document,
    ) -> AppResult<u64> {
        let timeout = self.config.query_timeout();
        let result = if filter.is_empty() {
            session
                .estimated_document_count(database, collection, timeout)
                .await
        } else {
            session
                .count_documents(database, collection, filter, timeout)
                .await
        };
        result.map_err(|e| e.with_collection_context(database, collection))
    }
}
