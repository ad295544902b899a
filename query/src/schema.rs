//! Schema inference over a random sample.
//!
//! Each sampled document is walked depth-first. Every field records its type
//! tag at its dotted path; array elements record theirs at `path.$`. A path
//! counts toward presence at most once per document.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use bson::{doc, Document};
use serde::Serialize;

use common::errors::{AppError, AppResult};
use common::models::FieldInfo;
use common::session::DocumentSession;
use common::value::{RemoteValue, TypeTag, UuidEncoding};
use common::RuntimeConfig;

/// Default number of documents sampled by `collection schema`.
pub const DEFAULT_SCHEMA_SAMPLE_SIZE: u64 = 100;

/// Inferred schema of one collection.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SchemaResult {
    pub database: String,
    pub collection: String,
    /// Documents actually sampled.
    pub sample_size: usize,
    /// Estimated collection size.
    pub total_documents: u64,
    /// Sorted by path.
    pub fields: Vec<FieldInfo>,
}

pub struct SchemaInferencer {
    config: RuntimeConfig,
    uuid: UuidEncoding,
}

impl SchemaInferencer {
    pub fn new(config: RuntimeConfig, uuid: UuidEncoding) -> Self {
        Self { config, uuid }
    }

    /// Samples `sample_size` documents and infers their fields.
    ///
    /// `max_depth` limits recursion into nested objects; the top level is
    /// depth 1. `None` means unlimited.
    pub async fn infer(
        &self,
        session: &dyn DocumentSession,
        database: &str,
        collection: &str,
        sample_size: u64,
        max_depth: Option<u32>,
    ) -> AppResult<SchemaResult> {
        if sample_size < 1 {
            return Err(AppError::Validation(format!(
                "Invalid --sample-size: \"{}\". Must be a positive integer.",
                sample_size
            )));
        }
        let timeout = self.config.query_timeout();
        crate::discovery::ensure_collection(session, database, collection, timeout).await?;

        let total_documents = session
            .estimated_document_count(database, collection, timeout)
            .await
            .map_err(|e| e.with_collection_context(database, collection))?;
        let effective = if total_documents == 0 {
            sample_size
        } else {
            sample_size.min(total_documents)
        };

        let docs = session
            .aggregate(
                database,
                collection,
                vec![doc! { "$sample": { "size": effective as i64 } }],
                timeout,
            )
            .await
            .map_err(|e| e.with_collection_context(database, collection))?;
        tracing::debug!(database, collection, sampled = docs.len(), "Schema sample drawn");

        let sample_size = docs.len();
        Ok(SchemaResult {
            database: database.to_string(),
            collection: collection.to_string(),
            sample_size,
            total_documents,
            fields: infer_fields(docs, max_depth, self.uuid),
        })
    }
}

/// Infers field records from already-fetched documents.
pub fn infer_fields(docs: Vec<Document>, max_depth: Option<u32>, uuid: UuidEncoding) -> Vec<FieldInfo> {
    let total = docs.len();
    let mut walker = Walker {
        fields: BTreeMap::new(),
        max_depth,
        uuid,
    };
    for doc in docs {
        let mut seen = HashSet::new();
        if let RemoteValue::Object(fields) = RemoteValue::from(doc) {
            walker.walk_object(&fields, "", 1, &mut seen);
        }
    }

    walker
        .fields
        .into_iter()
        .map(|(path, stats)| FieldInfo {
            path,
            types: stats.types.into_iter().collect(),
            presence: presence(stats.documents, total),
        })
        .collect()
}

/// Share of documents containing a path, rounded to two decimals.
fn presence(documents: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    ((documents as f64 / total as f64) * 100.0).round() / 100.0
}

#[derive(Default)]
struct FieldStats {
    types: BTreeSet<TypeTag>,
    documents: usize,
}

struct Walker {
    fields: BTreeMap<String, FieldStats>,
    max_depth: Option<u32>,
    uuid: UuidEncoding,
}

impl Walker {
    fn descends(&self, depth: u32) -> bool {
        self.max_depth.map_or(true, |max| depth < max)
    }

    fn walk_object(
        &mut self,
        fields: &[(String, RemoteValue)],
        prefix: &str,
        depth: u32,
        seen: &mut HashSet<String>,
    ) {
        for (key, value) in fields {
            let path = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{}.{}", prefix, key)
            };
            self.record(&path, value.type_tag(self.uuid));
            self.mark_seen(&path, seen);

            match value {
                RemoteValue::Object(children) if self.descends(depth) => {
                    self.walk_object(children, &path, depth + 1, seen);
                }
                RemoteValue::Array(items) => self.walk_array(items, &path, depth, seen),
                _ => {}
            }
        }
    }

    // Element tags are recorded at any depth; only recursion is limited.
    fn walk_array(&mut self, items: &[RemoteValue], parent: &str, depth: u32, seen: &mut HashSet<String>) {
        let path = format!("{}.$", parent);
        for item in items {
            self.record(&path, item.type_tag(self.uuid));
            if let RemoteValue::Object(children) = item {
                if self.descends(depth) {
                    self.walk_object(children, &path, depth + 1, seen);
                }
            }
        }
        if !items.is_empty() {
            self.mark_seen(&path, seen);
        }
    }

    fn record(&mut self, path: &str, tag: TypeTag) {
        self.fields
            .entry(path.to_string())
            .or_default()
            .types
            .insert(tag);
    }

    fn mark_seen(&mut self, path: &str, seen: &mut HashSet<String>) {
        if seen.insert(path.to_string()) {
            if let Some(stats) = self.fields.get_mut(path) {
                stats.documents += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::{oid::ObjectId, Bson};

    fn field<'a>(fields: &'a [FieldInfo], path: &str) -> &'a FieldInfo {
        fields
            .iter()
            .find(|f| f.path == path)
            .unwrap_or_else(|| panic!("missing field {}", path))
    }

    fn tags(info: &FieldInfo) -> Vec<&'static str> {
        info.types.iter().map(TypeTag::as_str).collect()
    }

    #[test]
    fn test_presence_counts_documents() {
        let fields = infer_fields(
            vec![doc! { "name": "A", "optional": "yes" }, doc! { "name": "B" }],
            None,
            UuidEncoding::Base64,
        );
        assert_eq!(field(&fields, "name").presence, 1.0);
        assert_eq!(field(&fields, "optional").presence, 0.5);
    }

    #[test]
    fn test_array_elements_are_typed_under_dollar() {
        let fields = infer_fields(vec![doc! { "tags": ["a", "b"] }], None, UuidEncoding::Base64);
        assert_eq!(tags(field(&fields, "tags")), vec!["array"]);
        let elements = field(&fields, "tags.$");
        assert_eq!(tags(elements), vec!["string"]);
        assert_eq!(elements.presence, 1.0);
    }

    #[test]
    fn test_heterogeneous_types_are_sorted() {
        let fields = infer_fields(
            vec![
                doc! { "v": "x" },
                doc! { "v": 3 },
                doc! { "v": Bson::Null },
                doc! { "v": ObjectId::new() },
            ],
            None,
            UuidEncoding::Base64,
        );
        assert_eq!(tags(field(&fields, "v")), vec!["ObjectId", "int", "null", "string"]);
    }

    #[test]
    fn test_nested_objects_inside_arrays() {
        let fields = infer_fields(
            vec![doc! {
                "items": [{ "sku": "A", "qty": 1 }, { "sku": "B", "price": 2.5 }],
                "meta": { "source": { "kind": "web" } }
            }],
            None,
            UuidEncoding::Base64,
        );
        let paths: Vec<&str> = fields.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "items",
                "items.$",
                "items.$.price",
                "items.$.qty",
                "items.$.sku",
                "meta",
                "meta.source",
                "meta.source.kind",
            ]
        );
        assert_eq!(field(&fields, "items.$.sku").presence, 1.0);
        assert_eq!(tags(field(&fields, "items.$.price")), vec!["double"]);
    }

    #[test]
    fn test_max_depth_limits_recursion_but_keeps_element_tags() {
        let fields = infer_fields(
            vec![doc! {
                "meta": { "source": { "kind": "web" } },
                "items": [{ "sku": "A" }]
            }],
            Some(1),
            UuidEncoding::Base64,
        );
        let paths: Vec<&str> = fields.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["items", "items.$", "meta"]);
        assert_eq!(tags(field(&fields, "items.$")), vec!["object"]);
    }

    #[test]
    fn test_empty_arrays_do_not_count_element_presence() {
        let fields = infer_fields(
            vec![doc! { "tags": ["a"] }, doc! { "tags": [] }, doc! { "other": 1 }],
            None,
            UuidEncoding::Base64,
        );
        assert_eq!(field(&fields, "tags").presence, 0.67);
        assert_eq!(field(&fields, "tags.$").presence, 0.33);
    }
}
