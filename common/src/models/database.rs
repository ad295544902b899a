//! Database and collection metadata models.
//!
//! Returned by [`DocumentSession`](crate::session::DocumentSession) discovery
//! calls and printed mostly as-is.

use bson::{Bson, Document};
use serde::Serialize;

/// One entry of the server's database listing.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseSummary {
    pub name: String,
    pub size_on_disk: u64,
    pub empty: bool,
}

/// Database listing with the server-reported total size.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseList {
    pub databases: Vec<DatabaseSummary>,
    pub total_size: u64,
}

impl DatabaseList {
    /// Builds the listing from a `listDatabases` command reply.
    pub fn from_command(reply: &Document) -> Self {
        let databases = reply
            .get_array("databases")
            .map(|items| {
                items
                    .iter()
                    .filter_map(Bson::as_document)
                    .map(|db| DatabaseSummary {
                        name: db.get_str("name").unwrap_or_default().to_string(),
                        size_on_disk: as_u64(db.get("sizeOnDisk")),
                        empty: db.get_bool("empty").unwrap_or(false),
                    })
                    .collect()
            })
            .unwrap_or_default();
        Self {
            databases,
            total_size: as_u64(reply.get("totalSize")),
        }
    }
}

/// Reads a non-negative server number that may arrive as int32, int64 or double.
pub fn as_u64(value: Option<&Bson>) -> u64 {
    match value {
        Some(Bson::Int32(v)) => u64::try_from(*v).unwrap_or(0),
        Some(Bson::Int64(v)) => u64::try_from(*v).unwrap_or(0),
        Some(Bson::Double(v)) if *v > 0.0 => *v as u64,
        _ => 0,
    }
}

/// Collection (or view) in a database.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CollectionSummary {
    pub name: String,
    /// `collection`, `view` or `timeseries`.
    #[serde(rename = "type")]
    pub collection_type: String,
}

impl CollectionSummary {
    pub fn collection(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            collection_type: "collection".to_string(),
        }
    }
}

/// Index definition, reduced to the options worth showing.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexSummary {
    pub name: Option<String>,
    pub key: Document,
    pub unique: bool,
    pub sparse: bool,
    pub expire_after_seconds: Option<u64>,
    pub partial_filter_expression: Option<Document>,
}
