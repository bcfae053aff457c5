//! Generated query types - the wire shape of what the engine produces.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// The MongoDB operation kind of a generated query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryOperation {
    Find,
    Aggregate,
    Count,
}

impl fmt::Display for QueryOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryOperation::Find => f.write_str("find"),
            QueryOperation::Aggregate => f.write_str("aggregate"),
            QueryOperation::Count => f.write_str("count"),
        }
    }
}

/// A structured MongoDB query produced from a natural-language prompt.
///
/// `find`/`count` carry a filter; `find` additionally carries projection,
/// sort, limit and skip; `aggregate` carries an ordered pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedQuery {
    pub operation: QueryOperation,
    pub collection: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pipeline: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projection: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip: Option<u64>,
}

impl GeneratedQuery {
    /// Create an empty query of the given kind against a collection.
    pub fn new(operation: QueryOperation, collection: impl Into<String>) -> Self {
        GeneratedQuery {
            operation,
            collection: collection.into(),
            filter: None,
            pipeline: None,
            projection: None,
            sort: None,
            limit: None,
            skip: None,
        }
    }
}

/// A generated query plus human-readable column titles, one per field the
/// query is expected to surface. `column_titles` is never null - it may be
/// empty only when the schema gives nothing to derive titles from.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    pub query: GeneratedQuery,
    pub column_titles: Vec<String>,
}
