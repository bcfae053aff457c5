//! Response parsing and validation.
//!
//! LLM output is semi-structured text: the JSON object we asked for may be
//! wrapped in prose or markdown fences. All tolerance for that lives here,
//! in one place - callers never see raw provider text.

use crate::query::{GeneratedQuery, QueryOperation, QueryResult};
use crate::schema::Schema;
use serde_json::Value;
use thiserror::Error;

/// Errors from parsing and validating a provider response.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed response: no JSON object found in provider output")]
    MalformedResponse,

    #[error("missing field '{0}' in provider response")]
    MissingField(&'static str),

    #[error("invalid operation '{0}' (expected find, aggregate or count)")]
    InvalidOperation(String),

    #[error("unknown collection '{0}': not present in the schema")]
    UnknownCollection(String),

    #[error("invalid query object: {0}")]
    InvalidQuery(String),
}

/// Parse raw provider text into a validated query result.
pub fn parse_response(raw: &str, schema: &Schema) -> Result<QueryResult, ParseError> {
    let root = extract_json_object(raw).ok_or(ParseError::MalformedResponse)?;

    let query_value = root.get("query").ok_or(ParseError::MissingField("query"))?;
    let titles_value = root
        .get("columnTitles")
        .ok_or(ParseError::MissingField("columnTitles"))?;

    let query = validate_query(query_value, schema)?;

    let mut column_titles = coerce_titles(titles_value);
    if column_titles.is_empty() {
        column_titles = derive_column_titles(&query, schema);
    }

    Ok(QueryResult {
        query,
        column_titles,
    })
}

/// Locate and parse the first syntactically valid top-level JSON object in
/// free-form text. Scans for `{`, finds its balanced close (respecting
/// string literals and escapes), and tries the next `{` on parse failure.
fn extract_json_object(raw: &str) -> Option<Value> {
    let bytes = raw.as_bytes();
    let mut start = 0;

    while let Some(offset) = raw[start..].find('{') {
        let open = start + offset;
        if let Some(close) = find_balanced_close(bytes, open) {
            if let Ok(value) = serde_json::from_str::<Value>(&raw[open..=close]) {
                if value.is_object() {
                    return Some(value);
                }
            }
        }
        start = open + 1;
    }

    None
}

fn find_balanced_close(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(open) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }

    None
}

/// Structural and semantic validation of the `query` value.
fn validate_query(value: &Value, schema: &Schema) -> Result<GeneratedQuery, ParseError> {
    let obj = value
        .as_object()
        .ok_or_else(|| ParseError::InvalidQuery("'query' is not an object".to_string()))?;

    let operation = obj
        .get("operation")
        .and_then(Value::as_str)
        .ok_or(ParseError::MissingField("query.operation"))?;

    match operation {
        "find" | "aggregate" | "count" => {}
        other => return Err(ParseError::InvalidOperation(other.to_string())),
    }

    let collection = obj
        .get("collection")
        .and_then(Value::as_str)
        .ok_or(ParseError::MissingField("query.collection"))?;

    // Hard validation: a query against an undeclared collection can never
    // be executed safely downstream.
    if !schema.has_collection(collection) {
        return Err(ParseError::UnknownCollection(collection.to_string()));
    }

    serde_json::from_value(value.clone()).map_err(|e| ParseError::InvalidQuery(e.to_string()))
}

/// Coerce the `columnTitles` value into a string sequence. Strings are kept,
/// scalar non-strings are stringified, everything else is dropped. Null or
/// otherwise ambiguous content yields an empty sequence, never null.
fn coerce_titles(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                Value::Bool(b) => Some(b.to_string()),
                _ => None,
            })
            .collect(),
        Value::String(s) => vec![s.clone()],
        _ => Vec::new(),
    }
}

/// Derive titles the model did not supply: humanized schema field names in
/// declaration order, filtered and ordered by the query's projection.
fn derive_column_titles(query: &GeneratedQuery, schema: &Schema) -> Vec<String> {
    if query.operation == QueryOperation::Count {
        return vec!["Count".to_string()];
    }

    let collection = match schema.collection(&query.collection) {
        Some(c) => c,
        None => return Vec::new(),
    };

    if let Some(projection) = query.projection.as_ref().and_then(Value::as_object) {
        let excluded = |v: &Value| v.as_i64() == Some(0) || matches!(v, Value::Bool(false));
        let included: Vec<&String> = projection
            .iter()
            .filter(|(_, v)| !excluded(v))
            .map(|(k, _)| k)
            .collect();

        if !included.is_empty() {
            // Inclusive projection: titles follow projection order.
            return included.iter().map(|name| humanize(name)).collect();
        }

        // Exclusive projection: schema order minus the excluded fields.
        return collection
            .fields
            .keys()
            .filter(|name| !projection.contains_key(*name))
            .map(|name| humanize(name))
            .collect();
    }

    collection.fields.keys().map(|name| humanize(name)).collect()
}

/// Turn a field name into a human-readable title: `created_at` and
/// `createdAt` both become `Created At`.
fn humanize(field: &str) -> String {
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;

    for c in field.chars() {
        if c == '_' || c == '-' || c == '.' {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        // An uppercase run stays one word; break only on a lower-to-upper edge.
        if c.is_uppercase() && prev_lower && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        current.push(c);
        prev_lower = c.is_lowercase();
    }
    if !current.is_empty() {
        words.push(current);
    }

    words
        .iter()
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                None => String::new(),
                Some(c) => c.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
