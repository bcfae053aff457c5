//! The JSON result envelope - the sole shape crossing the binary boundary.
//!
//! Every value is either a success payload or an `error` string, never both.
//! Structured error kinds deliberately do not cross the boundary: the
//! boundary is language-agnostic text, and host wrappers re-wrap the message
//! in their native error types.

use serde::Serialize;

use ptq_core::QueryResult;

#[derive(Serialize)]
struct ErrorEnvelope<'a> {
    error: &'a str,
}

#[derive(Serialize)]
struct GenerateEnvelope {
    /// The generated query, JSON-encoded as a string.
    query: String,
    #[serde(rename = "columnTitles")]
    column_titles: Vec<String>,
}

/// Success envelope for `init`: no payload, only absence of `error`.
pub fn init_success() -> String {
    "{}".to_string()
}

/// Error envelope with the message flattened to text.
pub fn error(message: &str) -> String {
    serde_json::to_string(&ErrorEnvelope { error: message })
        .unwrap_or_else(|_| r#"{"error":"failed to encode error envelope"}"#.to_string())
}

/// Success envelope for `generate`.
pub fn generate_success(result: &QueryResult) -> String {
    let query = match serde_json::to_string(&result.query) {
        Ok(q) => q,
        Err(e) => return error(&format!("failed to encode query: {e}")),
    };
    let envelope = GenerateEnvelope {
        query,
        column_titles: result.column_titles.clone(),
    };
    serde_json::to_string(&envelope)
        .unwrap_or_else(|e| error(&format!("failed to encode envelope: {e}")))
}
