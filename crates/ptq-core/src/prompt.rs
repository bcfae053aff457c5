//! Prompt engineering for query generation.
//!
//! The system prompt is a pure function of the schema: identical schemas
//! always produce byte-identical text. Test fixtures and response parsing
//! both rely on this.

use crate::schema::{FieldSpec, Schema};
use std::fmt::Write;

/// Static preamble: role, rules and the output contract the parser expects.
const PROMPT_HEADER: &str = r#"You are a MongoDB query generation assistant. Your task is to translate a natural-language request into a single MongoDB query against the database schema provided below.

## Rules

1. Output ONLY a single JSON object - no prose, no markdown fences
2. The object has exactly two keys: "query" and "columnTitles"
3. "query.operation" must be one of: "find", "aggregate", "count"
4. "query.collection" must name a collection from the schema
5. Use only field names that exist in the schema
6. "columnTitles" is an array of short human-readable labels, one per field the query will return, in output order

## Query shape

```json
{
  "query": {
    "operation": "find" | "aggregate" | "count",
    "collection": "<collection name>",
    "filter": { ... },        // find/count: optional predicate
    "pipeline": [ ... ],      // aggregate: ordered stages
    "projection": { "field": 1 },
    "sort": { "field": 1 | -1 },
    "limit": <number>,
    "skip": <number>
  },
  "columnTitles": ["Label", ...]
}
```
"#;

/// Worked examples covering the three operation kinds.
const PROMPT_EXAMPLES: &str = r#"## Examples

Request: "Get all active users"
{"query":{"operation":"find","collection":"users","filter":{"status":"active"}},"columnTitles":["Name","Status"]}

Request: "Total sales per category"
{"query":{"operation":"aggregate","collection":"orders","pipeline":[{"$group":{"_id":"$category","total":{"$sum":"$amount"}}},{"$sort":{"total":-1}}]},"columnTitles":["Category","Total Sales"]}

Request: "How many orders were delivered?"
{"query":{"operation":"count","collection":"orders","filter":{"status":"delivered"}},"columnTitles":["Count"]}
"#;

/// Build the schema-derived system prompt.
pub fn build_system_prompt(schema: &Schema) -> String {
    let mut out = String::with_capacity(PROMPT_HEADER.len() + PROMPT_EXAMPLES.len() + 512);
    out.push_str(PROMPT_HEADER);
    out.push_str("\n## Database schema\n\n");

    for (name, collection) in schema.collections() {
        let _ = writeln!(out, "Collection `{name}`:");
        for (field_name, spec) in &collection.fields {
            write_field(&mut out, field_name, spec, 1);
        }
        out.push('\n');
    }

    out.push_str(PROMPT_EXAMPLES);
    out
}

fn write_field(out: &mut String, name: &str, spec: &FieldSpec, depth: usize) {
    for _ in 0..depth {
        out.push_str("  ");
    }
    let _ = write!(out, "- {name}: {}", spec.ty);
    if spec.unique {
        out.push_str(" (unique)");
    } else if spec.indexed {
        out.push_str(" (indexed)");
    }
    if !spec.enum_values.is_empty() {
        let _ = write!(out, " one of [{}]", spec.enum_values.join(", "));
    }
    out.push('\n');
    for (nested_name, nested_spec) in &spec.nested {
        write_field(out, nested_name, nested_spec, depth + 1);
    }
}

/// Build the user prompt for a request.
pub fn build_user_prompt(prompt: &str) -> String {
    format!(
        r#"Translate this request into a MongoDB query:

{prompt}

Respond with the JSON object now:"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_schema() -> Schema {
        Schema::from_json(
            r#"{
                "users": {
                    "fields": {
                        "name": "string",
                        "status": {"type": "string", "enum": ["active", "inactive"]},
                        "email": {"type": "string", "unique": true}
                    }
                },
                "orders": {"fields": {"amount": "number", "created": "date"}}
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_system_prompt_is_deterministic() {
        let schema = test_schema();
        let first = build_system_prompt(&schema);
        let second = build_system_prompt(&schema);
        assert_eq!(first, second);

        // Reloading the same JSON must also give identical text.
        let reloaded = build_system_prompt(&test_schema());
        assert_eq!(first, reloaded);
    }

    #[test]
    fn test_system_prompt_enumerates_schema() {
        let prompt = build_system_prompt(&test_schema());
        assert!(prompt.contains("Collection `users`:"));
        assert!(prompt.contains("Collection `orders`:"));
        assert!(prompt.contains("- name: string"));
        assert!(prompt.contains("- status: string one of [active, inactive]"));
        assert!(prompt.contains("- email: string (unique)"));
        assert!(prompt.contains("- created: date"));
    }

    #[test]
    fn test_system_prompt_states_output_contract() {
        let prompt = build_system_prompt(&test_schema());
        assert!(prompt.contains("\"query\""));
        assert!(prompt.contains("columnTitles"));
        assert!(prompt.contains("\"find\" | \"aggregate\" | \"count\""));
    }

    #[test]
    fn test_system_prompt_has_worked_examples() {
        let prompt = build_system_prompt(&test_schema());
        assert!(prompt.contains(r#""operation":"find""#));
        assert!(prompt.contains(r#""operation":"aggregate""#));
        assert!(prompt.contains(r#""operation":"count""#));
    }

    #[test]
    fn test_user_prompt_echoes_request() {
        let prompt = build_user_prompt("Get all active users");
        assert!(prompt.contains("Get all active users"));
    }

    #[test]
    fn test_nested_fields_indented() {
        let schema = Schema::from_json(
            r#"{"users": {"fields": {"address": {"type": "object", "fields": {"city": "string"}}}}}"#,
        )
        .unwrap();
        let prompt = build_system_prompt(&schema);
        assert!(prompt.contains("  - address: object\n    - city: string"));
    }
}
