//! Schema model - the database description that grounds query generation.
//!
//! A schema is an ordered mapping from collection name to field mapping.
//! It is constructed once from JSON at engine initialization and never
//! mutated afterwards; declaration order is preserved because the prompt
//! builder and column-title derivation both depend on it.

use indexmap::IndexMap;
use serde::Deserialize;
use std::fmt;
use thiserror::Error;

/// Errors from schema loading.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("invalid schema JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("schema is empty")]
    Empty,

    #[error("collection '{collection}' has no fields")]
    NoFields { collection: String },

    #[error("field '{collection}.{field}' is missing its type")]
    MissingType { collection: String, field: String },

    #[error("field '{collection}.{field}' has unknown type '{ty}'")]
    UnknownType {
        collection: String,
        field: String,
        ty: String,
    },
}

/// Primitive type of a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Date,
    Identifier,
    Array,
    Object,
}

impl FieldType {
    /// Parse a type tag as hosts actually write them.
    pub fn parse(tag: &str) -> Option<FieldType> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "string" | "str" | "text" => Some(FieldType::String),
            "number" | "int" | "integer" | "float" | "double" | "decimal" => {
                Some(FieldType::Number)
            }
            "boolean" | "bool" => Some(FieldType::Boolean),
            "date" | "datetime" | "timestamp" => Some(FieldType::Date),
            "objectid" | "id" | "identifier" => Some(FieldType::Identifier),
            "array" | "list" => Some(FieldType::Array),
            "object" | "document" | "map" => Some(FieldType::Object),
            _ => None,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Date => "date",
            FieldType::Identifier => "objectId",
            FieldType::Array => "array",
            FieldType::Object => "object",
        };
        f.write_str(name)
    }
}

/// A field within a collection.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub ty: FieldType,
    pub indexed: bool,
    pub unique: bool,
    /// Legal values for enum-constrained string fields.
    pub enum_values: Vec<String>,
    /// Nested fields for object / array-of-object types.
    pub nested: IndexMap<String, FieldSpec>,
}

/// A collection and its fields, in declaration order.
#[derive(Debug, Clone)]
pub struct Collection {
    pub fields: IndexMap<String, FieldSpec>,
}

/// The full database schema, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    collections: IndexMap<String, Collection>,
}

/// Raw serde shape: a field is either a bare type tag or a spec object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawField {
    Tag(String),
    Spec {
        #[serde(rename = "type")]
        ty: Option<String>,
        #[serde(default)]
        indexed: bool,
        #[serde(default)]
        unique: bool,
        #[serde(rename = "enum", default)]
        enum_values: Vec<String>,
        #[serde(default)]
        fields: IndexMap<String, RawField>,
    },
}

#[derive(Debug, Deserialize)]
struct RawCollection {
    #[serde(default)]
    fields: IndexMap<String, RawField>,
}

impl Schema {
    /// Load a schema from its JSON document form:
    /// `{"users": {"fields": {"name": "string", ...}}, ...}`.
    pub fn from_json(raw: &str) -> Result<Schema, SchemaError> {
        let parsed: IndexMap<String, RawCollection> = serde_json::from_str(raw)?;
        Schema::from_raw(parsed)
    }

    fn from_raw(parsed: IndexMap<String, RawCollection>) -> Result<Schema, SchemaError> {
        if parsed.is_empty() {
            return Err(SchemaError::Empty);
        }

        let mut collections = IndexMap::new();
        for (name, raw) in parsed {
            if raw.fields.is_empty() {
                return Err(SchemaError::NoFields { collection: name });
            }
            let mut fields = IndexMap::new();
            for (field_name, raw_field) in raw.fields {
                let spec = convert_field(&name, &field_name, raw_field)?;
                fields.insert(field_name, spec);
            }
            collections.insert(name, Collection { fields });
        }

        Ok(Schema { collections })
    }

    /// Look up a collection by name.
    pub fn collection(&self, name: &str) -> Option<&Collection> {
        self.collections.get(name)
    }

    /// Whether the schema declares a collection with this name.
    pub fn has_collection(&self, name: &str) -> bool {
        self.collections.contains_key(name)
    }

    /// Iterate collections in declaration order.
    pub fn collections(&self) -> impl Iterator<Item = (&String, &Collection)> {
        self.collections.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }

    pub fn len(&self) -> usize {
        self.collections.len()
    }
}

fn convert_field(
    collection: &str,
    field: &str,
    raw: RawField,
) -> Result<FieldSpec, SchemaError> {
    match raw {
        RawField::Tag(tag) => {
            let ty = FieldType::parse(&tag).ok_or_else(|| SchemaError::UnknownType {
                collection: collection.to_string(),
                field: field.to_string(),
                ty: tag,
            })?;
            Ok(FieldSpec {
                ty,
                indexed: false,
                unique: false,
                enum_values: Vec::new(),
                nested: IndexMap::new(),
            })
        }
        RawField::Spec {
            ty,
            indexed,
            unique,
            enum_values,
            fields,
        } => {
            let tag = ty.ok_or_else(|| SchemaError::MissingType {
                collection: collection.to_string(),
                field: field.to_string(),
            })?;
            let ty = FieldType::parse(&tag).ok_or_else(|| SchemaError::UnknownType {
                collection: collection.to_string(),
                field: field.to_string(),
                ty: tag,
            })?;

            let mut nested = IndexMap::new();
            for (nested_name, nested_raw) in fields {
                let path = format!("{collection}.{field}");
                let spec = convert_field(&path, &nested_name, nested_raw)?;
                nested.insert(nested_name, spec);
            }

            Ok(FieldSpec {
                ty,
                indexed,
                unique,
                enum_values,
                nested,
            })
        }
    }
}
