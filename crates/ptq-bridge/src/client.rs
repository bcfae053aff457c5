//! High-level client over the loaded engine library.

use std::path::{Path, PathBuf};

use serde_json::{json, Value};

use crate::error::BridgeError;
use crate::loader::{EngineHandle, EngineLibrary};
use crate::probe::SystemProbe;
use crate::resolve;

/// A generated query as seen by a host: the decoded query object plus its
/// column titles.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResponse {
    pub query: Value,
    pub column_titles: Vec<String>,
}

/// Client for the prompt-to-query engine.
///
/// Resolves and loads the platform binary once, initializes one engine,
/// and re-wraps flat envelope errors as [`BridgeError`]. The engine handle
/// is freed on drop.
///
/// ```ignore
/// let ptq = PromptToQuery::builder()
///     .provider("openai")
///     .api_key(key)
///     .schema_path("schema.json")
///     .build()?;
/// let response = ptq.generate_query("Get all active users")?;
/// ```
#[derive(Debug)]
pub struct PromptToQuery {
    library: EngineLibrary,
    engine: Option<EngineHandle>,
}

/// Builder for [`PromptToQuery`]. Not `Debug`: it carries the API key.
#[derive(Default)]
pub struct PromptToQueryBuilder {
    provider: String,
    api_key: String,
    schema_json: Option<String>,
    schema_path: Option<PathBuf>,
    model: Option<String>,
    library_path: Option<PathBuf>,
}

impl PromptToQueryBuilder {
    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = provider.into();
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = key.into();
        self
    }

    /// Inline schema JSON document.
    pub fn schema_json(mut self, schema: impl Into<String>) -> Self {
        self.schema_json = Some(schema.into());
        self
    }

    /// Path to a schema JSON file; read at build time.
    pub fn schema_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.schema_path = Some(path.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Explicit library path, bypassing platform resolution.
    pub fn library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.library_path = Some(path.into());
        self
    }

    pub fn build(self) -> Result<PromptToQuery, BridgeError> {
        let schema = match (self.schema_json, &self.schema_path) {
            (Some(inline), _) => inline,
            (None, Some(path)) => std::fs::read_to_string(path)?,
            (None, None) => {
                return Err(BridgeError::Envelope(
                    "either schema_json or schema_path is required".to_string(),
                ))
            }
        };

        let path = match &self.library_path {
            Some(explicit) => resolve::require_file(explicit)?,
            None => resolve::resolve_current(&resolve::default_search_dirs(), &SystemProbe)?,
        };
        let library = EngineLibrary::open(&path)?;

        let mut config = json!({
            "llm_provider": self.provider,
            "api_key": self.api_key,
            "db_schema": schema,
        });
        if let Some(model) = self.model {
            config["model"] = Value::String(model);
        }

        let engine = library.init(&config.to_string())?;
        Ok(PromptToQuery {
            library,
            engine: Some(engine),
        })
    }
}

impl PromptToQuery {
    pub fn builder() -> PromptToQueryBuilder {
        PromptToQueryBuilder::default()
    }

    /// Generate a MongoDB query from a natural-language prompt.
    pub fn generate_query(&self, prompt: &str) -> Result<QueryResponse, BridgeError> {
        let engine = self
            .engine
            .as_ref()
            .ok_or_else(|| BridgeError::Engine("engine not initialized".to_string()))?;
        let (query, column_titles) = self.library.generate(engine, prompt)?;
        Ok(QueryResponse {
            query,
            column_titles,
        })
    }

    /// The engine library's version string.
    pub fn version(&self) -> Result<String, BridgeError> {
        self.library.version()
    }

    /// Path of the loaded library.
    pub fn library_path(&self) -> &Path {
        self.library.path()
    }
}

impl Drop for PromptToQuery {
    fn drop(&mut self) {
        if let Some(engine) = self.engine.take() {
            self.library.free_engine(engine).ok();
        }
    }
}
