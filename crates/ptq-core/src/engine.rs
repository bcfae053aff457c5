//! The query engine - orchestrates prompt building, provider completion
//! and response parsing.

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::parse::{self, ParseError};
use crate::prompt;
use crate::provider::{Provider, ProviderError, ProviderKind, UnknownProvider};
use crate::query::QueryResult;
use crate::schema::{Schema, SchemaError};

/// Errors from engine construction. The engine is never partially built:
/// a config error leaves the caller with no instance at all.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    UnknownProvider(#[from] UnknownProvider),

    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("schema is empty")]
    EmptySchema,

    #[error("missing API key")]
    MissingApiKey,
}

/// Errors from a single generation. The first failure short-circuits and
/// its message is propagated verbatim; nothing is retried at this layer.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("{0}")]
    Parse(#[from] ParseError),
}

/// The wire shape of an initialization request, as hosts send it across
/// the binary boundary. `db_schema` is a JSON document in string form.
#[derive(Debug, Deserialize)]
pub struct InitRequest {
    pub llm_provider: String,
    pub api_key: String,
    pub db_schema: String,
    #[serde(default)]
    pub model: Option<String>,
}

/// Immutable engine configuration, fixed for the lifetime of an engine
/// instance. Replacing it means constructing a new engine.
#[derive(Clone)]
pub struct EngineConfig {
    pub provider: ProviderKind,
    pub api_key: String,
    pub model: Option<String>,
    pub schema: Schema,
}

// The API key is an opaque secret and must never appear in logs.
impl fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineConfig")
            .field("provider", &self.provider)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("schema", &format_args!("{} collections", self.schema.len()))
            .finish()
    }
}

impl EngineConfig {
    /// Validate and convert an initialization request.
    pub fn from_request(request: InitRequest) -> Result<EngineConfig, EngineError> {
        let provider: ProviderKind = request.llm_provider.parse()?;
        if request.api_key.is_empty() {
            return Err(EngineError::MissingApiKey);
        }
        let schema = Schema::from_json(&request.db_schema)?;

        Ok(EngineConfig {
            provider,
            api_key: request.api_key,
            model: request.model,
            schema,
        })
    }

    /// The model to request: explicit override or the provider default.
    pub fn model(&self) -> &str {
        self.model
            .as_deref()
            .unwrap_or_else(|| self.provider.default_model())
    }
}

/// A ready-to-use query engine. One instance = one provider/schema pairing;
/// all state is immutable after construction, so concurrent `generate`
/// calls are safe.
pub struct QueryEngine {
    config: EngineConfig,
    system_prompt: String,
    provider: Arc<dyn Provider>,
}

impl QueryEngine {
    /// Build an engine from a validated config and a provider capability.
    pub fn new(
        config: EngineConfig,
        provider: Arc<dyn Provider>,
    ) -> Result<QueryEngine, EngineError> {
        if config.schema.is_empty() {
            return Err(EngineError::EmptySchema);
        }

        // The system prompt is deterministic in the schema, so build it once.
        let system_prompt = prompt::build_system_prompt(&config.schema);

        info!(
            provider = %config.provider,
            model = config.model(),
            collections = config.schema.len(),
            "query engine initialized"
        );

        Ok(QueryEngine {
            config,
            system_prompt,
            provider,
        })
    }

    /// Generate a MongoDB query from a natural-language prompt.
    pub async fn generate(&self, user_prompt: &str) -> Result<QueryResult, GenerateError> {
        debug!(prompt = user_prompt, "generating query");

        let user = prompt::build_user_prompt(user_prompt);
        let raw = self
            .provider
            .complete(&self.system_prompt, &user, self.config.model())
            .await?;

        debug!(len = raw.len(), "provider response received");
        let result = parse::parse_response(&raw, &self.config.schema)?;

        info!(
            operation = %result.query.operation,
            collection = %result.query.collection,
            "query generated"
        );
        Ok(result)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::QueryOperation;
    use async_trait::async_trait;
    use serde_json::json;

    /// A provider stub returning canned text.
    struct StubProvider {
        response: Result<String, fn() -> ProviderError>,
    }

    impl StubProvider {
        fn ok(text: &str) -> Arc<dyn Provider> {
            Arc::new(StubProvider {
                response: Ok(text.to_string()),
            })
        }

        fn err(make: fn() -> ProviderError) -> Arc<dyn Provider> {
            Arc::new(StubProvider {
                response: Err(make),
            })
        }
    }

    #[async_trait]
    impl Provider for StubProvider {
        async fn complete(
            &self,
            _system: &str,
            _user: &str,
            _model: &str,
        ) -> Result<String, ProviderError> {
            match &self.response {
                Ok(text) => Ok(text.clone()),
                Err(make) => Err(make()),
            }
        }
    }

    fn users_config() -> EngineConfig {
        EngineConfig::from_request(InitRequest {
            llm_provider: "openai".to_string(),
            api_key: "sk-test".to_string(),
            db_schema: r#"{"users":{"fields":{"name":"string","status":"string"}}}"#.to_string(),
            model: None,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_end_to_end_find() {
        let response = r#"{"query":{"operation":"find","collection":"users","filter":{"status":"active"}},"columnTitles":["Name","Status"]}"#;
        let engine = QueryEngine::new(users_config(), StubProvider::ok(response)).unwrap();

        let result = engine.generate("Get all active users").await.unwrap();
        assert_eq!(result.query.operation, QueryOperation::Find);
        assert_eq!(result.query.collection, "users");
        assert_eq!(result.query.filter, Some(json!({"status": "active"})));
        assert_eq!(result.column_titles, vec!["Name", "Status"]);
    }

    #[tokio::test]
    async fn test_provider_error_propagated_verbatim() {
        let engine = QueryEngine::new(
            users_config(),
            StubProvider::err(|| ProviderError::Api {
                status: 429,
                message: "rate limited".to_string(),
            }),
        )
        .unwrap();

        let err = engine.generate("anything").await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "provider error: API error: 429 - rate limited"
        );
    }

    #[tokio::test]
    async fn test_parse_error_propagated() {
        let engine =
            QueryEngine::new(users_config(), StubProvider::ok("no json here")).unwrap();
        let err = engine.generate("anything").await.unwrap_err();
        assert!(matches!(
            err,
            GenerateError::Parse(ParseError::MalformedResponse)
        ));
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let err = EngineConfig::from_request(InitRequest {
            llm_provider: "gemini".to_string(),
            api_key: "key".to_string(),
            db_schema: r#"{"users":{"fields":{"name":"string"}}}"#.to_string(),
            model: None,
        })
        .unwrap_err();
        assert!(matches!(err, EngineError::UnknownProvider(_)));
    }

    #[test]
    fn test_empty_schema_rejected() {
        let err = EngineConfig::from_request(InitRequest {
            llm_provider: "openai".to_string(),
            api_key: "key".to_string(),
            db_schema: "{}".to_string(),
            model: None,
        })
        .unwrap_err();
        assert!(matches!(err, EngineError::Schema(SchemaError::Empty)));
    }

    #[test]
    fn test_missing_api_key_rejected() {
        let err = EngineConfig::from_request(InitRequest {
            llm_provider: "anthropic".to_string(),
            api_key: String::new(),
            db_schema: r#"{"users":{"fields":{"name":"string"}}}"#.to_string(),
            model: None,
        })
        .unwrap_err();
        assert!(matches!(err, EngineError::MissingApiKey));
    }

    #[test]
    fn test_model_override() {
        let mut config = users_config();
        assert_eq!(config.model(), "gpt-4o");
        config.model = Some("gpt-4-turbo".to_string());
        assert_eq!(config.model(), "gpt-4-turbo");
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let debug = format!("{:?}", users_config());
        assert!(!debug.contains("sk-test"));
        assert!(debug.contains("<redacted>"));
    }
}
