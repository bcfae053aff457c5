//! # prompt-to-query core
//!
//! Turns a natural-language sentence into a structured MongoDB query using
//! an LLM completion capability.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐    ┌────────────────┐    ┌──────────┐    ┌─────────────────┐
//! │  Schema  │ -> │ Prompt Builder │ -> │ Provider │ -> │ Parse & Validate│
//! └──────────┘    └────────────────┘    └──────────┘    └─────────────────┘
//!                          orchestrated by QueryEngine
//! ```
//!
//! The core is transport-free: concrete OpenAI/Anthropic clients live in
//! `ptq-providers` and plug in through the [`Provider`] trait.
//!
//! ## Usage
//!
//! ```ignore
//! use ptq_core::{EngineConfig, InitRequest, QueryEngine};
//!
//! let config = EngineConfig::from_request(request)?;
//! let engine = QueryEngine::new(config, provider)?;
//! let result = engine.generate("Get all active users").await?;
//! ```

mod engine;
mod parse;
pub mod prompt;
mod provider;
mod query;
mod schema;

pub use engine::{EngineConfig, EngineError, GenerateError, InitRequest, QueryEngine};
pub use parse::{parse_response, ParseError};
pub use provider::{Provider, ProviderError, ProviderKind, UnknownProvider};
pub use query::{GeneratedQuery, QueryOperation, QueryResult};
pub use schema::{Collection, FieldSpec, FieldType, Schema, SchemaError};
