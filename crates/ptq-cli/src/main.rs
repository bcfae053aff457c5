//! ptq - command-line host for the prompt-to-query engine.
//!
//! Drives the engine natively (no binary boundary): useful for trying
//! schemas and prompts before wiring up a host-language SDK.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use ptq_core::{EngineConfig, InitRequest, QueryEngine, Schema};

/// Translate natural language into MongoDB queries
#[derive(Parser)]
#[command(name = "ptq")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a query from a natural-language prompt
    Generate {
        /// Schema JSON file
        #[arg(short, long)]
        schema: PathBuf,
        /// LLM provider: openai or anthropic
        #[arg(short, long, default_value = "openai")]
        provider: String,
        /// Model override (provider default if omitted)
        #[arg(short, long)]
        model: Option<String>,
        /// The natural-language request
        prompt: String,
    },

    /// Validate a schema JSON file
    Check {
        /// Schema JSON file
        schema: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "warn" };
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();

    let result = match cli.command {
        Commands::Generate {
            schema,
            provider,
            model,
            prompt,
        } => generate(&schema, &provider, model, &prompt),
        Commands::Check { schema } => check(&schema),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn generate(
    schema_path: &Path,
    provider: &str,
    model: Option<String>,
    prompt: &str,
) -> Result<(), String> {
    let db_schema = std::fs::read_to_string(schema_path)
        .map_err(|e| format!("cannot read {}: {e}", schema_path.display()))?;
    let api_key = api_key_for(provider)?;

    let config = EngineConfig::from_request(InitRequest {
        llm_provider: provider.to_string(),
        api_key,
        db_schema,
        model,
    })
    .map_err(|e| e.to_string())?;

    let transport =
        ptq_providers::provider_for(config.provider, &config.api_key).map_err(|e| e.to_string())?;
    let engine = QueryEngine::new(config, transport).map_err(|e| e.to_string())?;

    let result = tokio::runtime::Runtime::new()
        .map_err(|e| e.to_string())?
        .block_on(engine.generate(prompt))
        .map_err(|e| e.to_string())?;

    let query =
        serde_json::to_string_pretty(&result.query).map_err(|e| e.to_string())?;
    println!("{query}");
    if !result.column_titles.is_empty() {
        println!("columns: {}", result.column_titles.join(", "));
    }
    Ok(())
}

fn check(schema_path: &Path) -> Result<(), String> {
    let raw = std::fs::read_to_string(schema_path)
        .map_err(|e| format!("cannot read {}: {e}", schema_path.display()))?;
    let schema = Schema::from_json(&raw).map_err(|e| e.to_string())?;

    for (name, collection) in schema.collections() {
        println!("{name}: {} fields", collection.fields.len());
    }
    Ok(())
}

/// API-key environment conventions live in hosts, not the engine.
fn api_key_for(provider: &str) -> Result<String, String> {
    let var = match provider.to_ascii_lowercase().as_str() {
        "openai" => "OPENAI_API_KEY",
        "anthropic" => "ANTHROPIC_API_KEY",
        other => return Err(format!("unknown provider '{other}'")),
    };
    std::env::var(var).map_err(|_| format!("set {var} to use the {provider} provider"))
}
