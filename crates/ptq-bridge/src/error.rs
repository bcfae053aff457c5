//! Error types for the host bridge.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from locating, loading or driving the engine library.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// No loadable binary exists for the running platform. The full list of
    /// attempted paths is part of the message: without it this failure is
    /// nearly unrecoverable for the caller.
    #[error("engine library not found; attempted paths: [{}]",
        .attempted.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", "))]
    LibraryNotFound { attempted: Vec<PathBuf> },

    #[error("unsupported platform: {0}")]
    UnsupportedPlatform(String),

    #[error("failed to load engine library {path}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },

    #[error("engine library is missing symbol '{name}': {source}")]
    Symbol {
        name: &'static str,
        #[source]
        source: libloading::Error,
    },

    /// The engine reported an error; the message is carried verbatim from
    /// the `error` key of the envelope.
    #[error("{0}")]
    Engine(String),

    #[error("invalid envelope from engine: {0}")]
    Envelope(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
