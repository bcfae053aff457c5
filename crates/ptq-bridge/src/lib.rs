//! # prompt-to-query host bridge
//!
//! Locates the correct engine binary for the running platform, architecture
//! and (on Linux) libc variant, loads it, and marshals JSON envelopes across
//! the C boundary. This is the reference implementation of the resolution
//! algorithm every host-language wrapper follows.
//!
//! ## Resolution
//!
//! 1. Detect platform and architecture; on Linux, probe the libc variant
//!    (musl marker file, then `ldd --version` output, then assume glibc).
//! 2. Rank candidate file names: libc-variant-specific, then
//!    architecture-specific, then the generic fallback.
//! 3. Search the package-local library directory, then development build
//!    output, then the current directory; load the first match.
//!
//! A failed resolution reports every path attempted.

mod client;
mod error;
mod loader;
mod probe;
mod resolve;

pub use client::{PromptToQuery, PromptToQueryBuilder, QueryResponse};
pub use error::BridgeError;
pub use loader::{EngineHandle, EngineLibrary};
pub use probe::{detect_libc, Libc, LibcProbe, SystemProbe};
pub use resolve::{candidate_names, default_search_dirs, resolve, resolve_current, Arch, Platform};
