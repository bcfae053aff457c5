//! Dynamic loading and call marshaling for the engine library.
//!
//! Binds the five exported symbols and enforces the ownership contract:
//! every caller-owned string coming back across the boundary is copied into
//! Rust memory and released exactly once, immediately.

use std::ffi::{c_char, c_void, CStr, CString};
use std::path::{Path, PathBuf};

use libloading::Library;
use serde::Deserialize;
use tracing::debug;

use crate::error::BridgeError;

type InitFn = unsafe extern "C" fn(*const c_char, *mut *mut c_void) -> *mut c_char;
type GenerateFn = unsafe extern "C" fn(*const c_void, *const c_char) -> *mut c_char;
type VersionFn = unsafe extern "C" fn() -> *const c_char;
type ReleaseFn = unsafe extern "C" fn(*mut c_char);
type EngineFreeFn = unsafe extern "C" fn(*mut c_void);

const SYM_INIT: &[u8] = b"ptq_init\0";
const SYM_GENERATE: &[u8] = b"ptq_generate\0";
const SYM_VERSION: &[u8] = b"ptq_version\0";
const SYM_RELEASE: &[u8] = b"ptq_release\0";
const SYM_ENGINE_FREE: &[u8] = b"ptq_engine_free\0";

/// The result envelope as decoded on the host side. Exactly one of the
/// success payload or `error` is present.
#[derive(Debug, Deserialize)]
struct Envelope {
    error: Option<String>,
    query: Option<String>,
    #[serde(rename = "columnTitles", default)]
    column_titles: Vec<String>,
}

/// An opaque engine handle owned by this bridge.
#[derive(Debug)]
pub struct EngineHandle(*mut c_void);

/// A loaded engine library.
#[derive(Debug)]
pub struct EngineLibrary {
    library: Library,
    path: PathBuf,
}

impl EngineLibrary {
    /// Load the library at `path` and verify all required symbols exist.
    pub fn open(path: &Path) -> Result<EngineLibrary, BridgeError> {
        debug!(path = %path.display(), "loading engine library");
        let library = unsafe { Library::new(path) }.map_err(|source| BridgeError::Load {
            path: path.to_path_buf(),
            source,
        })?;

        let loaded = EngineLibrary {
            library,
            path: path.to_path_buf(),
        };

        // Fail at load time, not first call, if the binary is the wrong shape.
        loaded.init_fn()?;
        loaded.generate_fn()?;
        loaded.version_fn()?;
        loaded.release_fn()?;
        loaded.engine_free_fn()?;

        Ok(loaded)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn init_fn(&self) -> Result<libloading::Symbol<'_, InitFn>, BridgeError> {
        self.symbol(SYM_INIT, "ptq_init")
    }

    fn generate_fn(&self) -> Result<libloading::Symbol<'_, GenerateFn>, BridgeError> {
        self.symbol(SYM_GENERATE, "ptq_generate")
    }

    fn version_fn(&self) -> Result<libloading::Symbol<'_, VersionFn>, BridgeError> {
        self.symbol(SYM_VERSION, "ptq_version")
    }

    fn release_fn(&self) -> Result<libloading::Symbol<'_, ReleaseFn>, BridgeError> {
        self.symbol(SYM_RELEASE, "ptq_release")
    }

    fn engine_free_fn(&self) -> Result<libloading::Symbol<'_, EngineFreeFn>, BridgeError> {
        self.symbol(SYM_ENGINE_FREE, "ptq_engine_free")
    }

    fn symbol<T>(
        &self,
        raw: &[u8],
        name: &'static str,
    ) -> Result<libloading::Symbol<'_, T>, BridgeError> {
        unsafe { self.library.get(raw) }.map_err(|source| BridgeError::Symbol { name, source })
    }

    /// Initialize an engine from a config envelope.
    pub fn init(&self, config_json: &str) -> Result<EngineHandle, BridgeError> {
        let config = CString::new(config_json)
            .map_err(|_| BridgeError::Envelope("config contains NUL byte".to_string()))?;
        let init = self.init_fn()?;

        let mut engine: *mut c_void = std::ptr::null_mut();
        let raw = unsafe { init(config.as_ptr(), &mut engine) };
        let envelope = self.take_envelope(raw)?;

        if let Some(error) = envelope.error {
            return Err(BridgeError::Engine(error));
        }
        if engine.is_null() {
            return Err(BridgeError::Envelope(
                "init succeeded but returned no engine handle".to_string(),
            ));
        }
        Ok(EngineHandle(engine))
    }

    /// Generate a query; returns the decoded query object and column titles.
    pub fn generate(
        &self,
        engine: &EngineHandle,
        prompt: &str,
    ) -> Result<(serde_json::Value, Vec<String>), BridgeError> {
        let prompt = CString::new(prompt)
            .map_err(|_| BridgeError::Envelope("prompt contains NUL byte".to_string()))?;
        let generate = self.generate_fn()?;

        let raw = unsafe { generate(engine.0, prompt.as_ptr()) };
        let envelope = self.take_envelope(raw)?;

        if let Some(error) = envelope.error {
            return Err(BridgeError::Engine(error));
        }
        let encoded = envelope.query.ok_or_else(|| {
            BridgeError::Envelope("generate envelope missing 'query'".to_string())
        })?;
        let query: serde_json::Value = serde_json::from_str(&encoded)?;
        Ok((query, envelope.column_titles))
    }

    /// The engine's version string. Static on the engine side, copied here.
    pub fn version(&self) -> Result<String, BridgeError> {
        let version = self.version_fn()?;
        let raw = unsafe { version() };
        if raw.is_null() {
            return Err(BridgeError::Envelope("null version string".to_string()));
        }
        Ok(unsafe { CStr::from_ptr(raw) }.to_string_lossy().into_owned())
    }

    /// Destroy an engine handle.
    pub fn free_engine(&self, engine: EngineHandle) -> Result<(), BridgeError> {
        let free = self.engine_free_fn()?;
        unsafe { free(engine.0) };
        Ok(())
    }

    /// Copy an owned envelope string into Rust memory, release the original,
    /// and decode it.
    fn take_envelope(&self, raw: *mut c_char) -> Result<Envelope, BridgeError> {
        if raw.is_null() {
            return Err(BridgeError::Envelope(
                "engine returned a null envelope".to_string(),
            ));
        }
        let body = unsafe { CStr::from_ptr(raw) }.to_string_lossy().into_owned();
        let release = self.release_fn()?;
        unsafe { release(raw) };

        serde_json::from_str(&body)
            .map_err(|e| BridgeError::Envelope(format!("{e} in envelope: {body}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_decoding() {
        let envelope: Envelope = serde_json::from_str(
            r#"{"query":"{\"operation\":\"find\",\"collection\":\"users\"}","columnTitles":["Name"]}"#,
        )
        .unwrap();
        assert!(envelope.error.is_none());
        assert_eq!(envelope.column_titles, vec!["Name"]);
        assert!(envelope.query.unwrap().contains("find"));
    }

    #[test]
    fn test_error_envelope_decoding() {
        let envelope: Envelope =
            serde_json::from_str(r#"{"error":"provider error: boom"}"#).unwrap();
        assert_eq!(envelope.error.as_deref(), Some("provider error: boom"));
        assert!(envelope.query.is_none());
        assert!(envelope.column_titles.is_empty());
    }

    #[test]
    fn test_open_missing_file_fails() {
        let err = EngineLibrary::open(Path::new("/nonexistent/libprompttoquery.so")).unwrap_err();
        assert!(matches!(err, BridgeError::Load { .. }));
    }
}
