//! C-ABI surface for the prompt-to-query engine.
//!
//! Ownership contract: every string returned by `ptq_init` and
//! `ptq_generate` is owned by the caller and must be passed to
//! `ptq_release` exactly once. `ptq_version` returns a static string that
//! must NOT be released. Engine handles come out of `ptq_init` through an
//! out-parameter and are destroyed with `ptq_engine_free`. There are no
//! finalizers on this side of the boundary.
//!
//! There is no process-global engine: each `ptq_init` call yields an
//! independent handle, so one process can drive several engines at once.

mod envelope;

use std::ffi::{c_char, CStr, CString};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Once;

use tracing::warn;

use ptq_core::{EngineConfig, InitRequest, QueryEngine};

/// Opaque engine handle handed across the boundary.
///
/// Holds the engine plus the runtime that drives its async provider; the
/// boundary itself is fully synchronous.
pub struct PtqEngine {
    engine: QueryEngine,
    runtime: tokio::runtime::Runtime,
}

static VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "\0");
static INIT_TRACING: Once = Once::new();

/// Initialize an engine from a JSON config envelope.
///
/// On success writes a non-null handle through `engine_out` and returns
/// `{}`; on failure writes null and returns `{"error": "..."}`. The
/// returned string is caller-owned in both cases.
///
/// # Safety
/// `config_json` must be null or a valid NUL-terminated UTF-8 string;
/// `engine_out` must be a valid pointer.
#[no_mangle]
pub unsafe extern "C" fn ptq_init(
    config_json: *const c_char,
    engine_out: *mut *mut PtqEngine,
) -> *mut c_char {
    if engine_out.is_null() {
        return to_owned_cstr(envelope::error("engine_out pointer is null"));
    }
    *engine_out = std::ptr::null_mut();

    INIT_TRACING.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init()
            .ok();
    });

    let raw = match read_cstr(config_json) {
        Ok(raw) => raw,
        Err(message) => return to_owned_cstr(envelope::error(message)),
    };

    let built = panic::catch_unwind(|| build_engine(raw));
    match built {
        Ok(Ok(engine)) => {
            *engine_out = Box::into_raw(Box::new(engine));
            to_owned_cstr(envelope::init_success())
        }
        Ok(Err(message)) => to_owned_cstr(envelope::error(&message)),
        Err(_) => to_owned_cstr(envelope::error("internal panic during init")),
    }
}

fn build_engine(config_json: &str) -> Result<PtqEngine, String> {
    let request: InitRequest =
        serde_json::from_str(config_json).map_err(|e| format!("invalid config JSON: {e}"))?;

    let config = EngineConfig::from_request(request).map_err(|e| e.to_string())?;
    let provider =
        ptq_providers::provider_for(config.provider, &config.api_key).map_err(|e| e.to_string())?;
    let engine = QueryEngine::new(config, provider).map_err(|e| e.to_string())?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("failed to build runtime: {e}"))?;

    Ok(PtqEngine { engine, runtime })
}

/// Generate a query from a natural-language prompt.
///
/// The prompt is raw text, not JSON-wrapped. Returns a caller-owned
/// envelope: `{"query": "<JSON>", "columnTitles": [...]}` or
/// `{"error": "..."}`.
///
/// # Safety
/// `engine` must be null or a handle from `ptq_init` that has not been
/// freed; `prompt` must be null or a valid NUL-terminated UTF-8 string.
#[no_mangle]
pub unsafe extern "C" fn ptq_generate(
    engine: *const PtqEngine,
    prompt: *const c_char,
) -> *mut c_char {
    let handle = match engine.as_ref() {
        Some(handle) => handle,
        None => return to_owned_cstr(envelope::error("engine not initialized")),
    };
    let prompt = match read_cstr(prompt) {
        Ok(prompt) => prompt,
        Err(message) => return to_owned_cstr(envelope::error(message)),
    };

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        handle.runtime.block_on(handle.engine.generate(prompt))
    }));

    let body = match outcome {
        Ok(Ok(result)) => envelope::generate_success(&result),
        Ok(Err(e)) => envelope::error(&e.to_string()),
        Err(_) => {
            warn!("generate panicked");
            envelope::error("internal panic during generate")
        }
    };
    to_owned_cstr(body)
}

/// Static semantic-version string. Never errors, never released.
#[no_mangle]
pub extern "C" fn ptq_version() -> *const c_char {
    VERSION.as_ptr() as *const c_char
}

/// Release a string previously returned by `ptq_init` or `ptq_generate`.
/// Null is a no-op.
///
/// # Safety
/// `s` must be null or a pointer obtained from this library that has not
/// already been released.
#[no_mangle]
pub unsafe extern "C" fn ptq_release(s: *mut c_char) {
    if s.is_null() {
        return;
    }
    drop(CString::from_raw(s));
}

/// Destroy an engine handle. Null is a no-op.
///
/// # Safety
/// `engine` must be null or a handle from `ptq_init` that has not already
/// been freed, with no generate call in flight.
#[no_mangle]
pub unsafe extern "C" fn ptq_engine_free(engine: *mut PtqEngine) {
    if engine.is_null() {
        return;
    }
    drop(Box::from_raw(engine));
}

unsafe fn read_cstr<'a>(ptr: *const c_char) -> Result<&'a str, &'static str> {
    if ptr.is_null() {
        return Err("null pointer passed across boundary");
    }
    CStr::from_ptr(ptr)
        .to_str()
        .map_err(|_| "invalid UTF-8 passed across boundary")
}

fn to_owned_cstr(body: String) -> *mut c_char {
    // JSON envelopes never contain NUL, but never panic across the boundary.
    match CString::new(body) {
        Ok(s) => s.into_raw(),
        Err(_) => CString::new(r#"{"error":"interior NUL in envelope"}"#)
            .map(CString::into_raw)
            .unwrap_or(std::ptr::null_mut()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    unsafe fn envelope_from(ptr: *mut c_char) -> Value {
        assert!(!ptr.is_null());
        let value: Value = serde_json::from_str(CStr::from_ptr(ptr).to_str().unwrap()).unwrap();
        ptq_release(ptr);
        value
    }

    fn config(provider: &str, schema: &str) -> CString {
        CString::new(
            json!({
                "llm_provider": provider,
                "api_key": "sk-test",
                "db_schema": schema,
            })
            .to_string(),
        )
        .unwrap()
    }

    const USERS_SCHEMA: &str = r#"{"users":{"fields":{"name":"string","status":"string"}}}"#;

    #[test]
    fn test_init_success_returns_empty_envelope_and_handle() {
        let config = config("openai", USERS_SCHEMA);
        let mut engine: *mut PtqEngine = std::ptr::null_mut();
        let result = unsafe { ptq_init(config.as_ptr(), &mut engine) };
        let value = unsafe { envelope_from(result) };

        assert_eq!(value, json!({}));
        assert!(!engine.is_null());
        unsafe { ptq_engine_free(engine) };
    }

    #[test]
    fn test_init_unknown_provider_fails_with_null_handle() {
        let config = config("gemini", USERS_SCHEMA);
        let mut engine: *mut PtqEngine = std::ptr::null_mut();
        let result = unsafe { ptq_init(config.as_ptr(), &mut engine) };
        let value = unsafe { envelope_from(result) };

        assert!(value["error"].as_str().unwrap().contains("unknown provider"));
        assert!(engine.is_null());
    }

    #[test]
    fn test_init_empty_schema_fails() {
        let config = config("openai", "{}");
        let mut engine: *mut PtqEngine = std::ptr::null_mut();
        let result = unsafe { ptq_init(config.as_ptr(), &mut engine) };
        let value = unsafe { envelope_from(result) };

        assert!(value["error"].as_str().unwrap().contains("empty"));
        assert!(engine.is_null());
    }

    #[test]
    fn test_init_malformed_config_fails() {
        let config = CString::new("not json").unwrap();
        let mut engine: *mut PtqEngine = std::ptr::null_mut();
        let result = unsafe { ptq_init(config.as_ptr(), &mut engine) };
        let value = unsafe { envelope_from(result) };

        assert!(value["error"].as_str().unwrap().contains("invalid config JSON"));
        assert!(engine.is_null());
    }

    #[test]
    fn test_init_null_config_fails() {
        let mut engine: *mut PtqEngine = std::ptr::null_mut();
        let result = unsafe { ptq_init(std::ptr::null(), &mut engine) };
        let value = unsafe { envelope_from(result) };

        assert!(value["error"].as_str().unwrap().contains("null pointer"));
        assert!(engine.is_null());
    }

    #[test]
    fn test_generate_without_engine_is_not_initialized() {
        let prompt = CString::new("Get all active users").unwrap();
        let result = unsafe { ptq_generate(std::ptr::null(), prompt.as_ptr()) };
        let value = unsafe { envelope_from(result) };

        assert_eq!(value["error"], "engine not initialized");
    }

    #[test]
    fn test_generate_null_prompt_fails() {
        let config = config("anthropic", USERS_SCHEMA);
        let mut engine: *mut PtqEngine = std::ptr::null_mut();
        let init_result = unsafe { ptq_init(config.as_ptr(), &mut engine) };
        unsafe { ptq_release(init_result) };
        assert!(!engine.is_null());

        let result = unsafe { ptq_generate(engine, std::ptr::null()) };
        let value = unsafe { envelope_from(result) };
        assert!(value["error"].as_str().unwrap().contains("null pointer"));

        unsafe { ptq_engine_free(engine) };
    }

    #[test]
    fn test_independent_engines_coexist() {
        let first_config = config("openai", USERS_SCHEMA);
        let second_config = config("anthropic", USERS_SCHEMA);

        let mut first: *mut PtqEngine = std::ptr::null_mut();
        let mut second: *mut PtqEngine = std::ptr::null_mut();
        let first_init = unsafe { ptq_init(first_config.as_ptr(), &mut first) };
        let second_init = unsafe { ptq_init(second_config.as_ptr(), &mut second) };
        assert_eq!(unsafe { envelope_from(first_init) }, json!({}));
        assert_eq!(unsafe { envelope_from(second_init) }, json!({}));

        // Distinct live handles, no shared global state.
        assert!(!first.is_null());
        assert!(!second.is_null());
        assert_ne!(first, second);

        // Both handles answer generate calls independently.
        let result = unsafe { ptq_generate(first, std::ptr::null()) };
        assert!(unsafe { envelope_from(result) }["error"]
            .as_str()
            .unwrap()
            .contains("null pointer"));
        let result = unsafe { ptq_generate(second, std::ptr::null()) };
        assert!(unsafe { envelope_from(result) }["error"]
            .as_str()
            .unwrap()
            .contains("null pointer"));

        // Freeing one engine leaves the other usable.
        unsafe { ptq_engine_free(first) };
        let result = unsafe { ptq_generate(second, std::ptr::null()) };
        assert!(unsafe { envelope_from(result) }["error"]
            .as_str()
            .unwrap()
            .contains("null pointer"));
        unsafe { ptq_engine_free(second) };
    }

    #[test]
    fn test_version_is_semver() {
        let version = unsafe { CStr::from_ptr(ptq_version()) }.to_str().unwrap();
        assert_eq!(version, env!("CARGO_PKG_VERSION"));
        assert_eq!(version.split('.').count(), 3);
    }

    #[test]
    fn test_release_and_free_tolerate_null() {
        unsafe {
            ptq_release(std::ptr::null_mut());
            ptq_engine_free(std::ptr::null_mut());
        }
    }
}
