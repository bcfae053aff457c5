//! Library resolution - a total function from (platform, arch, libc) to a
//! ranked candidate list, plus an ordered directory search.
//!
//! Candidate order: libc-variant-specific name first (Linux only), then the
//! architecture-specific name, then the generic fallback. A specific
//! candidate is preferred in any directory before a more generic one is
//! considered anywhere.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::BridgeError;
use crate::probe::Libc;

/// Base name of the engine library; platforms decorate it differently.
const BASE_NAME: &str = "prompttoquery";

/// Operating systems the engine ships for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Linux,
    MacOs,
    Windows,
}

impl Platform {
    /// Detect the running platform.
    pub fn current() -> Result<Platform, BridgeError> {
        match std::env::consts::OS {
            "linux" => Ok(Platform::Linux),
            "macos" => Ok(Platform::MacOs),
            "windows" => Ok(Platform::Windows),
            other => Err(BridgeError::UnsupportedPlatform(other.to_string())),
        }
    }
}

/// CPU architectures with dedicated builds; anything else uses the
/// generic fallback name only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arch {
    Amd64,
    Arm64,
    Other,
}

impl Arch {
    pub fn current() -> Arch {
        match std::env::consts::ARCH {
            "x86_64" => Arch::Amd64,
            "aarch64" => Arch::Arm64,
            _ => Arch::Other,
        }
    }

    fn suffix(&self) -> Option<&'static str> {
        match self {
            Arch::Amd64 => Some("amd64"),
            Arch::Arm64 => Some("arm64"),
            Arch::Other => None,
        }
    }
}

/// Ranked candidate file names for the engine library.
pub fn candidate_names(platform: Platform, arch: Arch, libc: Libc) -> Vec<String> {
    let mut names = Vec::new();

    match platform {
        Platform::Linux => {
            if let Some(arch) = arch.suffix() {
                if libc == Libc::Musl {
                    names.push(format!("lib{BASE_NAME}_linux_{arch}_musl.so"));
                }
                names.push(format!("lib{BASE_NAME}_linux_{arch}.so"));
            }
            names.push(format!("lib{BASE_NAME}.so"));
        }
        Platform::MacOs => {
            if let Some(arch) = arch.suffix() {
                names.push(format!("lib{BASE_NAME}_darwin_{arch}.dylib"));
            }
            names.push(format!("lib{BASE_NAME}.dylib"));
        }
        Platform::Windows => {
            if let Some(arch) = arch.suffix() {
                names.push(format!("{BASE_NAME}_windows_{arch}.dll"));
            }
            names.push(format!("{BASE_NAME}.dll"));
        }
    }

    names
}

/// Directories searched in order: the package-local library directory next
/// to the running executable, then development build output, then the
/// current directory.
pub fn default_search_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::new();

    if let Ok(exe) = std::env::current_exe() {
        if let Some(parent) = exe.parent() {
            dirs.push(parent.join("lib"));
            dirs.push(parent.to_path_buf());
        }
    }

    dirs.push(PathBuf::from("target/release"));
    dirs.push(PathBuf::from("target/debug"));

    if let Ok(cwd) = std::env::current_dir() {
        dirs.push(cwd);
    }

    dirs
}

/// Find the first existing candidate. On failure the error carries every
/// path attempted, in search order.
pub fn resolve(dirs: &[PathBuf], names: &[String]) -> Result<PathBuf, BridgeError> {
    let mut attempted = Vec::new();

    for name in names {
        for dir in dirs {
            let path = dir.join(name);
            if path.is_file() {
                debug!(path = %path.display(), "resolved engine library");
                return Ok(path);
            }
            attempted.push(path);
        }
    }

    Err(BridgeError::LibraryNotFound { attempted })
}

/// Resolve using the running platform, architecture and libc.
pub fn resolve_current(
    dirs: &[PathBuf],
    probe: &dyn crate::probe::LibcProbe,
) -> Result<PathBuf, BridgeError> {
    let platform = Platform::current()?;
    let libc = match platform {
        Platform::Linux => crate::probe::detect_libc(probe),
        _ => Libc::Gnu,
    };
    let names = candidate_names(platform, Arch::current(), libc);
    resolve(dirs, &names)
}

/// Convenience check used by clients given an explicit library path.
pub fn require_file(path: &Path) -> Result<PathBuf, BridgeError> {
    if path.is_file() {
        Ok(path.to_path_buf())
    } else {
        Err(BridgeError::LibraryNotFound {
            attempted: vec![path.to_path_buf()],
        })
    }
}
