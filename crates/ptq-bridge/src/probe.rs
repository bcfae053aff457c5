//! Runtime libc detection for Linux.
//!
//! Linux ships two incompatible libc ABIs (glibc and musl) and the engine
//! binary must match. Detection is an ordered probe: a filesystem marker
//! that uniquely identifies musl, then the dynamic linker's own version
//! report, then assume glibc. The two checks are injected through a trait
//! so resolution stays a deterministic, testable function.

/// The libc variant of the running Linux system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Libc {
    Gnu,
    Musl,
}

/// Injected primitive checks backing libc detection.
pub trait LibcProbe {
    /// Whether a musl dynamic-linker marker file exists (`/lib/ld-musl-*`).
    fn musl_marker_exists(&self) -> bool;

    /// Combined output of `ldd --version`, if the command could be run.
    fn ldd_version_output(&self) -> Option<String>;
}

/// Detect the libc variant through an ordered probe.
pub fn detect_libc(probe: &dyn LibcProbe) -> Libc {
    if probe.musl_marker_exists() {
        return Libc::Musl;
    }
    if let Some(output) = probe.ldd_version_output() {
        if output.to_lowercase().contains("musl") {
            return Libc::Musl;
        }
    }
    Libc::Gnu
}

/// The real probe against the running system.
pub struct SystemProbe;

impl LibcProbe for SystemProbe {
    fn musl_marker_exists(&self) -> bool {
        std::fs::read_dir("/lib")
            .map(|entries| {
                entries
                    .flatten()
                    .any(|e| e.file_name().to_string_lossy().starts_with("ld-musl-"))
            })
            .unwrap_or(false)
    }

    fn ldd_version_output(&self) -> Option<String> {
        let output = std::process::Command::new("ldd")
            .arg("--version")
            .output()
            .ok()?;
        // musl's ldd reports on stderr.
        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        Some(text)
    }
}
