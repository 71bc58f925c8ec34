//! Encoder executable discovery.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use parking_lot::Mutex;

use super::{EncoderError, EncoderResult};

/// Program name searched for on `PATH`.
pub const ENCODER_PROGRAM: &str = "ffmpeg";

/// Well-known install locations for the current platform.
pub fn known_paths() -> Vec<PathBuf> {
    let paths: &[&str] = if cfg!(target_os = "macos") {
        &[
            "/opt/homebrew/bin/ffmpeg",
            "/usr/local/bin/ffmpeg",
            "/opt/local/bin/ffmpeg",
        ]
    } else if cfg!(target_os = "windows") {
        &[
            r"C:\ffmpeg\bin\ffmpeg.exe",
            r"C:\Program Files\ffmpeg\bin\ffmpeg.exe",
            r"C:\tools\ffmpeg\bin\ffmpeg.exe",
        ]
    } else {
        &[
            "/usr/bin/ffmpeg",
            "/usr/local/bin/ffmpeg",
            "/snap/bin/ffmpeg",
        ]
    };
    paths.iter().map(PathBuf::from).collect()
}

/// Resolves the encoder executable and caches the first hit.
///
/// Search order:
/// 1. explicitly configured path
/// 2. platform install locations that exist and answer `-version`
/// 3. `PATH` lookup
/// 4. the system `which` (or `where` on Windows) command
#[derive(Debug)]
pub struct EncoderLocator {
    program: String,
    explicit: Option<PathBuf>,
    known: Vec<PathBuf>,
    /// `None` means the process `PATH`.
    search_path: Option<OsString>,
    system_lookup: bool,
    cached: Mutex<Option<PathBuf>>,
}

impl EncoderLocator {
    pub fn new() -> Self {
        Self {
            program: ENCODER_PROGRAM.to_string(),
            explicit: None,
            known: known_paths(),
            search_path: None,
            system_lookup: true,
            cached: Mutex::new(None),
        }
    }

    /// Use a configured encoder path before searching.
    pub fn with_explicit_path(mut self, path: Option<PathBuf>) -> Self {
        self.explicit = path;
        self
    }

    /// Replace the platform install locations.
    pub fn with_known_paths(mut self, paths: Vec<PathBuf>) -> Self {
        self.known = paths;
        self
    }

    /// Search this `PATH`-style value instead of the process environment.
    pub fn with_search_path(mut self, path: impl Into<OsString>) -> Self {
        self.search_path = Some(path.into());
        self
    }

    /// Skip the `which`/`where` fallback.
    pub fn without_system_lookup(mut self) -> Self {
        self.system_lookup = false;
        self
    }

    /// Program name being searched for.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Previously resolved path, if any.
    pub fn cached(&self) -> Option<PathBuf> {
        self.cached.lock().clone()
    }

    /// Resolve the encoder, reusing an earlier hit.
    pub fn locate(&self) -> EncoderResult<PathBuf> {
        let mut cached = self.cached.lock();
        if let Some(path) = cached.as_ref() {
            return Ok(path.clone());
        }

        let found = self.search()?;
        tracing::info!("Using encoder: {}", found.display());
        *cached = Some(found.clone());
        Ok(found)
    }

    fn search(&self) -> EncoderResult<PathBuf> {
        let mut searched = Vec::new();

        if let Some(explicit) = &self.explicit {
            if explicit.is_file() {
                return Ok(explicit.clone());
            }
            tracing::warn!(
                "Configured encoder {} does not exist, searching instead",
                explicit.display()
            );
            searched.push(explicit.display().to_string());
        }

        for candidate in &self.known {
            if candidate.is_file() && answers_version(candidate) {
                return Ok(candidate.clone());
            }
            searched.push(candidate.display().to_string());
        }

        let path_var = self
            .search_path
            .clone()
            .or_else(|| std::env::var_os("PATH"));
        if let Some(path_var) = path_var.filter(|p| !p.is_empty()) {
            let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
            match which::which_in(&self.program, Some(path_var), cwd) {
                Ok(found) => return Ok(found),
                Err(e) => tracing::debug!("PATH lookup for {} failed: {}", self.program, e),
            }
        }
        searched.push("PATH".to_string());

        if self.system_lookup {
            if let Some(found) = system_lookup(&self.program) {
                return Ok(found);
            }
            searched.push(SYSTEM_LOOKUP.to_string());
        }

        Err(EncoderError::NotFound {
            program: self.program.clone(),
            searched: searched.join(", "),
        })
    }
}

impl Default for EncoderLocator {
    fn default() -> Self {
        Self::new()
    }
}

const SYSTEM_LOOKUP: &str = if cfg!(target_os = "windows") {
    "where"
} else {
    "which"
};

fn answers_version(path: &Path) -> bool {
    Command::new(path)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Ask the OS lookup command; first line of output wins.
fn system_lookup(program: &str) -> Option<PathBuf> {
    let output = Command::new(SYSTEM_LOOKUP)
        .arg(program)
        .stderr(Stdio::null())
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(PathBuf::from)
        .filter(|p| p.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    #[cfg(unix)]
    use crate::encoder::testing::write_script;
    use tempfile::tempdir;

    fn hermetic(search_path: &Path) -> EncoderLocator {
        EncoderLocator::new()
            .with_known_paths(Vec::new())
            .with_search_path(search_path.as_os_str())
            .without_system_lookup()
    }

    #[test]
    fn not_found_lists_searched_locations() {
        let empty = tempdir().unwrap();
        let locator = hermetic(empty.path());

        let err = locator.locate().unwrap_err();
        match err {
            EncoderError::NotFound { program, searched } => {
                assert_eq!(program, "ffmpeg");
                assert!(searched.contains("PATH"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(locator.cached().is_none());
    }

    #[test]
    fn explicit_path_wins() {
        let dir = tempdir().unwrap();
        let exe = dir.path().join("my-ffmpeg");
        std::fs::write(&exe, "").unwrap();

        let empty = tempdir().unwrap();
        let locator = hermetic(empty.path()).with_explicit_path(Some(exe.clone()));
        assert_eq!(locator.locate().unwrap(), exe);
    }

    #[test]
    fn missing_explicit_path_falls_through() {
        let empty = tempdir().unwrap();
        let locator = hermetic(empty.path())
            .with_explicit_path(Some(empty.path().join("nope")));
        assert!(matches!(
            locator.locate(),
            Err(EncoderError::NotFound { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn path_lookup_is_cached() {
        let bin = tempdir().unwrap();
        let exe = write_script(bin.path(), "ffmpeg", "exit 0\n");

        let locator = hermetic(bin.path());
        let found = locator.locate().unwrap();
        assert_eq!(found.file_name().unwrap(), "ffmpeg");
        assert_eq!(locator.cached(), Some(found.clone()));

        // Cached result survives the executable disappearing
        std::fs::remove_file(&exe).unwrap();
        assert_eq!(locator.locate().unwrap(), found);
    }

    #[cfg(unix)]
    #[test]
    fn known_path_must_answer_version() {
        let dir = tempdir().unwrap();
        let broken = write_script(dir.path(), "broken-ffmpeg", "exit 1\n");
        let working = write_script(dir.path(), "working-ffmpeg", "exit 0\n");

        let empty = tempdir().unwrap();
        let locator = hermetic(empty.path()).with_known_paths(vec![broken, working.clone()]);
        assert_eq!(locator.locate().unwrap(), working);
    }

    #[test]
    fn platform_table_is_not_empty() {
        assert!(!known_paths().is_empty());
    }
}
