//! Configuration for the external Krakatau install.
//!
//! The config is a small JSON document (see `KrakatauConfig`). Frontends load it
//! from disk and may layer environment overrides on top before handing it to
//! the disassembler.

use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::model::DisassemblyError;

/// Environment variable overriding the interpreter location.
pub const ENV_PYTHON: &str = "KRAKATAU_PYTHON";
/// Environment variable overriding the Krakatau install directory.
pub const ENV_INSTALL_DIR: &str = "KRAKATAU_DIR";
/// Environment variable overriding the process timeout (seconds, `0` disables).
pub const ENV_TIMEOUT_SECS: &str = "KRAKATAU_TIMEOUT_SECS";

/// Message surfaced when no interpreter is configured.
pub const PYTHON_NOT_SET: &str = "You need to set the location of Python 2.x";

fn default_install_dir() -> PathBuf {
    PathBuf::from("Krakatau")
}

fn default_script() -> String {
    "disassemble.py".to_string()
}

fn default_optimize() -> bool {
    true
}

fn default_config_version() -> String {
    "0.1.0".to_string()
}

/// Serializable configuration describing how to invoke Krakatau.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KrakatauConfig {
    /// Schema/config version. This is about the config format, not the tool version.
    #[serde(default = "default_config_version")]
    pub config_version: String,
    /// Python 2 interpreter: an absolute/relative path or a bare name looked up on PATH.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub python: Option<PathBuf>,
    /// Krakatau checkout; used as the working directory of the subprocess.
    #[serde(default = "default_install_dir")]
    pub install_dir: PathBuf,
    /// Script run by the interpreter, relative to `install_dir`.
    #[serde(default = "default_script")]
    pub script: String,
    /// Pass `-O` to the interpreter.
    #[serde(default = "default_optimize")]
    pub optimize: bool,
    /// Upper bound on a single disassembler run. `None` waits indefinitely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    /// Directory for the temp bundles. Defaults to the system temp dir.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temp_dir: Option<PathBuf>,
}

impl Default for KrakatauConfig {
    fn default() -> Self {
        Self {
            config_version: default_config_version(),
            python: None,
            install_dir: default_install_dir(),
            script: default_script(),
            optimize: default_optimize(),
            timeout_secs: None,
            temp_dir: None,
        }
    }
}

impl KrakatauConfig {
    pub fn with_python(mut self, python: impl Into<PathBuf>) -> Self {
        self.python = Some(python.into());
        self
    }

    pub fn with_install_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.install_dir = dir.into();
        self
    }

    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    pub fn with_timeout_secs(mut self, secs: Option<u64>) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Load a config from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read Krakatau config at {}", path.display()))?;
        let config: KrakatauConfig =
            serde_json::from_str(&json).context("Failed to parse Krakatau config JSON")?;
        Ok(config)
    }

    /// Write the config as pretty JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write Krakatau config at {}", path.display()))?;
        Ok(())
    }

    /// Apply `KRAKATAU_*` overrides from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| env::var_os(key))
    }

    /// Apply `KRAKATAU_*` overrides from an arbitrary lookup.
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<OsString>,
    {
        if let Some(python) = lookup(ENV_PYTHON).filter(|v| !v.is_empty()) {
            self.python = Some(PathBuf::from(python));
        }
        if let Some(dir) = lookup(ENV_INSTALL_DIR).filter(|v| !v.is_empty()) {
            self.install_dir = PathBuf::from(dir);
        }
        if let Some(secs) = lookup(ENV_TIMEOUT_SECS).and_then(|v| v.to_str()?.trim().parse().ok())
        {
            self.timeout_secs = if secs == 0 { None } else { Some(secs) };
        }
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Resolve the interpreter to an existing file, as an absolute path.
    ///
    /// A value containing a path separator must point at a file (relative
    /// values are taken against the current directory); a bare name is
    /// searched on `PATH`. Symlinks are kept as-is so virtualenv interpreters
    /// still see their own prefix.
    pub fn resolve_interpreter(&self) -> Result<PathBuf, DisassemblyError> {
        let python = self
            .python
            .as_ref()
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or_else(|| DisassemblyError::Configuration(PYTHON_NOT_SET.to_string()))?;

        if python.components().count() > 1 || python.is_absolute() {
            if python.is_file() {
                return absolute_interpreter(python.clone());
            }
            return Err(DisassemblyError::Configuration(format!(
                "Python 2.x interpreter not found at {}",
                python.display()
            )));
        }

        let found = find_in_path(python).ok_or_else(|| {
            DisassemblyError::Configuration(format!(
                "Python 2.x interpreter '{}' not found on PATH",
                python.display()
            ))
        })?;
        absolute_interpreter(found)
    }
}

// The subprocess runs in the install dir, so a relative program would be
// looked up there instead of where it was found.
fn absolute_interpreter(path: PathBuf) -> Result<PathBuf, DisassemblyError> {
    if path.is_absolute() {
        return Ok(path);
    }
    let cwd = env::current_dir().map_err(|e| {
        DisassemblyError::Configuration(format!("Failed to get current directory: {e}"))
    })?;
    Ok(cwd.join(path))
}

fn find_in_path(executable: &Path) -> Option<PathBuf> {
    env::var_os("PATH").and_then(|paths| {
        env::split_paths(&paths).find_map(|p| {
            let candidate = p.join(executable);
            if candidate.is_file() {
                return Some(candidate);
            }
            if cfg!(windows) {
                let exe = candidate.with_extension("exe");
                if exe.is_file() {
                    return Some(exe);
                }
            }
            None
        })
    })
}
