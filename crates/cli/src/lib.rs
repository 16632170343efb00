use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use disasm_core::config::KrakatauConfig;
use disasm_core::services::classes::{ArchiveClassSource, ClassSource, DirectoryClassSource};
use sha2::{Digest, Sha256};

pub mod commands;

/// Directory (relative to the working directory) holding the CLI's config.
pub const CONFIG_DIR: &str = ".class-disasm";
/// File name of the Krakatau config inside `CONFIG_DIR`.
pub const CONFIG_FILE: &str = "krakatau.json";

/// Default config location: `./.class-disasm/krakatau.json`.
pub fn default_config_path() -> Result<PathBuf> {
    let cwd = env::current_dir().context("Failed to get current directory")?;
    Ok(cwd.join(CONFIG_DIR).join(CONFIG_FILE))
}

/// Load the Krakatau config and apply `KRAKATAU_*` environment overrides.
///
/// An explicit path must exist. Without one, the default location is used if
/// present, otherwise built-in defaults.
pub fn resolve_config(explicit: Option<&str>) -> Result<KrakatauConfig> {
    let config = match explicit {
        Some(path) => KrakatauConfig::load(Path::new(path))?,
        None => {
            let path = default_config_path()?;
            if path.is_file() {
                KrakatauConfig::load(&path)?
            } else {
                KrakatauConfig::default()
            }
        }
    };
    Ok(config.with_env_overrides())
}

/// Infer a class name from an input path (`out/Foo.class` -> `Foo`).
///
/// Only the file stem is used, so the package is lost: this is right for
/// classes in the default package only. Packaged classes need an explicit
/// `--class com/example/Foo`, otherwise the tool looks for the wrong entry.
/// Falls back to the full path string if it has no usable file stem.
pub fn infer_class_name(path: &Path) -> String {
    path.file_stem()
        .and_then(|os_str| os_str.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}

/// Load context classes from jars and class directories, later paths winning
/// on duplicate entry names.
pub fn load_context_classes(paths: &[String]) -> Result<BTreeMap<String, Vec<u8>>> {
    let mut classes = BTreeMap::new();
    for raw in paths {
        let path = Path::new(raw);
        let loaded = if path.is_dir() {
            DirectoryClassSource::open(path)
                .with_context(|| format!("Failed to read class directory {}", path.display()))?
                .loaded_classes()
        } else {
            ArchiveClassSource::open(path)
                .with_context(|| format!("Failed to read class archive {}", path.display()))?
                .loaded_classes()
        };
        classes.extend(loaded);
    }
    Ok(classes)
}

/// Compute the SHA-256 of a byte slice as a hex string.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    format!("{:x}", digest)
}
