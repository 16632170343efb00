//! Sources of the "currently loaded" classes staged next to the class under test.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use tracing::debug;

use crate::model::CLASS_SUFFIX;
use crate::services::bundle::{self, BundleError};

/// Provides every loaded class, keyed by archive entry name (`com/example/Foo.class`).
pub trait ClassSource {
    fn loaded_classes(&self) -> BTreeMap<String, Vec<u8>>;
}

impl ClassSource for BTreeMap<String, Vec<u8>> {
    fn loaded_classes(&self) -> BTreeMap<String, Vec<u8>> {
        self.clone()
    }
}

/// No context classes; the target is staged alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyClassSource;

impl ClassSource for EmptyClassSource {
    fn loaded_classes(&self) -> BTreeMap<String, Vec<u8>> {
        BTreeMap::new()
    }
}

/// Classes read from an existing jar/zip.
#[derive(Debug, Clone)]
pub struct ArchiveClassSource {
    classes: BTreeMap<String, Vec<u8>>,
}

impl ArchiveClassSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, BundleError> {
        let path = path.as_ref();
        let classes = bundle::read_entries(path, |name| name.ends_with(CLASS_SUFFIX))?;
        debug!(archive = %path.display(), count = classes.len(), "loaded context classes");
        Ok(Self { classes })
    }
}

impl ClassSource for ArchiveClassSource {
    fn loaded_classes(&self) -> BTreeMap<String, Vec<u8>> {
        self.classes.clone()
    }
}

/// Classes read from a compiler output directory (`<root>/com/example/Foo.class`).
#[derive(Debug, Clone)]
pub struct DirectoryClassSource {
    classes: BTreeMap<String, Vec<u8>>,
}

impl DirectoryClassSource {
    pub fn open(root: impl AsRef<Path>) -> std::io::Result<Self> {
        let root = root.as_ref();
        let mut classes = BTreeMap::new();
        collect_classes(root, root, &mut classes)?;
        debug!(dir = %root.display(), count = classes.len(), "loaded context classes");
        Ok(Self { classes })
    }
}

impl ClassSource for DirectoryClassSource {
    fn loaded_classes(&self) -> BTreeMap<String, Vec<u8>> {
        self.classes.clone()
    }
}

fn collect_classes(
    root: &Path,
    dir: &Path,
    out: &mut BTreeMap<String, Vec<u8>>,
) -> std::io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            collect_classes(root, &path, out)?;
            continue;
        }
        let Ok(rel) = path.strip_prefix(root) else { continue };
        // Archive entry names always use forward slashes.
        let name = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        if name.ends_with(CLASS_SUFFIX) {
            out.insert(name, fs::read(&path)?);
        }
    }
    Ok(())
}
