use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;

use thiserror::Error;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Declared entry sizes come from the archive, so preallocation is capped.
const MAX_PREALLOC: u64 = 1 << 20;

#[derive(Debug, Error)]
pub enum BundleError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("zip error: {0}")]
    Zip(#[from] ZipError),
}

/// Write `classes` to `path` as a zip archive, one entry per key.
///
/// Any existing file at `path` is truncated.
pub fn write_class_bundle(path: &Path, classes: &BTreeMap<String, Vec<u8>>) -> Result<(), BundleError> {
    let file = File::create(path)?;
    let mut writer = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for (name, bytes) in classes {
        writer.start_file(name.as_str(), options)?;
        writer.write_all(bytes)?;
    }
    writer.finish()?;
    Ok(())
}

/// Read a single entry from the archive at `path`.
///
/// Returns `Ok(None)` when the archive is valid but has no entry named `name`.
pub fn read_entry(path: &Path, name: &str) -> Result<Option<Vec<u8>>, BundleError> {
    let mut archive = ZipArchive::new(File::open(path)?)?;
    let mut entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut bytes = Vec::with_capacity(entry.size().min(MAX_PREALLOC) as usize);
    entry.read_to_end(&mut bytes)?;
    Ok(Some(bytes))
}

/// Read every entry whose name satisfies `keep` into a map.
pub fn read_entries<F>(path: &Path, keep: F) -> Result<BTreeMap<String, Vec<u8>>, BundleError>
where
    F: Fn(&str) -> bool,
{
    let mut archive = ZipArchive::new(File::open(path)?)?;
    let mut out = BTreeMap::new();
    for idx in 0..archive.len() {
        let mut entry = archive.by_index(idx)?;
        if entry.is_dir() || !keep(entry.name()) {
            continue;
        }
        let name = entry.name().to_string();
        let mut bytes = Vec::with_capacity(entry.size().min(MAX_PREALLOC) as usize);
        entry.read_to_end(&mut bytes)?;
        out.insert(name, bytes);
    }
    Ok(out)
}
