use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use class_disasm::{infer_class_name, load_context_classes, resolve_config, sha256_hex};
use disasm_core::services::bundle::write_class_bundle;
use tempfile::tempdir;

#[test]
fn infer_class_name_uses_file_stem() {
    assert_eq!(infer_class_name(Path::new("out/com/example/Foo.class")), "Foo");
    assert_eq!(infer_class_name(Path::new("Bar.class")), "Bar");
}

#[test]
fn sha256_hex_matches_known_digest() {
    assert_eq!(
        sha256_hex(b"abc"),
        "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
}

#[test]
fn load_context_classes_merges_jars_and_directories() {
    let temp = tempdir().unwrap();
    let jar = temp.path().join("lib.jar");
    let mut jar_classes = BTreeMap::new();
    jar_classes.insert("com/example/Shared.class".to_string(), vec![1]);
    jar_classes.insert("com/example/FromJar.class".to_string(), vec![2]);
    write_class_bundle(&jar, &jar_classes).unwrap();

    let dir = temp.path().join("classes");
    fs::create_dir_all(dir.join("com").join("example")).unwrap();
    fs::write(dir.join("com").join("example").join("Shared.class"), [9u8]).unwrap();

    let merged = load_context_classes(&[
        jar.to_string_lossy().to_string(),
        dir.to_string_lossy().to_string(),
    ])
    .unwrap();
    assert_eq!(merged.len(), 2);
    assert_eq!(merged["com/example/Shared.class"], vec![9]);
    assert_eq!(merged["com/example/FromJar.class"], vec![2]);
}

#[test]
fn load_context_classes_reports_unreadable_archive() {
    let temp = tempdir().unwrap();
    let bogus = temp.path().join("bogus.jar");
    fs::write(&bogus, "not a zip").unwrap();
    let err = load_context_classes(&[bogus.to_string_lossy().to_string()]).unwrap_err();
    assert!(err.to_string().contains("Failed to read class archive"), "unexpected error: {err}");
}

#[test]
fn resolve_config_errors_for_missing_explicit_file() {
    let temp = tempdir().unwrap();
    let missing = temp.path().join("missing.json");
    let err = resolve_config(Some(missing.to_str().unwrap())).unwrap_err();
    assert!(err.to_string().contains("Failed to read Krakatau config"));
}
