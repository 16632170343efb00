use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use disasm_core::config::{KrakatauConfig, PYTHON_NOT_SET};
use disasm_core::services::bundle::write_class_bundle;
use predicates::prelude::*;
use tempfile::{tempdir, TempDir};

const FOO_TEXT: &str = ".version 49 0\n.class public super com/example/Foo\n.end class\n";

fn write_class(dir: &Path) -> PathBuf {
    let path = dir.join("Foo.class");
    fs::write(&path, [0xCAu8, 0xFE, 0xBA, 0xBE]).unwrap();
    path
}

/// Project dir with a fake Krakatau: `/bin/sh` runs a script that records its
/// arguments and copies a prepared output zip to the `-out` path.
struct FakeKrakatau {
    root: TempDir,
    config: PathBuf,
    args_file: PathBuf,
    bundles: PathBuf,
}

impl FakeKrakatau {
    fn new(produce_output: bool) -> Self {
        let root = tempdir().unwrap();
        let install = root.path().join("Krakatau");
        let bundles = root.path().join("bundles");
        fs::create_dir_all(&install).unwrap();
        fs::create_dir_all(&bundles).unwrap();

        let fixture = root.path().join("fixture.zip");
        let mut entries = BTreeMap::new();
        entries.insert("com/example/Foo.j".to_string(), FOO_TEXT.as_bytes().to_vec());
        write_class_bundle(&fixture, &entries).unwrap();

        let args_file = root.path().join("args.txt");
        let body = if produce_output {
            format!("cp '{}' \"$out\"\necho 'fake krakatau done'\n", fixture.display())
        } else {
            "echo 'ImportError: No module named Krakatau' 1>&2\nexit 1\n".to_string()
        };
        let script = install.join("disassemble.sh");
        fs::write(
            &script,
            format!(
                "echo \"$@\" > '{}'\nout=\"\"\nwhile [ $# -gt 0 ]; do\n  case \"$1\" in\n    -out) shift; out=\"$1\" ;;\n  esac\n  shift\ndone\n{}",
                args_file.display(),
                body
            ),
        )
        .unwrap();

        let mut cfg = KrakatauConfig::default()
            .with_python("/bin/sh")
            .with_install_dir(&install)
            .with_temp_dir(&bundles)
            .with_timeout_secs(Some(30));
        cfg.script = script.to_string_lossy().to_string();
        cfg.optimize = false;
        let config = root.path().join("krakatau.json");
        cfg.save(&config).unwrap();

        Self { root, config, args_file, bundles }
    }

    fn bundle_count(&self) -> usize {
        fs::read_dir(&self.bundles).unwrap().count()
    }
}

#[test]
fn list_disassemblers_reports_krakatau() {
    cargo_bin_cmd!("class-disasm")
        .arg("list-disassemblers")
        .assert()
        .success()
        .stdout(predicate::str::contains("krakatau-disassembler"));

    let output = cargo_bin_cmd!("class-disasm")
        .args(["list-disassemblers", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let body: serde_json::Value = serde_json::from_slice(&output).expect("json");
    assert_eq!(body[0]["id"], "krakatau-disassembler");
    assert_eq!(body[0]["name"], "Krakatau Disassembler");
}

#[test]
fn disassemble_help_explains_class_name_default() {
    cargo_bin_cmd!("class-disasm")
        .args(["disassemble", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--class"))
        .stdout(predicate::str::contains("drops the package"))
        .stdout(predicate::str::contains("default package"));
}

#[test]
fn disassemble_without_python_reports_configuration_error() {
    let temp = tempdir().unwrap();
    let class = write_class(temp.path());
    cargo_bin_cmd!("class-disasm")
        .current_dir(temp.path())
        .env_remove("KRAKATAU_PYTHON")
        .args(["disassemble", "--class", "com/example/Foo", "--input"])
        .arg(&class)
        .assert()
        .failure()
        .stderr(predicate::str::contains(PYTHON_NOT_SET));
}

#[test]
fn disassemble_json_reports_failure_stage() {
    let temp = tempdir().unwrap();
    let class = write_class(temp.path());
    let output = cargo_bin_cmd!("class-disasm")
        .current_dir(temp.path())
        .env_remove("KRAKATAU_PYTHON")
        .args(["disassemble", "--json", "--input"])
        .arg(&class)
        .assert()
        .failure()
        .get_output()
        .stdout
        .clone();
    let body: serde_json::Value = serde_json::from_slice(&output).expect("json report");
    assert_eq!(body["ok"], false);
    assert_eq!(body["class"], "Foo");
    assert_eq!(body["stage"], "not_started");
    assert_eq!(body["error"], PYTHON_NOT_SET);
}

#[test]
fn disassemble_missing_input_fails() {
    let temp = tempdir().unwrap();
    cargo_bin_cmd!("class-disasm")
        .current_dir(temp.path())
        .args(["disassemble", "--input", "Nope.class"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read class file"));
}

#[cfg(unix)]
#[test]
fn disassemble_prints_text_from_fake_krakatau() {
    let fake = FakeKrakatau::new(true);
    let class = write_class(fake.root.path());
    cargo_bin_cmd!("class-disasm")
        .env_remove("KRAKATAU_PYTHON")
        .args(["disassemble", "--class", "com/example/Foo", "--config"])
        .arg(&fake.config)
        .arg("--input")
        .arg(&class)
        .assert()
        .success()
        .stdout(FOO_TEXT);

    let args = fs::read_to_string(&fake.args_file).unwrap();
    assert!(args.contains("-path"));
    assert!(args.trim_end().ends_with("com/example/Foo.class"), "args: {args}");
    assert!(!args.contains("-roundtrip"));
    assert_eq!(fake.bundle_count(), 0);
}

#[cfg(unix)]
#[test]
fn disassemble_roundtrip_passes_flag_and_writes_output_file() {
    let fake = FakeKrakatau::new(true);
    let class = write_class(fake.root.path());
    let out = fake.root.path().join("Foo.j");
    cargo_bin_cmd!("class-disasm")
        .env_remove("KRAKATAU_PYTHON")
        .args(["disassemble", "--roundtrip", "--class", "com/example/Foo", "--config"])
        .arg(&fake.config)
        .arg("--input")
        .arg(&class)
        .arg("--output")
        .arg(&out)
        .assert()
        .success();

    assert_eq!(fs::read_to_string(&out).unwrap(), FOO_TEXT);
    let args = fs::read_to_string(&fake.args_file).unwrap();
    assert!(args.trim_end().ends_with("-roundtrip"), "args: {args}");
    assert_eq!(fake.bundle_count(), 0);
}

#[cfg(unix)]
#[test]
fn disassemble_surfaces_process_log_on_failure() {
    let fake = FakeKrakatau::new(false);
    let class = write_class(fake.root.path());
    cargo_bin_cmd!("class-disasm")
        .env_remove("KRAKATAU_PYTHON")
        .args(["disassemble", "--class", "com/example/Foo", "--config"])
        .arg(&fake.config)
        .arg("--input")
        .arg(&class)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to extract disassembly"))
        .stderr(predicate::str::contains("ImportError: No module named Krakatau"));
    assert_eq!(fake.bundle_count(), 0);
}

#[test]
fn init_config_then_settings_shows_configuration() {
    let temp = tempdir().unwrap();
    let config = temp.path().join("cfg").join("krakatau.json");
    cargo_bin_cmd!("class-disasm")
        .args(["init-config", "--python", "/opt/python2.7/bin/python", "--path"])
        .arg(&config)
        .assert()
        .success();

    let output = cargo_bin_cmd!("class-disasm")
        .env_remove("KRAKATAU_PYTHON")
        .env_remove("KRAKATAU_DIR")
        .env_remove("KRAKATAU_TIMEOUT_SECS")
        .args(["settings", "--json", "--config"])
        .arg(&config)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let body: serde_json::Value = serde_json::from_slice(&output).expect("settings json");
    assert_eq!(body["disassembler"], "krakatau-disassembler");
    assert_eq!(body["settings"][0]["param"], "roundtrip");
    assert_eq!(body["settings"][0]["enabled"], false);
    assert_eq!(body["config"]["python"], "/opt/python2.7/bin/python");
    assert!(body["interpreter"].is_null());
    assert!(body["interpreter_error"].as_str().unwrap().contains("not found"));
}

#[test]
fn init_config_refuses_to_overwrite_without_force() {
    let temp = tempdir().unwrap();
    let config = temp.path().join("krakatau.json");
    fs::write(&config, "{}").unwrap();

    cargo_bin_cmd!("class-disasm")
        .args(["init-config", "--path"])
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("use --force"));

    cargo_bin_cmd!("class-disasm")
        .args(["init-config", "--force", "--path"])
        .arg(&config)
        .assert()
        .success();
    let written = KrakatauConfig::load(&config).unwrap();
    assert_eq!(written.script, "disassemble.py");
}
