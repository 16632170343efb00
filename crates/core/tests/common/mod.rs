#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use disasm_core::config::KrakatauConfig;
use disasm_core::model::{ExitState, ProcessOutput};
use disasm_core::services::bundle;
use disasm_core::services::{KrakatauDisassembler, LaunchError, ProcessLauncher, ToolCommand};

type Behavior = dyn Fn(&ToolCommand) -> Result<ProcessOutput, LaunchError> + Send + Sync;

/// Launcher that never starts a process: it records every command and the
/// staged input bundle, then runs `behavior` in place of the real tool.
pub struct FakeLauncher {
    behavior: Box<Behavior>,
    pub commands: Mutex<Vec<ToolCommand>>,
    pub staged: Mutex<Vec<BTreeMap<String, Vec<u8>>>>,
}

impl FakeLauncher {
    pub fn new<F>(behavior: F) -> Arc<Self>
    where
        F: Fn(&ToolCommand) -> Result<ProcessOutput, LaunchError> + Send + Sync + 'static,
    {
        Arc::new(Self {
            behavior: Box::new(behavior),
            commands: Mutex::new(Vec::new()),
            staged: Mutex::new(Vec::new()),
        })
    }

    /// Behaves like a successful Krakatau run: writes `<class>.j` containing
    /// `text_for(class)` to the `-out` bundle.
    pub fn succeeding() -> Arc<Self> {
        Self::new(|cmd| {
            let class = target_class(cmd);
            write_output(cmd, &[(format!("{class}.j").as_str(), text_for(&class).as_bytes())]);
            Ok(ProcessOutput { exit: ExitState::Exited(0), log: format!("Disassembling {class}\n") })
        })
    }

    pub fn commands(&self) -> Vec<ToolCommand> {
        self.commands.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.commands.lock().unwrap().len()
    }
}

impl ProcessLauncher for FakeLauncher {
    fn run(&self, command: &ToolCommand) -> Result<ProcessOutput, LaunchError> {
        self.commands.lock().unwrap().push(command.clone());
        if let Some(input) = command.value_after("-path") {
            let staged = bundle::read_entries(Path::new(input), |_| true).unwrap_or_default();
            self.staged.lock().unwrap().push(staged);
        }
        (self.behavior)(command)
    }
}

/// Class name passed as the target entry (`com/example/Foo.class` -> `com/example/Foo`).
pub fn target_class(cmd: &ToolCommand) -> String {
    cmd.arg_strings()
        .into_iter()
        .find(|a| a.ends_with(".class"))
        .map(|a| a.trim_end_matches(".class").to_string())
        .expect("target entry in command")
}

pub fn text_for(class: &str) -> String {
    format!(".version 49 0\n.class public super {class}\n.end class\n")
}

pub fn write_output(cmd: &ToolCommand, entries: &[(&str, &[u8])]) {
    let out = cmd.value_after("-out").expect("-out argument");
    let map: BTreeMap<String, Vec<u8>> =
        entries.iter().map(|(name, bytes)| (name.to_string(), bytes.to_vec())).collect();
    bundle::write_class_bundle(Path::new(out), &map).expect("write fake output");
}

/// Temp dirs for one test: a bundle dir the disassembler writes into and a
/// tool dir holding a dummy interpreter.
pub struct Sandbox {
    pub bundles: tempfile::TempDir,
    pub tools: tempfile::TempDir,
    pub python: PathBuf,
}

impl Sandbox {
    pub fn new() -> Self {
        let bundles = tempfile::tempdir().unwrap();
        let tools = tempfile::tempdir().unwrap();
        let python = tools.path().join("python2");
        fs::write(&python, b"#!/bin/sh\n").unwrap();
        Self { bundles, tools, python }
    }

    pub fn config(&self) -> KrakatauConfig {
        KrakatauConfig::default()
            .with_python(&self.python)
            .with_install_dir(self.tools.path())
            .with_temp_dir(self.bundles.path())
    }

    pub fn disassembler(&self, launcher: Arc<FakeLauncher>) -> KrakatauDisassembler {
        KrakatauDisassembler::new(self.config(), launcher)
    }

    pub fn bundle_files(&self) -> Vec<PathBuf> {
        fs::read_dir(self.bundles.path()).unwrap().map(|e| e.unwrap().path()).collect()
    }
}
