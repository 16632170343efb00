//! Core data model for a single disassembly invocation.
//!
//! This module contains:
//! - `InvocationRequest`: the class under test plus the context classes staged with it
//! - `ProcessOutput` / `ExitState`: what came back from the external tool
//! - `Stage`: where an invocation is in its lifecycle
//! - `DisassemblyError` / `DisassemblyFailure`: the structured failure surfaced to callers

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// File suffix of compiled class artifacts.
pub const CLASS_SUFFIX: &str = ".class";

/// File suffix the disassembler uses for its text output (`Foo.class` -> `Foo.j`).
pub const DISASSEMBLY_SUFFIX: &str = ".j";

/// Request to disassemble one class.
///
/// `class_name` is the fully-qualified, slash-separated name without the
/// `.class` suffix (e.g. `com/example/Foo`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationRequest {
    pub class_name: String,
    pub class_bytes: Vec<u8>,
    /// Every other loaded class, keyed by archive entry name (`com/example/Bar.class`).
    pub auxiliary_classes: BTreeMap<String, Vec<u8>>,
    pub roundtrip: bool,
}

impl InvocationRequest {
    /// Build a request for `class_name`. A trailing `.class` suffix is stripped.
    pub fn new(class_name: impl Into<String>, class_bytes: impl Into<Vec<u8>>) -> Self {
        let mut class_name = class_name.into();
        if let Some(stripped) = class_name.strip_suffix(CLASS_SUFFIX) {
            class_name = stripped.to_string();
        }
        Self {
            class_name,
            class_bytes: class_bytes.into(),
            auxiliary_classes: BTreeMap::new(),
            roundtrip: false,
        }
    }

    pub fn with_auxiliary_classes(mut self, classes: BTreeMap<String, Vec<u8>>) -> Self {
        self.auxiliary_classes = classes;
        self
    }

    pub fn with_roundtrip(mut self, roundtrip: bool) -> Self {
        self.roundtrip = roundtrip;
        self
    }

    /// Archive entry name of the class under test (`com/example/Foo.class`).
    pub fn target_entry(&self) -> String {
        format!("{}{}", self.class_name, CLASS_SUFFIX)
    }

    /// Archive entry name the disassembly is expected under (`com/example/Foo.j`).
    pub fn output_entry(&self) -> String {
        format!("{}{}", self.class_name, DISASSEMBLY_SUFFIX)
    }

    /// All classes to stage: the context classes plus the target, which always
    /// wins over a context class with the same entry name.
    pub fn staged_classes(&self) -> BTreeMap<String, Vec<u8>> {
        let mut staged = self.auxiliary_classes.clone();
        staged.insert(self.target_entry(), self.class_bytes.clone());
        staged
    }
}

/// How the external process finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitState {
    Exited(i32),
    /// Terminated without an exit code (killed by a signal).
    Signaled,
    TimedOut(Duration),
}

impl ExitState {
    pub fn is_success(&self) -> bool {
        matches!(self, ExitState::Exited(0))
    }
}

impl fmt::Display for ExitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitState::Exited(code) => write!(f, "exit code {code}"),
            ExitState::Signaled => write!(f, "terminated by signal"),
            ExitState::TimedOut(limit) => write!(f, "timed out after {}ms", limit.as_millis()),
        }
    }
}

/// Result of running the external tool: its exit state and merged stdout/stderr.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    pub exit: ExitState,
    pub log: String,
}

/// Lifecycle of one invocation. `CleanedUp` is reached whenever the bundles
/// were created, including on failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    NotStarted,
    ConfigChecked,
    BundlesCreated,
    ProcessLaunched,
    ProcessCompleted,
    ResultExtracted,
    CleanedUp,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::NotStarted => "not-started",
            Stage::ConfigChecked => "config-checked",
            Stage::BundlesCreated => "bundles-created",
            Stage::ProcessLaunched => "process-launched",
            Stage::ProcessCompleted => "process-completed",
            Stage::ResultExtracted => "result-extracted",
            Stage::CleanedUp => "cleaned-up",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DisassemblyError {
    /// The interpreter location is not set or cannot be resolved.
    #[error("{0}")]
    Configuration(String),
    /// Creating or writing the temp bundles failed.
    #[error("Failed to stage input bundle: {0}")]
    Staging(String),
    /// The external process could not be launched or ended abnormally.
    #[error("Disassembler process failed: {0}")]
    Process(String),
    /// The output bundle is missing, unreadable, or lacks the expected entry.
    #[error("Failed to extract disassembly: {0}")]
    Extraction(String),
    /// The output entry is not valid UTF-8.
    #[error("Failed to decode disassembly: {0}")]
    Decode(String),
}

/// Failure of one invocation: the error, the stage it happened in, and the
/// process log if a process was run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisassemblyFailure {
    pub error: DisassemblyError,
    pub stage: Stage,
    pub log: Option<String>,
}

impl DisassemblyFailure {
    pub fn new(error: DisassemblyError, stage: Stage) -> Self {
        Self { error, stage, log: None }
    }

    pub fn with_log(mut self, log: Option<String>) -> Self {
        self.log = log;
        self
    }

    /// Human-readable message without the process log.
    pub fn message(&self) -> String {
        self.error.to_string()
    }
}

impl fmt::Display for DisassemblyFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;
        if let Some(log) = self.log.as_deref() {
            if !log.is_empty() {
                write!(f, "\n{log}")?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for DisassemblyFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Outcome of a single disassembly: the text, or a failure with diagnostics.
pub type DisassemblyResult = Result<String, DisassemblyFailure>;
