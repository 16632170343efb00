use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use serde::Serialize;
use tracing::info;

use disasm_core::model::{InvocationRequest, Stage};
use disasm_core::services::{Disassembler, KrakatauDisassembler};

use crate::{infer_class_name, load_context_classes, resolve_config, sha256_hex};

/// Inputs for a single `disassemble` invocation.
#[derive(Debug, Clone, Default)]
pub struct DisassembleOptions {
    /// Path to the `.class` file to disassemble.
    pub input: String,
    /// Fully-qualified, slash-separated class name. Defaults to the input file
    /// stem, which is only correct for the default package.
    pub class_name: Option<String>,
    /// Jars/directories providing the other loaded classes.
    pub context: Vec<String>,
    pub roundtrip: bool,
    pub config: Option<String>,
    pub python: Option<String>,
    pub krakatau_dir: Option<String>,
    pub timeout_secs: Option<u64>,
    /// Write the disassembly here instead of stdout.
    pub output: Option<String>,
    pub json: bool,
}

/// Serializable outcome of a `disassemble` run.
#[derive(Debug, Clone, Serialize)]
pub struct DisassembleReport {
    pub class: String,
    pub disassembler: String,
    pub roundtrip: bool,
    pub sha256: String,
    pub context_classes: usize,
    pub finished_at: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log: Option<String>,
}

/// Run the disassembler and collect the outcome. Tool failures are reported in
/// the returned report; only local I/O problems (unreadable input, bad config)
/// are returned as errors.
pub fn run_disassembly(opts: &DisassembleOptions) -> Result<DisassembleReport> {
    let input = Path::new(&opts.input);
    let class_bytes = fs::read(input)
        .with_context(|| format!("Failed to read class file {}", input.display()))?;
    let class_name = match &opts.class_name {
        Some(name) => name.clone(),
        None => {
            let inferred = infer_class_name(input);
            info!(class = %inferred, "no --class given; assuming the default package");
            inferred
        }
    };
    let context = load_context_classes(&opts.context)?;

    let mut config = resolve_config(opts.config.as_deref())?;
    if let Some(python) = &opts.python {
        config.python = Some(PathBuf::from(python));
    }
    if let Some(dir) = &opts.krakatau_dir {
        config.install_dir = PathBuf::from(dir);
    }
    if opts.timeout_secs.is_some() {
        config.timeout_secs = opts.timeout_secs;
    }

    let mut disassembler = KrakatauDisassembler::with_system_launcher(config);
    disassembler.set_roundtrip(opts.roundtrip);

    let request = InvocationRequest::new(class_name, class_bytes)
        .with_auxiliary_classes(context)
        .with_roundtrip(disassembler.roundtrip());
    let sha256 = sha256_hex(&request.class_bytes);
    let context_classes = request.auxiliary_classes.len();
    let result = disassembler.disassemble(&request);

    let mut report = DisassembleReport {
        class: request.class_name.clone(),
        disassembler: disassembler.id().to_string(),
        roundtrip: request.roundtrip,
        sha256,
        context_classes,
        finished_at: Utc::now().to_rfc3339(),
        ok: result.is_ok(),
        text: None,
        error: None,
        stage: None,
        log: None,
    };
    match result {
        Ok(text) => report.text = Some(text),
        Err(failure) => {
            report.error = Some(failure.message());
            report.stage = Some(failure.stage);
            report.log = failure.log;
        }
    }
    Ok(report)
}

/// Disassemble one class file and print (or write) the result.
pub fn disassemble_command(opts: &DisassembleOptions) -> Result<()> {
    let report = run_disassembly(opts)?;

    if opts.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if let Some(text) = &report.text {
        match &opts.output {
            Some(path) => {
                fs::write(path, text).with_context(|| format!("Failed to write {}", path))?;
                println!("Wrote disassembly of {} to {}", report.class, path);
            }
            None => print!("{}", text),
        }
    } else {
        eprintln!("{}", report.error.as_deref().unwrap_or("Disassembly failed"));
        if let Some(log) = report.log.as_deref().filter(|l| !l.is_empty()) {
            eprintln!("{}", log);
        }
    }

    if report.ok {
        Ok(())
    } else {
        Err(anyhow!("Disassembly of {} failed", report.class))
    }
}
