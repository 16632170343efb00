use anyhow::Result;
use serde::Serialize;

use disasm_core::config::KrakatauConfig;
use disasm_core::services::{Disassembler, KrakatauDisassembler};
use disasm_core::settings::Setting;

use crate::resolve_config;

#[derive(Debug, Serialize)]
pub struct SettingsReport {
    pub disassembler: String,
    pub settings: Vec<Setting>,
    pub config: KrakatauConfig,
    /// Resolved interpreter path.
    pub interpreter: Option<String>,
    /// Why the interpreter could not be resolved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interpreter_error: Option<String>,
}

/// Show the Krakatau settings and the effective tool configuration.
pub fn settings_command(config: Option<&str>, json: bool) -> Result<()> {
    let config = resolve_config(config)?;
    let (interpreter, interpreter_error) = match config.resolve_interpreter() {
        Ok(path) => (Some(path.display().to_string()), None),
        Err(e) => (None, Some(e.to_string())),
    };
    let disassembler = KrakatauDisassembler::with_system_launcher(config);
    let report = SettingsReport {
        disassembler: disassembler.id().to_string(),
        settings: disassembler.settings().iter().cloned().collect(),
        config: disassembler.config().clone(),
        interpreter,
        interpreter_error,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Disassembler: {}", report.disassembler);
    println!("Settings:");
    for setting in &report.settings {
        println!(
            "- {} (--{}): {} [{}]",
            setting.id,
            setting.param,
            setting.label,
            if setting.enabled { "on" } else { "off" }
        );
    }
    println!("Config:");
    match (&report.interpreter, &report.interpreter_error) {
        (Some(path), _) => println!("  Python: {}", path),
        (None, reason) => {
            println!("  Python: (unresolved) {}", reason.as_deref().unwrap_or_default())
        }
    }
    println!("  Krakatau dir: {}", report.config.install_dir.display());
    println!("  Script: {}", report.config.script);
    match report.config.timeout_secs {
        Some(secs) => println!("  Timeout: {}s", secs),
        None => println!("  Timeout: none"),
    }
    if let Some(dir) = &report.config.temp_dir {
        println!("  Temp dir: {}", dir.display());
    }

    Ok(())
}
