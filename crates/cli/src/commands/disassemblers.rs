use anyhow::Result;
use serde::Serialize;

use disasm_core::config::KrakatauConfig;
use disasm_core::services::default_registry;

#[derive(Debug, Serialize)]
pub struct DisassemblerInfo {
    pub id: String,
    pub name: String,
    pub applies_to: String,
}

/// List the disassemblers known to this binary.
pub fn list_disassemblers_command(json: bool) -> Result<()> {
    let registry = default_registry(KrakatauConfig::default());
    let entries: Vec<DisassemblerInfo> = registry
        .ids()
        .into_iter()
        .filter_map(|id| {
            registry.get(&id).map(|d| DisassemblerInfo {
                id: id.clone(),
                name: d.name().to_string(),
                applies_to: "*.class".to_string(),
            })
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("Disassemblers: (none)");
        return Ok(());
    }

    println!("Disassemblers:");
    for entry in entries {
        println!("- {}: {} ({})", entry.id, entry.name, entry.applies_to);
    }

    Ok(())
}
