use std::path::PathBuf;

use anyhow::{anyhow, Result};

use disasm_core::config::KrakatauConfig;

use crate::default_config_path;

/// Write a Krakatau config file (default `./.class-disasm/krakatau.json`).
pub fn init_config_command(
    path: Option<&str>,
    python: Option<String>,
    krakatau_dir: Option<String>,
    force: bool,
) -> Result<()> {
    let path = match path {
        Some(p) => PathBuf::from(p),
        None => default_config_path()?,
    };
    if path.exists() && !force {
        return Err(anyhow!(
            "Config already exists at {} (use --force to overwrite)",
            path.display()
        ));
    }

    let mut config = KrakatauConfig::default();
    if let Some(python) = python {
        config = config.with_python(python);
    }
    if let Some(dir) = krakatau_dir {
        config = config.with_install_dir(dir);
    }
    config.save(&path)?;

    println!("Wrote Krakatau config to {}", path.display());
    if config.python.is_none() {
        println!("Set \"python\" to your Python 2.x interpreter before disassembling.");
    }
    Ok(())
}
