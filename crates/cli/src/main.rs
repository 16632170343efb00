use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use class_disasm::commands::{
    disassemble_command, init_config_command, list_disassemblers_command, settings_command,
    DisassembleOptions,
};

/// Class-file disassembly CLI.
///
/// This CLI is a thin wrapper around `disasm-core` (exposed in code as `disasm_core`).
/// All substantive logic lives in the library so it can be tested thoroughly
/// and reused from other frontends.
#[derive(Parser, Debug)]
#[command(
    name = "class-disasm",
    version,
    about = "Disassemble class files with Krakatau",
    long_about = None
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace). `RUST_LOG` takes precedence.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Disassemble a single class file.
    ///
    /// The class is staged into a temp jar together with any context classes,
    /// Krakatau's disassemble.py is run against it, and the resulting `.j` text
    /// is printed.
    Disassemble {
        /// Path to the `.class` file.
        #[arg(long)]
        input: String,

        /// Fully-qualified, slash-separated class name (e.g. `com/example/Foo`).
        /// Defaults to the input file stem, which drops the package: required for
        /// any class outside the default package.
        #[arg(long = "class")]
        class_name: Option<String>,

        /// Jar or class directory providing the other loaded classes. Repeatable.
        #[arg(long)]
        context: Vec<String>,

        /// Disassemble for roundtrip assembly.
        #[arg(long, default_value_t = false)]
        roundtrip: bool,

        /// Path to a Krakatau config JSON. Defaults to `.class-disasm/krakatau.json` if present.
        #[arg(long)]
        config: Option<String>,

        /// Python 2.x interpreter (overrides config).
        #[arg(long)]
        python: Option<String>,

        /// Krakatau install directory (overrides config).
        #[arg(long)]
        krakatau_dir: Option<String>,

        /// Kill the disassembler after this many seconds (overrides config).
        #[arg(long)]
        timeout: Option<u64>,

        /// Write the disassembly to this file instead of stdout.
        #[arg(long)]
        output: Option<String>,

        /// Emit a JSON report instead of plain text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// List available disassemblers.
    ListDisassemblers {
        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Show disassembler settings and the effective Krakatau configuration.
    Settings {
        /// Path to a Krakatau config JSON.
        #[arg(long)]
        config: Option<String>,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Write a Krakatau config file.
    InitConfig {
        /// Destination path. Defaults to `.class-disasm/krakatau.json`.
        #[arg(long)]
        path: Option<String>,

        /// Python 2.x interpreter to record.
        #[arg(long)]
        python: Option<String>,

        /// Krakatau install directory to record.
        #[arg(long)]
        krakatau_dir: Option<String>,

        /// Overwrite an existing config.
        #[arg(long, default_value_t = false)]
        force: bool,
    },
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    // Logs go to stderr so stdout carries only disassembly text / JSON.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Disassemble {
            input,
            class_name,
            context,
            roundtrip,
            config,
            python,
            krakatau_dir,
            timeout,
            output,
            json,
        } => disassemble_command(&DisassembleOptions {
            input,
            class_name,
            context,
            roundtrip,
            config,
            python,
            krakatau_dir,
            timeout_secs: timeout,
            output,
            json,
        })?,
        Command::ListDisassemblers { json } => list_disassemblers_command(json)?,
        Command::Settings { config, json } => settings_command(config.as_deref(), json)?,
        Command::InitConfig { path, python, krakatau_dir, force } => {
            init_config_command(path.as_deref(), python, krakatau_dir, force)?
        }
    }

    Ok(())
}
