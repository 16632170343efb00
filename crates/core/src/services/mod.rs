//! Services that drive the external disassembler.
//!
//! - `process`: launching external commands and capturing their output
//! - `bundle`: zip staging/extraction
//! - `classes`: sources of context classes
//! - `disassembler`: the `Disassembler` trait and registry
//! - `krakatau`: the Krakatau orchestrator

pub mod bundle;
pub mod classes;
pub mod disassembler;
pub mod krakatau;
pub mod process;

pub use disassembler::{default_registry, Disassembler, DisassemblerRegistry};
pub use krakatau::{KrakatauDisassembler, KrakatauSettings};
pub use process::{LaunchError, ProcessLauncher, SystemLauncher, ToolCommand};
