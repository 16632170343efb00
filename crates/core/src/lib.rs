//! disasm-core
//!
//! Core library for turning compiled class files into disassembly text through
//! an external Krakatau install.
//!
//! This crate defines the invocation model, per-disassembler settings, tool
//! configuration, and the orchestration that stages classes, runs the external
//! tool, and extracts its output.
//!
//! All substantive logic lives here so it is fully testable and reusable from
//! multiple frontends.

pub mod config;
pub mod model;
pub mod services;
pub mod settings;

/// Returns the library version as encoded at compile time.
///
/// Useful for tests and for frontends to report consistent version info.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
