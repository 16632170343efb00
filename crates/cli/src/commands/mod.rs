pub mod config;
pub mod disassemble;
pub mod disassemblers;
pub mod settings;

pub use config::*;
pub use disassemble::*;
pub use disassemblers::*;
pub use settings::*;
