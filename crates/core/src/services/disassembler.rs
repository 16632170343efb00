use std::collections::HashMap;

use crate::config::KrakatauConfig;
use crate::model::{DisassemblyResult, InvocationRequest};
use crate::services::krakatau::KrakatauDisassembler;
use crate::settings::TransformerSettings;

/// Trait implemented by class disassemblers (e.g., Krakatau).
pub trait Disassembler: Send + Sync {
    /// Stable identifier (e.g. `krakatau-disassembler`).
    fn id(&self) -> &'static str;
    /// Display name.
    fn name(&self) -> &'static str;
    fn settings(&self) -> &TransformerSettings;
    fn settings_mut(&mut self) -> &mut TransformerSettings;
    /// Whether this disassembler can handle the named resource.
    fn is_applicable(&self, resource: &str) -> bool;
    fn disassemble(&self, request: &InvocationRequest) -> DisassemblyResult;
}

/// Registry for disassemblers; callers select by id.
#[derive(Default)]
pub struct DisassemblerRegistry {
    disassemblers: HashMap<String, Box<dyn Disassembler>>,
}

impl DisassemblerRegistry {
    pub fn new() -> Self {
        Self { disassemblers: HashMap::new() }
    }

    pub fn register<D: Disassembler + 'static>(&mut self, disassembler: D) -> &mut Self {
        self.disassemblers.insert(disassembler.id().to_string(), Box::new(disassembler));
        self
    }

    pub fn get(&self, id: &str) -> Option<&dyn Disassembler> {
        self.disassemblers.get(id).map(|d| &**d)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut (dyn Disassembler + 'static)> {
        self.disassemblers.get_mut(id).map(|d| &mut **d)
    }

    /// Sorted list of registered ids for error messages/help.
    pub fn ids(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.disassemblers.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Ids of disassemblers that accept `resource`, sorted.
    pub fn applicable_for(&self, resource: &str) -> Vec<String> {
        let mut ids: Vec<String> = self
            .disassemblers
            .iter()
            .filter(|(_, d)| d.is_applicable(resource))
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }
}

/// Registry populated with the Krakatau disassembler running real processes.
pub fn default_registry(config: KrakatauConfig) -> DisassemblerRegistry {
    let mut registry = DisassemblerRegistry::new();
    registry.register(KrakatauDisassembler::with_system_launcher(config));
    registry
}
