//! Per-disassembler toggleable settings.
//!
//! Each disassembler owns a `TransformerSettings` registry and registers its
//! settings at construction time. There is no process-wide settings state:
//! toggling a setting only affects the instance that owns it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A named, toggleable option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Setting {
    /// Stable identifier used to query the setting.
    pub id: String,
    /// Parameter token (e.g. the CLI flag stem).
    pub param: String,
    /// Display label.
    pub label: String,
    pub enabled: bool,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("Unknown setting '{0}'")]
    Unknown(String),
}

/// Ordered collection of settings for one disassembler.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransformerSettings {
    settings: Vec<Setting>,
}

impl TransformerSettings {
    pub fn new() -> Self {
        Self { settings: Vec::new() }
    }

    /// Register a setting. Re-registering an id replaces the earlier entry.
    pub fn register(
        &mut self,
        id: impl Into<String>,
        param: impl Into<String>,
        label: impl Into<String>,
        default_enabled: bool,
    ) -> &mut Self {
        let setting = Setting {
            id: id.into(),
            param: param.into(),
            label: label.into(),
            enabled: default_enabled,
        };
        match self.settings.iter_mut().find(|s| s.id == setting.id) {
            Some(existing) => *existing = setting,
            None => self.settings.push(setting),
        }
        self
    }

    pub fn get(&self, id: &str) -> Option<&Setting> {
        self.settings.iter().find(|s| s.id == id)
    }

    /// Current state of `id`; unknown settings read as disabled.
    pub fn is_enabled(&self, id: &str) -> bool {
        self.get(id).map(|s| s.enabled).unwrap_or(false)
    }

    pub fn set_enabled(&mut self, id: &str, enabled: bool) -> Result<(), SettingsError> {
        let setting = self
            .settings
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| SettingsError::Unknown(id.to_string()))?;
        setting.enabled = enabled;
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Setting> {
        self.settings.iter()
    }

    pub fn len(&self) -> usize {
        self.settings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.settings.is_empty()
    }
}
