//! Runtime view of configuration consumed by the automation engine.
//!
//! The engine never caches servers or limits across cycles; it reads them
//! through a [`SettingsProvider`] at the start of every cycle and at every
//! reschedule.

use std::sync::{PoisonError, RwLock};

use super::{validate_automation, Config, ConfigError, LibraryServer};
use crate::orchestrator::AutomationConfig;

/// Read-only access to the servers and automation settings.
pub trait SettingsProvider: Send + Sync {
    /// Snapshot of the enabled library servers.
    fn enabled_servers(&self) -> Vec<LibraryServer>;

    /// Current automation settings (interval, limits, dry-run).
    fn automation(&self) -> AutomationConfig;
}

/// In-memory settings shared between the engine and the HTTP API.
pub struct SharedSettings {
    servers: RwLock<Vec<LibraryServer>>,
    automation: RwLock<AutomationConfig>,
}

impl SharedSettings {
    pub fn new(servers: Vec<LibraryServer>, automation: AutomationConfig) -> Self {
        Self {
            servers: RwLock::new(servers),
            automation: RwLock::new(automation),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.servers.clone(), config.automation.clone())
    }

    /// All configured servers, including disabled ones.
    pub fn servers(&self) -> Vec<LibraryServer> {
        self.servers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Look up a server by name.
    pub fn server(&self, name: &str) -> Option<LibraryServer> {
        self.servers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|s| s.name == name)
            .cloned()
    }

    /// Replace the automation settings. Takes effect on the next read.
    pub fn set_automation(&self, automation: AutomationConfig) -> Result<(), ConfigError> {
        validate_automation(&automation)?;
        *self
            .automation
            .write()
            .unwrap_or_else(PoisonError::into_inner) = automation;
        Ok(())
    }

    /// Enable or disable a server by name. Returns false if no such server.
    pub fn set_server_enabled(&self, name: &str, enabled: bool) -> bool {
        let mut servers = self.servers.write().unwrap_or_else(PoisonError::into_inner);
        match servers.iter_mut().find(|s| s.name == name) {
            Some(server) => {
                server.enabled = enabled;
                true
            }
            None => false,
        }
    }
}

impl SettingsProvider for SharedSettings {
    fn enabled_servers(&self) -> Vec<LibraryServer> {
        self.servers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|s| s.enabled)
            .cloned()
            .collect()
    }

    fn automation(&self) -> AutomationConfig {
        self.automation
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
