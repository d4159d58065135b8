use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

use crate::arr::ServerKind;
use crate::orchestrator::AutomationConfig;
use crate::search::SearchLimits;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub automation: AutomationConfig,
    #[serde(default)]
    pub servers: Vec<LibraryServer>,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8585
}

/// Activity log database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("sweeparr.db")
}

/// A Radarr or Sonarr instance the automation cycle works against.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct LibraryServer {
    /// Unique display name, also used as the server identity.
    pub name: String,
    /// Server family.
    pub kind: ServerKind,
    /// Base URL (e.g., "http://localhost:7878")
    pub url: String,
    /// API key sent as `X-Api-Key`.
    pub api_key: String,
    /// Disabled servers are left out of every cycle.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Per-request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
    /// Records requested per page from the wanted endpoints (default: 250)
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_enabled() -> bool {
    true
}

fn default_timeout() -> u32 {
    30
}

fn default_page_size() -> u32 {
    250
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub http: HttpConfig,
    pub database: DatabaseConfig,
    pub automation: AutomationConfig,
    pub servers: Vec<SanitizedServer>,
}

/// Library server with the API key hidden
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedServer {
    pub name: String,
    pub kind: ServerKind,
    pub url: String,
    pub api_key_configured: bool,
    pub enabled: bool,
    pub timeout_secs: u32,
    pub page_size: u32,
}

impl From<&LibraryServer> for SanitizedServer {
    fn from(server: &LibraryServer) -> Self {
        Self {
            name: server.name.clone(),
            kind: server.kind,
            url: server.url.clone(),
            api_key_configured: !server.api_key.is_empty(),
            enabled: server.enabled,
            timeout_secs: server.timeout_secs,
            page_size: server.page_size,
        }
    }
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            http: config.http.clone(),
            database: config.database.clone(),
            automation: config.automation.clone(),
            servers: config.servers.iter().map(SanitizedServer::from).collect(),
        }
    }
}

impl Config {
    /// Limits currently configured for the automation cycle.
    pub fn limits(&self) -> SearchLimits {
        self.automation.limits
    }
}
