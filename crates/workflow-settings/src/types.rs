//! Settings types.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// Bind port.
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

/// Top-level settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowSettings {
    /// HTTP listener.
    pub server: ServerSettings,
    /// Default `tracing` filter when `RUST_LOG` is unset.
    pub log_level: String,
    /// Project root; the working directory when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_dir: Option<PathBuf>,
    /// Push change events when `tasks.json` is edited on disk.
    pub watch_files: bool,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            log_level: "info".to_string(),
            project_dir: None,
            watch_files: true,
        }
    }
}

/// Values given on the command line. `None` leaves the loaded value alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliOverrides {
    /// `--host`
    pub host: Option<String>,
    /// `--port`
    pub port: Option<u16>,
    /// `--project`
    pub project_dir: Option<PathBuf>,
}

impl WorkflowSettings {
    /// Apply command-line values on top of the loaded layers.
    #[must_use]
    pub fn with_overrides(mut self, overrides: CliOverrides) -> Self {
        if let Some(host) = overrides.host {
            self.server.host = host;
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        if overrides.project_dir.is_some() {
            self.project_dir = overrides.project_dir;
        }
        self
    }

    /// Reject settings the server cannot bind with.
    pub fn validate_for_serving(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(SettingsError::InvalidValue("server.port must not be 0".into()));
        }
        if self.server.host.trim().is_empty() {
            return Err(SettingsError::InvalidValue("server.host must not be empty".into()));
        }
        Ok(())
    }

    /// The configured project root, or the working directory.
    pub fn resolve_project_dir(&self) -> Result<PathBuf> {
        match &self.project_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(std::env::current_dir()?),
        }
    }

    /// `host:port` for binding.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
