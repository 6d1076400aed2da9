//! Server configuration.

use serde::{Deserialize, Serialize};
use workflow_settings::WorkflowSettings;

/// Configuration for the HTTP server.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind (default `"127.0.0.1"`).
    pub host: String,
    /// Port to bind (default `0` for auto-assign).
    pub port: u16,
    /// Watch the task file and push change events.
    pub watch_files: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            watch_files: false,
        }
    }
}

impl From<&WorkflowSettings> for ServerConfig {
    fn from(settings: &WorkflowSettings) -> Self {
        Self {
            host: settings.server.host.clone(),
            port: settings.server.port,
            watch_files: settings.watch_files,
        }
    }
}
