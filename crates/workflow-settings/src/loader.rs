//! Settings loading through `figment`.

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized};
use tracing::debug;

use crate::errors::Result;
use crate::types::WorkflowSettings;

/// Prefix of environment overrides.
pub const ENV_PREFIX: &str = "AGENT_WORKFLOW_";

/// Resolve the path to the settings file (`~/.agent-workflow/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home)
        .join(".agent-workflow")
        .join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<WorkflowSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific file with env var overrides.
///
/// A missing file contributes nothing; a malformed one is an error.
pub fn load_settings_from_path(path: &Path) -> Result<WorkflowSettings> {
    debug!(?path, exists = path.exists(), "loading settings");
    Ok(layered(path).extract()?)
}

fn layered(path: &Path) -> Figment {
    Figment::from(Serialized::defaults(WorkflowSettings::default()))
        .merge(Json::file(path))
        .merge(Env::raw().only(&["PORT"]).map(|_| "server.port".into()))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
}
