//! # workflow-settings
//!
//! Configuration for the `agent-workflow` CLI and server.
//!
//! Settings are layered (later wins):
//! 1. **Compiled defaults**: [`WorkflowSettings::default()`]
//! 2. **User file**: `~/.agent-workflow/settings.json`
//! 3. **Environment**: legacy `PORT`, then `AGENT_WORKFLOW_*` (nested keys
//!    split on `__`, e.g. `AGENT_WORKFLOW_SERVER__PORT`)
//! 4. **CLI flags**: [`CliOverrides`], applied by the binary

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{load_settings, load_settings_from_path, settings_path};
pub use types::{CliOverrides, ServerSettings, WorkflowSettings};
