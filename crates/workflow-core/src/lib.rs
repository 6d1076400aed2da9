//! # workflow-core
//!
//! Shared building blocks for the agent-workflow task board:
//!
//! - [`ordering`]: fractional order keys for drag-and-drop reordering
//! - [`types`]: the `.agent/tasks.json` document model
//! - [`ids`]: `YYMMDD-slug` task identifiers
//! - [`logging`]: `tracing` subscriber setup

#![deny(unsafe_code)]

pub mod ids;
pub mod logging;
pub mod ordering;
pub mod types;

pub use ordering::{OrderKey, Orderable, Placement, PlacementKind};
pub use types::{
    MetaUpdate, NewTask, Phase, ProjectMeta, TaskFiles, TaskFilter, TaskRecord, TaskStatus,
    TaskUpdate, TaskView, TasksDocument,
};
