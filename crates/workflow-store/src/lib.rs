//! # workflow-store
//!
//! The `.agent/tasks.json` task store.
//!
//! - [`file`]: raw file access with a backup copy taken before every write
//! - [`validator`]: document checks applied on every read and write
//! - [`reorder`]: order-key coordination (normalization, moves, rebalancing)
//! - [`store`]: [`TaskStore`], one locked read-modify-write per operation
//! - [`stats`]: per-status and per-category counts for the project view

#![deny(unsafe_code)]

pub mod errors;
pub mod file;
pub mod reorder;
pub mod stats;
pub mod store;
pub mod validator;

pub use errors::{Result, StoreError};
pub use stats::{ProjectOverview, ProjectStats};
pub use store::TaskStore;
