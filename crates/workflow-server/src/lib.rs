//! # workflow-server
//!
//! Axum HTTP server for the task board.
//!
//! - REST endpoints over [`workflow_store::TaskStore`] under `/api`
//! - `GET /api/events`: Server-Sent Events fed by a `notify` watcher on the
//!   task file, fanned out through `tokio::sync::broadcast`
//! - Graceful shutdown via `tokio::signal` + `CancellationToken`; open event
//!   streams end when the token is cancelled

#![deny(unsafe_code)]

pub mod config;
pub mod errors;
pub mod events;
pub mod health;
pub mod routes;
pub mod server;
pub mod shutdown;

pub use config::ServerConfig;
pub use errors::ApiError;
pub use server::{AppState, WorkflowServer};
pub use shutdown::Shutdown;
