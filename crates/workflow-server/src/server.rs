//! `WorkflowServer`: router, listener and shared state.

use std::net::SocketAddr;
use std::time::Instant;

use axum::Router;
use axum::routing::{get, post, put};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use workflow_store::TaskStore;

use crate::config::ServerConfig;
use crate::events::{self, EventHub, FileWatcher};
use crate::routes;
use crate::shutdown::Shutdown;

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// The project's task store.
    pub store: TaskStore,
    /// Change-event fan-out.
    pub events: EventHub,
    /// Cancelled on shutdown; ends open event streams.
    pub shutdown: CancellationToken,
    /// When the server started.
    pub start_time: Instant,
}

/// The task board server.
pub struct WorkflowServer {
    config: ServerConfig,
    store: TaskStore,
    events: EventHub,
    shutdown: Shutdown,
    start_time: Instant,
}

impl WorkflowServer {
    /// Create a new server over `store`.
    pub fn new(config: ServerConfig, store: TaskStore) -> Self {
        Self {
            config,
            store,
            events: EventHub::new(),
            shutdown: Shutdown::default(),
            start_time: Instant::now(),
        }
    }

    /// Build the Axum router with all routes.
    pub fn router(&self) -> Router {
        let state = AppState {
            store: self.store.clone(),
            events: self.events.clone(),
            shutdown: self.shutdown.token(),
            start_time: self.start_time,
        };

        Router::new()
            .route("/api/health", get(routes::health))
            .route("/api/tasks", get(routes::list_tasks).post(routes::create_task))
            .route(
                "/api/tasks/{id}",
                get(routes::get_task)
                    .put(routes::update_task)
                    .delete(routes::delete_task),
            )
            .route("/api/tasks/{id}/complete", post(routes::complete_task))
            .route("/api/tasks/{id}/reorder", put(routes::reorder_task))
            .route(
                "/api/tasks/{id}/reorder-between",
                put(routes::reorder_task_between),
            )
            .route("/api/project", get(routes::project))
            .route("/api/project/meta", put(routes::update_meta))
            .route("/api/events", get(events::events_handler))
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
            .with_state(state)
    }

    /// Start publishing change events for the task file, if enabled.
    pub fn watch_task_file(&self) -> notify::Result<Option<FileWatcher>> {
        if !self.config.watch_files {
            return Ok(None);
        }
        events::watch_file(&self.store.tasks_path(), self.events.clone()).map(Some)
    }

    /// Bind and serve until the shutdown token is cancelled.
    ///
    /// Returns the bound address (useful with port 0) and the serve task.
    pub async fn listen(&self) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
        let listener = TcpListener::bind((self.config.host.as_str(), self.config.port)).await?;
        let addr = listener.local_addr()?;
        let app = self.router();
        let token = self.shutdown.token();

        let handle = tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async move { token.cancelled().await })
                .await;
            if let Err(e) = result {
                error!(error = %e, "server stopped with error");
            }
        });

        info!(%addr, "listening");
        Ok((addr, handle))
    }

    /// Get the event hub.
    pub fn events(&self) -> &EventHub {
        &self.events
    }

    /// Get the shutdown handle.
    pub fn shutdown(&self) -> &Shutdown {
        &self.shutdown
    }

    /// Get the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Get the task store.
    pub fn store(&self) -> &TaskStore {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_server(watch_files: bool) -> (tempfile::TempDir, WorkflowServer) {
        let tmp = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            watch_files,
            ..ServerConfig::default()
        };
        let server = WorkflowServer::new(config, TaskStore::open(tmp.path()));
        (tmp, server)
    }

    #[test]
    fn accessors() {
        let (tmp, server) = make_server(false);
        assert_eq!(server.config().port, 0);
        assert!(!server.shutdown().is_triggered());
        assert_eq!(server.events().subscriber_count(), 0);
        assert_eq!(server.store().project_dir(), tmp.path());
    }

    #[test]
    fn watcher_disabled_by_config() {
        let (_tmp, server) = make_server(false);
        assert!(server.watch_task_file().unwrap().is_none());
    }

    #[test]
    fn watcher_enabled_once_file_exists() {
        let (_tmp, server) = make_server(true);
        let _ = server.store().normalize_orders().unwrap();
        let watcher = server.watch_task_file().unwrap().unwrap();
        assert!(watcher.path().ends_with(".agent/tasks.json"));
    }

    #[tokio::test]
    async fn listen_and_shutdown() {
        let (_tmp, server) = make_server(false);
        let (addr, handle) = server.listen().await.unwrap();
        assert_ne!(addr.port(), 0);
        assert!(server.shutdown().drain(handle).await);
        assert!(server.shutdown().is_triggered());
    }
}
