//! Change feed: a `notify` watcher on the task file, fanned out to SSE
//! clients through a broadcast channel.

use std::convert::Infallible;
use std::path::{Path, PathBuf};

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use chrono::Utc;
use futures::{Stream, StreamExt, stream};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, info, warn};
use workflow_core::types::format_timestamp;

use crate::server::AppState;

/// Buffered events per subscriber before it starts lagging.
const CHANNEL_CAPACITY: usize = 64;

/// A message pushed to dashboard clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChangeEvent {
    /// Sent once when a client subscribes.
    Connected {
        /// Human-readable greeting.
        message: String,
    },
    /// A watched file was written.
    FileChanged {
        /// File name, e.g. `tasks.json`.
        file: String,
        /// When the change was seen.
        timestamp: String,
    },
}

impl ChangeEvent {
    /// The greeting sent on subscribe.
    pub fn connected() -> Self {
        Self::Connected {
            message: "Connected to task updates".into(),
        }
    }

    /// A change to `file`, stamped now.
    pub fn file_changed(file: impl Into<String>) -> Self {
        Self::FileChanged {
            file: file.into(),
            timestamp: format_timestamp(Utc::now()),
        }
    }

    fn to_sse(&self) -> Event {
        Event::default().json_data(self).unwrap_or_else(|e| {
            warn!(error = %e, "failed to encode change event");
            Event::default().comment("unencodable event")
        })
    }
}

/// Fan-out point for change events.
#[derive(Debug, Clone)]
pub struct EventHub {
    tx: broadcast::Sender<ChangeEvent>,
}

impl EventHub {
    /// Create a hub with no subscribers.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Send to every current subscriber. Returns how many received it.
    pub fn publish(&self, event: ChangeEvent) -> usize {
        self.tx.send(event).unwrap_or(0)
    }

    /// Subscribe to future events.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.tx.subscribe()
    }

    /// Current subscriber count.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}

/// Keeps the underlying watcher alive; dropping it stops the feed.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    path: PathBuf,
}

impl FileWatcher {
    /// The watched file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl std::fmt::Debug for FileWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileWatcher").field("path", &self.path).finish()
    }
}

/// Publish a [`ChangeEvent::FileChanged`] whenever `file` is created or
/// modified.
///
/// The parent directory is watched so editors that replace the file with a
/// rename are still seen.
pub fn watch_file(file: &Path, hub: EventHub) -> notify::Result<FileWatcher> {
    let dir = file
        .parent()
        .ok_or_else(|| notify::Error::generic("watched file has no parent directory"))?
        .to_path_buf();
    let name = file
        .file_name()
        .ok_or_else(|| notify::Error::generic("watched path has no file name"))?
        .to_os_string();
    let label = name.to_string_lossy().into_owned();

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
        match res {
            Ok(event) => {
                let relevant = matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_))
                    && event.paths.iter().any(|p| p.file_name() == Some(name.as_os_str()));
                if relevant {
                    let receivers = hub.publish(ChangeEvent::file_changed(label.clone()));
                    debug!(file = %label, receivers, "file change published");
                }
            }
            Err(e) => warn!(error = %e, "file watcher error"),
        }
    })?;
    watcher.watch(&dir, RecursiveMode::NonRecursive)?;
    info!(path = %file.display(), "watching for changes");

    Ok(FileWatcher {
        _watcher: watcher,
        path: file.to_path_buf(),
    })
}

/// GET /api/events
///
/// The stream ends when the server starts shutting down.
pub async fn events_handler(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let changes = BroadcastStream::new(state.events.subscribe())
        .filter_map(|msg| async move { msg.ok() });
    let feed = stream::once(async { ChangeEvent::connected() })
        .chain(changes)
        .take_until(state.shutdown.cancelled_owned())
        .map(|event| Ok(event.to_sse()));
    Sse::new(feed).keep_alive(KeepAlive::default())
}
