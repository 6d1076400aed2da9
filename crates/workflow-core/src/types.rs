//! The `.agent/tasks.json` document model.
//!
//! Field names are `snake_case` on the wire to match files written by earlier
//! versions of the tool. Keys this model does not know about are carried in
//! `extra` maps and written back untouched.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::ordering::{OrderKey, Orderable, parse_order_key_or_zero};

// ─────────────────────────────────────────────────────────────────────────────
// Enums
// ─────────────────────────────────────────────────────────────────────────────

/// Board column a task lives in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Not started.
    #[default]
    Backlog,
    /// Being worked on.
    Active,
    /// Done.
    Completed,
}

impl TaskStatus {
    /// All statuses in board order.
    pub const ALL: [Self; 3] = [Self::Backlog, Self::Active, Self::Completed];

    /// Wire representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Backlog => "backlog",
            Self::Active => "active",
            Self::Completed => "completed",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Workflow phase of an active task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Planning.
    #[default]
    Plan,
    /// Writing the spec.
    Spec,
    /// Detailing the spec.
    Detail,
    /// Writing code.
    Implementation,
    /// Testing.
    Test,
    /// Review.
    Review,
}

impl Phase {
    /// Wire representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Plan => "plan",
            Self::Spec => "spec",
            Self::Detail => "detail",
            Self::Implementation => "implementation",
            Self::Test => "test",
            Self::Review => "review",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Records
// ─────────────────────────────────────────────────────────────────────────────

/// Files touched by a task, grouped by what happened to them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFiles {
    /// Files the plan intends to touch.
    #[serde(default)]
    pub planned: Vec<String>,
    /// Files created.
    #[serde(default)]
    pub created: Vec<String>,
    /// Files modified.
    #[serde(default)]
    pub modified: Vec<String>,
    /// Files covered by tests.
    #[serde(default)]
    pub tested: Vec<String>,
}

/// A task as stored in `tasks.json`. The id is the key of the task map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    /// Short title.
    pub title: String,
    /// Board column.
    pub status: TaskStatus,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
    /// Free-form grouping.
    #[serde(default)]
    pub category: String,
    /// Longer description.
    #[serde(default)]
    pub description: String,
    /// Ids of tasks this one depends on.
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Decimal order key; see [`crate::ordering`].
    #[serde(
        default,
        deserialize_with = "lenient_order",
        skip_serializing_if = "Option::is_none"
    )]
    pub order: Option<String>,
    /// Current phase (active tasks).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<Phase>,
    /// When the task first became active.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    /// When the task was completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    /// Phases visited so far.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phases_completed: Option<Vec<Phase>>,
    /// Files touched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<TaskFiles>,
    /// Per-phase notes, keyed by name (conventionally the lowercase phase).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<IndexMap<String, String>>,
    /// Keys not modelled above.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TaskRecord {
    /// Keys that are modelled fields (plus the view-only `id`) and therefore
    /// never stored in [`TaskRecord::extra`].
    pub const RESERVED_KEYS: [&'static str; 14] = [
        "id",
        "title",
        "status",
        "created_at",
        "category",
        "description",
        "dependencies",
        "order",
        "phase",
        "started_at",
        "completed_at",
        "phases_completed",
        "files",
        "notes",
    ];

    /// A fresh backlog task with nothing but a title.
    pub fn new(title: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            title: title.into(),
            status: TaskStatus::Backlog,
            created_at: format_timestamp(created_at),
            category: String::new(),
            description: String::new(),
            dependencies: Vec::new(),
            order: None,
            phase: None,
            started_at: None,
            completed_at: None,
            phases_completed: None,
            files: None,
            notes: None,
            extra: Map::new(),
        }
    }

    /// Merge unmodelled keys, skipping any that collide with modelled fields.
    pub fn merge_extra(&mut self, extra: Map<String, Value>) {
        for (key, value) in extra {
            if !Self::RESERVED_KEYS.contains(&key.as_str()) {
                let _ = self.extra.insert(key, value);
            }
        }
    }
}

impl Orderable for TaskRecord {
    fn order_key(&self) -> Option<OrderKey> {
        self.order
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(|s| parse_order_key_or_zero(Some(s)))
    }

    fn set_order_key(&mut self, key: OrderKey) {
        self.order = Some(key.to_string());
    }

    fn created_at(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.created_at)
    }
}

/// Accept the order key as a string, a bare number, or null.
///
/// Anything else is kept as text and later coerced to zero.
fn lenient_order<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

/// A task together with its id, as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskView {
    /// Task id.
    pub id: String,
    /// The stored record.
    #[serde(flatten)]
    pub task: TaskRecord,
}

impl TaskView {
    /// Pair a record with its id.
    pub fn new(id: impl Into<String>, task: TaskRecord) -> Self {
        Self {
            id: id.into(),
            task,
        }
    }
}

impl Orderable for TaskView {
    fn order_key(&self) -> Option<OrderKey> {
        self.task.order_key()
    }

    fn set_order_key(&mut self, key: OrderKey) {
        self.task.set_order_key(key);
    }

    fn created_at(&self) -> Option<DateTime<Utc>> {
        Orderable::created_at(&self.task)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Document
// ─────────────────────────────────────────────────────────────────────────────

/// Project-level metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectMeta {
    /// RFC 3339 timestamp of the last write.
    pub updated: String,
    /// What the project is currently focused on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focus: Option<String>,
    /// Keys not modelled above.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The whole `tasks.json` file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TasksDocument {
    /// Project metadata.
    pub meta: ProjectMeta,
    /// Tasks by id, in file order.
    pub tasks: IndexMap<String, TaskRecord>,
}

impl TasksDocument {
    /// The document written for a brand-new project.
    pub fn initial(now: DateTime<Utc>) -> Self {
        Self {
            meta: ProjectMeta {
                updated: format_timestamp(now),
                focus: Some("Project start".to_string()),
                extra: Map::new(),
            },
            tasks: IndexMap::new(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Request params
// ─────────────────────────────────────────────────────────────────────────────

/// Fields accepted when creating a task.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewTask {
    /// Required title.
    #[serde(default)]
    pub title: String,
    /// Initial status (default backlog).
    #[serde(default)]
    pub status: Option<TaskStatus>,
    /// Category.
    #[serde(default)]
    pub category: Option<String>,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
    /// Dependencies.
    #[serde(default)]
    pub dependencies: Option<Vec<String>>,
    /// Initial phase.
    #[serde(default)]
    pub phase: Option<Phase>,
    /// Files.
    #[serde(default)]
    pub files: Option<TaskFiles>,
    /// Notes.
    #[serde(default)]
    pub notes: Option<IndexMap<String, String>>,
    /// Extra keys to store on the record.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NewTask {
    /// Create params with only a title.
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

/// A partial update. Absent fields are left alone.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskUpdate {
    /// New title.
    #[serde(default)]
    pub title: Option<String>,
    /// New status.
    #[serde(default)]
    pub status: Option<TaskStatus>,
    /// New category.
    #[serde(default)]
    pub category: Option<String>,
    /// New description.
    #[serde(default)]
    pub description: Option<String>,
    /// Replacement dependency list.
    #[serde(default)]
    pub dependencies: Option<Vec<String>>,
    /// New phase; appended to `phases_completed` when first seen.
    #[serde(default)]
    pub phase: Option<Phase>,
    /// Replacement files.
    #[serde(default)]
    pub files: Option<TaskFiles>,
    /// Replacement notes.
    #[serde(default)]
    pub notes: Option<IndexMap<String, String>>,
    /// Explicit order key.
    #[serde(default, deserialize_with = "lenient_order")]
    pub order: Option<String>,
    /// Extra keys merged into the record.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TaskUpdate {
    /// An update that only changes the status.
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }
}

/// A partial update to the project metadata.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetaUpdate {
    /// New focus line.
    #[serde(default)]
    pub focus: Option<String>,
    /// Other keys merged into the metadata. `updated` is always rewritten on
    /// save, so a value sent here is dropped.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ProjectMeta {
    /// Apply a metadata update.
    pub fn apply(&mut self, update: MetaUpdate) {
        if let Some(focus) = update.focus {
            self.focus = Some(focus);
        }
        for (key, value) in update.extra {
            if key != "updated" {
                let _ = self.extra.insert(key, value);
            }
        }
    }
}

/// Optional filters for listing tasks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TaskFilter {
    /// Only this status.
    #[serde(default)]
    pub status: Option<TaskStatus>,
    /// Only this phase.
    #[serde(default)]
    pub phase: Option<Phase>,
    /// Only this category.
    #[serde(default)]
    pub category: Option<String>,
}

impl TaskFilter {
    /// Whether a record passes every filter that is set.
    pub fn matches(&self, task: &TaskRecord) -> bool {
        self.status.is_none_or(|s| task.status == s)
            && self.phase.is_none_or(|p| task.phase == Some(p))
            && self.category.as_deref().is_none_or(|c| task.category == c)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Timestamps
// ─────────────────────────────────────────────────────────────────────────────

/// Format a timestamp the way the file stores it (millisecond precision, `Z`).
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Parse a stored RFC 3339 timestamp.
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn status_wire_names() {
        assert_eq!(serde_json::to_value(TaskStatus::Active).unwrap(), "active");
        let parsed: TaskStatus = serde_json::from_str("\"completed\"").unwrap();
        assert_eq!(parsed, TaskStatus::Completed);
        assert!(serde_json::from_str::<TaskStatus>("\"pending\"").is_err());
    }

    #[test]
    fn phase_wire_names() {
        assert_eq!(Phase::Implementation.to_string(), "implementation");
        let parsed: Phase = serde_json::from_str("\"review\"").unwrap();
        assert_eq!(parsed, Phase::Review);
    }

    #[test]
    fn record_keeps_unknown_keys() {
        let json = serde_json::json!({
            "title": "Write docs",
            "status": "backlog",
            "created_at": "2025-01-15T10:00:00.000Z",
            "order": "1000",
            "priority": "high"
        });
        let record: TaskRecord = serde_json::from_value(json).unwrap();
        assert_eq!(record.extra["priority"], "high");
        assert_eq!(record.order.as_deref(), Some("1000"));

        let back = serde_json::to_value(&record).unwrap();
        assert_eq!(back["priority"], "high");
        assert_eq!(back["category"], "");
        assert!(back.get("phase").is_none());
    }

    #[test]
    fn numeric_order_is_accepted() {
        let json = serde_json::json!({
            "title": "t",
            "status": "active",
            "created_at": "2025-01-15T10:00:00Z",
            "order": 1500.5
        });
        let record: TaskRecord = serde_json::from_value(json).unwrap();
        assert_eq!(record.order.as_deref(), Some("1500.5"));
        assert_eq!(record.order_key().unwrap().value(), 1500.5);
    }

    #[test]
    fn empty_order_counts_as_missing() {
        let mut record = TaskRecord::new("t", at(0));
        assert!(record.order_key().is_none());
        record.order = Some(String::new());
        assert!(record.order_key().is_none());
        record.order = Some("garbage".into());
        assert_eq!(record.order_key(), Some(OrderKey::ZERO));
    }

    #[test]
    fn set_order_key_writes_canonical_text() {
        let mut record = TaskRecord::new("t", at(0));
        record.set_order_key(OrderKey::new(2000.0));
        assert_eq!(record.order.as_deref(), Some("2000"));
    }

    #[test]
    fn created_at_parses_for_tie_breaks() {
        let record = TaskRecord::new("t", at(1_700_000_000));
        assert_eq!(Orderable::created_at(&record), Some(at(1_700_000_000)));
        assert_eq!(record.created_at, "2023-11-14T22:13:20.000Z");
    }

    #[test]
    fn merge_extra_skips_reserved_keys() {
        let mut record = TaskRecord::new("t", at(0));
        let mut extra = Map::new();
        let _ = extra.insert("id".into(), "x".into());
        let _ = extra.insert("order".into(), "9".into());
        let _ = extra.insert("owner".into(), "sam".into());
        record.merge_extra(extra);
        assert_eq!(record.extra.len(), 1);
        assert_eq!(record.extra["owner"], "sam");
    }

    #[test]
    fn view_flattens_id() {
        let view = TaskView::new("250115-write-docs", TaskRecord::new("Write docs", at(0)));
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["id"], "250115-write-docs");
        assert_eq!(json["title"], "Write docs");
    }

    #[test]
    fn filter_matches_every_set_field() {
        let mut task = TaskRecord::new("t", at(0));
        task.status = TaskStatus::Active;
        task.phase = Some(Phase::Test);
        task.category = "api".into();

        assert!(TaskFilter::default().matches(&task));
        let by_status = TaskFilter {
            status: Some(TaskStatus::Active),
            ..TaskFilter::default()
        };
        assert!(by_status.matches(&task));
        let wrong_phase = TaskFilter {
            phase: Some(Phase::Plan),
            ..by_status.clone()
        };
        assert!(!wrong_phase.matches(&task));
        let wrong_category = TaskFilter {
            category: Some("ui".into()),
            ..TaskFilter::default()
        };
        assert!(!wrong_category.matches(&task));
    }

    #[test]
    fn meta_update_merges_and_ignores_updated() {
        let mut meta = TasksDocument::initial(at(0)).meta;
        let update: MetaUpdate = serde_json::from_value(serde_json::json!({
            "focus": "Ship v1",
            "updated": "2000-01-01T00:00:00Z",
            "owner": "sam"
        }))
        .unwrap();
        meta.apply(update);
        assert_eq!(meta.focus.as_deref(), Some("Ship v1"));
        assert_eq!(meta.updated, "1970-01-01T00:00:00.000Z");
        assert_eq!(meta.extra["owner"], "sam");
    }

    #[test]
    fn initial_document_is_empty() {
        let doc = TasksDocument::initial(at(0));
        assert!(doc.tasks.is_empty());
        assert_eq!(doc.meta.updated, "1970-01-01T00:00:00.000Z");
        let json = serde_json::to_value(&doc).unwrap();
        assert!(json["tasks"].as_object().unwrap().is_empty());
    }
}
