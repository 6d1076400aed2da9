//! [`TaskStore`]: every operation is one locked read-modify-write of the task
//! file.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{Local, Utc};
use parking_lot::Mutex;
use tracing::{error, info, instrument, warn};
use workflow_core::ids::generate_unique_task_id;
use workflow_core::ordering::sort_by_key_descending;
use workflow_core::types::format_timestamp;
use workflow_core::{
    MetaUpdate, NewTask, Phase, ProjectMeta, TaskFilter, TaskRecord, TaskStatus, TaskUpdate,
    TaskView, TasksDocument,
};

use crate::errors::{Result, StoreError};
use crate::file::TaskFile;
use crate::reorder;
use crate::stats::{ProjectOverview, ProjectStats};
use crate::validator::validate_document;

/// Task store for one project directory.
///
/// Cheap to clone; clones share the same lock, so operations from any clone
/// never interleave.
#[derive(Debug, Clone)]
pub struct TaskStore {
    file: Arc<Mutex<TaskFile>>,
    project_dir: PathBuf,
}

impl TaskStore {
    /// Store for the project rooted at `project_dir`. The task file is created
    /// lazily on first access.
    pub fn open(project_dir: impl Into<PathBuf>) -> Self {
        let project_dir = project_dir.into();
        Self {
            file: Arc::new(Mutex::new(TaskFile::new(&project_dir))),
            project_dir,
        }
    }

    /// Project root.
    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    /// Path of `tasks.json`.
    pub fn tasks_path(&self) -> PathBuf {
        self.file.lock().tasks_path().to_path_buf()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Transactions
    // ─────────────────────────────────────────────────────────────────────

    fn read_only<T>(&self, f: impl FnOnce(&TasksDocument) -> Result<T>) -> Result<T> {
        let file = self.file.lock();
        let doc = load(&file)?;
        f(&doc)
    }

    fn modify<T>(&self, f: impl FnOnce(&mut TasksDocument) -> Result<T>) -> Result<T> {
        let file = self.file.lock();
        let mut doc = load(&file)?;
        let out = f(&mut doc)?;
        save(&file, &mut doc)?;
        Ok(out)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Task operations
    // ─────────────────────────────────────────────────────────────────────

    /// Give legacy tasks without an order key one. Writes only when something
    /// changed; returns how many tasks were updated.
    #[instrument(skip(self))]
    pub fn normalize_orders(&self) -> Result<usize> {
        let file = self.file.lock();
        let mut doc = load(&file)?;
        let assigned = reorder::normalize_orders(&mut doc);
        if assigned > 0 {
            save(&file, &mut doc)?;
        }
        Ok(assigned)
    }

    /// Create a task under an explicit id.
    #[instrument(skip(self, new), fields(title = %new.title))]
    pub fn create_task(&self, task_id: &str, new: NewTask) -> Result<TaskView> {
        self.modify(|doc| insert_task(doc, task_id.to_string(), new))
    }

    /// Create a task, deriving its id from the title and today's date.
    #[instrument(skip(self, new), fields(title = %new.title))]
    pub fn create_task_with_generated_id(&self, new: NewTask) -> Result<TaskView> {
        self.modify(|doc| {
            let title = required_title(&new)?;
            let id = generate_unique_task_id(title, Local::now().date_naive(), |candidate| {
                doc.tasks.contains_key(candidate)
            });
            insert_task(doc, id, new)
        })
    }

    /// Merge `update` into a task and apply the status and phase side effects.
    #[instrument(skip(self, update))]
    pub fn update_task(&self, task_id: &str, update: TaskUpdate) -> Result<TaskView> {
        self.modify(|doc| {
            let reordered = update.order.is_some();
            let task = doc
                .tasks
                .get_mut(task_id)
                .ok_or_else(|| StoreError::task_not_found(task_id))?;
            apply_update(task, update);
            if reordered {
                let _ = reorder::rebalance_if_needed(doc);
            }
            view(doc, task_id)
        })
    }

    /// Mark a task completed.
    pub fn complete_task(&self, task_id: &str) -> Result<TaskView> {
        self.update_task(task_id, TaskUpdate::status(TaskStatus::Completed))
    }

    /// Remove a task, returning what was removed.
    #[instrument(skip(self))]
    pub fn delete_task(&self, task_id: &str) -> Result<TaskView> {
        self.modify(|doc| {
            let task = doc
                .tasks
                .shift_remove(task_id)
                .ok_or_else(|| StoreError::task_not_found(task_id))?;
            info!(task_id, "task deleted");
            Ok(TaskView::new(task_id, task))
        })
    }

    /// Tasks passing `filter`, in display order.
    pub fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<TaskView>> {
        self.read_only(|doc| {
            let mut tasks: Vec<TaskView> = doc
                .tasks
                .iter()
                .filter(|(_, task)| filter.matches(task))
                .map(|(id, task)| TaskView::new(id.clone(), task.clone()))
                .collect();
            sort_by_key_descending(&mut tasks);
            Ok(tasks)
        })
    }

    /// One task by id.
    pub fn get_task(&self, task_id: &str) -> Result<TaskView> {
        self.read_only(|doc| view(doc, task_id))
    }

    /// The whole document as currently stored.
    pub fn read_document(&self) -> Result<TasksDocument> {
        self.read_only(|doc| Ok(doc.clone()))
    }

    /// Merge `update` into the project metadata.
    #[instrument(skip(self, update))]
    pub fn update_meta(&self, update: MetaUpdate) -> Result<ProjectMeta> {
        let file = self.file.lock();
        let mut doc = load(&file)?;
        doc.meta.apply(update);
        save(&file, &mut doc)?;
        Ok(doc.meta)
    }

    /// Move a task to `position` in the global display order.
    #[instrument(skip(self))]
    pub fn reorder_task(&self, task_id: &str, position: usize) -> Result<TaskView> {
        self.modify(|doc| {
            let _ = reorder::reorder_by_position(doc, task_id, position)?;
            let _ = reorder::rebalance_if_needed(doc);
            view(doc, task_id)
        })
    }

    /// Move a task between two neighbors given by id.
    #[instrument(skip(self))]
    pub fn reorder_task_between(
        &self,
        task_id: &str,
        before_id: Option<&str>,
        after_id: Option<&str>,
    ) -> Result<TaskView> {
        self.modify(|doc| {
            let _ = reorder::reorder_by_references(doc, task_id, before_id, after_id)?;
            let _ = reorder::rebalance_if_needed(doc);
            view(doc, task_id)
        })
    }

    /// Project path, metadata and counts.
    pub fn overview(&self) -> Result<ProjectOverview> {
        self.read_only(|doc| {
            Ok(ProjectOverview {
                project_path: self.project_dir.clone(),
                meta: doc.meta.clone(),
                stats: ProjectStats::collect(doc.tasks.values()),
            })
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Read the document, falling back to the backup and then to an empty
/// document when the file is unreadable or invalid.
fn load(file: &TaskFile) -> Result<TasksDocument> {
    let _ = file.ensure_exists(&TasksDocument::initial(Utc::now()))?;

    match file.read().and_then(checked) {
        Ok(doc) => Ok(doc),
        Err(e) => {
            error!(error = %e, path = %file.tasks_path().display(), "failed to read tasks file");
            match file.restore_from_backup().and_then(checked) {
                Ok(doc) => {
                    warn!("tasks file restored from backup");
                    Ok(doc)
                }
                Err(backup_err) => {
                    error!(error = %backup_err, "backup restore failed, starting from an empty document");
                    Ok(TasksDocument::initial(Utc::now()))
                }
            }
        }
    }
}

fn checked(doc: TasksDocument) -> Result<TasksDocument> {
    validate_document(&doc)?;
    Ok(doc)
}

fn save(file: &TaskFile, doc: &mut TasksDocument) -> Result<()> {
    doc.meta.updated = format_timestamp(Utc::now());
    validate_document(doc)?;
    file.write(doc)
}

fn view(doc: &TasksDocument, task_id: &str) -> Result<TaskView> {
    doc.tasks
        .get(task_id)
        .map(|task| TaskView::new(task_id, task.clone()))
        .ok_or_else(|| StoreError::task_not_found(task_id))
}

fn required_title(new: &NewTask) -> Result<&str> {
    let title = new.title.trim();
    if title.is_empty() {
        return Err(StoreError::Validation("title is required".into()));
    }
    Ok(title)
}

fn insert_task(doc: &mut TasksDocument, task_id: String, new: NewTask) -> Result<TaskView> {
    if task_id.trim().is_empty() {
        return Err(StoreError::Validation("task id must not be empty".into()));
    }
    if doc.tasks.contains_key(&task_id) {
        return Err(StoreError::task_exists(task_id));
    }
    let _ = required_title(&new)?;

    let order = reorder::initial_order(doc);
    let mut task = TaskRecord::new(new.title, Utc::now());
    task.status = new.status.unwrap_or_default();
    task.category = new.category.unwrap_or_default();
    task.description = new.description.unwrap_or_default();
    task.dependencies = new.dependencies.unwrap_or_default();
    task.phase = new.phase;
    task.files = new.files;
    task.notes = new.notes;
    task.order = Some(order.to_string());
    task.merge_extra(new.extra);
    apply_status_effects(&mut task, None);

    info!(task_id = %task_id, order = %order, "task created");
    let view = TaskView::new(task_id.clone(), task.clone());
    let _ = doc.tasks.insert(task_id, task);
    Ok(view)
}

fn apply_update(task: &mut TaskRecord, update: TaskUpdate) {
    let TaskUpdate {
        title,
        status,
        category,
        description,
        dependencies,
        phase,
        files,
        notes,
        order,
        extra,
    } = update;

    if let Some(title) = title {
        task.title = title;
    }
    if let Some(status) = status {
        task.status = status;
    }
    if let Some(category) = category {
        task.category = category;
    }
    if let Some(description) = description {
        task.description = description;
    }
    if let Some(dependencies) = dependencies {
        task.dependencies = dependencies;
    }
    if let Some(phase) = phase {
        task.phase = Some(phase);
    }
    if files.is_some() {
        task.files = files;
    }
    if notes.is_some() {
        task.notes = notes;
    }
    if order.is_some() {
        task.order = order;
    }
    task.merge_extra(extra);

    if status.is_some() {
        apply_status_effects(task, phase);
    } else if let Some(phase) = phase {
        record_phase(task, phase);
    }
}

/// Stamp `started_at`/`completed_at` the first time a task reaches a status,
/// and seed the working fields of a newly active task.
fn apply_status_effects(task: &mut TaskRecord, phase: Option<Phase>) {
    let now = format_timestamp(Utc::now());
    match task.status {
        TaskStatus::Active if task.started_at.is_none() => {
            task.started_at = Some(now);
            let _ = task.phase.get_or_insert(Phase::Plan);
            let _ = task.phases_completed.get_or_insert_with(Vec::new);
            let _ = task.files.get_or_insert_with(Default::default);
            let _ = task.notes.get_or_insert_with(Default::default);
        }
        TaskStatus::Completed if task.completed_at.is_none() => {
            task.completed_at = Some(now);
        }
        _ => {}
    }
    if let Some(phase) = phase {
        record_phase(task, phase);
    }
}

fn record_phase(task: &mut TaskRecord, phase: Phase) {
    if let Some(done) = task.phases_completed.as_mut() {
        if !done.contains(&phase) {
            done.push(phase);
        }
    }
}
