//! Raw access to `.agent/tasks.json` and its backup copy.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use workflow_core::TasksDocument;

use crate::errors::{Result, StoreError};

/// Directory holding the task file, relative to the project root.
pub const AGENT_DIR: &str = ".agent";
/// Task file name.
pub const TASKS_FILE: &str = "tasks.json";
/// Backup file name, written next to the task file.
pub const BACKUP_FILE: &str = "tasks.backup.json";

/// The task file of one project.
#[derive(Debug, Clone)]
pub struct TaskFile {
    tasks_path: PathBuf,
    backup_path: PathBuf,
}

impl TaskFile {
    /// Locate the task file under `project_dir`. Nothing is touched on disk.
    pub fn new(project_dir: &Path) -> Self {
        let agent_dir = project_dir.join(AGENT_DIR);
        Self {
            tasks_path: agent_dir.join(TASKS_FILE),
            backup_path: agent_dir.join(BACKUP_FILE),
        }
    }

    /// Path of `tasks.json`.
    pub fn tasks_path(&self) -> &Path {
        &self.tasks_path
    }

    /// Path of `tasks.backup.json`.
    pub fn backup_path(&self) -> &Path {
        &self.backup_path
    }

    /// Write `initial` if the task file does not exist yet.
    ///
    /// Returns whether a new file was created.
    pub fn ensure_exists(&self, initial: &TasksDocument) -> Result<bool> {
        if self.tasks_path.exists() {
            return Ok(false);
        }
        if let Some(parent) = self.tasks_path.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }
        self.write_raw(initial)?;
        info!(path = %self.tasks_path.display(), "created tasks file");
        Ok(true)
    }

    /// Read and parse the task file.
    pub fn read(&self) -> Result<TasksDocument> {
        read_document(&self.tasks_path)
    }

    /// Back up the current file, then write `doc` in place of it.
    pub fn write(&self, doc: &TasksDocument) -> Result<()> {
        self.create_backup();
        self.write_raw(doc)
    }

    /// Copy the current task file over the backup.
    ///
    /// A missing task file is not an error; any other failure is logged and
    /// the write that follows goes ahead.
    pub fn create_backup(&self) {
        match fs::copy(&self.tasks_path, &self.backup_path) {
            Ok(_) => debug!(path = %self.backup_path.display(), "backup written"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(error = %e, path = %self.backup_path.display(), "failed to create backup"),
        }
    }

    /// Copy the backup over the task file and read the result.
    pub fn restore_from_backup(&self) -> Result<TasksDocument> {
        info!(path = %self.backup_path.display(), "restoring tasks file from backup");
        let doc = read_document(&self.backup_path)?;
        let _ = fs::copy(&self.backup_path, &self.tasks_path)
            .map_err(|e| StoreError::io(&self.tasks_path, e))?;
        Ok(doc)
    }

    fn write_raw(&self, doc: &TasksDocument) -> Result<()> {
        let mut text = serde_json::to_string_pretty(doc)?;
        text.push('\n');
        fs::write(&self.tasks_path, text).map_err(|e| StoreError::io(&self.tasks_path, e))
    }
}

fn read_document(path: &Path) -> Result<TasksDocument> {
    let text = fs::read_to_string(path).map_err(|e| StoreError::io(path, e))?;
    Ok(serde_json::from_str(&text)?)
}
