//! Document checks run before every write and after every read.
//!
//! The serde model already enforces required fields and enum values; this
//! covers what types cannot: timestamp formats and empty ids. Note keys are
//! free-form; hand-edited files with keys like `Plan` stay readable.

use workflow_core::TasksDocument;
use workflow_core::types::parse_timestamp;

use crate::errors::{Result, StoreError};

/// Check a whole document.
pub fn validate_document(doc: &TasksDocument) -> Result<()> {
    check_timestamp("meta.updated", &doc.meta.updated)?;

    for (id, task) in &doc.tasks {
        if id.trim().is_empty() {
            return Err(StoreError::Validation("task id must not be empty".into()));
        }
        check_timestamp(&format!("tasks.{id}.created_at"), &task.created_at)?;
        if let Some(started) = &task.started_at {
            check_timestamp(&format!("tasks.{id}.started_at"), started)?;
        }
        if let Some(completed) = &task.completed_at {
            check_timestamp(&format!("tasks.{id}.completed_at"), completed)?;
        }
    }
    Ok(())
}

fn check_timestamp(field: &str, value: &str) -> Result<()> {
    if parse_timestamp(value).is_some() {
        Ok(())
    } else {
        Err(StoreError::Validation(format!(
            "{field}: '{value}' is not an RFC 3339 timestamp"
        )))
    }
}
