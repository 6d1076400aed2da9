//! Board counts for the project view.

use std::path::PathBuf;

use indexmap::IndexMap;
use serde::Serialize;
use workflow_core::{ProjectMeta, TaskRecord, TaskStatus};

/// Task counts by status and category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectStats {
    /// All tasks.
    pub total: usize,
    /// Tasks in the backlog.
    pub backlog: usize,
    /// Tasks in progress.
    pub active: usize,
    /// Finished tasks.
    pub completed: usize,
    /// Only statuses that occur, in first-seen order.
    pub by_status: IndexMap<String, usize>,
    /// Uncategorized tasks are not counted here.
    pub by_category: IndexMap<String, usize>,
}

impl ProjectStats {
    /// Count a set of tasks.
    pub fn collect<'a, I>(tasks: I) -> Self
    where
        I: IntoIterator<Item = &'a TaskRecord>,
    {
        let mut stats = Self::default();
        for task in tasks {
            stats.total += 1;
            match task.status {
                TaskStatus::Backlog => stats.backlog += 1,
                TaskStatus::Active => stats.active += 1,
                TaskStatus::Completed => stats.completed += 1,
            }
            *stats
                .by_status
                .entry(task.status.as_str().to_string())
                .or_default() += 1;
            if !task.category.is_empty() {
                *stats.by_category.entry(task.category.clone()).or_default() += 1;
            }
        }
        stats
    }
}

/// Everything `GET /api/project` reports.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectOverview {
    /// Project root the store serves.
    pub project_path: PathBuf,
    /// Document metadata.
    pub meta: ProjectMeta,
    /// Board counts.
    pub stats: ProjectStats,
}
