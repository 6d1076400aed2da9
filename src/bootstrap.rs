//! `agent-workflow init`: lay out a project for the task board.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use workflow_core::TasksDocument;
use workflow_store::file::TaskFile;

/// Directories created under the project root.
const DIRECTORIES: [&str; 3] = [".agent", ".agent/workspace", ".prompts"];

const BACKLOG_TEMPLATE: &str = "\
# Backlog

Ideas and tasks not yet on the board. Move an item to the board with
`POST /api/tasks` or from the dashboard.

## Ideas

- 

## Bugs

- 
";

/// What `init` did for one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Newly created.
    Created,
    /// Left as it was.
    AlreadyExists,
}

/// One line of the `init` report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// Path relative to the project root.
    pub path: PathBuf,
    /// What happened.
    pub outcome: Outcome,
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.outcome {
            Outcome::Created => write!(f, "✓ created {}", self.path.display()),
            Outcome::AlreadyExists => write!(f, "⚠ {} already exists", self.path.display()),
        }
    }
}

/// Create the directories, task file and backlog under `root`. Existing files
/// are never overwritten.
pub fn init_project(root: &Path) -> Result<Vec<Step>> {
    let mut steps = Vec::new();

    for dir in DIRECTORIES {
        let path = root.join(dir);
        let outcome = if path.is_dir() {
            Outcome::AlreadyExists
        } else {
            fs::create_dir_all(&path)
                .with_context(|| format!("Failed to create directory: {}", path.display()))?;
            Outcome::Created
        };
        steps.push(Step {
            path: PathBuf::from(dir),
            outcome,
        });
    }

    let created = TaskFile::new(root)
        .ensure_exists(&TasksDocument::initial(Utc::now()))
        .context("Failed to create tasks file")?;
    steps.push(Step {
        path: PathBuf::from(".agent/tasks.json"),
        outcome: if created {
            Outcome::Created
        } else {
            Outcome::AlreadyExists
        },
    });

    let backlog = root.join("BACKLOG.md");
    let outcome = if backlog.exists() {
        Outcome::AlreadyExists
    } else {
        fs::write(&backlog, BACKLOG_TEMPLATE)
            .with_context(|| format!("Failed to write {}", backlog.display()))?;
        Outcome::Created
    };
    steps.push(Step {
        path: PathBuf::from("BACKLOG.md"),
        outcome,
    });

    Ok(steps)
}
