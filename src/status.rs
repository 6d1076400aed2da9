//! `agent-workflow status`: counts per column and the active tasks.

use std::fmt::Write;

use workflow_core::{TaskStatus, TaskView};

/// Render the status report for tasks in display order.
pub fn render(tasks: &[TaskView]) -> String {
    let mut out = String::from("Project status\n\n");
    if tasks.is_empty() {
        out.push_str("No tasks found.\n");
        return out;
    }

    let count = |status: TaskStatus| tasks.iter().filter(|t| t.task.status == status).count();
    let _ = writeln!(out, "Backlog:     {}", count(TaskStatus::Backlog));
    let _ = writeln!(out, "In progress: {}", count(TaskStatus::Active));
    let _ = writeln!(out, "Completed:   {}", count(TaskStatus::Completed));
    let _ = writeln!(out, "Total:       {}", tasks.len());

    let active: Vec<&TaskView> = tasks
        .iter()
        .filter(|t| t.task.status == TaskStatus::Active)
        .collect();
    if !active.is_empty() {
        out.push_str("\nActive tasks:\n");
        for view in active {
            let phase = view.task.phase.unwrap_or_default();
            let category = if view.task.category.is_empty() {
                "uncategorized"
            } else {
                view.task.category.as_str()
            };
            let _ = writeln!(out, "  • {} - {}", view.id, view.task.title);
            let _ = writeln!(out, "    phase: {phase} | category: {category}");
        }
    }
    out
}
