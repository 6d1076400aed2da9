//! Order-key coordination over a whole [`TasksDocument`].
//!
//! The key arithmetic lives in [`workflow_core::ordering`]; these functions
//! pick the neighbors, write the resulting keys into the document and log
//! anything unusual. None of them touch the disk.

use tracing::{debug, info, warn};
use workflow_core::ordering::{
    compare_descending, compute_initial_key, normalize_missing_keys, place_between, rebalance_all,
    should_rebalance, sort_by_key_descending,
};
use workflow_core::{OrderKey, Orderable, Placement, PlacementKind, TaskRecord, TasksDocument};

use crate::errors::{Result, StoreError};

/// Assign keys to every task lacking one. Returns how many were assigned.
pub fn normalize_orders(doc: &mut TasksDocument) -> usize {
    let missing: Vec<String> = doc
        .tasks
        .iter()
        .filter(|(_, task)| task.order_key().is_none())
        .map(|(id, _)| id.clone())
        .collect();

    let assigned = normalize_missing_keys(doc.tasks.values_mut());
    for id in &missing {
        debug!(task_id = %id, order = ?doc.tasks[id.as_str()].order, "assigned order key");
    }
    if assigned > 0 {
        info!(count = assigned, "normalized tasks without order key");
    }
    assigned
}

/// Key for a task about to be added, placing it above every existing one.
pub fn initial_order(doc: &TasksDocument) -> OrderKey {
    compute_initial_key(doc.tasks.values().filter_map(|task| task.order_key()))
}

/// Task ids in display order.
pub fn ordered_ids(doc: &TasksDocument) -> Vec<String> {
    let mut entries: Vec<(&String, &TaskRecord)> = doc.tasks.iter().collect();
    entries.sort_by(|a, b| compare_descending(a.1, b.1));
    entries.into_iter().map(|(id, _)| id.clone()).collect()
}

/// Move `task_id` to `position` in the global display order.
///
/// The position is counted after removing the task itself and clamped to the
/// end of the list.
pub fn reorder_by_position(
    doc: &mut TasksDocument,
    task_id: &str,
    position: usize,
) -> Result<Placement> {
    if !doc.tasks.contains_key(task_id) {
        return Err(StoreError::task_not_found(task_id));
    }

    let others: Vec<String> = ordered_ids(doc)
        .into_iter()
        .filter(|id| id != task_id)
        .collect();
    let target = position.min(others.len());

    let before = target
        .checked_sub(1)
        .and_then(|i| others.get(i))
        .and_then(|id| doc.tasks[id.as_str()].order_key());
    let after = others
        .get(target)
        .and_then(|id| doc.tasks[id.as_str()].order_key());

    Ok(apply_placement(doc, task_id, before, after))
}

/// Move `task_id` between two named neighbors.
///
/// `before_id` is the task that will precede it (`None` for the top),
/// `after_id` the one that will follow it (`None` for the bottom).
pub fn reorder_by_references(
    doc: &mut TasksDocument,
    task_id: &str,
    before_id: Option<&str>,
    after_id: Option<&str>,
) -> Result<Placement> {
    if !doc.tasks.contains_key(task_id) {
        return Err(StoreError::task_not_found(task_id));
    }
    let before = neighbor_key(doc, before_id)?;
    let after = neighbor_key(doc, after_id)?;
    Ok(apply_placement(doc, task_id, before, after))
}

fn neighbor_key(doc: &TasksDocument, id: Option<&str>) -> Result<Option<OrderKey>> {
    match id {
        None => Ok(None),
        Some(id) => doc
            .tasks
            .get(id)
            .map(|task| task.order_key())
            .ok_or_else(|| StoreError::task_not_found(id)),
    }
}

fn apply_placement(
    doc: &mut TasksDocument,
    task_id: &str,
    before: Option<OrderKey>,
    after: Option<OrderKey>,
) -> Placement {
    let placement = place_between(before, after);
    if placement.kind == PlacementKind::Inverted {
        warn!(
            task_id,
            before = ?before.map(OrderKey::value),
            after = ?after.map(OrderKey::value),
            key = %placement.key,
            "neighbors out of order, using fallback key"
        );
    }
    if let Some(task) = doc.tasks.get_mut(task_id) {
        task.set_order_key(placement.key);
    }
    debug!(task_id, key = %placement.key, kind = ?placement.kind, "task reordered");
    placement
}

/// Respace every key if any two neighbors sit too close. Returns whether the
/// document changed.
pub fn rebalance_if_needed(doc: &mut TasksDocument) -> bool {
    let mut tasks: Vec<&mut TaskRecord> = doc.tasks.values_mut().collect();
    sort_by_key_descending(&mut tasks);
    if !should_rebalance(&tasks) {
        return false;
    }
    rebalance_all(&mut tasks);
    info!(count = tasks.len(), "rebalanced order keys");
    true
}
