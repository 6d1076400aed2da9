//! `/api` handlers. Store calls lock and touch the disk, so each one runs on
//! the blocking pool.

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::task;
use tracing::debug;
use workflow_core::{MetaUpdate, NewTask, ProjectMeta, TaskFilter, TaskUpdate, TaskView};
use workflow_store::{ProjectOverview, TaskStore};

use crate::errors::ApiError;
use crate::health::{self, HealthResponse};
use crate::server::AppState;

type ApiResult<T> = Result<T, ApiError>;

/// `GET /api/tasks` body.
#[derive(Debug, Serialize)]
pub struct TaskList {
    /// Tasks in display order.
    pub tasks: Vec<TaskView>,
}

/// `PUT /api/project/meta` body.
#[derive(Debug, Serialize)]
pub struct MetaResponse {
    /// Metadata after the update.
    pub meta: ProjectMeta,
}

/// `PUT /api/tasks/{id}/reorder` request.
#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    /// Target index in the display order. Kept raw so a non-number gets a
    /// clear 400.
    #[serde(default)]
    pub position: Value,
}

/// `PUT /api/tasks/{id}/reorder-between` request.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderBetweenRequest {
    /// Task that will precede the moved one; absent for the top.
    #[serde(default)]
    pub before_task_id: Option<String>,
    /// Task that will follow the moved one; absent for the bottom.
    #[serde(default)]
    pub after_task_id: Option<String>,
}

/// GET /api/health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(health::health_check(state.start_time))
}

/// GET /api/tasks
pub async fn list_tasks(
    State(state): State<AppState>,
    filter: Result<Query<TaskFilter>, QueryRejection>,
) -> ApiResult<Json<TaskList>> {
    let Query(filter) = filter?;
    let tasks = with_store(&state.store, move |store| store.list_tasks(&filter)).await?;
    Ok(Json(TaskList { tasks }))
}

/// GET /api/tasks/{id}
pub async fn get_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<TaskView>> {
    let task = with_store(&state.store, move |store| store.get_task(&id)).await?;
    Ok(Json(task))
}

/// POST /api/tasks
pub async fn create_task(
    State(state): State<AppState>,
    body: Result<Json<NewTask>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<TaskView>)> {
    let Json(new) = body?;
    if new.title.trim().is_empty() {
        return Err(ApiError::bad_request("Title is required"));
    }
    let task = with_store(&state.store, move |store| {
        store.create_task_with_generated_id(new)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(task)))
}

/// PUT /api/tasks/{id}
pub async fn update_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<TaskUpdate>, JsonRejection>,
) -> ApiResult<Json<TaskView>> {
    let Json(update) = body?;
    let task = with_store(&state.store, move |store| store.update_task(&id, update)).await?;
    Ok(Json(task))
}

/// POST /api/tasks/{id}/complete
pub async fn complete_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<TaskView>> {
    let task = with_store(&state.store, move |store| store.complete_task(&id)).await?;
    Ok(Json(task))
}

/// DELETE /api/tasks/{id}
pub async fn delete_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let _ = with_store(&state.store, move |store| store.delete_task(&id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/tasks/{id}/reorder
pub async fn reorder_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<ReorderRequest>, JsonRejection>,
) -> ApiResult<Json<TaskView>> {
    let Json(request) = body?;
    let position = parse_position(&request.position)?;
    debug!(task_id = %id, position, "reorder by position");
    let task = with_store(&state.store, move |store| store.reorder_task(&id, position)).await?;
    Ok(Json(task))
}

/// PUT /api/tasks/{id}/reorder-between
pub async fn reorder_task_between(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<ReorderBetweenRequest>, JsonRejection>,
) -> ApiResult<Json<TaskView>> {
    let Json(request) = body?;
    let task = with_store(&state.store, move |store| {
        store.reorder_task_between(
            &id,
            request.before_task_id.as_deref(),
            request.after_task_id.as_deref(),
        )
    })
    .await?;
    Ok(Json(task))
}

/// GET /api/project
pub async fn project(State(state): State<AppState>) -> ApiResult<Json<ProjectOverview>> {
    let overview = with_store(&state.store, TaskStore::overview).await?;
    Ok(Json(overview))
}

/// PUT /api/project/meta
pub async fn update_meta(
    State(state): State<AppState>,
    body: Result<Json<MetaUpdate>, JsonRejection>,
) -> ApiResult<Json<MetaResponse>> {
    let Json(update) = body?;
    let meta = with_store(&state.store, move |store| store.update_meta(update)).await?;
    Ok(Json(MetaResponse { meta }))
}

/// Run `f` against a clone of `store` on the blocking pool.
async fn with_store<T, F>(store: &TaskStore, f: F) -> ApiResult<T>
where
    T: Send + 'static,
    F: FnOnce(&TaskStore) -> workflow_store::Result<T> + Send + 'static,
{
    let store = store.clone();
    let result = task::spawn_blocking(move || f(&store))
        .await
        .map_err(|e| ApiError::internal(format!("Store task failed: {e}")))?;
    Ok(result?)
}

/// A whole, finite number. Negative values clamp to the top.
fn parse_position(value: &Value) -> ApiResult<usize> {
    let Some(n) = value.as_f64() else {
        return Err(ApiError::bad_request("Position must be a number"));
    };
    if !n.is_finite() || n.fract() != 0.0 {
        return Err(ApiError::bad_request("Position must be a whole number"));
    }
    if n <= 0.0 {
        return Ok(0);
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let position = n as usize;
    Ok(position)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    #[test]
    fn position_parsing() {
        assert_eq!(parse_position(&json!(2)).unwrap(), 2);
        assert_eq!(parse_position(&json!(3.0)).unwrap(), 3);
        assert_eq!(parse_position(&json!(-4)).unwrap(), 0);
        assert!(parse_position(&json!("2")).is_err());
        assert!(parse_position(&json!(null)).is_err());
        assert!(parse_position(&json!(1.5)).is_err());
    }

    #[test]
    fn reorder_between_accepts_camel_case() {
        let req: ReorderBetweenRequest =
            serde_json::from_value(json!({"beforeTaskId": "a", "afterTaskId": null})).unwrap();
        assert_eq!(req.before_task_id.as_deref(), Some("a"));
        assert!(req.after_task_id.is_none());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn store_calls_leave_the_runtime_free() {
        let tmp = tempfile::tempdir().unwrap();
        let store = TaskStore::open(tmp.path());
        let slow = tokio::spawn(async move {
            with_store(&store, |store| {
                std::thread::sleep(Duration::from_millis(300));
                store.list_tasks(&TaskFilter::default())
            })
            .await
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!slow.is_finished());
        assert!(slow.await.unwrap().unwrap().is_empty());
    }

    #[tokio::test]
    async fn panicking_store_call_is_internal_error() {
        let tmp = tempfile::tempdir().unwrap();
        let store = TaskStore::open(tmp.path());
        let err = with_store(&store, |_| -> workflow_store::Result<()> {
            panic!("store call blew up")
        })
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.to_string().starts_with("Store task failed"));
    }
}
