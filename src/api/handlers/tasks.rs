use axum::extract::{Path, State};
use axum::{Extension, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::require_list;
use crate::api::middleware::Principal;
use crate::api::response::{ApiError, JSend};
use crate::storage::models::Task;
use crate::AppState;

#[derive(Debug, Deserialize, Serialize)]
pub struct CreateTaskRequest {
    pub title: String,
}

#[derive(Debug, Deserialize, Serialize, Default)]
pub struct UpdateTaskRequest {
    #[serde(default)]
    pub completed: Option<bool>,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TaskResponse {
    pub completed: bool,
    pub created_at: String,
    pub id: String,
    pub list_id: String,
    pub title: String,
}

/// GET /lists/:list_id/tasks — all tasks in a list the user owns
pub async fn get_tasks(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(list_id): Path<String>,
) -> Result<Json<JSend<Vec<TaskResponse>>>, ApiError> {
    let list = require_list(&state.db, &list_id, &principal.user_id)?;

    let tasks = state
        .db
        .get_tasks_by_list(&list.id)
        .map_err(|e| ApiError::internal(e.to_string()))?;

    Ok(JSend::success(tasks.iter().map(task_to_response).collect()))
}

/// POST /lists/:list_id/tasks — create a task in a list the user owns
pub async fn create_task(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(list_id): Path<String>,
    Json(req): Json<CreateTaskRequest>,
) -> Result<Json<JSend<TaskResponse>>, ApiError> {
    if req.title.trim().is_empty() {
        return Err(ApiError::bad_request("title is required"));
    }

    let list = require_list(&state.db, &list_id, &principal.user_id)?;

    let task = Task {
        completed: false,
        created_at: Utc::now(),
        id: uuid::Uuid::new_v4().to_string(),
        list_id: list.id,
        title: req.title,
    };
    state
        .db
        .put_task(&task)
        .map_err(|e| ApiError::internal(e.to_string()))?;

    tracing::debug!(task_id = %task.id, "Created task");
    Ok(JSend::success(task_to_response(&task)))
}

/// PATCH /lists/:list_id/tasks/:task_id — update a task in an owned list
pub async fn update_task(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path((list_id, task_id)): Path<(String, String)>,
    Json(req): Json<UpdateTaskRequest>,
) -> Result<Json<JSend<TaskResponse>>, ApiError> {
    let list = require_list(&state.db, &list_id, &principal.user_id)?;
    let mut task = require_task(&state, &task_id, &list.id)?;

    if let Some(title) = req.title {
        if title.trim().is_empty() {
            return Err(ApiError::bad_request("title must not be empty"));
        }
        task.title = title;
    }
    if let Some(completed) = req.completed {
        task.completed = completed;
    }

    state
        .db
        .put_task(&task)
        .map_err(|e| ApiError::internal(e.to_string()))?;

    Ok(JSend::success(task_to_response(&task)))
}

/// DELETE /lists/:list_id/tasks/:task_id — delete a task from an owned list
pub async fn delete_task(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path((list_id, task_id)): Path<(String, String)>,
) -> Result<Json<JSend<TaskResponse>>, ApiError> {
    let list = require_list(&state.db, &list_id, &principal.user_id)?;
    let task = require_task(&state, &task_id, &list.id)?;

    state
        .db
        .delete_task(&task.id)
        .map_err(|e| ApiError::internal(e.to_string()))?;

    tracing::debug!(task_id = %task.id, "Deleted task");
    Ok(JSend::success(task_to_response(&task)))
}

/// Resolve a task and check it belongs to the given list
fn require_task(state: &AppState, task_id: &str, list_id: &str) -> Result<Task, ApiError> {
    let task = state
        .db
        .get_task(task_id)
        .map_err(|e| ApiError::internal(e.to_string()))?
        .ok_or_else(|| ApiError::not_found("Task not found"))?;

    if task.list_id != list_id {
        return Err(ApiError::not_found("Task not found"));
    }
    Ok(task)
}

fn task_to_response(task: &Task) -> TaskResponse {
    TaskResponse {
        completed: task.completed,
        created_at: task.created_at.to_rfc3339(),
        id: task.id.clone(),
        list_id: task.list_id.clone(),
        title: task.title.clone(),
    }
}
