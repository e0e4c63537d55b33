use axum::extract::{Path, State};
use axum::{Extension, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::require_list;
use crate::api::middleware::Principal;
use crate::api::response::{ApiError, JSend};
use crate::storage::models::List;
use crate::AppState;

#[derive(Debug, Deserialize, Serialize)]
pub struct CreateListRequest {
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateListRequest {
    pub title: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListResponse {
    pub created_at: String,
    pub id: String,
    pub title: String,
}

/// GET /lists — all lists owned by the authenticated user
pub async fn get_lists(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<JSend<Vec<ListResponse>>>, ApiError> {
    let lists = state
        .db
        .get_lists_by_user(&principal.user_id)
        .map_err(|e| ApiError::internal(e.to_string()))?;

    Ok(JSend::success(lists.iter().map(list_to_response).collect()))
}

/// POST /lists — create a list owned by the authenticated user
pub async fn create_list(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Json(req): Json<CreateListRequest>,
) -> Result<Json<JSend<ListResponse>>, ApiError> {
    if req.title.trim().is_empty() {
        return Err(ApiError::bad_request("title is required"));
    }

    let list = List {
        created_at: Utc::now(),
        id: uuid::Uuid::new_v4().to_string(),
        title: req.title,
        user_id: principal.user_id,
    };
    state
        .db
        .put_list(&list)
        .map_err(|e| ApiError::internal(e.to_string()))?;

    tracing::debug!(list_id = %list.id, "Created list");
    Ok(JSend::success(list_to_response(&list)))
}

/// PATCH /lists/:id — rename a list the authenticated user owns
pub async fn update_list(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(list_id): Path<String>,
    Json(req): Json<UpdateListRequest>,
) -> Result<Json<JSend<ListResponse>>, ApiError> {
    if req.title.trim().is_empty() {
        return Err(ApiError::bad_request("title is required"));
    }

    let mut list = require_list(&state.db, &list_id, &principal.user_id)?;
    list.title = req.title;
    state
        .db
        .put_list(&list)
        .map_err(|e| ApiError::internal(e.to_string()))?;

    Ok(JSend::success(list_to_response(&list)))
}

/// DELETE /lists/:id — delete a list and every task in it
pub async fn delete_list(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(list_id): Path<String>,
) -> Result<Json<JSend<ListResponse>>, ApiError> {
    let list = require_list(&state.db, &list_id, &principal.user_id)?;

    // The list and its tasks go in one transaction, so a crash cannot
    // strand tasks under a list that no longer exists
    let removed = state
        .db
        .delete_list_with_tasks(&list.id)
        .map_err(|e| ApiError::internal(e.to_string()))?;
    let removed_tasks = removed.map(|(_, n)| n).unwrap_or(0);

    tracing::debug!(list_id = %list.id, tasks = removed_tasks, "Deleted list");
    Ok(JSend::success(list_to_response(&list)))
}

fn list_to_response(list: &List) -> ListResponse {
    ListResponse {
        created_at: list.created_at.to_rfc3339(),
        id: list.id.clone(),
        title: list.title.clone(),
    }
}
