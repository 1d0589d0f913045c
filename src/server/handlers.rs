use std::collections::BTreeMap;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::Utc;
use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::{debug, info};
use uuid::Uuid;

use crate::mapping::{FieldValues, Record};
use crate::web::{BindCreate, BindUpdate, Result, WebError};

use super::models::{DEFAULT_ROLE, User};
use super::state::AppState;
use super::store::Row;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub data: T,
}

#[derive(Debug, Serialize)]
pub struct ApiMessage {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct PatchResult {
    pub row: Row,
    pub updated: Vec<String>,
}

pub async fn health() -> Json<ApiResponse<ApiMessage>> {
    Json(ApiResponse {
        data: ApiMessage {
            message: "ok".to_string(),
        },
    })
}

pub async fn create_user(
    State(state): State<AppState>,
    BindCreate(mut user): BindCreate<User>,
) -> Result<(StatusCode, Json<ApiResponse<Row>>)> {
    user.id = Uuid::new_v4().to_string();
    user.audit.created_at = Some(Utc::now());
    if user.role.is_empty() {
        user.role = DEFAULT_ROLE.to_string();
    }

    let values = user
        .field_values()
        .map_err(|err| WebError::Internal(err.to_string()))?;
    let row = to_row(&values, state.user_columns());
    state.users.insert(&user.id, row.clone()).await;

    info!(id = %user.id, "user created");
    Ok((StatusCode::CREATED, Json(ApiResponse { data: row })))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Row>>> {
    let row = state
        .users
        .get(&id)
        .await
        .ok_or_else(|| WebError::NotFound(format!("user '{}' not found", id)))?;
    Ok(Json(ApiResponse { data: row }))
}

pub async fn patch_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    BindUpdate(binding): BindUpdate<User>,
) -> Result<Json<ApiResponse<PatchResult>>> {
    if binding.is_empty() {
        return Err(WebError::Input(
            "at least one updatable field must be provided for PATCH".to_string(),
        ));
    }

    let changes = binding.changed_columns()?;
    let updated: Vec<String> = changes.keys().cloned().collect();
    debug!(id = %id, columns = ?updated, "applying partial update");

    let row = state
        .users
        .update_columns(&id, changes)
        .await
        .ok_or_else(|| WebError::NotFound(format!("user '{}' not found", id)))?;

    Ok(Json(ApiResponse {
        data: PatchResult { row, updated },
    }))
}

/// Unset fields are stored as null.
fn to_row(values: &FieldValues, columns: BTreeMap<String, String>) -> Row {
    columns
        .into_iter()
        .map(|(external, column)| {
            let value = values.get(&external).cloned().unwrap_or(JsonValue::Null);
            (column, value)
        })
        .collect()
}
