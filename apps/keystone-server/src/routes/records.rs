//! Soft delete, restore and audit history for any top-level record.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use keystone_core::AuditLog;
use keystone_db::RecordTable;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/:entity/:id", delete(soft_delete))
        .route("/:entity/:id/restore", post(restore))
        .route("/:entity/:id/audit", get(audit_trail))
}

fn table(entity: &str) -> ApiResult<RecordTable> {
    RecordTable::from_key(entity)
        .ok_or_else(|| ApiError::not_found(format!("Unknown record type: {}", entity)))
}

async fn soft_delete(
    State(state): State<AppState>,
    user: AuthUser,
    Path((entity, id)): Path<(String, i64)>,
) -> ApiResult<StatusCode> {
    user.require_write()?;
    let table = table(&entity)?;
    state.db.records().soft_delete(table, id, Some(user.id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn restore(
    State(state): State<AppState>,
    user: AuthUser,
    Path((entity, id)): Path<(String, i64)>,
) -> ApiResult<StatusCode> {
    user.require_restore()?;
    let table = table(&entity)?;
    state.db.records().restore(table, id, Some(user.id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn audit_trail(
    State(state): State<AppState>,
    Path((entity, id)): Path<(String, i64)>,
) -> ApiResult<Json<Vec<AuditLog>>> {
    let table = table(&entity)?;
    Ok(Json(state.db.records().audit_trail(table, id).await?))
}
