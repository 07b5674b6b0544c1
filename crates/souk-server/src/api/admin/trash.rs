//! Soft delete, trash listing, restore, and hard delete.

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use souk_db::TrashEntity;

use crate::middleware::RequestId;

use super::super::{map_db_error, ApiError, ApiResponse, AppState};

#[derive(Debug, Serialize)]
pub(in crate::api) struct TrashItem {
    id: i64,
    public_id: Uuid,
    label: Option<String>,
    deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub(in crate::api) struct TrashActionResponse {
    entity: &'static str,
    id: i64,
    action: &'static str,
}

fn parse_entity(req_id: &str, raw: &str) -> Result<TrashEntity, ApiError> {
    raw.parse::<TrashEntity>()
        .map_err(|e| ApiError::not_found(req_id, e.to_string()))
}

fn action_response(
    entity: TrashEntity,
    id: i64,
    action: &'static str,
    req_id: RequestId,
) -> Json<ApiResponse<TrashActionResponse>> {
    Json(ApiResponse::new(
        TrashActionResponse {
            entity: entity.as_str(),
            id,
            action,
        },
        req_id.0,
    ))
}

async fn soft_delete_entity(
    state: &AppState,
    req_id: RequestId,
    entity: TrashEntity,
    id: i64,
) -> Result<Json<ApiResponse<TrashActionResponse>>, ApiError> {
    souk_db::soft_delete(&state.pool, entity, id)
        .await
        .map_err(|e| map_db_error(&req_id.0, &e))?;
    tracing::info!(%entity, id, "moved to trash");
    Ok(action_response(entity, id, "trashed", req_id))
}

/// GET /api/v1/admin/trash/{entity}
pub(in crate::api) async fn list_trash(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(entity): Path<String>,
) -> Result<Json<ApiResponse<Vec<TrashItem>>>, ApiError> {
    let rid = &req_id.0;
    let entity = parse_entity(rid, &entity)?;

    let rows = souk_db::list_trash(&state.pool, entity)
        .await
        .map_err(|e| map_db_error(rid, &e))?;

    let data = rows
        .into_iter()
        .map(|row| TrashItem {
            id: row.id,
            public_id: row.public_id,
            label: row.label,
            deleted_at: row.deleted_at,
        })
        .collect();

    Ok(Json(ApiResponse::new(data, req_id.0.clone())))
}

/// DELETE /api/v1/admin/{entity}/{id}
pub(in crate::api) async fn soft_delete(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path((entity, id)): Path<(String, i64)>,
) -> Result<Json<ApiResponse<TrashActionResponse>>, ApiError> {
    let entity = parse_entity(&req_id.0, &entity)?;
    soft_delete_entity(&state, req_id, entity, id).await
}

/// DELETE /api/v1/admin/products/{id}
pub(in crate::api) async fn delete_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<TrashActionResponse>>, ApiError> {
    soft_delete_entity(&state, req_id, TrashEntity::Products, id).await
}

/// DELETE /api/v1/admin/offers/{id}
pub(in crate::api) async fn delete_offer(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<TrashActionResponse>>, ApiError> {
    soft_delete_entity(&state, req_id, TrashEntity::Offers, id).await
}

/// POST /api/v1/admin/trash/{entity}/{id}/restore
pub(in crate::api) async fn restore(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path((entity, id)): Path<(String, i64)>,
) -> Result<Json<ApiResponse<TrashActionResponse>>, ApiError> {
    let entity = parse_entity(&req_id.0, &entity)?;
    souk_db::restore(&state.pool, entity, id)
        .await
        .map_err(|e| map_db_error(&req_id.0, &e))?;
    tracing::info!(%entity, id, "restored from trash");
    Ok(action_response(entity, id, "restored", req_id))
}

/// DELETE /api/v1/admin/trash/{entity}/{id}: permanent; only rows already
/// in the trash.
pub(in crate::api) async fn hard_delete(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path((entity, id)): Path<(String, i64)>,
) -> Result<Json<ApiResponse<TrashActionResponse>>, ApiError> {
    let entity = parse_entity(&req_id.0, &entity)?;
    souk_db::hard_delete(&state.pool, entity, id)
        .await
        .map_err(|e| map_db_error(&req_id.0, &e))?;
    tracing::warn!(%entity, id, "permanently deleted");
    Ok(action_response(entity, id, "deleted", req_id))
}
