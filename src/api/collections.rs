//! Collection API endpoints.

use axum::{
    extract::{Path, State},
    Json,
};

use super::{collection_param, error, success, ApiResult};
use crate::errors::AppError;
use crate::models::{ContentItem, CreateItemRequest, ReorderRequest, UpdateItemRequest};
use crate::AppState;

/// GET /api/collections/:name - List a collection for the public site.
pub async fn list_public_collection(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Vec<ContentItem>> {
    let revision_id = state.store.get_revision_id().await.unwrap_or(0);
    let collection = collection_param(&name, revision_id)?;

    match state.store.list_collection(collection).await {
        Ok(items) => success(
            items.into_iter().map(ContentItem::without_roster).collect(),
            revision_id,
        ),
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/admin/collections/:name - List a collection, rosters included.
pub async fn list_collection(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Vec<ContentItem>> {
    let revision_id = state.store.get_revision_id().await.unwrap_or(0);
    let collection = collection_param(&name, revision_id)?;

    match state.store.list_collection(collection).await {
        Ok(items) => success(items, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/admin/collections/:name/:id - Get a single item.
pub async fn get_item(
    State(state): State<AppState>,
    Path((name, id)): Path<(String, String)>,
) -> ApiResult<ContentItem> {
    let revision_id = state.store.get_revision_id().await.unwrap_or(0);
    let collection = collection_param(&name, revision_id)?;

    match state.store.get_item(collection, &id).await {
        Ok(Some(item)) => success(item, revision_id),
        Ok(None) => error(
            AppError::NotFound(format!("Item {} not found in {}", id, collection)),
            revision_id,
        ),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/admin/collections/:name - Add an item at the end of the collection.
pub async fn create_item(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(request): Json<CreateItemRequest>,
) -> ApiResult<ContentItem> {
    let revision_id = state.store.get_revision_id().await.unwrap_or(0);
    let collection = collection_param(&name, revision_id)?;

    match state.store.add_item(collection, request.into()).await {
        Ok(item) => {
            let new_revision = state.store.get_revision_id().await.unwrap_or(revision_id);
            success(item, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// PUT /api/admin/collections/:name/:id - Update an item.
pub async fn update_item(
    State(state): State<AppState>,
    Path((name, id)): Path<(String, String)>,
    Json(request): Json<UpdateItemRequest>,
) -> ApiResult<ContentItem> {
    let revision_id = state.store.get_revision_id().await.unwrap_or(0);
    let collection = collection_param(&name, revision_id)?;

    match state.store.update_item(collection, &id, &request).await {
        Ok(item) => {
            let new_revision = state.store.get_revision_id().await.unwrap_or(revision_id);
            success(item, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// DELETE /api/admin/collections/:name/:id - Delete an item and its attachment.
pub async fn delete_item(
    State(state): State<AppState>,
    Path((name, id)): Path<(String, String)>,
) -> ApiResult<()> {
    let revision_id = state.store.get_revision_id().await.unwrap_or(0);
    let collection = collection_param(&name, revision_id)?;

    match state.store.delete_item(collection, &id).await {
        Ok(()) => {
            let new_revision = state.store.get_revision_id().await.unwrap_or(revision_id);
            success((), new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// PUT /api/admin/collections/:name/order - Persist a drag-and-drop reorder.
pub async fn reorder_collection(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(request): Json<ReorderRequest>,
) -> ApiResult<Vec<ContentItem>> {
    let revision_id = state.store.get_revision_id().await.unwrap_or(0);
    let collection = collection_param(&name, revision_id)?;

    match state.store.reorder(collection, &request.ids).await {
        Ok(items) => {
            let new_revision = state.store.get_revision_id().await.unwrap_or(revision_id);
            success(items, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}
