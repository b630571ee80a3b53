//! Class signup and roster endpoints.

use axum::{
    extract::{Path, State},
    Json,
};

use super::{error, success, ApiResult};
use crate::models::{RosterEntry, SignupRequest};
use crate::AppState;

/// POST /api/classes/:id/signup - Public signup for a class.
pub async fn sign_up(
    State(state): State<AppState>,
    Path(class_id): Path<String>,
    Json(request): Json<SignupRequest>,
) -> ApiResult<RosterEntry> {
    let revision_id = state.store.get_revision_id().await.unwrap_or(0);

    match state.store.sign_up(&class_id, request).await {
        Ok(entry) => {
            let new_revision = state.store.get_revision_id().await.unwrap_or(revision_id);
            success(entry, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// DELETE /api/admin/classes/:id/roster/:index - Remove one signup.
pub async fn delete_roster_entry(
    State(state): State<AppState>,
    Path((class_id, index)): Path<(String, usize)>,
) -> ApiResult<()> {
    let revision_id = state.store.get_revision_id().await.unwrap_or(0);

    match state.store.delete_roster_entry(&class_id, index).await {
        Ok(()) => {
            let new_revision = state.store.get_revision_id().await.unwrap_or(revision_id);
            success((), new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}
