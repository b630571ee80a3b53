//! Whole-site snapshot endpoints.

use axum::extract::State;

use super::{success, ApiResult};
use crate::errors::AppErrorWithRevision;
use crate::models::{RevisionInfo, SiteSnapshot};
use crate::AppState;

/// GET /api/site - Everything the public pages render.
pub async fn get_public_site(State(state): State<AppState>) -> ApiResult<SiteSnapshot> {
    snapshot(&state, false).await
}

/// GET /api/admin/site - Dashboard view, rosters included.
pub async fn get_admin_site(State(state): State<AppState>) -> ApiResult<SiteSnapshot> {
    snapshot(&state, true).await
}

/// GET /api/admin/revision - Get the current revision info.
pub async fn get_revision(State(state): State<AppState>) -> ApiResult<RevisionInfo> {
    let revision_info = state
        .store
        .get_revision_info()
        .await
        .map_err(|e| AppErrorWithRevision {
            error: e,
            revision_id: 0,
        })?;

    success(revision_info.clone(), revision_info.revision_id)
}

async fn snapshot(state: &AppState, include_rosters: bool) -> ApiResult<SiteSnapshot> {
    let snapshot = state
        .store
        .snapshot(include_rosters)
        .await
        .map_err(|e| AppErrorWithRevision {
            error: e,
            revision_id: 0,
        })?;

    let revision_id = snapshot.revision_id;
    success(snapshot, revision_id)
}
