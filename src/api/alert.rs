//! Alert banner endpoints.

use axum::{extract::State, Json};

use super::{error, success, ApiResult};
use crate::models::{AlertConfig, UpdateAlertRequest};
use crate::AppState;

/// GET /api/alert - Current banner configuration.
pub async fn get_alert(State(state): State<AppState>) -> ApiResult<AlertConfig> {
    let revision_id = state.store.get_revision_id().await.unwrap_or(0);

    match state.store.get_alert().await {
        Ok(alert) => success(alert, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// PUT /api/admin/alert - Save the banner configuration.
pub async fn save_alert(
    State(state): State<AppState>,
    Json(request): Json<UpdateAlertRequest>,
) -> ApiResult<AlertConfig> {
    let revision_id = state.store.get_revision_id().await.unwrap_or(0);

    match state.store.save_alert(&request).await {
        Ok(alert) => {
            let new_revision = state.store.get_revision_id().await.unwrap_or(revision_id);
            success(alert, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}
