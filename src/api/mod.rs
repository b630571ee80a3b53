//! REST API module.
//!
//! Public routes serve the site; `/api/admin` routes back the dashboard.

mod alert;
mod classes;
mod collections;
mod forms;
mod site;

pub use alert::*;
pub use classes::*;
pub use collections::*;
pub use forms::*;
pub use site::*;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::errors::{AppError, AppErrorWithRevision};
use crate::models::Collection;

/// Success response envelope.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
    pub revision_id: i64,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(data: T, revision_id: i64) -> Self {
        Self {
            success: true,
            data,
            revision_id,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Response type that can be either success or error.
pub type ApiResult<T> = Result<ApiResponse<T>, AppErrorWithRevision>;

/// Create a successful API response.
pub fn success<T: Serialize>(data: T, revision_id: i64) -> ApiResult<T> {
    Ok(ApiResponse::new(data, revision_id))
}

/// Create an error API response.
pub fn error<T: Serialize>(err: AppError, revision_id: i64) -> ApiResult<T> {
    Err(AppErrorWithRevision {
        error: err,
        revision_id,
    })
}

/// Resolve a collection name from the route, keeping the revision for the error envelope.
fn collection_param(name: &str, revision_id: i64) -> Result<Collection, AppErrorWithRevision> {
    Collection::parse(name).map_err(|error| AppErrorWithRevision { error, revision_id })
}
