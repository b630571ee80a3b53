//! Form attachment upload and gated download.

use axum::{
    extract::{Multipart, Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::NaiveDate;

use super::{error, success, ApiResult};
use crate::errors::{AppError, AppErrorWithRevision};
use crate::files::attachment_extension;
use crate::models::{Collection, ContentItem, NewItem};
use crate::AppState;

const ALLOWED_EXTENSIONS: &[&str] = &[
    "pdf", "doc", "docx", "xls", "xlsx", "csv", "txt", "rtf", "png", "jpg", "jpeg",
];

/// Fields collected from the upload form.
#[derive(Default)]
struct FormUpload {
    title: String,
    content: String,
    editable_date: Option<NaiveDate>,
    file: Option<(String, Vec<u8>)>,
}

/// POST /api/admin/forms - Upload a form document with its title and description.
pub async fn upload_form(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<ContentItem> {
    let revision_id = state.store.get_revision_id().await.unwrap_or(0);

    let upload = match read_upload(multipart, state.config.max_upload_bytes).await {
        Ok(upload) => upload,
        Err(e) => return error(e, revision_id),
    };

    let Some((original_name, bytes)) = upload.file else {
        return error(
            AppError::Validation("An attached file is required for forms".to_string()),
            revision_id,
        );
    };

    let item = NewItem {
        title: upload.title,
        content: upload.content,
        editable_date: upload.editable_date,
        filename: None,
        active: None,
    };

    match state
        .store
        .add_item_with_attachment(Collection::Forms, item, &original_name, &bytes)
        .await
    {
        Ok(item) => {
            let new_revision = state.store.get_revision_id().await.unwrap_or(revision_id);
            success(item, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

async fn read_upload(mut multipart: Multipart, max_bytes: usize) -> Result<FormUpload, AppError> {
    let mut upload = FormUpload::default();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        tracing::warn!("Multipart error: {}", e);
        AppError::BadRequest("Invalid multipart data".to_string())
    })? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "title" => upload.title = field_text(field).await?,
            "content" => upload.content = field_text(field).await?,
            "editableDate" => {
                let raw = field_text(field).await?;
                if !raw.trim().is_empty() {
                    let date = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
                        AppError::Validation(format!("Invalid editableDate: {}", raw))
                    })?;
                    upload.editable_date = Some(date);
                }
            }
            "file" => {
                let original_name = field.file_name().unwrap_or("unknown").to_string();
                let allowed = attachment_extension(&original_name)
                    .is_some_and(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()));
                if !allowed {
                    return Err(AppError::Validation(format!(
                        "Unsupported file type. Allowed: {}",
                        ALLOWED_EXTENSIONS.join(", ")
                    )));
                }

                let bytes = field.bytes().await.map_err(|e| {
                    tracing::warn!("Failed to read upload bytes: {}", e);
                    AppError::BadRequest("Failed to read file data".to_string())
                })?;
                if bytes.len() > max_bytes {
                    return Err(AppError::Validation(format!(
                        "File too large. Maximum size is {} bytes",
                        max_bytes
                    )));
                }
                upload.file = Some((original_name, bytes.to_vec()));
            }
            other => tracing::debug!("Ignoring multipart field {}", other),
        }
    }

    Ok(upload)
}

async fn field_text(field: axum::extract::multipart::Field<'_>) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|_| AppError::BadRequest("Invalid multipart text field".to_string()))
}

/// GET /api/forms/:id/download - Stream an attachment to a verified visitor.
pub async fn download_form(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let revision_id = state.store.get_revision_id().await.unwrap_or(0);

    match fetch_attachment(&state, &id, &headers).await {
        Ok((filename, bytes)) => attachment_response(&filename, bytes),
        Err(e) => AppErrorWithRevision {
            error: e,
            revision_id,
        }
        .into_response(),
    }
}

async fn fetch_attachment(
    state: &AppState,
    id: &str,
    headers: &HeaderMap,
) -> Result<(String, Vec<u8>), AppError> {
    if !state.downloads.is_verified(headers) {
        tracing::info!("Download of form {} refused: visitor not verified", id);
        return Err(AppError::Forbidden(
            "Verification required to download forms".to_string(),
        ));
    }

    let item = state
        .store
        .get_item(Collection::Forms, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Form {} not found", id)))?;

    let filename = item
        .filename
        .filter(|f| !f.is_empty())
        .ok_or_else(|| AppError::NotFound(format!("Form {} has no attachment", id)))?;

    let bytes = state
        .store
        .files()
        .read(&filename)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Attachment {} is missing", filename)))?;

    Ok((filename, bytes))
}

fn attachment_response(filename: &str, bytes: Vec<u8>) -> Response {
    let content_type = attachment_extension(filename)
        .map(|ext| content_type_for(&ext))
        .unwrap_or("application/octet-stream");

    let mut response = (StatusCode::OK, bytes).into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    if let Ok(disposition) =
        HeaderValue::from_str(&format!("attachment; filename=\"{}\"", filename))
    {
        headers.insert(header::CONTENT_DISPOSITION, disposition);
    }
    response
}

fn content_type_for(ext: &str) -> &'static str {
    match ext {
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "csv" => "text/csv",
        "txt" => "text/plain",
        "rtf" => "application/rtf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        _ => "application/octet-stream",
    }
}
