//! Admin PSK authentication and the download "verified" check.
//!
//! Implements constant-time comparison to mitigate timing attacks.

use axum::{
    extract::Request,
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use subtle::ConstantTimeEq;

use crate::errors::{AppError, AppErrorWithRevision};

/// Header name for the admin API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Header carrying the token the CAPTCHA front hands to verified visitors.
pub const DOWNLOAD_TOKEN_HEADER: &str = "x-download-token";

/// PSK authentication layer function that takes the expected PSK as a parameter.
pub async fn psk_auth_layer(
    expected_psk: Option<String>,
    request: Request,
    next: Next,
) -> Response {
    // If no PSK is configured, allow all requests (dev mode)
    let Some(expected) = expected_psk else {
        return next.run(request).await;
    };

    match provided_api_key(request.headers()) {
        Some(provided) if constant_time_compare(&provided, &expected) => next.run(request).await,
        Some(_) => unauthorized_response("Invalid API key"),
        None => unauthorized_response("Missing or invalid API key"),
    }
}

/// The admin key from `x-api-key`, or from `Authorization: Bearer`.
fn provided_api_key(headers: &HeaderMap) -> Option<String> {
    let header_value = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
    };

    header_value(API_KEY_HEADER).or_else(|| {
        header_value(header::AUTHORIZATION.as_str())
            .and_then(|s| s.strip_prefix("Bearer ").map(|s| s.to_string()))
    })
}

/// Decides whether a visitor may download form attachments.
pub trait DownloadAuthorizer: Send + Sync {
    fn is_verified(&self, headers: &HeaderMap) -> bool;
}

/// Verified when the request carries the admin key or the CAPTCHA download token.
pub struct HeaderDownloadAuthorizer {
    api_psk: Option<String>,
    download_token: Option<String>,
}

impl HeaderDownloadAuthorizer {
    pub fn new(api_psk: Option<String>, download_token: Option<String>) -> Self {
        Self {
            api_psk,
            download_token,
        }
    }
}

impl DownloadAuthorizer for HeaderDownloadAuthorizer {
    fn is_verified(&self, headers: &HeaderMap) -> bool {
        // Without an admin key there is nothing to protect (dev mode)
        let Some(psk) = &self.api_psk else {
            return true;
        };

        if provided_api_key(headers).is_some_and(|key| constant_time_compare(&key, psk)) {
            return true;
        }

        match &self.download_token {
            Some(expected) => headers
                .get(DOWNLOAD_TOKEN_HEADER)
                .and_then(|v| v.to_str().ok())
                .is_some_and(|token| constant_time_compare(token, expected)),
            None => false,
        }
    }
}

/// Perform constant-time string comparison.
fn constant_time_compare(a: &str, b: &str) -> bool {
    let a_bytes = a.as_bytes();
    let b_bytes = b.as_bytes();

    a_bytes.ct_eq(b_bytes).into()
}

/// Create an unauthorized response.
fn unauthorized_response(message: &str) -> Response {
    AppErrorWithRevision {
        error: AppError::Unauthorized(message.to_string()),
        revision_id: 0,
    }
    .into_response()
}
