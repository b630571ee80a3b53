//! Configuration module for the site content backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::errors::AppError;

/// Default cap on a single form attachment (10 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Pre-shared key for the admin dashboard API (required in production)
    pub api_psk: Option<String>,
    /// Token issued by the CAPTCHA front to visitors allowed to download forms
    pub download_token: Option<String>,
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Directory holding uploaded form attachments
    pub upload_dir: PathBuf,
    /// Legacy flat-file JSON store imported on first startup
    pub legacy_data_path: Option<PathBuf>,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Maximum accepted attachment size in bytes
    pub max_upload_bytes: usize,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let api_psk = env::var("SITE_API_PSK").ok().filter(|s| !s.is_empty());
        let download_token = env::var("SITE_DOWNLOAD_TOKEN")
            .ok()
            .filter(|s| !s.is_empty());

        let db_path = env::var("SITE_DB_PATH")
            .unwrap_or_else(|_| "./data/site.sqlite".to_string())
            .into();

        let upload_dir = env::var("SITE_UPLOAD_DIR")
            .unwrap_or_else(|_| "./data/uploads".to_string())
            .into();

        let legacy_data_path = env::var("SITE_LEGACY_DATA_PATH").ok().map(PathBuf::from);

        let bind_addr = env::var("SITE_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
            .parse()
            .map_err(|e| AppError::Internal(format!("Invalid SITE_BIND_ADDR: {}", e)))?;

        let log_level = env::var("SITE_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let max_upload_bytes = match env::var("SITE_MAX_UPLOAD_BYTES") {
            Ok(raw) => raw.parse().map_err(|e| {
                AppError::Internal(format!("Invalid SITE_MAX_UPLOAD_BYTES: {}", e))
            })?,
            Err(_) => DEFAULT_MAX_UPLOAD_BYTES,
        };

        Ok(Self {
            api_psk,
            download_token,
            db_path,
            upload_dir,
            legacy_data_path,
            bind_addr,
            log_level,
            max_upload_bytes,
        })
    }
}
