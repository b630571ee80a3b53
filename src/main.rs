//! Site Content Backend
//!
//! REST backend for the firm's public website and its admin dashboard:
//! news, FAQ, downloadable forms, class signups and the alert banner,
//! persisted in SQLite.

mod api;
mod auth;
mod config;
mod db;
mod errors;
mod files;
mod models;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use auth::{DownloadAuthorizer, HeaderDownloadAuthorizer};
use config::Config;
use db::ContentStore;
use files::{DiskFileStore, FileStore};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ContentStore>,
    pub downloads: Arc<dyn DownloadAuthorizer>,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Site Content Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Upload directory: {:?}", config.upload_dir);
    tracing::info!("Bind address: {}", config.bind_addr);

    // Warn if PSK is not configured
    if config.api_psk.is_none() {
        tracing::warn!("No API PSK configured (SITE_API_PSK). Authentication is disabled!");
    } else if config.download_token.is_none() {
        tracing::warn!("No SITE_DOWNLOAD_TOKEN configured. Only admins can download forms");
    }

    // Initialize database and attachment storage
    let pool = db::init_database(&config.db_path).await?;
    let files: Arc<dyn FileStore> = Arc::new(DiskFileStore::new(&config.upload_dir));
    tracing::info!("Attachment backend: {}", files.backend_tag());
    let store = Arc::new(ContentStore::new(pool, files));

    // First run: import legacy data or seed placeholders
    let outcome = db::bootstrap_store(&store, config.legacy_data_path.as_deref()).await?;
    tracing::info!("Store ready: {:?}", outcome);

    // Create application state
    let state = AppState {
        store,
        downloads: Arc::new(HeaderDownloadAuthorizer::new(
            config.api_psk.clone(),
            config.download_token.clone(),
        )),
        config: Arc::new(config.clone()),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Clone PSK for the auth layer
    let psk = state.config.api_psk.clone();

    // Multipart framing on top of the file itself
    let upload_limit = state.config.max_upload_bytes + 64 * 1024;

    // Dashboard routes
    let admin_routes = Router::new()
        .route("/site", get(api::get_admin_site))
        .route("/revision", get(api::get_revision))
        // Collections
        .route(
            "/collections/{name}",
            get(api::list_collection).post(api::create_item),
        )
        .route("/collections/{name}/order", put(api::reorder_collection))
        .route(
            "/collections/{name}/{id}",
            get(api::get_item)
                .put(api::update_item)
                .delete(api::delete_item),
        )
        // Forms
        .route(
            "/forms",
            post(api::upload_form).layer(DefaultBodyLimit::max(upload_limit)),
        )
        // Alert
        .route("/alert", put(api::save_alert))
        // Rosters
        .route(
            "/classes/{id}/roster/{index}",
            delete(api::delete_roster_entry),
        )
        // Apply PSK auth middleware
        .layer(middleware::from_fn(move |req, next| {
            auth::psk_auth_layer(psk.clone(), req, next)
        }));

    // Public site routes
    let public_routes = Router::new()
        .route("/site", get(api::get_public_site))
        .route("/collections/{name}", get(api::list_public_collection))
        .route("/alert", get(api::get_alert))
        .route("/classes/{id}/signup", post(api::sign_up))
        .route("/forms/{id}/download", get(api::download_form))
        .nest("/admin", admin_routes);

    // Health check (no auth required)
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", public_routes)
        .merge(health_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod test_support;
