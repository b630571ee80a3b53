//! First-start initialization: legacy import or default seeding.

use std::path::Path;

use chrono::Utc;

use super::{legacy_items, migrate_legacy_document, ContentStore};
use crate::errors::AppError;
use crate::models::{Collection, NewItem};

/// What happened when the store was initialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// The store was set up by an earlier run.
    AlreadyInitialized,
    /// Items were imported from the legacy JSON file.
    Imported { migrated: usize, imported: usize },
    /// Placeholder content was created.
    Seeded,
}

/// Make sure every collection exists, importing or seeding on the first run.
///
/// A legacy file that cannot be read or parsed aborts startup.
pub async fn bootstrap_store(
    store: &ContentStore,
    legacy_path: Option<&Path>,
) -> Result<BootstrapOutcome, AppError> {
    if store.is_initialized().await? {
        return Ok(BootstrapOutcome::AlreadyInitialized);
    }

    if let Some(path) = legacy_path.filter(|p| p.exists()) {
        tracing::info!("Importing legacy data from {:?}", path);

        let raw = tokio::fs::read_to_string(path).await?;
        let mut doc: serde_json::Value = serde_json::from_str(&raw).map_err(|e| {
            AppError::Internal(format!("Malformed legacy data in {:?}: {}", path, e))
        })?;

        let now = Utc::now();
        let migrated = migrate_legacy_document(&mut doc, now)?;
        let items = legacy_items(&doc, now)?;
        let imported = store.import_items(&items).await?;

        tracing::info!(
            "Imported {} legacy items ({} migrated from the old format)",
            imported,
            migrated
        );
        return Ok(BootstrapOutcome::Imported { migrated, imported });
    }

    store.seed_defaults(&default_items()).await?;
    tracing::info!("Seeded default site content");
    Ok(BootstrapOutcome::Seeded)
}

/// One placeholder item each for news, faq and classes. Forms start empty.
fn default_items() -> Vec<(Collection, NewItem)> {
    let today = Utc::now().date_naive();
    let placeholder = |title: &str, content: &str| NewItem {
        title: title.to_string(),
        content: content.to_string(),
        editable_date: Some(today),
        ..Default::default()
    };

    vec![
        (
            Collection::News,
            placeholder("Default News Title", "Default news content"),
        ),
        (
            Collection::Faq,
            placeholder("Default FAQ Title", "Default FAQ content"),
        ),
        (
            Collection::Classes,
            placeholder("Default Class Title", "Default class content"),
        ),
    ]
}
