//! Content store: CRUD, ordering and rosters over the SQLite tables.
//!
//! Multi-row writes run in a transaction; every successful write bumps the
//! revision counter in `meta`.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqliteConnection, SqlitePool, Transaction};

use crate::errors::AppError;
use crate::files::FileStore;
use crate::models::{
    AlertColor, AlertConfig, AlertOrientation, Collection, ContentItem, NewItem, RevisionInfo,
    RosterEntry, SignupRequest, SiteSnapshot, UpdateAlertRequest, UpdateItemRequest,
};

const ITEM_COLUMNS: &str = "id, collection, position, title, content, editable_date, \
                            last_updated, filename, active, roster";

/// An item coming from the legacy flat-file store, timestamps preserved.
#[derive(Debug, Clone)]
pub struct ImportedItem {
    pub collection: Collection,
    pub title: String,
    pub content: String,
    pub editable_date: Option<NaiveDate>,
    pub last_updated: DateTime<Utc>,
    pub filename: Option<String>,
}

/// The site's content store.
pub struct ContentStore {
    pool: SqlitePool,
    files: Arc<dyn FileStore>,
}

impl ContentStore {
    pub fn new(pool: SqlitePool, files: Arc<dyn FileStore>) -> Self {
        Self { pool, files }
    }

    /// The attachment backend this store cascades deletes to.
    pub fn files(&self) -> &Arc<dyn FileStore> {
        &self.files
    }

    /// Start a write transaction holding the write lock from the first statement.
    ///
    /// A deferred transaction that reads before writing cannot upgrade its lock
    /// while another writer is active, and SQLite fails it without waiting.
    async fn begin_write(&self) -> Result<Transaction<'static, Sqlite>, AppError> {
        Ok(self.pool.begin_with("BEGIN IMMEDIATE").await?)
    }

    // ==================== REVISION ====================

    /// Get the current revision ID.
    pub async fn get_revision_id(&self) -> Result<i64, AppError> {
        let row = sqlx::query("SELECT revision_id FROM meta WHERE id = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("revision_id")?)
    }

    /// Get revision info.
    pub async fn get_revision_info(&self) -> Result<RevisionInfo, AppError> {
        let row = sqlx::query("SELECT revision_id, generated_at FROM meta WHERE id = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(RevisionInfo {
            revision_id: row.try_get("revision_id")?,
            generated_at: row.try_get("generated_at")?,
        })
    }

    /// Every collection plus the alert. Rosters are dropped unless requested.
    pub async fn snapshot(&self, include_rosters: bool) -> Result<SiteSnapshot, AppError> {
        let meta =
            sqlx::query("SELECT schema_version, revision_id, generated_at FROM meta WHERE id = 1")
                .fetch_one(&self.pool)
                .await?;

        let mut classes = self.list_collection(Collection::Classes).await?;
        if !include_rosters {
            classes = classes.into_iter().map(ContentItem::without_roster).collect();
        }

        Ok(SiteSnapshot {
            schema_version: meta.try_get("schema_version")?,
            revision_id: meta.try_get("revision_id")?,
            generated_at: meta.try_get("generated_at")?,
            news: self.list_collection(Collection::News).await?,
            faq: self.list_collection(Collection::Faq).await?,
            forms: self.list_collection(Collection::Forms).await?,
            classes,
            alert: self.get_alert().await?,
        })
    }

    // ==================== ITEM OPERATIONS ====================

    /// List a collection in display order.
    pub async fn list_collection(
        &self,
        collection: Collection,
    ) -> Result<Vec<ContentItem>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM items WHERE collection = ? ORDER BY position, rowid",
            ITEM_COLUMNS
        ))
        .bind(collection.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(item_from_row).collect()
    }

    /// Get an item by ID within a collection.
    pub async fn get_item(
        &self,
        collection: Collection,
        id: &str,
    ) -> Result<Option<ContentItem>, AppError> {
        let mut conn = self.pool.acquire().await?;
        fetch_item(&mut conn, collection, id).await
    }

    /// Validate and append a new item to the end of its collection.
    pub async fn add_item(
        &self,
        collection: Collection,
        item: NewItem,
    ) -> Result<ContentItem, AppError> {
        let item = item.validated(collection)?;
        self.insert_item(collection, item).await
    }

    /// Store the attachment, then create the item pointing at it.
    ///
    /// No item is created when the file cannot be written, and the file is
    /// removed again when the item cannot be inserted.
    pub async fn add_item_with_attachment(
        &self,
        collection: Collection,
        item: NewItem,
        original_name: &str,
        bytes: &[u8],
    ) -> Result<ContentItem, AppError> {
        if !collection.requires_attachment() {
            return Err(AppError::Validation(format!(
                "Items in {} do not take attachments",
                collection
            )));
        }
        let mut item = item.validated_text(collection)?;
        if bytes.is_empty() {
            return Err(AppError::Validation("Attached file is empty".to_string()));
        }

        let filename = self.files.save(original_name, bytes).await?;
        item.filename = Some(filename.clone());

        match self.insert_item(collection, item).await {
            Ok(created) => Ok(created),
            Err(e) => {
                if let Err(remove_err) = self.files.remove(&filename).await {
                    tracing::warn!(
                        "Failed to clean up attachment {} after insert error: {}",
                        filename,
                        remove_err
                    );
                }
                Err(e)
            }
        }
    }

    async fn insert_item(
        &self,
        collection: Collection,
        item: NewItem,
    ) -> Result<ContentItem, AppError> {
        let mut tx = self.begin_write().await?;

        let position = next_position(&mut tx, collection).await?;
        let created = ContentItem {
            id: uuid::Uuid::new_v4().to_string(),
            collection,
            position,
            title: item.title,
            content: item.content,
            editable_date: item.editable_date,
            last_updated: Utc::now(),
            filename: item.filename,
            active: collection
                .has_roster()
                .then(|| item.active.unwrap_or(true)),
            roster: collection.has_roster().then(Vec::new),
        };

        insert_row(&mut tx, &created).await?;
        bump_revision(&mut tx).await?;
        tx.commit().await?;

        tracing::info!("Created {} item {}", collection, created.id);
        Ok(created)
    }

    /// Merge the supplied fields into an item and refresh its timestamp.
    pub async fn update_item(
        &self,
        collection: Collection,
        id: &str,
        request: &UpdateItemRequest,
    ) -> Result<ContentItem, AppError> {
        let title = request.title.as_deref().map(str::trim);
        let content = request.content.as_deref().map(str::trim);
        if title.is_some_and(str::is_empty) {
            return Err(AppError::Validation("Title cannot be blank".to_string()));
        }
        if content.is_some_and(str::is_empty) {
            return Err(AppError::Validation("Content cannot be blank".to_string()));
        }
        if request.active.is_some() && !collection.has_roster() {
            return Err(AppError::Validation(format!(
                "Items in {} have no active flag",
                collection
            )));
        }

        let mut tx = self.begin_write().await?;

        let existing = fetch_item(&mut tx, collection, id)
            .await?
            .ok_or_else(|| not_found(collection, id))?;

        let updated = ContentItem {
            title: title.map(str::to_string).unwrap_or(existing.title),
            content: content.map(str::to_string).unwrap_or(existing.content),
            editable_date: request.editable_date.unwrap_or(existing.editable_date),
            active: request.active.or(existing.active),
            last_updated: next_timestamp(existing.last_updated),
            ..existing
        };

        sqlx::query(
            "UPDATE items SET title = ?, content = ?, editable_date = ?, last_updated = ?, active = ? WHERE id = ?",
        )
        .bind(&updated.title)
        .bind(&updated.content)
        .bind(updated.editable_date)
        .bind(updated.last_updated)
        .bind(updated.active.map(|b| b as i32))
        .bind(id)
        .execute(&mut *tx)
        .await?;

        bump_revision(&mut tx).await?;
        tx.commit().await?;

        tracing::info!("Updated {} item {}", collection, id);
        Ok(updated)
    }

    /// Delete an item; a forms attachment is removed best-effort afterwards.
    pub async fn delete_item(&self, collection: Collection, id: &str) -> Result<(), AppError> {
        let mut tx = self.begin_write().await?;

        let existing = fetch_item(&mut tx, collection, id)
            .await?
            .ok_or_else(|| not_found(collection, id))?;

        sqlx::query("DELETE FROM items WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        bump_revision(&mut tx).await?;
        tx.commit().await?;

        tracing::info!("Deleted {} item {}", collection, id);

        if let Some(filename) = existing.filename.filter(|f| !f.is_empty()) {
            if let Err(e) = self.files.remove(&filename).await {
                tracing::warn!("Failed to remove attachment {}: {}", filename, e);
            }
        }
        Ok(())
    }

    /// Persist a new display order. `ids` must be exactly the current id set.
    pub async fn reorder(
        &self,
        collection: Collection,
        ids: &[String],
    ) -> Result<Vec<ContentItem>, AppError> {
        let mut tx = self.begin_write().await?;

        let rows = sqlx::query("SELECT id FROM items WHERE collection = ?")
            .bind(collection.as_str())
            .fetch_all(&mut *tx)
            .await?;
        let current: HashSet<String> = rows
            .iter()
            .map(|row| row.try_get("id"))
            .collect::<Result<_, _>>()?;

        check_permutation(&current, ids)?;

        for (position, id) in ids.iter().enumerate() {
            sqlx::query("UPDATE items SET position = ? WHERE id = ?")
                .bind(position as i64)
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }

        bump_revision(&mut tx).await?;
        tx.commit().await?;

        tracing::info!("Reordered {} ({} items)", collection, ids.len());
        self.list_collection(collection).await
    }

    // ==================== ROSTER OPERATIONS ====================

    /// Append a signup to a class roster.
    pub async fn sign_up(
        &self,
        class_id: &str,
        request: SignupRequest,
    ) -> Result<RosterEntry, AppError> {
        let mut tx = self.begin_write().await?;

        let class = fetch_item(&mut tx, Collection::Classes, class_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Class {} not found", class_id)))?;

        if class.active == Some(false) {
            return Err(AppError::Validation(format!(
                "Class {} is not open for signup",
                class_id
            )));
        }

        let entry = request.into_entry(Utc::now())?;
        let mut roster = class.roster.unwrap_or_default();
        roster.push(entry.clone());

        write_roster(&mut tx, class_id, &roster).await?;
        bump_revision(&mut tx).await?;
        tx.commit().await?;

        tracing::info!("Signup for class {} ({} on roster)", class_id, roster.len());
        Ok(entry)
    }

    /// Remove the roster entry at `index`.
    pub async fn delete_roster_entry(&self, class_id: &str, index: usize) -> Result<(), AppError> {
        let mut tx = self.begin_write().await?;

        let class = fetch_item(&mut tx, Collection::Classes, class_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Class {} not found", class_id)))?;

        let mut roster = class.roster.unwrap_or_default();
        if index >= roster.len() {
            return Err(AppError::NotFound(format!(
                "Roster entry {} not found for class {}",
                index, class_id
            )));
        }
        roster.remove(index);

        write_roster(&mut tx, class_id, &roster).await?;
        bump_revision(&mut tx).await?;
        tx.commit().await?;

        tracing::info!("Removed roster entry {} from class {}", index, class_id);
        Ok(())
    }

    // ==================== ALERT OPERATIONS ====================

    /// The alert banner, or the defaults when it was never saved.
    pub async fn get_alert(&self) -> Result<AlertConfig, AppError> {
        let mut conn = self.pool.acquire().await?;
        Ok(fetch_alert(&mut conn).await?.unwrap_or_default())
    }

    /// Merge and persist the alert banner, creating it on first save.
    pub async fn save_alert(&self, request: &UpdateAlertRequest) -> Result<AlertConfig, AppError> {
        let mut tx = self.begin_write().await?;

        let current = fetch_alert(&mut tx).await?.unwrap_or_default();
        let alert = current.merged(request)?;

        write_alert(&mut tx, &alert).await?;
        bump_revision(&mut tx).await?;
        tx.commit().await?;

        tracing::info!("Alert saved (active: {})", alert.active);
        Ok(alert)
    }

    // ==================== INITIALIZATION ====================

    /// Whether seeding or a legacy import has already happened.
    pub async fn is_initialized(&self) -> Result<bool, AppError> {
        let row = sqlx::query("SELECT initialized FROM meta WHERE id = 1")
            .fetch_one(&self.pool)
            .await?;
        let initialized: i64 = row.try_get("initialized")?;
        Ok(initialized != 0)
    }

    /// Insert legacy items in file order and mark the store initialized.
    pub async fn import_items(&self, items: &[ImportedItem]) -> Result<usize, AppError> {
        let mut tx = self.begin_write().await?;

        for imported in items {
            let collection = imported.collection;
            let position = next_position(&mut tx, collection).await?;
            let item = ContentItem {
                id: uuid::Uuid::new_v4().to_string(),
                collection,
                position,
                title: imported.title.clone(),
                content: imported.content.clone(),
                editable_date: imported.editable_date,
                last_updated: imported.last_updated,
                filename: imported.filename.clone().filter(|f| !f.is_empty()),
                active: collection.has_roster().then_some(true),
                roster: collection.has_roster().then(Vec::new),
            };
            insert_row(&mut tx, &item).await?;
        }

        mark_initialized(&mut tx).await?;
        bump_revision(&mut tx).await?;
        tx.commit().await?;

        Ok(items.len())
    }

    /// Seed placeholder items and the default alert, then mark initialized.
    pub async fn seed_defaults(&self, items: &[(Collection, NewItem)]) -> Result<(), AppError> {
        let mut tx = self.begin_write().await?;

        for (collection, fields) in items {
            let collection = *collection;
            let position = next_position(&mut tx, collection).await?;
            let item = ContentItem {
                id: uuid::Uuid::new_v4().to_string(),
                collection,
                position,
                title: fields.title.clone(),
                content: fields.content.clone(),
                editable_date: fields.editable_date,
                last_updated: Utc::now(),
                filename: fields.filename.clone(),
                active: collection
                    .has_roster()
                    .then(|| fields.active.unwrap_or(true)),
                roster: collection.has_roster().then(Vec::new),
            };
            insert_row(&mut tx, &item).await?;
        }

        if fetch_alert(&mut tx).await?.is_none() {
            write_alert(&mut tx, &AlertConfig::default()).await?;
        }

        mark_initialized(&mut tx).await?;
        bump_revision(&mut tx).await?;
        tx.commit().await?;

        Ok(())
    }
}

/// A timestamp strictly after `previous`, even if the clock has not moved.
pub fn next_timestamp(previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = Utc::now();
    if now > previous {
        now
    } else {
        previous + TimeDelta::microseconds(1)
    }
}

/// `ids` must contain every current id exactly once and nothing else.
fn check_permutation(current: &HashSet<String>, ids: &[String]) -> Result<(), AppError> {
    let mut seen = HashSet::with_capacity(ids.len());
    for id in ids {
        if !current.contains(id) {
            return Err(AppError::Validation(format!(
                "Unknown id in reorder: {}",
                id
            )));
        }
        if !seen.insert(id.as_str()) {
            return Err(AppError::Validation(format!(
                "Duplicate id in reorder: {}",
                id
            )));
        }
    }
    if seen.len() != current.len() {
        return Err(AppError::Validation(format!(
            "Reorder must list all {} items, got {}",
            current.len(),
            seen.len()
        )));
    }
    Ok(())
}

fn not_found(collection: Collection, id: &str) -> AppError {
    AppError::NotFound(format!("Item {} not found in {}", id, collection))
}

// Helper functions shared by the pool and transaction paths

async fn fetch_item(
    conn: &mut SqliteConnection,
    collection: Collection,
    id: &str,
) -> Result<Option<ContentItem>, AppError> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM items WHERE collection = ? AND id = ?",
        ITEM_COLUMNS
    ))
    .bind(collection.as_str())
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    row.as_ref().map(item_from_row).transpose()
}

async fn next_position(
    conn: &mut SqliteConnection,
    collection: Collection,
) -> Result<i64, AppError> {
    let row =
        sqlx::query("SELECT COALESCE(MAX(position), -1) + 1 AS next FROM items WHERE collection = ?")
            .bind(collection.as_str())
            .fetch_one(&mut *conn)
            .await?;
    Ok(row.try_get("next")?)
}

async fn insert_row(conn: &mut SqliteConnection, item: &ContentItem) -> Result<(), AppError> {
    let roster_json = item
        .roster
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;

    sqlx::query(&format!(
        "INSERT INTO items ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        ITEM_COLUMNS
    ))
    .bind(&item.id)
    .bind(item.collection.as_str())
    .bind(item.position)
    .bind(&item.title)
    .bind(&item.content)
    .bind(item.editable_date)
    .bind(item.last_updated)
    .bind(&item.filename)
    .bind(item.active.map(|b| b as i32))
    .bind(&roster_json)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn write_roster(
    conn: &mut SqliteConnection,
    class_id: &str,
    roster: &[RosterEntry],
) -> Result<(), AppError> {
    let roster_json = serde_json::to_string(roster)?;
    sqlx::query("UPDATE items SET roster = ? WHERE id = ?")
        .bind(&roster_json)
        .bind(class_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

async fn fetch_alert(conn: &mut SqliteConnection) -> Result<Option<AlertConfig>, AppError> {
    let row = sqlx::query(
        "SELECT title, content, color, orientation, active, enable_title, enable_content, updated_at FROM alert WHERE id = 1",
    )
    .fetch_optional(&mut *conn)
    .await?;

    row.as_ref().map(alert_from_row).transpose()
}

async fn write_alert(conn: &mut SqliteConnection, alert: &AlertConfig) -> Result<(), AppError> {
    sqlx::query(
        r#"INSERT OR REPLACE INTO alert (
            id, title, content, color, orientation, active, enable_title, enable_content, updated_at
        ) VALUES (1, ?, ?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(&alert.title)
    .bind(&alert.content)
    .bind(alert.color.as_str())
    .bind(alert.orientation.as_str())
    .bind(alert.active as i32)
    .bind(alert.enable_title as i32)
    .bind(alert.enable_content as i32)
    .bind(alert.updated_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn bump_revision(conn: &mut SqliteConnection) -> Result<(), AppError> {
    let now = Utc::now().to_rfc3339();
    sqlx::query("UPDATE meta SET revision_id = revision_id + 1, generated_at = ? WHERE id = 1")
        .bind(&now)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

async fn mark_initialized(conn: &mut SqliteConnection) -> Result<(), AppError> {
    sqlx::query("UPDATE meta SET initialized = 1 WHERE id = 1")
        .execute(&mut *conn)
        .await?;
    Ok(())
}

fn item_from_row(row: &SqliteRow) -> Result<ContentItem, AppError> {
    let id: String = row.try_get("id")?;
    let collection: String = row.try_get("collection")?;
    let active: Option<i64> = row.try_get("active")?;
    let roster: Option<String> = row.try_get("roster")?;

    let collection = Collection::parse(&collection)
        .map_err(|_| AppError::Internal(format!("Item {} has unknown collection", id)))?;
    let roster = roster
        .map(|s| serde_json::from_str::<Vec<RosterEntry>>(&s))
        .transpose()
        .map_err(|e| AppError::Internal(format!("Corrupt roster on item {}: {}", id, e)))?;

    Ok(ContentItem {
        collection,
        position: row.try_get("position")?,
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        editable_date: row.try_get("editable_date")?,
        last_updated: row.try_get("last_updated")?,
        filename: row.try_get("filename")?,
        active: active.map(|v| v != 0),
        roster,
        id,
    })
}

fn alert_from_row(row: &SqliteRow) -> Result<AlertConfig, AppError> {
    let color: String = row.try_get("color")?;
    let orientation: String = row.try_get("orientation")?;
    let active: i64 = row.try_get("active")?;
    let enable_title: i64 = row.try_get("enable_title")?;
    let enable_content: i64 = row.try_get("enable_content")?;

    Ok(AlertConfig {
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        color: AlertColor::from_str(&color)
            .ok_or_else(|| AppError::Internal(format!("Unknown alert color: {}", color)))?,
        orientation: AlertOrientation::from_str(&orientation).ok_or_else(|| {
            AppError::Internal(format!("Unknown alert orientation: {}", orientation))
        })?,
        active: active != 0,
        enable_title: enable_title != 0,
        enable_content: enable_content != 0,
        updated_at: row.try_get("updated_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_database;
    use crate::test_support::RecordingFileStore;
    use tempfile::TempDir;

    struct StoreFixture {
        store: ContentStore,
        files: Arc<RecordingFileStore>,
        _temp_dir: TempDir,
    }

    async fn fixture() -> StoreFixture {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let pool = init_database(&temp_dir.path().join("store.sqlite"))
            .await
            .expect("Failed to init DB");
        let files = Arc::new(RecordingFileStore::default());
        StoreFixture {
            store: ContentStore::new(pool, files.clone()),
            files,
            _temp_dir: temp_dir,
        }
    }

    fn news(title: &str) -> NewItem {
        NewItem {
            title: title.to_string(),
            content: format!("{} body", title),
            ..Default::default()
        }
    }

    fn signup(first: &str) -> SignupRequest {
        SignupRequest {
            first_name: first.to_string(),
            last_name: "B".to_string(),
            email: "a@b.com".to_string(),
        }
    }

    async fn ids(store: &ContentStore, collection: Collection) -> Vec<String> {
        store
            .list_collection(collection)
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.id)
            .collect()
    }

    #[tokio::test]
    async fn test_empty_collection_lists_nothing() {
        let f = fixture().await;
        for collection in Collection::ALL {
            assert!(f.store.list_collection(collection).await.unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn test_add_appends_with_fresh_timestamp() {
        let f = fixture().await;
        let before = Utc::now();

        let first = f.store.add_item(Collection::News, news("A")).await.unwrap();
        let second = f.store.add_item(Collection::News, news("B")).await.unwrap();

        assert!(first.last_updated >= before);
        assert_eq!(first.position, 0);
        assert_eq!(second.position, 1);
        assert!(first.active.is_none());
        assert!(first.roster.is_none());

        let listed = f.store.list_collection(Collection::News).await.unwrap();
        assert_eq!(listed, vec![first, second]);
    }

    #[tokio::test]
    async fn test_add_rejects_blank_fields() {
        let f = fixture().await;
        let err = f
            .store
            .add_item(Collection::Faq, news("   "))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(f.store.list_collection(Collection::Faq).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_merges_and_bumps_timestamp() {
        let f = fixture().await;
        let created = f.store.add_item(Collection::News, news("T")).await.unwrap();

        let request = UpdateItemRequest {
            title: Some("T2".to_string()),
            ..Default::default()
        };
        let updated = f
            .store
            .update_item(Collection::News, &created.id, &request)
            .await
            .unwrap();

        assert_eq!(updated.title, "T2");
        assert_eq!(updated.content, created.content);
        assert!(updated.last_updated > created.last_updated);

        let stored = f
            .store
            .get_item(Collection::News, &created.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored, updated);
    }

    #[tokio::test]
    async fn test_update_unknown_or_wrong_collection_is_not_found() {
        let f = fixture().await;
        let created = f.store.add_item(Collection::News, news("T")).await.unwrap();

        let request = UpdateItemRequest::default();
        let err = f
            .store
            .update_item(Collection::Faq, &created.id, &request)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let err = f
            .store
            .update_item(Collection::News, "missing", &request)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_removes_item() {
        let f = fixture().await;
        let created = f.store.add_item(Collection::News, news("T")).await.unwrap();

        f.store.delete_item(Collection::News, &created.id).await.unwrap();
        assert!(f.store.list_collection(Collection::News).await.unwrap().is_empty());
        assert!(f.files.removals().is_empty());

        let err = f
            .store
            .delete_item(Collection::News, &created.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_form_attempts_one_file_removal() {
        let f = fixture().await;
        let form = f
            .store
            .add_item_with_attachment(Collection::Forms, news("W-9"), "w9.pdf", b"%PDF")
            .await
            .unwrap();
        let filename = form.filename.clone().unwrap();

        // The file vanishing first must not make the delete fail.
        f.files.forget(&filename);
        f.store.delete_item(Collection::Forms, &form.id).await.unwrap();

        assert_eq!(f.files.removals(), vec![filename]);
        assert!(f.store.list_collection(Collection::Forms).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_form_swallows_removal_errors() {
        let f = fixture().await;
        let form = f
            .store
            .add_item_with_attachment(Collection::Forms, news("1040"), "1040.pdf", b"%PDF")
            .await
            .unwrap();

        f.files.fail_removals();
        f.store.delete_item(Collection::Forms, &form.id).await.unwrap();
        assert_eq!(f.files.removals().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_upload_creates_no_item() {
        let f = fixture().await;
        f.files.fail_saves();

        let err = f
            .store
            .add_item_with_attachment(Collection::Forms, news("W-4"), "w4.pdf", b"%PDF")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Storage(_)));
        assert!(f.store.list_collection(Collection::Forms).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_upload_writes_no_file() {
        let f = fixture().await;
        let err = f
            .store
            .add_item_with_attachment(Collection::Forms, news(""), "w4.pdf", b"%PDF")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(f.files.stored_count(), 0);
    }

    #[tokio::test]
    async fn test_forms_without_attachment_rejected() {
        let f = fixture().await;
        let err = f
            .store
            .add_item(Collection::Forms, news("W-9"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_reorder_is_a_permutation() {
        let f = fixture().await;
        for title in ["A", "B", "C"] {
            f.store.add_item(Collection::Faq, news(title)).await.unwrap();
        }
        let before = ids(&f.store, Collection::Faq).await;
        let reversed: Vec<String> = before.iter().rev().cloned().collect();

        let listed = f.store.reorder(Collection::Faq, &reversed).await.unwrap();

        let after: Vec<String> = listed.iter().map(|i| i.id.clone()).collect();
        assert_eq!(after, reversed);
        let titles: Vec<&str> = listed.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["C", "B", "A"]);

        let mut sorted_before = before.clone();
        let mut sorted_after = after.clone();
        sorted_before.sort();
        sorted_after.sort();
        assert_eq!(sorted_before, sorted_after);
    }

    #[tokio::test]
    async fn test_reorder_rejects_bad_id_sets() {
        let f = fixture().await;
        for title in ["A", "B"] {
            f.store.add_item(Collection::News, news(title)).await.unwrap();
        }
        let before = ids(&f.store, Collection::News).await;

        let unknown = vec![before[1].clone(), "stranger".to_string()];
        let partial = vec![before[1].clone()];
        let duplicated = vec![before[1].clone(), before[1].clone()];
        let extra = vec![before[1].clone(), before[0].clone(), "stranger".to_string()];

        for bad in [unknown, partial, duplicated, extra] {
            let err = f.store.reorder(Collection::News, &bad).await.unwrap_err();
            assert!(matches!(err, AppError::Validation(_)));
            assert_eq!(ids(&f.store, Collection::News).await, before);
        }
    }

    #[tokio::test]
    async fn test_reorder_leaves_fields_untouched() {
        let f = fixture().await;
        let a = f.store.add_item(Collection::News, news("A")).await.unwrap();
        let b = f.store.add_item(Collection::News, news("B")).await.unwrap();

        f.store
            .reorder(Collection::News, &[b.id.clone(), a.id.clone()])
            .await
            .unwrap();

        let stored = f
            .store
            .get_item(Collection::News, &a.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.last_updated, a.last_updated);
        assert_eq!(stored.title, a.title);
        assert_eq!(stored.position, 1);
    }

    #[tokio::test]
    async fn test_new_item_after_reorder_goes_last() {
        let f = fixture().await;
        let a = f.store.add_item(Collection::News, news("A")).await.unwrap();
        let b = f.store.add_item(Collection::News, news("B")).await.unwrap();
        f.store
            .reorder(Collection::News, &[b.id.clone(), a.id.clone()])
            .await
            .unwrap();

        let c = f.store.add_item(Collection::News, news("C")).await.unwrap();
        assert_eq!(ids(&f.store, Collection::News).await, vec![b.id, a.id, c.id]);
    }

    #[tokio::test]
    async fn test_class_signup_and_roster_removal() {
        let f = fixture().await;
        let class = f
            .store
            .add_item(
                Collection::Classes,
                NewItem {
                    title: "Tax 101".to_string(),
                    content: "Basics".to_string(),
                    active: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(class.roster, Some(vec![]));

        f.store.sign_up(&class.id, signup("A")).await.unwrap();
        f.store.sign_up(&class.id, signup("A")).await.unwrap();

        let stored = f
            .store
            .get_item(Collection::Classes, &class.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.roster.as_ref().map(Vec::len), Some(2));

        f.store.delete_roster_entry(&class.id, 0).await.unwrap();
        f.store.delete_roster_entry(&class.id, 0).await.unwrap();

        let stored = f
            .store
            .get_item(Collection::Classes, &class.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.roster, Some(vec![]));
    }

    #[tokio::test]
    async fn test_roster_errors() {
        let f = fixture().await;
        let err = f.store.sign_up("missing", signup("A")).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        // News items are not classes.
        let item = f.store.add_item(Collection::News, news("N")).await.unwrap();
        let err = f.store.sign_up(&item.id, signup("A")).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let class = f
            .store
            .add_item(
                Collection::Classes,
                NewItem {
                    title: "Payroll".to_string(),
                    content: "Closed".to_string(),
                    active: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let err = f.store.sign_up(&class.id, signup("A")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = f
            .store
            .delete_roster_entry(&class.id, 0)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_alert_defaults_and_save() {
        let f = fixture().await;
        assert_eq!(f.store.get_alert().await.unwrap().color, AlertColor::Warning);

        let saved = f
            .store
            .save_alert(&UpdateAlertRequest {
                title: Some("Office closed".to_string()),
                active: Some(true),
                color: Some(AlertColor::Danger),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(saved.active);

        let loaded = f.store.get_alert().await.unwrap();
        assert_eq!(loaded.title, "Office closed");
        assert_eq!(loaded.color, AlertColor::Danger);
        assert!(loaded.active);
    }

    #[tokio::test]
    async fn test_alert_with_nothing_enabled_cannot_be_active() {
        let f = fixture().await;
        let err = f
            .store
            .save_alert(&UpdateAlertRequest {
                active: Some(true),
                enable_title: Some(false),
                enable_content: Some(false),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(!f.store.get_alert().await.unwrap().active);
    }

    #[tokio::test]
    async fn test_writes_bump_revision() {
        let f = fixture().await;
        let start = f.store.get_revision_id().await.unwrap();

        let item = f.store.add_item(Collection::News, news("R")).await.unwrap();
        f.store
            .update_item(Collection::News, &item.id, &UpdateItemRequest::default())
            .await
            .unwrap();
        f.store.delete_item(Collection::News, &item.id).await.unwrap();

        assert_eq!(f.store.get_revision_id().await.unwrap(), start + 3);
    }

    #[tokio::test]
    async fn test_public_snapshot_hides_rosters() {
        let f = fixture().await;
        let class = f
            .store
            .add_item(
                Collection::Classes,
                NewItem {
                    title: "QuickBooks".to_string(),
                    content: "Intro".to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        f.store.sign_up(&class.id, signup("A")).await.unwrap();

        let public = f.store.snapshot(false).await.unwrap();
        assert!(public.classes[0].roster.is_none());

        let admin = f.store.snapshot(true).await.unwrap();
        assert_eq!(admin.classes[0].roster.as_ref().map(Vec::len), Some(1));
    }

    #[test]
    fn test_next_timestamp_is_strictly_later() {
        let future = Utc::now() + TimeDelta::seconds(60);
        assert!(next_timestamp(future) > future);

        let past = Utc::now() - TimeDelta::seconds(60);
        assert!(next_timestamp(past) > past);
    }

    #[tokio::test]
    async fn test_update_clears_editable_date_on_null() {
        let f = fixture().await;
        let created = f
            .store
            .add_item(
                Collection::News,
                NewItem {
                    editable_date: NaiveDate::from_ymd_opt(2024, 4, 15),
                    ..news("Deadline")
                },
            )
            .await
            .unwrap();

        let keep = UpdateItemRequest {
            title: Some("Deadline moved".to_string()),
            ..Default::default()
        };
        let kept = f
            .store
            .update_item(Collection::News, &created.id, &keep)
            .await
            .unwrap();
        assert_eq!(kept.editable_date, created.editable_date);

        let clear = UpdateItemRequest {
            editable_date: Some(None),
            ..Default::default()
        };
        let cleared = f
            .store
            .update_item(Collection::News, &created.id, &clear)
            .await
            .unwrap();
        assert_eq!(cleared.editable_date, None);
    }

    #[tokio::test]
    async fn test_failed_insert_removes_saved_attachment() {
        let f = fixture().await;
        sqlx::query("DROP TABLE items")
            .execute(&f.store.pool)
            .await
            .unwrap();

        let err = f
            .store
            .add_item_with_attachment(Collection::Forms, news("W-2"), "w2.pdf", b"%PDF")
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Database(_)));
        assert_eq!(f.files.removals(), vec!["0-w2.pdf".to_string()]);
        assert_eq!(f.files.stored_count(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_signups_all_land() {
        let f = fixture().await;
        let class = f
            .store
            .add_item(
                Collection::Classes,
                NewItem {
                    title: "Payroll basics".to_string(),
                    content: "Saturday workshop".to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let store = Arc::new(f.store);

        let handles: Vec<_> = (0..20)
            .map(|n| {
                let store = store.clone();
                let class_id = class.id.clone();
                tokio::spawn(async move {
                    store
                        .sign_up(&class_id, signup(&format!("S{}", n)))
                        .await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let class = store
            .get_item(Collection::Classes, &class.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(class.roster.map(|r| r.len()), Some(20));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_adds_get_distinct_positions() {
        let f = fixture().await;
        let store = Arc::new(f.store);

        let handles: Vec<_> = (0..20)
            .map(|n| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .add_item(Collection::News, news(&format!("Item {}", n)))
                        .await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let positions: Vec<i64> = store
            .list_collection(Collection::News)
            .await
            .unwrap()
            .iter()
            .map(|i| i.position)
            .collect();
        assert_eq!(positions, (0..20).collect::<Vec<i64>>());
    }
}
