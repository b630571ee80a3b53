//! Legacy flat-file store: format migration and conversion for import.
//!
//! The old site kept one JSON document `{news: [...], faq: [...], forms: [...],
//! classes: [...]}` on disk. Early revisions stored items without a `title`;
//! those are rewritten in place before import.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};

use super::ImportedItem;
use crate::errors::AppError;
use crate::models::Collection;

const UNTITLED: &str = "Untitled";
const DEFAULT_CONTENT: &str = "Default content";

/// One item after migration, as found in the legacy document.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyItem {
    title: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    editable_date: Option<String>,
    #[serde(default)]
    last_updated: Option<String>,
    #[serde(default)]
    filename: Option<String>,
}

/// Rewrite title-less items in every collection of a legacy document.
///
/// Items that already have a title pass through unchanged, so running this
/// on its own output changes nothing. Returns the number of items rewritten.
pub fn migrate_legacy_document(doc: &mut Value, now: DateTime<Utc>) -> Result<usize, AppError> {
    let collections = doc
        .as_object_mut()
        .ok_or_else(|| malformed("top level must be an object"))?;

    let mut migrated = 0;
    for (name, items) in collections.iter_mut() {
        let items = items
            .as_array_mut()
            .ok_or_else(|| malformed(&format!("{} must be an array", name)))?;

        for item in items.iter_mut() {
            let fields = item
                .as_object()
                .ok_or_else(|| malformed(&format!("{} contains a non-object item", name)))?;
            if has_title(fields) {
                continue;
            }
            *item = migrate_item(fields, now);
            migrated += 1;
        }
    }
    Ok(migrated)
}

/// Turn a migrated document into items ready for import, in file order.
///
/// Keys other than the four collection names are skipped.
pub fn legacy_items(doc: &Value, now: DateTime<Utc>) -> Result<Vec<ImportedItem>, AppError> {
    let collections = doc
        .as_object()
        .ok_or_else(|| malformed("top level must be an object"))?;

    let mut imported = Vec::new();
    for collection in Collection::ALL {
        let Some(items) = collections.get(collection.as_str()) else {
            continue;
        };
        let items: Vec<LegacyItem> = serde_json::from_value(items.clone())
            .map_err(|e| malformed(&format!("{}: {}", collection, e)))?;

        for item in items {
            imported.push(ImportedItem {
                collection,
                title: item.title,
                content: if item.content.trim().is_empty() {
                    DEFAULT_CONTENT.to_string()
                } else {
                    item.content
                },
                editable_date: parse_legacy_date(item.editable_date.as_deref())?,
                last_updated: parse_legacy_timestamp(item.last_updated.as_deref(), now)?,
                filename: item.filename.filter(|f| !f.is_empty()),
            });
        }
    }

    for name in collections.keys() {
        if Collection::parse(name).is_err() {
            tracing::warn!("Skipping unknown legacy collection: {}", name);
        }
    }

    Ok(imported)
}

/// Only a non-blank string counts; anything else is rewritten like a missing title.
fn has_title(fields: &Map<String, Value>) -> bool {
    matches!(fields.get("title"), Some(Value::String(s)) if !s.trim().is_empty())
}

fn migrate_item(fields: &Map<String, Value>, now: DateTime<Utc>) -> Value {
    let carried = |key: &str, default: String| -> Value {
        match fields.get(key) {
            Some(Value::String(s)) if !s.is_empty() => Value::String(s.clone()),
            _ => Value::String(default),
        }
    };

    let mut migrated = Map::new();
    migrated.insert("title".to_string(), Value::String(UNTITLED.to_string()));
    migrated.insert(
        "content".to_string(),
        carried("content", DEFAULT_CONTENT.to_string()),
    );
    migrated.insert(
        "editableDate".to_string(),
        carried("editableDate", now.date_naive().to_string()),
    );
    migrated.insert(
        "lastUpdated".to_string(),
        carried("lastUpdated", now.to_rfc3339()),
    );
    migrated.insert("filename".to_string(), carried("filename", String::new()));
    Value::Object(migrated)
}

fn parse_legacy_date(raw: Option<&str>) -> Result<Option<NaiveDate>, AppError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Some)
            .map_err(|e| malformed(&format!("bad editableDate {:?}: {}", s, e))),
    }
}

fn parse_legacy_timestamp(
    raw: Option<&str>,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>, AppError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(now),
        Some(s) => DateTime::parse_from_rfc3339(s)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| malformed(&format!("bad lastUpdated {:?}: {}", s, e))),
    }
}

fn malformed(detail: &str) -> AppError {
    AppError::Internal(format!("Malformed legacy data: {}", detail))
}
