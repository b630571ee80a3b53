//! Content item model shared by the news, faq, forms and classes collections.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::RosterEntry;
use crate::errors::AppError;

/// One of the four named, ordered collections.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    News,
    Faq,
    Forms,
    Classes,
}

impl Collection {
    pub const ALL: [Collection; 4] = [
        Collection::News,
        Collection::Faq,
        Collection::Forms,
        Collection::Classes,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::News => "news",
            Collection::Faq => "faq",
            Collection::Forms => "forms",
            Collection::Classes => "classes",
        }
    }

    /// Parse a collection name from a route or a legacy data file.
    pub fn parse(name: &str) -> Result<Self, AppError> {
        match name {
            "news" => Ok(Collection::News),
            "faq" => Ok(Collection::Faq),
            "forms" => Ok(Collection::Forms),
            "classes" => Ok(Collection::Classes),
            _ => Err(AppError::UnknownCollection(format!(
                "Unknown collection: {}",
                name
            ))),
        }
    }

    /// Forms items must carry an attached file.
    pub fn requires_attachment(&self) -> bool {
        matches!(self, Collection::Forms)
    }

    /// Only classes carry an active flag and a signup roster.
    pub fn has_roster(&self) -> bool {
        matches!(self, Collection::Classes)
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A titled, dated piece of site content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    pub id: String,
    pub collection: Collection,
    pub position: i64,
    pub title: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub editable_date: Option<NaiveDate>,
    pub last_updated: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roster: Option<Vec<RosterEntry>>,
}

impl ContentItem {
    /// Drop signup details before the item is shown on the public site.
    pub fn without_roster(mut self) -> Self {
        self.roster = None;
        self
    }
}

/// Fields for a new item, after the HTTP layer (or importer) has gathered them.
#[derive(Debug, Clone, Default)]
pub struct NewItem {
    pub title: String,
    pub content: String,
    pub editable_date: Option<NaiveDate>,
    pub filename: Option<String>,
    pub active: Option<bool>,
}

impl NewItem {
    /// Check required fields for the target collection and trim text fields.
    pub fn validated(self, collection: Collection) -> Result<Self, AppError> {
        let item = self.validated_text(collection)?;
        if collection.requires_attachment() {
            let has_file = item
                .filename
                .as_deref()
                .is_some_and(|f| !f.trim().is_empty());
            if !has_file {
                return Err(AppError::Validation(
                    "An attached file is required for forms".to_string(),
                ));
            }
        }
        Ok(item)
    }

    /// Everything [`NewItem::validated`] checks except the attachment, so an
    /// upload can be rejected before its file is written.
    pub fn validated_text(mut self, collection: Collection) -> Result<Self, AppError> {
        self.title = self.title.trim().to_string();
        self.content = self.content.trim().to_string();

        if self.title.is_empty() {
            return Err(AppError::Validation("Title is required".to_string()));
        }
        if self.content.is_empty() {
            return Err(AppError::Validation("Content is required".to_string()));
        }
        if !collection.has_roster() && self.active.is_some() {
            return Err(AppError::Validation(format!(
                "Items in {} have no active flag",
                collection
            )));
        }
        Ok(self)
    }
}

/// Request body for creating a new item.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateItemRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub editable_date: Option<NaiveDate>,
    #[serde(default)]
    pub active: Option<bool>,
}

impl From<CreateItemRequest> for NewItem {
    fn from(request: CreateItemRequest) -> Self {
        NewItem {
            title: request.title,
            content: request.content,
            editable_date: request.editable_date,
            filename: None,
            active: request.active,
        }
    }
}

/// Request body for a partial update of an existing item.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateItemRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    /// Absent keeps the date, `null` clears it.
    #[serde(default, deserialize_with = "present")]
    pub editable_date: Option<Option<NaiveDate>>,
    #[serde(default)]
    pub active: Option<bool>,
}

/// Marks a field that was sent, even as `null`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Request body for persisting a new display order.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderRequest {
    pub ids: Vec<String>,
}
