//! Whole-site snapshot served to the public pages and the dashboard.

use serde::{Deserialize, Serialize};

use super::{AlertConfig, ContentItem};

/// Every collection plus the alert banner, in display order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteSnapshot {
    pub schema_version: i32,
    pub generated_at: String,
    pub revision_id: i64,
    pub news: Vec<ContentItem>,
    pub faq: Vec<ContentItem>,
    pub forms: Vec<ContentItem>,
    pub classes: Vec<ContentItem>,
    pub alert: AlertConfig,
}

/// Revision information for change detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionInfo {
    pub revision_id: i64,
    pub generated_at: String,
}
