//! Site-wide alert banner model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// Bootstrap contextual color of the banner.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AlertColor {
    Danger,
    Warning,
    Success,
    Light,
}

impl AlertColor {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertColor::Danger => "danger",
            AlertColor::Warning => "warning",
            AlertColor::Success => "success",
            AlertColor::Light => "light",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "danger" => Some(AlertColor::Danger),
            "warning" => Some(AlertColor::Warning),
            "success" => Some(AlertColor::Success),
            "light" => Some(AlertColor::Light),
            _ => None,
        }
    }
}

/// Whether the banner sits above or below the page.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AlertOrientation {
    Top,
    Bottom,
}

impl AlertOrientation {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertOrientation::Top => "top",
            AlertOrientation::Bottom => "bottom",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "top" => Some(AlertOrientation::Top),
            "bottom" => Some(AlertOrientation::Bottom),
            _ => None,
        }
    }
}

/// The singleton banner configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AlertConfig {
    pub title: String,
    pub content: String,
    pub color: AlertColor,
    pub orientation: AlertOrientation,
    pub active: bool,
    pub enable_title: bool,
    pub enable_content: bool,
    pub updated_at: DateTime<Utc>,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            title: String::new(),
            content: String::new(),
            color: AlertColor::Warning,
            orientation: AlertOrientation::Top,
            active: false,
            enable_title: true,
            enable_content: true,
            updated_at: Utc::now(),
        }
    }
}

impl AlertConfig {
    /// Apply a partial update and check the banner can actually show something.
    pub fn merged(&self, request: &UpdateAlertRequest) -> Result<Self, AppError> {
        let merged = Self {
            title: request.title.clone().unwrap_or_else(|| self.title.clone()),
            content: request
                .content
                .clone()
                .unwrap_or_else(|| self.content.clone()),
            color: request.color.unwrap_or(self.color),
            orientation: request.orientation.unwrap_or(self.orientation),
            active: request.active.unwrap_or(self.active),
            enable_title: request.enable_title.unwrap_or(self.enable_title),
            enable_content: request.enable_content.unwrap_or(self.enable_content),
            updated_at: Utc::now(),
        };

        if merged.active && !merged.enable_title && !merged.enable_content {
            return Err(AppError::Validation(
                "An active alert must enable its title or its content".to_string(),
            ));
        }
        Ok(merged)
    }
}

/// Request body for saving the alert banner.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAlertRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub color: Option<AlertColor>,
    #[serde(default)]
    pub orientation: Option<AlertOrientation>,
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(default)]
    pub enable_title: Option<bool>,
    #[serde(default)]
    pub enable_content: Option<bool>,
}
