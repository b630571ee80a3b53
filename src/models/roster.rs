//! Class signup roster model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// A single signup on a class roster.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub signup_date: DateTime<Utc>,
}

/// Request body for a public class signup.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
}

impl SignupRequest {
    /// Build the roster entry, stamping the signup time.
    pub fn into_entry(self, signup_date: DateTime<Utc>) -> Result<RosterEntry, AppError> {
        let first_name = self.first_name.trim().to_string();
        let last_name = self.last_name.trim().to_string();
        let email = self.email.trim().to_string();

        if first_name.is_empty() || last_name.is_empty() {
            return Err(AppError::Validation(
                "First and last name are required".to_string(),
            ));
        }
        if email.is_empty() || !email.contains('@') {
            return Err(AppError::Validation(
                "A valid email address is required".to_string(),
            ));
        }

        Ok(RosterEntry {
            first_name,
            last_name,
            email,
            signup_date,
        })
    }
}
