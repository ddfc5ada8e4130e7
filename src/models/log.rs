//! Audit log entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Actor recorded when no user is logged in.
pub const SYSTEM_ACTOR: &str = "Sistema";

/// Immutable audit record. Entries are only ever appended.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogEntry {
    pub action: String,
    pub timestamp: DateTime<Utc>,
    pub user: String,
}

impl LogEntry {
    pub fn new(action: impl Into<String>, user: Option<&str>) -> Self {
        Self {
            action: action.into(),
            timestamp: Utc::now(),
            user: user.unwrap_or(SYSTEM_ACTOR).to_string(),
        }
    }
}

/// Request body for appending a log entry through the API.
#[derive(Debug, Clone, Deserialize)]
pub struct AppendLogRequest {
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub user: Option<String>,
}
