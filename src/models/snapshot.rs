//! The whole-document exchange unit between client and server.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Candidate, Course, LogEntry, MAX_PHOTO_SIZE, MIN_AGE};

/// Institute settings carried inside the document.
///
/// Keys this crate does not know about are kept and written back verbatim.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct InstituteConfig {
    pub min_age: u32,
    pub max_file_size: u64,
    pub courses: Vec<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Default for InstituteConfig {
    fn default() -> Self {
        Self {
            min_age: MIN_AGE,
            max_file_size: MAX_PHOTO_SIZE as u64,
            courses: Course::ALL.iter().map(|c| c.as_str().to_string()).collect(),
            extra: serde_json::Map::new(),
        }
    }
}

/// Complete state of the registry. Replaced as a unit, never merged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SyncSnapshot {
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub logs: Vec<LogEntry>,
    #[serde(default)]
    pub config: InstituteConfig,
    #[serde(default)]
    pub published: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sync: Option<DateTime<Utc>>,
}

impl SyncSnapshot {
    /// The document a fresh or reset server starts from.
    pub fn default_document() -> Self {
        Self {
            candidates: Vec::new(),
            logs: Vec::new(),
            config: InstituteConfig::default(),
            published: false,
            last_sync: Some(Utc::now()),
        }
    }
}

/// Server health summary returned by `/api/status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerStatus {
    pub status: String,
    pub candidates: usize,
    pub logs: usize,
    #[serde(default)]
    pub last_sync: Option<DateTime<Utc>>,
}

/// Acknowledgement of a snapshot upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReceipt {
    pub last_sync: DateTime<Utc>,
}
