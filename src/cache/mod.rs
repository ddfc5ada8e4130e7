//! Client-side local cache.
//!
//! A key-value persistence layer holding the candidate list, logs, config,
//! publication flag and session as independent JSON values. Several handles
//! ("contexts", one per open window) may share one backing storage; every write
//! is broadcast so other contexts can react to it.

mod storage;

pub use storage::*;

use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{Candidate, InstituteConfig, LogEntry, SyncSnapshot};
use crate::session::Session;
use crate::store::RecordStore;

/// Prefix shared by every key this crate writes.
pub const KEY_PREFIX: &str = "ipial_";
pub const CANDIDATES_KEY: &str = "ipial_candidates";
pub const LOGS_KEY: &str = "ipial_logs";
pub const CONFIG_KEY: &str = "ipial_config";
pub const PUBLISHED_KEY: &str = "ipial_published";
pub const AUTH_KEY: &str = "ipial_auth";

const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// Notification emitted after a key is written or removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheChange {
    pub key: String,
    /// Context that performed the write.
    pub origin: Uuid,
}

/// Handle onto the local cache for one execution context.
///
/// Clones share the context id; use [`LocalCache::open_context`] to model a
/// second window on the same storage.
#[derive(Clone)]
pub struct LocalCache {
    storage: Arc<dyn KeyValueStore>,
    changes: broadcast::Sender<CacheChange>,
    context: Uuid,
}

impl LocalCache {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            storage,
            changes,
            context: Uuid::new_v4(),
        }
    }

    /// Cache backed by a process-local map.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::default()))
    }

    /// Another context sharing this cache's storage and change feed.
    pub fn open_context(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
            changes: self.changes.clone(),
            context: Uuid::new_v4(),
        }
    }

    pub fn context_id(&self) -> Uuid {
        self.context
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CacheChange> {
        self.changes.subscribe()
    }

    /// Seed empty collections for keys that were never written.
    pub fn init(&self) -> Result<(), AppError> {
        if self.storage.get(CANDIDATES_KEY)?.is_none() {
            self.save_candidates(&[])?;
        }
        if self.storage.get(LOGS_KEY)?.is_none() {
            self.save_logs(&[])?;
        }
        if self.storage.get(CONFIG_KEY)?.is_none() {
            self.save_config(&InstituteConfig::default())?;
        }
        if self.storage.get(PUBLISHED_KEY)?.is_none() {
            self.save_published(false)?;
        }
        Ok(())
    }

    pub fn load_candidates(&self) -> Vec<Candidate> {
        self.read_json(CANDIDATES_KEY).unwrap_or_default()
    }

    pub fn save_candidates(&self, candidates: &[Candidate]) -> Result<(), AppError> {
        self.write_json(CANDIDATES_KEY, &candidates)
    }

    pub fn load_logs(&self) -> Vec<LogEntry> {
        self.read_json(LOGS_KEY).unwrap_or_default()
    }

    pub fn save_logs(&self, logs: &[LogEntry]) -> Result<(), AppError> {
        self.write_json(LOGS_KEY, &logs)
    }

    pub fn load_config(&self) -> InstituteConfig {
        self.read_json(CONFIG_KEY).unwrap_or_default()
    }

    pub fn save_config(&self, config: &InstituteConfig) -> Result<(), AppError> {
        self.write_json(CONFIG_KEY, config)
    }

    pub fn load_published(&self) -> bool {
        self.read_json(PUBLISHED_KEY).unwrap_or(false)
    }

    pub fn save_published(&self, published: bool) -> Result<(), AppError> {
        self.write_json(PUBLISHED_KEY, &published)
    }

    /// Stored session, without any expiry check.
    pub fn load_session(&self) -> Option<Session> {
        self.read_json(AUTH_KEY)
    }

    pub fn save_session(&self, session: &Session) -> Result<(), AppError> {
        self.write_json(AUTH_KEY, session)
    }

    pub fn clear_session(&self) -> Result<(), AppError> {
        self.storage.remove(AUTH_KEY)?;
        self.notify(AUTH_KEY);
        Ok(())
    }

    /// Everything the cache holds, as one upload-ready document.
    pub fn snapshot(&self) -> SyncSnapshot {
        SyncSnapshot {
            candidates: self.load_candidates(),
            logs: self.load_logs(),
            config: self.load_config(),
            published: self.load_published(),
            last_sync: None,
        }
    }

    /// Like [`LocalCache::snapshot`], but an undecodable key is an error
    /// instead of an empty value. Uploads use this so a damaged cache never
    /// replaces the server document.
    pub fn try_snapshot(&self) -> Result<SyncSnapshot, AppError> {
        Ok(SyncSnapshot {
            candidates: self.try_read_json(CANDIDATES_KEY)?.unwrap_or_default(),
            logs: self.try_read_json(LOGS_KEY)?.unwrap_or_default(),
            config: self.try_read_json(CONFIG_KEY)?.unwrap_or_default(),
            published: self.try_read_json(PUBLISHED_KEY)?.unwrap_or(false),
            last_sync: None,
        })
    }

    /// Overwrite every data key with the snapshot's contents.
    pub fn store_snapshot(&self, snapshot: &SyncSnapshot) -> Result<(), AppError> {
        self.save_candidates(&snapshot.candidates)?;
        self.save_logs(&snapshot.logs)?;
        self.save_config(&snapshot.config)?;
        self.save_published(snapshot.published)
    }

    /// Mirror the record store into the cache.
    pub fn store_records(&self, store: &RecordStore) -> Result<(), AppError> {
        self.store_snapshot(&store.snapshot())
    }

    fn read_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.try_read_json(key) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Ignoring cache key {}: {}", key, e);
                None
            }
        }
    }

    fn try_read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, AppError> {
        let Some(raw) = self.storage.get(key)? else {
            return Ok(None);
        };
        serde_json::from_str(&raw).map(Some).map_err(|e| {
            AppError::Persistence(format!("Cache key {} is unreadable: {}", key, e))
        })
    }

    fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), AppError> {
        let raw = serde_json::to_string(value)?;
        self.storage.set(key, &raw)?;
        self.notify(key);
        Ok(())
    }

    fn notify(&self, key: &str) {
        // No subscribers is fine.
        let _ = self.changes.send(CacheChange {
            key: key.to_string(),
            origin: self.context,
        });
    }
}
