//! Sync coordinator.
//!
//! Keeps the local cache and the server document convergent with the server as
//! tie-breaker. The unit of exchange is the whole snapshot: an upload replaces
//! the server document, a download replaces the local cache and the record
//! store. There is no per-record merge, so two clients uploading in turn leave
//! the server with the last upload only.

mod client;

pub use client::*;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::cache::{LocalCache, KEY_PREFIX};
use crate::errors::AppError;
use crate::models::SyncSnapshot;
use crate::store::RecordStore;

/// Interval of the background pull.
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(15);

/// Record store shared between the UI layer and the sync layer.
pub type SharedStore = Arc<RwLock<RecordStore>>;

/// Keeps the record store, the local cache and the server document in step.
///
/// Every sync step runs behind one gate, so a background pull never lands
/// between a local mutation and its upload.
#[derive(Clone)]
pub struct SyncCoordinator {
    client: SyncClient,
    cache: LocalCache,
    store: SharedStore,
    gate: Arc<Mutex<()>>,
    synced: Arc<AtomicBool>,
}

impl SyncCoordinator {
    pub fn new(client: SyncClient, cache: LocalCache, store: SharedStore) -> Self {
        Self {
            client,
            cache,
            store,
            gate: Arc::new(Mutex::new(())),
            synced: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn client(&self) -> &SyncClient {
        &self.client
    }

    pub fn cache(&self) -> &LocalCache {
        &self.cache
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// Whether a pull from the server has succeeded at least once.
    pub fn has_synced(&self) -> bool {
        self.synced.load(Ordering::Acquire)
    }

    /// Download the server document and make it the local state.
    ///
    /// On failure nothing local is touched.
    pub async fn sync_from_server(&self) -> Result<(), AppError> {
        let _gate = self.gate.lock().await;
        self.pull().await
    }

    /// Upload the cached snapshot, replacing the server document.
    ///
    /// An unreadable cache entry aborts the upload.
    pub async fn sync_to_server(&self) -> Result<(), AppError> {
        let _gate = self.gate.lock().await;
        self.push().await
    }

    /// Save protocol after a local mutation: cache, upload, re-pull.
    ///
    /// The re-pull runs even when the upload fails. The first failure is returned.
    pub async fn save(&self) -> Result<(), AppError> {
        let _gate = self.gate.lock().await;
        {
            let store = self.store.read().await;
            self.cache.store_records(&store)?;
        }
        let pushed = self.push().await;
        let pulled = self.pull().await;
        pushed.and(pulled)
    }

    /// Apply `mutation` to the record store and run the save protocol.
    ///
    /// The cache is written under the same store guard as the mutation. Until
    /// the first successful pull the change stays local, so a client that never
    /// saw the server document cannot replace it. Network failures after the
    /// local write are logged and tolerated.
    pub async fn commit<T, F>(&self, mutation: F) -> Result<T, AppError>
    where
        F: FnOnce(&mut RecordStore) -> Result<T, AppError>,
    {
        let _gate = self.gate.lock().await;
        let value = {
            let mut store = self.store.write().await;
            let value = mutation(&mut store)?;
            self.cache.store_records(&store)?;
            value
        };

        if !self.has_synced() {
            tracing::warn!(
                "No pull from {} has succeeded yet, keeping the change local",
                self.client.base_url()
            );
            return Ok(value);
        }

        let pushed = self.push().await;
        let pulled = self.pull().await;
        match pushed.and(pulled) {
            Ok(()) => Ok(value),
            Err(AppError::Network(message)) => {
                tracing::warn!("Working offline: {}", message);
                Ok(value)
            }
            Err(e) => Err(e),
        }
    }

    async fn pull(&self) -> Result<(), AppError> {
        let snapshot = match self.client.fetch_snapshot().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!("Pull from {} failed, keeping local data: {}", self.client.base_url(), e);
                return Err(e);
            }
        };

        let count = snapshot.candidates.len();
        {
            let mut store = self.store.write().await;
            self.cache.store_snapshot(&snapshot)?;
            store.replace_with(snapshot);
        }
        self.synced.store(true, Ordering::Release);
        tracing::debug!("Pulled snapshot with {} candidates", count);
        Ok(())
    }

    async fn push(&self) -> Result<(), AppError> {
        let snapshot = match self.cache.try_snapshot() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::error!("Local cache is unreadable, upload skipped: {}", e);
                return Err(e);
            }
        };
        match self.client.push_snapshot(&snapshot).await {
            Ok(last_sync) => {
                tracing::debug!(
                    "Pushed snapshot with {} candidates (lastSync {})",
                    snapshot.candidates.len(),
                    last_sync
                );
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Push to {} failed, local copy kept: {}", self.client.base_url(), e);
                Err(e)
            }
        }
    }

    /// Spawn the periodic pull. The first tick comes one interval from now.
    pub fn start_periodic_pull(&self, interval: Duration) -> JoinHandle<()> {
        let coordinator = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                // Failures are logged inside; the next tick retries.
                let _ = coordinator.sync_from_server().await;
            }
        })
    }

    /// Spawn a watcher that uploads when another context writes to the cache.
    pub fn watch_other_contexts(&self) -> JoinHandle<()> {
        let coordinator = self.clone();
        let mut changes = self.cache.subscribe();
        let own_context = self.cache.context_id();
        tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(change) if change.origin != own_context && change.key.starts_with(KEY_PREFIX) => {
                        tracing::debug!("Cache key {} changed in another context, uploading", change.key);
                        let _ = coordinator.sync_to_server().await;
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::debug!("Cache watcher skipped {} changes", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    /// Server document for backup, falling back to the local cache.
    pub async fn export_data(&self) -> SyncSnapshot {
        match self.client.fetch_snapshot().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!("Export falling back to local cache: {}", e);
                self.cache.snapshot()
            }
        }
    }

    /// Restore a backup: write it locally, then upload it.
    pub async fn import_data(&self, snapshot: SyncSnapshot) -> Result<(), AppError> {
        let _gate = self.gate.lock().await;
        {
            let mut store = self.store.write().await;
            self.cache.store_snapshot(&snapshot)?;
            store.replace_with(snapshot);
        }
        self.push().await
    }

    /// Parse and restore a JSON backup document.
    pub async fn import_json(&self, json: &str) -> Result<(), AppError> {
        let value: serde_json::Value = serde_json::from_str(json)
            .map_err(|e| AppError::Validation(format!("Invalid backup: {}", e)))?;
        if !value.get("candidates").is_some_and(|c| c.is_array()) {
            return Err(AppError::Validation(
                "Invalid backup: \"candidates\" must be a list".to_string(),
            ));
        }
        let snapshot: SyncSnapshot = serde_json::from_value(value)
            .map_err(|e| AppError::Validation(format!("Invalid backup: {}", e)))?;
        self.import_data(snapshot).await
    }

    /// Whether the server answers its health probe.
    pub async fn server_online(&self) -> bool {
        self.client.status().await.is_ok()
    }
}

/// Background sync tasks of one session. Aborted when dropped.
#[derive(Default)]
pub struct SyncTasks {
    handles: Vec<JoinHandle<()>>,
}

impl SyncTasks {
    pub fn start(coordinator: &SyncCoordinator, interval: Duration) -> Self {
        Self {
            handles: vec![
                coordinator.start_periodic_pull(interval),
                coordinator.watch_other_contexts(),
            ],
        }
    }

    pub fn stop(&mut self) {
        for handle in self.handles.drain(..) {
            handle.abort();
        }
    }
}

impl Drop for SyncTasks {
    fn drop(&mut self) {
        self.stop();
    }
}
