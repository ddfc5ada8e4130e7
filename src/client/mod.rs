//! Admin application handle.
//!
//! Owns the record store, local cache, session guard and sync coordinator of
//! one client, and runs every mutation through the save protocol. UI glue
//! holds an `AdminClient` instead of reaching for shared globals.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};

use crate::cache::{FileStorage, LocalCache};
use crate::config::ClientConfig;
use crate::errors::AppError;
use crate::models::{
    Candidate, CreateCandidateRequest, LogEntry, Report, Stats, UpdateCandidateRequest,
};
use crate::session::{Session, SessionGuard};
use crate::store::{RecordStore, PUBLIC_RANKING_LIMIT, RECENT_LOG_LIMIT};
use crate::sync::{SharedStore, SyncClient, SyncCoordinator, SyncTasks};

pub struct AdminClient {
    store: SharedStore,
    cache: LocalCache,
    session: SessionGuard,
    sync: SyncCoordinator,
    sync_interval: Duration,
    tasks: Mutex<Option<SyncTasks>>,
}

impl AdminClient {
    /// Client with a file-backed cache, configured from `config`.
    pub fn from_config(config: &ClientConfig) -> Result<Self, AppError> {
        let storage = FileStorage::open(&config.cache_dir)?;
        let cache = LocalCache::new(Arc::new(storage));
        Ok(Self::new(
            SyncClient::new(config.server_url.clone()),
            cache,
            config.sync_interval,
            config.idle_timeout,
        ))
    }

    pub fn new(
        client: SyncClient,
        cache: LocalCache,
        sync_interval: Duration,
        idle_timeout: Duration,
    ) -> Self {
        let store: SharedStore = Arc::new(RwLock::new(RecordStore::new()));
        let idle_timeout = chrono::Duration::from_std(idle_timeout)
            .unwrap_or_else(|_| chrono::Duration::seconds(crate::session::IDLE_TIMEOUT_SECS));
        Self {
            session: SessionGuard::new(cache.clone(), idle_timeout),
            sync: SyncCoordinator::new(client, cache.clone(), Arc::clone(&store)),
            store,
            cache,
            sync_interval,
            tasks: Mutex::new(None),
        }
    }

    pub fn store(&self) -> SharedStore {
        Arc::clone(&self.store)
    }

    pub fn cache(&self) -> &LocalCache {
        &self.cache
    }

    pub fn session(&self) -> &SessionGuard {
        &self.session
    }

    pub fn sync(&self) -> &SyncCoordinator {
        &self.sync
    }

    /// Load cached data, pull the server document and restore a live session
    /// if one is stored.
    ///
    /// An unreachable server is not an error: the cached data stays in use and
    /// local changes are kept off the server until a pull succeeds.
    pub async fn init(&self) -> Result<Option<Session>, AppError> {
        self.cache.init()?;
        self.store.write().await.replace_with(self.cache.snapshot());
        // Failure is logged inside.
        let _ = self.sync.sync_from_server().await;

        let Some(session) = self.session.current() else {
            return Ok(None);
        };
        tracing::info!("Session restored for {}", session.user);
        self.store.write().await.set_actor(Some(session.user.clone()));
        self.start_sync().await;
        Ok(Some(session))
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<Session, AppError> {
        let session = self.session.login(username, password)?;
        self.catch_up().await;
        let user = session.user.clone();
        self.sync
            .commit(move |store| {
                store.set_actor(Some(user));
                store.add_log("Login efetuado no sistema");
                Ok(())
            })
            .await?;
        self.start_sync().await;
        Ok(session)
    }

    pub async fn logout(&self) -> Result<(), AppError> {
        self.stop_sync().await;
        self.sync
            .commit(|store| {
                store.add_log("Logout efetuado");
                Ok(())
            })
            .await?;
        self.session.logout()?;
        self.store.write().await.set_actor(None);
        Ok(())
    }

    /// Record user activity. Returns false when the session is gone.
    pub async fn record_activity(&self) -> bool {
        if self.session.touch() {
            return true;
        }
        self.end_expired_session().await;
        false
    }

    pub async fn add_candidate(&self, request: CreateCandidateRequest) -> Result<Candidate, AppError> {
        self.require_session().await?;
        self.sync.commit(move |store| store.add_candidate(request)).await
    }

    /// Update by opaque id. `Ok(None)` when the id is unknown.
    pub async fn update_candidate(
        &self,
        id: &str,
        changes: UpdateCandidateRequest,
    ) -> Result<Option<Candidate>, AppError> {
        self.require_session().await?;
        self.sync
            .commit(|store| store.update_candidate(id, &changes))
            .await
    }

    /// Delete by opaque id. Absent ids change nothing.
    pub async fn delete_candidate(&self, id: &str) -> Result<Option<Candidate>, AppError> {
        self.require_session().await?;
        self.sync
            .commit(|store| Ok(store.delete_candidate(id)))
            .await
    }

    pub async fn set_published(&self, published: bool) -> Result<(), AppError> {
        self.require_session().await?;
        self.sync
            .commit(|store| {
                store.set_published(published);
                Ok(())
            })
            .await
    }

    /// Merge a JSON candidate backup. Returns the number of candidates added.
    pub async fn import_candidates(&self, json: &str) -> Result<usize, AppError> {
        self.require_session().await?;
        self.sync.commit(|store| store.import_json(json)).await
    }

    pub async fn export_candidates(&self) -> Result<String, AppError> {
        self.store.read().await.export_json()
    }

    pub async fn candidates(&self) -> Vec<Candidate> {
        self.store.read().await.candidates().to_vec()
    }

    pub async fn stats(&self) -> Stats {
        self.store.read().await.stats()
    }

    pub async fn report(&self) -> Report {
        self.store.read().await.report()
    }

    pub async fn recent_logs(&self) -> Vec<LogEntry> {
        self.store.read().await.recent_logs(RECENT_LOG_LIMIT)
    }

    /// Public results page: `None` while results are unpublished.
    ///
    /// Pulls first so anonymous viewers see the latest publication; offline
    /// the cached state is shown.
    pub async fn public_results(&self) -> Option<Vec<Candidate>> {
        let _ = self.sync.sync_from_server().await;
        self.store.read().await.public_results(PUBLIC_RANKING_LIMIT)
    }

    async fn require_session(&self) -> Result<Session, AppError> {
        match self.session.current() {
            Some(session) => Ok(session),
            None => {
                self.end_expired_session().await;
                Err(AppError::Unauthorized("Login required".to_string()))
            }
        }
    }

    async fn end_expired_session(&self) {
        self.stop_sync().await;
        self.store.write().await.set_actor(None);
    }

    /// Retry the initial pull when `init` ran offline.
    async fn catch_up(&self) {
        if !self.sync.has_synced() {
            let _ = self.sync.sync_from_server().await;
        }
    }

    async fn start_sync(&self) {
        let mut tasks = self.tasks.lock().await;
        if tasks.is_none() {
            *tasks = Some(SyncTasks::start(&self.sync, self.sync_interval));
        }
    }

    async fn stop_sync(&self) {
        if let Some(mut tasks) = self.tasks.lock().await.take() {
            tasks.stop();
        }
    }
}
