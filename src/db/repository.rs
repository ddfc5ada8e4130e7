//! Repository over the single JSON data document.
//!
//! Every operation loads the full document, reads or mutates it, and on
//! mutation writes the full document back with a fresh `lastSync`. All of that
//! runs inside one async mutex, and writes go to a temp file renamed into
//! place, so concurrent requests cannot interleave a read-modify-write cycle.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::errors::AppError;
use crate::models::{
    normalize_id_number, AppendLogRequest, Candidate, CreateCandidateRequest, LogEntry,
    ServerStatus, SyncSnapshot, UpdateCandidateRequest,
};

pub struct Repository {
    path: PathBuf,
    lock: Mutex<()>,
}

impl Repository {
    /// Open the document, writing the default one if the file does not exist.
    pub async fn open(path: &Path) -> Result<Self, AppError> {
        let repo = Self {
            path: path.to_path_buf(),
            lock: Mutex::new(()),
        };
        if !tokio::fs::try_exists(path).await? {
            tracing::info!("Creating data document at {:?}", path);
            repo.write(&SyncSnapshot::default_document()).await?;
        }
        Ok(repo)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> Result<SyncSnapshot, AppError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(SyncSnapshot::default_document())
            }
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&raw).map_err(|e| {
            tracing::error!("Data document {:?} is unreadable: {}", self.path, e);
            AppError::Persistence(format!("Data document is unreadable: {}", e))
        })
    }

    async fn write(&self, document: &SyncSnapshot) -> Result<(), AppError> {
        let path = self.path.clone();
        let contents = serde_json::to_vec_pretty(document)
            .map_err(|e| AppError::Internal(format!("Failed to render document: {}", e)))?;

        tokio::task::spawn_blocking(move || atomic_write(&path, &contents))
            .await
            .map_err(|e| AppError::Internal(format!("Write task failed: {}", e)))?
    }

    /// Stamp `lastSync` and write the document back.
    async fn commit(&self, document: &mut SyncSnapshot) -> Result<DateTime<Utc>, AppError> {
        let now = Utc::now();
        document.last_sync = Some(now);
        self.write(document).await?;
        Ok(now)
    }

    // ==================== DOCUMENT OPERATIONS ====================

    /// Get the full document.
    pub async fn get_document(&self) -> Result<SyncSnapshot, AppError> {
        let _guard = self.lock.lock().await;
        self.read().await
    }

    /// Replace the full document. The last writer wins.
    pub async fn replace_document(&self, mut document: SyncSnapshot) -> Result<DateTime<Utc>, AppError> {
        let _guard = self.lock.lock().await;
        let last_sync = self.commit(&mut document).await?;
        tracing::info!(
            "Document replaced: {} candidates, {} logs",
            document.candidates.len(),
            document.logs.len()
        );
        Ok(last_sync)
    }

    /// Wipe to the default document.
    pub async fn reset(&self) -> Result<(), AppError> {
        let _guard = self.lock.lock().await;
        let mut document = SyncSnapshot::default_document();
        self.commit(&mut document).await?;
        tracing::warn!("Data document reset to defaults");
        Ok(())
    }

    pub async fn status(&self) -> Result<ServerStatus, AppError> {
        let document = self.get_document().await?;
        Ok(ServerStatus {
            status: "online".to_string(),
            candidates: document.candidates.len(),
            logs: document.logs.len(),
            last_sync: document.last_sync,
        })
    }

    // ==================== CANDIDATE OPERATIONS ====================

    /// List all candidates.
    pub async fn list_candidates(&self) -> Result<Vec<Candidate>, AppError> {
        Ok(self.get_document().await?.candidates)
    }

    /// Get a candidate by natural key.
    pub async fn get_candidate(&self, id_number: &str) -> Result<Option<Candidate>, AppError> {
        let key = normalize_id_number(id_number)?;
        let document = self.get_document().await?;
        Ok(document.candidates.into_iter().find(|c| c.id_number == key))
    }

    /// Create a new candidate.
    pub async fn create_candidate(&self, request: CreateCandidateRequest) -> Result<Candidate, AppError> {
        let candidate = request.into_candidate(Utc::now())?;

        let _guard = self.lock.lock().await;
        let mut document = self.read().await?;
        if document
            .candidates
            .iter()
            .any(|c| c.id_number == candidate.id_number)
        {
            return Err(AppError::DuplicateKey(format!(
                "idNumber {} is already registered",
                candidate.id_number
            )));
        }

        document.candidates.push(candidate.clone());
        self.commit(&mut document).await?;
        Ok(candidate)
    }

    /// Update a candidate by natural key. The key and `createdAt` never change.
    pub async fn update_candidate(
        &self,
        id_number: &str,
        request: UpdateCandidateRequest,
    ) -> Result<Candidate, AppError> {
        let key = normalize_id_number(id_number)?;
        let changes = UpdateCandidateRequest {
            id_number: None,
            ..request
        };

        let _guard = self.lock.lock().await;
        let mut document = self.read().await?;
        let candidate = document
            .candidates
            .iter_mut()
            .find(|c| c.id_number == key)
            .ok_or_else(|| AppError::NotFound(format!("Candidate {} not found", key)))?;

        candidate.apply(&changes, Utc::now())?;
        let updated = candidate.clone();

        self.commit(&mut document).await?;
        Ok(updated)
    }

    /// Delete a candidate by natural key.
    pub async fn delete_candidate(&self, id_number: &str) -> Result<Candidate, AppError> {
        let key = normalize_id_number(id_number)?;

        let _guard = self.lock.lock().await;
        let mut document = self.read().await?;
        let index = document
            .candidates
            .iter()
            .position(|c| c.id_number == key)
            .ok_or_else(|| AppError::NotFound(format!("Candidate {} not found", key)))?;

        let removed = document.candidates.remove(index);
        self.commit(&mut document).await?;
        Ok(removed)
    }

    // ==================== LOG OPERATIONS ====================

    /// List all log entries in insertion order.
    pub async fn list_logs(&self) -> Result<Vec<LogEntry>, AppError> {
        Ok(self.get_document().await?.logs)
    }

    /// Append a log entry stamped with the server time.
    pub async fn append_log(&self, request: AppendLogRequest) -> Result<LogEntry, AppError> {
        if request.action.trim().is_empty() {
            return Err(AppError::Validation("action is required".to_string()));
        }
        let entry = LogEntry::new(request.action.trim(), request.user.as_deref());

        let _guard = self.lock.lock().await;
        let mut document = self.read().await?;
        document.logs.push(entry.clone());
        self.commit(&mut document).await?;
        Ok(entry)
    }
}

/// Write to a temp file beside `path`, then rename it over `path`.
fn atomic_write(path: &Path, contents: &[u8]) -> Result<(), AppError> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut temp = tempfile::NamedTempFile::new_in(dir)?;
    temp.write_all(contents)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| {
        tracing::error!("Failed to persist {:?}: {}", path, e);
        AppError::Persistence(format!("Failed to persist data document: {}", e))
    })?;
    Ok(())
}
