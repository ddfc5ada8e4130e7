//! In-memory record store.
//!
//! Owns the candidate list, the audit log, the institute config and the
//! publication flag while the client runs. Every write path that touches a
//! score goes through [`Candidate::set_score`] or intake, so the stored status
//! always matches the score.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::errors::AppError;
use crate::models::{
    Candidate, CandidateStatus, Course, CourseReport, CreateCandidateRequest, InstituteConfig,
    LogEntry, Report, Stats, SyncSnapshot, UpdateCandidateRequest,
};

/// Default size of the recent-activity view.
pub const RECENT_LOG_LIMIT: usize = 10;
/// Default size of the public ranking.
pub const PUBLIC_RANKING_LIMIT: usize = 10;

#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    candidates: Vec<Candidate>,
    logs: Vec<LogEntry>,
    config: InstituteConfig,
    published: bool,
    last_sync: Option<DateTime<Utc>>,
    actor: Option<String>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store holding exactly the contents of `snapshot`.
    pub fn from_snapshot(snapshot: SyncSnapshot) -> Self {
        let mut store = Self::new();
        store.replace_with(snapshot);
        store
    }

    /// User recorded on subsequent log entries. `None` logs as the system.
    pub fn set_actor(&mut self, actor: Option<String>) {
        self.actor = actor;
    }

    pub fn actor(&self) -> Option<&str> {
        self.actor.as_deref()
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn logs(&self) -> &[LogEntry] {
        &self.logs
    }

    pub fn config(&self) -> &InstituteConfig {
        &self.config
    }

    pub fn is_published(&self) -> bool {
        self.published
    }

    pub fn last_sync(&self) -> Option<DateTime<Utc>> {
        self.last_sync
    }

    pub fn get(&self, id: &str) -> Option<&Candidate> {
        self.candidates.iter().find(|c| c.id == id)
    }

    pub fn find_by_key(&self, id_number: &str) -> Option<&Candidate> {
        let key = id_number.trim().to_uppercase();
        self.candidates.iter().find(|c| c.id_number == key)
    }

    /// Append an audit entry attributed to the current actor.
    pub fn add_log(&mut self, action: impl Into<String>) {
        let entry = LogEntry::new(action, self.actor.as_deref());
        self.logs.push(entry);
    }

    /// Validate and append a new candidate.
    ///
    /// Fails with `DuplicateKey` when the natural key is taken; the store is
    /// left untouched on any error.
    pub fn add_candidate(&mut self, request: CreateCandidateRequest) -> Result<Candidate, AppError> {
        let candidate = request.into_candidate(Utc::now())?;
        if self.find_by_key(&candidate.id_number).is_some() {
            return Err(AppError::DuplicateKey(format!(
                "idNumber {} is already registered",
                candidate.id_number
            )));
        }

        self.add_log(format!(
            "Novo candidato: {} ({})",
            candidate.full_name,
            candidate.status()
        ));
        self.candidates.push(candidate.clone());
        Ok(candidate)
    }

    /// Merge changes into the candidate with the given id.
    ///
    /// Returns `Ok(None)` when no such candidate exists.
    pub fn update_candidate(
        &mut self,
        id: &str,
        changes: &UpdateCandidateRequest,
    ) -> Result<Option<Candidate>, AppError> {
        let Some(index) = self.candidates.iter().position(|c| c.id == id) else {
            return Ok(None);
        };

        if let Some(raw) = &changes.id_number {
            let key = raw.trim().to_uppercase();
            if self
                .candidates
                .iter()
                .any(|c| c.id != id && c.id_number == key)
            {
                return Err(AppError::DuplicateKey(format!(
                    "idNumber {} is already registered",
                    key
                )));
            }
        }

        let mut updated = self.candidates[index].clone();
        updated.apply(changes, Utc::now())?;
        self.candidates[index] = updated.clone();

        self.add_log(format!(
            "Atualizado: {} ({})",
            updated.full_name,
            updated.status()
        ));
        Ok(Some(updated))
    }

    /// Remove the candidate with the given id. Absent ids are a no-op.
    pub fn delete_candidate(&mut self, id: &str) -> Option<Candidate> {
        let index = self.candidates.iter().position(|c| c.id == id)?;
        let removed = self.candidates.remove(index);
        self.add_log(format!("Eliminado: {}", removed.full_name));
        Some(removed)
    }

    pub fn set_published(&mut self, published: bool) {
        self.published = published;
        if published {
            self.add_log("Resultados publicados");
        } else {
            self.add_log("Publicação de resultados retirada");
        }
    }

    pub fn stats(&self) -> Stats {
        let approved = self
            .candidates
            .iter()
            .filter(|c| c.status() == CandidateStatus::Approved)
            .count();
        let rejected = self
            .candidates
            .iter()
            .filter(|c| c.status() == CandidateStatus::Rejected)
            .count();
        let by_course = Course::ALL
            .into_iter()
            .map(|course| {
                let count = self.candidates.iter().filter(|c| c.course == course).count();
                (course, count)
            })
            .collect();

        Stats {
            total: self.candidates.len(),
            approved,
            rejected,
            by_course,
        }
    }

    pub fn report(&self) -> Report {
        let mut courses = BTreeMap::new();
        for course in Course::ALL {
            let members: Vec<&Candidate> =
                self.candidates.iter().filter(|c| c.course == course).collect();
            courses.insert(
                course,
                CourseReport {
                    total: members.len(),
                    approved: members.iter().filter(|c| c.is_approved()).count(),
                    rejected: members.iter().filter(|c| !c.is_approved()).count(),
                    average: average(members.iter().map(|c| c.score())),
                },
            );
        }

        Report {
            stats: self.stats(),
            courses,
            average: average(self.candidates.iter().map(|c| c.score())),
        }
    }

    /// Most-recent-first view of the audit log.
    pub fn recent_logs(&self, limit: usize) -> Vec<LogEntry> {
        self.logs.iter().rev().take(limit).cloned().collect()
    }

    /// Ranking shown on the public results page, or `None` while unpublished.
    pub fn public_results(&self, limit: usize) -> Option<Vec<Candidate>> {
        if !self.published {
            return None;
        }
        let mut ranking = self.candidates.clone();
        ranking.sort_by(|a, b| b.score().total_cmp(&a.score()));
        ranking.truncate(limit);
        Some(ranking)
    }

    pub fn snapshot(&self) -> SyncSnapshot {
        SyncSnapshot {
            candidates: self.candidates.clone(),
            logs: self.logs.clone(),
            config: self.config.clone(),
            published: self.published,
            last_sync: self.last_sync,
        }
    }

    /// Overwrite every collection with the snapshot. The actor is kept.
    pub fn replace_with(&mut self, snapshot: SyncSnapshot) {
        self.candidates = snapshot.candidates;
        self.logs = snapshot.logs;
        self.config = snapshot.config;
        self.published = snapshot.published;
        self.last_sync = snapshot.last_sync;
    }

    /// Serialize the candidate list for backup.
    pub fn export_json(&self) -> Result<String, AppError> {
        Ok(serde_json::to_string_pretty(&self.candidates)?)
    }

    /// Append candidates from a JSON backup, skipping natural keys already present.
    ///
    /// Returns how many were added.
    pub fn import_json(&mut self, json: &str) -> Result<usize, AppError> {
        let incoming: Vec<Candidate> = serde_json::from_str(json).map_err(|e| {
            AppError::Validation(format!("Invalid candidate backup: {}", e))
        })?;

        let mut added = 0;
        for candidate in incoming {
            if self.find_by_key(&candidate.id_number).is_none() {
                self.candidates.push(candidate);
                added += 1;
            }
        }
        self.add_log(format!("Importação: {} itens", added));
        Ok(added)
    }
}

fn average(scores: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = scores.fold((0.0, 0usize), |(sum, count), s| (sum + s, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(name: &str, id_number: &str, course: Course, score: f64) -> CreateCandidateRequest {
        CreateCandidateRequest {
            full_name: Some(name.to_string()),
            id_number: Some(id_number.to_string()),
            contact: Some("923111222".to_string()),
            age: Some(18),
            course: Some(course),
            score: Some(score),
            photo: None,
        }
    }

    fn assert_invariant(store: &RecordStore) {
        for c in store.candidates() {
            assert_eq!(c.is_approved(), c.score() >= 10.0, "{}", c.full_name);
        }
    }

    #[test]
    fn test_end_to_end_status_flow() {
        let mut store = RecordStore::new();
        let ana = store
            .add_candidate(request("Ana Silva", "B123", Course::Informatica, 12.0))
            .unwrap();
        assert_eq!(ana.status(), CandidateStatus::Approved);
        assert_eq!(ana.status().as_str(), "Aprovado");

        let other = store
            .add_candidate(request("Bruno Costa", "B124", Course::Informatica, 8.0))
            .unwrap();
        assert_eq!(other.status().as_str(), "Reprovado");

        let changes = UpdateCandidateRequest {
            score: Some(5.0),
            ..Default::default()
        };
        let updated = store.update_candidate(&ana.id, &changes).unwrap().unwrap();
        assert_eq!(updated.status().as_str(), "Reprovado");
        assert_eq!(store.get(&ana.id).unwrap().status(), CandidateStatus::Rejected);
        assert_invariant(&store);
    }

    #[test]
    fn test_status_tracks_score_across_updates() {
        let mut store = RecordStore::new();
        let c = store
            .add_candidate(request("Carla Dias", "C1", Course::Eletrecidade, 9.5))
            .unwrap();
        for score in [10.0, 9.99, 20.0, 0.0, 10.0] {
            let changes = UpdateCandidateRequest {
                score: Some(score),
                ..Default::default()
            };
            store.update_candidate(&c.id, &changes).unwrap();
            assert_invariant(&store);
        }
        // Updates that leave the score alone keep the status consistent too.
        let rename = UpdateCandidateRequest {
            full_name: Some("Carla Dias Neto".to_string()),
            ..Default::default()
        };
        store.update_candidate(&c.id, &rename).unwrap();
        assert_invariant(&store);
    }

    #[test]
    fn test_duplicate_key_leaves_store_unchanged() {
        let mut store = RecordStore::new();
        store
            .add_candidate(request("Ana Silva", "B123", Course::Informatica, 12.0))
            .unwrap();
        let logs_before = store.logs().len();

        let err = store
            .add_candidate(request("Outra Pessoa", "b123", Course::Eletrecidade, 15.0))
            .unwrap_err();
        assert!(matches!(err, AppError::DuplicateKey(_)));
        assert_eq!(store.candidates().len(), 1);
        assert_eq!(store.logs().len(), logs_before);
    }

    #[test]
    fn test_update_to_taken_key_is_rejected() {
        let mut store = RecordStore::new();
        store
            .add_candidate(request("Ana Silva", "B123", Course::Informatica, 12.0))
            .unwrap();
        let bruno = store
            .add_candidate(request("Bruno Costa", "B124", Course::Informatica, 12.0))
            .unwrap();
        let changes = UpdateCandidateRequest {
            id_number: Some("b123".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            store.update_candidate(&bruno.id, &changes),
            Err(AppError::DuplicateKey(_))
        ));
        assert_eq!(store.get(&bruno.id).unwrap().id_number, "B124");
    }

    #[test]
    fn test_update_missing_returns_none() {
        let mut store = RecordStore::new();
        let changes = UpdateCandidateRequest {
            score: Some(15.0),
            ..Default::default()
        };
        assert_eq!(store.update_candidate("missing", &changes).unwrap(), None);
        assert!(store.logs().is_empty());
    }

    #[test]
    fn test_delete_absent_is_noop_without_log() {
        let mut store = RecordStore::new();
        store
            .add_candidate(request("Ana Silva", "B123", Course::Informatica, 12.0))
            .unwrap();
        let before = store.snapshot();

        assert!(store.delete_candidate("missing").is_none());
        assert_eq!(store.snapshot(), before);
        assert!(!store.logs().iter().any(|l| l.action.starts_with("Eliminado")));
    }

    #[test]
    fn test_delete_present_logs() {
        let mut store = RecordStore::new();
        let ana = store
            .add_candidate(request("Ana Silva", "B123", Course::Informatica, 12.0))
            .unwrap();
        assert!(store.delete_candidate(&ana.id).is_some());
        assert!(store.candidates().is_empty());
        assert_eq!(store.recent_logs(1)[0].action, "Eliminado: Ana Silva");
    }

    #[test]
    fn test_stats_on_empty_store() {
        let store = RecordStore::new();
        let stats = store.stats();
        assert_eq!(stats.total, 0);
        assert_eq!(stats.approved, 0);
        assert_eq!(stats.rejected, 0);
        assert_eq!(stats.by_course.len(), Course::ALL.len());
        assert!(stats.by_course.values().all(|&n| n == 0));

        let report = store.report();
        assert_eq!(report.average, 0.0);
        assert!(report.courses.values().all(|c| c.average == 0.0));
    }

    #[test]
    fn test_report_averages_by_course() {
        let mut store = RecordStore::new();
        store
            .add_candidate(request("Ana Silva", "A1", Course::Informatica, 12.0))
            .unwrap();
        store
            .add_candidate(request("Bruno Costa", "A2", Course::Informatica, 8.0))
            .unwrap();
        store
            .add_candidate(request("Carla Dias", "A3", Course::ConstrucaoCivil, 16.0))
            .unwrap();

        let report = store.report();
        let info = &report.courses[&Course::Informatica];
        assert_eq!(info.total, 2);
        assert_eq!(info.approved, 1);
        assert_eq!(info.rejected, 1);
        assert_eq!(info.average, 10.0);
        assert_eq!(report.courses[&Course::Eletrecidade].total, 0);
        assert_eq!(report.average, 12.0);
        assert_eq!(report.stats.by_course[&Course::ConstrucaoCivil], 1);
    }

    #[test]
    fn test_recent_logs_most_recent_first() {
        let mut store = RecordStore::new();
        store.set_actor(Some("Administrador".to_string()));
        for i in 0..12 {
            store.add_log(format!("entry {}", i));
        }
        let recent = store.recent_logs(RECENT_LOG_LIMIT);
        assert_eq!(recent.len(), 10);
        assert_eq!(recent[0].action, "entry 11");
        assert_eq!(recent[0].user, "Administrador");
        assert_eq!(store.logs().len(), 12);
    }

    #[test]
    fn test_public_results_gated_by_publication() {
        let mut store = RecordStore::new();
        store
            .add_candidate(request("Ana Silva", "A1", Course::Informatica, 12.0))
            .unwrap();
        store
            .add_candidate(request("Bruno Costa", "A2", Course::Informatica, 18.5))
            .unwrap();
        assert!(store.public_results(PUBLIC_RANKING_LIMIT).is_none());

        store.set_published(true);
        let ranking = store.public_results(PUBLIC_RANKING_LIMIT).unwrap();
        assert_eq!(ranking[0].full_name, "Bruno Costa");
        assert_eq!(store.public_results(1).unwrap().len(), 1);
    }

    #[test]
    fn test_export_import_round_trip() {
        let mut source = RecordStore::new();
        source
            .add_candidate(request("Ana Silva", "A1", Course::Informatica, 12.0))
            .unwrap();
        source
            .add_candidate(request("Bruno Costa", "A2", Course::Eletrecidade, 7.5))
            .unwrap();
        let json = source.export_json().unwrap();

        let mut target = RecordStore::new();
        assert_eq!(target.import_json(&json).unwrap(), 2);
        for original in source.candidates() {
            let copy = target.find_by_key(&original.id_number).unwrap();
            assert_eq!(copy, original);
        }

        // Importing again adds nothing.
        assert_eq!(target.import_json(&json).unwrap(), 0);
        assert_eq!(target.candidates().len(), 2);
    }

    #[test]
    fn test_imported_keys_stay_unique() {
        let mut store = RecordStore::new();
        let backup = serde_json::json!([{
            "id": "c-1",
            "fullName": "Bruno Costa",
            "idNumber": "b1",
            "age": 19,
            "course": "Informática",
            "score": 11,
            "createdAt": "2025-01-10T09:00:00Z"
        }, {
            "id": "c-2",
            "fullName": "Bruno Costa",
            "idNumber": "B1",
            "age": 19,
            "course": "Informática",
            "score": 11,
            "createdAt": "2025-01-10T09:00:00Z"
        }]);
        assert_eq!(store.import_json(&backup.to_string()).unwrap(), 1);
        assert_eq!(store.candidates()[0].id_number, "B1");

        let err = store
            .add_candidate(request("Bruno Costa", "B1", Course::Informatica, 11.0))
            .unwrap_err();
        assert!(matches!(err, AppError::DuplicateKey(_)));
        assert_eq!(store.candidates().len(), 1);
    }

    #[test]
    fn test_import_rejects_malformed_backup() {
        let mut store = RecordStore::new();
        assert!(matches!(
            store.import_json("{\"not\": \"a list\"}"),
            Err(AppError::Validation(_))
        ));
        assert!(store.logs().is_empty());
    }

    #[test]
    fn test_replace_with_discards_local_state() {
        let mut store = RecordStore::new();
        store.set_actor(Some("Administrador".to_string()));
        store
            .add_candidate(request("Ana Silva", "A1", Course::Informatica, 12.0))
            .unwrap();

        store.replace_with(SyncSnapshot::default_document());
        assert!(store.candidates().is_empty());
        assert!(store.logs().is_empty());
        assert_eq!(store.actor(), Some("Administrador"));
    }
}
