//! Candidate model and the score-to-status rule.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// Lowest passing score.
pub const MIN_SCORE: f64 = 10.0;
/// Highest score the intake form accepts.
pub const MAX_SCORE: f64 = 20.0;
/// Minimum candidate age at intake.
pub const MIN_AGE: u32 = 15;
/// Minimum full-name length at intake, in characters.
pub const MIN_NAME_LENGTH: usize = 5;
/// Maximum embedded photo payload, in bytes.
pub const MAX_PHOTO_SIZE: usize = 2 * 1024 * 1024;

/// Exam outcome. Always derived from the score.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CandidateStatus {
    #[serde(rename = "Aprovado")]
    Approved,
    #[serde(rename = "Reprovado")]
    Rejected,
}

impl CandidateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CandidateStatus::Approved => "Aprovado",
            CandidateStatus::Rejected => "Reprovado",
        }
    }
}

impl std::fmt::Display for CandidateStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pass/fail rule: a score at or above [`MIN_SCORE`] passes.
pub fn derive_status(score: f64) -> CandidateStatus {
    if score >= MIN_SCORE {
        CandidateStatus::Approved
    } else {
        CandidateStatus::Rejected
    }
}

/// Courses offered for the entrance exam.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Course {
    #[serde(rename = "Informática")]
    Informatica,
    #[serde(rename = "Eletrecidade")]
    Eletrecidade,
    #[serde(rename = "Construção Civil")]
    ConstrucaoCivil,
    #[serde(
        rename = "Eletrotécnica e telecomunicações",
        alias = "Eletrotécnica  e telecomunicações"
    )]
    Eletrotecnica,
}

impl Course {
    pub const ALL: [Course; 4] = [
        Course::Informatica,
        Course::Eletrecidade,
        Course::ConstrucaoCivil,
        Course::Eletrotecnica,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Course::Informatica => "Informática",
            Course::Eletrecidade => "Eletrecidade",
            Course::ConstrucaoCivil => "Construção Civil",
            Course::Eletrotecnica => "Eletrotécnica e telecomunicações",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let normalized = s.split_whitespace().collect::<Vec<_>>().join(" ");
        Course::ALL
            .into_iter()
            .find(|course| course.as_str() == normalized)
    }
}

impl std::fmt::Display for Course {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One exam applicant.
///
/// `score` and `status` are private so the status can only move together with
/// the score. Deserialization goes through [`CandidateRecord`], which discards
/// any incoming status and recomputes it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", from = "CandidateRecord")]
pub struct Candidate {
    pub id: String,
    pub full_name: String,
    pub id_number: String,
    pub contact: String,
    pub age: u32,
    pub course: Course,
    score: f64,
    status: CandidateStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Wire shape of a candidate as read from JSON. Status is ignored on purpose.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateRecord {
    pub id: String,
    pub full_name: String,
    pub id_number: String,
    #[serde(default)]
    pub contact: String,
    pub age: u32,
    pub course: Course,
    pub score: f64,
    #[serde(default)]
    pub photo: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<CandidateRecord> for Candidate {
    fn from(record: CandidateRecord) -> Self {
        Self {
            id: record.id,
            full_name: record.full_name,
            id_number: record.id_number.trim().to_uppercase(),
            contact: record.contact,
            age: record.age,
            course: record.course,
            score: record.score,
            status: derive_status(record.score),
            photo: record.photo.filter(|p| !p.is_empty()),
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

impl Candidate {
    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn status(&self) -> CandidateStatus {
        self.status
    }

    pub fn is_approved(&self) -> bool {
        self.status == CandidateStatus::Approved
    }

    /// Change the score and recompute the status in the same step.
    pub fn set_score(&mut self, score: f64) {
        self.score = score;
        self.status = derive_status(score);
    }

    /// Merge validated changes into this record and stamp `updated_at`.
    ///
    /// All supplied fields are validated before anything is written, so a
    /// rejected change leaves the record untouched.
    pub fn apply(&mut self, changes: &UpdateCandidateRequest, now: DateTime<Utc>) -> Result<(), AppError> {
        let full_name = changes.full_name.as_deref().map(normalize_name).transpose()?;
        let id_number = changes.id_number.as_deref().map(normalize_id_number).transpose()?;
        if let Some(age) = changes.age {
            check_age(age)?;
        }
        if let Some(score) = changes.score {
            check_score(score)?;
        }
        if let Some(photo) = &changes.photo {
            check_photo(photo)?;
        }

        if let Some(full_name) = full_name {
            self.full_name = full_name;
        }
        if let Some(id_number) = id_number {
            self.id_number = id_number;
        }
        if let Some(contact) = &changes.contact {
            self.contact = contact.trim().to_string();
        }
        if let Some(age) = changes.age {
            self.age = age;
        }
        if let Some(course) = changes.course {
            self.course = course;
        }
        if let Some(photo) = &changes.photo {
            self.photo = if photo.is_empty() { None } else { Some(photo.clone()) };
        }
        // Recompute even when the score is unchanged.
        self.set_score(changes.score.unwrap_or(self.score));
        self.updated_at = Some(now);
        Ok(())
    }
}

/// Intake data for a new candidate.
///
/// Every field is optional on the wire so that missing fields surface as a
/// validation error instead of a deserialization failure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCandidateRequest {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub id_number: Option<String>,
    #[serde(default)]
    pub contact: Option<String>,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub course: Option<Course>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub photo: Option<String>,
}

impl CreateCandidateRequest {
    /// Validate the intake data and build a fresh record with a new id.
    pub fn into_candidate(self, now: DateTime<Utc>) -> Result<Candidate, AppError> {
        let full_name = normalize_name(required(self.full_name.as_deref(), "fullName")?)?;
        let id_number = normalize_id_number(required(self.id_number.as_deref(), "idNumber")?)?;
        let age = self
            .age
            .ok_or_else(|| AppError::Validation("Missing required field: age".to_string()))?;
        check_age(age)?;
        let course = self
            .course
            .ok_or_else(|| AppError::Validation("Missing required field: course".to_string()))?;
        let score = self
            .score
            .ok_or_else(|| AppError::Validation("Missing required field: score".to_string()))?;
        check_score(score)?;
        let photo = match self.photo {
            Some(photo) if !photo.is_empty() => {
                check_photo(&photo)?;
                Some(photo)
            }
            _ => None,
        };

        Ok(Candidate {
            id: uuid::Uuid::new_v4().to_string(),
            full_name,
            id_number,
            contact: self.contact.unwrap_or_default().trim().to_string(),
            age,
            course,
            score,
            status: derive_status(score),
            photo,
            created_at: now,
            updated_at: None,
        })
    }
}

/// Partial update of a candidate. Absent fields keep their current value.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCandidateRequest {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub id_number: Option<String>,
    #[serde(default)]
    pub contact: Option<String>,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub course: Option<Course>,
    #[serde(default)]
    pub score: Option<f64>,
    /// Empty string removes the photo.
    #[serde(default)]
    pub photo: Option<String>,
}

/// Canonical form of a natural key.
pub fn normalize_id_number(raw: &str) -> Result<String, AppError> {
    let key = raw.trim().to_uppercase();
    if key.is_empty() {
        return Err(AppError::Validation("idNumber must not be empty".to_string()));
    }
    Ok(key)
}

fn normalize_name(raw: &str) -> Result<String, AppError> {
    let name = raw.trim();
    if name.chars().count() < MIN_NAME_LENGTH {
        return Err(AppError::Validation(format!(
            "fullName must have at least {} characters",
            MIN_NAME_LENGTH
        )));
    }
    Ok(name.to_string())
}

fn required<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str, AppError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(AppError::Validation(format!("Missing required field: {}", field))),
    }
}

fn check_age(age: u32) -> Result<(), AppError> {
    if age < MIN_AGE {
        return Err(AppError::Validation(format!("Minimum age is {}", MIN_AGE)));
    }
    Ok(())
}

fn check_score(score: f64) -> Result<(), AppError> {
    if !score.is_finite() {
        return Err(AppError::Validation("score must be a finite number".to_string()));
    }
    Ok(())
}

fn check_photo(photo: &str) -> Result<(), AppError> {
    if photo.len() > MAX_PHOTO_SIZE {
        return Err(AppError::Validation(format!(
            "photo exceeds {} bytes",
            MAX_PHOTO_SIZE
        )));
    }
    Ok(())
}
