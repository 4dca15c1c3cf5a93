//! Submission records and the two external ports the pipeline talks to:
//! the persistence backend and the notification service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use intake_core::{AdvisorId, DomainError, DomainResult, SubmissionId};

use crate::definition::ApplicantSummary;
use crate::step::StepNumber;

/// Backend row status. The engine writes `Draft` and `Submitted`; the rest
/// are set by back-office tooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Draft,
    Submitted,
    UnderReview,
    Approved,
    Declined,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Draft => "draft",
            SubmissionStatus::Submitted => "submitted",
            SubmissionStatus::UnderReview => "under_review",
            SubmissionStatus::Approved => "approved",
            SubmissionStatus::Declined => "declined",
        }
    }
}

impl core::str::FromStr for SubmissionStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(SubmissionStatus::Draft),
            "submitted" => Ok(SubmissionStatus::Submitted),
            "under_review" => Ok(SubmissionStatus::UnderReview),
            "approved" => Ok(SubmissionStatus::Approved),
            "declined" => Ok(SubmissionStatus::Declined),
            other => Err(DomainError::validation(format!("unknown submission status '{other}'"))),
        }
    }
}

/// Advisor a wizard session was opened for (from the advisor's profile link).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvisorRef {
    pub id: AdvisorId,
    pub name: String,
    pub email: String,
}

/// Provenance attached to every record written by a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionContext {
    advisor: Option<AdvisorRef>,
    source_url: String,
}

impl SubmissionContext {
    /// `source_url` must be an absolute URL (the page the wizard ran on).
    pub fn new(source_url: &str) -> DomainResult<Self> {
        let url = url::Url::parse(source_url.trim())
            .map_err(|e| DomainError::validation(format!("invalid source url: {e}")))?;
        Ok(Self {
            advisor: None,
            source_url: url.to_string(),
        })
    }

    pub fn with_advisor(mut self, advisor: AdvisorRef) -> Self {
        self.advisor = Some(advisor);
        self
    }

    pub fn advisor(&self) -> Option<&AdvisorRef> {
        self.advisor.as_ref()
    }

    pub fn source_url(&self) -> &str {
        &self.source_url
    }
}

/// Record handed to the persistence backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub form_type: String,
    pub status: SubmissionStatus,
    pub advisor_id: Option<AdvisorId>,
    pub advisor_name: Option<String>,
    pub advisor_email: Option<String>,
    pub applicant_name: Option<String>,
    pub applicant_email: Option<String>,
    pub applicant_phone: Option<String>,
    /// Every step payload, keyed `"step1".."stepN"`.
    pub form_data: serde_json::Value,
    pub current_step: StepNumber,
    pub source_url: String,
    /// Set for `submitted` records, `None` for drafts.
    pub submitted_at: Option<DateTime<Utc>>,
}

impl SubmissionRecord {
    pub fn assemble(
        form_type: &str,
        status: SubmissionStatus,
        applicant: ApplicantSummary,
        form_data: serde_json::Value,
        current_step: StepNumber,
        context: &SubmissionContext,
        now: DateTime<Utc>,
    ) -> Self {
        let advisor = context.advisor();
        Self {
            form_type: form_type.to_string(),
            status,
            advisor_id: advisor.map(|a| a.id),
            advisor_name: advisor.map(|a| a.name.clone()),
            advisor_email: advisor.map(|a| a.email.clone()),
            applicant_name: applicant.name,
            applicant_email: applicant.email,
            applicant_phone: applicant.phone,
            form_data,
            current_step,
            source_url: context.source_url().to_string(),
            submitted_at: (status == SubmissionStatus::Submitted).then_some(now),
        }
    }
}

/// A record as stored by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredSubmission {
    pub id: SubmissionId,
    pub record: SubmissionRecord,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    #[error("constraint violation: {0}")]
    Constraint(String),
    #[error("backend unreachable: {0}")]
    Connection(String),
    #[error("submission not found: {0}")]
    NotFound(SubmissionId),
    #[error("backend timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("storage error: {0}")]
    Storage(String),
}

/// Hosted database holding draft and submitted records.
#[async_trait::async_trait]
pub trait SubmissionBackend: Send + Sync {
    /// Insert a new row and return its id.
    async fn insert(&self, record: &SubmissionRecord) -> Result<SubmissionId, BackendError>;

    /// Overwrite an existing row (draft → newer draft, draft → submitted).
    async fn update(&self, id: SubmissionId, record: &SubmissionRecord) -> Result<(), BackendError>;

    async fn fetch(&self, id: SubmissionId) -> Result<Option<StoredSubmission>, BackendError>;
}

/// Payload for the advisor notification email.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRequest {
    pub form_type: String,
    pub applicant_name: Option<String>,
    pub applicant_email: Option<String>,
    pub applicant_phone: Option<String>,
    pub form_data: serde_json::Value,
    pub advisor_id: Option<AdvisorId>,
    pub advisor_name: Option<String>,
    pub advisor_email: Option<String>,
    pub source_url: String,
}

impl NotificationRequest {
    pub fn from_record(record: &SubmissionRecord) -> Self {
        Self {
            form_type: record.form_type.clone(),
            applicant_name: record.applicant_name.clone(),
            applicant_email: record.applicant_email.clone(),
            applicant_phone: record.applicant_phone.clone(),
            form_data: record.form_data.clone(),
            advisor_id: record.advisor_id,
            advisor_name: record.advisor_name.clone(),
            advisor_email: record.advisor_email.clone(),
            source_url: record.source_url.clone(),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NotifyError {
    #[error("notification transport failed: {0}")]
    Transport(String),
    #[error("notification rejected ({status}): {body}")]
    Rejected { status: u16, body: String },
}

/// Outbound notification service (advisor email).
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, request: &NotificationRequest) -> Result<(), NotifyError>;
}
