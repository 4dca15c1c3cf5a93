//! Submission pipeline: Persist (must succeed), then Notify (best effort,
//! bounded by a deadline).
//!
//! Finalize (clearing the draft, entering `done`) belongs to the controller,
//! which only runs it after `submit` returns `Ok`.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{error, info, warn};

use intake_core::SubmissionId;

use crate::deadline::{DeadlineOutcome, DeadlineTask};
use crate::submission::{
    BackendError, NotificationRequest, Notifier, SubmissionBackend, SubmissionRecord,
};

/// How long Notify may take before the submission is reported anyway.
pub const DEFAULT_NOTIFY_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationOutcome {
    Delivered,
    Failed(String),
    TimedOut,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionReceipt {
    pub submission_id: SubmissionId,
    pub record: SubmissionRecord,
    pub notification: NotificationOutcome,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SubmissionError {
    #[error("could not assemble submission: {0}")]
    Assemble(String),

    #[error("failed to persist submission: {0}")]
    Persist(BackendError),
}

impl SubmissionError {
    /// Message safe to show to the applicant.
    pub fn user_message(&self) -> &'static str {
        match self {
            SubmissionError::Assemble(_) => {
                "Some of your answers could not be prepared for submission. Please review them and try again."
            }
            SubmissionError::Persist(_) => {
                "There was an error submitting your form. Please try again."
            }
        }
    }
}

#[derive(Clone)]
pub struct SubmissionPipeline {
    backend: Arc<dyn SubmissionBackend>,
    notifier: Arc<dyn Notifier>,
    notify_timeout: Duration,
}

impl SubmissionPipeline {
    pub fn new(backend: Arc<dyn SubmissionBackend>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            backend,
            notifier,
            notify_timeout: DEFAULT_NOTIFY_TIMEOUT,
        }
    }

    pub fn with_notify_timeout(mut self, timeout: Duration) -> Self {
        self.notify_timeout = timeout;
        self
    }

    pub fn notify_timeout(&self) -> Duration {
        self.notify_timeout
    }

    pub fn backend(&self) -> &Arc<dyn SubmissionBackend> {
        &self.backend
    }

    /// Persist `record`, then notify.
    ///
    /// With `existing`, the row (a remote draft) is updated in place; a row
    /// that has since disappeared is re-inserted. Persist has no client-side
    /// timeout.
    pub async fn submit(
        &self,
        record: SubmissionRecord,
        existing: Option<SubmissionId>,
    ) -> Result<SubmissionReceipt, SubmissionError> {
        let form_type = record.form_type.clone();
        info!(form_type = %form_type, "persisting submission");

        let submission_id = match self.upsert(&record, existing).await {
            Ok(id) => id,
            Err(err) => {
                error!(form_type = %form_type, error = %err, "submission persist failed");
                return Err(SubmissionError::Persist(err));
            }
        };
        info!(form_type = %form_type, %submission_id, "submission persisted");

        let notification = self.notify(&record).await;
        match &notification {
            NotificationOutcome::Delivered => {
                info!(%submission_id, "advisor notification delivered");
            }
            NotificationOutcome::Failed(reason) => {
                warn!(%submission_id, reason = %reason, "advisor notification failed");
            }
            NotificationOutcome::TimedOut => {
                warn!(
                    %submission_id,
                    timeout_secs = self.notify_timeout.as_secs(),
                    "advisor notification timed out"
                );
            }
        }

        Ok(SubmissionReceipt {
            submission_id,
            record,
            notification,
        })
    }

    /// Write a `draft` row, bounded by the notify timeout.
    pub async fn save_draft(
        &self,
        record: &SubmissionRecord,
        existing: Option<SubmissionId>,
    ) -> Result<SubmissionId, BackendError> {
        match tokio::time::timeout(self.notify_timeout, self.upsert(record, existing)).await {
            Ok(result) => result,
            Err(_) => Err(BackendError::Timeout(self.notify_timeout)),
        }
    }

    async fn upsert(
        &self,
        record: &SubmissionRecord,
        existing: Option<SubmissionId>,
    ) -> Result<SubmissionId, BackendError> {
        let Some(id) = existing else {
            return self.backend.insert(record).await;
        };

        match self.backend.update(id, record).await {
            Ok(()) => Ok(id),
            Err(BackendError::NotFound(_)) => {
                warn!(%id, "remote draft row missing; inserting a new one");
                self.backend.insert(record).await
            }
            Err(err) => Err(err),
        }
    }

    async fn notify(&self, record: &SubmissionRecord) -> NotificationOutcome {
        let request = NotificationRequest::from_record(record);
        let notifier = self.notifier.clone();
        let task = DeadlineTask::spawn("advisor-notification", self.notify_timeout, async move {
            notifier.notify(&request).await
        });

        match task.wait().await {
            DeadlineOutcome::Completed(Ok(())) => NotificationOutcome::Delivered,
            DeadlineOutcome::Completed(Err(err)) => NotificationOutcome::Failed(err.to_string()),
            DeadlineOutcome::TimedOut(_) => NotificationOutcome::TimedOut,
            DeadlineOutcome::Aborted(reason) => NotificationOutcome::Failed(reason),
        }
    }
}

impl std::fmt::Debug for SubmissionPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubmissionPipeline")
            .field("notify_timeout", &self.notify_timeout)
            .finish_non_exhaustive()
    }
}
