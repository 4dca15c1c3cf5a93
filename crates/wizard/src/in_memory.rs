//! In-memory adapters for the engine's ports.
//!
//! Intended for tests/dev and for the runner's `--dry-run` mode. Not optimized
//! for performance.

use std::collections::HashMap;
use std::sync::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;

use intake_core::SubmissionId;

use crate::draft::{DraftStorage, DraftStoreError};
use crate::submission::{
    BackendError, NotificationRequest, Notifier, NotifyError, StoredSubmission, SubmissionBackend,
    SubmissionRecord,
};

/// Key/value draft storage held in a map.
#[derive(Debug, Default)]
pub struct InMemoryDraftStorage {
    values: RwLock<HashMap<String, String>>,
}

impl InMemoryDraftStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DraftStorage for InMemoryDraftStorage {
    fn read(&self, key: &str) -> Result<Option<String>, DraftStoreError> {
        let values = self
            .values
            .read()
            .map_err(|_| DraftStoreError::Unavailable("lock poisoned".to_string()))?;
        Ok(values.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), DraftStoreError> {
        let mut values = self
            .values
            .write()
            .map_err(|_| DraftStoreError::Unavailable("lock poisoned".to_string()))?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), DraftStoreError> {
        let mut values = self
            .values
            .write()
            .map_err(|_| DraftStoreError::Unavailable("lock poisoned".to_string()))?;
        values.remove(key);
        Ok(())
    }
}

/// Submission backend held in a map, with a switch to simulate an outage.
#[derive(Debug, Default)]
pub struct InMemorySubmissionBackend {
    rows: RwLock<HashMap<SubmissionId, StoredSubmission>>,
    unavailable: AtomicBool,
}

impl InMemorySubmissionBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, every call fails with `BackendError::Connection`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// All stored rows, oldest first.
    pub fn records(&self) -> Vec<StoredSubmission> {
        let Ok(rows) = self.rows.read() else {
            return vec![];
        };
        let mut out: Vec<_> = rows.values().cloned().collect();
        out.sort_by_key(|r| (r.created_at, r.id));
        out
    }

    pub fn len(&self) -> usize {
        self.rows.read().map(|rows| rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_available(&self) -> Result<(), BackendError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(BackendError::Connection("backend marked unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl SubmissionBackend for InMemorySubmissionBackend {
    async fn insert(&self, record: &SubmissionRecord) -> Result<SubmissionId, BackendError> {
        self.check_available()?;

        let mut rows = self
            .rows
            .write()
            .map_err(|_| BackendError::Storage("lock poisoned".to_string()))?;

        let id = SubmissionId::new();
        let now = Utc::now();
        rows.insert(
            id,
            StoredSubmission {
                id,
                record: record.clone(),
                created_at: now,
                updated_at: now,
            },
        );
        Ok(id)
    }

    async fn update(&self, id: SubmissionId, record: &SubmissionRecord) -> Result<(), BackendError> {
        self.check_available()?;

        let mut rows = self
            .rows
            .write()
            .map_err(|_| BackendError::Storage("lock poisoned".to_string()))?;

        let row = rows.get_mut(&id).ok_or(BackendError::NotFound(id))?;
        row.record = record.clone();
        row.updated_at = Utc::now();
        Ok(())
    }

    async fn fetch(&self, id: SubmissionId) -> Result<Option<StoredSubmission>, BackendError> {
        self.check_available()?;

        let rows = self
            .rows
            .read()
            .map_err(|_| BackendError::Storage("lock poisoned".to_string()))?;
        Ok(rows.get(&id).cloned())
    }
}

/// How a `RecordingNotifier` answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifierMode {
    Deliver,
    Fail(String),
    /// Never resolves.
    Hang,
}

/// Notifier that records every request it receives.
#[derive(Debug)]
pub struct RecordingNotifier {
    mode: Mutex<NotifierMode>,
    requests: Mutex<Vec<NotificationRequest>>,
}

impl RecordingNotifier {
    pub fn new(mode: NotifierMode) -> Self {
        Self {
            mode: Mutex::new(mode),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn set_mode(&self, mode: NotifierMode) {
        if let Ok(mut current) = self.mode.lock() {
            *current = mode;
        }
    }

    pub fn requests(&self) -> Vec<NotificationRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl Default for RecordingNotifier {
    fn default() -> Self {
        Self::new(NotifierMode::Deliver)
    }
}

#[async_trait::async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, request: &NotificationRequest) -> Result<(), NotifyError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        let mode = self
            .mode
            .lock()
            .map(|m| m.clone())
            .map_err(|_| NotifyError::Transport("lock poisoned".to_string()))?;

        match mode {
            NotifierMode::Deliver => Ok(()),
            NotifierMode::Fail(reason) => Err(NotifyError::Transport(reason)),
            NotifierMode::Hang => {
                std::future::pending::<()>().await;
                Ok(())
            }
        }
    }
}
