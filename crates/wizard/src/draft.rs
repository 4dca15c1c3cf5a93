//! Local draft persistence.
//!
//! A draft is the snapshot `{formData, currentStep, completedSteps, lastSaved}`
//! stored under one fixed key per wizard type. Storage is a plain string
//! key/value store (`DraftStorage`); `DraftStore` adds the typed JSON layer and
//! the fail-soft policy: loads that cannot be decoded count as "no draft", and
//! save/clear failures are logged, never returned. A broken autosave must not
//! stop someone from filling in the form.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use intake_core::SubmissionId;

use crate::form_data::FormData;
use crate::step::{StepNumber, StepPayload};

/// Serialized form of a wizard session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", bound(deserialize = "P: StepPayload"))]
pub struct DraftSnapshot<P> {
    pub form_data: FormData<P>,
    pub current_step: StepNumber,
    pub completed_steps: BTreeSet<StepNumber>,
    pub last_saved: DateTime<Utc>,
    /// Backend row mirroring this draft, when remote draft sync is on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_draft_id: Option<SubmissionId>,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DraftStoreError {
    #[error("draft storage io error: {0}")]
    Io(String),
    #[error("draft storage unavailable: {0}")]
    Unavailable(String),
}

/// Synchronous string key/value storage for drafts.
pub trait DraftStorage: Send + Sync {
    fn read(&self, key: &str) -> Result<Option<String>, DraftStoreError>;

    fn write(&self, key: &str, value: &str) -> Result<(), DraftStoreError>;

    /// Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), DraftStoreError>;
}

impl<T: DraftStorage + ?Sized> DraftStorage for Arc<T> {
    fn read(&self, key: &str) -> Result<Option<String>, DraftStoreError> {
        (**self).read(key)
    }

    fn write(&self, key: &str, value: &str) -> Result<(), DraftStoreError> {
        (**self).write(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), DraftStoreError> {
        (**self).remove(key)
    }
}

impl<T: DraftStorage + ?Sized> DraftStorage for Box<T> {
    fn read(&self, key: &str) -> Result<Option<String>, DraftStoreError> {
        (**self).read(key)
    }

    fn write(&self, key: &str, value: &str) -> Result<(), DraftStoreError> {
        (**self).write(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), DraftStoreError> {
        (**self).remove(key)
    }
}

/// Typed, fail-soft draft access on top of a `DraftStorage`.
#[derive(Debug, Clone)]
pub struct DraftStore<S> {
    storage: S,
}

impl<S: DraftStorage> DraftStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Load the draft under `key`. Missing, unreadable or undecodable drafts
    /// all yield `None`.
    pub fn load<P: StepPayload>(&self, key: &str) -> Option<DraftSnapshot<P>> {
        let raw = match self.storage.read(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                warn!(key, error = %err, "failed to read draft; starting fresh");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(snapshot) => {
                debug!(key, "loaded draft");
                Some(snapshot)
            }
            Err(err) => {
                warn!(key, error = %err, "discarding undecodable draft");
                None
            }
        }
    }

    /// Persist `snapshot`. Returns whether the write went through.
    pub fn save<P: StepPayload>(&self, key: &str, snapshot: &DraftSnapshot<P>) -> bool {
        let raw = match serde_json::to_string(snapshot) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(key, error = %err, "failed to encode draft");
                return false;
            }
        };

        match self.storage.write(key, &raw) {
            Ok(()) => {
                debug!(key, step = %snapshot.current_step, "draft saved");
                true
            }
            Err(err) => {
                warn!(key, error = %err, "failed to save draft");
                false
            }
        }
    }

    pub fn clear(&self, key: &str) {
        match self.storage.remove(key) {
            Ok(()) => debug!(key, "draft cleared"),
            Err(err) => warn!(key, error = %err, "failed to clear draft"),
        }
    }

    /// Whether a raw draft value is present (decodable or not).
    pub fn exists(&self, key: &str) -> bool {
        matches!(self.storage.read(key), Ok(Some(_)))
    }
}
