//! `intake-wizard` — the generic multi-step wizard engine.
//!
//! A wizard is configuration: a [`Wizard`] definition supplies a typed payload
//! enum (one variant per step) and a [`StepRegistry`]. Everything else is
//! shared:
//!
//! - [`WizardState`]: the state machine, written as a pure aggregate
//!   (`handle` decides, `apply` mutates)
//! - [`DraftStore`]: fail-soft local snapshot persistence
//! - [`SubmissionPipeline`]: must-succeed persist + best-effort notify
//! - [`WizardController`]: glues the three together and drives step views

pub mod controller;
pub mod deadline;
pub mod definition;
pub mod draft;
pub mod error;
pub mod form_data;
pub mod in_memory;
pub mod kind;
pub mod pipeline;
pub mod state;
pub mod step;
pub mod submission;
pub mod view;

#[cfg(test)]
pub(crate) mod fixtures;

pub use controller::{CompletionCallback, RemoteDraftPolicy, StepOutcome, UiEffect, WizardController};
pub use deadline::{DeadlineOutcome, DeadlineTask, TimeoutDisposition};
pub use definition::{ApplicantSummary, Wizard};
pub use draft::{DraftSnapshot, DraftStorage, DraftStore, DraftStoreError};
pub use error::WizardError;
pub use form_data::FormData;
pub use in_memory::{InMemoryDraftStorage, InMemorySubmissionBackend, NotifierMode, RecordingNotifier};
pub use kind::WizardKind;
pub use pipeline::{
    DEFAULT_NOTIFY_TIMEOUT, NotificationOutcome, SubmissionError, SubmissionPipeline,
    SubmissionReceipt,
};
pub use state::{Navigation, SubmissionProgress, WizardCommand, WizardEvent, WizardPhase, WizardState};
pub use step::{StepDescriptor, StepKind, StepNumber, StepPayload, StepRegistry, StepSchema};
pub use submission::{
    AdvisorRef, BackendError, NotificationRequest, Notifier, NotifyError, StoredSubmission,
    SubmissionBackend, SubmissionContext, SubmissionRecord, SubmissionStatus,
};
pub use view::{ScriptedView, StepAction, StepContext, StepView};
