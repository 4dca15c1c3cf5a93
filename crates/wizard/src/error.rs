//! Wizard engine errors.

use thiserror::Error;

use intake_core::ValidationErrors;

use crate::pipeline::SubmissionError;
use crate::step::StepNumber;

/// Rejected wizard transition or failed submission.
///
/// Everything except `Submission` is raised before any state is touched.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum WizardError {
    #[error("step {step} has invalid fields: {errors}")]
    Validation {
        step: StepNumber,
        errors: ValidationErrors,
    },

    #[error("step {got} is not the current step (currently on step {expected})")]
    NotCurrentStep { expected: StepNumber, got: StepNumber },

    #[error("payload belongs to step {payload_step}, not step {step}")]
    PayloadMismatch {
        step: StepNumber,
        payload_step: StepNumber,
    },

    #[error("step {step} does not exist (last step is {last})")]
    StepOutOfRange { step: StepNumber, last: StepNumber },

    #[error("already on the first step")]
    AtFirstStep,

    #[error("a submission is in progress")]
    Busy,

    #[error("this form has already been submitted")]
    AlreadySubmitted,

    #[error("no submission is in progress")]
    NotSubmitting,

    #[error("complete steps {} before submitting", join_steps(.0))]
    IncompleteSteps(Vec<StepNumber>),

    #[error("the final step has no recorded data to resubmit")]
    NothingToRetry,

    #[error("invalid draft snapshot: {0}")]
    InvalidSnapshot(String),

    #[error(transparent)]
    Submission(#[from] SubmissionError),
}

fn join_steps(steps: &[StepNumber]) -> String {
    steps.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

impl WizardError {
    /// Field errors, when this is a validation failure.
    pub fn field_errors(&self) -> Option<&ValidationErrors> {
        match self {
            WizardError::Validation { errors, .. } => Some(errors),
            _ => None,
        }
    }
}
