//! Wizard definitions: what turns the generic engine into a concrete flow.

use serde::{Deserialize, Serialize};

use crate::form_data::FormData;
use crate::kind::WizardKind;
use crate::step::{StepPayload, StepRegistry};

/// Applicant fields lifted out of the step data for the backend row and the
/// advisor notification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicantSummary {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// A concrete wizard (estate planning, prequalification, ...).
pub trait Wizard: Send + Sync + 'static {
    /// Tagged union of this wizard's step records.
    type Payload: StepPayload;

    const KIND: WizardKind;

    /// Ordered steps. Must agree with `Payload::step()` numbering.
    fn registry() -> StepRegistry;

    /// Derive the applicant summary (usually from step 1).
    fn applicant(form: &FormData<Self::Payload>) -> ApplicantSummary;
}
