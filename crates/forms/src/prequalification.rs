//! Life insurance prequalification (4 steps).

use serde::{Deserialize, Serialize};

use intake_core::{FieldChecks, ValidationErrors};
use intake_wizard::{
    ApplicantSummary, FormData, StepNumber, StepPayload, StepRegistry, StepSchema, Wizard,
    WizardKind,
};

use crate::common::{ContactInfo, YesNo};

pub const MIN_AGE: u8 = 18;
pub const MAX_AGE: u8 = 85;
pub const MIN_COVERAGE: u64 = 25_000;
pub const MAX_COVERAGE: u64 = 10_000_000;
pub const TERM_LENGTHS: [u8; 5] = [10, 15, 20, 25, 30];

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactTime {
    #[default]
    Anytime,
    Morning,
    Afternoon,
    Evening,
}

/// Step 1.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ContactStep {
    #[serde(flatten)]
    pub contact: ContactInfo,
    pub state: String,
    pub best_time_to_call: ContactTime,
}

impl StepSchema for ContactStep {
    fn validate(&self) -> Result<Self, ValidationErrors> {
        let mut checks = FieldChecks::new();
        let contact = self.contact.check(&mut checks);
        let state = checks.required_text("state", "State", &self.state);
        checks.finish(ContactStep {
            contact,
            state,
            best_time_to_call: self.best_time_to_call,
        })
    }
}

/// Step 2.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HealthStep {
    pub age: Option<u8>,
    pub uses_tobacco: YesNo,
    pub tobacco_details: Option<String>,
    pub takes_medications: YesNo,
    pub medications: Option<String>,
    pub has_major_conditions: YesNo,
    pub condition_details: Option<String>,
}

impl StepSchema for HealthStep {
    fn validate(&self) -> Result<Self, ValidationErrors> {
        let mut checks = FieldChecks::new();
        match self.age {
            Some(age) => checks.in_range("age", "Age", age, MIN_AGE, MAX_AGE),
            None => checks.fail("age", "Age is required"),
        }
        let tobacco_details = checks.required_if(
            self.uses_tobacco.is_yes(),
            "tobaccoDetails",
            "Tobacco use details",
            self.tobacco_details.as_deref(),
        );
        let medications = checks.required_if(
            self.takes_medications.is_yes(),
            "medications",
            "Medication list",
            self.medications.as_deref(),
        );
        let condition_details = checks.required_if(
            self.has_major_conditions.is_yes(),
            "conditionDetails",
            "Condition details",
            self.condition_details.as_deref(),
        );
        checks.finish(HealthStep {
            age: self.age,
            uses_tobacco: self.uses_tobacco,
            tobacco_details,
            takes_medications: self.takes_medications,
            medications,
            has_major_conditions: self.has_major_conditions,
            condition_details,
        })
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverageType {
    #[default]
    Term,
    WholeLife,
    UniversalLife,
    NotSure,
}

/// Step 3.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CoverageStep {
    pub coverage_type: CoverageType,
    pub coverage_amount: u64,
    pub term_length_years: Option<u8>,
    pub purpose: Option<String>,
}

impl StepSchema for CoverageStep {
    fn validate(&self) -> Result<Self, ValidationErrors> {
        let mut checks = FieldChecks::new();
        checks.in_range(
            "coverageAmount",
            "Coverage amount",
            self.coverage_amount,
            MIN_COVERAGE,
            MAX_COVERAGE,
        );

        let term_length_years = if self.coverage_type == CoverageType::Term {
            match self.term_length_years {
                Some(years) if TERM_LENGTHS.contains(&years) => Some(years),
                Some(_) => {
                    checks.fail("termLengthYears", "Choose a term of 10, 15, 20, 25 or 30 years");
                    self.term_length_years
                }
                None => {
                    checks.fail("termLengthYears", "Term length is required");
                    None
                }
            }
        } else {
            None
        };
        let purpose = checks.optional_text(self.purpose.as_deref());

        checks.finish(CoverageStep {
            coverage_type: self.coverage_type,
            coverage_amount: self.coverage_amount,
            term_length_years,
            purpose,
        })
    }
}

/// Step 4.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReviewStep {
    pub information_accurate: bool,
    pub consent_to_contact: bool,
}

impl StepSchema for ReviewStep {
    fn validate(&self) -> Result<Self, ValidationErrors> {
        let mut checks = FieldChecks::new();
        checks.must_be_true(
            "informationAccurate",
            self.information_accurate,
            "Please confirm your information is accurate",
        );
        checks.must_be_true(
            "consentToContact",
            self.consent_to_contact,
            "Please consent to be contacted by an advisor",
        );
        checks.finish(self.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "section", rename_all = "snake_case")]
pub enum PrequalificationStep {
    Contact(ContactStep),
    Health(HealthStep),
    Coverage(CoverageStep),
    Review(ReviewStep),
}

impl StepPayload for PrequalificationStep {
    fn step(&self) -> StepNumber {
        match self {
            PrequalificationStep::Contact(_) => StepNumber::at(1),
            PrequalificationStep::Health(_) => StepNumber::at(2),
            PrequalificationStep::Coverage(_) => StepNumber::at(3),
            PrequalificationStep::Review(_) => StepNumber::at(4),
        }
    }

    fn validate(&self) -> Result<Self, ValidationErrors> {
        match self {
            PrequalificationStep::Contact(s) => s.validate().map(Self::Contact),
            PrequalificationStep::Health(s) => s.validate().map(Self::Health),
            PrequalificationStep::Coverage(s) => s.validate().map(Self::Coverage),
            PrequalificationStep::Review(s) => s.validate().map(Self::Review),
        }
    }
}

pub struct PrequalificationWizard;

impl Wizard for PrequalificationWizard {
    type Payload = PrequalificationStep;

    const KIND: WizardKind = WizardKind::Prequalification;

    fn registry() -> StepRegistry {
        StepRegistry::builder()
            .step("Contact")
            .step("Health")
            .step("Coverage")
            .review("Review & Submit")
            .build()
            .expect("prequalification registry has steps")
    }

    fn applicant(form: &FormData<PrequalificationStep>) -> ApplicantSummary {
        match form.get(StepNumber::FIRST) {
            Some(PrequalificationStep::Contact(c)) => c.contact.summary(),
            _ => ApplicantSummary::default(),
        }
    }
}
