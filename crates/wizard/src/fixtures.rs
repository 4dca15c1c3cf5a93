//! Three-step wizard used by the engine's own tests.

use serde::{Deserialize, Serialize};

use intake_core::{FieldChecks, Percentage, ValidationErrors};

use crate::definition::{ApplicantSummary, Wizard};
use crate::form_data::FormData;
use crate::kind::WizardKind;
use crate::step::{StepNumber, StepPayload, StepRegistry, StepSchema};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub name: String,
    pub email: String,
    pub phone: String,
}

impl StepSchema for Contact {
    fn validate(&self) -> Result<Self, ValidationErrors> {
        let mut checks = FieldChecks::new();
        let name = checks.required_text("name", "Name", &self.name);
        let email = checks.email("email", &self.email);
        let phone = checks.phone("phone", &self.phone);
        checks.finish(Contact { name, email, phone })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shares {
    pub shares: Vec<u32>,
}

impl StepSchema for Shares {
    fn validate(&self) -> Result<Self, ValidationErrors> {
        let mut checks = FieldChecks::new();
        checks.non_empty("shares", &self.shares, "Add at least one share");
        let total = Percentage::total(self.shares.iter().copied());
        checks.ensure(total == 100, "shares", format!("Shares must total 100% (currently {total}%)"));
        checks.finish(self.clone())
    }

    fn is_submittable(&self) -> bool {
        !self.shares.is_empty() && Percentage::total(self.shares.iter().copied()) == 100
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Confirm {
    pub agree: bool,
}

impl StepSchema for Confirm {
    fn validate(&self) -> Result<Self, ValidationErrors> {
        let mut checks = FieldChecks::new();
        checks.must_be_true("agree", self.agree, "You must agree before submitting");
        checks.finish(self.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "section", rename_all = "snake_case")]
pub enum TestStep {
    Contact(Contact),
    Shares(Shares),
    Confirm(Confirm),
}

impl StepPayload for TestStep {
    fn step(&self) -> StepNumber {
        match self {
            TestStep::Contact(_) => StepNumber::at(1),
            TestStep::Shares(_) => StepNumber::at(2),
            TestStep::Confirm(_) => StepNumber::at(3),
        }
    }

    fn validate(&self) -> Result<Self, ValidationErrors> {
        match self {
            TestStep::Contact(s) => s.validate().map(TestStep::Contact),
            TestStep::Shares(s) => s.validate().map(TestStep::Shares),
            TestStep::Confirm(s) => s.validate().map(TestStep::Confirm),
        }
    }

    fn is_submittable(&self) -> bool {
        match self {
            TestStep::Contact(s) => s.is_submittable(),
            TestStep::Shares(s) => s.is_submittable(),
            TestStep::Confirm(s) => s.is_submittable(),
        }
    }
}

pub struct TestWizard;

impl Wizard for TestWizard {
    type Payload = TestStep;

    const KIND: WizardKind = WizardKind::Prequalification;

    fn registry() -> StepRegistry {
        StepRegistry::builder()
            .step("Contact")
            .step("Shares")
            .review("Confirm")
            .build()
            .expect("test registry is non-empty")
    }

    fn applicant(form: &FormData<TestStep>) -> ApplicantSummary {
        match form.get(StepNumber::FIRST) {
            Some(TestStep::Contact(c)) => ApplicantSummary {
                name: Some(c.name.clone()),
                email: Some(c.email.clone()),
                phone: Some(c.phone.clone()),
            },
            _ => ApplicantSummary::default(),
        }
    }
}

pub fn contact() -> TestStep {
    TestStep::Contact(Contact {
        name: "Jane Doe".to_string(),
        email: "jane@example.com".to_string(),
        phone: "(555) 123-4567".to_string(),
    })
}

pub fn shares(values: &[u32]) -> TestStep {
    TestStep::Shares(Shares {
        shares: values.to_vec(),
    })
}

pub fn confirm(agree: bool) -> TestStep {
    TestStep::Confirm(Confirm { agree })
}
