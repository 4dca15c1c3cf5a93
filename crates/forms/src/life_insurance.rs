//! Full life insurance application (6 steps).
//!
//! This is the flow that keeps a `draft` row in the backend while the
//! applicant works through it (see `RemoteDraftPolicy::Sync`).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use intake_core::{FieldChecks, ValidationErrors};
use intake_wizard::{
    ApplicantSummary, FormData, StepNumber, StepPayload, StepRegistry, StepSchema, Wizard,
    WizardKind,
};

use crate::common::{
    Beneficiary, ContactInfo, YesNo, allocation_complete, check_allocation, check_zip,
};
use crate::prequalification::{CoverageType, MAX_COVERAGE, MIN_COVERAGE, TERM_LENGTHS};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Address {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip: String,
}

impl Address {
    fn check(&self, checks: &mut FieldChecks) -> Address {
        Address {
            street: checks.required_text("street", "Street address", &self.street),
            city: checks.required_text("city", "City", &self.city),
            state: checks.required_text("state", "State", &self.state),
            zip: check_zip(checks, "zip", &self.zip),
        }
    }
}

/// Step 1.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ApplicantStep {
    #[serde(flatten)]
    pub contact: ContactInfo,
    pub date_of_birth: Option<NaiveDate>,
    #[serde(flatten)]
    pub address: Address,
}

impl StepSchema for ApplicantStep {
    fn validate(&self) -> Result<Self, ValidationErrors> {
        let mut checks = FieldChecks::new();
        let contact = self.contact.check(&mut checks);
        if self.date_of_birth.is_none() {
            checks.fail("dateOfBirth", "Date of birth is required");
        }
        let address = self.address.check(&mut checks);
        checks.finish(ApplicantStep {
            contact,
            date_of_birth: self.date_of_birth,
            address,
        })
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmploymentStatus {
    #[default]
    Employed,
    SelfEmployed,
    Retired,
    Unemployed,
    Student,
}

impl EmploymentStatus {
    fn has_earned_income(self) -> bool {
        matches!(self, EmploymentStatus::Employed | EmploymentStatus::SelfEmployed)
    }
}

/// Step 2.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EmploymentStep {
    pub status: EmploymentStatus,
    pub employer: Option<String>,
    pub occupation: Option<String>,
    pub annual_income: Option<u64>,
}

impl StepSchema for EmploymentStep {
    fn validate(&self) -> Result<Self, ValidationErrors> {
        let mut checks = FieldChecks::new();
        let working = self.status.has_earned_income();
        let employer = checks.required_if(
            self.status == EmploymentStatus::Employed,
            "employer",
            "Employer",
            self.employer.as_deref(),
        );
        let occupation =
            checks.required_if(working, "occupation", "Occupation", self.occupation.as_deref());
        let annual_income = if working {
            match self.annual_income {
                Some(income) if income > 0 => Some(income),
                _ => {
                    checks.fail("annualIncome", "Annual income is required");
                    self.annual_income
                }
            }
        } else {
            self.annual_income
        };
        checks.finish(EmploymentStep {
            status: self.status,
            employer,
            occupation,
            annual_income,
        })
    }
}

/// Step 3.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PolicyStep {
    pub product: CoverageType,
    pub face_amount: u64,
    pub term_length_years: Option<u8>,
    pub riders: Vec<String>,
}

impl StepSchema for PolicyStep {
    fn validate(&self) -> Result<Self, ValidationErrors> {
        let mut checks = FieldChecks::new();
        checks.ensure(
            self.product != CoverageType::NotSure,
            "product",
            "Choose a policy type",
        );
        checks.in_range("faceAmount", "Face amount", self.face_amount, MIN_COVERAGE, MAX_COVERAGE);
        let term_length_years = if self.product == CoverageType::Term {
            if !self.term_length_years.is_some_and(|y| TERM_LENGTHS.contains(&y)) {
                checks.fail("termLengthYears", "Choose a term of 10, 15, 20, 25 or 30 years");
            }
            self.term_length_years
        } else {
            None
        };
        let riders = self
            .riders
            .iter()
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .collect();
        checks.finish(PolicyStep {
            product: self.product,
            face_amount: self.face_amount,
            term_length_years,
            riders,
        })
    }
}

/// Step 4. Contingent beneficiaries are optional, but when present they
/// must also total 100%.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BeneficiaryStep {
    pub primary: Vec<Beneficiary>,
    pub contingent: Vec<Beneficiary>,
}

impl StepSchema for BeneficiaryStep {
    fn validate(&self) -> Result<Self, ValidationErrors> {
        let mut checks = FieldChecks::new();
        let primary = check_allocation(&mut checks, "primary", &self.primary);
        let contingent = if self.contingent.is_empty() {
            Vec::new()
        } else {
            check_allocation(&mut checks, "contingent", &self.contingent)
        };
        checks.finish(BeneficiaryStep {
            primary,
            contingent,
        })
    }

    fn is_submittable(&self) -> bool {
        allocation_complete(&self.primary)
            && (self.contingent.is_empty() || allocation_complete(&self.contingent))
            && self.validate().is_ok()
    }
}

/// Step 5.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MedicalStep {
    pub uses_tobacco: YesNo,
    pub tobacco_details: Option<String>,
    pub hospitalized_last_five_years: YesNo,
    pub hospitalization_details: Option<String>,
    pub replacing_existing_policy: YesNo,
    pub existing_carrier: Option<String>,
    pub existing_policy_number: Option<String>,
}

impl StepSchema for MedicalStep {
    fn validate(&self) -> Result<Self, ValidationErrors> {
        let mut checks = FieldChecks::new();
        let tobacco_details = checks.required_if(
            self.uses_tobacco.is_yes(),
            "tobaccoDetails",
            "Tobacco use details",
            self.tobacco_details.as_deref(),
        );
        let hospitalization_details = checks.required_if(
            self.hospitalized_last_five_years.is_yes(),
            "hospitalizationDetails",
            "Hospitalization details",
            self.hospitalization_details.as_deref(),
        );
        let replacing = self.replacing_existing_policy.is_yes();
        let existing_carrier = checks.required_if(
            replacing,
            "existingCarrier",
            "Existing carrier",
            self.existing_carrier.as_deref(),
        );
        let existing_policy_number = if replacing {
            checks.optional_text(self.existing_policy_number.as_deref())
        } else {
            None
        };
        checks.finish(MedicalStep {
            uses_tobacco: self.uses_tobacco,
            tobacco_details,
            hospitalized_last_five_years: self.hospitalized_last_five_years,
            hospitalization_details,
            replacing_existing_policy: self.replacing_existing_policy,
            existing_carrier,
            existing_policy_number,
        })
    }
}

/// Step 6.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SignatureStep {
    /// Typed full name.
    pub signature: String,
    pub information_accurate: bool,
    pub authorize_underwriting: bool,
}

impl StepSchema for SignatureStep {
    fn validate(&self) -> Result<Self, ValidationErrors> {
        let mut checks = FieldChecks::new();
        let signature = checks.required_text("signature", "Signature", &self.signature);
        checks.must_be_true(
            "informationAccurate",
            self.information_accurate,
            "Please confirm your answers are true and complete",
        );
        checks.must_be_true(
            "authorizeUnderwriting",
            self.authorize_underwriting,
            "Please authorize the underwriting review",
        );
        checks.finish(SignatureStep {
            signature,
            ..self.clone()
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "section", rename_all = "snake_case")]
pub enum LifeInsuranceStep {
    Applicant(ApplicantStep),
    Employment(EmploymentStep),
    Policy(PolicyStep),
    Beneficiaries(BeneficiaryStep),
    Medical(MedicalStep),
    Signature(SignatureStep),
}

impl StepPayload for LifeInsuranceStep {
    fn step(&self) -> StepNumber {
        match self {
            LifeInsuranceStep::Applicant(_) => StepNumber::at(1),
            LifeInsuranceStep::Employment(_) => StepNumber::at(2),
            LifeInsuranceStep::Policy(_) => StepNumber::at(3),
            LifeInsuranceStep::Beneficiaries(_) => StepNumber::at(4),
            LifeInsuranceStep::Medical(_) => StepNumber::at(5),
            LifeInsuranceStep::Signature(_) => StepNumber::at(6),
        }
    }

    fn validate(&self) -> Result<Self, ValidationErrors> {
        match self {
            LifeInsuranceStep::Applicant(s) => s.validate().map(Self::Applicant),
            LifeInsuranceStep::Employment(s) => s.validate().map(Self::Employment),
            LifeInsuranceStep::Policy(s) => s.validate().map(Self::Policy),
            LifeInsuranceStep::Beneficiaries(s) => s.validate().map(Self::Beneficiaries),
            LifeInsuranceStep::Medical(s) => s.validate().map(Self::Medical),
            LifeInsuranceStep::Signature(s) => s.validate().map(Self::Signature),
        }
    }

    fn is_submittable(&self) -> bool {
        match self {
            LifeInsuranceStep::Beneficiaries(s) => s.is_submittable(),
            other => other.validate().is_ok(),
        }
    }
}

pub struct LifeInsuranceWizard;

impl Wizard for LifeInsuranceWizard {
    type Payload = LifeInsuranceStep;

    const KIND: WizardKind = WizardKind::LifeInsurance;

    fn registry() -> StepRegistry {
        StepRegistry::builder()
            .step("Applicant")
            .step("Employment & Income")
            .step("Policy")
            .step("Beneficiaries")
            .step("Medical & Replacement")
            .review("Review & Sign")
            .build()
            .expect("life insurance registry has steps")
    }

    fn applicant(form: &FormData<LifeInsuranceStep>) -> ApplicantSummary {
        match form.get(StepNumber::FIRST) {
            Some(LifeInsuranceStep::Applicant(a)) => a.contact.summary(),
            _ => ApplicantSummary::default(),
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn applicant() -> LifeInsuranceStep {
        LifeInsuranceStep::Applicant(ApplicantStep {
            contact: ContactInfo {
                first_name: "Chris".into(),
                last_name: "Park".into(),
                email: "chris.park@example.com".into(),
                phone: "555 222 3333".into(),
            },
            date_of_birth: NaiveDate::from_ymd_opt(1985, 1, 30),
            address: Address {
                street: "1 Main St".into(),
                city: "Austin".into(),
                state: "TX".into(),
                zip: "73301".into(),
            },
        })
    }

    pub fn employment() -> LifeInsuranceStep {
        LifeInsuranceStep::Employment(EmploymentStep {
            status: EmploymentStatus::Employed,
            employer: Some("Acme".into()),
            occupation: Some("Engineer".into()),
            annual_income: Some(120_000),
        })
    }

    pub fn policy() -> LifeInsuranceStep {
        LifeInsuranceStep::Policy(PolicyStep {
            product: CoverageType::Term,
            face_amount: 750_000,
            term_length_years: Some(30),
            riders: vec!["Waiver of premium".into()],
        })
    }

    pub fn beneficiaries() -> LifeInsuranceStep {
        LifeInsuranceStep::Beneficiaries(BeneficiaryStep {
            primary: vec![Beneficiary {
                name: "Robin Park".into(),
                relationship: "Spouse".into(),
                percentage: 100,
            }],
            contingent: vec![],
        })
    }

    pub fn medical() -> LifeInsuranceStep {
        LifeInsuranceStep::Medical(MedicalStep::default())
    }

    pub fn signature() -> LifeInsuranceStep {
        LifeInsuranceStep::Signature(SignatureStep {
            signature: "Chris Park".into(),
            information_accurate: true,
            authorize_underwriting: true,
        })
    }

    pub fn all_steps() -> Vec<LifeInsuranceStep> {
        vec![applicant(), employment(), policy(), beneficiaries(), medical(), signature()]
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn every_fixture_step_is_valid() {
        let registry = LifeInsuranceWizard::registry();
        for (payload, descriptor) in all_steps().iter().zip(registry.iter()) {
            assert_eq!(payload.step(), descriptor.number);
            assert!(payload.is_submittable(), "{payload:?}");
        }
    }

    #[test]
    fn address_errors_are_reported_together() {
        let LifeInsuranceStep::Applicant(mut step) = applicant() else {
            unreachable!()
        };
        step.address.zip = "7330".into();
        step.address.city = String::new();
        let errors = step.validate().unwrap_err();
        assert!(errors.contains("zip"));
        assert!(errors.contains("city"));
    }

    #[test]
    fn retirees_do_not_need_an_employer() {
        let step = EmploymentStep {
            status: EmploymentStatus::Retired,
            ..EmploymentStep::default()
        };
        assert!(step.validate().is_ok());
    }

    #[test]
    fn self_employed_need_occupation_and_income() {
        let step = EmploymentStep {
            status: EmploymentStatus::SelfEmployed,
            ..EmploymentStep::default()
        };
        let errors = step.validate().unwrap_err();
        assert!(errors.contains("occupation"));
        assert!(errors.contains("annualIncome"));
        assert!(!errors.contains("employer"));
    }

    #[test]
    fn contingent_allocation_must_also_total_100() {
        let LifeInsuranceStep::Beneficiaries(mut step) = beneficiaries() else {
            unreachable!()
        };
        step.contingent = vec![Beneficiary {
            name: "Kim Park".into(),
            relationship: "Sibling".into(),
            percentage: 60,
        }];
        assert!(!step.is_submittable());
        assert!(step.validate().unwrap_err().contains("contingent"));

        step.contingent[0].percentage = 100;
        assert!(step.is_submittable());
    }

    #[test]
    fn replacement_needs_existing_carrier() {
        let step = MedicalStep {
            replacing_existing_policy: YesNo::Yes,
            existing_policy_number: Some("P-123".into()),
            ..MedicalStep::default()
        };
        assert!(step.validate().unwrap_err().contains("existingCarrier"));
    }

    #[test]
    fn unsure_product_is_not_an_application() {
        let step = PolicyStep {
            product: CoverageType::NotSure,
            face_amount: 100_000,
            ..PolicyStep::default()
        };
        assert!(step.validate().unwrap_err().contains("product"));
    }

    #[test]
    fn signature_and_acknowledgments_required() {
        let errors = SignatureStep::default().validate().unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn applicant_wire_format_is_flat() {
        let json = serde_json::to_value(applicant()).unwrap();
        assert_eq!(json["section"], "applicant");
        assert_eq!(json["zip"], "73301");
        assert_eq!(json["firstName"], "Chris");
        let back: LifeInsuranceStep = serde_json::from_value(json).unwrap();
        assert_eq!(back, applicant());
    }
}
