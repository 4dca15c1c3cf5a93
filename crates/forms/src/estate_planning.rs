//! Estate planning / living trust intake (6 steps).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use intake_core::{FieldChecks, ValidationErrors};
use intake_wizard::{
    ApplicantSummary, FormData, StepNumber, StepPayload, StepRegistry, StepSchema, Wizard,
    WizardKind,
};

use crate::common::{
    Beneficiary, ContactInfo, ContingencyPlan, YesNo, allocation_complete, check_allocation,
};

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaritalStatus {
    #[default]
    Single,
    Married,
    Divorced,
    Widowed,
}

/// Step 1.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PersonalInfo {
    #[serde(flatten)]
    pub contact: ContactInfo,
    pub date_of_birth: Option<NaiveDate>,
    pub state_of_residence: String,
}

impl StepSchema for PersonalInfo {
    fn validate(&self) -> Result<Self, ValidationErrors> {
        let mut checks = FieldChecks::new();
        let contact = self.contact.check(&mut checks);
        if self.date_of_birth.is_none() {
            checks.fail("dateOfBirth", "Date of birth is required");
        }
        let state_of_residence =
            checks.required_text("stateOfResidence", "State of residence", &self.state_of_residence);
        checks.finish(PersonalInfo {
            contact,
            date_of_birth: self.date_of_birth,
            state_of_residence,
        })
    }
}

/// Step 2.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FamilyInfo {
    pub marital_status: MaritalStatus,
    pub spouse_name: Option<String>,
    pub has_children: YesNo,
    pub number_of_children: Option<u8>,
    pub has_minor_children: YesNo,
    pub guardian_name: Option<String>,
}

impl StepSchema for FamilyInfo {
    fn validate(&self) -> Result<Self, ValidationErrors> {
        let mut checks = FieldChecks::new();
        let married = self.marital_status == MaritalStatus::Married;
        let spouse_name =
            checks.required_if(married, "spouseName", "Spouse name", self.spouse_name.as_deref());

        let has_children = self.has_children.is_yes();
        let number_of_children = if has_children {
            match self.number_of_children {
                Some(n) => {
                    checks.in_range("numberOfChildren", "Number of children", n, 1, 20);
                    Some(n)
                }
                None => {
                    checks.fail("numberOfChildren", "Number of children is required");
                    None
                }
            }
        } else {
            None
        };

        let has_minor_children = if has_children {
            self.has_minor_children
        } else {
            YesNo::No
        };
        let guardian_name = checks.required_if(
            has_minor_children.is_yes(),
            "guardianName",
            "Guardian name",
            self.guardian_name.as_deref(),
        );

        checks.finish(FamilyInfo {
            marital_status: self.marital_status,
            spouse_name,
            has_children: self.has_children,
            number_of_children,
            has_minor_children,
            guardian_name,
        })
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstateValue {
    #[default]
    #[serde(rename = "under_500k")]
    Under500k,
    #[serde(rename = "500k_to_1m")]
    From500kTo1m,
    #[serde(rename = "1m_to_5m")]
    From1mTo5m,
    #[serde(rename = "over_5m")]
    Over5m,
}

/// Step 3.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AssetInfo {
    pub estimated_value: EstateValue,
    pub owns_real_estate: YesNo,
    pub real_estate_details: Option<String>,
    pub owns_business: YesNo,
    pub business_description: Option<String>,
    pub has_existing_will: YesNo,
}

impl StepSchema for AssetInfo {
    fn validate(&self) -> Result<Self, ValidationErrors> {
        let mut checks = FieldChecks::new();
        let real_estate_details = checks.required_if(
            self.owns_real_estate.is_yes(),
            "realEstateDetails",
            "Real estate details",
            self.real_estate_details.as_deref(),
        );
        let business_description = checks.required_if(
            self.owns_business.is_yes(),
            "businessDescription",
            "Business description",
            self.business_description.as_deref(),
        );
        checks.finish(AssetInfo {
            real_estate_details,
            business_description,
            ..self.clone()
        })
    }
}

/// Step 4.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BeneficiaryInfo {
    pub beneficiaries: Vec<Beneficiary>,
    pub contingency: ContingencyPlan,
}

impl StepSchema for BeneficiaryInfo {
    fn validate(&self) -> Result<Self, ValidationErrors> {
        let mut checks = FieldChecks::new();
        let beneficiaries = check_allocation(&mut checks, "beneficiaries", &self.beneficiaries);
        let contingency = self.contingency.check(&mut checks, "contingency");
        checks.finish(BeneficiaryInfo {
            beneficiaries,
            contingency,
        })
    }

    fn is_submittable(&self) -> bool {
        allocation_complete(&self.beneficiaries) && self.validate().is_ok()
    }
}

/// Step 5.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TrusteeInfo {
    pub successor_trustee: String,
    pub successor_trustee_relationship: String,
    pub alternate_trustee: Option<String>,
    pub healthcare_agent: Option<String>,
    pub financial_power_of_attorney: Option<String>,
}

impl StepSchema for TrusteeInfo {
    fn validate(&self) -> Result<Self, ValidationErrors> {
        let mut checks = FieldChecks::new();
        let successor_trustee =
            checks.required_text("successorTrustee", "Successor trustee", &self.successor_trustee);
        let successor_trustee_relationship = checks.required_text(
            "successorTrusteeRelationship",
            "Relationship to successor trustee",
            &self.successor_trustee_relationship,
        );
        let alternate_trustee = checks.optional_text(self.alternate_trustee.as_deref());
        let healthcare_agent = checks.optional_text(self.healthcare_agent.as_deref());
        let financial_power_of_attorney =
            checks.optional_text(self.financial_power_of_attorney.as_deref());
        checks.finish(TrusteeInfo {
            successor_trustee,
            successor_trustee_relationship,
            alternate_trustee,
            healthcare_agent,
            financial_power_of_attorney,
        })
    }
}

/// Step 6.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReviewConsent {
    pub information_accurate: bool,
    pub understands_not_legal_advice: bool,
    pub consent_to_contact: bool,
    pub additional_notes: Option<String>,
}

impl StepSchema for ReviewConsent {
    fn validate(&self) -> Result<Self, ValidationErrors> {
        let mut checks = FieldChecks::new();
        checks.must_be_true(
            "informationAccurate",
            self.information_accurate,
            "Please confirm your information is accurate",
        );
        checks.must_be_true(
            "understandsNotLegalAdvice",
            self.understands_not_legal_advice,
            "Please acknowledge that this is not legal advice",
        );
        checks.must_be_true(
            "consentToContact",
            self.consent_to_contact,
            "Please consent to be contacted by an advisor",
        );
        let additional_notes = checks.optional_text(self.additional_notes.as_deref());
        checks.finish(ReviewConsent {
            additional_notes,
            ..self.clone()
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "section", rename_all = "snake_case")]
pub enum EstatePlanningStep {
    Personal(PersonalInfo),
    Family(FamilyInfo),
    Assets(AssetInfo),
    Beneficiaries(BeneficiaryInfo),
    Trustees(TrusteeInfo),
    Review(ReviewConsent),
}

impl StepPayload for EstatePlanningStep {
    fn step(&self) -> StepNumber {
        match self {
            EstatePlanningStep::Personal(_) => StepNumber::at(1),
            EstatePlanningStep::Family(_) => StepNumber::at(2),
            EstatePlanningStep::Assets(_) => StepNumber::at(3),
            EstatePlanningStep::Beneficiaries(_) => StepNumber::at(4),
            EstatePlanningStep::Trustees(_) => StepNumber::at(5),
            EstatePlanningStep::Review(_) => StepNumber::at(6),
        }
    }

    fn validate(&self) -> Result<Self, ValidationErrors> {
        match self {
            EstatePlanningStep::Personal(s) => s.validate().map(Self::Personal),
            EstatePlanningStep::Family(s) => s.validate().map(Self::Family),
            EstatePlanningStep::Assets(s) => s.validate().map(Self::Assets),
            EstatePlanningStep::Beneficiaries(s) => s.validate().map(Self::Beneficiaries),
            EstatePlanningStep::Trustees(s) => s.validate().map(Self::Trustees),
            EstatePlanningStep::Review(s) => s.validate().map(Self::Review),
        }
    }

    fn is_submittable(&self) -> bool {
        match self {
            EstatePlanningStep::Beneficiaries(s) => s.is_submittable(),
            other => other.validate().is_ok(),
        }
    }
}

pub struct EstatePlanningWizard;

impl Wizard for EstatePlanningWizard {
    type Payload = EstatePlanningStep;

    const KIND: WizardKind = WizardKind::EstatePlanning;

    fn registry() -> StepRegistry {
        StepRegistry::builder()
            .step("Personal Information")
            .step("Family")
            .step("Assets")
            .step("Beneficiaries")
            .step("Trustees & Agents")
            .review("Review & Submit")
            .build()
            .expect("estate planning registry has steps")
    }

    fn applicant(form: &FormData<EstatePlanningStep>) -> ApplicantSummary {
        match form.get(StepNumber::FIRST) {
            Some(EstatePlanningStep::Personal(p)) => p.contact.summary(),
            _ => ApplicantSummary::default(),
        }
    }
}
