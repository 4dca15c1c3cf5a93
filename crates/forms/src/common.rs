//! Field groups shared by several wizards.

use serde::{Deserialize, Serialize};

use intake_core::{FieldChecks, Percentage};
use intake_wizard::ApplicantSummary;

/// Answer to a Yes/No radio group.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum YesNo {
    Yes,
    #[default]
    No,
}

impl YesNo {
    pub fn is_yes(self) -> bool {
        self == YesNo::Yes
    }
}

/// Name, email and phone block at the top of every wizard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ContactInfo {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
}

impl ContactInfo {
    /// Validate into `checks`, returning the normalized block.
    pub fn check(&self, checks: &mut FieldChecks) -> ContactInfo {
        ContactInfo {
            first_name: checks.required_text("firstName", "First name", &self.first_name),
            last_name: checks.required_text("lastName", "Last name", &self.last_name),
            email: checks.email("email", &self.email),
            phone: checks.phone("phone", &self.phone),
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
            .trim()
            .to_string()
    }

    pub fn summary(&self) -> ApplicantSummary {
        ApplicantSummary {
            name: Some(self.full_name()).filter(|n| !n.is_empty()),
            email: Some(self.email.clone()).filter(|e| !e.is_empty()),
            phone: Some(self.phone.clone()).filter(|p| !p.is_empty()),
        }
    }
}

/// One entry of a beneficiary allocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Beneficiary {
    pub name: String,
    pub relationship: String,
    pub percentage: u32,
}

/// Whether the shares of `beneficiaries` make a complete allocation
/// (at least one entry, exactly 100% in total). Drives the advance button.
pub fn allocation_complete(beneficiaries: &[Beneficiary]) -> bool {
    !beneficiaries.is_empty() && allocation_total(beneficiaries) == Percentage::FULL.value()
}

pub fn allocation_total(beneficiaries: &[Beneficiary]) -> u32 {
    Percentage::total(beneficiaries.iter().map(|b| b.percentage))
}

/// Validate a beneficiary list stored under `field`.
pub fn check_allocation(
    checks: &mut FieldChecks,
    field: &str,
    beneficiaries: &[Beneficiary],
) -> Vec<Beneficiary> {
    checks.non_empty(field, beneficiaries, "Add at least one beneficiary");

    let normalized = beneficiaries
        .iter()
        .enumerate()
        .map(|(i, b)| Beneficiary {
            name: checks.required_text(&format!("{field}[{i}].name"), "Beneficiary name", &b.name),
            relationship: checks.required_text(
                &format!("{field}[{i}].relationship"),
                "Relationship",
                &b.relationship,
            ),
            percentage: {
                checks.in_range(
                    &format!("{field}[{i}].percentage"),
                    "Percentage",
                    b.percentage,
                    1,
                    100,
                );
                b.percentage
            },
        })
        .collect();

    if !beneficiaries.is_empty() {
        let total = allocation_total(beneficiaries);
        checks.ensure(
            total == Percentage::FULL.value(),
            field,
            format!("Percentages must total 100% (currently {total}%)"),
        );
    }

    normalized
}

/// What happens to the estate if no named beneficiary survives.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "plan", rename_all = "snake_case")]
pub enum ContingencyPlan {
    /// Pass to heirs at law.
    #[default]
    Heirs,
    Charity {
        #[serde(default, rename = "charityName")]
        charity_name: String,
    },
    Other {
        #[serde(default)]
        details: String,
    },
}

impl ContingencyPlan {
    pub fn check(&self, checks: &mut FieldChecks, field: &str) -> ContingencyPlan {
        match self {
            ContingencyPlan::Heirs => ContingencyPlan::Heirs,
            ContingencyPlan::Charity { charity_name } => ContingencyPlan::Charity {
                charity_name: checks.required_text(
                    &format!("{field}.charityName"),
                    "Charity name",
                    charity_name,
                ),
            },
            ContingencyPlan::Other { details } => ContingencyPlan::Other {
                details: checks.required_text(
                    &format!("{field}.details"),
                    "Contingency details",
                    details,
                ),
            },
        }
    }
}

/// Five-digit (optionally ZIP+4) US postal code.
pub fn check_zip(checks: &mut FieldChecks, field: &str, value: &str) -> String {
    let zip = value.trim();
    let (base, ext) = match zip.split_once('-') {
        Some((base, ext)) => (base, Some(ext)),
        None => (zip, None),
    };
    let digits = |s: &str, n: usize| s.len() == n && s.chars().all(|c| c.is_ascii_digit());
    let valid = digits(base, 5) && ext.is_none_or(|e| digits(e, 4));
    checks.ensure(valid, field, "Enter a valid ZIP code");
    zip.to_string()
}
