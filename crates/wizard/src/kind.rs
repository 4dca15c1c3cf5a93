//! The wizard types offered on the site.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use intake_core::DomainError;

/// Wizard type. Each type owns exactly one draft slot in local storage.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardKind {
    EstatePlanning,
    Prequalification,
    LifeInsurance,
}

impl WizardKind {
    pub const ALL: [WizardKind; 3] = [
        WizardKind::EstatePlanning,
        WizardKind::Prequalification,
        WizardKind::LifeInsurance,
    ];

    /// Fixed local storage key for this wizard's draft.
    pub fn draft_key(self) -> &'static str {
        match self {
            WizardKind::EstatePlanning => "estate-planning-draft",
            WizardKind::Prequalification => "prequalification-draft",
            WizardKind::LifeInsurance => "life-insurance-draft",
        }
    }

    /// Value of the backend `form_type` column.
    pub fn form_type(self) -> &'static str {
        match self {
            WizardKind::EstatePlanning => "estate_planning",
            WizardKind::Prequalification => "prequalification",
            WizardKind::LifeInsurance => "life_insurance",
        }
    }

    pub fn slug(self) -> &'static str {
        match self {
            WizardKind::EstatePlanning => "estate-planning",
            WizardKind::Prequalification => "prequalification",
            WizardKind::LifeInsurance => "life-insurance",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            WizardKind::EstatePlanning => "Estate Planning & Living Trust",
            WizardKind::Prequalification => "Life Insurance Prequalification",
            WizardKind::LifeInsurance => "Life Insurance Application",
        }
    }
}

impl core::fmt::Display for WizardKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for WizardKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        WizardKind::ALL
            .into_iter()
            .find(|k| k.slug() == normalized)
            .ok_or_else(|| DomainError::validation(format!("unknown wizard '{s}'")))
    }
}
