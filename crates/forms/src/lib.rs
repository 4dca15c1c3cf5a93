//! Concrete intake wizards.
//!
//! Each module defines the step records of one wizard, the tagged payload
//! enum tying them together, and the `Wizard` impl the engine runs. No IO.

pub mod common;
pub mod estate_planning;
pub mod life_insurance;
pub mod prequalification;

pub use common::{Beneficiary, ContactInfo, ContingencyPlan, YesNo};
pub use estate_planning::{EstatePlanningStep, EstatePlanningWizard};
pub use life_insurance::{LifeInsuranceStep, LifeInsuranceWizard};
pub use prequalification::{PrequalificationStep, PrequalificationWizard};

