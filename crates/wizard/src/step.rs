//! Step numbering, step payload contracts and the step registry.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use intake_core::{DomainError, DomainResult, ValidationErrors};

/// 1-indexed position of a step within a wizard.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct StepNumber(u8);

impl StepNumber {
    pub const FIRST: StepNumber = StepNumber(1);

    pub fn new(n: u8) -> DomainResult<Self> {
        if n == 0 {
            return Err(DomainError::validation("steps are numbered from 1"));
        }
        Ok(Self(n))
    }

    /// Const constructor for step literals in wizard definitions.
    pub const fn at(n: u8) -> Self {
        assert!(n > 0, "steps are numbered from 1");
        Self(n)
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Key used inside `formData` (`"step3"`).
    pub fn key(self) -> String {
        format!("step{}", self.0)
    }

    /// Parse a `formData` key back into a step number.
    pub fn from_key(key: &str) -> DomainResult<Self> {
        let digits = key
            .strip_prefix("step")
            .ok_or_else(|| DomainError::validation(format!("'{key}' is not a step key")))?;
        let n: u8 = digits
            .parse()
            .map_err(|_| DomainError::validation(format!("'{key}' is not a step key")))?;
        Self::new(n)
    }

    pub fn next(self) -> StepNumber {
        StepNumber(self.0.saturating_add(1))
    }

    /// Previous step, `None` on step 1.
    pub fn previous(self) -> Option<StepNumber> {
        if self.0 > 1 { Some(StepNumber(self.0 - 1)) } else { None }
    }
}

impl TryFrom<u8> for StepNumber {
    type Error = DomainError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<StepNumber> for u8 {
    fn from(value: StepNumber) -> Self {
        value.0
    }
}

impl core::fmt::Display for StepNumber {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Data contract of a single step record.
///
/// `validate` returns the normalized record or a field-keyed error map. It must
/// be pure: same input, same output.
pub trait StepSchema: Sized + Clone {
    fn validate(&self) -> Result<Self, ValidationErrors>;

    /// Whether the step's advance affordance should be enabled for this live
    /// input. Gating rules (e.g. shares totalling 100) belong here in addition
    /// to `validate`.
    fn is_submittable(&self) -> bool {
        self.validate().is_ok()
    }
}

/// Tagged union of every step record of one wizard.
pub trait StepPayload:
    Clone + core::fmt::Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// The step this payload belongs to.
    fn step(&self) -> StepNumber;

    /// Validate the wrapped record, keeping the variant.
    fn validate(&self) -> Result<Self, ValidationErrors>;

    fn is_submittable(&self) -> bool {
        self.validate().is_ok()
    }
}

/// How a step is rendered.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    /// Ordinary data-entry step.
    Form,
    /// Final review step; gets random-access "Edit" jumps.
    Review,
}

/// Registry entry for one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepDescriptor {
    pub number: StepNumber,
    pub title: &'static str,
    pub kind: StepKind,
}

impl StepDescriptor {
    pub fn key(&self) -> String {
        self.number.key()
    }
}

/// Ordered, contiguous list of steps (`1..=N`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRegistry {
    steps: Vec<StepDescriptor>,
}

impl StepRegistry {
    pub fn builder() -> StepRegistryBuilder {
        StepRegistryBuilder { steps: Vec::new() }
    }

    pub fn len(&self) -> u8 {
        self.steps.len() as u8
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn first(&self) -> StepNumber {
        StepNumber::FIRST
    }

    pub fn last(&self) -> StepNumber {
        StepNumber(self.len())
    }

    pub fn contains(&self, step: StepNumber) -> bool {
        step.get() <= self.len()
    }

    pub fn is_last(&self, step: StepNumber) -> bool {
        step == self.last()
    }

    pub fn get(&self, step: StepNumber) -> Option<&StepDescriptor> {
        self.steps.get(usize::from(step.get()) - 1)
    }

    /// Step after `step`, `None` past the end.
    pub fn next(&self, step: StepNumber) -> Option<StepNumber> {
        let next = step.next();
        self.contains(next).then_some(next)
    }

    pub fn previous(&self, step: StepNumber) -> Option<StepNumber> {
        step.previous()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StepDescriptor> {
        self.steps.iter()
    }
}

pub struct StepRegistryBuilder {
    steps: Vec<StepDescriptor>,
}

impl StepRegistryBuilder {
    pub fn step(self, title: &'static str) -> Self {
        self.push(title, StepKind::Form)
    }

    pub fn review(self, title: &'static str) -> Self {
        self.push(title, StepKind::Review)
    }

    fn push(mut self, title: &'static str, kind: StepKind) -> Self {
        let number = StepNumber((self.steps.len() + 1).min(usize::from(u8::MAX)) as u8);
        self.steps.push(StepDescriptor { number, title, kind });
        self
    }

    pub fn build(self) -> DomainResult<StepRegistry> {
        if self.steps.is_empty() {
            return Err(DomainError::invariant("a wizard needs at least one step"));
        }
        if self.steps.len() > usize::from(u8::MAX) {
            return Err(DomainError::invariant("too many wizard steps"));
        }
        Ok(StepRegistry { steps: self.steps })
    }
}
