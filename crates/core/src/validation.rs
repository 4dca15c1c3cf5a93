//! Field-level validation for step payloads.
//!
//! Validators never stop at the first problem: every field is checked and the
//! caller gets one message per offending field, keyed by the field path
//! (`beneficiaries[1].percentage`), so a form can render them inline.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::value_object::{EmailAddress, PhoneNumber};

/// Field-keyed validation messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    fields: BTreeMap<String, String>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-field error.
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    /// Record an error. The first message for a field wins.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.fields.entry(field.into()).or_insert_with(|| message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl core::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut first = true;
        for (field, message) in &self.fields {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Accumulating checker used by step schemas.
///
/// Each check returns the normalized value (trimmed text, canonical email or
/// phone) and records a message when the value is unacceptable. `finish`
/// turns the accumulated state into a `Result`.
#[derive(Debug, Default)]
pub struct FieldChecks {
    errors: ValidationErrors,
}

impl FieldChecks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an arbitrary failure.
    pub fn fail(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.add(field, message);
    }

    /// Record a failure when `condition` is false.
    pub fn ensure(&mut self, condition: bool, field: impl Into<String>, message: impl Into<String>) {
        if !condition {
            self.fail(field, message);
        }
    }

    /// Non-blank text, trimmed.
    pub fn required_text(&mut self, field: &str, label: &str, value: &str) -> String {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            self.fail(field, format!("{label} is required"));
        }
        trimmed.to_string()
    }

    /// Optional text: trimmed, blank becomes `None`.
    pub fn optional_text(&mut self, value: Option<&str>) -> Option<String> {
        value
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    /// Text that is only required when `condition` holds (e.g. a "Yes" radio).
    ///
    /// When the condition is false the value is dropped so stale answers from a
    /// previous "Yes" do not leak into the payload.
    pub fn required_if(
        &mut self,
        condition: bool,
        field: &str,
        label: &str,
        value: Option<&str>,
    ) -> Option<String> {
        if !condition {
            return None;
        }
        let value = self.optional_text(value);
        if value.is_none() {
            self.fail(field, format!("{label} is required"));
        }
        value
    }

    /// Canonical email; on failure the trimmed input is returned.
    pub fn email(&mut self, field: &str, value: &str) -> String {
        match EmailAddress::parse(value) {
            Ok(email) => email.into_inner(),
            Err(err) => {
                self.fail(field, domain_message(err));
                value.trim().to_string()
            }
        }
    }

    /// Canonical phone number; on failure the trimmed input is returned.
    pub fn phone(&mut self, field: &str, value: &str) -> String {
        match PhoneNumber::parse(value) {
            Ok(phone) => phone.into_inner(),
            Err(err) => {
                self.fail(field, domain_message(err));
                value.trim().to_string()
            }
        }
    }

    /// Acknowledgment checkboxes must be ticked.
    pub fn must_be_true(&mut self, field: &str, value: bool, message: &str) {
        self.ensure(value, field, message);
    }

    pub fn in_range<T>(&mut self, field: &str, label: &str, value: T, min: T, max: T)
    where
        T: PartialOrd + core::fmt::Display,
    {
        if value < min || value > max {
            self.fail(field, format!("{label} must be between {min} and {max}"));
        }
    }

    pub fn non_empty<T>(&mut self, field: &str, items: &[T], message: &str) {
        self.ensure(!items.is_empty(), field, message);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Ok(value) when no check failed.
    pub fn finish<T>(self, value: T) -> Result<T, ValidationErrors> {
        if self.errors.is_empty() {
            Ok(value)
        } else {
            Err(self.errors)
        }
    }
}

fn domain_message(err: crate::error::DomainError) -> String {
    match err {
        crate::error::DomainError::Validation(msg) => msg,
        other => other.to_string(),
    }
}
