//! Value objects: equality by value, not identity.
//!
//! Value objects are immutable and compared by their attributes. The ones in
//! this module normalize their input on construction so that two spellings of
//! the same email or phone number compare equal.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is a valid regex")
});

/// Lower-cased, trimmed email address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmailAddress(String);

impl EmailAddress {
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let normalized = raw.trim().to_lowercase();
        if normalized.is_empty() {
            return Err(DomainError::validation("email is required"));
        }
        if !EMAIL_RE.is_match(&normalized) {
            return Err(DomainError::validation("please enter a valid email address"));
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl core::fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// North American phone number, stored as `(AAA) EEE-NNNN`.
///
/// Accepts any punctuation and an optional leading country code `1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
        let national = match digits.len() {
            10 => digits.as_str(),
            11 if digits.starts_with('1') => &digits[1..],
            0 => return Err(DomainError::validation("phone number is required")),
            _ => {
                return Err(DomainError::validation(
                    "please enter a valid 10-digit phone number",
                ));
            }
        };

        Ok(Self(format!(
            "({}) {}-{}",
            &national[0..3],
            &national[3..6],
            &national[6..10]
        )))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl core::fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whole-number percentage in `0..=100`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Percentage(u8);

impl Percentage {
    pub const FULL: Percentage = Percentage(100);

    pub fn new(value: u32) -> DomainResult<Self> {
        if value > 100 {
            return Err(DomainError::validation(format!(
                "percentage must be between 0 and 100 (got {value})"
            )));
        }
        Ok(Self(value as u8))
    }

    pub fn value(self) -> u32 {
        u32::from(self.0)
    }

    /// Sum of a list of shares. Returned as `u32` since the sum may exceed 100.
    pub fn total<I>(shares: I) -> u32
    where
        I: IntoIterator<Item = u32>,
    {
        shares.into_iter().fold(0u32, |acc, s| acc.saturating_add(s))
    }
}

impl TryFrom<u32> for Percentage {
    type Error = DomainError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Percentage> for u32 {
    fn from(value: Percentage) -> Self {
        value.value()
    }
}
