//! `intake-core` — building blocks shared by every intake wizard.
//!
//! This crate contains **pure** primitives (no IO, no async): error types,
//! identifiers, value objects, field validation and the aggregate contract the
//! wizard state machine is written against.

pub mod aggregate;
pub mod error;
pub mod id;
pub mod validation;
pub mod value_object;

pub use aggregate::{Aggregate, AggregateRoot};
pub use error::{DomainError, DomainResult};
pub use id::{AdvisorId, SubmissionId};
pub use validation::{FieldChecks, ValidationErrors};
pub use value_object::{EmailAddress, Percentage, PhoneNumber};
