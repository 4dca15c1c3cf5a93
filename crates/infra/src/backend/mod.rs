//! Submission backend adapters.

pub mod postgres;

pub use postgres::PostgresSubmissionBackend;
