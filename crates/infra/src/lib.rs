//! Infrastructure layer: draft files, the submissions database, the advisor
//! notification service and environment configuration.

pub mod backend;
pub mod config;
pub mod draft_storage;
pub mod notify;
pub mod services;

pub use backend::PostgresSubmissionBackend;
pub use config::{ConfigError, IntakeConfig};
pub use draft_storage::FileDraftStorage;
pub use notify::{HttpNotifier, LogNotifier};
