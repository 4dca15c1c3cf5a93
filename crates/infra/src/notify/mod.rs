//! Notifier adapters for the advisor email service.

pub mod http;
pub mod log;

pub use http::HttpNotifier;
pub use log::LogNotifier;
