//! Draft storage adapters.

pub mod file;

pub use file::FileDraftStorage;
