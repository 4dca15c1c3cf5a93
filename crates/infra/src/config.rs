//! Runtime configuration from `INTAKE_*` environment variables.
//!
//! Everything is optional: without a database the submission backend is
//! in-memory, without a notification endpoint notifications are only logged.
//! Fallbacks are logged at `warn` so a misconfigured deployment is visible.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use tracing::warn;
use url::Url;

use intake_wizard::{DEFAULT_NOTIFY_TIMEOUT, RemoteDraftPolicy};

pub const DRAFT_DIR: &str = "INTAKE_DRAFT_DIR";
pub const DATABASE_URL: &str = "INTAKE_DATABASE_URL";
pub const NOTIFY_URL: &str = "INTAKE_NOTIFY_URL";
pub const NOTIFY_TOKEN: &str = "INTAKE_NOTIFY_TOKEN";
pub const NOTIFY_TIMEOUT_SECS: &str = "INTAKE_NOTIFY_TIMEOUT_SECS";
pub const REMOTE_DRAFTS: &str = "INTAKE_REMOTE_DRAFTS";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} is not a valid url: {reason}")]
    InvalidUrl { var: &'static str, reason: String },
    #[error("{var} must be a whole number of seconds greater than zero, got '{value}'")]
    InvalidTimeout { var: &'static str, value: String },
    #[error("{var} must be true or false, got '{value}'")]
    InvalidFlag { var: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntakeConfig {
    /// `None` resolves to the OS data directory.
    pub draft_dir: Option<PathBuf>,
    pub database_url: Option<String>,
    pub notify_url: Option<Url>,
    pub notify_token: Option<String>,
    pub notify_timeout: Duration,
    pub remote_drafts: bool,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            draft_dir: None,
            database_url: None,
            notify_url: None,
            notify_token: None,
            notify_timeout: DEFAULT_NOTIFY_TIMEOUT,
            remote_drafts: false,
        }
    }
}

impl IntakeConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable source. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let database_url = get(DATABASE_URL);
        if database_url.is_none() {
            warn!("{DATABASE_URL} not set; submissions are kept in memory only");
        }

        let notify_url = match get(NOTIFY_URL) {
            Some(raw) => Some(Url::parse(&raw).map_err(|e| ConfigError::InvalidUrl {
                var: NOTIFY_URL,
                reason: e.to_string(),
            })?),
            None => {
                warn!("{NOTIFY_URL} not set; advisor notifications are logged, not sent");
                None
            }
        };

        let notify_timeout = match get(NOTIFY_TIMEOUT_SECS) {
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError::InvalidTimeout {
                        var: NOTIFY_TIMEOUT_SECS,
                        value: raw,
                    });
                }
            },
            None => DEFAULT_NOTIFY_TIMEOUT,
        };

        let remote_drafts = match get(REMOTE_DRAFTS) {
            Some(raw) => parse_flag(&raw).ok_or(ConfigError::InvalidFlag {
                var: REMOTE_DRAFTS,
                value: raw,
            })?,
            None => false,
        };

        Ok(Self {
            draft_dir: get(DRAFT_DIR).map(PathBuf::from),
            database_url,
            notify_url,
            notify_token: get(NOTIFY_TOKEN),
            notify_timeout,
            remote_drafts,
        })
    }

    pub fn with_draft_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.draft_dir = Some(dir.into());
        self
    }

    pub fn with_database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = Some(url.into());
        self
    }

    pub fn with_notify_url(mut self, url: Url) -> Self {
        self.notify_url = Some(url);
        self
    }

    pub fn with_notify_timeout(mut self, timeout: Duration) -> Self {
        self.notify_timeout = timeout;
        self
    }

    pub fn with_remote_drafts(mut self, enabled: bool) -> Self {
        self.remote_drafts = enabled;
        self
    }

    pub fn remote_draft_policy(&self) -> RemoteDraftPolicy {
        if self.remote_drafts {
            RemoteDraftPolicy::Sync
        } else {
            RemoteDraftPolicy::Disabled
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<IntakeConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        IntakeConfig::from_lookup(|k| vars.get(k).cloned())
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg, IntakeConfig::default());
        assert_eq!(cfg.notify_timeout, Duration::from_secs(15));
        assert_eq!(cfg.remote_draft_policy(), RemoteDraftPolicy::Disabled);
    }

    #[test]
    fn reads_every_variable() {
        let cfg = config(&[
            (DRAFT_DIR, "/var/lib/intake"),
            (DATABASE_URL, "postgres://intake@localhost/intake"),
            (NOTIFY_URL, "https://mail.example.com/notify"),
            (NOTIFY_TOKEN, "abc"),
            (NOTIFY_TIMEOUT_SECS, "5"),
            (REMOTE_DRAFTS, "yes"),
        ])
        .unwrap();

        assert_eq!(cfg.draft_dir, Some(PathBuf::from("/var/lib/intake")));
        assert_eq!(cfg.database_url.as_deref(), Some("postgres://intake@localhost/intake"));
        assert_eq!(cfg.notify_url.unwrap().host_str(), Some("mail.example.com"));
        assert_eq!(cfg.notify_token.as_deref(), Some("abc"));
        assert_eq!(cfg.notify_timeout, Duration::from_secs(5));
        assert!(cfg.remote_drafts);
    }

    #[test]
    fn blank_values_count_as_unset() {
        let cfg = config(&[(DATABASE_URL, "  "), (NOTIFY_TIMEOUT_SECS, "")]).unwrap();
        assert_eq!(cfg.database_url, None);
        assert_eq!(cfg.notify_timeout, DEFAULT_NOTIFY_TIMEOUT);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            config(&[(NOTIFY_URL, "not a url")]),
            Err(ConfigError::InvalidUrl { .. })
        ));
        assert!(matches!(
            config(&[(NOTIFY_TIMEOUT_SECS, "0")]),
            Err(ConfigError::InvalidTimeout { .. })
        ));
        assert!(matches!(
            config(&[(NOTIFY_TIMEOUT_SECS, "ten")]),
            Err(ConfigError::InvalidTimeout { .. })
        ));
        assert_eq!(
            config(&[(REMOTE_DRAFTS, "maybe")]),
            Err(ConfigError::InvalidFlag {
                var: REMOTE_DRAFTS,
                value: "maybe".into()
            })
        );
    }

    #[test]
    fn builders_override() {
        let cfg = IntakeConfig::default()
            .with_notify_timeout(Duration::from_secs(3))
            .with_remote_drafts(true)
            .with_draft_dir("/tmp/drafts");
        assert_eq!(cfg.remote_draft_policy(), RemoteDraftPolicy::Sync);
        assert_eq!(cfg.notify_timeout, Duration::from_secs(3));
    }
}
