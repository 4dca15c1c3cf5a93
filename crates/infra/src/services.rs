//! Adapter wiring: turn an [`IntakeConfig`] into a draft storage and a
//! submission pipeline.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use intake_wizard::{InMemorySubmissionBackend, Notifier, SubmissionBackend, SubmissionPipeline};

use crate::backend::PostgresSubmissionBackend;
use crate::config::IntakeConfig;
use crate::draft_storage::FileDraftStorage;
use crate::notify::{HttpNotifier, LogNotifier};

pub fn draft_dir(config: &IntakeConfig) -> anyhow::Result<PathBuf> {
    match &config.draft_dir {
        Some(dir) => Ok(dir.clone()),
        None => FileDraftStorage::default_dir(),
    }
}

pub fn draft_storage(config: &IntakeConfig) -> anyhow::Result<FileDraftStorage> {
    let dir = draft_dir(config)?;
    FileDraftStorage::open(dir)
}

pub async fn submission_backend(config: &IntakeConfig) -> anyhow::Result<Arc<dyn SubmissionBackend>> {
    match &config.database_url {
        Some(url) => {
            let backend = PostgresSubmissionBackend::connect(url)
                .await
                .context("failed to connect to the submissions database")?;
            backend
                .migrate()
                .await
                .context("failed to prepare the submissions table")?;
            info!("submissions stored in postgres");
            Ok(Arc::new(backend))
        }
        None => Ok(Arc::new(InMemorySubmissionBackend::new())),
    }
}

pub fn notifier(config: &IntakeConfig) -> Arc<dyn Notifier> {
    match &config.notify_url {
        Some(url) => {
            let mut notifier = HttpNotifier::new(url.clone());
            if let Some(token) = &config.notify_token {
                notifier = notifier.with_token(token.clone());
            }
            info!(endpoint = %url, "advisor notifications sent over http");
            Arc::new(notifier)
        }
        None => Arc::new(LogNotifier),
    }
}

pub async fn submission_pipeline(config: &IntakeConfig) -> anyhow::Result<SubmissionPipeline> {
    let backend = submission_backend(config).await?;
    Ok(SubmissionPipeline::new(backend, notifier(config)).with_notify_timeout(config.notify_timeout))
}
