//! `intake-runner`: drive the intake wizards from the command line.
//!
//! ```bash
//! # Replay a scripted session against the configured adapters
//! intake-runner run prequalification demos/prequalification.json
//!
//! # Same, without touching disk, database or network
//! intake-runner run estate-planning demos/estate-planning.json --dry-run
//!
//! # Inspect or discard the saved draft of a wizard
//! intake-runner show-draft life-insurance
//! intake-runner clear-draft life-insurance
//! ```
//!
//! Adapters come from `INTAKE_*` environment variables (see
//! `intake_infra::config`); flags override them.

mod script;
mod session;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};

use intake_forms::{EstatePlanningWizard, LifeInsuranceWizard, PrequalificationWizard};
use intake_infra::{IntakeConfig, services};
use intake_observability::{LogFormat, LogSettings};
use intake_wizard::{
    DraftStorage, DraftStore, InMemoryDraftStorage, InMemorySubmissionBackend, RemoteDraftPolicy,
    SubmissionPipeline, Wizard, WizardKind,
};

use crate::script::Script;
use crate::session::RunReport;

#[derive(Parser)]
#[command(name = "intake-runner")]
#[command(version)]
#[command(about = "Run advisory intake wizards from scripted sessions")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log format: json or text
    #[arg(long, global = true, default_value = "text")]
    log_format: LogFormat,

    /// Draft directory (overrides INTAKE_DRAFT_DIR)
    #[arg(long, global = true)]
    draft_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a script through a wizard and print a JSON report
    Run {
        /// estate-planning, prequalification or life-insurance
        wizard: WizardKind,

        /// Script file
        script: PathBuf,

        /// Use in-memory drafts, backend and notifier
        #[arg(long)]
        dry_run: bool,

        /// Mirror completed steps to a draft row in the backend
        #[arg(long)]
        remote_drafts: bool,

        /// Notification timeout in seconds (overrides INTAKE_NOTIFY_TIMEOUT_SECS)
        #[arg(long)]
        notify_timeout_secs: Option<u64>,
    },

    /// Print the saved draft of a wizard
    ShowDraft { wizard: WizardKind },

    /// Delete the saved draft of a wizard
    ClearDraft { wizard: WizardKind },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    intake_observability::tracing::init(&LogSettings::default().with_format(cli.log_format));

    match execute(cli).await {
        Ok(code) => code,
        Err(err) => {
            tracing::error!(error = %format!("{err:#}"), "intake-runner failed");
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn execute(cli: Cli) -> anyhow::Result<ExitCode> {
    let mut config = IntakeConfig::from_env().context("invalid INTAKE_* configuration")?;
    if let Some(dir) = cli.draft_dir {
        config = config.with_draft_dir(dir);
    }

    match cli.command {
        Commands::Run {
            wizard,
            script,
            dry_run,
            remote_drafts,
            notify_timeout_secs,
        } => {
            if let Some(secs) = notify_timeout_secs {
                config = config.with_notify_timeout(Duration::from_secs(secs));
            }
            if remote_drafts {
                config = config.with_remote_drafts(true);
            }

            let report = match wizard {
                WizardKind::EstatePlanning => run::<EstatePlanningWizard>(&config, &script, dry_run).await?,
                WizardKind::Prequalification => {
                    run::<PrequalificationWizard>(&config, &script, dry_run).await?
                }
                WizardKind::LifeInsurance => run::<LifeInsuranceWizard>(&config, &script, dry_run).await?,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(if report.submitted() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(2)
            })
        }
        Commands::ShowDraft { wizard } => {
            let storage = services::draft_storage(&config)?;
            let draft = match wizard {
                WizardKind::EstatePlanning => show_draft::<EstatePlanningWizard>(storage)?,
                WizardKind::Prequalification => show_draft::<PrequalificationWizard>(storage)?,
                WizardKind::LifeInsurance => show_draft::<LifeInsuranceWizard>(storage)?,
            };
            match draft {
                Some(json) => println!("{json}"),
                None => println!("no saved draft for {wizard}"),
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::ClearDraft { wizard } => {
            let storage = services::draft_storage(&config)?;
            let drafts = DraftStore::new(storage);
            let existed = drafts.exists(wizard.draft_key());
            drafts.clear(wizard.draft_key());
            if existed {
                println!("cleared draft for {wizard}");
            } else {
                println!("no saved draft for {wizard}");
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn run<W: Wizard>(
    config: &IntakeConfig,
    script_path: &std::path::Path,
    dry_run: bool,
) -> anyhow::Result<RunReport> {
    let script = Script::<W::Payload>::load(script_path)?;
    let context = script.context()?;
    let actions = script.into_actions();

    let (storage, pipeline): (Arc<dyn DraftStorage>, SubmissionPipeline) = if dry_run {
        tracing::info!(wizard = %W::KIND, "dry run: in-memory drafts, backend and notifier");
        let pipeline = SubmissionPipeline::new(
            Arc::new(InMemorySubmissionBackend::new()),
            services::notifier(&IntakeConfig::default()),
        )
        .with_notify_timeout(config.notify_timeout);
        (Arc::new(InMemoryDraftStorage::new()), pipeline)
    } else {
        let storage = services::draft_storage(config)?;
        let pipeline = services::submission_pipeline(config).await?;
        (Arc::new(storage), pipeline)
    };

    Ok(session::run::<W, _>(storage, pipeline, context, config.remote_draft_policy(), actions).await)
}

fn show_draft<W: Wizard>(storage: impl DraftStorage) -> anyhow::Result<Option<String>> {
    session::load_draft::<W, _>(storage)
        .map(|draft| serde_json::to_string_pretty(&draft))
        .transpose()
        .context("failed to render draft")
}
