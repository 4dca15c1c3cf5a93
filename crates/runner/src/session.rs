//! Drive one wizard session from a script and summarize what happened.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{info, warn};

use intake_core::{SubmissionId, ValidationErrors};
use intake_wizard::{
    DraftSnapshot, DraftStorage, DraftStore, NotificationOutcome, RemoteDraftPolicy,
    ScriptedView, StepAction, StepNumber, StepOutcome, SubmissionContext, SubmissionPipeline,
    SubmissionRecord, UiEffect, Wizard, WizardController, WizardError, WizardKind, WizardPhase,
};

/// An action the controller refused.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Rejection {
    pub step: StepNumber,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<ValidationErrors>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub wizard: WizardKind,
    pub resumed: bool,
    pub phase: String,
    pub current_step: StepNumber,
    pub completed_steps: BTreeSet<StepNumber>,
    pub progress_percent: u8,
    pub rejections: Vec<Rejection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submission_id: Option<SubmissionId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<String>,
    pub ignored_actions: usize,
}

impl RunReport {
    pub fn submitted(&self) -> bool {
        self.submission_id.is_some()
    }
}

fn phase_label(phase: WizardPhase) -> String {
    match phase {
        WizardPhase::Step(step) => format!("step {step}"),
        WizardPhase::Submitting => "submitting".to_string(),
        WizardPhase::Done => "done".to_string(),
    }
}

fn notification_label(outcome: &NotificationOutcome) -> String {
    match outcome {
        NotificationOutcome::Delivered => "delivered".to_string(),
        NotificationOutcome::Failed(reason) => format!("failed: {reason}"),
        NotificationOutcome::TimedOut => "timed out".to_string(),
    }
}

pub async fn run<W, S>(
    storage: S,
    pipeline: SubmissionPipeline,
    context: SubmissionContext,
    remote_drafts: RemoteDraftPolicy,
    actions: Vec<StepAction<W::Payload>>,
) -> RunReport
where
    W: Wizard,
    S: DraftStorage,
{
    let mut controller = WizardController::<W, S>::new(storage, pipeline, context)
        .with_remote_drafts(remote_drafts)
        .on_complete(Box::new(|record: &SubmissionRecord| {
            info!(
                form_type = %record.form_type,
                applicant = record.applicant_name.as_deref().unwrap_or("-"),
                "submission complete"
            );
        }));
    let resumed = controller.resumed();
    let mut view = ScriptedView::new(actions);
    let mut rejections = Vec::new();
    let mut submission = None;

    while view.remaining() > 0 && controller.phase() != WizardPhase::Done {
        let step = controller.current_step();
        match controller.drive(&mut view).await {
            Ok(StepOutcome::Submitted(receipt)) => {
                submission = Some((receipt.submission_id, notification_label(&receipt.notification)));
            }
            Ok(_) => {}
            Err(err) => {
                warn!(wizard = %W::KIND, %step, error = %err, "action rejected");
                rejections.push(rejection(step, &err));
            }
        }

        for effect in controller.drain_effects() {
            if let UiEffect::ShowError(message) = effect {
                warn!(wizard = %W::KIND, %message, "submission error shown");
            }
        }
    }

    let ignored_actions = view.remaining();
    if ignored_actions > 0 {
        warn!(wizard = %W::KIND, ignored_actions, "wizard finished before the script did");
    }

    let state = controller.state();
    RunReport {
        wizard: W::KIND,
        resumed,
        phase: phase_label(controller.phase()),
        current_step: controller.current_step(),
        completed_steps: state.completed_steps().clone(),
        progress_percent: state.progress_percent(),
        rejections,
        submission_id: submission.as_ref().map(|(id, _)| *id),
        notification: submission.map(|(_, label)| label),
        ignored_actions,
    }
}

fn rejection(step: StepNumber, err: &WizardError) -> Rejection {
    let message = match err {
        WizardError::Submission(submission) => submission.user_message().to_string(),
        other => other.to_string(),
    };
    Rejection {
        step,
        message,
        fields: err.field_errors().cloned(),
    }
}

/// The stored draft of `W`, if any.
pub fn load_draft<W, S>(storage: S) -> Option<DraftSnapshot<W::Payload>>
where
    W: Wizard,
    S: DraftStorage,
{
    DraftStore::new(storage).load::<W::Payload>(W::KIND.draft_key())
}
