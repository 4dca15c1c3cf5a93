//! Wizard controller: owns one session's state and runs the side effects
//! around each transition (autosave, remote draft sync, submission, UI
//! effects).

use std::marker::PhantomData;

use chrono::Utc;
use tracing::{debug, info, warn};

use intake_core::{Aggregate, ValidationErrors};

use crate::definition::Wizard;
use crate::draft::{DraftStorage, DraftStore};
use crate::error::WizardError;
use crate::pipeline::{SubmissionError, SubmissionPipeline, SubmissionReceipt};
use crate::state::{WizardCommand, WizardPhase, WizardState};
use crate::step::{StepKind, StepNumber, StepPayload, StepRegistry};
use crate::submission::{SubmissionContext, SubmissionRecord, SubmissionStatus};
use crate::view::{StepAction, StepContext, StepView};

/// Invoked once with the full record after a successful submission.
pub type CompletionCallback = Box<dyn Fn(&SubmissionRecord) + Send + Sync>;

/// Whether completed steps are mirrored to a `draft` row in the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RemoteDraftPolicy {
    #[default]
    Disabled,
    Sync,
}

/// Side effects for the hosting UI, drained with
/// [`WizardController::drain_effects`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEffect {
    ScrollToTop,
    ShowSubmitting,
    HideSubmitting,
    ShowSuccess,
    /// Retry-oriented message for the applicant.
    ShowError(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    Advanced { to: StepNumber },
    Moved { to: StepNumber },
    Submitted(SubmissionReceipt),
    Unchanged,
}

pub struct WizardController<W: Wizard, S: DraftStorage> {
    state: WizardState<W::Payload>,
    registry: StepRegistry,
    drafts: DraftStore<S>,
    pipeline: SubmissionPipeline,
    context: SubmissionContext,
    remote_drafts: RemoteDraftPolicy,
    on_complete: Option<CompletionCallback>,
    effects: Vec<UiEffect>,
    last_errors: Option<(StepNumber, ValidationErrors)>,
    resumed: bool,
    _wizard: PhantomData<fn() -> W>,
}

impl<W: Wizard, S: DraftStorage> WizardController<W, S> {
    /// Open a session, resuming the stored draft when there is a usable one.
    pub fn new(storage: S, pipeline: SubmissionPipeline, context: SubmissionContext) -> Self {
        let registry = W::registry();
        let drafts = DraftStore::new(storage);
        let key = W::KIND.draft_key();

        let (state, resumed) = match drafts.load::<W::Payload>(key) {
            Some(snapshot) => match WizardState::restore(W::KIND, &registry, snapshot) {
                Ok(state) => {
                    info!(
                        wizard = %W::KIND,
                        step = %state.current_step(),
                        completed = state.completed_steps().len(),
                        "resuming saved draft"
                    );
                    (state, true)
                }
                Err(err) => {
                    warn!(wizard = %W::KIND, error = %err, "ignoring unusable draft");
                    (WizardState::new(W::KIND, &registry), false)
                }
            },
            None => (WizardState::new(W::KIND, &registry), false),
        };

        Self {
            state,
            registry,
            drafts,
            pipeline,
            context,
            remote_drafts: RemoteDraftPolicy::Disabled,
            on_complete: None,
            effects: Vec::new(),
            last_errors: None,
            resumed,
            _wizard: PhantomData,
        }
    }

    pub fn with_remote_drafts(mut self, policy: RemoteDraftPolicy) -> Self {
        self.remote_drafts = policy;
        self
    }

    pub fn on_complete(mut self, callback: CompletionCallback) -> Self {
        self.on_complete = Some(callback);
        self
    }

    pub fn state(&self) -> &WizardState<W::Payload> {
        &self.state
    }

    pub fn registry(&self) -> &StepRegistry {
        &self.registry
    }

    pub fn current_step(&self) -> StepNumber {
        self.state.current_step()
    }

    pub fn phase(&self) -> WizardPhase {
        self.state.phase()
    }

    /// Whether this session was rehydrated from a stored draft.
    pub fn resumed(&self) -> bool {
        self.resumed
    }

    pub fn drafts(&self) -> &DraftStore<S> {
        &self.drafts
    }

    /// Field errors of the last rejected attempt at the current step.
    pub fn last_errors(&self) -> Option<&ValidationErrors> {
        self.last_errors
            .as_ref()
            .filter(|(step, _)| *step == self.state.current_step())
            .map(|(_, errors)| errors)
    }

    /// Live gating for the current step's advance affordance.
    pub fn can_advance(&self, payload: &W::Payload) -> bool {
        payload.step() == self.state.current_step() && payload.is_submittable()
    }

    pub fn drain_effects(&mut self) -> Vec<UiEffect> {
        std::mem::take(&mut self.effects)
    }

    pub fn step_context(&self) -> StepContext<'_, W::Payload> {
        let step = self.state.current_step();
        let descriptor = self.registry.get(step);
        StepContext {
            step,
            last_step: self.state.last_step(),
            title: descriptor.map_or("", |d| d.title),
            kind: descriptor.map_or(StepKind::Form, |d| d.kind),
            data: self.state.form_data().get(step),
            form_data: self.state.form_data(),
            can_go_back: step.previous().is_some(),
            progress_percent: self.state.progress_percent(),
            errors: self.last_errors(),
        }
    }

    /// Validate and record `payload` for `step`, then advance or submit.
    pub async fn complete_step(
        &mut self,
        step: StepNumber,
        payload: W::Payload,
    ) -> Result<StepOutcome, WizardError> {
        let command = WizardCommand::CompleteStep { step, payload };
        if let Err(err) = self.state.execute(&command) {
            debug!(wizard = %W::KIND, %step, error = %err, "step rejected");
            if let WizardError::Validation { step, errors } = &err {
                self.last_errors = Some((*step, errors.clone()));
            }
            return Err(err);
        }
        self.last_errors = None;
        self.autosave();

        if self.state.phase() == WizardPhase::Submitting {
            return self.submit().await;
        }

        self.sync_remote_draft().await;
        self.effects.push(UiEffect::ScrollToTop);
        let to = self.state.current_step();
        debug!(wizard = %W::KIND, from = %step, %to, "step completed");
        Ok(StepOutcome::Advanced { to })
    }

    pub fn go_back(&mut self) -> Result<StepOutcome, WizardError> {
        self.state.execute(&WizardCommand::GoBack)?;
        Ok(self.moved())
    }

    /// Random-access jump, without re-validation.
    pub fn go_to_step(&mut self, step: StepNumber) -> Result<StepOutcome, WizardError> {
        let events = self.state.execute(&WizardCommand::GoToStep(step))?;
        if events.is_empty() {
            return Ok(StepOutcome::Unchanged);
        }
        Ok(self.moved())
    }

    /// Re-submit the final step with the data already recorded for it.
    pub async fn retry_submission(&mut self) -> Result<StepOutcome, WizardError> {
        let last = self.state.last_step();
        let payload = self
            .state
            .form_data()
            .get(last)
            .cloned()
            .ok_or(WizardError::NothingToRetry)?;
        self.complete_step(last, payload).await
    }

    /// Route a view's action to the matching transition.
    pub async fn dispatch(
        &mut self,
        action: StepAction<W::Payload>,
    ) -> Result<StepOutcome, WizardError> {
        match action {
            StepAction::Next(payload) => {
                let step = self.state.current_step();
                self.complete_step(step, payload).await
            }
            StepAction::Back => self.go_back(),
            StepAction::GoToStep(step) => self.go_to_step(step),
            StepAction::Stay => Ok(StepOutcome::Unchanged),
        }
    }

    /// Render the current step with `view` and dispatch its answer.
    pub async fn drive<V>(&mut self, view: &mut V) -> Result<StepOutcome, WizardError>
    where
        V: StepView<W::Payload> + ?Sized,
    {
        let action = view.render(&self.step_context());
        self.dispatch(action).await
    }

    fn moved(&mut self) -> StepOutcome {
        self.autosave();
        self.effects.push(UiEffect::ScrollToTop);
        let to = self.state.current_step();
        debug!(wizard = %W::KIND, %to, "navigated");
        StepOutcome::Moved { to }
    }

    fn autosave(&mut self) {
        let now = Utc::now();
        let snapshot = self.state.snapshot(now);
        if self.drafts.save(W::KIND.draft_key(), &snapshot) {
            self.state.mark_saved(now);
        }
    }

    fn assemble(&self, status: SubmissionStatus) -> Result<SubmissionRecord, SubmissionError> {
        let form = self.state.form_data();
        let form_data = form
            .to_json()
            .map_err(|e| SubmissionError::Assemble(e.to_string()))?;
        Ok(SubmissionRecord::assemble(
            W::KIND.form_type(),
            status,
            W::applicant(form),
            form_data,
            self.state.current_step(),
            &self.context,
            Utc::now(),
        ))
    }

    async fn sync_remote_draft(&mut self) {
        if self.remote_drafts != RemoteDraftPolicy::Sync {
            return;
        }
        let record = match self.assemble(SubmissionStatus::Draft) {
            Ok(record) => record,
            Err(err) => {
                warn!(wizard = %W::KIND, error = %err, "could not build remote draft");
                return;
            }
        };

        let existing = self.state.remote_draft_id();
        match self.pipeline.save_draft(&record, existing).await {
            Ok(id) if existing == Some(id) => {
                debug!(wizard = %W::KIND, %id, "remote draft updated");
            }
            Ok(id) => {
                debug!(wizard = %W::KIND, %id, "remote draft created");
                self.state.link_remote_draft(id);
                self.autosave();
            }
            Err(err) => {
                warn!(wizard = %W::KIND, error = %err, "remote draft sync failed");
            }
        }
    }

    async fn submit(&mut self) -> Result<StepOutcome, WizardError> {
        self.effects.push(UiEffect::ShowSubmitting);
        info!(wizard = %W::KIND, "submitting");

        let result = match self.assemble(SubmissionStatus::Submitted) {
            Ok(record) => {
                self.pipeline
                    .submit(record, self.state.remote_draft_id())
                    .await
            }
            Err(err) => Err(err),
        };

        match result {
            Ok(receipt) => {
                self.state.execute(&WizardCommand::RecordSubmissionSuccess {
                    submission_id: receipt.submission_id,
                })?;
                self.drafts.clear(W::KIND.draft_key());
                self.effects.push(UiEffect::HideSubmitting);
                self.effects.push(UiEffect::ShowSuccess);
                if let Some(callback) = &self.on_complete {
                    callback(&receipt.record);
                }
                info!(
                    wizard = %W::KIND,
                    submission_id = %receipt.submission_id,
                    "submission complete"
                );
                Ok(StepOutcome::Submitted(receipt))
            }
            Err(err) => {
                self.state.execute(&WizardCommand::RecordSubmissionFailure {
                    reason: err.to_string(),
                })?;
                self.effects.push(UiEffect::HideSubmitting);
                self.effects.push(UiEffect::ShowError(err.user_message().to_string()));
                Err(WizardError::Submission(err))
            }
        }
    }
}

impl<W: Wizard, S: DraftStorage> std::fmt::Debug for WizardController<W, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WizardController")
            .field("kind", &W::KIND)
            .field("state", &self.state)
            .field("remote_drafts", &self.remote_drafts)
            .field("resumed", &self.resumed)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use crate::draft::DraftSnapshot;
    use crate::fixtures::{TestStep, TestWizard, confirm, contact, shares};
    use crate::in_memory::{
        InMemoryDraftStorage, InMemorySubmissionBackend, NotifierMode, RecordingNotifier,
    };
    use crate::pipeline::NotificationOutcome;
    use crate::state::SubmissionProgress;
    use crate::view::ScriptedView;

    type Controller = WizardController<TestWizard, Arc<InMemoryDraftStorage>>;

    const KEY: &str = "prequalification-draft";

    struct Harness {
        storage: Arc<InMemoryDraftStorage>,
        backend: Arc<InMemorySubmissionBackend>,
        notifier: Arc<RecordingNotifier>,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                storage: Arc::new(InMemoryDraftStorage::new()),
                backend: Arc::new(InMemorySubmissionBackend::new()),
                notifier: Arc::new(RecordingNotifier::default()),
            }
        }

        fn controller(&self) -> Controller {
            let pipeline = SubmissionPipeline::new(self.backend.clone(), self.notifier.clone());
            WizardController::new(
                self.storage.clone(),
                pipeline,
                SubmissionContext::new("https://example.com/prequalify").unwrap(),
            )
        }

        fn draft(&self) -> Option<DraftSnapshot<TestStep>> {
            DraftStore::new(self.storage.clone()).load(KEY)
        }
    }

    async fn fill_first_two(controller: &mut Controller) {
        controller.complete_step(StepNumber::at(1), contact()).await.unwrap();
        controller.complete_step(StepNumber::at(2), shares(&[60, 40])).await.unwrap();
    }

    #[tokio::test]
    async fn fresh_session_without_draft() {
        let harness = Harness::new();
        let controller = harness.controller();
        assert!(!controller.resumed());
        assert_eq!(controller.current_step(), StepNumber::FIRST);
        assert!(harness.draft().is_none());
    }

    #[tokio::test]
    async fn completing_a_step_autosaves_and_scrolls() {
        let harness = Harness::new();
        let mut controller = harness.controller();

        let outcome = controller.complete_step(StepNumber::at(1), contact()).await.unwrap();

        assert_eq!(outcome, StepOutcome::Advanced { to: StepNumber::at(2) });
        assert_eq!(controller.drain_effects(), vec![UiEffect::ScrollToTop]);
        assert!(controller.state().last_saved_at().is_some());

        let draft = harness.draft().unwrap();
        assert_eq!(draft.current_step, StepNumber::at(2));
        assert_eq!(draft.form_data.get(StepNumber::FIRST), Some(&contact()));
    }

    #[tokio::test]
    async fn invalid_step_writes_no_draft() {
        let harness = Harness::new();
        let mut controller = harness.controller();

        let err = controller
            .complete_step(StepNumber::at(1), TestStep::Contact(crate::fixtures::Contact {
                name: "Jane".into(),
                email: "not-an-email".into(),
                phone: "(555) 123-4567".into(),
            }))
            .await
            .unwrap_err();

        assert!(err.field_errors().unwrap().contains("email"));
        assert!(controller.last_errors().unwrap().contains("email"));
        assert!(harness.draft().is_none());
        assert!(controller.drain_effects().is_empty());
    }

    #[tokio::test]
    async fn navigation_is_autosaved() {
        let harness = Harness::new();
        let mut controller = harness.controller();
        fill_first_two(&mut controller).await;

        controller.go_back().unwrap();
        assert_eq!(harness.draft().unwrap().current_step, StepNumber::at(2));

        assert_eq!(
            controller.go_to_step(StepNumber::at(2)).unwrap(),
            StepOutcome::Unchanged
        );
        controller.go_to_step(StepNumber::at(1)).unwrap();
        assert_eq!(harness.draft().unwrap().current_step, StepNumber::at(1));
    }

    #[tokio::test]
    async fn reload_resumes_where_the_applicant_left_off() {
        let harness = Harness::new();
        let mut first = harness.controller();
        fill_first_two(&mut first).await;
        drop(first);

        let mut controller = harness.controller();
        assert!(controller.resumed());
        assert_eq!(controller.current_step(), StepNumber::at(3));
        assert_eq!(
            controller.state().completed_steps().iter().copied().collect::<Vec<_>>(),
            vec![StepNumber::at(1), StepNumber::at(2)]
        );

        controller.go_to_step(StepNumber::at(1)).unwrap();
        assert_eq!(controller.step_context().data, Some(&contact()));
    }

    #[tokio::test]
    async fn unusable_draft_starts_fresh() {
        let harness = Harness::new();
        let mut snapshot = WizardState::<TestStep>::new(TestWizard::KIND, &TestWizard::registry())
            .snapshot(Utc::now());
        snapshot.current_step = StepNumber::at(7);
        DraftStore::new(harness.storage.clone()).save(KEY, &snapshot);

        let controller = harness.controller();
        assert!(!controller.resumed());
        assert_eq!(controller.current_step(), StepNumber::FIRST);
    }

    #[tokio::test(start_paused = true)]
    async fn end_to_end_with_hung_notifier() {
        let harness = Harness::new();
        harness.notifier.set_mode(NotifierMode::Hang);
        let completed = Arc::new(AtomicUsize::new(0));
        let seen = completed.clone();
        let mut controller = harness
            .controller()
            .on_complete(Box::new(move |_record: &SubmissionRecord| {
                seen.fetch_add(1, Ordering::SeqCst);
            }));

        fill_first_two(&mut controller).await;
        let outcome = controller.complete_step(StepNumber::at(3), confirm(true)).await.unwrap();

        let StepOutcome::Submitted(receipt) = outcome else {
            panic!("expected submission, got {outcome:?}");
        };
        assert_eq!(receipt.notification, NotificationOutcome::TimedOut);
        assert_eq!(controller.phase(), WizardPhase::Done);
        assert!(harness.draft().is_none());
        assert_eq!(completed.load(Ordering::SeqCst), 1);

        let rows = harness.backend.records();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].record.status, SubmissionStatus::Submitted);
        for key in ["step1", "step2", "step3"] {
            assert!(rows[0].record.form_data.get(key).is_some(), "missing {key}");
        }
        assert_eq!(rows[0].record.applicant_name.as_deref(), Some("Jane Doe"));

        let effects = controller.drain_effects();
        assert!(effects.contains(&UiEffect::ShowSuccess));
        assert_eq!(controller.go_back().unwrap_err(), WizardError::AlreadySubmitted);
    }

    #[tokio::test]
    async fn persist_failure_keeps_data_and_draft() {
        let harness = Harness::new();
        harness.backend.set_unavailable(true);
        let mut controller = harness.controller();
        fill_first_two(&mut controller).await;
        controller.drain_effects();

        let err = controller
            .complete_step(StepNumber::at(3), confirm(true))
            .await
            .unwrap_err();

        assert!(matches!(err, WizardError::Submission(SubmissionError::Persist(_))));
        assert_eq!(controller.phase(), WizardPhase::Step(StepNumber::at(3)));
        assert_eq!(controller.state().progress(), SubmissionProgress::Failed);
        assert_eq!(controller.state().form_data().len(), 3);
        assert!(harness.draft().is_some());
        assert!(harness.notifier.requests().is_empty());

        let effects = controller.drain_effects();
        assert_eq!(effects[0], UiEffect::ShowSubmitting);
        assert!(matches!(effects.last(), Some(UiEffect::ShowError(_))));

        harness.backend.set_unavailable(false);
        let outcome = controller.retry_submission().await.unwrap();
        assert!(matches!(outcome, StepOutcome::Submitted(_)));
        assert!(harness.draft().is_none());
        assert_eq!(harness.backend.len(), 1);
    }

    #[tokio::test]
    async fn skipping_ahead_cannot_submit_a_partial_record() {
        let harness = Harness::new();
        let mut controller = harness.controller();
        controller.complete_step(StepNumber::at(1), contact()).await.unwrap();
        controller.go_to_step(StepNumber::at(3)).unwrap();
        controller.drain_effects();

        let err = controller
            .complete_step(StepNumber::at(3), confirm(true))
            .await
            .unwrap_err();

        assert_eq!(err, WizardError::IncompleteSteps(vec![StepNumber::at(2)]));
        assert_eq!(controller.phase(), WizardPhase::Step(StepNumber::at(3)));
        assert!(harness.backend.is_empty());
        assert!(harness.notifier.requests().is_empty());
        assert!(controller.drain_effects().is_empty());

        let draft = harness.draft().unwrap();
        assert_eq!(draft.current_step, StepNumber::at(3));
        assert!(draft.form_data.get(StepNumber::at(3)).is_none());

        controller.go_to_step(StepNumber::at(2)).unwrap();
        controller.complete_step(StepNumber::at(2), shares(&[100])).await.unwrap();
        let outcome = controller.complete_step(StepNumber::at(3), confirm(true)).await.unwrap();
        assert!(matches!(outcome, StepOutcome::Submitted(_)));
        assert_eq!(harness.backend.len(), 1);
    }

    #[tokio::test]
    async fn retry_without_final_step_data_is_rejected() {
        let harness = Harness::new();
        let mut controller = harness.controller();
        fill_first_two(&mut controller).await;

        let err = controller.retry_submission().await.unwrap_err();

        assert_eq!(err, WizardError::NothingToRetry);
        assert_eq!(controller.phase(), WizardPhase::Step(StepNumber::at(3)));
        assert!(harness.backend.is_empty());
    }

    #[tokio::test]
    async fn remote_draft_row_follows_the_session() {
        let harness = Harness::new();
        let mut controller = harness.controller().with_remote_drafts(RemoteDraftPolicy::Sync);

        controller.complete_step(StepNumber::at(1), contact()).await.unwrap();
        let draft_id = controller.state().remote_draft_id().unwrap();
        assert_eq!(harness.draft().unwrap().remote_draft_id, Some(draft_id));

        controller.complete_step(StepNumber::at(2), shares(&[100])).await.unwrap();
        let rows = harness.backend.records();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].record.status, SubmissionStatus::Draft);
        assert_eq!(rows[0].record.current_step, StepNumber::at(3));

        let outcome = controller.complete_step(StepNumber::at(3), confirm(true)).await.unwrap();
        let StepOutcome::Submitted(receipt) = outcome else {
            panic!("expected submission");
        };
        assert_eq!(receipt.submission_id, draft_id);
        assert_eq!(harness.backend.records()[0].record.status, SubmissionStatus::Submitted);
    }

    #[tokio::test]
    async fn remote_draft_failure_does_not_block_progress() {
        let harness = Harness::new();
        harness.backend.set_unavailable(true);
        let mut controller = harness.controller().with_remote_drafts(RemoteDraftPolicy::Sync);

        let outcome = controller.complete_step(StepNumber::at(1), contact()).await.unwrap();
        assert_eq!(outcome, StepOutcome::Advanced { to: StepNumber::at(2) });
        assert!(controller.state().remote_draft_id().is_none());
    }

    #[tokio::test]
    async fn scripted_view_drives_the_wizard() {
        let harness = Harness::new();
        let mut controller = harness.controller();
        let mut view = ScriptedView::new([
            StepAction::Next(contact()),
            StepAction::Back,
            StepAction::Next(contact()),
            StepAction::Next(shares(&[50, 50])),
            StepAction::GoToStep(StepNumber::at(2)),
            StepAction::GoToStep(StepNumber::at(3)),
            StepAction::Next(confirm(true)),
        ]);

        let mut last = StepOutcome::Unchanged;
        while view.remaining() > 0 {
            last = controller.drive(&mut view).await.unwrap();
        }

        assert!(matches!(last, StepOutcome::Submitted(_)));
        assert_eq!(harness.notifier.requests().len(), 1);
    }

    #[tokio::test]
    async fn review_step_context_sees_all_data() {
        let harness = Harness::new();
        let mut controller = harness.controller();
        fill_first_two(&mut controller).await;

        let captured = Mutex::new(None);
        let mut view = |ctx: &StepContext<'_, TestStep>| {
            *captured.lock().unwrap() = Some((ctx.is_review(), ctx.is_last(), ctx.form_data.len(), ctx.can_go_back));
            StepAction::Stay
        };
        let outcome = controller.drive(&mut view).await.unwrap();

        assert_eq!(outcome, StepOutcome::Unchanged);
        assert_eq!(*captured.lock().unwrap(), Some((true, true, 2, true)));
    }

    #[tokio::test]
    async fn live_gating_follows_the_payload() {
        let harness = Harness::new();
        let mut controller = harness.controller();
        controller.complete_step(StepNumber::at(1), contact()).await.unwrap();

        assert!(!controller.can_advance(&shares(&[40, 40])));
        assert!(controller.can_advance(&shares(&[40, 40, 20])));
        assert!(!controller.can_advance(&contact()));
    }
}
