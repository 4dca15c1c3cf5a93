//! Wizard state machine.
//!
//! `WizardState` is the root aggregate of one wizard session. Transitions are
//! decided in `handle` (pure, may reject) and performed in `apply`
//! (infallible, +1 version per event), so every transition is testable
//! without storage or a UI.
//!
//! States: one per step `1..=N`, plus `Submitting` and `Done`.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use intake_core::{Aggregate, AggregateRoot, SubmissionId};

use crate::draft::DraftSnapshot;
use crate::error::WizardError;
use crate::form_data::FormData;
use crate::kind::WizardKind;
use crate::step::{StepNumber, StepPayload, StepRegistry};

/// Transient submission lifecycle. Not part of the draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionProgress {
    Idle,
    Submitting,
    Succeeded,
    Failed,
}

/// Where the state machine currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardPhase {
    Step(StepNumber),
    Submitting,
    Done,
}

/// How a step was entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Navigation {
    Advance,
    Back,
    Jump,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WizardCommand<P> {
    /// Validated data for `step`; only accepted while `step` is current.
    CompleteStep { step: StepNumber, payload: P },
    GoBack,
    /// Random-access jump (review step "Edit" links).
    GoToStep(StepNumber),
    RecordSubmissionSuccess { submission_id: SubmissionId },
    RecordSubmissionFailure { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WizardEvent<P> {
    StepCompleted { step: StepNumber, payload: P },
    StepEntered {
        from: StepNumber,
        to: StepNumber,
        via: Navigation,
    },
    SubmissionStarted,
    SubmissionSucceeded { submission_id: SubmissionId },
    SubmissionFailed { reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct WizardState<P> {
    kind: WizardKind,
    last_step: StepNumber,
    current_step: StepNumber,
    completed_steps: BTreeSet<StepNumber>,
    form_data: FormData<P>,
    last_saved_at: Option<DateTime<Utc>>,
    progress: SubmissionProgress,
    remote_draft_id: Option<SubmissionId>,
    submission_id: Option<SubmissionId>,
    version: u64,
}

impl<P: StepPayload> WizardState<P> {
    /// Fresh session on step 1.
    pub fn new(kind: WizardKind, registry: &StepRegistry) -> Self {
        Self {
            kind,
            last_step: registry.last(),
            current_step: StepNumber::FIRST,
            completed_steps: BTreeSet::new(),
            form_data: FormData::new(),
            last_saved_at: None,
            progress: SubmissionProgress::Idle,
            remote_draft_id: None,
            submission_id: None,
            version: 0,
        }
    }

    /// Rehydrate from a draft snapshot.
    ///
    /// Snapshots referring to steps this wizard does not have are rejected
    /// (e.g. a draft written by an older, longer version of the wizard).
    pub fn restore(
        kind: WizardKind,
        registry: &StepRegistry,
        snapshot: DraftSnapshot<P>,
    ) -> Result<Self, WizardError> {
        let last = registry.last();
        let out_of_range = |step: StepNumber| step > last;

        if out_of_range(snapshot.current_step) {
            return Err(WizardError::InvalidSnapshot(format!(
                "current step {} exceeds last step {last}",
                snapshot.current_step
            )));
        }
        if let Some(step) = snapshot.completed_steps.iter().copied().find(|s| out_of_range(*s)) {
            return Err(WizardError::InvalidSnapshot(format!(
                "completed step {step} exceeds last step {last}"
            )));
        }
        if let Some(step) = snapshot.form_data.steps().find(|s| out_of_range(*s)) {
            return Err(WizardError::InvalidSnapshot(format!(
                "form data for step {step} exceeds last step {last}"
            )));
        }

        Ok(Self {
            kind,
            last_step: last,
            current_step: snapshot.current_step,
            completed_steps: snapshot.completed_steps,
            form_data: snapshot.form_data,
            last_saved_at: Some(snapshot.last_saved),
            progress: SubmissionProgress::Idle,
            remote_draft_id: snapshot.remote_draft_id,
            submission_id: None,
            version: 0,
        })
    }

    /// Draft snapshot of the persistent part of the state.
    pub fn snapshot(&self, saved_at: DateTime<Utc>) -> DraftSnapshot<P> {
        DraftSnapshot {
            form_data: self.form_data.clone(),
            current_step: self.current_step,
            completed_steps: self.completed_steps.clone(),
            last_saved: saved_at,
            remote_draft_id: self.remote_draft_id,
        }
    }

    pub fn kind(&self) -> WizardKind {
        self.kind
    }

    pub fn current_step(&self) -> StepNumber {
        self.current_step
    }

    pub fn last_step(&self) -> StepNumber {
        self.last_step
    }

    pub fn completed_steps(&self) -> &BTreeSet<StepNumber> {
        &self.completed_steps
    }

    pub fn is_completed(&self, step: StepNumber) -> bool {
        self.completed_steps.contains(&step)
    }

    pub fn form_data(&self) -> &FormData<P> {
        &self.form_data
    }

    pub fn last_saved_at(&self) -> Option<DateTime<Utc>> {
        self.last_saved_at
    }

    pub fn progress(&self) -> SubmissionProgress {
        self.progress
    }

    pub fn remote_draft_id(&self) -> Option<SubmissionId> {
        self.remote_draft_id
    }

    pub fn submission_id(&self) -> Option<SubmissionId> {
        self.submission_id
    }

    pub fn phase(&self) -> WizardPhase {
        match self.progress {
            SubmissionProgress::Submitting => WizardPhase::Submitting,
            SubmissionProgress::Succeeded => WizardPhase::Done,
            SubmissionProgress::Idle | SubmissionProgress::Failed => {
                WizardPhase::Step(self.current_step)
            }
        }
    }

    /// Completed share of the wizard, 0..=100.
    pub fn progress_percent(&self) -> u8 {
        let total = u32::from(self.last_step.get());
        let done = self.completed_steps.len() as u32;
        ((done * 100) / total).min(100) as u8
    }

    pub(crate) fn mark_saved(&mut self, at: DateTime<Utc>) {
        self.last_saved_at = Some(at);
    }

    pub(crate) fn link_remote_draft(&mut self, id: SubmissionId) {
        self.remote_draft_id = Some(id);
    }

    fn ensure_editable(&self) -> Result<(), WizardError> {
        match self.progress {
            SubmissionProgress::Submitting => Err(WizardError::Busy),
            SubmissionProgress::Succeeded => Err(WizardError::AlreadySubmitted),
            SubmissionProgress::Idle | SubmissionProgress::Failed => Ok(()),
        }
    }

    fn handle_complete(
        &self,
        step: StepNumber,
        payload: &P,
    ) -> Result<Vec<WizardEvent<P>>, WizardError> {
        self.ensure_editable()?;

        if step != self.current_step {
            return Err(WizardError::NotCurrentStep {
                expected: self.current_step,
                got: step,
            });
        }
        if payload.step() != step {
            return Err(WizardError::PayloadMismatch {
                step,
                payload_step: payload.step(),
            });
        }

        let normalized = payload
            .validate()
            .map_err(|errors| WizardError::Validation { step, errors })?;

        if step == self.last_step {
            let missing = self.missing_steps();
            if !missing.is_empty() {
                return Err(WizardError::IncompleteSteps(missing));
            }
        }

        let mut events = vec![WizardEvent::StepCompleted {
            step,
            payload: normalized,
        }];

        if step < self.last_step {
            events.push(WizardEvent::StepEntered {
                from: step,
                to: step.next(),
                via: Navigation::Advance,
            });
        } else {
            events.push(WizardEvent::SubmissionStarted);
        }

        Ok(events)
    }

    /// Steps before the last one that have no recorded payload yet.
    fn missing_steps(&self) -> Vec<StepNumber> {
        let mut step = StepNumber::FIRST;
        let mut missing = Vec::new();
        while step < self.last_step {
            if !self.completed_steps.contains(&step) {
                missing.push(step);
            }
            step = step.next();
        }
        missing
    }

    fn handle_back(&self) -> Result<Vec<WizardEvent<P>>, WizardError> {
        self.ensure_editable()?;
        let to = self.current_step.previous().ok_or(WizardError::AtFirstStep)?;
        Ok(vec![WizardEvent::StepEntered {
            from: self.current_step,
            to,
            via: Navigation::Back,
        }])
    }

    fn handle_jump(&self, to: StepNumber) -> Result<Vec<WizardEvent<P>>, WizardError> {
        self.ensure_editable()?;
        if to > self.last_step {
            return Err(WizardError::StepOutOfRange {
                step: to,
                last: self.last_step,
            });
        }
        if to == self.current_step {
            return Ok(vec![]);
        }
        Ok(vec![WizardEvent::StepEntered {
            from: self.current_step,
            to,
            via: Navigation::Jump,
        }])
    }

    fn ensure_submitting(&self) -> Result<(), WizardError> {
        if self.progress != SubmissionProgress::Submitting {
            return Err(WizardError::NotSubmitting);
        }
        Ok(())
    }
}

impl<P: StepPayload> AggregateRoot for WizardState<P> {
    type Id = WizardKind;

    fn id(&self) -> &Self::Id {
        &self.kind
    }

    fn version(&self) -> u64 {
        self.version
    }
}

impl<P: StepPayload> Aggregate for WizardState<P> {
    type Command = WizardCommand<P>;
    type Event = WizardEvent<P>;
    type Error = WizardError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            WizardEvent::StepCompleted { step, payload } => {
                self.form_data.merge(payload.clone());
                self.completed_steps.insert(*step);
            }
            WizardEvent::StepEntered { to, .. } => {
                self.current_step = *to;
                if self.progress == SubmissionProgress::Failed {
                    self.progress = SubmissionProgress::Idle;
                }
            }
            WizardEvent::SubmissionStarted => {
                self.progress = SubmissionProgress::Submitting;
            }
            WizardEvent::SubmissionSucceeded { submission_id } => {
                self.progress = SubmissionProgress::Succeeded;
                self.submission_id = Some(*submission_id);
            }
            WizardEvent::SubmissionFailed { .. } => {
                self.progress = SubmissionProgress::Failed;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            WizardCommand::CompleteStep { step, payload } => self.handle_complete(*step, payload),
            WizardCommand::GoBack => self.handle_back(),
            WizardCommand::GoToStep(to) => self.handle_jump(*to),
            WizardCommand::RecordSubmissionSuccess { submission_id } => {
                self.ensure_submitting()?;
                Ok(vec![WizardEvent::SubmissionSucceeded {
                    submission_id: *submission_id,
                }])
            }
            WizardCommand::RecordSubmissionFailure { reason } => {
                self.ensure_submitting()?;
                Ok(vec![WizardEvent::SubmissionFailed {
                    reason: reason.clone(),
                }])
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{TestStep, TestWizard, confirm, contact, shares};
    use crate::definition::Wizard;
    use proptest::prelude::*;

    fn fresh() -> WizardState<TestStep> {
        WizardState::new(TestWizard::KIND, &TestWizard::registry())
    }

    fn complete(state: &mut WizardState<TestStep>, payload: TestStep) -> Vec<WizardEvent<TestStep>> {
        let step = state.current_step();
        state
            .execute(&WizardCommand::CompleteStep { step, payload })
            .unwrap()
    }

    #[test]
    fn fresh_state_starts_on_step_one() {
        let state = fresh();
        assert_eq!(state.current_step(), StepNumber::FIRST);
        assert!(state.completed_steps().is_empty());
        assert!(state.form_data().is_empty());
        assert_eq!(state.phase(), WizardPhase::Step(StepNumber::FIRST));
        assert_eq!(state.version(), 0);
    }

    #[test]
    fn completing_a_step_merges_and_advances() {
        let mut state = fresh();
        let events = complete(&mut state, contact());

        assert_eq!(events.len(), 2);
        assert!(matches!(
            events[1],
            WizardEvent::StepEntered { via: Navigation::Advance, .. }
        ));
        assert_eq!(state.current_step(), StepNumber::at(2));
        assert!(state.is_completed(StepNumber::FIRST));
        assert_eq!(state.form_data().get(StepNumber::FIRST), Some(&contact()));
        assert_eq!(state.version(), 2);
    }

    #[test]
    fn validation_failure_leaves_state_untouched() {
        let mut state = fresh();
        let before = state.clone();
        let bad = TestStep::Contact(crate::fixtures::Contact {
            name: " ".into(),
            email: "x".into(),
            phone: "1".into(),
        });

        let err = state
            .execute(&WizardCommand::CompleteStep {
                step: StepNumber::FIRST,
                payload: bad,
            })
            .unwrap_err();

        let fields = err.field_errors().unwrap();
        assert!(fields.contains("name"));
        assert!(fields.contains("email"));
        assert!(fields.contains("phone"));
        assert_eq!(state, before);
    }

    #[test]
    fn only_the_current_step_can_be_completed() {
        let state = fresh();
        let err = state
            .handle(&WizardCommand::CompleteStep {
                step: StepNumber::at(2),
                payload: shares(&[100]),
            })
            .unwrap_err();
        assert_eq!(
            err,
            WizardError::NotCurrentStep {
                expected: StepNumber::FIRST,
                got: StepNumber::at(2)
            }
        );
    }

    #[test]
    fn payload_for_another_step_is_rejected() {
        let state = fresh();
        let err = state
            .handle(&WizardCommand::CompleteStep {
                step: StepNumber::FIRST,
                payload: shares(&[100]),
            })
            .unwrap_err();
        assert!(matches!(err, WizardError::PayloadMismatch { .. }));
    }

    #[test]
    fn back_from_first_step_is_rejected() {
        assert_eq!(fresh().handle(&WizardCommand::GoBack).unwrap_err(), WizardError::AtFirstStep);
    }

    #[test]
    fn back_and_jump_do_not_touch_data() {
        let mut state = fresh();
        complete(&mut state, contact());
        complete(&mut state, shares(&[100]));
        let data = state.form_data().clone();
        let completed = state.completed_steps().clone();

        state.execute(&WizardCommand::GoBack).unwrap();
        assert_eq!(state.current_step(), StepNumber::at(2));
        state.execute(&WizardCommand::GoToStep(StepNumber::FIRST)).unwrap();
        assert_eq!(state.current_step(), StepNumber::FIRST);
        state.execute(&WizardCommand::GoToStep(StepNumber::at(3))).unwrap();
        assert_eq!(state.current_step(), StepNumber::at(3));

        assert_eq!(state.form_data(), &data);
        assert_eq!(state.completed_steps(), &completed);
    }

    #[test]
    fn jump_beyond_last_step_is_rejected() {
        let err = fresh()
            .handle(&WizardCommand::GoToStep(StepNumber::at(4)))
            .unwrap_err();
        assert_eq!(
            err,
            WizardError::StepOutOfRange {
                step: StepNumber::at(4),
                last: StepNumber::at(3)
            }
        );
    }

    #[test]
    fn jump_to_current_step_is_a_no_op() {
        let state = fresh();
        assert!(state.handle(&WizardCommand::GoToStep(StepNumber::FIRST)).unwrap().is_empty());
    }

    #[test]
    fn last_step_cannot_submit_after_skipping_ahead() {
        let mut state = fresh();
        complete(&mut state, contact());
        state
            .execute(&WizardCommand::GoToStep(StepNumber::at(3)))
            .unwrap();

        let err = state
            .execute(&WizardCommand::CompleteStep {
                step: StepNumber::at(3),
                payload: confirm(true),
            })
            .unwrap_err();

        assert_eq!(err, WizardError::IncompleteSteps(vec![StepNumber::at(2)]));
        assert_eq!(err.to_string(), "complete steps 2 before submitting");
        assert_eq!(state.phase(), WizardPhase::Step(StepNumber::at(3)));
        assert_eq!(state.progress(), SubmissionProgress::Idle);
        assert!(!state.is_completed(StepNumber::at(3)));
        assert!(state.form_data().get(StepNumber::at(3)).is_none());
    }

    #[test]
    fn completing_last_step_enters_submitting_and_locks_navigation() {
        let mut state = fresh();
        complete(&mut state, contact());
        complete(&mut state, shares(&[100]));
        let events = complete(&mut state, confirm(true));

        assert_eq!(events.last(), Some(&WizardEvent::SubmissionStarted));
        assert_eq!(state.phase(), WizardPhase::Submitting);
        assert_eq!(state.handle(&WizardCommand::GoBack).unwrap_err(), WizardError::Busy);
        assert_eq!(
            state
                .handle(&WizardCommand::GoToStep(StepNumber::FIRST))
                .unwrap_err(),
            WizardError::Busy
        );
    }

    #[test]
    fn failed_submission_returns_to_last_step_with_data() {
        let mut state = fresh();
        complete(&mut state, contact());
        complete(&mut state, shares(&[100]));
        complete(&mut state, confirm(true));
        let data = state.form_data().clone();

        state
            .execute(&WizardCommand::RecordSubmissionFailure {
                reason: "backend down".into(),
            })
            .unwrap();

        assert_eq!(state.phase(), WizardPhase::Step(StepNumber::at(3)));
        assert_eq!(state.progress(), SubmissionProgress::Failed);
        assert_eq!(state.form_data(), &data);

        // retry is allowed from the failed state
        complete(&mut state, confirm(true));
        assert_eq!(state.phase(), WizardPhase::Submitting);
    }

    #[test]
    fn success_is_terminal() {
        let mut state = fresh();
        complete(&mut state, contact());
        complete(&mut state, shares(&[100]));
        complete(&mut state, confirm(true));
        let id = SubmissionId::new();
        state
            .execute(&WizardCommand::RecordSubmissionSuccess { submission_id: id })
            .unwrap();

        assert_eq!(state.phase(), WizardPhase::Done);
        assert_eq!(state.submission_id(), Some(id));
        assert_eq!(
            state.handle(&WizardCommand::GoBack).unwrap_err(),
            WizardError::AlreadySubmitted
        );
    }

    #[test]
    fn submission_outcomes_require_submitting() {
        let state = fresh();
        assert_eq!(
            state
                .handle(&WizardCommand::RecordSubmissionFailure { reason: "x".into() })
                .unwrap_err(),
            WizardError::NotSubmitting
        );
    }

    #[test]
    fn snapshot_restores_position_and_data() {
        let mut state = fresh();
        complete(&mut state, contact());
        complete(&mut state, shares(&[100]));

        let snapshot = state.snapshot(Utc::now());
        let restored =
            WizardState::restore(TestWizard::KIND, &TestWizard::registry(), snapshot).unwrap();

        assert_eq!(restored.current_step(), StepNumber::at(3));
        assert_eq!(restored.completed_steps(), state.completed_steps());
        assert_eq!(restored.form_data(), state.form_data());
        assert_eq!(restored.progress(), SubmissionProgress::Idle);
    }

    #[test]
    fn snapshot_beyond_registry_is_rejected() {
        let mut snapshot = fresh().snapshot(Utc::now());
        snapshot.current_step = StepNumber::at(9);
        let err = WizardState::restore(TestWizard::KIND, &TestWizard::registry(), snapshot)
            .unwrap_err();
        assert!(matches!(err, WizardError::InvalidSnapshot(_)));
    }

    #[test]
    fn progress_percent_tracks_completed_steps() {
        let mut state = fresh();
        assert_eq!(state.progress_percent(), 0);
        complete(&mut state, contact());
        assert_eq!(state.progress_percent(), 33);
        complete(&mut state, shares(&[100]));
        complete(&mut state, confirm(true));
        assert_eq!(state.progress_percent(), 100);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Valid,
        Invalid,
        Back,
        Jump(u8),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            3 => Just(Op::Valid),
            1 => Just(Op::Invalid),
            1 => Just(Op::Back),
            1 => (1u8..=3).prop_map(Op::Jump),
        ]
    }

    fn valid_payload(step: StepNumber) -> TestStep {
        match step.get() {
            1 => contact(),
            2 => shares(&[25, 75]),
            _ => confirm(true),
        }
    }

    fn invalid_payload(step: StepNumber) -> TestStep {
        match step.get() {
            1 => TestStep::Contact(crate::fixtures::Contact {
                name: String::new(),
                email: String::new(),
                phone: String::new(),
            }),
            2 => shares(&[40, 40]),
            _ => confirm(false),
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: completed steps never shrink, and only a successful
        /// completion moves the cursor forward, by exactly one.
        #[test]
        fn completed_steps_never_shrink(ops in prop::collection::vec(op_strategy(), 1..40)) {
            let mut state = fresh();

            for op in ops {
                if state.phase() == WizardPhase::Submitting {
                    break;
                }
                let before_step = state.current_step();
                let before_completed = state.completed_steps().clone();

                let result = match op {
                    Op::Valid => state.execute(&WizardCommand::CompleteStep {
                        step: before_step,
                        payload: valid_payload(before_step),
                    }),
                    Op::Invalid => state.execute(&WizardCommand::CompleteStep {
                        step: before_step,
                        payload: invalid_payload(before_step),
                    }),
                    Op::Back => state.execute(&WizardCommand::GoBack),
                    Op::Jump(n) => state.execute(&WizardCommand::GoToStep(StepNumber::at(n))),
                };

                prop_assert!(before_completed.is_subset(state.completed_steps()));

                match (op, result) {
                    (Op::Valid, Ok(_)) => {
                        if before_step < state.last_step() {
                            prop_assert_eq!(state.current_step(), before_step.next());
                        } else {
                            prop_assert_eq!(state.phase(), WizardPhase::Submitting);
                            prop_assert_eq!(state.completed_steps().len(), 3);
                        }
                    }
                    (Op::Invalid, result) => {
                        prop_assert!(result.is_err());
                        prop_assert_eq!(state.current_step(), before_step);
                        prop_assert_eq!(state.completed_steps(), &before_completed);
                    }
                    _ => {}
                }
            }
        }
    }
}
