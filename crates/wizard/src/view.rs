//! Contract between the controller and externally supplied step views.
//!
//! A view receives everything it needs to render one step and answers with
//! a single [`StepAction`]. The controller never inspects view internals.

use std::collections::VecDeque;

use intake_core::ValidationErrors;

use crate::form_data::FormData;
use crate::step::{StepKind, StepNumber};

/// Render input for the current step.
#[derive(Debug)]
pub struct StepContext<'a, P> {
    pub step: StepNumber,
    pub last_step: StepNumber,
    pub title: &'static str,
    pub kind: StepKind,
    /// Previously completed data for this step, to pre-populate the view.
    pub data: Option<&'a P>,
    /// Everything entered so far (review steps summarize it).
    pub form_data: &'a FormData<P>,
    pub can_go_back: bool,
    pub progress_percent: u8,
    /// Field errors from the last rejected attempt at this step.
    pub errors: Option<&'a ValidationErrors>,
}

impl<P> StepContext<'_, P> {
    pub fn is_review(&self) -> bool {
        self.kind == StepKind::Review
    }

    pub fn is_last(&self) -> bool {
        self.step == self.last_step
    }
}

/// What the user did on a step.
#[derive(Debug, Clone, PartialEq)]
pub enum StepAction<P> {
    /// Continue with this (unvalidated) step data.
    Next(P),
    Back,
    /// Review-step "Edit" link.
    GoToStep(StepNumber),
    /// Nothing to do yet.
    Stay,
}

pub trait StepView<P> {
    fn render(&mut self, ctx: &StepContext<'_, P>) -> StepAction<P>;
}

impl<P, F> StepView<P> for F
where
    F: FnMut(&StepContext<'_, P>) -> StepAction<P>,
{
    fn render(&mut self, ctx: &StepContext<'_, P>) -> StepAction<P> {
        self(ctx)
    }
}

/// View that replays a fixed list of actions, then stays put.
#[derive(Debug, Clone)]
pub struct ScriptedView<P> {
    actions: VecDeque<StepAction<P>>,
}

impl<P> ScriptedView<P> {
    pub fn new(actions: impl IntoIterator<Item = StepAction<P>>) -> Self {
        Self {
            actions: actions.into_iter().collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.actions.len()
    }
}

impl<P> StepView<P> for ScriptedView<P> {
    fn render(&mut self, _ctx: &StepContext<'_, P>) -> StepAction<P> {
        self.actions.pop_front().unwrap_or(StepAction::Stay)
    }
}
