//! Replay scripts: the actions a user would take, one step view answer each.
//!
//! ```json
//! {
//!   "sourceUrl": "https://advisors.example.com/jane/apply",
//!   "advisor": {"id": "…", "name": "Jane Advisor", "email": "jane@example.com"},
//!   "actions": [
//!     {"action": "next", "data": {"section": "contact", "firstName": "Sam"}},
//!     {"action": "back"},
//!     {"action": "goToStep", "step": 1}
//!   ]
//! }
//! ```

use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

use intake_wizard::{AdvisorRef, StepAction, StepNumber, SubmissionContext};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Script<P> {
    pub source_url: String,
    #[serde(default)]
    pub advisor: Option<AdvisorRef>,
    pub actions: Vec<ScriptAction<P>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ScriptAction<P> {
    Next { data: P },
    Back,
    GoToStep { step: StepNumber },
}

impl<P> From<ScriptAction<P>> for StepAction<P> {
    fn from(action: ScriptAction<P>) -> Self {
        match action {
            ScriptAction::Next { data } => StepAction::Next(data),
            ScriptAction::Back => StepAction::Back,
            ScriptAction::GoToStep { step } => StepAction::GoToStep(step),
        }
    }
}

impl<P: serde::de::DeserializeOwned> Script<P> {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read script {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("invalid script {}", path.display()))
    }

    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

impl<P> Script<P> {
    pub fn context(&self) -> anyhow::Result<SubmissionContext> {
        let context = SubmissionContext::new(&self.source_url).context("invalid sourceUrl")?;
        Ok(match &self.advisor {
            Some(advisor) => context.with_advisor(advisor.clone()),
            None => context,
        })
    }

    pub fn into_actions(self) -> Vec<StepAction<P>> {
        self.actions.into_iter().map(StepAction::from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use intake_forms::{EstatePlanningStep, LifeInsuranceStep, PrequalificationStep};

    #[test]
    fn parses_every_action_kind() {
        let script: Script<PrequalificationStep> = Script::parse(
            r#"{
                "sourceUrl": "https://example.com/apply",
                "actions": [
                    {"action": "next", "data": {"section": "health", "age": 40}},
                    {"action": "back"},
                    {"action": "goToStep", "step": 2}
                ]
            }"#,
        )
        .unwrap();

        assert!(script.advisor.is_none());
        let actions = script.into_actions();
        assert!(matches!(actions[0], StepAction::Next(PrequalificationStep::Health(_))));
        assert_eq!(actions[1], StepAction::Back);
        assert_eq!(actions[2], StepAction::GoToStep(StepNumber::at(2)));
    }

    #[test]
    fn step_zero_is_rejected() {
        let result: anyhow::Result<Script<PrequalificationStep>> = Script::parse(
            r#"{"sourceUrl": "https://example.com", "actions": [{"action": "goToStep", "step": 0}]}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn advisor_is_attached_to_the_context() {
        let script: Script<PrequalificationStep> = Script::parse(
            r#"{
                "sourceUrl": "https://example.com/apply",
                "advisor": {
                    "id": "0190b6a4-7d2e-7c3a-9f00-000000000001",
                    "name": "Pat Advisor",
                    "email": "pat@example.com"
                },
                "actions": []
            }"#,
        )
        .unwrap();
        let context = script.context().unwrap();
        assert_eq!(context.advisor().map(|a| a.name.as_str()), Some("Pat Advisor"));
    }

    #[test]
    fn relative_source_url_is_an_error() {
        let script: Script<PrequalificationStep> =
            Script::parse(r#"{"sourceUrl": "/apply", "actions": []}"#).unwrap();
        assert!(script.context().is_err());
    }

    #[test]
    fn bundled_demo_scripts_parse() {
        let estate: Script<EstatePlanningStep> =
            Script::parse(include_str!("../../../demos/estate-planning.json")).unwrap();
        let prequal: Script<PrequalificationStep> =
            Script::parse(include_str!("../../../demos/prequalification.json")).unwrap();
        let life: Script<LifeInsuranceStep> =
            Script::parse(include_str!("../../../demos/life-insurance.json")).unwrap();

        assert!(estate.context().is_ok());
        assert!(!prequal.actions.is_empty());
        assert!(!life.actions.is_empty());
    }
}
