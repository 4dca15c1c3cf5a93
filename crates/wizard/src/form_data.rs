//! Aggregated step payloads of one wizard session.

use std::collections::BTreeMap;

use serde::de::Error as _;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::step::{StepNumber, StepPayload};

/// Step payloads keyed by step. Serialized as `{"step1": {...}, "step2": {...}}`.
#[derive(Debug, Clone, PartialEq)]
pub struct FormData<P> {
    steps: BTreeMap<StepNumber, P>,
}

impl<P> Default for FormData<P> {
    fn default() -> Self {
        Self {
            steps: BTreeMap::new(),
        }
    }
}

impl<P: StepPayload> FormData<P> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a payload under its own step, replacing any previous answer.
    pub fn merge(&mut self, payload: P) -> Option<P> {
        self.steps.insert(payload.step(), payload)
    }

    pub fn get(&self, step: StepNumber) -> Option<&P> {
        self.steps.get(&step)
    }

    pub fn contains(&self, step: StepNumber) -> bool {
        self.steps.contains_key(&step)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn steps(&self) -> impl Iterator<Item = StepNumber> + '_ {
        self.steps.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (StepNumber, &P)> {
        self.steps.iter().map(|(k, v)| (*k, v))
    }

    /// JSON object suitable for the backend `form_data` column.
    pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }
}

impl<P: Serialize> Serialize for FormData<P> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.steps.len()))?;
        for (step, payload) in &self.steps {
            map.serialize_entry(&step.key(), payload)?;
        }
        map.end()
    }
}

impl<'de, P: StepPayload> Deserialize<'de> for FormData<P> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, P>::deserialize(deserializer)?;
        let mut steps = BTreeMap::new();
        for (key, payload) in raw {
            let step = StepNumber::from_key(&key).map_err(D::Error::custom)?;
            if payload.step() != step {
                return Err(D::Error::custom(format!(
                    "{key} holds a payload for step {}",
                    payload.step()
                )));
            }
            steps.insert(step, payload);
        }
        Ok(Self { steps })
    }
}
