//! Canned model responses, replayed by phase.
//!
//! A fixture is a seed plus, per stage, the raw responses to hand back in
//! call order. A string response is returned verbatim (code fences, prose
//! and all); any other JSON value is returned as its serialized text.

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::Mutex;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chronicle_common::{Seed, Stage};
use serde::Deserialize;
use serde_json::Value;

use crate::traits::{Prompt, PromptSubmitter};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayFixture {
    pub seed: Seed,
    #[serde(default)]
    pub responses: HashMap<Stage, Vec<Value>>,
}

impl ReplayFixture {
    pub async fn load(path: &Path) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read fixture {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse fixture {}", path.display()))
    }

    pub fn submitter(&self) -> FixtureSubmitter {
        FixtureSubmitter::new(&self.responses)
    }
}

/// The text a fixture value stands for.
pub fn response_text(value: &Value) -> String {
    match value {
        Value::String(raw) => raw.clone(),
        other => other.to_string(),
    }
}

/// Answers each prompt with the next queued response for its stage. Runs
/// out loudly: a missing response is a transport error.
#[derive(Debug, Default)]
pub struct FixtureSubmitter {
    queues: Mutex<HashMap<Stage, VecDeque<String>>>,
}

impl FixtureSubmitter {
    pub fn new(responses: &HashMap<Stage, Vec<Value>>) -> Self {
        let queues = responses
            .iter()
            .map(|(stage, values)| (*stage, values.iter().map(response_text).collect()))
            .collect();
        Self {
            queues: Mutex::new(queues),
        }
    }
}

#[async_trait]
impl PromptSubmitter for FixtureSubmitter {
    async fn submit(&self, prompt: &Prompt) -> Result<String> {
        let mut queues = self
            .queues
            .lock()
            .map_err(|_| anyhow!("fixture queue lock poisoned"))?;
        queues
            .get_mut(&prompt.stage)
            .and_then(VecDeque::pop_front)
            .ok_or_else(|| anyhow!("fixture has no {} response left", prompt.stage))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn responses_are_served_in_order_per_stage() {
        let fixture: ReplayFixture = serde_json::from_value(json!({
            "seed": {"title": "Second Punic War", "startYear": -218, "endYear": -201},
            "responses": {
                "events": [{"events": []}, "```json\n{\"events\": []}\n```"]
            }
        }))
        .unwrap();
        let submitter = fixture.submitter();
        let prompt = Prompt::new(Stage::Events, "system", "user");

        assert_eq!(submitter.submit(&prompt).await.unwrap(), r#"{"events":[]}"#);
        assert!(submitter.submit(&prompt).await.unwrap().starts_with("```json"));
        assert!(submitter.submit(&prompt).await.is_err());

        let research = Prompt::new(Stage::Research, "system", "user");
        let err = submitter.submit(&research).await.unwrap_err();
        assert!(err.to_string().contains("research"));
    }
}
