// Test mocks for the generation pipeline.
//
// Three mocks matching the three injected seams:
// - MockSubmitter (PromptSubmitter): per-stage response queues, scripted failures
// - MockEventCatalog (EventCatalog): in-memory persisted events
// - MockCitationCatalog (CitationCatalog): every citation live unless marked dead or failing
//
// Plus helpers for the bundled Second Punic War fixture and test deps.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use async_trait::async_trait;
use chronicle_common::{title_key, Config, Seed, Stage};
use serde_json::Value;

use crate::orchestrator::PipelineDeps;
use crate::replay::{response_text, ReplayFixture};
use crate::report::MemoryReportSink;
use crate::traits::{CitationCatalog, EventCatalog, Prompt, PromptSubmitter};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub const SECOND_PUNIC_WAR_FIXTURE: &str = include_str!("../fixtures/second_punic_war.json");

pub fn second_punic_war() -> ReplayFixture {
    serde_json::from_str(SECOND_PUNIC_WAR_FIXTURE).expect("bundled fixture parses")
}

pub fn second_punic_war_seed() -> Seed {
    second_punic_war().seed
}

// ---------------------------------------------------------------------------
// MockSubmitter
// ---------------------------------------------------------------------------

/// Queue-based prompt submitter. Returns `Err` when a stage has no queued
/// response or is scripted to fail. Builder pattern: `.on()`, `.on_json()`,
/// `.fail_on()`.
#[derive(Default)]
pub struct MockSubmitter {
    responses: Mutex<HashMap<Stage, VecDeque<String>>>,
    failures: HashSet<Stage>,
    prompts: Mutex<Vec<Prompt>>,
}

impl MockSubmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every response in the fixture, queued by stage.
    pub fn from_fixture(fixture: &ReplayFixture) -> Self {
        let mut submitter = Self::new();
        for (stage, values) in &fixture.responses {
            for value in values {
                submitter = submitter.on(*stage, response_text(value));
            }
        }
        submitter
    }

    pub fn on(mut self, stage: Stage, response: impl Into<String>) -> Self {
        self.responses
            .get_mut()
            .unwrap()
            .entry(stage)
            .or_default()
            .push_back(response.into());
        self
    }

    pub fn on_json(self, stage: Stage, value: Value) -> Self {
        self.on(stage, value.to_string())
    }

    pub fn fail_on(mut self, stage: Stage) -> Self {
        self.failures.insert(stage);
        self
    }

    /// Every prompt submitted, in order.
    pub fn prompts(&self) -> Vec<Prompt> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn calls_for(&self, stage: Stage) -> usize {
        self.prompts
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.stage == stage)
            .count()
    }
}

#[async_trait]
impl PromptSubmitter for MockSubmitter {
    async fn submit(&self, prompt: &Prompt) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.clone());
        if self.failures.contains(&prompt.stage) {
            bail!("MockSubmitter: scripted transport failure for {}", prompt.stage);
        }
        match self
            .responses
            .lock()
            .unwrap()
            .get_mut(&prompt.stage)
            .and_then(VecDeque::pop_front)
        {
            Some(response) => Ok(response),
            None => bail!("MockSubmitter: no response queued for {}", prompt.stage),
        }
    }
}

// ---------------------------------------------------------------------------
// MockEventCatalog
// ---------------------------------------------------------------------------

/// In-memory persisted events keyed by exact title.
#[derive(Default)]
pub struct MockEventCatalog {
    by_title: HashMap<String, String>,
    slugs: HashSet<String>,
    fail: bool,
}

impl MockEventCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_event(mut self, title: &str, slug: &str) -> Self {
        self.by_title.insert(title_key(title), slug.to_string());
        self.slugs.insert(slug.to_string());
        self
    }

    /// A persisted slug with no title this run will look up.
    pub fn with_slug(mut self, slug: &str) -> Self {
        self.slugs.insert(slug.to_string());
        self
    }

    /// Every lookup errors.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl EventCatalog for MockEventCatalog {
    async fn slug_for_title(&self, title: &str) -> Result<Option<String>> {
        if self.fail {
            bail!("MockEventCatalog: lookup failed");
        }
        Ok(self.by_title.get(&title_key(title)).cloned())
    }

    async fn persisted_slugs(&self) -> Result<HashSet<String>> {
        if self.fail {
            bail!("MockEventCatalog: lookup failed");
        }
        Ok(self.slugs.clone())
    }
}

// ---------------------------------------------------------------------------
// MockCitationCatalog
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MockCitationCatalog {
    dead: HashSet<u32>,
    fail: bool,
}

impl MockCitationCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dead(mut self, number: u32) -> Self {
        self.dead.insert(number);
        self
    }

    /// Every liveness check errors.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl CitationCatalog for MockCitationCatalog {
    async fn is_live(&self, number: u32) -> Result<bool> {
        if self.fail {
            bail!("MockCitationCatalog: liveness check failed");
        }
        Ok(!self.dead.contains(&number))
    }
}

// ---------------------------------------------------------------------------
// Deps
// ---------------------------------------------------------------------------

/// Deps with no call delay, default catalogs and an in-memory sink.
pub fn test_deps(submitter: Arc<MockSubmitter>, sink: Arc<MemoryReportSink>) -> PipelineDeps {
    PipelineDeps::builder()
        .submitter(submitter)
        .sink(sink)
        .config(Config::without_delay())
        .build()
}
