//! Generation phases.
//!
//! A phase reads the accumulated context, issues one or more model calls,
//! normalizes the responses and returns a [`ContextPatch`]. It never writes
//! to the context itself; the orchestrator merges the patch.

mod content;
mod events;

use async_trait::async_trait;
use chronicle_common::{ContextPatch, GenerationContext, Seed, Stage};
use serde_json::Value;
use tracing::debug;

use crate::error::{PipelineError, PipelineResult};
use crate::jsonish::parse_jsonish;
use crate::normalize::Normalizer;
use crate::orchestrator::PipelineDeps;
use crate::report::{Reporter, RunEvent};
use crate::traits::Prompt;

pub use content::{EnrichmentPhase, NarrativePhase, ResearchPhase, SeoPhase, SkeletonPhase};
pub use events::EventsPhase;

#[async_trait]
pub trait Phase: Send + Sync {
    fn stage(&self) -> Stage;

    /// Fail fast when an upstream output this phase reads is absent.
    /// Runs before any model call.
    fn check(&self, ctx: &GenerationContext) -> PipelineResult<()>;

    async fn run(
        &self,
        ctx: &GenerationContext,
        env: &mut PhaseEnv<'_>,
    ) -> PipelineResult<ContextPatch>;
}

/// The phase implementing `stage`, if `stage` issues model calls.
pub fn phase_for(stage: Stage) -> Option<&'static dyn Phase> {
    match stage {
        Stage::Research => Some(&ResearchPhase),
        Stage::Skeleton => Some(&SkeletonPhase),
        Stage::Narrative => Some(&NarrativePhase),
        Stage::Events => Some(&EventsPhase),
        Stage::Enrichment => Some(&EnrichmentPhase),
        Stage::Seo => Some(&SeoPhase),
        Stage::Seed | Stage::Complete => None,
    }
}

/// What a running phase can reach: the injected deps, the run's reporter
/// and the model-call throttle.
pub struct PhaseEnv<'a> {
    pub deps: &'a PipelineDeps,
    pub reporter: &'a mut Reporter,
    stage: Stage,
    prior_calls: u32,
    calls: u32,
}

impl<'a> PhaseEnv<'a> {
    /// `prior_calls` is the number of calls already made in this run; the
    /// courtesy delay applies before every call but the run's first.
    pub(crate) fn new(
        deps: &'a PipelineDeps,
        reporter: &'a mut Reporter,
        stage: Stage,
        prior_calls: u32,
    ) -> Self {
        Self {
            deps,
            reporter,
            stage,
            prior_calls,
            calls: 0,
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls
    }

    /// Submit a prompt and parse the reply leniently. Only a transport
    /// failure is an error; unparseable output comes back as `Null`.
    pub async fn call(&mut self, prompt: Prompt) -> PipelineResult<Value> {
        let delay = self.deps.config.call_delay;
        if self.prior_calls + self.calls > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.calls += 1;

        debug!(
            stage = %self.stage,
            call = self.calls,
            prompt_len = prompt.user.len(),
            "Submitting prompt"
        );
        let raw = self
            .deps
            .submitter
            .submit(&prompt)
            .await
            .map_err(|e| PipelineError::transport(self.stage, e))?;
        debug!(stage = %self.stage, response_len = raw.len(), "Model responded");

        Ok(parse_jsonish(&raw))
    }

    pub fn normalizer<'s>(&self, seed: &'s Seed) -> Normalizer<'s> {
        Normalizer::new(seed).with_max_beat_paragraphs(self.deps.config.max_beat_paragraphs)
    }

    /// Report everything a normalizer dropped.
    pub fn record_drops(&mut self, mut normalizer: Normalizer<'_>) {
        for dropped in normalizer.take_drops() {
            self.reporter.record(RunEvent::from(dropped));
        }
    }
}

fn require<'c, T>(value: &'c Option<T>, phase: Stage, missing: &'static str) -> PipelineResult<&'c T> {
    value
        .as_ref()
        .ok_or(PipelineError::Precondition { phase, missing })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_model_stage_has_a_phase() {
        for stage in Stage::PHASES {
            let phase = phase_for(stage).unwrap();
            assert_eq!(phase.stage(), stage);
        }
        assert!(phase_for(Stage::Seed).is_none());
        assert!(phase_for(Stage::Complete).is_none());
    }

    #[test]
    fn preconditions_name_the_missing_input() {
        let ctx = GenerationContext::new(Seed::new("Second Punic War", -218, -201));

        assert!(ResearchPhase.check(&ctx).is_ok());
        let err = NarrativePhase.check(&ctx).unwrap_err();
        assert!(err.is_precondition());
        assert_eq!(
            err.to_string(),
            "narrative phase requires skeleton, which is not in the context"
        );
        assert!(EventsPhase.check(&ctx).is_err());
        assert!(EnrichmentPhase.check(&ctx).is_err());
        assert!(SeoPhase.check(&ctx).is_err());
    }
}
