//! Phase orchestrator.
//!
//! Runs `SEED → RESEARCH → SKELETON → NARRATIVE → EVENTS → ENRICHMENT → SEO
//! → COMPLETE` strictly in order, merging each phase's patch into the
//! context before the next phase starts. Finalisation registers citations,
//! binds the enrichment graph to the expanded events and validates the
//! narrative's proposed links. Nothing is persisted here: the caller
//! persists the returned [`GenerationOutput`] once the run succeeds.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chronicle_common::{Config, GenerationContext, Seed, Stage};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;
use typed_builder::TypedBuilder;

use crate::binder::{ExactThenContains, NarrativeBinder, NarrativeBindings, TitleMatcher};
use crate::citations::{CitationOrigin, CitationRegistry, Registration};
use crate::error::{PipelineError, PipelineResult};
use crate::links::{validate_links, LinkValidation};
use crate::phases::{phase_for, PhaseEnv};
use crate::report::{ReportSink, Reporter, RunEvent, RunReport, TracingSink};
use crate::traits::{CitationCatalog, EventCatalog, NullCatalog, PromptSubmitter};

/// Everything a run needs from its caller.
#[derive(Clone, TypedBuilder)]
pub struct PipelineDeps {
    pub submitter: Arc<dyn PromptSubmitter>,
    #[builder(default = Arc::new(NullCatalog) as Arc<dyn EventCatalog>)]
    pub events: Arc<dyn EventCatalog>,
    #[builder(default = Arc::new(NullCatalog) as Arc<dyn CitationCatalog>)]
    pub citations: Arc<dyn CitationCatalog>,
    #[builder(default = Arc::new(ExactThenContains) as Arc<dyn TitleMatcher>)]
    pub matcher: Arc<dyn TitleMatcher>,
    #[builder(default = Arc::new(TracingSink) as Arc<dyn ReportSink>)]
    pub sink: Arc<dyn ReportSink>,
    #[builder(default)]
    pub config: Config,
    /// Checked before every phase.
    #[builder(default, setter(strip_option))]
    pub cancelled: Option<Arc<AtomicBool>>,
}

/// The result of a completed run, as plain data for the caller to persist.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationOutput {
    pub context: GenerationContext,
    pub bindings: NarrativeBindings,
    pub citations: CitationRegistry,
    pub links: LinkValidation,
    pub report: RunReport,
    pub finished_at: DateTime<Utc>,
}

pub struct Orchestrator {
    deps: PipelineDeps,
}

impl Orchestrator {
    pub fn new(deps: PipelineDeps) -> Self {
        Self { deps }
    }

    pub fn deps(&self) -> &PipelineDeps {
        &self.deps
    }

    /// Run every phase for `seed`, then finalise.
    pub async fn run(&self, seed: Seed) -> PipelineResult<GenerationOutput> {
        seed.validate()?;
        let mut ctx = GenerationContext::new(seed);
        let mut reporter = Reporter::new(self.deps.sink.clone());

        info!(
            run_id = %ctx.run_id,
            title = ctx.seed.title.as_str(),
            span = ctx.seed.span_label().as_str(),
            "Starting generation run"
        );

        for stage in Stage::PHASES {
            self.advance(stage, &mut ctx, &mut reporter).await?;
        }

        self.finalize(ctx, reporter).await
    }

    /// Run a single phase against an existing context. A failed
    /// precondition leaves `ctx` untouched.
    pub async fn run_phase(
        &self,
        stage: Stage,
        ctx: &mut GenerationContext,
    ) -> PipelineResult<RunReport> {
        let mut reporter = Reporter::new(self.deps.sink.clone());
        self.advance(stage, ctx, &mut reporter).await?;
        Ok(reporter.into_report())
    }

    /// Whether `stage` could run against `ctx` right now.
    pub fn check(&self, stage: Stage, ctx: &GenerationContext) -> PipelineResult<()> {
        match phase_for(stage) {
            Some(phase) => phase.check(ctx),
            None => Ok(()),
        }
    }

    fn is_cancelled(&self) -> bool {
        self.deps
            .cancelled
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    async fn advance(
        &self,
        stage: Stage,
        ctx: &mut GenerationContext,
        reporter: &mut Reporter,
    ) -> PipelineResult<()> {
        let Some(phase) = phase_for(stage) else {
            return Ok(());
        };
        phase.check(ctx)?;
        if self.is_cancelled() {
            info!(%stage, "Run cancelled");
            return Err(PipelineError::Cancelled { phase: stage });
        }

        reporter.record(RunEvent::PhaseStarted { stage });
        let prior_calls = reporter.report().model_calls;
        let mut env = PhaseEnv::new(&self.deps, reporter, stage, prior_calls);
        let patch = phase.run(ctx, &mut env).await?;
        let calls = env.calls();

        ctx.apply(patch);
        reporter.record(RunEvent::PhaseCompleted { stage, calls });
        Ok(())
    }

    async fn finalize(
        &self,
        mut ctx: GenerationContext,
        mut reporter: Reporter,
    ) -> PipelineResult<GenerationOutput> {
        let mut registry = CitationRegistry::new();
        if let Some(research) = &ctx.research {
            for citation in &research.citations {
                // An unanswerable liveness check keeps the citation.
                let live = match self.deps.citations.is_live(citation.number).await {
                    Ok(live) => live,
                    Err(e) => {
                        reporter.record(RunEvent::LookupFailed {
                            what: "citation liveness",
                            error: format!("{e:#}"),
                        });
                        true
                    }
                };
                let registration = if live {
                    registry.register_research(citation)
                } else {
                    Registration::Discarded("no longer live")
                };
                record_registration(&mut reporter, CitationOrigin::Research, citation.number, registration);
            }
        }
        if let Some(enrichment) = &ctx.enrichment {
            for citation in &enrichment.citations {
                let registration = registry.register_enrichment(citation);
                record_registration(&mut reporter, CitationOrigin::Enrichment, citation.number, registration);
            }
        }

        let events = ctx.events.as_deref().unwrap_or_default();
        let enrichment = ctx.enrichment.clone().unwrap_or_default();
        let bindings = NarrativeBinder::new(self.deps.matcher.as_ref()).bind(
            events,
            &enrichment,
            &registry,
            &mut reporter,
        );

        let mut known_slugs = match self.deps.events.persisted_slugs().await {
            Ok(slugs) => slugs,
            Err(e) => {
                reporter.record(RunEvent::LookupFailed {
                    what: "persisted slugs",
                    error: format!("{e:#}"),
                });
                HashSet::new()
            }
        };
        known_slugs.extend(events.iter().map(|event| event.slug.clone()));

        let links = match &ctx.narrative {
            Some(narrative) => validate_links(&narrative.proposed_links(), narrative, &known_slugs),
            None => LinkValidation::default(),
        };
        for link in &links.accepted {
            reporter.record(RunEvent::LinkAccepted {
                event_slug: link.event_slug.clone(),
                beat_index: link.beat_index,
                paragraph_index: link.paragraph_index,
            });
        }
        for rejected in &links.rejected {
            reporter.record(RunEvent::LinkRejected {
                event_slug: rejected.link.event_slug.clone(),
                beat_index: rejected.link.beat_index,
                paragraph_index: rejected.link.paragraph_index,
                reason: rejected.reason.to_string(),
            });
        }

        ctx.mark_complete();
        let report = reporter.into_report();
        info!(run_id = %ctx.run_id, "{report}");

        Ok(GenerationOutput {
            context: ctx,
            bindings,
            citations: registry,
            links,
            report,
            finished_at: Utc::now(),
        })
    }
}

fn record_registration(
    reporter: &mut Reporter,
    origin: CitationOrigin,
    number: u32,
    registration: Registration,
) {
    match registration {
        Registration::New(_) => {}
        Registration::Merged(into) => reporter.record(RunEvent::CitationMerged {
            origin,
            number,
            into,
        }),
        Registration::Discarded(reason) => reporter.record(RunEvent::CitationDiscarded {
            origin,
            number,
            reason: reason.to_string(),
        }),
    }
}
