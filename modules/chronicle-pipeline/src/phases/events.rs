use async_trait::async_trait;
use chronicle_common::{
    title_key, ContextPatch, ExpandedEvent, GenerationContext, MainNarrative, SkeletonEvent, Stage,
};
use tracing::info;

use super::{require, Phase, PhaseEnv};
use crate::binder::TitleResolver;
use crate::error::PipelineResult;
use crate::normalize::{EventDraft, IdAllocator};
use crate::prompts;
use crate::report::{ReferenceKind, RunEvent};

/// Expands skeleton events in chunks, then assembles exactly one
/// [`ExpandedEvent`] per skeleton event, in skeleton order.
pub struct EventsPhase;

#[async_trait]
impl Phase for EventsPhase {
    fn stage(&self) -> Stage {
        Stage::Events
    }

    fn check(&self, ctx: &GenerationContext) -> PipelineResult<()> {
        require(&ctx.skeleton, Stage::Events, "skeleton")?;
        require(&ctx.narrative, Stage::Events, "narrative")?;
        Ok(())
    }

    async fn run(
        &self,
        ctx: &GenerationContext,
        env: &mut PhaseEnv<'_>,
    ) -> PipelineResult<ContextPatch> {
        let skeleton = require(&ctx.skeleton, Stage::Events, "skeleton")?;
        let narrative = require(&ctx.narrative, Stage::Events, "narrative")?;
        let chunk_size = env.deps.config.events_chunk_size.max(1);

        let mut drafts = Vec::new();
        for chunk in skeleton.events.chunks(chunk_size) {
            let value = env
                .call(prompts::events(&ctx.seed, narrative, chunk))
                .await?;
            let mut normalizer = env.normalizer(&ctx.seed);
            drafts.extend(normalizer.event_drafts(&value));
            env.record_drops(normalizer);
        }

        let events = assemble(&skeleton.events, drafts, narrative, env).await;
        info!(
            events = events.len(),
            calls = env.calls(),
            "Expanded skeleton events"
        );
        Ok(ContextPatch::Events(events))
    }
}

/// Pair drafts with skeleton events and mint slugs. A draft is used at most
/// once; skeleton events without a draft are built from the skeleton alone.
async fn assemble(
    skeleton: &[SkeletonEvent],
    drafts: Vec<EventDraft>,
    narrative: &MainNarrative,
    env: &mut PhaseEnv<'_>,
) -> Vec<ExpandedEvent> {
    let deps = env.deps;
    let mut resolver = TitleResolver::new(
        deps.matcher.as_ref(),
        drafts.iter().map(|d| d.title.as_str()),
    );
    let mut drafts: Vec<Option<EventDraft>> = drafts.into_iter().map(Some).collect();
    let mut slugs = IdAllocator::new("event");
    let mut events = Vec::with_capacity(skeleton.len());

    for event in skeleton {
        let draft = match resolver.resolve(&event.title) {
            Some(i) => {
                resolver.retire(i);
                drafts[i].take()
            }
            None => None,
        };
        if draft.is_none() {
            env.reporter.record(RunEvent::EventFallback {
                title: event.title.clone(),
            });
        }

        let persisted = match deps.events.slug_for_title(&event.title).await {
            Ok(persisted) => persisted,
            Err(e) => {
                env.reporter.record(RunEvent::LookupFailed {
                    what: "event slug",
                    error: format!("{e:#}"),
                });
                None
            }
        };
        let slug = match persisted {
            Some(slug) if !slug.is_empty() && !slugs.contains(&slug) => slugs.claim(slug),
            _ => slugs.allocate(&event.title),
        };

        let expanded = match draft {
            Some(draft) => {
                let theme = draft.theme_ref.as_deref().and_then(|reference| {
                    let resolved = theme_id(narrative, reference);
                    if resolved.is_none() {
                        env.reporter.record(RunEvent::ReferenceUnresolved {
                            kind: ReferenceKind::Theme,
                            reference: reference.to_string(),
                        });
                    }
                    resolved
                });
                from_draft(event, draft, slug, theme)
            }
            None => from_skeleton(event, slug),
        };
        events.push(expanded);
    }

    for draft in drafts.into_iter().flatten() {
        env.reporter.record(RunEvent::ElementDropped {
            stage: Stage::Events,
            path: "events".to_string(),
            reason: format!("draft \"{}\" matches no skeleton event", draft.title),
        });
    }

    events
}

/// A narrative theme id, matched by id or by title.
fn theme_id(narrative: &MainNarrative, reference: &str) -> Option<String> {
    let key = title_key(reference);
    narrative
        .themes
        .iter()
        .find(|theme| theme.id == reference)
        .or_else(|| {
            narrative
                .themes
                .iter()
                .find(|theme| {
                    !key.is_empty()
                        && (title_key(&theme.id) == key || title_key(&theme.title) == key)
                })
        })
        .map(|theme| theme.id.clone())
}

fn non_empty(value: String, fallback: impl FnOnce() -> String) -> String {
    if value.is_empty() {
        fallback()
    } else {
        value
    }
}

fn skeleton_description(event: &SkeletonEvent) -> String {
    let mut description = event.synopsis.clone();
    for fact in &event.key_facts {
        if !description.is_empty() {
            description.push('\n');
        }
        description.push_str("- ");
        description.push_str(fact);
    }
    description
}

fn from_draft(
    event: &SkeletonEvent,
    draft: EventDraft,
    slug: String,
    theme_id: Option<String>,
) -> ExpandedEvent {
    let year = draft.year.unwrap_or(event.year);
    ExpandedEvent {
        title: event.title.clone(),
        year,
        end_year: draft.end_year.or(event.end_year).filter(|end| *end > year),
        slug,
        summary: non_empty(draft.summary, || event.synopsis.clone()),
        description: non_empty(draft.description, || skeleton_description(event)),
        significance: draft.significance,
        category: non_empty(draft.category, || event.category.clone()),
        theme_id,
        tags: draft.tags,
        importance: draft.importance.unwrap_or(event.importance),
        citation_numbers: if draft.citation_numbers.is_empty() {
            event.citation_numbers.clone()
        } else {
            draft.citation_numbers
        },
    }
}

fn from_skeleton(event: &SkeletonEvent, slug: String) -> ExpandedEvent {
    ExpandedEvent {
        title: event.title.clone(),
        year: event.year,
        end_year: event.end_year,
        slug,
        summary: event.synopsis.clone(),
        description: skeleton_description(event),
        significance: String::new(),
        category: event.category.clone(),
        theme_id: None,
        tags: Vec::new(),
        importance: event.importance,
        citation_numbers: event.citation_numbers.clone(),
    }
}
