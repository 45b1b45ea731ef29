//! Prompt builders, one per phase.
//!
//! Each prompt embeds the expected response shape as a JSON schema. The
//! model is free to drift from it; the normalizer absorbs the drift.

use chronicle_common::{
    format_year, slugify, truncate_to_char_boundary, EnrichmentContent, ExpandedEvent,
    MainNarrative, ResearchCorpus, SeoMetadata, Seed, Skeleton, SkeletonEvent, Stage,
};
use schemars::JsonSchema;
use serde::Serialize;

use crate::schema::{list_response_schema, response_schema, schema_text};
use crate::traits::Prompt;

const MAX_DIGEST_BYTES: usize = 24_000;

pub const SYSTEM_PROMPT: &str = r#"You are a historian and editor writing for a general audience. You write vivid, accurate narrative history grounded in sources.

Rules:
- Respond with a single JSON value matching the requested shape. No prose before or after it.
- Use signed integer years: negative numbers are BCE (216 BCE is -216).
- Cite sources inline with bracketed numbers like [3] that refer to the numbered source list you were given or that you produce.
- Never invent a source. If you are unsure of a URL, omit it."#;

/// Response shape for one expanded event. The slug is minted by the
/// pipeline, not the model.
#[derive(Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
#[allow(dead_code)]
struct EventDraftShape {
    title: String,
    year: i32,
    end_year: Option<i32>,
    summary: String,
    description: String,
    significance: String,
    category: String,
    theme_id: Option<String>,
    tags: Vec<String>,
    importance: u8,
    citations: Vec<u32>,
}

fn seed_header(seed: &Seed) -> String {
    let mut header = format!("Topic: {}\nPeriod: {}", seed.title, seed.span_label());
    if let Some(region) = &seed.region {
        header.push_str(&format!("\nRegion: {region}"));
    }
    if let Some(background) = &seed.background {
        header.push_str(&format!("\nBackground: {background}"));
    }
    header
}

pub fn research(seed: &Seed) -> Prompt {
    let user = format!(
        r#"{header}

Compile a research digest for this topic: the key events in order, the people who shaped them, the causes and consequences, and where historians disagree.

List every source you rely on as a numbered citation with its type (primary, secondary or modern) and your confidence in its reliability (high, medium or low).

Respond with JSON in this shape:
{schema}"#,
        header = seed_header(seed),
        schema = schema_text(&response_schema::<ResearchCorpus>()),
    );
    Prompt::new(Stage::Research, SYSTEM_PROMPT, user)
}

pub fn skeleton(seed: &Seed, research: &ResearchCorpus) -> Prompt {
    let sources = research
        .citations
        .iter()
        .map(|c| format!("[{}] {}", c.number, c.source))
        .collect::<Vec<_>>()
        .join("\n");
    let user = format!(
        r#"{header}

Research digest:
{digest}

Sources:
{sources}

Build the factual skeleton: 8 to 20 events in chronological order (title, year, one-line synopsis, key facts, the citation numbers that support it, importance 1-3), the key people, 3 to 6 themes with the event titles they connect, and a breakdown into periods.

Event titles must be distinct; later steps refer to events by title.

Respond with JSON in this shape:
{schema}"#,
        header = seed_header(seed),
        digest = truncate_to_char_boundary(&research.digest, MAX_DIGEST_BYTES),
        schema = schema_text(&response_schema::<Skeleton>()),
    );
    Prompt::new(Stage::Skeleton, SYSTEM_PROMPT, user)
}

pub fn narrative(seed: &Seed, skeleton: &Skeleton) -> Prompt {
    let events = skeleton
        .events
        .iter()
        .map(|e| format!("- {} ({}) -> slug: {}", e.title, format_year(e.year), slugify(&e.title)))
        .collect::<Vec<_>>()
        .join("\n");
    let themes = skeleton
        .themes
        .iter()
        .map(|t| format!("- {}: {}", t.title, t.one_liner))
        .collect::<Vec<_>>()
        .join("\n");
    let user = format!(
        r#"{header}

Events:
{events}

Themes:
{themes}

Write the main narrative as a sequence of story beats (hook, context, rising_action, turning_point, climax, aftermath, legacy). Each beat has a title and 1 to 3 paragraphs. Pose one central dramatic question and describe the story's character in one line.

For each beat, propose links from phrases in its paragraphs to events: textToLink must be copied exactly, character for character, from the paragraph named by paragraphIndex; eventSlug must be one of the slugs listed above.

Respond with JSON in this shape:
{schema}"#,
        header = seed_header(seed),
        schema = schema_text(&response_schema::<MainNarrative>()),
    );
    Prompt::new(Stage::Narrative, SYSTEM_PROMPT, user)
}

pub fn events(seed: &Seed, narrative: &MainNarrative, chunk: &[SkeletonEvent]) -> Prompt {
    let themes = narrative
        .themes
        .iter()
        .map(|t| format!("- {} (id: {})", t.title, t.id))
        .collect::<Vec<_>>()
        .join("\n");
    let events = chunk
        .iter()
        .map(|e| {
            let mut line = format!("- {} ({}): {}", e.title, format_year(e.year), e.synopsis);
            for fact in &e.key_facts {
                line.push_str(&format!("\n  * {fact}"));
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n");
    let user = format!(
        r#"{header}

Story: {question}

Themes:
{themes}

Expand each of these events into a full entry: a summary, a long-form description of several paragraphs, why it matters, a category, the id of the theme it belongs to, tags, importance 1-3, and its citation numbers. Keep each title exactly as given.

{events}

Respond with JSON in this shape:
{schema}"#,
        header = seed_header(seed),
        question = narrative.central_question,
        schema = schema_text(&list_response_schema::<EventDraftShape>("events")),
    );
    Prompt::new(Stage::Events, SYSTEM_PROMPT, user)
}

pub fn enrichment(seed: &Seed, narrative: &MainNarrative, events: &[ExpandedEvent]) -> Prompt {
    let events = events
        .iter()
        .map(|e| format!("- {} ({}): {}", e.title, format_year(e.year), e.summary))
        .collect::<Vec<_>>()
        .join("\n");
    let user = format!(
        r#"{header}

Narrative summary: {summary}

Events:
{events}

Write the editorial layer for the timeline: a short intro, a legacy note, theme categories grouping the events, a "why it matters" note for the most important events, typed relationships between events (led_to, response_to, parallel, foreshadows), the turning points, and any further numbered citations.

Refer to events by their exact titles above.

Respond with JSON in this shape:
{schema}"#,
        header = seed_header(seed),
        summary = narrative.summary,
        schema = schema_text(&response_schema::<EnrichmentContent>()),
    );
    Prompt::new(Stage::Enrichment, SYSTEM_PROMPT, user)
}

pub fn seo(seed: &Seed, narrative: &MainNarrative) -> Prompt {
    let user = format!(
        r#"{header}

Page title: {title}
Summary: {summary}

Write search metadata for this page: a meta title of at most 60 characters, a meta description of at most 160 characters, up to 12 lowercase keywords, and 3 to 6 frequently asked questions with concise answers.

Respond with JSON in this shape:
{schema}"#,
        header = seed_header(seed),
        title = narrative.page_title,
        summary = narrative.summary,
        schema = schema_text(&response_schema::<SeoMetadata>()),
    );
    Prompt::new(Stage::Seo, SYSTEM_PROMPT, user)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed() -> Seed {
        Seed::new("Second Punic War", -218, -201).with_region("Western Mediterranean")
    }

    #[test]
    fn research_prompt_carries_seed_and_schema() {
        let prompt = research(&seed());
        assert_eq!(prompt.stage, Stage::Research);
        assert!(prompt.user.contains("Second Punic War"));
        assert!(prompt.user.contains("Western Mediterranean"));
        assert!(prompt.user.contains("\"digest\""));
    }

    #[test]
    fn narrative_prompt_lists_provisional_slugs() {
        let skeleton = Skeleton {
            events: vec![SkeletonEvent {
                title: "Battle of Cannae".into(),
                year: -216,
                end_year: None,
                synopsis: "Hannibal's masterpiece.".into(),
                key_facts: vec![],
                citation_numbers: vec![],
                importance: 3,
                category: "battle".into(),
            }],
            ..Skeleton::default()
        };
        let prompt = narrative(&seed(), &skeleton);
        assert!(prompt.user.contains("slug: battle-of-cannae"));
        assert!(prompt.user.contains("216 BCE"));
    }

    #[test]
    fn events_schema_leaves_slug_to_the_pipeline() {
        let prompt = events(&seed(), &MainNarrative::default(), &[]);
        assert!(prompt.user.contains("\"themeId\""));
        assert!(!prompt.user.contains("\"slug\""));
    }

    #[test]
    fn long_digest_is_truncated() {
        let research = ResearchCorpus {
            digest: "é".repeat(MAX_DIGEST_BYTES),
            citations: vec![],
        };
        let prompt = skeleton(&seed(), &research);
        assert!(prompt.user.len() < MAX_DIGEST_BYTES * 2);
    }
}
