use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ChronicleError;
use crate::util::format_year;

// =============================================================================
// Seed
// =============================================================================

/// The minimal input describing a topic to generate. Years are signed;
/// negative years are BCE.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Seed {
    pub title: String,
    pub start_year: i32,
    pub end_year: i32,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub background: Option<String>,
}

impl Seed {
    pub fn new(title: impl Into<String>, start_year: i32, end_year: i32) -> Self {
        Self {
            title: title.into(),
            start_year,
            end_year,
            region: None,
            background: None,
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_background(mut self, background: impl Into<String>) -> Self {
        self.background = Some(background.into());
        self
    }

    pub fn validate(&self) -> Result<(), ChronicleError> {
        if self.title.trim().is_empty() {
            return Err(ChronicleError::Validation("seed title is empty".into()));
        }
        if self.start_year > self.end_year {
            return Err(ChronicleError::Validation(format!(
                "seed starts after it ends ({} > {})",
                self.start_year, self.end_year
            )));
        }
        Ok(())
    }

    /// "218 BCE – 201 BCE", or a single year when start and end coincide.
    pub fn span_label(&self) -> String {
        if self.start_year == self.end_year {
            format_year(self.start_year)
        } else {
            format!(
                "{} – {}",
                format_year(self.start_year),
                format_year(self.end_year)
            )
        }
    }
}

// =============================================================================
// Research
// =============================================================================

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum CitationKind {
    Primary,
    #[default]
    Secondary,
    Modern,
}

impl CitationKind {
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "primary" => Some(Self::Primary),
            "secondary" => Some(Self::Secondary),
            "modern" | "tertiary" | "contemporary" => Some(Self::Modern),
            _ => None,
        }
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Reliability {
    High,
    #[default]
    Medium,
    Low,
}

impl Reliability {
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "high" | "strong" => Some(Self::High),
            "medium" | "moderate" => Some(Self::Medium),
            "low" | "weak" | "disputed" => Some(Self::Low),
            _ => None,
        }
    }
}

/// A numbered source as the model reported it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Citation {
    pub number: u32,
    pub source: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub kind: CitationKind,
    #[serde(default)]
    pub reliability: Reliability,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResearchCorpus {
    pub digest: String,
    #[serde(default)]
    pub citations: Vec<Citation>,
}

// =============================================================================
// Skeleton
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SkeletonEvent {
    pub title: String,
    pub year: i32,
    #[serde(default)]
    pub end_year: Option<i32>,
    pub synopsis: String,
    #[serde(default)]
    pub key_facts: Vec<String>,
    #[serde(default)]
    pub citation_numbers: Vec<u32>,
    /// 1 (minor) to 3 (pivotal).
    pub importance: u8,
    #[serde(default)]
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SkeletonPerson {
    pub name: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub born: Option<i32>,
    #[serde(default)]
    pub died: Option<i32>,
    #[serde(default)]
    pub synopsis: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SkeletonTheme {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub one_liner: String,
    #[serde(default)]
    pub related_events: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PeriodBreakdown {
    pub title: String,
    pub start_year: i32,
    pub end_year: i32,
    #[serde(default)]
    pub summary: String,
}

/// Factual outline produced before any prose. Titles are the only
/// cross-reference key at this stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Skeleton {
    #[serde(default)]
    pub events: Vec<SkeletonEvent>,
    #[serde(default)]
    pub people: Vec<SkeletonPerson>,
    #[serde(default)]
    pub themes: Vec<SkeletonTheme>,
    #[serde(default)]
    pub periods: Vec<PeriodBreakdown>,
}

// =============================================================================
// Narrative
// =============================================================================

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum BeatKind {
    Hook,
    #[default]
    Context,
    RisingAction,
    TurningPoint,
    Climax,
    Aftermath,
    Legacy,
}

impl BeatKind {
    pub fn from_label(label: &str) -> Option<Self> {
        let normalized: String = label
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '_' })
            .collect();
        match normalized.as_str() {
            "hook" | "opening" | "cold_open" => Some(Self::Hook),
            "context" | "background" | "setting" => Some(Self::Context),
            "rising_action" | "rising" | "escalation" | "conflict" => Some(Self::RisingAction),
            "turning_point" | "turn" | "pivot" => Some(Self::TurningPoint),
            "climax" | "crisis" => Some(Self::Climax),
            "aftermath" | "resolution" | "falling_action" => Some(Self::Aftermath),
            "legacy" | "epilogue" => Some(Self::Legacy),
            _ => None,
        }
    }
}

/// A proposed hyperlink inside a beat: an exact span of one paragraph and
/// the event it should point at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EventLink {
    pub text: String,
    pub event_slug: String,
    #[serde(default)]
    pub paragraph_index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StoryBeat {
    pub kind: BeatKind,
    pub title: String,
    pub paragraphs: Vec<String>,
    #[serde(default)]
    pub links: Vec<EventLink>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Theme {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MainNarrative {
    pub page_title: String,
    pub central_question: String,
    pub story_character: String,
    pub summary: String,
    #[serde(default)]
    pub beats: Vec<StoryBeat>,
    #[serde(default)]
    pub themes: Vec<Theme>,
    #[serde(default)]
    pub key_people: Vec<String>,
}

impl MainNarrative {
    /// Every in-beat link, addressed by beat and paragraph.
    pub fn proposed_links(&self) -> Vec<ProposedLink> {
        self.beats
            .iter()
            .enumerate()
            .flat_map(|(beat_index, beat)| {
                beat.links.iter().map(move |link| ProposedLink {
                    text_to_link: link.text.clone(),
                    event_slug: link.event_slug.clone(),
                    beat_index,
                    paragraph_index: link.paragraph_index,
                })
            })
            .collect()
    }
}

/// A link insertion addressed against the whole narrative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProposedLink {
    pub text_to_link: String,
    pub event_slug: String,
    pub beat_index: usize,
    pub paragraph_index: usize,
}

// =============================================================================
// Expanded events
// =============================================================================

/// The unit that becomes a persisted, addressable record. `slug` is the
/// only stable cross-reference key from here on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExpandedEvent {
    pub title: String,
    pub year: i32,
    #[serde(default)]
    pub end_year: Option<i32>,
    pub slug: String,
    pub summary: String,
    pub description: String,
    #[serde(default)]
    pub significance: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub theme_id: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub importance: u8,
    #[serde(default)]
    pub citation_numbers: Vec<u32>,
}

// =============================================================================
// Enrichment (structured content graph)
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipKind {
    LedTo,
    ResponseTo,
    Parallel,
    Foreshadows,
}

impl RelationshipKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LedTo => "led_to",
            Self::ResponseTo => "response_to",
            Self::Parallel => "parallel",
            Self::Foreshadows => "foreshadows",
        }
    }
}

impl fmt::Display for RelationshipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TimelineThemeCategory {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub event_titles: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEventNote {
    pub event_title: String,
    pub why_it_matters: String,
}

/// Directed, typed edge between two events, still keyed by title text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEventRelationship {
    pub from_title: String,
    pub kind: RelationshipKind,
    pub target_title: String,
    #[serde(default)]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TimelineTurningPoint {
    pub event_title: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TimelineCitationRaw {
    pub number: u32,
    pub source: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub kind: CitationKind,
    #[serde(default)]
    pub reliability: Reliability,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnrichmentContent {
    #[serde(default)]
    pub intro: String,
    #[serde(default)]
    pub legacy: String,
    #[serde(default)]
    pub categories: Vec<TimelineThemeCategory>,
    #[serde(default)]
    pub notes: Vec<TimelineEventNote>,
    #[serde(default)]
    pub relationships: Vec<TimelineEventRelationship>,
    #[serde(default)]
    pub turning_points: Vec<TimelineTurningPoint>,
    #[serde(default)]
    pub citations: Vec<TimelineCitationRaw>,
}

// =============================================================================
// SEO
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FaqItem {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SeoMetadata {
    pub meta_title: String,
    pub meta_description: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub faq: Vec<FaqItem>,
}

// =============================================================================
// Stages and the accumulated context
// =============================================================================

/// Linear generation state machine.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Seed,
    Research,
    Skeleton,
    Narrative,
    Events,
    Enrichment,
    Seo,
    Complete,
}

impl Stage {
    /// Stages that issue model calls, in run order.
    pub const PHASES: [Stage; 6] = [
        Stage::Research,
        Stage::Skeleton,
        Stage::Narrative,
        Stage::Events,
        Stage::Enrichment,
        Stage::Seo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Seed => "seed",
            Stage::Research => "research",
            Stage::Skeleton => "skeleton",
            Stage::Narrative => "narrative",
            Stage::Events => "events",
            Stage::Enrichment => "enrichment",
            Stage::Seo => "seo",
            Stage::Complete => "complete",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The output of one phase, merged into the context before the next runs.
#[derive(Debug, Clone, PartialEq)]
pub enum ContextPatch {
    Research(ResearchCorpus),
    Skeleton(Skeleton),
    Narrative(MainNarrative),
    Events(Vec<ExpandedEvent>),
    Enrichment(EnrichmentContent),
    Seo(SeoMetadata),
}

impl ContextPatch {
    pub fn stage(&self) -> Stage {
        match self {
            ContextPatch::Research(_) => Stage::Research,
            ContextPatch::Skeleton(_) => Stage::Skeleton,
            ContextPatch::Narrative(_) => Stage::Narrative,
            ContextPatch::Events(_) => Stage::Events,
            ContextPatch::Enrichment(_) => Stage::Enrichment,
            ContextPatch::Seo(_) => Stage::Seo,
        }
    }
}

/// Superset of every completed phase's output for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationContext {
    pub run_id: Uuid,
    pub seed: Seed,
    pub stage: Stage,
    pub research: Option<ResearchCorpus>,
    pub skeleton: Option<Skeleton>,
    pub narrative: Option<MainNarrative>,
    pub events: Option<Vec<ExpandedEvent>>,
    pub enrichment: Option<EnrichmentContent>,
    pub seo: Option<SeoMetadata>,
}

impl GenerationContext {
    pub fn new(seed: Seed) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            seed,
            stage: Stage::Seed,
            research: None,
            skeleton: None,
            narrative: None,
            events: None,
            enrichment: None,
            seo: None,
        }
    }

    /// Merge a phase's output. The stage only ever moves forward.
    pub fn apply(&mut self, patch: ContextPatch) {
        let stage = patch.stage();
        match patch {
            ContextPatch::Research(research) => self.research = Some(research),
            ContextPatch::Skeleton(skeleton) => self.skeleton = Some(skeleton),
            ContextPatch::Narrative(narrative) => self.narrative = Some(narrative),
            ContextPatch::Events(events) => self.events = Some(events),
            ContextPatch::Enrichment(enrichment) => self.enrichment = Some(enrichment),
            ContextPatch::Seo(seo) => self.seo = Some(seo),
        }
        self.stage = self.stage.max(stage);
    }

    pub fn mark_complete(&mut self) {
        self.stage = Stage::Complete;
    }
}
