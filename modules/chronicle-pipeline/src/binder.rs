//! Narrative binder: attaches the enrichment graph to persisted events.
//!
//! The enrichment phase refers to events only by the title text the model
//! produced. Binding resolves those titles to the slugs of the expanded
//! events through a [`TitleMatcher`] and gathers, per event, its category,
//! editorial note, turning-point flag, typed relationships and renumbered
//! citations.

use std::collections::{HashMap, HashSet};

use chronicle_common::{title_key, EnrichmentContent, ExpandedEvent, RelationshipKind};
use serde::Serialize;
use tracing::{debug, info};

use crate::citations::{CitationOrigin, CitationRegistry};
use crate::report::{ReferenceKind, Reporter, RunEvent};

/// Matches a canonical title key against candidate keys.
///
/// Keys are produced by [`title_key`]. Swappable so a stricter or fuzzier
/// policy (edit distance, aliases) can replace the default.
pub trait TitleMatcher: Send + Sync {
    /// Index of the candidate `target` refers to, if any.
    fn find(&self, target: &str, candidates: &[String]) -> Option<usize>;
}

impl<M: TitleMatcher + ?Sized> TitleMatcher for std::sync::Arc<M> {
    fn find(&self, target: &str, candidates: &[String]) -> Option<usize> {
        (**self).find(target, candidates)
    }
}

/// Exact key equality first, then containment in either direction.
///
/// Containment takes the first candidate in order. A short title that is a
/// prefix of an unrelated one can match it; an unmatched reference is
/// dropped, so recall is preferred here. Empty keys never match.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExactThenContains;

impl TitleMatcher for ExactThenContains {
    fn find(&self, target: &str, candidates: &[String]) -> Option<usize> {
        if target.is_empty() {
            return None;
        }
        candidates
            .iter()
            .position(|candidate| candidate == target)
            .or_else(|| {
                candidates.iter().position(|candidate| {
                    !candidate.is_empty()
                        && (candidate.contains(target) || target.contains(candidate.as_str()))
                })
            })
    }
}

/// Resolves free-text titles against a fixed candidate list.
pub struct TitleResolver<'m> {
    matcher: &'m dyn TitleMatcher,
    keys: Vec<String>,
}

impl<'m> TitleResolver<'m> {
    pub fn new<'t>(matcher: &'m dyn TitleMatcher, titles: impl IntoIterator<Item = &'t str>) -> Self {
        Self {
            matcher,
            keys: titles.into_iter().map(title_key).collect(),
        }
    }

    pub fn resolve(&self, title: &str) -> Option<usize> {
        self.matcher.find(&title_key(title), &self.keys)
    }

    /// Take candidate `index` out of further matching.
    pub fn retire(&mut self, index: usize) {
        if let Some(key) = self.keys.get_mut(index) {
            key.clear();
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundCategory {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundRelationship {
    pub kind: RelationshipKind,
    pub target_slug: String,
    pub target_title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Everything bound to one persisted event. Present for every event even
/// when nothing resolved to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventBinding {
    pub slug: String,
    pub title: String,
    pub category: Option<BoundCategory>,
    pub note: Option<String>,
    pub is_turning_point: bool,
    pub turning_point_note: Option<String>,
    pub relationships: Vec<BoundRelationship>,
    pub citations: Vec<u32>,
}

impl EventBinding {
    fn empty(event: &ExpandedEvent) -> Self {
        Self {
            slug: event.slug.clone(),
            title: event.title.clone(),
            category: None,
            note: None,
            is_turning_point: false,
            turning_point_note: None,
            relationships: Vec::new(),
            citations: Vec::new(),
        }
    }
}

/// One binding per distinct slug, in event order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct NarrativeBindings {
    entries: Vec<EventBinding>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl NarrativeBindings {
    pub fn get(&self, slug: &str) -> Option<&EventBinding> {
        self.index.get(slug).map(|&i| &self.entries[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &EventBinding> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_entries(self) -> Vec<EventBinding> {
        self.entries
    }
}

pub struct NarrativeBinder<'m> {
    matcher: &'m dyn TitleMatcher,
}

impl<'m> NarrativeBinder<'m> {
    pub fn new(matcher: &'m dyn TitleMatcher) -> Self {
        Self { matcher }
    }

    pub fn bind(
        &self,
        events: &[ExpandedEvent],
        enrichment: &EnrichmentContent,
        registry: &CitationRegistry,
        reporter: &mut Reporter,
    ) -> NarrativeBindings {
        let mut entries: Vec<EventBinding> = Vec::with_capacity(events.len());
        let mut index = HashMap::new();
        for event in events {
            if index.contains_key(&event.slug) {
                debug!(slug = event.slug.as_str(), "Duplicate event slug, keeping first");
                continue;
            }
            let mut binding = EventBinding::empty(event);
            let (citations, dangling) =
                registry.renumber(CitationOrigin::Research, &event.citation_numbers);
            binding.citations = citations;
            index.insert(event.slug.clone(), entries.len());
            entries.push(binding);

            for number in dangling {
                reporter.record(RunEvent::ReferenceUnresolved {
                    kind: ReferenceKind::Citation,
                    reference: format!("[{number}] on {}", event.slug),
                });
            }
        }

        let resolver = TitleResolver::new(self.matcher, entries.iter().map(|e| e.title.as_str()));

        for category in &enrichment.categories {
            for title in &category.event_titles {
                match resolver.resolve(title) {
                    Some(i) => {
                        entries[i].category.get_or_insert_with(|| BoundCategory {
                            id: category.id.clone(),
                            title: category.title.clone(),
                        });
                    }
                    None => unresolved(reporter, ReferenceKind::Category, title),
                }
            }
        }

        for note in &enrichment.notes {
            match resolver.resolve(&note.event_title) {
                Some(i) => {
                    entries[i]
                        .note
                        .get_or_insert_with(|| note.why_it_matters.clone());
                }
                None => unresolved(reporter, ReferenceKind::Note, &note.event_title),
            }
        }

        for turning in &enrichment.turning_points {
            match resolver.resolve(&turning.event_title) {
                Some(i) => {
                    let entry = &mut entries[i];
                    entry.is_turning_point = true;
                    if entry.turning_point_note.is_none() && !turning.description.is_empty() {
                        entry.turning_point_note = Some(turning.description.clone());
                    }
                }
                None => unresolved(reporter, ReferenceKind::TurningPoint, &turning.event_title),
            }
        }

        let mut edges: HashSet<(usize, RelationshipKind, usize)> = HashSet::new();
        for rel in &enrichment.relationships {
            let Some(from) = resolver.resolve(&rel.from_title) else {
                unresolved(reporter, ReferenceKind::RelationshipSource, &rel.from_title);
                continue;
            };
            let Some(to) = resolver.resolve(&rel.target_title) else {
                unresolved(reporter, ReferenceKind::RelationshipTarget, &rel.target_title);
                continue;
            };
            if from == to || !edges.insert((from, rel.kind, to)) {
                continue;
            }
            let target = &entries[to];
            let bound = BoundRelationship {
                kind: rel.kind,
                target_slug: target.slug.clone(),
                target_title: target.title.clone(),
                detail: rel.detail.clone(),
            };
            entries[from].relationships.push(bound);
        }

        info!(
            events = entries.len(),
            relationships = edges.len(),
            "Bound enrichment to events"
        );
        NarrativeBindings { entries, index }
    }
}

fn unresolved(reporter: &mut Reporter, kind: ReferenceKind, title: &str) {
    reporter.record(RunEvent::ReferenceUnresolved {
        kind,
        reference: title.to_string(),
    });
}
