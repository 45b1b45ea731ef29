use std::collections::HashSet;

use chronicle_common::{
    title_key, EnrichmentContent, Stage, TimelineCitationRaw, TimelineEventNote,
    TimelineEventRelationship, TimelineThemeCategory, TimelineTurningPoint,
};
use serde_json::Value;

use super::fields::{array, field, opt_text, text, text_list};
use super::{relationship_label, IdAllocator, Normalizer};

const STAGE: Stage = Stage::Enrichment;
const FROM_KEYS: &[&str] = &["fromTitle", "from_title", "from", "source", "eventTitle", "event"];
const TARGET_KEYS: &[&str] = &["targetTitle", "target_title", "target", "to", "targetEvent"];
const KIND_KEYS: &[&str] = &["type", "kind", "relationship", "relation"];
const DETAIL_KEYS: &[&str] = &["detail", "description", "explanation"];

impl Normalizer<'_> {
    /// Accepts both a flat layout (`notes`, `relationships`, `turningPoints`)
    /// and a per-event layout where each entry under `events` carries its own
    /// note, relationships and turning-point flag.
    pub fn enrichment(&mut self, value: &Value) -> EnrichmentContent {
        let mut content = EnrichmentContent {
            intro: text(value, &["intro", "introduction", "editorialIntro"]),
            legacy: text(value, &["legacy", "legacyNote", "conclusion"]),
            categories: self.categories(value),
            ..EnrichmentContent::default()
        };

        for (i, raw) in array(value, &["notes", "eventNotes", "event_notes"]).iter().enumerate() {
            let event_title = text(raw, &["eventTitle", "event_title", "event", "title"]);
            let why = text(raw, &["whyItMatters", "why_it_matters", "note", "significance"]);
            if event_title.is_empty() || why.is_empty() {
                self.drop_element(STAGE, format!("notes[{i}]"), "note needs an event title and text");
                continue;
            }
            content.notes.push(TimelineEventNote {
                event_title,
                why_it_matters: why,
            });
        }

        for (i, raw) in array(value, &["relationships", "connections", "edges"]).iter().enumerate() {
            let from = text(raw, FROM_KEYS);
            if let Some(rel) = self.relationship(&format!("relationships[{i}]"), &from, raw) {
                content.relationships.push(rel);
            }
        }

        for (i, raw) in array(value, &["turningPoints", "turning_points"]).iter().enumerate() {
            let (event_title, description) = match raw {
                Value::String(title) => (title.trim().to_string(), String::new()),
                _ => (
                    text(raw, &["eventTitle", "event_title", "event", "title"]),
                    text(raw, &["description", "why", "note"]),
                ),
            };
            if event_title.is_empty() {
                self.drop_element(STAGE, format!("turningPoints[{i}]"), "turning point has no event title");
                continue;
            }
            content.turning_points.push(TimelineTurningPoint {
                event_title,
                description,
            });
        }

        for (i, raw) in array(value, &["events", "eventDetails", "event_details"]).iter().enumerate() {
            self.per_event(i, raw, &mut content);
        }

        content.relationships = dedupe_relationships(std::mem::take(&mut content.relationships));
        content.citations = self
            .citation_parts(STAGE, value)
            .into_iter()
            .map(|c| TimelineCitationRaw {
                number: c.number,
                source: c.source,
                url: c.url,
                kind: c.kind,
                reliability: c.reliability,
            })
            .collect();

        content
    }

    fn categories(&mut self, value: &Value) -> Vec<TimelineThemeCategory> {
        let mut ids = IdAllocator::new("category");
        let mut categories = Vec::new();
        for (i, raw) in array(value, &["categories", "themeCategories", "theme_categories", "themes"])
            .iter()
            .enumerate()
        {
            let path = format!("categories[{i}]");
            let title = text(raw, &["title", "name"]);
            if title.is_empty() {
                self.drop_element(STAGE, path, "category has no title");
                continue;
            }
            let (event_titles, bad) = text_list(raw, &["eventTitles", "event_titles", "events"]);
            self.drop_count(STAGE, &format!("{path}.eventTitles"), bad, "event title is not text");
            categories.push(TimelineThemeCategory {
                id: ids.allocate(&title),
                title,
                description: text(raw, &["description", "summary"]),
                event_titles,
            });
        }
        categories
    }

    fn per_event(&mut self, i: usize, raw: &Value, content: &mut EnrichmentContent) {
        let path = format!("events[{i}]");
        let title = text(raw, &["title", "eventTitle", "event_title", "event"]);
        if title.is_empty() {
            self.drop_element(STAGE, path, "event entry has no title");
            return;
        }

        if let Some(why) = opt_text(raw, &["whyItMatters", "why_it_matters", "note"]) {
            content.notes.push(TimelineEventNote {
                event_title: title.clone(),
                why_it_matters: why,
            });
        }

        for (ri, rel) in array(raw, &["relationships", "connections"]).iter().enumerate() {
            if let Some(rel) = self.relationship(&format!("{path}.relationships[{ri}]"), &title, rel) {
                content.relationships.push(rel);
            }
        }

        let turning = match field(raw, &["turningPoint", "turning_point", "isTurningPoint"]) {
            Some(Value::Bool(true)) => {
                Some(text(raw, &["turningPointDescription", "turning_point_description"]))
            }
            Some(Value::String(description)) if !description.trim().is_empty() => {
                Some(description.trim().to_string())
            }
            _ => None,
        };
        if let Some(description) = turning {
            content.turning_points.push(TimelineTurningPoint {
                event_title: title,
                description,
            });
        }
    }

    fn relationship(
        &mut self,
        path: &str,
        from: &str,
        raw: &Value,
    ) -> Option<TimelineEventRelationship> {
        let target = text(raw, TARGET_KEYS);
        if from.is_empty() || target.is_empty() {
            self.drop_element(STAGE, path, "relationship needs both endpoints");
            return None;
        }
        let label = text(raw, KIND_KEYS);
        let Some(read) = relationship_label(&label) else {
            self.drop_element(STAGE, path, format!("unrecognized relationship type \"{label}\""));
            return None;
        };
        if title_key(from) == title_key(&target) {
            self.drop_element(STAGE, path, "relationship points at its own event");
            return None;
        }
        let (from_title, target_title) = if read.reversed {
            (target, from.to_string())
        } else {
            (from.to_string(), target)
        };
        Some(TimelineEventRelationship {
            from_title,
            kind: read.kind,
            target_title,
            detail: opt_text(raw, DETAIL_KEYS),
        })
    }
}

/// One edge per (source, kind, target); first occurrence wins.
fn dedupe_relationships(
    relationships: Vec<TimelineEventRelationship>,
) -> Vec<TimelineEventRelationship> {
    let mut seen = HashSet::new();
    relationships
        .into_iter()
        .filter(|rel| {
            seen.insert((
                title_key(&rel.from_title),
                rel.kind,
                title_key(&rel.target_title),
            ))
        })
        .collect()
}
