use std::collections::HashSet;

use chronicle_common::{slugify, Stage};
use serde_json::Value;

use super::fields::{array, citation_numbers, importance, opt_text, text, text_list, year};
use super::Normalizer;

const STAGE: Stage = Stage::Events;

/// One model-drafted expansion, before it is matched to a skeleton event.
/// Every field is optional in spirit: the assembler fills gaps from the
/// skeleton.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventDraft {
    pub title: String,
    pub year: Option<i32>,
    pub end_year: Option<i32>,
    pub summary: String,
    pub description: String,
    pub significance: String,
    pub category: String,
    pub theme_ref: Option<String>,
    pub tags: Vec<String>,
    pub importance: Option<u8>,
    pub citation_numbers: Vec<u32>,
}

impl Normalizer<'_> {
    pub fn event_drafts(&mut self, value: &Value) -> Vec<EventDraft> {
        let items = match value {
            Value::Array(items) => items.as_slice(),
            _ => array(value, &["events", "expandedEvents", "expanded_events"]),
        };

        let mut drafts = Vec::with_capacity(items.len());
        for (i, raw) in items.iter().enumerate() {
            let path = format!("events[{i}]");
            if !raw.is_object() {
                self.drop_element(STAGE, path, "event is not an object");
                continue;
            }
            let title = text(raw, &["title", "name", "event"]);
            if title.is_empty() {
                self.drop_element(STAGE, path, "event has no title");
                continue;
            }

            let (raw_tags, bad_tags) = text_list(raw, &["tags", "keywords"]);
            self.drop_count(STAGE, &format!("{path}.tags"), bad_tags, "tag is not text");
            let mut seen = HashSet::new();
            let tags = raw_tags
                .iter()
                .map(|tag| slugify(tag))
                .filter(|tag| !tag.is_empty() && seen.insert(tag.clone()))
                .collect();

            let (citations, bad_citations) = citation_numbers(
                raw,
                &["citations", "citationNumbers", "citation_numbers", "sources"],
            );
            self.drop_count(
                STAGE,
                &format!("{path}.citations"),
                bad_citations,
                "citation number is not a positive integer",
            );

            drafts.push(EventDraft {
                title,
                year: year(raw, &["year", "startYear", "start_year", "date"]),
                end_year: year(raw, &["endYear", "end_year"]),
                summary: text(raw, &["summary", "synopsis", "oneLine"]),
                description: text(raw, &["description", "body", "details", "narrative"]),
                significance: text(raw, &["significance", "whyItMatters", "why_it_matters", "impact"]),
                category: text(raw, &["category", "type"]),
                theme_ref: opt_text(raw, &["themeId", "theme_id", "theme"]),
                tags,
                importance: importance(raw, &["importance", "weight"]),
                citation_numbers: citations,
            });
        }

        drafts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chronicle_common::Seed;
    use serde_json::json;

    #[test]
    fn drafts_accept_bare_arrays_and_clean_tags() {
        let seed = Seed::new("Second Punic War", -218, -201);
        let mut n = Normalizer::new(&seed);
        let drafts = n.event_drafts(&json!([
            {"title": "Battle of Zama", "year": "202 BC", "tags": ["Battle", "battle", "North Africa", 5],
             "themeId": "decisive-battles", "importance": "high"},
            {"description": "untitled"},
            "junk"
        ]));

        assert_eq!(drafts.len(), 1);
        let zama = &drafts[0];
        assert_eq!(zama.year, Some(-202));
        assert_eq!(zama.tags, vec!["battle", "north-africa"]);
        assert_eq!(zama.theme_ref.as_deref(), Some("decisive-battles"));
        assert_eq!(zama.importance, Some(3));
        assert_eq!(n.drops().len(), 3);
    }

    #[test]
    fn missing_fields_stay_empty() {
        let seed = Seed::new("Second Punic War", -218, -201);
        let mut n = Normalizer::new(&seed);
        let drafts = n.event_drafts(&json!({"events": [{"title": "Siege of Syracuse"}]}));
        assert_eq!(
            drafts[0],
            EventDraft {
                title: "Siege of Syracuse".into(),
                ..EventDraft::default()
            }
        );
        assert!(n.event_drafts(&json!(null)).is_empty());
    }
}
