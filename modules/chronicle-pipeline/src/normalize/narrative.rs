use std::collections::{HashMap, HashSet};

use chronicle_common::{slugify, BeatKind, EventLink, MainNarrative, Stage, StoryBeat, Theme};
use serde_json::Value;

use super::fields::{array, field, index, text};
use super::{IdAllocator, Normalizer};

const STAGE: Stage = Stage::Narrative;
const LINK_LIST_KEYS: &[&str] = &["links", "eventLinks", "event_links"];
const LINK_TEXT_KEYS: &[&str] = &["textToLink", "text_to_link", "text", "anchor"];
const LINK_SLUG_KEYS: &[&str] = &["eventSlug", "event_slug", "slug", "event", "target"];
const PARAGRAPH_INDEX_KEYS: &[&str] = &["paragraphIndex", "paragraph_index", "paragraph"];

impl Normalizer<'_> {
    pub fn narrative(&mut self, value: &Value) -> MainNarrative {
        let page_title = match text(value, &["pageTitle", "page_title", "title"]) {
            title if title.is_empty() => self.seed.title.clone(),
            title => title,
        };

        // Original beat position -> position among kept beats.
        let mut kept_at: HashMap<usize, usize> = HashMap::new();
        let mut beats = Vec::new();
        for (i, raw) in array(value, &["beats", "storyBeats", "story_beats", "sections"])
            .iter()
            .enumerate()
        {
            if let Some(beat) = self.beat(i, raw) {
                kept_at.insert(i, beats.len());
                beats.push(beat);
            }
        }

        // Links may also arrive as one flat list addressed by beat index.
        for (i, raw) in array(value, LINK_LIST_KEYS).iter().enumerate() {
            let path = format!("links[{i}]");
            let target = match index(raw, &["beatIndex", "beat_index", "beat"]) {
                Ok(Some(original)) => kept_at.get(&original).copied(),
                _ => None,
            };
            let Some(target) = target else {
                self.drop_element(STAGE, path, "link does not address a kept beat");
                continue;
            };
            if let Some(link) = self.link(&path, raw) {
                beats[target].links.push(link);
            }
        }

        MainNarrative {
            page_title,
            central_question: text(
                value,
                &["centralQuestion", "central_question", "question", "dramaticQuestion"],
            ),
            story_character: text(value, &["storyCharacter", "story_character", "character", "tone"]),
            summary: text(value, &["summary", "overview"]),
            beats,
            themes: self.narrative_themes(array(value, &["themes"])),
            key_people: self.key_people(array(value, &["keyPeople", "key_people", "people"])),
        }
    }

    fn beat(&mut self, i: usize, raw: &Value) -> Option<StoryBeat> {
        let path = format!("beats[{i}]");
        if !raw.is_object() {
            self.drop_element(STAGE, path, "beat is not an object");
            return None;
        }

        let mut paragraphs = self.paragraphs(&path, raw);
        if paragraphs.is_empty() {
            self.drop_element(STAGE, path, "beat has no paragraphs");
            return None;
        }
        if paragraphs.len() > self.max_beat_paragraphs {
            let extra = paragraphs.len() - self.max_beat_paragraphs;
            paragraphs.truncate(self.max_beat_paragraphs);
            self.drop_count(STAGE, &format!("{path}.paragraphs"), extra, "paragraph beyond beat limit");
        }

        let mut links = Vec::new();
        for (li, link) in array(raw, LINK_LIST_KEYS).iter().enumerate() {
            if let Some(link) = self.link(&format!("{path}.links[{li}]"), link) {
                links.push(link);
            }
        }

        Some(StoryBeat {
            kind: BeatKind::from_label(&text(raw, &["type", "kind", "beatType", "beat_type"]))
                .unwrap_or_default(),
            title: text(raw, &["title", "heading"]),
            paragraphs,
            links,
        })
    }

    /// An array of strings, or one string split on blank lines.
    fn paragraphs(&mut self, path: &str, raw: &Value) -> Vec<String> {
        let keys = &["paragraphs", "content", "text", "body"];
        match field(raw, keys) {
            Some(Value::String(body)) => body
                .split("\n\n")
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect(),
            Some(Value::Array(items)) => {
                let mut kept = Vec::new();
                for item in items {
                    match item.as_str().map(str::trim) {
                        Some(p) if !p.is_empty() => kept.push(p.to_string()),
                        _ => self.drop_element(STAGE, format!("{path}.paragraphs"), "paragraph is not text"),
                    }
                }
                kept
            }
            _ => Vec::new(),
        }
    }

    fn link(&mut self, path: &str, raw: &Value) -> Option<EventLink> {
        let link_text = text(raw, LINK_TEXT_KEYS);
        let event_slug = slugify(&text(raw, LINK_SLUG_KEYS));
        if link_text.is_empty() || event_slug.is_empty() {
            self.drop_element(STAGE, path, "link needs both text and event slug");
            return None;
        }
        let paragraph_index = match index(raw, PARAGRAPH_INDEX_KEYS) {
            Ok(found) => found.unwrap_or(0),
            Err(()) => {
                self.drop_element(STAGE, path, "paragraph index is not a non-negative integer");
                return None;
            }
        };
        Some(EventLink {
            text: link_text,
            event_slug,
            paragraph_index,
        })
    }

    fn narrative_themes(&mut self, items: &[Value]) -> Vec<Theme> {
        let mut ids = IdAllocator::new("theme");
        let mut themes = Vec::new();
        for (i, raw) in items.iter().enumerate() {
            let title = text(raw, &["title", "name"]);
            if title.is_empty() {
                self.drop_element(STAGE, format!("themes[{i}]"), "theme has no title");
                continue;
            }
            themes.push(Theme {
                id: ids.allocate(&title),
                title,
                description: text(raw, &["description", "summary", "oneLiner", "one_liner"]),
            });
        }
        themes
    }

    /// Names as strings or `{name}` objects, deduplicated case-insensitively.
    fn key_people(&mut self, items: &[Value]) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut people = Vec::new();
        for (i, raw) in items.iter().enumerate() {
            let name = match raw {
                Value::String(name) => name.trim().to_string(),
                _ => text(raw, &["name"]),
            };
            if name.is_empty() {
                self.drop_element(STAGE, format!("keyPeople[{i}]"), "person has no name");
                continue;
            }
            if seen.insert(name.to_lowercase()) {
                people.push(name);
            }
        }
        people
    }
}
