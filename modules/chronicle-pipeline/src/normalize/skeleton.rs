use std::collections::HashSet;

use chronicle_common::{
    title_key, PeriodBreakdown, Skeleton, SkeletonEvent, SkeletonPerson, SkeletonTheme, Stage,
};
use serde_json::Value;

use super::fields::{array, citation_numbers, importance, text, text_list, year};
use super::{IdAllocator, Normalizer};

const STAGE: Stage = Stage::Skeleton;

impl Normalizer<'_> {
    pub fn skeleton(&mut self, value: &Value) -> Skeleton {
        // A bare array is read as the event list.
        let events = match value {
            Value::Array(items) => items.as_slice(),
            _ => array(value, &["events", "timeline", "keyEvents", "key_events"]),
        };

        Skeleton {
            events: self.skeleton_events(events),
            people: self.skeleton_people(array(value, &["people", "keyPeople", "key_people", "figures"])),
            themes: self.skeleton_themes(array(value, &["themes"])),
            periods: self.skeleton_periods(array(value, &["periods", "eras", "periodBreakdown"])),
        }
    }

    fn skeleton_events(&mut self, items: &[Value]) -> Vec<SkeletonEvent> {
        let mut seen = HashSet::new();
        let mut events = Vec::with_capacity(items.len());

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
            if !seen.insert(title_key(&title)) {
                self.drop_element(STAGE, path, format!("duplicate event title \"{title}\""));
                continue;
            }

            let start = year(raw, &["year", "startYear", "start_year", "date"])
                .unwrap_or(self.seed.start_year);
            let end_year = year(raw, &["endYear", "end_year"]).filter(|end| *end > start);

            let (key_facts, bad_facts) = text_list(raw, &["keyFacts", "key_facts", "facts"]);
            self.drop_count(STAGE, &format!("{path}.keyFacts"), bad_facts, "fact is not text");
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

            events.push(SkeletonEvent {
                title,
                year: start,
                end_year,
                synopsis: text(raw, &["synopsis", "summary", "oneLine", "one_line", "description"]),
                key_facts,
                citation_numbers: citations,
                importance: importance(raw, &["importance", "weight", "significance"]).unwrap_or(2),
                category: text(raw, &["category", "type"]),
            });
        }

        events
    }

    fn skeleton_people(&mut self, items: &[Value]) -> Vec<SkeletonPerson> {
        let mut people = Vec::new();
        for (i, raw) in items.iter().enumerate() {
            let name = text(raw, &["name", "person", "title"]);
            if name.is_empty() {
                self.drop_element(STAGE, format!("people[{i}]"), "person has no name");
                continue;
            }
            let born = year(raw, &["born", "birthYear", "birth_year"]);
            let died = year(raw, &["died", "deathYear", "death_year"])
                .filter(|died| born.map_or(true, |born| *died >= born));
            people.push(SkeletonPerson {
                name,
                role: text(raw, &["role", "title", "position"]),
                born,
                died,
                synopsis: text(raw, &["synopsis", "summary", "bio", "description"]),
            });
        }
        people
    }

    fn skeleton_themes(&mut self, items: &[Value]) -> Vec<SkeletonTheme> {
        let mut ids = IdAllocator::new("theme");
        let mut themes = Vec::new();
        for (i, raw) in items.iter().enumerate() {
            let path = format!("themes[{i}]");
            let title = text(raw, &["title", "name"]);
            if title.is_empty() {
                self.drop_element(STAGE, path, "theme has no title");
                continue;
            }
            let (related_events, bad) =
                text_list(raw, &["relatedEvents", "related_events", "events", "eventTitles"]);
            self.drop_count(STAGE, &format!("{path}.relatedEvents"), bad, "event title is not text");
            themes.push(SkeletonTheme {
                id: ids.allocate(&title),
                title,
                one_liner: text(raw, &["oneLiner", "one_liner", "summary", "description"]),
                related_events,
            });
        }
        themes
    }

    fn skeleton_periods(&mut self, items: &[Value]) -> Vec<PeriodBreakdown> {
        let mut periods = Vec::new();
        for (i, raw) in items.iter().enumerate() {
            let title = text(raw, &["title", "name"]);
            if title.is_empty() {
                self.drop_element(STAGE, format!("periods[{i}]"), "period has no title");
                continue;
            }
            let start = year(raw, &["startYear", "start_year", "start", "from"])
                .unwrap_or(self.seed.start_year);
            let end = year(raw, &["endYear", "end_year", "end", "to"]).unwrap_or(self.seed.end_year);
            periods.push(PeriodBreakdown {
                title,
                start_year: start.min(end),
                end_year: start.max(end),
                summary: text(raw, &["summary", "description"]),
            });
        }
        periods
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chronicle_common::Seed;
    use serde_json::json;

    fn seed() -> Seed {
        Seed::new("Second Punic War", -218, -201)
    }

    #[test]
    fn garbage_yields_empty_skeleton() {
        let seed = seed();
        let mut n = Normalizer::new(&seed);
        assert_eq!(n.skeleton(&json!(null)), Skeleton::default());
        assert_eq!(n.skeleton(&json!({})), Skeleton::default());
        assert_eq!(n.skeleton(&json!("no json here")), Skeleton::default());
    }

    #[test]
    fn events_are_coerced_and_defaulted() {
        let seed = seed();
        let mut n = Normalizer::new(&seed);
        let skeleton = n.skeleton(&json!({
            "events": [
                {"title": "Battle of Cannae", "year": "216 BCE", "importance": 9,
                 "keyFacts": ["Double envelopment", 7], "citations": [1, "[2]"]},
                {"name": "Crossing of the Alps"},
                {"title": "battle of cannae!"},
                {"summary": "No title"},
                42
            ]
        }));

        assert_eq!(skeleton.events.len(), 2);
        let cannae = &skeleton.events[0];
        assert_eq!(cannae.year, -216);
        assert_eq!(cannae.importance, 3);
        assert_eq!(cannae.key_facts, vec!["Double envelopment"]);
        assert_eq!(cannae.citation_numbers, vec![1, 2]);

        let alps = &skeleton.events[1];
        assert_eq!(alps.year, -218);
        assert_eq!(alps.importance, 2);
        assert_eq!(alps.end_year, None);

        // bad fact, duplicate title, missing title, non-object
        assert_eq!(n.drops().len(), 4);
    }

    #[test]
    fn bare_array_is_read_as_events() {
        let seed = seed();
        let mut n = Normalizer::new(&seed);
        let skeleton = n.skeleton(&json!([{"title": "Siege of Saguntum", "year": -219}]));
        assert_eq!(skeleton.events.len(), 1);
        assert_eq!(skeleton.events[0].year, -219);
    }

    #[test]
    fn theme_ids_are_unique() {
        let seed = seed();
        let mut n = Normalizer::new(&seed);
        let skeleton = n.skeleton(&json!({
            "themes": [
                {"title": "Sea Power", "oneLiner": "Rome learns the sea"},
                {"title": "Sea power"},
                {"title": "Attrition"}
            ]
        }));
        let ids: Vec<_> = skeleton.themes.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["sea-power", "sea-power-1", "attrition"]);
    }

    #[test]
    fn periods_are_ordered() {
        let seed = seed();
        let mut n = Normalizer::new(&seed);
        let skeleton = n.skeleton(&json!({
            "periods": [{"title": "Italy", "startYear": -203, "endYear": -218}, {"title": "Africa"}]
        }));
        assert_eq!(skeleton.periods[0].start_year, -218);
        assert_eq!(skeleton.periods[0].end_year, -203);
        assert_eq!(skeleton.periods[1].start_year, -218);
        assert_eq!(skeleton.periods[1].end_year, -201);
    }
}
