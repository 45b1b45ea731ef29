use std::collections::HashSet;

use chronicle_common::{Citation, CitationKind, Reliability, ResearchCorpus, Stage};
use serde_json::Value;

use super::fields::{array, index, opt_text, text};
use super::Normalizer;

pub(super) const CITATION_LIST_KEYS: &[&str] = &["citations", "sources", "references"];
const SOURCE_KEYS: &[&str] = &["source", "label", "title", "name", "citation"];
const URL_KEYS: &[&str] = &["url", "link", "href"];
const NUMBER_KEYS: &[&str] = &["number", "id", "n", "num"];
const KIND_KEYS: &[&str] = &["type", "kind", "sourceType", "source_type"];
const RELIABILITY_KEYS: &[&str] = &["reliability", "confidence"];

/// Citation fields shared by the research and enrichment phases.
pub(super) struct CitationParts {
    pub number: u32,
    pub source: String,
    pub url: Option<String>,
    pub kind: CitationKind,
    pub reliability: Reliability,
}

impl Normalizer<'_> {
    pub fn research(&mut self, value: &Value) -> ResearchCorpus {
        // A bare prose answer is still a usable digest.
        if let Value::String(prose) = value {
            return ResearchCorpus {
                digest: prose.trim().to_string(),
                citations: Vec::new(),
            };
        }

        let digest = text(
            value,
            &["digest", "summary", "research", "content", "overview"],
        );
        let citations = self
            .citation_parts(Stage::Research, value)
            .into_iter()
            .map(|c| Citation {
                number: c.number,
                source: c.source,
                url: c.url,
                kind: c.kind,
                reliability: c.reliability,
            })
            .collect();

        ResearchCorpus { digest, citations }
    }

    /// Numbers are taken from the model when usable; otherwise the element
    /// gets the first number at or after its position that no other element
    /// uses or claims explicitly.
    pub(super) fn citation_parts(&mut self, stage: Stage, value: &Value) -> Vec<CitationParts> {
        let entries = array(value, CITATION_LIST_KEYS);
        let claimed: HashSet<u32> = entries.iter().filter_map(explicit_number).collect();
        let mut used: HashSet<u32> = HashSet::new();
        let mut parts = Vec::new();

        for (i, raw) in entries.iter().enumerate() {
            let path = format!("citations[{i}]");
            if !raw.is_object() {
                self.drop_element(stage, path, "citation is not an object");
                continue;
            }

            let source = text(raw, SOURCE_KEYS);
            let url = opt_text(raw, URL_KEYS);
            if source.is_empty() && url.is_none() {
                self.drop_element(stage, path, "citation has neither source nor url");
                continue;
            }

            let number = explicit_number(raw).unwrap_or_else(|| {
                let mut next = i as u32 + 1;
                while used.contains(&next) || claimed.contains(&next) {
                    next += 1;
                }
                next
            });
            if !used.insert(number) {
                self.drop_element(stage, path, format!("duplicate citation number {number}"));
                continue;
            }

            parts.push(CitationParts {
                number,
                source,
                url,
                kind: CitationKind::from_label(&text(raw, KIND_KEYS)).unwrap_or_default(),
                reliability: Reliability::from_label(&text(raw, RELIABILITY_KEYS))
                    .unwrap_or_default(),
            });
        }

        parts
    }
}

fn explicit_number(raw: &Value) -> Option<u32> {
    match index(raw, NUMBER_KEYS) {
        Ok(Some(n)) if n >= 1 && n <= u32::MAX as usize => Some(n as u32),
        _ => None,
    }
}
