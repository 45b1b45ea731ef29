//! Citation registry: URL deduplication, dense renumbering, and marker
//! rewriting.
//!
//! Citations arrive from more than one phase, each numbered independently
//! by the model. The registry gives every distinct URL one number, densely
//! from 1 in first-seen order, and remembers what each `(origin, number)`
//! pair became so `[n]` markers and per-event citation lists can be
//! rewritten consistently.

use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

use chronicle_common::{Citation, CitationKind, Reliability, TimelineCitationRaw};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

static MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[(\d+)\]").expect("valid regex"));

/// Which phase's numbering a citation number belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CitationOrigin {
    Research,
    Enrichment,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredCitation {
    pub number: u32,
    pub source: String,
    pub url: String,
    pub kind: CitationKind,
    pub reliability: Reliability,
}

/// Outcome of registering one citation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    New(u32),
    /// Same URL as an earlier citation; mapped onto its number.
    Merged(u32),
    Discarded(&'static str),
}

/// Serializes as the surviving citations plus, per origin, what each
/// original number became, so persisted `[n]` markers and citation lists
/// can be translated after the run.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CitationRegistry {
    citations: Vec<RegisteredCitation>,
    renumbering: BTreeMap<CitationOrigin, BTreeMap<u32, u32>>,
    #[serde(skip)]
    by_url: HashMap<String, u32>,
}

impl CitationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one citation. A citation needs both a source label and a
    /// URL; URLs match exactly after trimming.
    pub fn register(
        &mut self,
        origin: CitationOrigin,
        original_number: u32,
        source: &str,
        url: Option<&str>,
        kind: CitationKind,
        reliability: Reliability,
    ) -> Registration {
        let source = source.trim();
        let url = url.map(str::trim).unwrap_or_default();
        if source.is_empty() {
            return Registration::Discarded("missing source label");
        }
        if url.is_empty() {
            return Registration::Discarded("missing url");
        }
        if self.resolve(origin, original_number).is_some() {
            return Registration::Discarded("duplicate citation number");
        }

        if let Some(&number) = self.by_url.get(url) {
            self.map(origin, original_number, number);
            return Registration::Merged(number);
        }

        let number = self.citations.len() as u32 + 1;
        self.citations.push(RegisteredCitation {
            number,
            source: source.to_string(),
            url: url.to_string(),
            kind,
            reliability,
        });
        self.by_url.insert(url.to_string(), number);
        self.map(origin, original_number, number);
        Registration::New(number)
    }

    fn map(&mut self, origin: CitationOrigin, original_number: u32, number: u32) {
        self.renumbering
            .entry(origin)
            .or_default()
            .insert(original_number, number);
    }

    pub fn register_research(&mut self, citation: &Citation) -> Registration {
        self.register(
            CitationOrigin::Research,
            citation.number,
            &citation.source,
            citation.url.as_deref(),
            citation.kind,
            citation.reliability,
        )
    }

    pub fn register_enrichment(&mut self, citation: &TimelineCitationRaw) -> Registration {
        self.register(
            CitationOrigin::Enrichment,
            citation.number,
            &citation.source,
            citation.url.as_deref(),
            citation.kind,
            citation.reliability,
        )
    }

    /// The registry number an original citation number became, if it
    /// survived.
    pub fn resolve(&self, origin: CitationOrigin, original_number: u32) -> Option<u32> {
        self.renumbering
            .get(&origin)
            .and_then(|numbers| numbers.get(&original_number))
            .copied()
    }

    /// Map a list of original numbers, dropping the dangling ones and
    /// collapsing merged duplicates. Order of first appearance is kept.
    pub fn renumber(&self, origin: CitationOrigin, numbers: &[u32]) -> (Vec<u32>, Vec<u32>) {
        let mut resolved = Vec::new();
        let mut dangling = Vec::new();
        for &n in numbers {
            match self.resolve(origin, n) {
                Some(m) if !resolved.contains(&m) => resolved.push(m),
                Some(_) => {}
                None => dangling.push(n),
            }
        }
        (resolved, dangling)
    }

    /// Rewrite `[n]` markers to registry numbers. Markers that do not
    /// resolve stay as literal text.
    pub fn rewrite(&self, text: &str, origin: CitationOrigin) -> String {
        MARKER
            .replace_all(text, |caps: &Captures| {
                caps[1]
                    .parse::<u32>()
                    .ok()
                    .and_then(|n| self.resolve(origin, n))
                    .map(|n| format!("[{n}]"))
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }

    pub fn citations(&self) -> &[RegisteredCitation] {
        &self.citations
    }

    pub fn len(&self) -> usize {
        self.citations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.citations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register(registry: &mut CitationRegistry, n: u32, source: &str, url: Option<&str>) -> Registration {
        registry.register(
            CitationOrigin::Research,
            n,
            source,
            url,
            CitationKind::Secondary,
            Reliability::Medium,
        )
    }

    #[test]
    fn identical_urls_collapse_to_first_label() {
        let mut registry = CitationRegistry::new();
        assert_eq!(
            register(&mut registry, 1, "Polybius", Some("https://example.org/a")),
            Registration::New(1)
        );
        assert_eq!(
            register(&mut registry, 2, "Polybius, Histories III", Some(" https://example.org/a ")),
            Registration::Merged(1)
        );

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.citations()[0].source, "Polybius");
        assert_eq!(
            registry.rewrite("Cannae [1] and again [2].", CitationOrigin::Research),
            "Cannae [1] and again [1]."
        );
    }

    #[test]
    fn citations_without_url_or_label_never_appear() {
        let mut registry = CitationRegistry::new();
        assert!(matches!(register(&mut registry, 1, "Livy", None), Registration::Discarded(_)));
        assert!(matches!(
            register(&mut registry, 2, "  ", Some("https://example.org/b")),
            Registration::Discarded(_)
        ));
        assert_eq!(
            register(&mut registry, 3, "Appian", Some("https://example.org/c")),
            Registration::New(1)
        );
        assert_eq!(registry.citations().len(), 1);
        assert_eq!(
            registry.rewrite("See [2] and [3].", CitationOrigin::Research),
            "See [2] and [1]."
        );
    }

    #[test]
    fn numbering_is_dense_and_stable() {
        let inputs = [
            (4, "D", "https://d"),
            (9, "A", "https://a"),
            (2, "D again", "https://d"),
            (7, "B", "https://b"),
        ];
        let run = || {
            let mut registry = CitationRegistry::new();
            for (n, source, url) in inputs {
                register(&mut registry, n, source, Some(url));
            }
            registry
                .citations()
                .iter()
                .map(|c| (c.number, c.url.clone()))
                .collect::<Vec<_>>()
        };
        let first = run();
        assert_eq!(
            first,
            vec![
                (1, "https://d".to_string()),
                (2, "https://a".to_string()),
                (3, "https://b".to_string())
            ]
        );
        assert_eq!(first, run());
    }

    #[test]
    fn origins_are_numbered_independently() {
        let mut registry = CitationRegistry::new();
        register(&mut registry, 1, "Polybius", Some("https://example.org/a"));
        registry.register(
            CitationOrigin::Enrichment,
            1,
            "Goldsworthy",
            Some("https://example.org/g"),
            CitationKind::Modern,
            Reliability::High,
        );

        assert_eq!(registry.resolve(CitationOrigin::Research, 1), Some(1));
        assert_eq!(registry.resolve(CitationOrigin::Enrichment, 1), Some(2));
        assert_eq!(
            registry.rewrite("[1] [12] [x]", CitationOrigin::Enrichment),
            "[2] [12] [x]"
        );
    }

    #[test]
    fn renumber_drops_dangling_and_merged_duplicates() {
        let mut registry = CitationRegistry::new();
        register(&mut registry, 1, "A", Some("https://a"));
        register(&mut registry, 2, "A2", Some("https://a"));
        register(&mut registry, 3, "B", Some("https://b"));

        let (resolved, dangling) = registry.renumber(CitationOrigin::Research, &[3, 1, 2, 8]);
        assert_eq!(resolved, vec![2, 1]);
        assert_eq!(dangling, vec![8]);
    }

    #[test]
    fn serialized_registry_carries_the_renumbering() {
        let mut registry = CitationRegistry::new();
        register(&mut registry, 4, "Polybius", Some("https://example.org/a"));
        register(&mut registry, 7, "Polybius again", Some("https://example.org/a"));
        register(&mut registry, 2, "Livy", Some("https://example.org/l"));
        registry.register(
            CitationOrigin::Enrichment,
            1,
            "Livy, Ab Urbe Condita",
            Some("https://example.org/l"),
            CitationKind::Primary,
            Reliability::High,
        );

        let value = serde_json::to_value(&registry).unwrap();
        assert_eq!(value["citations"].as_array().unwrap().len(), 2);
        assert_eq!(value["citations"][1]["url"], "https://example.org/l");
        assert_eq!(
            value["renumbering"],
            serde_json::json!({
                "research": {"2": 2, "4": 1, "7": 1},
                "enrichment": {"1": 2}
            })
        );
    }
}
