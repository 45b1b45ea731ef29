//! Content normalizer: arbitrary model JSON in, strict phase schema out.
//!
//! Each phase has one entry point on [`Normalizer`] that takes a
//! `serde_json::Value` of unknown shape and always returns a fully
//! populated value of the phase's type. Elements that fail their shape
//! check are discarded and recorded as [`DroppedElement`]s, so the caller
//! can report what was lost without the normalizer ever failing.

mod enrichment;
mod events;
pub(crate) mod fields;
pub mod ids;
mod narrative;
pub mod relationship;
mod research;
mod seo;
mod skeleton;

use chronicle_common::{Seed, Stage};
use serde::Serialize;
use tracing::debug;

pub use events::EventDraft;
pub use ids::IdAllocator;
pub use relationship::{relationship_label, RelationshipLabel};

/// Something the normalizer threw away, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DroppedElement {
    pub stage: Stage,
    pub path: String,
    pub reason: String,
}

/// Per-run normalizer. Holds the seed for year fallbacks and collects
/// every dropped element.
#[derive(Debug, Clone)]
pub struct Normalizer<'a> {
    seed: &'a Seed,
    max_beat_paragraphs: usize,
    drops: Vec<DroppedElement>,
}

impl<'a> Normalizer<'a> {
    pub fn new(seed: &'a Seed) -> Self {
        Self {
            seed,
            max_beat_paragraphs: 3,
            drops: Vec::new(),
        }
    }

    pub fn with_max_beat_paragraphs(mut self, max: usize) -> Self {
        self.max_beat_paragraphs = max.max(1);
        self
    }

    pub fn drops(&self) -> &[DroppedElement] {
        &self.drops
    }

    pub fn take_drops(&mut self) -> Vec<DroppedElement> {
        std::mem::take(&mut self.drops)
    }

    fn drop_element(&mut self, stage: Stage, path: impl Into<String>, reason: impl Into<String>) {
        let element = DroppedElement {
            stage,
            path: path.into(),
            reason: reason.into(),
        };
        debug!(
            stage = %element.stage,
            path = element.path.as_str(),
            reason = element.reason.as_str(),
            "Dropped malformed element"
        );
        self.drops.push(element);
    }

    fn drop_count(&mut self, stage: Stage, path: &str, count: usize, reason: &str) {
        for _ in 0..count {
            self.drop_element(stage, path, reason);
        }
    }
}

/// Clip to at most `max_chars` characters, trimming trailing whitespace.
pub(crate) fn clip_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((end, _)) => s[..end].trim_end().to_string(),
        None => s.to_string(),
    }
}
