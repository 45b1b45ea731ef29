//! Validation of proposed in-text event links.
//!
//! Each link is checked on its own against the narrative it annotates and
//! the authoritative slug set at validation time. A failing link is
//! rejected with a specific reason; the batch always completes.

use std::collections::HashSet;

use chronicle_common::{MainNarrative, ProposedLink};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LinkRejection {
    #[error("link text is empty")]
    EmptyText,

    #[error("beat {beat_index} does not exist ({beat_count} beats)")]
    BeatOutOfRange { beat_index: usize, beat_count: usize },

    #[error("paragraph {paragraph_index} does not exist ({paragraph_count} paragraphs in beat)")]
    ParagraphOutOfRange {
        paragraph_index: usize,
        paragraph_count: usize,
    },

    #[error("\"{text}\" does not occur verbatim in the paragraph")]
    TextNotFound { text: String },

    #[error("event slug \"{slug}\" is not a persisted event")]
    UnknownSlug { slug: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectedLink {
    pub link: ProposedLink,
    pub reason: LinkRejection,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkValidation {
    pub accepted: Vec<ProposedLink>,
    pub rejected: Vec<RejectedLink>,
}

impl LinkValidation {
    pub fn accepted_count(&self) -> usize {
        self.accepted.len()
    }

    pub fn rejected_count(&self) -> usize {
        self.rejected.len()
    }
}

/// Check one link. Structural checks come first; the slug is checked last
/// so a link with a valid span still fails on an unknown target.
pub fn check_link(
    link: &ProposedLink,
    narrative: &MainNarrative,
    known_slugs: &HashSet<String>,
) -> Result<(), LinkRejection> {
    if link.text_to_link.is_empty() {
        return Err(LinkRejection::EmptyText);
    }
    let beat = narrative
        .beats
        .get(link.beat_index)
        .ok_or(LinkRejection::BeatOutOfRange {
            beat_index: link.beat_index,
            beat_count: narrative.beats.len(),
        })?;
    let paragraph =
        beat.paragraphs
            .get(link.paragraph_index)
            .ok_or(LinkRejection::ParagraphOutOfRange {
                paragraph_index: link.paragraph_index,
                paragraph_count: beat.paragraphs.len(),
            })?;
    if !paragraph.contains(link.text_to_link.as_str()) {
        return Err(LinkRejection::TextNotFound {
            text: link.text_to_link.clone(),
        });
    }
    if !known_slugs.contains(&link.event_slug) {
        return Err(LinkRejection::UnknownSlug {
            slug: link.event_slug.clone(),
        });
    }
    Ok(())
}

pub fn validate_links(
    links: &[ProposedLink],
    narrative: &MainNarrative,
    known_slugs: &HashSet<String>,
) -> LinkValidation {
    let mut validation = LinkValidation::default();

    for link in links {
        match check_link(link, narrative, known_slugs) {
            Ok(()) => validation.accepted.push(link.clone()),
            Err(reason) => {
                warn!(
                    event_slug = link.event_slug.as_str(),
                    beat_index = link.beat_index,
                    paragraph_index = link.paragraph_index,
                    reason = %reason,
                    "Rejected event link"
                );
                validation.rejected.push(RejectedLink {
                    link: link.clone(),
                    reason,
                });
            }
        }
    }

    info!(
        accepted = validation.accepted_count(),
        rejected = validation.rejected_count(),
        "Event link validation complete"
    );
    validation
}

#[cfg(test)]
mod tests {
    use super::*;
    use chronicle_common::{BeatKind, StoryBeat};

    fn narrative() -> MainNarrative {
        MainNarrative {
            beats: vec![StoryBeat {
                kind: BeatKind::Hook,
                title: "The Oath".into(),
                paragraphs: vec![
                    "As a boy, Hannibal swore eternal enmity toward Rome.".into(),
                    "Years later he crossed the Alps with elephants.".into(),
                ],
                links: vec![],
            }],
            ..MainNarrative::default()
        }
    }

    fn slugs(items: &[&str]) -> HashSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn link(text: &str, slug: &str, beat: usize, paragraph: usize) -> ProposedLink {
        ProposedLink {
            text_to_link: text.into(),
            event_slug: slug.into(),
            beat_index: beat,
            paragraph_index: paragraph,
        }
    }

    #[test]
    fn paraphrased_text_is_rejected() {
        let result = validate_links(
            &[link("Hannibal's Oath", "hannibals-oath", 0, 0)],
            &narrative(),
            &slugs(&["hannibals-oath"]),
        );
        assert_eq!(result.accepted_count(), 0);
        assert_eq!(
            result.rejected[0].reason,
            LinkRejection::TextNotFound {
                text: "Hannibal's Oath".into()
            }
        );
    }

    #[test]
    fn unknown_slug_is_rejected_even_with_valid_text() {
        let result = validate_links(
            &[link("crossed the Alps", "crossing-of-the-alps", 0, 1)],
            &narrative(),
            &slugs(&["battle-of-cannae"]),
        );
        assert!(matches!(
            result.rejected[0].reason,
            LinkRejection::UnknownSlug { .. }
        ));
    }

    #[test]
    fn each_link_is_judged_independently() {
        let result = validate_links(
            &[
                link("crossed the Alps", "crossing-of-the-alps", 0, 1),
                link("Rome", "rome", 3, 0),
                link("Rome", "rome", 0, 5),
                link("", "rome", 0, 0),
                link("swore eternal enmity", "hannibals-oath", 0, 0),
            ],
            &narrative(),
            &slugs(&["crossing-of-the-alps", "hannibals-oath", "rome"]),
        );

        assert_eq!(result.accepted_count(), 2);
        assert_eq!(result.rejected_count(), 3);
        assert!(matches!(
            result.rejected[0].reason,
            LinkRejection::BeatOutOfRange { beat_index: 3, beat_count: 1 }
        ));
        assert!(matches!(
            result.rejected[1].reason,
            LinkRejection::ParagraphOutOfRange { paragraph_index: 5, .. }
        ));
        assert_eq!(result.rejected[2].reason, LinkRejection::EmptyText);
    }

    #[test]
    fn match_is_case_sensitive() {
        let result = validate_links(
            &[link("hannibal", "hannibals-oath", 0, 0)],
            &narrative(),
            &slugs(&["hannibals-oath"]),
        );
        assert_eq!(result.rejected_count(), 1);
    }
}
