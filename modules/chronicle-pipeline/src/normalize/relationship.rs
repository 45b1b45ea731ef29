use chronicle_common::RelationshipKind;

/// Exact labels, after lowercasing and folding separators to `_`.
const KEYWORDS: &[(&str, RelationshipKind)] = &[
    ("led_to", RelationshipKind::LedTo),
    ("leads_to", RelationshipKind::LedTo),
    ("caused", RelationshipKind::LedTo),
    ("causes", RelationshipKind::LedTo),
    ("cause", RelationshipKind::LedTo),
    ("triggered", RelationshipKind::LedTo),
    ("resulted_in", RelationshipKind::LedTo),
    ("enabled", RelationshipKind::LedTo),
    ("precipitated", RelationshipKind::LedTo),
    ("response_to", RelationshipKind::ResponseTo),
    ("in_response_to", RelationshipKind::ResponseTo),
    ("responded_to", RelationshipKind::ResponseTo),
    ("reaction_to", RelationshipKind::ResponseTo),
    ("retaliation_for", RelationshipKind::ResponseTo),
    ("answered", RelationshipKind::ResponseTo),
    ("parallel", RelationshipKind::Parallel),
    ("meanwhile", RelationshipKind::Parallel),
    ("concurrent", RelationshipKind::Parallel),
    ("simultaneous", RelationshipKind::Parallel),
    ("contemporaneous", RelationshipKind::Parallel),
    ("at_the_same_time", RelationshipKind::Parallel),
    ("foreshadows", RelationshipKind::Foreshadows),
    ("foreshadowed", RelationshipKind::Foreshadows),
    ("prefigures", RelationshipKind::Foreshadows),
    ("anticipates", RelationshipKind::Foreshadows),
    ("precursor_to", RelationshipKind::Foreshadows),
];

/// Word stems tried in order when no exact keyword matches. A stem matches
/// the start of any word in the label.
const STEMS: &[(&str, RelationshipKind)] = &[
    ("foreshadow", RelationshipKind::Foreshadows),
    ("prefigur", RelationshipKind::Foreshadows),
    ("anticipat", RelationshipKind::Foreshadows),
    ("responsib", RelationshipKind::LedTo),
    ("response", RelationshipKind::ResponseTo),
    ("respond", RelationshipKind::ResponseTo),
    ("react", RelationshipKind::ResponseTo),
    ("retaliat", RelationshipKind::ResponseTo),
    ("parallel", RelationshipKind::Parallel),
    ("meanwhile", RelationshipKind::Parallel),
    ("concurren", RelationshipKind::Parallel),
    ("simultan", RelationshipKind::Parallel),
    ("caus", RelationshipKind::LedTo),
    ("trigger", RelationshipKind::LedTo),
    ("result", RelationshipKind::LedTo),
    ("provok", RelationshipKind::LedTo),
    ("precipitat", RelationshipKind::LedTo),
];

/// Whole words only: "lead" as a stem would also catch "leader" and
/// "misleading".
const WORDS: &[(&str, RelationshipKind)] = &[
    ("lead", RelationshipKind::LedTo),
    ("leads", RelationshipKind::LedTo),
    ("leading", RelationshipKind::LedTo),
];

/// Phrases naming the cause after the subject: "A, a result of B" is the
/// edge B led to A.
const ORIGIN_PHRASES: &[&[&str]] = &[
    &["result", "of"],
    &["consequence", "of"],
    &["outcome", "of"],
    &["product", "of"],
    &["due", "to"],
    &["because"],
    &["owing", "to"],
];

/// A relationship label read against the closed set.
///
/// `reversed` marks passive and cause-after-subject phrasings ("caused
/// by", "resulted from", "a result of"): the label's subject is the edge's
/// target, not its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationshipLabel {
    pub kind: RelationshipKind,
    pub reversed: bool,
}

/// Map a free-text relationship label onto the closed set.
///
/// Unrecognized labels yield `None`: the relationship is dropped rather
/// than filed under an arbitrary kind.
pub fn relationship_label(label: &str) -> Option<RelationshipLabel> {
    let lowered = label.trim().to_lowercase();
    let words: Vec<&str> = lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect();
    if words.is_empty() {
        return None;
    }

    if ORIGIN_PHRASES
        .iter()
        .any(|phrase| words.windows(phrase.len()).any(|w| w == *phrase))
    {
        return Some(RelationshipLabel {
            kind: RelationshipKind::LedTo,
            reversed: true,
        });
    }

    // "caused by", "resulted from": classify what comes before the marker.
    if let Some((last, stem)) = words.split_last() {
        if matches!(*last, "by" | "from") && !stem.is_empty() {
            return forward_kind(stem).map(|kind| RelationshipLabel {
                kind,
                reversed: true,
            });
        }
    }

    forward_kind(&words).map(|kind| RelationshipLabel {
        kind,
        reversed: false,
    })
}

fn forward_kind(words: &[&str]) -> Option<RelationshipKind> {
    let folded = words.join("_");
    if let Some((_, kind)) = KEYWORDS.iter().find(|(keyword, _)| *keyword == folded) {
        return Some(*kind);
    }
    if words.windows(2).any(|w| w == ["led", "to"]) {
        return Some(RelationshipKind::LedTo);
    }

    STEMS
        .iter()
        .find(|(stem, _)| words.iter().any(|word| word.starts_with(stem)))
        .or_else(|| WORDS.iter().find(|(whole, _)| words.contains(whole)))
        .map(|(_, kind)| *kind)
}
