use std::collections::HashSet;

use chronicle_common::slugify;

/// Mints identifiers that are unique within one batch.
///
/// The base id is the slug of a human-readable title; collisions get an
/// incrementing suffix: `theme`, `theme-1`, `theme-2`, ...
#[derive(Debug, Clone)]
pub struct IdAllocator {
    fallback: &'static str,
    taken: HashSet<String>,
}

impl IdAllocator {
    /// `fallback` is the base used when a title slugs to nothing.
    pub fn new(fallback: &'static str) -> Self {
        Self {
            fallback,
            taken: HashSet::new(),
        }
    }

    pub fn allocate(&mut self, title: &str) -> String {
        let base = match slugify(title) {
            slug if slug.is_empty() => self.fallback.to_string(),
            slug => slug,
        };
        self.claim(base)
    }

    /// Claim `id` as-is when free, otherwise its first free suffixed form.
    pub fn claim(&mut self, id: String) -> String {
        if self.taken.insert(id.clone()) {
            return id;
        }
        let mut n = 1usize;
        loop {
            let candidate = format!("{id}-{n}");
            if self.taken.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.taken.contains(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collisions_get_incrementing_suffixes() {
        let mut ids = IdAllocator::new("theme");
        assert_eq!(ids.allocate("Theme"), "theme");
        assert_eq!(ids.allocate("theme!"), "theme-1");
        assert_eq!(ids.allocate("THEME"), "theme-2");
    }

    #[test]
    fn empty_titles_use_the_fallback() {
        let mut ids = IdAllocator::new("theme");
        assert_eq!(ids.allocate(""), "theme");
        assert_eq!(ids.allocate("???"), "theme-1");
    }

    #[test]
    fn suffix_skips_ids_already_taken_verbatim() {
        let mut ids = IdAllocator::new("theme");
        assert_eq!(ids.allocate("War 1"), "war-1");
        assert_eq!(ids.allocate("War"), "war");
        assert_eq!(ids.allocate("War"), "war-2");
    }

    #[test]
    fn same_input_yields_same_ids() {
        let titles = ["Power", "Power", "Sea Power", "", "Power"];
        let run = || {
            let mut ids = IdAllocator::new("theme");
            titles.iter().map(|t| ids.allocate(t)).collect::<Vec<_>>()
        };
        let first = run();
        assert_eq!(first, run());
        let unique: HashSet<_> = first.iter().collect();
        assert_eq!(unique.len(), first.len());
    }
}
